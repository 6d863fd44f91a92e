//! OCR module
//!
//! Wraps Tesseract (via leptess) as a black-box `image -> text` call and
//! runs the full fan-out over the preprocessed variant set.
//!
//! Multiple passes here are redundancy, not retry: the attempt list is
//! fixed ahead of time and every configuration exists to cover a
//! different plausible physical layout of the page. Any single attempt
//! is allowed to fail or come back empty; only non-empty texts are kept
//! and the downstream parser scans all of them.

use crate::preprocess::{Variant, VariantSet};
use anyhow::{Context, Result};
use image::GrayImage;
use leptess::{LepTess, Variable};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Delimiter inserted ahead of every attempt's text in the combined corpus.
pub const ATTEMPT_DELIMITER: &str = "\n\n--- OCR ATTEMPT ---\n\n";

/// Character set for the whitelist profile: alphanumerics plus the
/// punctuation that appears in marksheet tables.
const TABLE_WHITELIST: &str =
    "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz.,: %";

/// Engine configuration resolved once at startup and threaded into the
/// runner. `TESSDATA_PREFIX` overrides the traineddata location and
/// `TESSERACT_LANG` the language; both default to the system install.
#[derive(Debug, Clone)]
pub struct OcrEngineConfig {
    pub datapath: Option<PathBuf>,
    pub language: String,
}

impl OcrEngineConfig {
    pub fn from_env() -> Self {
        Self {
            datapath: std::env::var_os("TESSDATA_PREFIX").map(PathBuf::from),
            language: std::env::var("TESSERACT_LANG").unwrap_or_else(|_| "eng".to_string()),
        }
    }
}

impl Default for OcrEngineConfig {
    fn default() -> Self {
        Self {
            datapath: None,
            language: "eng".to_string(),
        }
    }
}

/// One engine configuration for a pass over the `enhanced` variant.
#[derive(Debug, Clone, Copy)]
pub struct OcrProfile {
    pub label: &'static str,
    /// Page-segmentation mode, as the tesseract variable value.
    pub psm: Option<&'static str>,
    pub whitelist: Option<&'static str>,
}

/// Fixed profile list for the primary (`enhanced`) variant. Each PSM
/// models a different physical layout: uniform block with restricted
/// characters, variable-size column, uniform block, sparse text, and
/// the engine's fully automatic default.
pub const TABLE_PROFILES: [OcrProfile; 5] = [
    OcrProfile {
        label: "psm6-whitelist",
        psm: Some("6"),
        whitelist: Some(TABLE_WHITELIST),
    },
    OcrProfile {
        label: "psm4",
        psm: Some("4"),
        whitelist: None,
    },
    OcrProfile {
        label: "psm6",
        psm: Some("6"),
        whitelist: None,
    },
    OcrProfile {
        label: "psm11",
        psm: Some("11"),
        whitelist: None,
    },
    OcrProfile {
        label: "psm3",
        psm: Some("3"),
        whitelist: None,
    },
];

/// A single unit of recovered text, tagged with what produced it.
#[derive(Debug, Clone)]
pub struct OcrAttempt {
    pub source: String,
    pub text: String,
}

/// Run Tesseract once over already-encoded image bytes.
fn recognize_bytes(config: &OcrEngineConfig, bytes: &[u8], profile: &OcrProfile) -> Result<String> {
    let datapath = config.datapath.as_ref().and_then(|p| p.to_str());
    let mut tesseract = LepTess::new(datapath, &config.language)
        .context("failed to initialize Tesseract; is it installed?")?;

    if let Some(psm) = profile.psm {
        tesseract
            .set_variable(Variable::TesseditPagesegMode, psm)
            .context("failed to set page segmentation mode")?;
    }
    if let Some(whitelist) = profile.whitelist {
        tesseract
            .set_variable(Variable::TesseditCharWhitelist, whitelist)
            .context("failed to set character whitelist")?;
    }

    tesseract
        .set_image_from_mem(bytes)
        .context("failed to load image into Tesseract")?;
    let text = tesseract
        .get_utf8_text()
        .context("failed to extract text from image")?;
    Ok(text)
}

/// Run Tesseract once over a grayscale raster.
pub fn recognize(config: &OcrEngineConfig, input: &GrayImage, profile: &OcrProfile) -> Result<String> {
    // leptess wants encoded bytes, not a raw buffer.
    let mut png = Vec::new();
    input
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .context("failed to encode image as PNG")?;
    recognize_bytes(config, &png, profile)
}

const DEFAULT_PROFILE: OcrProfile = OcrProfile {
    label: "default",
    psm: None,
    whitelist: None,
};

/// Run the full fixed fan-out: every table profile against `enhanced`,
/// one default pass per remaining variant, and a final pass over the
/// original encoded source bytes. Failed attempts are logged and
/// skipped; only non-empty stripped texts are collected.
pub fn run_fanout(
    config: &OcrEngineConfig,
    variants: &VariantSet,
    original_bytes: &[u8],
) -> Vec<OcrAttempt> {
    let mut attempts = Vec::new();

    for profile in &TABLE_PROFILES {
        let source = format!("enhanced/{}", profile.label);
        match recognize(config, &variants.enhanced, profile) {
            Ok(text) => push_non_empty(&mut attempts, source, text),
            Err(e) => warn!("OCR attempt {source} failed: {e:#}"),
        }
    }

    for (variant, raster) in variants.iter() {
        if variant == Variant::Enhanced {
            continue;
        }
        let source = variant.name().to_string();
        match recognize(config, raster, &DEFAULT_PROFILE) {
            Ok(text) => push_non_empty(&mut attempts, source, text),
            Err(e) => warn!("OCR attempt {source} failed: {e:#}"),
        }
    }

    match recognize_bytes(config, original_bytes, &DEFAULT_PROFILE) {
        Ok(text) => push_non_empty(&mut attempts, "original".to_string(), text),
        Err(e) => warn!("OCR attempt original failed: {e:#}"),
    }

    debug!("OCR fan-out produced {} non-empty attempts", attempts.len());
    attempts
}

fn push_non_empty(attempts: &mut Vec<OcrAttempt>, source: String, text: String) {
    if text.trim().is_empty() {
        debug!("OCR attempt {source} produced no text");
    } else {
        attempts.push(OcrAttempt { source, text });
    }
}

/// Concatenate all attempt texts into one corpus, each preceded by the
/// attempt delimiter. An empty attempt list yields an empty corpus,
/// which is valid input for everything downstream.
pub fn combine_attempts(attempts: &[OcrAttempt]) -> String {
    let mut corpus = String::new();
    for attempt in attempts {
        corpus.push_str(ATTEMPT_DELIMITER);
        corpus.push_str(&attempt.text);
    }
    corpus
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma};

    #[test]
    fn test_table_profiles_fixed_order() {
        let labels: Vec<&str> = TABLE_PROFILES.iter().map(|p| p.label).collect();
        assert_eq!(
            labels,
            vec!["psm6-whitelist", "psm4", "psm6", "psm11", "psm3"]
        );
        // Only the first profile restricts the character set.
        assert!(TABLE_PROFILES[0].whitelist.is_some());
        assert!(TABLE_PROFILES[1..].iter().all(|p| p.whitelist.is_none()));
    }

    #[test]
    fn test_whitelist_covers_decimal_and_percent() {
        let whitelist = TABLE_PROFILES[0].whitelist.unwrap();
        assert!(whitelist.contains('.'));
        assert!(whitelist.contains('%'));
        assert!(whitelist.contains(':'));
    }

    #[test]
    fn test_combine_attempts_empty() {
        assert_eq!(combine_attempts(&[]), "");
    }

    #[test]
    fn test_combine_attempts_delimits_each() {
        let attempts = vec![
            OcrAttempt {
                source: "enhanced/psm6".into(),
                text: "SPI 7.85".into(),
            },
            OcrAttempt {
                source: "denoised".into(),
                text: "CPI 8.20".into(),
            },
        ];
        let corpus = combine_attempts(&attempts);
        assert_eq!(corpus.matches("--- OCR ATTEMPT ---").count(), 2);
        assert!(corpus.contains("SPI 7.85"));
        assert!(corpus.contains("CPI 8.20"));
    }

    #[test]
    fn test_config_default_language() {
        let config = OcrEngineConfig::default();
        assert_eq!(config.language, "eng");
        assert!(config.datapath.is_none());
    }

    #[test]
    fn test_recognize_tolerates_missing_engine() {
        // Blank image: either Tesseract is installed and returns empty
        // text, or initialization fails with a descriptive error.
        let img = ImageBuffer::from_pixel(80, 80, Luma([255u8]));
        let config = OcrEngineConfig::default();
        match recognize(&config, &img, &DEFAULT_PROFILE) {
            Ok(text) => assert!(text.trim().is_empty()),
            Err(e) => {
                let msg = format!("{e:#}").to_lowercase();
                assert!(msg.contains("tesseract") || msg.contains("leptess"));
            }
        }
    }
}
