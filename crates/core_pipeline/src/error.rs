//! Fatal error taxonomy for the extraction pipeline.
//!
//! Only failures that make the whole request unanswerable live here:
//! a source that cannot be decoded, or a PDF we cannot rasterize.
//! Everything softer is handled in place: a failed OCR attempt is
//! logged and skipped by the fan-out runner, and a field no strategy
//! can resolve is simply `None` in the result.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The source file could not be read from disk.
    #[error("failed to read source file '{path}'")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source bytes are not a decodable image.
    #[error("failed to decode image '{path}': {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A PDF was submitted but the pdfium library could not be bound.
    #[error("PDF rasterizer is unavailable: {detail}")]
    RasterizerUnavailable { detail: String },

    /// The PDF could not be loaded or its first page rendered.
    #[error("failed to render first page of '{path}': {detail}")]
    PdfRender { path: PathBuf, detail: String },

    /// The file extension is outside the allowed upload set.
    #[error("file type not allowed: '{extension}'")]
    UnsupportedExtension { extension: String },

    /// Re-encoding a raster for the OCR engine failed.
    #[error("failed to encode image for OCR")]
    ImageEncode(#[source] image::ImageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_extension_display() {
        let e = PipelineError::UnsupportedExtension {
            extension: "gif".into(),
        };
        assert!(e.to_string().contains("file type not allowed"));
        assert!(e.to_string().contains("gif"));
    }

    #[test]
    fn test_pdf_render_display() {
        let e = PipelineError::PdfRender {
            path: PathBuf::from("sem3.pdf"),
            detail: "no pages".into(),
        };
        assert!(e.to_string().contains("sem3.pdf"));
    }
}
