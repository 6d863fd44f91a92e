//! PDF rasterization
//!
//! Black-box collaborator contract: first page in, raster out. Only
//! the first page is ever rendered; multi-page documents are out of
//! scope. An unavailable pdfium library or an unrenderable page is
//! fatal to the request, unlike OCR attempts which fail soft.

use crate::error::PipelineError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::debug;

/// Default render resolution, chosen for OCR legibility.
pub const DEFAULT_DPI: u32 = 300;

/// Render the first page of a PDF at the given resolution.
pub fn render_first_page(path: &Path, dpi: u32) -> Result<DynamicImage, PipelineError> {
    let bindings = Pdfium::bind_to_system_library().map_err(|e| {
        PipelineError::RasterizerUnavailable {
            detail: format!("{e:?}"),
        }
    })?;
    let pdfium = Pdfium::new(bindings);

    let document =
        pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| PipelineError::PdfRender {
                path: path.to_path_buf(),
                detail: format!("{e:?}"),
            })?;

    let pages = document.pages();
    let page = pages.first().map_err(|e| PipelineError::PdfRender {
        path: path.to_path_buf(),
        detail: format!("no renderable first page: {e:?}"),
    })?;

    // PDF page geometry is in points (1/72 inch).
    let config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);

    let bitmap = page
        .render_with_config(&config)
        .map_err(|e| PipelineError::PdfRender {
            path: path.to_path_buf(),
            detail: format!("{e:?}"),
        })?;

    let image = bitmap.as_image();
    debug!(
        "rendered first page of {} at {}dpi: {}x{} px",
        path.display(),
        dpi,
        image.width(),
        image.height()
    );
    Ok(image)
}
