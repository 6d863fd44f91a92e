//! Core pipeline for marksight
//!
//! This crate provides the data structures and processing logic for
//! recovering academic-performance figures (SPI/CPI for college
//! transcripts, percentages for school certificates) from scanned or
//! photographed marksheet images and PDFs.
//!
//! The pipeline is deliberately redundant: one source image is expanded
//! into nine preprocessing variants, each variant is OCR'd (the primary
//! one under several page-segmentation profiles), and every non-empty
//! text the engine produces is concatenated into a single corpus before
//! any parsing happens. No single OCR pass over a noisy table scan can
//! be trusted; the union of all of them usually contains the numbers we
//! are after at least once.

pub mod classify;
pub mod college;
pub mod error;
pub mod normalize;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod preprocess;
pub mod school;
pub mod types;

pub use error::PipelineError;
pub use pipeline::{extract_from_path, PipelineConfig};
pub use types::*;
