//! marksight CLI
//!
//! Command-line front end for the marksheet extraction pipeline:
//! run a full extraction and print the JSON result, or dump the nine
//! preprocessing variants to disk for inspection.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use core_pipeline::pipeline::{extract_from_path, PipelineConfig};
use core_pipeline::preprocess;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "marksight")]
#[command(about = "Extract SPI/CPI or school percentages from marksheet scans", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full OCR + extraction pipeline over one file
    Extract {
        /// Input image or PDF (png, jpg, jpeg, pdf)
        #[arg(short, long)]
        input: PathBuf,

        /// Also print the combined OCR corpus to stderr
        #[arg(long)]
        raw_text: bool,
    },

    /// Write the nine preprocessing variants as PNGs for inspection
    Preprocess {
        /// Input image
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract { input, raw_text } => {
            let config = PipelineConfig::from_env();
            let extraction = extract_from_path(&input, &config)
                .with_context(|| format!("failed to process {}", input.display()))?;
            if raw_text {
                eprintln!("{}", extraction.raw_text);
            }
            println!("{}", serde_json::to_string_pretty(&extraction.result)?);
            Ok(())
        }
        Commands::Preprocess { input, output } => {
            let image = image::open(&input)
                .with_context(|| format!("failed to decode {}", input.display()))?;
            std::fs::create_dir_all(&output)
                .with_context(|| format!("failed to create {}", output.display()))?;

            let variants = preprocess::preprocess(&image);
            for (variant, raster) in variants.iter() {
                let path = output.join(format!("{}.png", variant.name()));
                raster
                    .save(&path)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("wrote {}", path.display());
            }
            Ok(())
        }
    }
}
