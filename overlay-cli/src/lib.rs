//! # PDF Overlay CLI
//!
//! Command-line front end: inspect a PDF's page geometry and bake a saved
//! element snapshot into it.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use overlay_core::{upload::validate_document, ElementStore, PageMapping, Size};
use overlay_renderer::{pdf::page_sizes, ExportConfig, ExportPipeline, FontBook};

/// Zoom at which snapshots are assumed to be captured.
pub const DEFAULT_ZOOM: f32 = 1.5;

/// Overlay text and images onto PDF pages.
#[derive(Debug, Parser)]
#[command(name = "pdf-overlay", version, about)]
pub struct Cli {
    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the page count and page sizes of a PDF.
    Info {
        /// PDF to inspect.
        pdf: PathBuf,
    },
    /// Bake an element snapshot into a PDF.
    Export {
        /// Source PDF.
        #[arg(long)]
        source: PathBuf,
        /// Element snapshot (JSON) produced by an editing session.
        #[arg(long)]
        elements: PathBuf,
        /// Where to write the exported PDF.
        #[arg(long)]
        out: PathBuf,
        /// TrueType/OpenType fonts for text elements. The first is the fallback.
        #[arg(long = "font", env = "OVERLAY_FONT", value_delimiter = ',')]
        fonts: Vec<PathBuf>,
        /// Scale the snapshot's element coordinates are stored at (a session's default scale).
        #[arg(long, env = "OVERLAY_ZOOM", default_value_t = DEFAULT_ZOOM)]
        zoom: f32,
    },
}

/// Run a parsed command.
///
/// # Errors
///
/// Returns an error if any input cannot be read or parsed, or if the export
/// fails. No output file is written on failure.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Info { pdf } => {
            let bytes =
                std::fs::read(&pdf).with_context(|| format!("reading {}", pdf.display()))?;
            print!("{}", describe(&bytes)?);
            Ok(())
        }
        Command::Export {
            source,
            elements,
            out,
            fonts,
            zoom,
        } => export(&source, &elements, &out, &fonts, zoom),
    }
}

/// Human-readable summary of a PDF's pages.
///
/// # Errors
///
/// Returns an error if the bytes are not a readable PDF.
pub fn describe(bytes: &[u8]) -> anyhow::Result<String> {
    validate_document(bytes)?;
    let sizes = page_sizes(bytes).context("reading page tree")?;
    let mut summary = format!("pages: {}\n", sizes.len());
    for (index, size) in sizes.iter().enumerate() {
        let _ = writeln!(
            summary,
            "  {:>3}: {} x {} pt",
            index + 1,
            size.width,
            size.height
        );
    }
    Ok(summary)
}

/// Page mappings for a snapshot whose elements are stored at `zoom`.
#[must_use]
pub fn mappings_at_zoom(sizes: &[Size], zoom: f32) -> BTreeMap<u32, PageMapping> {
    (1_u32..)
        .zip(sizes)
        .map(|(page, size)| (page, PageMapping::new(*size, size.scaled(zoom))))
        .collect()
}

fn export(
    source: &Path,
    elements: &Path,
    out: &Path,
    fonts: &[PathBuf],
    zoom: f32,
) -> anyhow::Result<()> {
    if !zoom.is_finite() || zoom <= 0.0 {
        bail!("zoom must be a positive number, got {zoom}");
    }

    let pdf = std::fs::read(source).with_context(|| format!("reading {}", source.display()))?;
    validate_document(&pdf)?;
    let json = std::fs::read_to_string(elements)
        .with_context(|| format!("reading {}", elements.display()))?;
    let store = ElementStore::from_json(&json)
        .with_context(|| format!("parsing element snapshot {}", elements.display()))?;

    let mut book = FontBook::new();
    for path in fonts {
        let family = book
            .load_file(path)
            .with_context(|| format!("loading font {}", path.display()))?;
        tracing::debug!(family, "font loaded");
    }

    let sizes = page_sizes(&pdf).context("reading page tree")?;
    let pages = mappings_at_zoom(&sizes, zoom);
    let pipeline = ExportPipeline::pdf(book, ExportConfig::default());
    let bytes = pipeline
        .export(&pdf, &store, &pages)
        .context("export failed")?;

    std::fs::write(out, &bytes).with_context(|| format!("writing {}", out.display()))?;
    tracing::info!(
        elements = store.len(),
        out = %out.display(),
        bytes = bytes.len(),
        "exported"
    );
    Ok(())
}
