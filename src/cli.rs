//! Command-line interface definition.
//!
//! Argument structs are plain `clap` derives; each command's arguments are
//! turned into a validated config struct before any file is touched.

use std::path::PathBuf;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};

use pdfstitch::config::{ExtractConfig, MergeConfig, Metadata, OverwriteMode, PageRange};
use pdfstitch::error::{PdfError, Result};
use pdfstitch::utils::collect_paths_for_patterns;

/// Merge PDF documents and extract pages.
///
/// pdfstitch copies pages between documents together with everything they
/// reference (fonts, images, annotations), sharing each resource once.
#[derive(Parser, Debug)]
#[command(name = "pdfstitch")]
#[command(version)]
#[command(about = "Merge PDF documents and extract pages", long_about = None)]
#[command(author)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Verbose output - show details and debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the page count of each file
    Count(CountArgs),

    /// Copy selected pages into a new file
    ///
    /// Examples:
    ///   pdfstitch extract report.pdf --pages 2,4-6 -o excerpt.pdf
    ///   pdfstitch extract scan.pdf --pages 3,2,1 -o reversed.pdf
    Extract(ExtractArgs),

    /// Concatenate files into one
    ///
    /// Examples:
    ///   pdfstitch merge a.pdf b.pdf -o both.pdf
    ///   pdfstitch merge 'chapters/*.pdf' -o book.pdf --title "Book"
    Merge(MergeArgs),

    /// Manage a directory of stored PDFs
    Library(LibraryArgs),
}

/// Arguments of `pdfstitch count`.
#[derive(Args, Debug)]
pub struct CountArgs {
    /// PDF files or glob patterns
    #[arg(required = true, value_name = "FILE")]
    pub inputs: Vec<String>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Number of files to load in parallel
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,
}

/// Output file options shared by commands that write a PDF.
#[derive(Args, Debug)]
pub struct OutputArgs {
    /// Output PDF file path
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Overwrite an existing output file (default)
    #[arg(short, long)]
    pub force: bool,

    /// Never overwrite an existing output file
    #[arg(long, conflicts_with = "force")]
    pub no_clobber: bool,
}

impl OutputArgs {
    /// Overwrite policy selected by the flags.
    pub fn overwrite_mode(&self) -> OverwriteMode {
        if self.no_clobber {
            OverwriteMode::NoClobber
        } else {
            OverwriteMode::Force
        }
    }
}

/// Document information options.
#[derive(Args, Debug, Default)]
pub struct MetadataArgs {
    /// Set title metadata for output PDF
    #[arg(long, value_name = "TEXT")]
    pub title: Option<String>,

    /// Set author metadata for output PDF
    #[arg(long, value_name = "TEXT")]
    pub author: Option<String>,

    /// Set subject metadata for output PDF
    #[arg(long, value_name = "TEXT")]
    pub subject: Option<String>,

    /// Set keywords metadata for output PDF (comma-separated)
    #[arg(long, value_name = "TEXT")]
    pub keywords: Option<String>,
}

impl MetadataArgs {
    /// Metadata stamped with the current time.
    pub fn to_metadata(&self) -> Metadata {
        Metadata::new(
            self.title.clone(),
            self.author.clone(),
            self.subject.clone(),
            self.keywords.clone(),
        )
        .with_created(Utc::now())
    }
}

/// Arguments of `pdfstitch extract`.
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Source PDF
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Pages to keep, e.g. "2,4-6"; ranges expand in the order written
    #[arg(short, long, value_name = "RANGE")]
    pub pages: String,

    #[command(flatten)]
    pub output: OutputArgs,

    #[command(flatten)]
    pub metadata: MetadataArgs,
}

impl ExtractArgs {
    /// Convert into a validated [`ExtractConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::InvalidPageRange`] for a malformed `--pages`
    /// value, or [`PdfError::InvalidConfig`] when validation fails.
    pub fn to_config(&self, verbose: bool, quiet: bool) -> Result<ExtractConfig> {
        let pages = parse_page_range(&self.pages)?;
        let config = ExtractConfig {
            input: self.input.clone(),
            output: self.output.output.clone(),
            pages,
            overwrite_mode: self.output.overwrite_mode(),
            verbose,
            quiet,
            metadata: self.metadata.to_metadata(),
        };
        config.validate().map_err(|e| {
            PdfError::invalid_config(format!("Configuration validation failed: {e}"))
        })?;
        Ok(config)
    }
}

/// Arguments of `pdfstitch merge`.
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Input PDF files or glob patterns, in merge order
    #[arg(required = true, value_name = "FILE")]
    pub inputs: Vec<String>,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Fail on the first unreadable input instead of skipping it
    #[arg(long)]
    pub strict: bool,

    /// Number of files to load in parallel (default: CPU cores)
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    #[command(flatten)]
    pub metadata: MetadataArgs,
}

impl MergeArgs {
    /// Expand globs and convert into a validated [`MergeConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error for a pattern matching nothing, or
    /// [`PdfError::InvalidConfig`] when validation fails.
    pub fn to_config(&self, verbose: bool, quiet: bool) -> Result<MergeConfig> {
        let inputs = collect_paths_for_patterns(&self.inputs)?;
        let config = MergeConfig {
            inputs,
            output: self.output.output.clone(),
            overwrite_mode: self.output.overwrite_mode(),
            verbose,
            quiet,
            strict: self.strict,
            jobs: self.jobs,
            metadata: self.metadata.to_metadata(),
        };
        config.validate().map_err(|e| {
            PdfError::invalid_config(format!("Configuration validation failed: {e}"))
        })?;
        Ok(config)
    }
}

/// Arguments of `pdfstitch library`.
#[derive(Args, Debug)]
pub struct LibraryArgs {
    /// Library directory
    #[arg(long, env = "PDFSTITCH_LIBRARY_DIR", default_value = ".pdfstitch")]
    pub dir: PathBuf,

    /// Library command
    #[command(subcommand)]
    pub command: LibraryCommand,
}

/// Library subcommands.
#[derive(Subcommand, Debug)]
pub enum LibraryCommand {
    /// Store PDFs as pending files
    Add {
        /// Files to add
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
    },

    /// List stored files (pending only unless --all)
    List {
        /// Include merge and split outputs
        #[arg(long)]
        all: bool,

        /// Print the records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Merge stored files in the given order, then remove them
    Merge {
        /// Record ids, at least two
        #[arg(required = true, value_name = "ID")]
        ids: Vec<u64>,
    },

    /// Store selected pages of a file as a new record
    Split {
        /// Source PDF
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Pages to keep, e.g. "1,3-4"
        #[arg(short, long, value_name = "RANGE")]
        pages: String,
    },

    /// Copy a stored file out of the library
    Export {
        /// Record id
        #[arg(value_name = "ID")]
        id: u64,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Delete a stored file and its record
    Remove {
        /// Record id
        #[arg(value_name = "ID")]
        id: u64,
    },
}

/// Parse `--pages`, keeping the text for the error message.
pub fn parse_page_range(text: &str) -> Result<PageRange> {
    PageRange::parse(text).map_err(|e| PdfError::InvalidPageRange {
        range: text.to_string(),
        reason: format!("{e:#}"),
    })
}
