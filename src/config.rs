//! Configuration for the command-line front end.
//!
//! CLI arguments are turned into validated, normalized configuration structs
//! that drive one operation each. This module handles:
//! - Page range parsing
//! - Document metadata normalization
//! - Validation of argument combinations

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Page selection for extraction.
///
/// Supports individual pages and ranges:
/// - "1" - single page
/// - "1-5" - range of pages (inclusive)
/// - "1,3,5" - multiple individual pages
/// - "5-7,1" - ranges expand in the order written, so page 1 comes last
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRange {
    ranges: Vec<PageRangeItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PageRangeItem {
    Single(u32),
    Range(u32, u32),
}

impl PageRange {
    /// Parse a page range string.
    ///
    /// # Arguments
    ///
    /// * `s` - Page range string (e.g., "1-5,10,15-20")
    ///
    /// # Errors
    ///
    /// Returns an error if the string format is invalid or contains invalid page numbers.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdfstitch::config::PageRange;
    ///
    /// let range = PageRange::parse("4-5,1").unwrap();
    /// assert_eq!(range.to_page_numbers(), vec![4, 5, 1]);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let mut ranges = Vec::new();

        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                bail!("Empty entry in page range");
            }

            if let Some((start, end)) = part.split_once('-') {
                let start: u32 = start
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid page number: {start}"))?;
                let end: u32 = end
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid page number: {end}"))?;

                if start == 0 || end == 0 {
                    bail!("Page numbers must be positive (1-indexed)");
                }
                if start > end {
                    bail!(
                        "Invalid range {start}-{end}: start page must be less than or equal to end page"
                    );
                }

                ranges.push(PageRangeItem::Range(start, end));
            } else {
                let page: u32 = part
                    .parse()
                    .with_context(|| format!("Invalid page number: {part}"))?;
                if page == 0 {
                    bail!("Page numbers must be positive (1-indexed)");
                }
                ranges.push(PageRangeItem::Single(page));
            }
        }

        Ok(Self { ranges })
    }

    /// Expand to 1-based page numbers in written order, duplicates kept.
    pub fn to_page_numbers(&self) -> Vec<i64> {
        self.ranges
            .iter()
            .flat_map(|item| match *item {
                PageRangeItem::Single(p) => p..=p,
                PageRangeItem::Range(start, end) => start..=end,
            })
            .map(i64::from)
            .collect()
    }
}

/// Document information written into the output's `/Info` dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Document title.
    pub title: Option<String>,
    /// Document author.
    pub author: Option<String>,
    /// Document subject.
    pub subject: Option<String>,
    /// Document keywords (comma-separated).
    pub keywords: Option<String>,
    /// Written as `/CreationDate` and `/ModDate` when set.
    pub created: Option<DateTime<Utc>>,
}

impl Metadata {
    /// Check if any descriptive field is set.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.subject.is_none()
            && self.keywords.is_none()
    }

    /// Create metadata from optional strings, trimming whitespace.
    pub fn new(
        title: Option<String>,
        author: Option<String>,
        subject: Option<String>,
        keywords: Option<String>,
    ) -> Self {
        let to_string_opt = |opt: Option<String>| {
            opt.filter(|s| !s.trim().is_empty())
                .map(|s| s.trim().to_string())
        };

        Self {
            title: to_string_opt(title),
            author: to_string_opt(author),
            subject: to_string_opt(subject),
            keywords: to_string_opt(keywords),
            created: None,
        }
    }

    /// Stamp the metadata with a creation time.
    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = Some(created);
        self
    }
}

/// Output file overwrite behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwriteMode {
    /// Replace an existing output file (default).
    #[default]
    Force,
    /// Never overwrite, error if file exists.
    NoClobber,
}

/// Settings for `pdfstitch merge`.
#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// Input PDF file paths, in merge order.
    pub inputs: Vec<PathBuf>,

    /// Output PDF file path.
    pub output: PathBuf,

    /// File overwrite behavior.
    pub overwrite_mode: OverwriteMode,

    /// Verbose output mode.
    pub verbose: bool,

    /// Quiet mode - suppress non-error output.
    pub quiet: bool,

    /// Abort on the first unreadable input instead of skipping it.
    pub strict: bool,

    /// Number of parallel jobs (None = auto-detect).
    pub jobs: Option<usize>,

    /// Metadata to set on output document.
    pub metadata: Metadata,
}

impl MergeConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No input files are specified
    /// - Verbose and quiet modes are both enabled
    /// - Jobs count is zero
    /// - The output path is also an input
    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            bail!("No input files specified");
        }

        validate_modes(self.verbose, self.quiet, self.jobs)?;

        if self.inputs.iter().any(|input| input == &self.output) {
            bail!(
                "Output file cannot be the same as an input file: {}",
                self.output.display()
            );
        }

        Ok(())
    }

    /// Get the effective number of parallel jobs.
    ///
    /// Returns the configured job count, or the number of CPU cores if auto-detect.
    pub fn effective_jobs(&self) -> usize {
        self.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

/// Settings for `pdfstitch extract`.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Source PDF.
    pub input: PathBuf,
    /// Output PDF file path.
    pub output: PathBuf,
    /// Pages to keep, in output order.
    pub pages: PageRange,
    /// File overwrite behavior.
    pub overwrite_mode: OverwriteMode,
    /// Verbose output mode.
    pub verbose: bool,
    /// Quiet mode.
    pub quiet: bool,
    /// Metadata to set on output document.
    pub metadata: Metadata,
}

impl ExtractConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validate_modes(self.verbose, self.quiet, None)?;
        if self.input == self.output {
            bail!(
                "Output file cannot be the same as the input file: {}",
                self.output.display()
            );
        }
        Ok(())
    }
}

fn validate_modes(verbose: bool, quiet: bool, jobs: Option<usize>) -> Result<()> {
    if verbose && quiet {
        bail!("Cannot use both --verbose and --quiet");
    }
    if jobs == Some(0) {
        bail!("Number of jobs must be at least 1");
    }
    Ok(())
}
