//! Error types for pdfstitch.
//!
//! Errors fall into a few categories:
//!
//! - **Document errors**: malformed bytes (`Parse`), invalid page trees or
//!   object graphs (`Structure`), encrypted inputs.
//! - **Selection errors**: nothing left to assemble after filtering.
//! - **I/O errors**: missing files, refused overwrites, storage failures.
//! - **Configuration errors**: invalid page ranges or argument combinations.

use std::io;
use std::path::PathBuf;

/// Result type alias for pdfstitch operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Main error type for pdfstitch operations.
#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    /// The input bytes are not a readable PDF.
    #[error("Failed to parse PDF: {reason}")]
    Parse {
        /// What the parser could not make sense of.
        reason: String,
    },

    /// The page tree or object graph is invalid.
    #[error("Invalid PDF structure: {reason}")]
    Structure {
        /// Details about the structural problem.
        reason: String,
    },

    /// No page survived filtering, or every merge source failed.
    #[error("No pages selected: nothing to assemble")]
    EmptySelection,

    /// The document is encrypted and cannot be processed.
    #[error(
        "PDF is encrypted and cannot be processed\n  \
         Hint: Decrypt the PDF first using 'qpdf --decrypt' or similar tools"
    )]
    Encrypted,

    /// Input file was not found.
    #[error("File not found: {}", path.display())]
    FileNotFound {
        /// Path to the file that was not found.
        path: PathBuf,
    },

    /// Input path is not a regular file.
    #[error("Not a file: {}", path.display())]
    NotAFile {
        /// Path that is not a file.
        path: PathBuf,
    },

    /// A source file could not be loaded.
    #[error("Failed to load PDF: {}\n  Reason: {source}", path.display())]
    FailedToLoad {
        /// Path to the PDF file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: Box<PdfError>,
    },

    /// Output file already exists and overwrite is not allowed.
    #[error(
        "Output file already exists: {}\n  \
         Use --force to overwrite or choose a different output path",
        path.display()
    )]
    OutputExists {
        /// Path to the existing output file.
        path: PathBuf,
    },

    /// Failed to write an output file.
    #[error("Failed to write to output file: {}\n  Reason: {source}", path.display())]
    FailedToWrite {
        /// Path being written to.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Page range text could not be parsed.
    #[error("Invalid page range '{range}': {reason}")]
    InvalidPageRange {
        /// The range as typed by the user.
        range: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of what's wrong with the configuration.
        message: String,
    },

    /// A merge request named fewer files than required.
    #[error("At least {required} PDFs are required for merging, got {given}")]
    NotEnoughFiles {
        /// Minimum number of files.
        required: usize,
        /// Number of files supplied.
        given: usize,
    },

    /// No record exists for the given id.
    #[error("No file record with id {id}")]
    RecordNotFound {
        /// Record id that was looked up.
        id: u64,
    },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Record store (de)serialization failed.
    #[error("Record store error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with a custom message.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl From<anyhow::Error> for PdfError {
    fn from(err: anyhow::Error) -> Self {
        Self::other(format!("{err:#}"))
    }
}

impl PdfError {
    /// Create a Parse error.
    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse {
            reason: reason.into(),
        }
    }

    /// Create a Structure error.
    pub fn structure(reason: impl Into<String>) -> Self {
        Self::Structure {
            reason: reason.into(),
        }
    }

    /// Create a FileNotFound error.
    pub fn file_not_found(path: PathBuf) -> Self {
        Self::FileNotFound { path }
    }

    /// Create a NotAFile error.
    pub fn not_a_file(path: PathBuf) -> Self {
        Self::NotAFile { path }
    }

    /// Wrap an error with the path of the file that produced it.
    pub fn failed_to_load(path: PathBuf, source: PdfError) -> Self {
        Self::FailedToLoad {
            path,
            source: Box::new(source),
        }
    }

    /// Create an OutputExists error.
    pub fn output_exists(path: PathBuf) -> Self {
        Self::OutputExists { path }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an Other error with a custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Check if this error only concerns one source document.
    ///
    /// A merge skips sources failing with a recoverable error instead of
    /// aborting the whole operation.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Parse { .. } | Self::Structure { .. } | Self::Encrypted => true,
            Self::FileNotFound { .. } | Self::NotAFile { .. } => true,
            Self::FailedToLoad { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }

    /// Get the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::FileNotFound { .. } | Self::NotAFile { .. } => 2,
            Self::Parse { .. } | Self::Structure { .. } | Self::Encrypted => 3,
            Self::FailedToLoad { source, .. } => source.exit_code(),
            Self::OutputExists { .. } => 4,
            Self::FailedToWrite { .. } | Self::Io(_) => 5,
            Self::EmptySelection => 6,
            Self::RecordNotFound { .. } | Self::Json(_) => 7,
            Self::InvalidPageRange { .. }
            | Self::InvalidConfig { .. }
            | Self::NotEnoughFiles { .. }
            | Self::Other { .. } => 1,
        }
    }
}
