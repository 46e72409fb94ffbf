use std::path::PathBuf;

use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which covers every failure this library can report.
///
/// Every pipeline stage catches these at its own boundary and turns them into a failed
/// [`crate::Outcome`] with the rendered text appended to its [`crate::Diagnostics`], so
/// callers normally see them as free text. They are still typed so that library users and
/// tests can match on the cause.
///
/// # Error Categories
///
/// ## Pipeline Errors
/// - [`Error::MissingInput`] - A required input file is absent
/// - [`Error::ProgramNotFound`] - The external program could not be resolved
/// - [`Error::Launch`] - The external program could not be started or read
/// - [`Error::ToolFailed`] - The external program exited with a nonzero code
/// - [`Error::BackupFailed`] - The `.bak` copy could not be created
/// - [`Error::Load`] - The metadata backend could not load the module
/// - [`Error::WriteFailed`] - The metadata backend refused or failed the write-back
///
/// ## File Parsing Errors
/// - [`Error::Malformed`] - Corrupted or invalid file structure
/// - [`Error::OutOfBounds`] - Attempted to read beyond the buffer
/// - [`Error::NotSupported`] - Unsupported file format or feature
/// - [`Error::Empty`] - Empty input provided
///
/// ## I/O and External Errors
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::GoblinErr`] - PE parsing errors from goblin
/// - [`Error::Manifest`] - JSON errors from the manifest backend or configuration
#[derive(Error, Debug)]
pub enum Error {
    /// A required input file does not exist.
    #[error("File '{}' does not exist.", .0.display())]
    MissingInput(PathBuf),

    /// The external program was neither found directly nor on the search path.
    #[error("Program '{0}' does not exist.")]
    ProgramNotFound(String),

    /// Starting the external program, or reading its output, failed.
    #[error("Failed to run '{program}'")]
    Launch {
        /// The program that was being launched
        program: String,
        /// The underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The external program ran but did not report success.
    #[error("'{program}' exited with code {code}")]
    ToolFailed {
        /// The program that failed
        program: String,
        /// The exit code it reported (-1 when terminated without one)
        code: i32,
    },

    /// The backup copy of the input could not be created.
    ///
    /// This aborts the patch; nothing is written to the input afterwards.
    #[error("Could not create backup '{}'", .path.display())]
    BackupFailed {
        /// Destination of the backup copy
        path: PathBuf,
        /// The underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The metadata backend could not turn the input into a module.
    #[error("Failed to load '{}' with the {backend} backend", .path.display())]
    Load {
        /// The module that was being loaded
        path: PathBuf,
        /// Name of the backend that failed
        backend: &'static str,
        /// The failure reported by the backend
        #[source]
        source: Box<Error>,
    },

    /// Serializing the module back to disk failed, or the backend found an inconsistency.
    #[error("Failed to write '{}': {message}", .path.display())]
    WriteFailed {
        /// The destination that was being written
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// The file is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the file.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// This file type is not supported.
    ///
    /// Raised for PE files without a CLR runtime header, or metadata layouts this
    /// library does not handle.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Error from the goblin crate during PE parsing.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),

    /// A manifest or configuration document could not be read or written.
    #[error("{0}")]
    Manifest(#[from] serde_json::Error),
}
