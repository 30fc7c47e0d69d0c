//! Custom error types for the handler.
//!
//! Two classes of failure exist and they are kept apart by type rather than
//! by convention:
//!
//! - [`HandlerError`] covers fatal configuration problems (an unregistered
//!   storage root, a filename template naming no known detector region).
//!   These are raised at handler construction or at root-resolution time and
//!   must stop the acquisition run.
//! - [`DecodeError`] covers per-frame read failures (missing file, corrupt
//!   payload, truncated stream). The assembler consumes these and degrades
//!   the affected frame to a zero-filled placeholder; they never escape
//!   [`assemble`](crate::handler::CbfHandler::assemble).

use thiserror::Error;

/// Convenience alias for results using the handler error type.
pub type Result<T> = std::result::Result<T, HandlerError>;

/// Fatal configuration errors.
///
/// Every variant indicates a misconfigured deployment. Callers must stop
/// the run; none of these are degradable per-frame conditions.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// No registered storage root is a prefix of the given path.
    #[error("no registered storage root matches '{path}'")]
    UnknownRoot {
        /// The path that failed to match.
        path: String,
    },

    /// The designated root name is not present in the registry.
    #[error("storage root '{name}' is not registered")]
    UnknownRootName {
        /// The name that was looked up.
        name: String,
    },

    /// The filename template contains no known detector-region keyword.
    #[error("unrecognized detector region in filename template '{template}'")]
    UnrecognizedFormat {
        /// The offending template.
        template: String,
    },

    /// The filename template could not be formatted.
    #[error("invalid filename template '{template}': {source}")]
    Template {
        /// The offending template.
        template: String,
        /// The underlying formatting error.
        #[source]
        source: strfmt::FmtError,
    },

    /// Configuration file or environment could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] figment::Error),
}

/// Per-frame decode failures.
///
/// Produced by [`decode`](crate::decode::decode) and consumed by the
/// assembler's degrade-on-failure path.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The file could not be opened or read.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The file carries no CIF binary-section boundary.
    #[error("not a CBF file: missing binary section boundary")]
    NotCbf,

    /// A required binary-header field is absent.
    #[error("missing binary header field '{0}'")]
    MissingField(&'static str),

    /// A binary-header field failed to parse.
    #[error("malformed binary header field '{0}'")]
    MalformedField(&'static str),

    /// The binary section is compressed with something other than
    /// the byte-offset scheme.
    #[error("unsupported compression '{0}' (expected x-CBF_BYTE_OFFSET)")]
    UnsupportedCompression(String),

    /// The pixel element type is not the 32-bit signed integer the
    /// detector writes.
    #[error("unsupported element type '{0}' (expected signed 32-bit integer)")]
    UnsupportedElementType(String),

    /// The declared byte order is not little-endian.
    #[error("unsupported byte order '{0}'")]
    UnsupportedByteOrder(String),

    /// The start-of-binary marker (0x0C 0x1A 0x04 0xD5) was not found.
    #[error("missing start-of-binary marker")]
    MissingMarker,

    /// The declared element count disagrees with the image dimensions.
    #[error("element count mismatch: header says {got}, dimensions imply {expected}")]
    ElementCount {
        /// Elements implied by rows x cols.
        expected: usize,
        /// Elements declared in the header.
        got: usize,
    },

    /// The compressed stream ended before all elements were produced.
    #[error("truncated pixel stream: got {got} of {expected} elements")]
    Truncated {
        /// Elements expected.
        expected: usize,
        /// Elements actually decoded.
        got: usize,
    },

    /// A delta escape wider than the 32-bit pixel type was encountered.
    #[error("byte-offset delta exceeds 32-bit pixel range")]
    DeltaOverflow,
}
