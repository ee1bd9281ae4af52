use std::error;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::str;
use std::string;
use std::time::Duration;

/// Represents results from this library
pub type Result<T> = std::result::Result<T, Error>;

/// The broad failure classes errors fall into.
///
/// The verification driver reports these next to each aborted fixture so
/// that a malformed map can be told apart from a broken composition chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// reading files or spawning processes failed
    Io,
    /// the document or artifact is malformed
    Format,
    /// a base64, percent-escape or VLQ payload is malformed
    Encoding,
    /// original source text could not be resolved
    MissingContent,
    /// an inner map of a composition chain is absent or undecodable
    BrokenChain,
    /// a composition chain refers back to itself
    Cycle,
    /// the external build tool failed
    Build,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            ErrorCategory::Io => "io error",
            ErrorCategory::Format => "format error",
            ErrorCategory::Encoding => "encoding error",
            ErrorCategory::MissingContent => "missing content error",
            ErrorCategory::BrokenChain => "broken chain error",
            ErrorCategory::Cycle => "cycle error",
            ErrorCategory::Build => "build error",
        };
        f.write_str(name)
    }
}

/// Represents different failure cases
#[derive(Debug)]
pub enum Error {
    /// a std::io error
    Io(io::Error),
    /// a std::str::Utf8Error
    Utf8(str::Utf8Error),
    /// a JSON parsing related failure
    BadJson(serde_json::Error),
    /// the document does not declare version 3
    UnsupportedVersion(Option<u32>),
    /// a mapping segment had an unsupported size
    BadSegmentSize(u32),
    /// a line or column of the mappings is negative or too large
    BadPosition(i64),
    /// a reference to a non existing source was encountered
    BadSourceReference(u32),
    /// a reference to a non existing name was encountered
    BadNameReference(u32),
    /// `sourcesContent` and `sources` differ in length
    SourcesContentMismatch { sources: usize, contents: usize },
    /// an artifact carries no source map reference
    MissingReference(PathBuf),
    /// a character outside of the base64 alphabet was found in the mappings
    InvalidVlqDigit(char),
    /// a VLQ string was malformed and data was left over
    VlqLeftover,
    /// a VLQ string was empty and no values could be decoded.
    VlqNoValues,
    /// a VLQ value does not fit into 63 bits
    VlqOverflow,
    /// an inline payload is not valid base64
    InvalidBase64,
    /// an inline payload contains a broken percent escape
    InvalidPercentEncoding(usize),
    /// Indicates an invalid data URL
    InvalidDataUrl,
    /// the original text of a source could not be resolved
    MissingContent(String),
    /// the map of a tracked build output could not be loaded
    BrokenChain(String, Box<Error>),
    /// a source transitively resolves to itself
    Cycle(String),
    /// the build tool exited unsuccessfully
    BuildFailed(String),
    /// the build tool did not finish in time
    BuildTimeout(Duration),
    /// the worker pool could not be created
    WorkerPool(String),
}

impl Error {
    /// Returns the failure class of this error.
    pub fn category(&self) -> ErrorCategory {
        use Error::*;
        match *self {
            Io(_) | WorkerPool(_) => ErrorCategory::Io,
            Utf8(_)
            | InvalidVlqDigit(_)
            | VlqLeftover
            | VlqNoValues
            | VlqOverflow
            | InvalidBase64
            | InvalidPercentEncoding(_)
            | InvalidDataUrl => ErrorCategory::Encoding,
            BadJson(_)
            | UnsupportedVersion(_)
            | BadSegmentSize(_)
            | BadPosition(_)
            | BadSourceReference(_)
            | BadNameReference(_)
            | SourcesContentMismatch { .. }
            | MissingReference(_) => ErrorCategory::Format,
            MissingContent(_) => ErrorCategory::MissingContent,
            BrokenChain(..) => ErrorCategory::BrokenChain,
            Cycle(_) => ErrorCategory::Cycle,
            BuildFailed(_) | BuildTimeout(_) => ErrorCategory::Build,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<string::FromUtf8Error> for Error {
    fn from(err: string::FromUtf8Error) -> Error {
        From::from(err.utf8_error())
    }
}

impl From<str::Utf8Error> for Error {
    fn from(err: str::Utf8Error) -> Error {
        Error::Utf8(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        if err.is_io() {
            Error::Io(err.into())
        } else {
            Error::BadJson(err)
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        use Error::*;
        match *self {
            Io(ref err) => Some(err),
            Utf8(ref err) => Some(err),
            BadJson(ref err) => Some(err),
            BrokenChain(_, ref err) => Some(&**err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Error::*;
        match *self {
            Io(ref msg) => write!(f, "{}", msg),
            Utf8(ref msg) => write!(f, "{}", msg),
            BadJson(ref err) => write!(
                f,
                "bad json in line {}, column {}: {}",
                err.line(),
                err.column(),
                err
            ),
            UnsupportedVersion(Some(version)) => {
                write!(f, "unsupported sourcemap version {}, expected 3", version)
            }
            UnsupportedVersion(None) => write!(f, "sourcemap does not declare a version"),
            BadSegmentSize(size) => write!(f, "got {} segments, expected 1, 4 or 5", size),
            BadPosition(value) => write!(f, "position {} in mappings is out of range", value),
            BadSourceReference(id) => write!(f, "bad reference to source #{}", id),
            BadNameReference(id) => write!(f, "bad reference to name #{}", id),
            SourcesContentMismatch { sources, contents } => write!(
                f,
                "sourcesContent has {} entries but there are {} sources",
                contents, sources
            ),
            MissingReference(ref path) => {
                write!(f, "no sourceMappingURL reference in {}", path.display())
            }
            InvalidVlqDigit(c) => write!(f, "invalid base64 digit {:?} in vlq", c),
            VlqLeftover => write!(f, "leftover cur/shift in vlq decode"),
            VlqNoValues => write!(f, "vlq decode did not produce any values"),
            VlqOverflow => write!(f, "vlq decode overflowed"),
            InvalidBase64 => write!(f, "inline sourcemap is not valid base64"),
            InvalidPercentEncoding(offset) => {
                write!(f, "broken percent escape at offset {}", offset)
            }
            InvalidDataUrl => write!(f, "the provided data URL is invalid"),
            MissingContent(ref source) => write!(f, "cannot resolve contents of {}", source),
            BrokenChain(ref source, ref err) => {
                write!(f, "cannot load the sourcemap of {}: {}", source, err)
            }
            Cycle(ref source) => write!(f, "{} transitively maps back to itself", source),
            BuildFailed(ref msg) => write!(f, "build failed: {}", msg),
            BuildTimeout(timeout) => write!(f, "build did not finish within {:?}", timeout),
            WorkerPool(ref msg) => write!(f, "cannot create worker pool: {}", msg),
        }
    }
}
