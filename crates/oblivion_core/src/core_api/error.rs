use std::error::Error;
use std::fmt;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreErrorCode {
    /// The save could not be read from disk.
    Io,
    /// The bytes are not a well-formed `.ess` file.
    Parse,
    /// The request names something the decoder does not know, such as an
    /// unknown record type mnemonic.
    UnsupportedOperation,
}

impl CoreErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Io => "io",
            Self::Parse => "parse",
            Self::UnsupportedOperation => "unsupported",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreError {
    pub code: CoreErrorCode,
    pub message: String,
    /// Kind of the underlying I/O error, for `Io` and `Parse` failures.
    pub io_kind: Option<io::ErrorKind>,
}

impl CoreError {
    pub fn new(code: CoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            io_kind: None,
        }
    }

    pub(crate) fn from_io(code: CoreErrorCode, context: &str, err: &io::Error) -> Self {
        Self {
            code,
            message: format!("{context}: {err}"),
            io_kind: Some(err.kind()),
        }
    }

    /// The file ended before a section or record was complete.
    pub fn is_truncated_file(&self) -> bool {
        self.io_kind == Some(io::ErrorKind::UnexpectedEof)
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.code.as_str(), self.message)
    }
}

impl Error for CoreError {}
