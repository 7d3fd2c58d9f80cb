use std::error::Error;
use std::fmt;
use std::io;

#[derive(Debug)]
pub enum WsError {
    IO(io::Error),
    Json(serde_json::Error),
    Format(FormatError),
}

impl Error for WsError {}

impl fmt::Display for WsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WsError::IO(err) => writeln!(f, "IOError: {}", err),
            WsError::Json(err) => writeln!(f, "JsonError: {}", err),
            WsError::Format(err) => write!(f, "{}", err),
        }
    }
}

impl From<io::Error> for WsError {
    fn from(err: io::Error) -> Self {
        WsError::IO(err)
    }
}

/// A formatting failure, carrying the location of the token that broke the
/// expected shape of the input.
#[derive(Debug)]
pub struct FormatError {
    pub(crate) name: String,
    pub(crate) message: String,
    pub(crate) line: usize,
    pub(crate) pos: usize,
}

impl Error for FormatError {}

impl FormatError {
    pub fn new(name: String, message: String, line: usize, pos: usize) -> Self {
        Self {
            name,
            message,
            line,
            pos,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "FormatError: {}\n  --> {}:{}:{}",
            self.message, self.name, self.line, self.pos,
        )
    }
}
