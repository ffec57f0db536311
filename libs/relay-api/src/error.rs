use std::fmt;

/// What went wrong, coarse enough to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid configuration, fail at startup.
    Config,
    /// Socket or file error on an external transport.
    Io,
    /// Malformed wire data (telemetry, referee JSON, packet bytes).
    Format,
    /// Misuse of the data bus (zero capacity, payload type clash).
    Bus,
    /// `process()` called on a processor whose `initialize()` never ran.
    Uninitialized,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Config => "config",
            ErrorKind::Io => "io",
            ErrorKind::Format => "format",
            ErrorKind::Bus => "bus",
            ErrorKind::Uninitialized => "uninitialized",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by processors, receivers and sinks.
#[derive(Debug, Clone)]
pub struct RelayError {
    pub kind: ErrorKind,
    pub message: String,
}

impl RelayError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, msg)
    }

    pub fn format(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Format, msg)
    }

    pub fn bus(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Bus, msg)
    }

    /// `part` (a reader, writer, socket...) was used before being bound.
    pub fn uninitialized(part: &str) -> Self {
        Self::new(ErrorKind::Uninitialized, format!("{part} used before initialize()"))
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Prefix the message with `ctx`; the kind is unchanged.
    pub fn with_context(mut self, ctx: impl fmt::Display) -> Self {
        self.message = format!("{ctx}: {}", self.message);
        self
    }
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for RelayError {}

impl From<std::io::Error> for RelayError {
    fn from(e: std::io::Error) -> Self {
        Self::io(e.to_string())
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(e: serde_json::Error) -> Self {
        Self::format(e.to_string())
    }
}
