//! Error types for tn3270r
//!
//! Each concern has its own enum and [`Tn3270Error`] wraps them all. None of
//! them is fatal to a session: a decode error ends the current message, a
//! transfer error ends the current transfer.

use thiserror::Error;

/// Top-level error type
#[derive(Error, Debug)]
pub enum Tn3270Error {
    #[error("data stream: {0}")]
    Decode(#[from] DecodeError),

    #[error("file transfer: {0}")]
    Transfer(#[from] TransferProtocolError),

    #[error("input: {0}")]
    Input(#[from] InputError),

    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("file store: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Message(#[from] MessageError),
}

/// A message whose decoding stopped part way. The replies built for the
/// part that was applied still have to reach the host.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("data stream: {error}")]
pub struct MessageError {
    pub replies: Vec<Vec<u8>>,
    pub error: DecodeError,
}

/// Malformed inbound data stream. Scoped to one message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown command code 0x{0:02X}")]
    UnknownCommand(u8),

    #[error("{what} truncated at offset {offset}")]
    Truncated { what: &'static str, offset: usize },

    #[error("structured field at offset {offset} has bad length {length}")]
    BadStructuredFieldLength { offset: usize, length: usize },
}

/// File transfer protocol violations. Scoped to one transfer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferProtocolError {
    #[error("a transfer is already open")]
    AlreadyOpen,

    #[error("data record received with no transfer open")]
    DataWithoutOpen,

    #[error("block {got} out of sequence, expected {expected}")]
    OutOfSequence { expected: u32, got: u32 },

    #[error("transfer exceeds {limit} bytes")]
    SizeLimit { limit: usize },

    #[error("transfer aborted: {0}")]
    Aborted(String),

    #[error("malformed transfer record: {0}")]
    MalformedRecord(String),

    #[error("get request with no upload open")]
    NoUploadOpen,

    #[error("data record received during an upload")]
    DataDuringUpload,

    #[error("invalid transfer command: {0}")]
    InvalidCommand(String),
}

/// Rejected operator input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("keyboard is locked")]
    KeyboardLocked,

    #[error("position {position} is protected")]
    Protected { position: usize },

    #[error("position {position} holds a field attribute")]
    StartField { position: usize },

    #[error("field at {field} is numeric, got 0x{byte:02X}")]
    NumericOnly { field: usize, byte: u8 },

    #[error("field at {field} must be completely filled")]
    MandatoryFill { field: usize },

    #[error("field at {field} requires an entry")]
    MandatoryEntry { field: usize },

    #[error("{length} characters do not fit in {capacity} at {field}")]
    FieldOverflow { field: usize, length: usize, capacity: usize },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config format: {0}")]
    Format(#[from] serde_json::Error),

    #[error("invalid {parameter}: {reason}")]
    InvalidParameter { parameter: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("file store receiver is gone")]
    Disconnected,

    #[error("refusing unsafe file name '{0}'")]
    InvalidName(String),
}
