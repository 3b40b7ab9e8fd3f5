//! tn3270r: IBM 3270 terminal client core
//!
//! Decodes the inbound 3270 data stream into a screen buffer, builds the
//! outbound replies, and receives IND$FILE file transfers. Telnet, rendering
//! and key mapping live outside this crate; they talk to a [`Session`].

/// CHARACTER TABLES: CP037 EBCDIC conversion and display strings
pub mod ebcdic;

/// Error types for every layer
pub mod error;

/// Client configuration stored as JSON
pub mod config;

/// LIB3270: screen buffer, fields and the data stream codec
pub mod lib3270;

/// IND$FILE file transfer over DFT structured fields
pub mod transfer;

/// Session wiring: codec, transfer engine, file store and observers
pub mod session;

pub use config::ClientConfig;
pub use error::{
    ConfigError, DecodeError, InputError, MessageError, StoreError, Tn3270Error,
    TransferProtocolError,
};
pub use session::{ScreenObserver, Session};
