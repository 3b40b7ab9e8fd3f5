//! IND$FILE file transfer
//!
//! The host moves files over DFT structured fields (id 0xD0) embedded in
//! the 3270 data stream. [`record`] parses them and builds the replies,
//! [`engine`] turns a sequence of records into a [`FinalizedFile`], and
//! [`store`] takes ownership of the result. [`command`] builds the
//! IND$FILE command that starts a transfer on the host.

pub mod command;
pub mod engine;
pub mod record;
pub mod store;

pub use command::{Direction, IndFileCommand};
pub use engine::{
    CloseOutcome, FinalizedFile, TransferEngine, TransferOptions, TransferSettings, TransferState,
};
pub use record::TransferRecord;
pub use store::{ChannelFileStore, DirectoryFileStore, FileStore, MemoryFileStore};
