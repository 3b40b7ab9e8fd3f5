//! IBM 3270 data stream
//!
//! The 3270 is a block-mode terminal: the host writes orders into a buffer
//! of rows x cols cells, the operator edits unprotected fields locally, and
//! an AID key sends the modified fields back.
//!
//! # Architecture
//!
//! - [`codes`] - command, order, AID and attribute constants
//! - [`attribute`] - field attribute byte, extended attributes, rendering context
//! - [`cell`] - one buffer position and its outbound encoding
//! - [`display`] - [`ScreenBuffer`], screen geometry and buffer addressing
//! - [`field`] - [`FieldIndex`], the fields derived from start-field cells
//! - [`protocol`] - [`StreamCodec`], inbound decoding and outbound replies
//! - [`query`] - replies to Read Partition (Query)
//!
//! # Example Usage
//!
//! ```rust
//! use tn3270r::lib3270::{ScreenBuffer, ScreenSize, StreamCodec};
//!
//! let mut screen = ScreenBuffer::new(ScreenSize::Model2);
//! let mut codec = StreamCodec::new(ScreenSize::Model2, ScreenSize::Model5);
//! let mut effects = Vec::new();
//!
//! // Erase/Write, WCC restore, "HI"
//! codec.process(&mut screen, &[0xF5, 0x02, 0xC8, 0xC9], &mut effects).unwrap();
//! assert_eq!(screen.row_text(0).unwrap().trim_end(), "HI");
//! ```

pub mod attribute;
pub mod cell;
pub mod codes;
pub mod display;
pub mod field;
pub mod protocol;
pub mod query;

pub use attribute::{Attribute, Color, Highlight, ScreenContext, StartFieldAttribute};
pub use cell::{Cell, CellKind, FieldForm};
pub use codes::*;
pub use display::{addressing, ScreenBuffer, ScreenSize};
pub use field::{Field, FieldIndex};
pub use protocol::{decode_orders, DecodedOrders, Effect, Order, ReplyMode, StreamCodec};
