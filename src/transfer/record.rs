//! File transfer (DFT) structured field records
//!
//! Inbound records start at the 0xD0 structured field id, followed by a
//! 2-byte request type. Replies travel back behind AID 0x88 as complete
//! structured fields, length prefix included.

use crate::error::TransferProtocolError;
use crate::lib3270::codes::SF_FILE_TRANSFER;

pub const REQ_OPEN: u16 = 0x0012;
pub const REQ_CLOSE: u16 = 0x4112;
pub const REQ_SET_CURSOR: u16 = 0x4511;
pub const REQ_GET: u16 = 0x4611;
pub const REQ_INSERT: u16 = 0x4711;
pub const REQ_DATA_INSERT: u16 = 0x4704;

/// Compression indicator and begin-data marker in front of a data payload
const DATA_HEADER: [u8; 3] = [0xC0, 0x80, 0x61];
/// The data length counts its own two bytes and the three header bytes
const DATA_LENGTH_BIAS: usize = 5;

const OPEN_MESSAGE_NAME: &[u8] = b"FT:MSG";

/// Error codes sent in error replies
pub const ERR_COMMAND_FAILED: u16 = 0x0100;
pub const ERR_END_OF_FILE: u16 = 0x2200;

/// A parsed file transfer record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferRecord {
    /// Start of a transfer. Message transfers carry the host's completion
    /// text instead of file data.
    Open { message: bool },
    Data { payload: Vec<u8>, sequence: Option<u32> },
    Close,
    SetCursor,
    /// Host wants data from us (upload)
    Get,
    InsertRequest,
}

impl TransferRecord {
    /// Parse a record starting at its 0xD0 id byte
    pub fn parse(data: &[u8]) -> Result<Self, TransferProtocolError> {
        if data.len() < 3 || data[0] != SF_FILE_TRANSFER {
            let header = format!("{} byte header", data.len());
            return Err(TransferProtocolError::MalformedRecord(header));
        }
        let request = u16::from_be_bytes([data[1], data[2]]);
        let body = &data[3..];

        match request {
            REQ_OPEN => Ok(Self::Open {
                message: body.windows(OPEN_MESSAGE_NAME.len()).any(|w| w == OPEN_MESSAGE_NAME),
            }),
            REQ_DATA_INSERT => parse_data(body),
            REQ_CLOSE => Ok(Self::Close),
            REQ_SET_CURSOR => Ok(Self::SetCursor),
            REQ_GET => Ok(Self::Get),
            REQ_INSERT => Ok(Self::InsertRequest),
            other => {
                let request = format!("unknown request 0x{other:04X}");
                Err(TransferProtocolError::MalformedRecord(request))
            }
        }
    }

    /// Request type byte used in error replies
    pub fn request_byte(&self) -> u8 {
        let request = match self {
            Self::Open { .. } => REQ_OPEN,
            Self::Data { .. } => REQ_DATA_INSERT,
            Self::Close => REQ_CLOSE,
            Self::SetCursor => REQ_SET_CURSOR,
            Self::Get => REQ_GET,
            Self::InsertRequest => REQ_INSERT,
        };
        (request >> 8) as u8
    }
}

fn parse_data(body: &[u8]) -> Result<TransferRecord, TransferProtocolError> {
    if body.len() < DATA_HEADER.len() + 2 || body[..DATA_HEADER.len()] != DATA_HEADER {
        return Err(TransferProtocolError::MalformedRecord("bad data header".to_string()));
    }
    let declared = u16::from_be_bytes([body[3], body[4]]) as usize;
    let bad_length =
        |why: &str| TransferProtocolError::MalformedRecord(format!("data length {declared}{why}"));
    let length = declared.checked_sub(DATA_LENGTH_BIAS).ok_or_else(|| bad_length(""))?;
    let payload = body.get(5..5 + length).ok_or_else(|| bad_length(" exceeds record"))?;
    Ok(TransferRecord::Data { payload: payload.to_vec(), sequence: None })
}

fn with_length(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 2);
    out.extend_from_slice(&((body.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(body);
    out
}

pub fn open_ack() -> Vec<u8> {
    with_length(&[SF_FILE_TRANSFER, 0x00, 0x09])
}

/// Positive reply to a data insert, echoing the block number
pub fn data_ack(block: u32) -> Vec<u8> {
    let mut body = vec![SF_FILE_TRANSFER, 0x47, 0x05, 0x63, 0x06];
    body.extend_from_slice(&block.to_be_bytes());
    with_length(&body)
}

/// Answer to a Get request carrying upload block `block`
pub fn get_reply(block: u32, payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(payload.len() + 14);
    body.extend_from_slice(&[SF_FILE_TRANSFER, 0x46, 0x05, 0x63, 0x06]);
    body.extend_from_slice(&block.to_be_bytes());
    body.extend_from_slice(&DATA_HEADER);
    body.extend_from_slice(&((payload.len() + DATA_LENGTH_BIAS) as u16).to_be_bytes());
    body.extend_from_slice(payload);
    with_length(&body)
}

pub fn close_ack() -> Vec<u8> {
    with_length(&[SF_FILE_TRANSFER, 0x41, 0x09])
}

pub fn error_ack(request: u8, code: u16) -> Vec<u8> {
    let [hi, lo] = code.to_be_bytes();
    with_length(&[SF_FILE_TRANSFER, request, 0x08, 0x69, 0x04, hi, lo])
}

/// Build an open record as the host sends it
pub fn open_record(message: bool) -> Vec<u8> {
    let mut record = vec![
        SF_FILE_TRANSFER, 0x00, 0x12, 0x01, 0x05, 0x01, 0x01, 0x0A, 0x0A, 0x00, 0x00, 0x03, 0x09,
    ];
    record.extend_from_slice(if message { b"FT:MSG " } else { b"FT:DATA" });
    record
}

/// Build a data insert record as the host sends it
pub fn data_record(payload: &[u8]) -> Vec<u8> {
    let mut record = vec![SF_FILE_TRANSFER, 0x47, 0x04];
    record.extend_from_slice(&DATA_HEADER);
    record.extend_from_slice(&((payload.len() + DATA_LENGTH_BIAS) as u16).to_be_bytes());
    record.extend_from_slice(payload);
    record
}

pub fn close_record() -> Vec<u8> {
    vec![SF_FILE_TRANSFER, 0x41, 0x12]
}

pub fn get_record() -> Vec<u8> {
    vec![SF_FILE_TRANSFER, 0x46, 0x11]
}
