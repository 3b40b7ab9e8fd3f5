//! File transfer state machine
//!
//! One [`TransferEngine`] per session holds at most one open transfer.
//! Downloads accumulate records in arrival order; on close the payloads are
//! joined, converted and named, and the resulting [`FinalizedFile`] is moved
//! out to the caller. Uploads hold the local data and hand it out one block
//! per host Get request. Any protocol violation discards the transfer and
//! returns the engine to idle without producing a file.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use uuid::Uuid;

use super::command::IndFileCommand;
use crate::config::{ClientConfig, LineTerminator};
use crate::error::TransferProtocolError;

const PAD_SUB: u8 = 0x1A;
const PAD_NUL: u8 = 0x00;

/// Largest payload sent in one Get reply
pub const UPLOAD_BLOCK_SIZE: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Idle,
    Open,
    Receiving,
    Sending,
    Closed,
    Errored,
}

/// How the received data is finalized
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransferOptions {
    /// Host data set name
    pub name: String,
    pub ascii: bool,
    pub has_tlq: bool,
    pub record_format: Option<char>,
    /// The host's completion message rather than file data
    pub message: bool,
}

impl TransferOptions {
    pub fn from_command(command: &IndFileCommand) -> Self {
        Self {
            name: command.dataset.clone(),
            ascii: command.ascii,
            has_tlq: command.has_tlq,
            record_format: command.record_format,
            message: false,
        }
    }

    /// Options for the host's completion message
    pub fn message() -> Self {
        Self { ascii: true, message: true, ..Self::default() }
    }
}

/// Engine settings taken from the client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSettings {
    pub tlq: Option<String>,
    pub line_terminator: LineTerminator,
    pub max_transfer_bytes: usize,
}

impl From<&ClientConfig> for TransferSettings {
    fn from(config: &ClientConfig) -> Self {
        Self {
            tlq: config.tlq.clone(),
            line_terminator: config.line_terminator,
            max_transfer_bytes: config.max_transfer_bytes,
        }
    }
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

/// A completed transfer, owned by whoever receives it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedFile {
    pub id: Uuid,
    pub name: String,
    pub data: Vec<u8>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    File(FinalizedFile),
    /// Completion message from the host
    Message(String),
    /// An upload finished
    Sent { id: Uuid, bytes: usize },
    /// Close arrived with nothing open
    NothingOpen,
}

#[derive(Debug)]
enum Payload {
    Incoming(Vec<Vec<u8>>),
    Outgoing { data: Vec<u8>, blocks: u32 },
}

#[derive(Debug)]
struct TransferSession {
    id: Uuid,
    state: TransferState,
    options: TransferOptions,
    payload: Payload,
    /// Bytes received, or bytes handed out for an upload
    bytes: usize,
}

impl TransferSession {
    fn blocks(&self) -> u32 {
        match &self.payload {
            Payload::Incoming(records) => records.len() as u32,
            Payload::Outgoing { blocks, .. } => *blocks,
        }
    }
}

#[derive(Debug, Default)]
pub struct TransferEngine {
    settings: TransferSettings,
    session: Option<TransferSession>,
}

impl TransferEngine {
    pub fn new(settings: TransferSettings) -> Self {
        Self { settings, session: None }
    }

    pub fn state(&self) -> TransferState {
        self.session.as_ref().map_or(TransferState::Idle, |s| s.state)
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Bytes moved so far by the open transfer
    pub fn bytes_transferred(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.bytes)
    }

    /// Number of blocks received or sent so far by the open transfer
    pub fn blocks_transferred(&self) -> u32 {
        self.session.as_ref().map_or(0, TransferSession::blocks)
    }

    /// Idle -> Open for a download. An open transfer is left untouched.
    pub fn open(&mut self, options: TransferOptions) -> Result<Uuid, TransferProtocolError> {
        self.start(options, Payload::Incoming(Vec::new()))
    }

    /// Idle -> Open for an upload of `data`. ASCII data is sent with CRLF
    /// line endings.
    pub fn open_upload(
        &mut self,
        options: TransferOptions,
        data: &[u8],
    ) -> Result<Uuid, TransferProtocolError> {
        let data = if options.ascii {
            convert_line_endings(data, LineTerminator::CrLf)
        } else {
            data.to_vec()
        };
        let limit = self.settings.max_transfer_bytes;
        if data.len() > limit {
            warn!("upload of '{}' is {} bytes", options.name, data.len());
            return Err(TransferProtocolError::SizeLimit { limit });
        }
        self.start(options, Payload::Outgoing { data, blocks: 0 })
    }

    fn start(
        &mut self,
        options: TransferOptions,
        payload: Payload,
    ) -> Result<Uuid, TransferProtocolError> {
        if let Some(session) = &self.session {
            warn!("open while transfer {} is {:?}", session.id, session.state);
            return Err(TransferProtocolError::AlreadyOpen);
        }
        let id = Uuid::new_v4();
        let upload = matches!(payload, Payload::Outgoing { .. });
        info!(
            "transfer {id} opened for '{}' (ascii: {}, upload: {upload})",
            options.name, options.ascii
        );
        self.session = Some(TransferSession {
            id,
            state: TransferState::Open,
            options,
            payload,
            bytes: 0,
        });
        Ok(id)
    }

    /// Append one data record and return its block number, counting from 1.
    /// A record carrying its own sequence number must be the next block.
    pub fn add_record(
        &mut self,
        payload: &[u8],
        sequence: Option<u32>,
    ) -> Result<u32, TransferProtocolError> {
        let Some(session) = self.session.as_mut() else {
            warn!("data record with no transfer open");
            return Err(TransferProtocolError::DataWithoutOpen);
        };
        let Payload::Incoming(records) = &mut session.payload else {
            return Err(self.fail(TransferProtocolError::DataDuringUpload));
        };

        let expected = records.len() as u32 + 1;
        if let Some(got) = sequence {
            if got != expected {
                return Err(self.fail(TransferProtocolError::OutOfSequence { expected, got }));
            }
        }

        let limit = self.settings.max_transfer_bytes;
        if session.bytes + payload.len() > limit {
            return Err(self.fail(TransferProtocolError::SizeLimit { limit }));
        }

        records.push(payload.to_vec());
        session.state = TransferState::Receiving;
        session.bytes += payload.len();
        debug!("transfer {} block {expected}, {} bytes total", session.id, session.bytes);
        Ok(expected)
    }

    /// Hand out the next upload block with its number, counting from 1.
    /// `None` once all data has been sent.
    pub fn next_block(&mut self) -> Result<Option<(u32, Vec<u8>)>, TransferProtocolError> {
        let Some(session) = self.session.as_mut() else {
            warn!("get request with no transfer open");
            return Err(TransferProtocolError::NoUploadOpen);
        };
        let Payload::Outgoing { data, blocks } = &mut session.payload else {
            return Err(self.fail(TransferProtocolError::NoUploadOpen));
        };

        session.state = TransferState::Sending;
        if session.bytes >= data.len() {
            debug!("transfer {} has no more data after block {blocks}", session.id);
            return Ok(None);
        }
        let end = data.len().min(session.bytes + UPLOAD_BLOCK_SIZE);
        let block = data[session.bytes..end].to_vec();
        session.bytes = end;
        *blocks += 1;
        debug!("transfer {} sent block {blocks}, {} bytes total", session.id, session.bytes);
        Ok(Some((*blocks, block)))
    }

    /// Append the final payload and finalize. Close with nothing open is
    /// reported and otherwise ignored.
    pub fn close(&mut self, payload: &[u8]) -> Result<CloseOutcome, TransferProtocolError> {
        if self.session.is_none() {
            warn!("close with no transfer open");
            return Ok(CloseOutcome::NothingOpen);
        }
        if !payload.is_empty() {
            self.add_record(payload, None)?;
        }

        let Some(mut session) = self.session.take() else {
            return Ok(CloseOutcome::NothingOpen);
        };
        session.state = TransferState::Closed;

        if let Payload::Outgoing { data, .. } = &session.payload {
            info!(
                "transfer {} closed after sending {} of {} bytes",
                session.id,
                session.bytes,
                data.len()
            );
            return Ok(CloseOutcome::Sent { id: session.id, bytes: session.bytes });
        }

        let data = self.finalize_data(&session);
        if session.options.message {
            let text = String::from_utf8_lossy(&data).trim().to_string();
            info!("transfer {} host message: {text}", session.id);
            return Ok(CloseOutcome::Message(text));
        }

        let name = self.resolve_name(&session.options);
        info!("transfer {} closed: {name}, {} bytes", session.id, data.len());
        Ok(CloseOutcome::File(FinalizedFile {
            id: session.id,
            name,
            data,
            completed_at: Utc::now(),
        }))
    }

    /// Discard the open transfer, if any
    pub fn abort(&mut self, reason: &str) -> TransferProtocolError {
        self.fail(TransferProtocolError::Aborted(reason.to_string()))
    }

    fn fail(&mut self, error: TransferProtocolError) -> TransferProtocolError {
        if let Some(mut session) = self.session.take() {
            session.state = TransferState::Errored;
            warn!(
                "transfer {} errored after {} bytes: {error}",
                session.id, session.bytes
            );
        }
        error
    }

    fn finalize_data(&self, session: &TransferSession) -> Vec<u8> {
        let mut data = match &session.payload {
            Payload::Incoming(records) => records.concat(),
            Payload::Outgoing { .. } => Vec::new(),
        };
        if session.options.ascii {
            while matches!(data.last(), Some(&PAD_SUB) | Some(&PAD_NUL)) {
                data.pop();
            }
            data = convert_line_endings(&data, self.settings.line_terminator);
        }
        data
    }

    fn resolve_name(&self, options: &TransferOptions) -> String {
        let name = options.name.to_uppercase();
        match &self.settings.tlq {
            Some(tlq) if !options.has_tlq && !tlq.is_empty() => {
                format!("{}.{name}", tlq.to_uppercase())
            }
            _ => name,
        }
    }
}

/// Replace CRLF, lone CR and lone LF with `terminator`
pub fn convert_line_endings(data: &[u8], terminator: LineTerminator) -> Vec<u8> {
    let terminator = terminator.as_bytes();
    let mut out = Vec::with_capacity(data.len());
    let mut bytes = data.iter().copied().peekable();
    while let Some(byte) = bytes.next() {
        match byte {
            b'\r' => {
                bytes.next_if_eq(&b'\n');
                out.extend_from_slice(terminator);
            }
            b'\n' => out.extend_from_slice(terminator),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> TransferEngine {
        TransferEngine::new(TransferSettings::default())
    }

    fn binary(name: &str) -> TransferOptions {
        TransferOptions { name: name.to_string(), ..TransferOptions::default() }
    }

    fn text(name: &str) -> TransferOptions {
        TransferOptions { ascii: true, ..binary(name) }
    }

    fn finalized(outcome: Result<CloseOutcome, TransferProtocolError>) -> FinalizedFile {
        match outcome {
            Ok(CloseOutcome::File(file)) => file,
            other => panic!("expected a file, got {other:?}"),
        }
    }

    #[test]
    fn test_happy_path() {
        let mut engine = engine();
        engine.open(binary("data")).unwrap();
        assert_eq!(engine.add_record(b"AAA", None), Ok(1));
        assert_eq!(engine.state(), TransferState::Receiving);
        assert_eq!(engine.add_record(b"BBB", None), Ok(2));

        let file = finalized(engine.close(b""));
        assert_eq!(file.data, b"AAABBB");
        assert_eq!(file.name, "DATA");
        assert_eq!(engine.state(), TransferState::Idle);
    }

    #[test]
    fn test_data_without_open() {
        let mut engine = engine();
        assert_eq!(engine.add_record(b"AAA", None), Err(TransferProtocolError::DataWithoutOpen));
        assert_eq!(engine.state(), TransferState::Idle);
        assert!(!engine.is_active());
    }

    #[test]
    fn test_double_open_keeps_first_session() {
        let mut engine = engine();
        let first = engine.open(binary("first")).unwrap();
        engine.add_record(b"AAA", None).unwrap();
        assert_eq!(engine.open(binary("second")), Err(TransferProtocolError::AlreadyOpen));
        assert_eq!(engine.bytes_transferred(), 3);

        let file = finalized(engine.close(b""));
        assert_eq!(file.id, first);
        assert_eq!(file.name, "FIRST");
        assert_eq!(file.data, b"AAA");
    }

    #[test]
    fn test_close_without_open_is_not_an_error() {
        let mut engine = engine();
        assert_eq!(engine.close(b""), Ok(CloseOutcome::NothingOpen));
    }

    #[test]
    fn test_close_from_open_gives_empty_file() {
        let mut engine = engine();
        engine.open(binary("empty")).unwrap();
        let file = finalized(engine.close(b""));
        assert!(file.data.is_empty());
    }

    #[test]
    fn test_close_appends_final_payload() {
        let mut engine = engine();
        engine.open(binary("x")).unwrap();
        engine.add_record(b"AB", None).unwrap();
        let file = finalized(engine.close(b"CD"));
        assert_eq!(file.data, b"ABCD");
    }

    #[test]
    fn test_out_of_sequence_discards() {
        let mut engine = engine();
        engine.open(binary("x")).unwrap();
        engine.add_record(b"A", Some(1)).unwrap();
        assert_eq!(
            engine.add_record(b"C", Some(3)),
            Err(TransferProtocolError::OutOfSequence { expected: 2, got: 3 })
        );
        assert_eq!(engine.state(), TransferState::Idle);
        assert_eq!(engine.close(b""), Ok(CloseOutcome::NothingOpen));
    }

    #[test]
    fn test_size_limit() {
        let mut engine = TransferEngine::new(TransferSettings {
            max_transfer_bytes: 4,
            ..TransferSettings::default()
        });
        engine.open(binary("x")).unwrap();
        engine.add_record(b"AAA", None).unwrap();
        assert_eq!(
            engine.add_record(b"BB", None),
            Err(TransferProtocolError::SizeLimit { limit: 4 })
        );
        assert!(!engine.is_active());
    }

    #[test]
    fn test_abort() {
        let mut engine = engine();
        engine.open(binary("x")).unwrap();
        assert_eq!(
            engine.abort("user cancel"),
            TransferProtocolError::Aborted("user cancel".to_string())
        );
        assert_eq!(engine.state(), TransferState::Idle);
    }

    #[test]
    fn test_ascii_conversion_and_padding() {
        let mut engine = TransferEngine::new(TransferSettings {
            line_terminator: LineTerminator::Lf,
            ..TransferSettings::default()
        });
        engine.open(text("t")).unwrap();
        engine.add_record(b"ONE\r\nTWO\rTHREE\n", None).unwrap();
        engine.add_record(b"FOUR\r\n\x1a\x00\x1a", None).unwrap();
        let file = finalized(engine.close(b""));
        assert_eq!(file.data, b"ONE\nTWO\nTHREE\nFOUR\n");
    }

    #[test]
    fn test_binary_passes_through() {
        let mut engine = engine();
        engine.open(binary("b")).unwrap();
        engine.add_record(b"ONE\r\nTWO\x1a", None).unwrap();
        let file = finalized(engine.close(b""));
        assert_eq!(file.data, b"ONE\r\nTWO\x1a");
    }

    #[test]
    fn test_tlq_prefix() {
        let mut engine = TransferEngine::new(TransferSettings {
            tlq: Some("user1".to_string()),
            ..TransferSettings::default()
        });
        engine.open(binary("report.data")).unwrap();
        let file = finalized(engine.close(b""));
        assert_eq!(file.name, "USER1.REPORT.DATA");

        engine
            .open(TransferOptions {
                name: "sys1.maclib".to_string(),
                has_tlq: true,
                ..TransferOptions::default()
            })
            .unwrap();
        let file = finalized(engine.close(b""));
        assert_eq!(file.name, "SYS1.MACLIB");
    }

    #[test]
    fn test_message_transfer() {
        let mut engine = engine();
        engine.open(TransferOptions::message()).unwrap();
        engine.add_record(b"TRANS03 File transfer complete\r\n\x00", None).unwrap();
        assert_eq!(
            engine.close(b""),
            Ok(CloseOutcome::Message("TRANS03 File transfer complete".to_string()))
        );
    }

    #[test]
    fn test_upload_blocks() {
        let mut engine = engine();
        let data = vec![b'X'; UPLOAD_BLOCK_SIZE + 10];
        let id = engine.open_upload(binary("up"), &data).unwrap();
        assert_eq!(engine.state(), TransferState::Open);

        let (block, first) = engine.next_block().unwrap().unwrap();
        assert_eq!((block, first.len()), (1, UPLOAD_BLOCK_SIZE));
        assert_eq!(engine.state(), TransferState::Sending);
        let (block, second) = engine.next_block().unwrap().unwrap();
        assert_eq!((block, second.len()), (2, 10));
        assert_eq!(engine.next_block(), Ok(None));
        assert_eq!(engine.blocks_transferred(), 2);

        assert_eq!(engine.close(b""), Ok(CloseOutcome::Sent { id, bytes: UPLOAD_BLOCK_SIZE + 10 }));
        assert!(!engine.is_active());
    }

    #[test]
    fn test_ascii_upload_sends_crlf() {
        let mut engine = TransferEngine::new(TransferSettings {
            line_terminator: LineTerminator::Lf,
            ..TransferSettings::default()
        });
        engine.open_upload(text("t"), b"L1\nL2\n").unwrap();
        assert_eq!(engine.next_block(), Ok(Some((1, b"L1\r\nL2\r\n".to_vec()))));
    }

    #[test]
    fn test_upload_over_limit_is_refused() {
        let mut engine = TransferEngine::new(TransferSettings {
            max_transfer_bytes: 4,
            ..TransferSettings::default()
        });
        assert_eq!(
            engine.open_upload(binary("x"), b"ABCDE"),
            Err(TransferProtocolError::SizeLimit { limit: 4 })
        );
        assert!(!engine.is_active());
    }

    #[test]
    fn test_get_without_upload() {
        let mut engine = engine();
        assert_eq!(engine.next_block(), Err(TransferProtocolError::NoUploadOpen));

        engine.open(binary("down")).unwrap();
        assert_eq!(engine.next_block(), Err(TransferProtocolError::NoUploadOpen));
        assert!(!engine.is_active());
    }

    #[test]
    fn test_data_during_upload_discards() {
        let mut engine = engine();
        engine.open_upload(binary("up"), b"AB").unwrap();
        assert_eq!(engine.add_record(b"CD", None), Err(TransferProtocolError::DataDuringUpload));
        assert_eq!(engine.state(), TransferState::Idle);
    }

    #[test]
    fn test_convert_line_endings_crlf() {
        assert_eq!(convert_line_endings(b"A\nB\r\nC\r", LineTerminator::CrLf), b"A\r\nB\r\nC\r\n");
    }
}
