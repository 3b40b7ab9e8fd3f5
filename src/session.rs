//! Active session for tn3270r
//!
//! A [`Session`] ties one screen to its codec and transfer engine. The
//! telnet layer feeds it de-framed inbound messages and writes back whatever
//! it returns. Observers hear about the screen once per message.

use log::{debug, info, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::ebcdic;
use crate::error::{InputError, MessageError, Tn3270Error, TransferProtocolError};
use crate::lib3270::{AidKey, Effect, Field, ScreenBuffer, StreamCodec, AID_STRUCTURED_FIELD};
use crate::transfer::command::Direction;
use crate::transfer::engine::{CloseOutcome, TransferEngine, TransferOptions, TransferSettings};
use crate::transfer::record::{self, TransferRecord, ERR_COMMAND_FAILED, ERR_END_OF_FILE};
use crate::transfer::{FileStore, IndFileCommand};

/// Name given to a download when no IND$FILE command was staged
const DEFAULT_TRANSFER_NAME: &str = "DOWNLOAD";

const MAX_HISTORY: usize = 100;

/// Receives screen updates. Called synchronously after each inbound message.
pub trait ScreenObserver {
    fn on_screen_changed(&mut self, screen: &ScreenBuffer);

    fn on_keyboard_status_changed(&mut self, _locked: bool) {}
}

/// An IND$FILE command waiting for the host to open its transfer
#[derive(Debug)]
struct StagedTransfer {
    command: IndFileCommand,
    /// Local data for a PUT
    upload: Option<Vec<u8>>,
}

pub struct Session {
    id: Uuid,
    screen: ScreenBuffer,
    codec: StreamCodec,
    engine: TransferEngine,
    store: Box<dyn FileStore>,
    observers: Vec<Box<dyn ScreenObserver>>,
    /// Consumed by the next successful open
    staged: Option<StagedTransfer>,
    command_history: Vec<String>,
    host_message: Option<String>,
    transfer_error: Option<Tn3270Error>,
}

impl Session {
    pub fn new(config: &ClientConfig, store: Box<dyn FileStore>) -> Self {
        let mut screen = ScreenBuffer::new(config.primary_model);
        screen.set_command_prompts(config.command_prompts.clone());
        let id = Uuid::new_v4();
        debug!("session {id} created ({:?}/{:?})", config.primary_model, config.alternate_model);

        Self {
            id,
            screen,
            codec: StreamCodec::new(config.primary_model, config.alternate_model),
            engine: TransferEngine::new(TransferSettings::from(config)),
            store,
            observers: Vec::new(),
            staged: None,
            command_history: Vec::new(),
            host_message: None,
            transfer_error: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn screen(&self) -> &ScreenBuffer {
        &self.screen
    }

    pub fn codec(&self) -> &StreamCodec {
        &self.codec
    }

    pub fn engine(&self) -> &TransferEngine {
        &self.engine
    }

    /// Completion text from the last message transfer (FT:MSG)
    pub fn host_message(&self) -> Option<&str> {
        self.host_message.as_deref()
    }

    /// Commands entered with Enter, oldest first, without repeats
    pub fn command_history(&self) -> &[String] {
        &self.command_history
    }

    /// The last transfer failure. The host has already been sent an error
    /// reply for it.
    pub fn take_transfer_error(&mut self) -> Option<Tn3270Error> {
        self.transfer_error.take()
    }

    pub fn subscribe(&mut self, observer: Box<dyn ScreenObserver>) {
        self.observers.push(observer);
    }

    /// Process one inbound message and return the outbound messages to
    /// write, in order.
    ///
    /// A decode error ends the message: orders decoded before it stay
    /// applied, observers are still notified and the replies built so far
    /// come back inside the [`MessageError`]. Transfer failures do not fail
    /// the message; they are answered with an error reply and kept for
    /// [`Session::take_transfer_error`].
    pub fn process_message(&mut self, message: &[u8]) -> Result<Vec<Vec<u8>>, MessageError> {
        let was_locked = self.screen.is_keyboard_locked();
        let mut effects = Vec::new();
        let decoded = self.codec.process(&mut self.screen, message, &mut effects);

        let mut outbound = Vec::with_capacity(effects.len());
        for effect in effects {
            match effect {
                Effect::Reply(reply) => outbound.push(reply),
                Effect::FileTransfer(data) => {
                    if let Some(reply) = self.handle_transfer(&data) {
                        outbound.push(reply);
                    }
                }
            }
        }

        self.notify(was_locked);
        match decoded {
            Ok(()) => Ok(outbound),
            Err(error) => Err(MessageError { replies: outbound, error }),
        }
    }

    /// Press an AID key and build the message to send. Enter also records
    /// the entered command and stages it when it is an IND$FILE command.
    pub fn send_aid(&mut self, aid: AidKey) -> Vec<u8> {
        if aid == AidKey::Enter {
            self.capture_command();
        }
        let was_locked = self.screen.is_keyboard_locked();
        self.codec.set_aid(aid);
        let reply = self.codec.read_modified(&self.screen, aid, false);
        self.screen.lock_keyboard();
        self.notify_keyboard(was_locked);
        reply
    }

    /// Like [`Session::send_aid`], but short-read keys aside, every
    /// unprotected field must pass its validation first
    pub fn submit(&mut self, aid: AidKey) -> Result<Vec<u8>, InputError> {
        if !aid.is_short_read() {
            self.validate_input()?;
        }
        Ok(self.send_aid(aid))
    }

    /// Check every unprotected field against its validation attributes
    pub fn validate_input(&self) -> Result<(), InputError> {
        let cells = self.screen.cells();
        self.screen
            .field_index()
            .unprotected_fields()
            .try_for_each(|field| field.validate_content(&field.data(cells)))
    }

    pub fn type_char(&mut self, position: usize, value: u8) -> Result<(), InputError> {
        self.screen.type_char(position, value)
    }

    /// Type ASCII text starting at the cursor
    pub fn type_text(&mut self, text: &str) -> Result<(), InputError> {
        for byte in ebcdic::ascii_to_ebcdic_vec(text) {
            let position = self.screen.cursor();
            self.screen.type_char(position, byte)?;
        }
        Ok(())
    }

    /// Type an IND$FILE GET command and press Enter. The command goes into
    /// the command field when the screen has one, with a `TSO` prefix, and
    /// at the cursor otherwise. Its options shape the file the host sends
    /// back. Nothing is typed unless the whole command fits.
    pub fn submit_transfer(&mut self, command: IndFileCommand) -> Result<Vec<u8>, Tn3270Error> {
        if command.direction == Direction::Put {
            let reason = format!("PUT {} needs local data", command.dataset);
            return Err(TransferProtocolError::InvalidCommand(reason).into());
        }
        self.enter_command(command, None)
    }

    /// Type an IND$FILE PUT command and press Enter. `data` is sent to the
    /// host block by block as it asks for it.
    pub fn submit_upload(
        &mut self,
        command: IndFileCommand,
        data: Vec<u8>,
    ) -> Result<Vec<u8>, Tn3270Error> {
        if command.direction == Direction::Get {
            let reason = format!("GET {} takes no local data", command.dataset);
            return Err(TransferProtocolError::InvalidCommand(reason).into());
        }
        self.enter_command(command, Some(data))
    }

    fn enter_command(
        &mut self,
        command: IndFileCommand,
        upload: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, Tn3270Error> {
        let command_field = self.screen.field_index().command_field().cloned();
        let line = command.command_line(command_field.is_none());
        let text = ebcdic::ascii_to_ebcdic_vec(&line);
        self.check_room(command_field.as_ref(), &text)?;

        match command_field {
            Some(field) => {
                for (position, &byte) in field.data_positions().zip(&text) {
                    self.screen.type_char(position, byte)?;
                }
                for position in field.data_positions().skip(text.len()) {
                    if !self.screen.cell(position).is_null() {
                        self.screen.type_char(position, 0x00)?;
                    }
                }
            }
            None => {
                for &byte in &text {
                    let position = self.screen.cursor();
                    self.screen.type_char(position, byte)?;
                }
            }
        }

        info!("session {} submitting: {line}", self.id);
        let sent = self.send_aid(AidKey::Enter);
        self.staged = Some(StagedTransfer { command, upload });
        Ok(sent)
    }

    /// Check that `text` can be typed in one go, into `command_field` from
    /// its first data position or at the cursor
    fn check_room(&self, command_field: Option<&Field>, text: &[u8]) -> Result<(), InputError> {
        if self.screen.is_keyboard_locked() {
            return Err(InputError::KeyboardLocked);
        }
        let cursor = self.screen.cursor();
        let (field, capacity) = match command_field {
            Some(field) => (Some(field), field.data_len()),
            None => match self.screen.field_index().field_at(cursor) {
                Some(field) if field.is_protected() => {
                    return Err(InputError::Protected { position: cursor });
                }
                Some(field) => {
                    let room = field.data_positions().skip_while(|&p| p != cursor).count();
                    (Some(field), room)
                }
                None => (None, self.screen.buffer_size() - cursor),
            },
        };

        if text.len() > capacity {
            return Err(InputError::FieldOverflow {
                field: field.map_or(cursor, Field::start),
                length: text.len(),
                capacity,
            });
        }
        if let Some(field) = field.filter(|field| field.attribute().is_numeric()) {
            let digit = |byte: u8| (0xF0..=0xF9).contains(&byte) || byte == 0x40;
            if let Some(&byte) = text.iter().find(|&&byte| !digit(byte)) {
                return Err(InputError::NumericOnly { field: field.start(), byte });
            }
        }
        Ok(())
    }

    /// Record the command being entered: the command field's text, or on
    /// an unformatted screen the row the operator last typed on
    fn capture_command(&mut self) {
        let Some(line) = self.entered_line() else { return };
        let line = line.trim();
        if line.is_empty() || line.starts_with('=') {
            return;
        }

        self.command_history.retain(|entry| entry != line);
        self.command_history.push(line.to_string());
        if self.command_history.len() > MAX_HISTORY {
            self.command_history.remove(0);
        }

        if let Ok(command) = IndFileCommand::parse(line) {
            debug!("session {} staged typed command: {command}", self.id);
            self.staged = Some(StagedTransfer { command, upload: None });
        }
    }

    fn entered_line(&self) -> Option<String> {
        let index = self.screen.field_index();
        if let Some(field) = index.command_field() {
            return Some(field.text(self.screen.cells()));
        }
        if !index.is_unformatted() {
            return None;
        }
        let size = self.screen.buffer_size();
        let last_typed = (self.screen.cursor() + size - 1) % size;
        self.screen.row_text(last_typed / self.screen.cols())
    }

    /// Handle one DFT record and build the reply, if any
    fn handle_transfer(&mut self, data: &[u8]) -> Option<Vec<u8>> {
        let parsed = TransferRecord::parse(data);
        let request = match &parsed {
            Ok(record) => record.request_byte(),
            Err(_) => data.get(1).copied().unwrap_or_default(),
        };

        let result = parsed
            .map_err(Tn3270Error::from)
            .and_then(|record| self.apply_transfer_record(record));

        let ack = match result {
            Ok(ack) => ack?,
            Err(err) => {
                warn!("session {} transfer failed: {err}", self.id);
                self.transfer_error = Some(err);
                record::error_ack(request, ERR_COMMAND_FAILED)
            }
        };

        let mut reply = Vec::with_capacity(ack.len() + 1);
        reply.push(AID_STRUCTURED_FIELD);
        reply.extend(ack);
        Some(reply)
    }

    fn apply_transfer_record(
        &mut self,
        transfer: TransferRecord,
    ) -> Result<Option<Vec<u8>>, Tn3270Error> {
        match transfer {
            TransferRecord::Open { message: true } => {
                self.engine.open(TransferOptions::message())?;
                Ok(Some(record::open_ack()))
            }
            TransferRecord::Open { message: false } => {
                self.open_staged()?;
                Ok(Some(record::open_ack()))
            }
            TransferRecord::Data { payload, sequence } => {
                let block = self.engine.add_record(&payload, sequence)?;
                Ok(Some(record::data_ack(block)))
            }
            TransferRecord::Get => match self.engine.next_block()? {
                Some((block, payload)) => Ok(Some(record::get_reply(block, &payload))),
                None => {
                    let request = TransferRecord::Get.request_byte();
                    Ok(Some(record::error_ack(request, ERR_END_OF_FILE)))
                }
            },
            TransferRecord::Close => {
                match self.engine.close(&[])? {
                    CloseOutcome::File(file) => self.store.store(file)?,
                    CloseOutcome::Message(text) => self.host_message = Some(text),
                    CloseOutcome::Sent { id, bytes } => {
                        info!("session {} upload {id} sent {bytes} bytes", self.id);
                    }
                    CloseOutcome::NothingOpen => {}
                }
                Ok(Some(record::close_ack()))
            }
            TransferRecord::SetCursor | TransferRecord::InsertRequest => Ok(None),
        }
    }

    /// Open a transfer for the staged command. The command stays staged
    /// when another transfer is still open.
    fn open_staged(&mut self) -> Result<Uuid, TransferProtocolError> {
        let opened = match &self.staged {
            Some(StagedTransfer { command, upload }) => {
                let options = TransferOptions::from_command(command);
                match (command.direction, upload) {
                    (Direction::Get, _) => self.engine.open(options),
                    (Direction::Put, Some(data)) => self.engine.open_upload(options, data),
                    (Direction::Put, None) => {
                        let reason = format!("no local data for PUT {}", command.dataset);
                        Err(TransferProtocolError::InvalidCommand(reason))
                    }
                }
            }
            None => {
                warn!("transfer opened without a staged command");
                self.engine.open(TransferOptions {
                    name: DEFAULT_TRANSFER_NAME.to_string(),
                    ..TransferOptions::default()
                })
            }
        };

        if !matches!(opened, Err(TransferProtocolError::AlreadyOpen)) {
            self.staged = None;
        }
        opened
    }

    /// Discard the open transfer, if any
    pub fn abort_transfer(&mut self, reason: &str) -> TransferProtocolError {
        self.engine.abort(reason)
    }

    fn notify(&mut self, was_locked: bool) {
        for observer in &mut self.observers {
            observer.on_screen_changed(&self.screen);
        }
        self.notify_keyboard(was_locked);
    }

    fn notify_keyboard(&mut self, was_locked: bool) {
        let locked = self.screen.is_keyboard_locked();
        if locked != was_locked {
            for observer in &mut self.observers {
                observer.on_keyboard_status_changed(locked);
            }
        }
    }
}
