//! 3270 data stream codec
//!
//! Inbound messages are a command byte followed by a body. Write-family
//! bodies are a WCC and an order sequence: the orders are decoded into a
//! `Vec<Order>` first and then applied to the [`ScreenBuffer`] in sequence.
//! When decoding fails part way, the orders decoded so far are still applied
//! and the error is returned afterwards.
//!
//! Outbound replies (Read Buffer, Read Modified, query replies) are built from
//! the buffer here as well.

use log::{debug, trace, warn};

use super::attribute::{Attribute, StartFieldAttribute};
use super::cell::{Cell, FieldForm};
use super::codes::*;
use super::display::{addressing, ScreenBuffer, ScreenSize};
use super::query;
use crate::error::DecodeError;

/// A decoded order, or a run of plain data bytes
#[derive(Debug, Clone, PartialEq)]
pub enum Order {
    SetBufferAddress(usize),
    StartField(StartFieldAttribute),
    StartFieldExtended {
        attribute: StartFieldAttribute,
        extended: Vec<Attribute>,
    },
    SetAttribute(Attribute),
    ModifyField {
        attribute: Option<StartFieldAttribute>,
        extended: Vec<Attribute>,
    },
    InsertCursor,
    ProgramTab,
    RepeatToAddress {
        stop: usize,
        value: u8,
        graphics: bool,
    },
    EraseUnprotectedToAddress(usize),
    GraphicEscape(u8),
    Text(Vec<u8>),
}

impl Order {
    pub fn apply(&self, screen: &mut ScreenBuffer) {
        match self {
            Self::SetBufferAddress(address) => screen.set_buffer_address(*address),
            Self::StartField(attribute) => screen.start_field(*attribute),
            Self::StartFieldExtended { attribute, extended } => {
                screen.start_field_extended(*attribute, extended.clone())
            }
            Self::SetAttribute(attribute) => screen.set_attribute(*attribute),
            Self::ModifyField { attribute, extended } => {
                screen.modify_field(*attribute, extended.clone())
            }
            Self::InsertCursor => screen.insert_cursor(),
            Self::ProgramTab => screen.program_tab(),
            Self::RepeatToAddress { stop, value, graphics } => {
                screen.repeat_to_address(*stop, *value, *graphics)
            }
            Self::EraseUnprotectedToAddress(stop) => screen.erase_unprotected_to_address(*stop),
            Self::GraphicEscape(value) => screen.write_graphics(*value),
            Self::Text(bytes) => {
                for &byte in bytes {
                    screen.write_char(byte);
                }
            }
        }
    }
}

/// Orders decoded from one order sequence. `error` is set when decoding
/// stopped early; `orders` then holds everything before the failure.
#[derive(Debug, Default)]
pub struct DecodedOrders {
    pub orders: Vec<Order>,
    pub error: Option<DecodeError>,
}

/// Decode an order sequence. `base` is the offset of `data` within the
/// message, used in error reports.
pub fn decode_orders(data: &[u8], base: usize) -> DecodedOrders {
    let mut parser = OrderParser { data, pos: 0, base };
    let mut decoded = DecodedOrders::default();
    while parser.pos < data.len() {
        match parser.next_order() {
            Ok(Some(order)) => decoded.orders.push(order),
            Ok(None) => {}
            Err(err) => {
                decoded.error = Some(err);
                break;
            }
        }
    }
    decoded
}

struct OrderParser<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> OrderParser<'a> {
    fn truncated(&self, what: &'static str) -> DecodeError {
        DecodeError::Truncated { what, offset: self.base + self.pos }
    }

    fn byte(&mut self, what: &'static str) -> Result<u8, DecodeError> {
        let byte = *self.data.get(self.pos).ok_or_else(|| self.truncated(what))?;
        self.pos += 1;
        Ok(byte)
    }

    fn address(&mut self, what: &'static str) -> Result<usize, DecodeError> {
        if self.pos + 2 > self.data.len() {
            return Err(self.truncated(what));
        }
        let address = addressing::decode(self.data[self.pos], self.data[self.pos + 1]);
        self.pos += 2;
        Ok(address)
    }

    fn pairs(&mut self, what: &'static str) -> Result<Vec<(u8, u8)>, DecodeError> {
        let count = self.byte(what)? as usize;
        if self.pos + count * 2 > self.data.len() {
            return Err(self.truncated(what));
        }
        let pairs = self.data[self.pos..self.pos + count * 2]
            .chunks_exact(2)
            .map(|pair| (pair[0], pair[1]))
            .collect();
        self.pos += count * 2;
        Ok(pairs)
    }

    /// `None` for orders that carry nothing this terminal keeps, such as an
    /// SA with an unknown type.
    fn next_order(&mut self) -> Result<Option<Order>, DecodeError> {
        let byte = self.data[self.pos];
        let Some(order) = OrderCode::from_u8(byte) else {
            let start = self.pos;
            while self.pos < self.data.len() && OrderCode::from_u8(self.data[self.pos]).is_none() {
                self.pos += 1;
            }
            return Ok(Some(Order::Text(self.data[start..self.pos].to_vec())));
        };
        self.pos += 1;
        trace!("order {order:?} at offset {}", self.base + self.pos - 1);

        let decoded = match order {
            OrderCode::StartField => Order::StartField(StartFieldAttribute::new(self.byte("SF")?)),
            OrderCode::StartFieldExtended => {
                let (attribute, extended) = split_field_pairs(self.pairs("SFE")?);
                Order::StartFieldExtended {
                    attribute: attribute.unwrap_or_default(),
                    extended,
                }
            }
            OrderCode::SetBufferAddress => Order::SetBufferAddress(self.address("SBA")?),
            OrderCode::SetAttribute => {
                if self.pos + 2 > self.data.len() {
                    return Err(self.truncated("SA"));
                }
                let (kind, value) = (self.data[self.pos], self.data[self.pos + 1]);
                self.pos += 2;
                match Attribute::from_pair(kind, value) {
                    Some(attribute) => Order::SetAttribute(attribute),
                    None => return Ok(None),
                }
            }
            OrderCode::ModifyField => {
                let (attribute, extended) = split_field_pairs(self.pairs("MF")?);
                Order::ModifyField { attribute, extended }
            }
            OrderCode::InsertCursor => Order::InsertCursor,
            OrderCode::ProgramTab => Order::ProgramTab,
            OrderCode::RepeatToAddress => {
                let stop = self.address("RA")?;
                let mut value = self.byte("RA")?;
                let graphics = value == ORDER_GE;
                if graphics {
                    value = self.byte("RA")?;
                }
                Order::RepeatToAddress { stop, value, graphics }
            }
            OrderCode::EraseUnprotectedToAddress => {
                Order::EraseUnprotectedToAddress(self.address("EUA")?)
            }
            OrderCode::GraphicEscape => Order::GraphicEscape(self.byte("GE")?),
        };
        Ok(Some(decoded))
    }
}

/// Separate the field attribute pair (type 0xC0) from character attributes
fn split_field_pairs(pairs: Vec<(u8, u8)>) -> (Option<StartFieldAttribute>, Vec<Attribute>) {
    let mut attribute = None;
    let mut extended = Vec::with_capacity(pairs.len());
    for (kind, value) in pairs {
        if kind == XA_3270 {
            attribute = Some(StartFieldAttribute::new(value));
        } else if let Some(attr) = Attribute::from_pair(kind, value) {
            extended.push(attr);
        }
    }
    (attribute, extended)
}

/// How outbound replies encode fields and character attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyMode {
    #[default]
    Field,
    ExtendedField,
    Character,
}

impl ReplyMode {
    fn from_code(code: u8) -> Option<Self> {
        match code {
            REPLY_MODE_FIELD => Some(Self::Field),
            REPLY_MODE_EXTENDED_FIELD => Some(Self::ExtendedField),
            REPLY_MODE_CHARACTER => Some(Self::Character),
            _ => None,
        }
    }

    fn field_form(self) -> FieldForm {
        match self {
            Self::Field => FieldForm::Basic,
            Self::ExtendedField | Self::Character => FieldForm::Extended,
        }
    }
}

/// Something the caller has to act on after a message
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Outbound message to write to the host verbatim
    Reply(Vec<u8>),
    /// File transfer structured field, starting at its 0xD0 id byte
    FileTransfer(Vec<u8>),
}

/// Stateful decoder/encoder for one session
#[derive(Debug)]
pub struct StreamCodec {
    aid: AidKey,
    reply_mode: ReplyMode,
    reply_types: Vec<u8>,
    primary: ScreenSize,
    alternate: ScreenSize,
}

impl StreamCodec {
    pub fn new(primary: ScreenSize, alternate: ScreenSize) -> Self {
        Self {
            aid: AidKey::NoAid,
            reply_mode: ReplyMode::Field,
            reply_types: Vec::new(),
            primary,
            alternate,
        }
    }

    pub fn aid(&self) -> AidKey {
        self.aid
    }

    pub fn set_aid(&mut self, aid: AidKey) {
        self.aid = aid;
    }

    pub fn reply_mode(&self) -> ReplyMode {
        self.reply_mode
    }

    /// Attribute types included in character-mode replies
    pub fn reply_types(&self) -> &[u8] {
        &self.reply_types
    }

    /// Process one inbound message, pushing anything the caller must act on
    /// into `effects`. On error the screen holds whatever was applied before
    /// the failure.
    pub fn process(
        &mut self,
        screen: &mut ScreenBuffer,
        message: &[u8],
        effects: &mut Vec<Effect>,
    ) -> Result<(), DecodeError> {
        let Some((&command_byte, body)) = message.split_first() else {
            return Ok(());
        };
        let command =
            CommandCode::from_u8(command_byte).ok_or(DecodeError::UnknownCommand(command_byte))?;
        debug!("command {command:?} with {} body bytes", body.len());
        self.process_command(screen, command, body, 1, effects)
    }

    fn process_command(
        &mut self,
        screen: &mut ScreenBuffer,
        command: CommandCode,
        body: &[u8],
        offset: usize,
        effects: &mut Vec<Effect>,
    ) -> Result<(), DecodeError> {
        match command {
            CommandCode::Write => self.process_write(screen, body, offset, None),
            CommandCode::EraseWrite => self.process_write(screen, body, offset, Some(self.primary)),
            CommandCode::EraseWriteAlternate => {
                self.process_write(screen, body, offset, Some(self.alternate))
            }
            CommandCode::ReadBuffer => {
                effects.push(Effect::Reply(self.read_buffer(screen)));
                Ok(())
            }
            CommandCode::ReadModified => {
                effects.push(Effect::Reply(self.read_modified(screen, self.aid, false)));
                Ok(())
            }
            CommandCode::ReadModifiedAll => {
                effects.push(Effect::Reply(self.read_modified(screen, self.aid, true)));
                Ok(())
            }
            CommandCode::EraseAllUnprotected => {
                screen.erase_all_unprotected();
                self.aid = AidKey::NoAid;
                screen.resolve_contexts();
                Ok(())
            }
            CommandCode::WriteStructuredField => {
                self.process_structured_fields(screen, body, offset, effects)
            }
        }
    }

    /// Write, Erase/Write and Erase/Write Alternate
    fn process_write(
        &mut self,
        screen: &mut ScreenBuffer,
        body: &[u8],
        offset: usize,
        erase_to: Option<ScreenSize>,
    ) -> Result<(), DecodeError> {
        screen.lock_keyboard();

        let Some((&wcc, orders)) = body.split_first() else {
            return Err(DecodeError::Truncated { what: "WCC", offset });
        };
        trace!("WCC 0x{wcc:02X}");

        if let Some(size) = erase_to {
            screen.erase_to(size);
        }
        if (wcc & WCC_RESET) != 0 {
            self.reply_mode = ReplyMode::Field;
            self.reply_types.clear();
        }
        if (wcc & WCC_RESET_MDT) != 0 {
            screen.reset_modified();
        }

        let decoded = decode_orders(orders, offset + 1);
        for order in &decoded.orders {
            order.apply(screen);
        }

        if (wcc & WCC_ALARM) != 0 {
            screen.set_alarm(true);
        }
        if (wcc & WCC_RESTORE) != 0 {
            screen.unlock_keyboard();
            self.aid = AidKey::NoAid;
        }
        screen.resolve_contexts();

        match decoded.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Split a WSF body into records and dispatch each one
    fn process_structured_fields(
        &mut self,
        screen: &mut ScreenBuffer,
        body: &[u8],
        offset: usize,
        effects: &mut Vec<Effect>,
    ) -> Result<(), DecodeError> {
        let mut pos = 0;
        while pos < body.len() {
            if pos + 2 > body.len() {
                return Err(DecodeError::Truncated {
                    what: "structured field length",
                    offset: offset + pos,
                });
            }
            let declared = u16::from_be_bytes([body[pos], body[pos + 1]]) as usize;
            let length = if declared == 0 { body.len() - pos } else { declared };
            if length < 3 || pos + length > body.len() {
                return Err(DecodeError::BadStructuredFieldLength { offset: offset + pos, length });
            }

            let record = &body[pos + 2..pos + length];
            self.process_structured_field(screen, record, offset + pos + 2, effects)?;
            pos += length;
        }
        Ok(())
    }

    /// `record` starts at the structured field id
    fn process_structured_field(
        &mut self,
        screen: &mut ScreenBuffer,
        record: &[u8],
        offset: usize,
        effects: &mut Vec<Effect>,
    ) -> Result<(), DecodeError> {
        let id = record[0];
        let data = &record[1..];
        debug!("structured field 0x{id:02X}, {} bytes", data.len());

        match id {
            SF_READ_PARTITION => {
                if data.len() < 2 {
                    return Err(DecodeError::Truncated { what: "Read Partition", offset });
                }
                match data[1] {
                    RP_QUERY | RP_QUERY_LIST => {
                        let mut reply = vec![AID_STRUCTURED_FIELD];
                        reply.extend(query::query_replies(self.primary, self.alternate));
                        effects.push(Effect::Reply(reply));
                    }
                    RP_READ_BUFFER => effects.push(Effect::Reply(self.read_buffer(screen))),
                    RP_READ_MODIFIED | RP_READ_MODIFIED_ALL => {
                        let all = data[1] == RP_READ_MODIFIED_ALL;
                        effects.push(Effect::Reply(self.read_modified(screen, self.aid, all)));
                    }
                    other => warn!("unsupported Read Partition type 0x{other:02X}"),
                }
            }
            SF_ERASE_RESET => {
                let alternate =
                    data.first().is_some_and(|flags| (flags & ERASE_RESET_ALTERNATE) != 0);
                screen.erase_to(if alternate { self.alternate } else { self.primary });
                self.reply_mode = ReplyMode::Field;
                self.reply_types.clear();
                screen.resolve_contexts();
            }
            SF_SET_REPLY_MODE => {
                if data.len() < 2 {
                    return Err(DecodeError::Truncated { what: "Set Reply Mode", offset });
                }
                match ReplyMode::from_code(data[1]) {
                    Some(mode) => {
                        self.reply_mode = mode;
                        self.reply_types = data[2..].to_vec();
                        debug!("reply mode {mode:?}, types {:02X?}", self.reply_types);
                    }
                    None => warn!("unknown reply mode 0x{:02X}", data[1]),
                }
            }
            SF_OUTBOUND_3270DS => {
                if data.len() < 2 {
                    return Err(DecodeError::Truncated { what: "Outbound 3270DS", offset });
                }
                let command =
                    CommandCode::from_u8(data[1]).ok_or(DecodeError::UnknownCommand(data[1]))?;
                if command.is_write() {
                    self.process_write(screen, &data[2..], offset + 3, match command {
                        CommandCode::EraseWrite => Some(self.primary),
                        CommandCode::EraseWriteAlternate => Some(self.alternate),
                        _ => None,
                    })?;
                } else {
                    warn!("ignoring {command:?} inside Outbound 3270DS");
                }
            }
            SF_FILE_TRANSFER => effects.push(Effect::FileTransfer(record.to_vec())),
            other => warn!("ignoring structured field 0x{other:02X}"),
        }
        Ok(())
    }

    /// Read Buffer reply: AID, cursor address, then every cell
    pub fn read_buffer(&self, screen: &ScreenBuffer) -> Vec<u8> {
        let mut out = Vec::with_capacity(screen.buffer_size() + 3);
        out.push(self.aid.to_u8());
        out.extend_from_slice(&addressing::encode(screen.cursor(), screen.buffer_size()));

        let form = self.reply_mode.field_form();
        for cell in screen.cells() {
            if cell.is_start_field() {
                cell.pack(&mut out, form, &self.reply_types);
            } else if self.reply_mode == ReplyMode::Character {
                cell.pack(&mut out, form, &self.reply_types);
            } else {
                out.push(cell.value());
            }
        }
        out
    }

    /// Read Modified reply for `aid`. Short-read keys send the AID alone
    /// unless `all` is set (Read Modified All).
    pub fn read_modified(&self, screen: &ScreenBuffer, aid: AidKey, all: bool) -> Vec<u8> {
        let mut out = vec![aid.to_u8()];
        if aid.is_short_read() && !all {
            return out;
        }
        out.extend_from_slice(&addressing::encode(screen.cursor(), screen.buffer_size()));

        let index = screen.field_index();
        if index.is_unformatted() {
            for cell in screen.cells() {
                self.pack_modified(cell, &mut out);
            }
            return out;
        }

        for field in index.modified_fields() {
            out.push(ORDER_SBA);
            out.extend_from_slice(&addressing::encode(field.data_start(), screen.buffer_size()));
            for position in field.data_positions() {
                self.pack_modified(screen.cell(position), &mut out);
            }
        }
        out
    }

    fn pack_modified(&self, cell: &Cell, out: &mut Vec<u8>) {
        if cell.is_null() {
            return;
        }
        if self.reply_mode == ReplyMode::Character {
            cell.pack(out, FieldForm::Basic, &self.reply_types);
        } else {
            out.push(cell.value());
        }
    }
}

impl Default for StreamCodec {
    fn default() -> Self {
        Self::new(ScreenSize::Model2, ScreenSize::Model2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ebcdic::ascii_to_ebcdic_vec;
    use crate::lib3270::attribute::Color;

    fn run(codec: &mut StreamCodec, screen: &mut ScreenBuffer, message: &[u8]) -> Vec<Effect> {
        let mut effects = Vec::new();
        codec.process(screen, message, &mut effects).unwrap();
        effects
    }

    fn sba(address: usize) -> Vec<u8> {
        let mut out = vec![ORDER_SBA];
        out.extend_from_slice(&addressing::encode_12bit(address));
        out
    }

    #[test]
    fn test_write_command_with_wcc() {
        let mut codec = StreamCodec::default();
        let mut screen = ScreenBuffer::default();
        run(&mut codec, &mut screen, &[CMD_WRITE, WCC_RESTORE | WCC_ALARM, 0xC8, 0xC9]);

        assert!(!screen.is_keyboard_locked());
        assert!(screen.is_alarm());
        assert_eq!(screen.row_text(0).unwrap().trim_end(), "HI");
    }

    #[test]
    fn test_write_locks_keyboard_without_restore() {
        let mut codec = StreamCodec::default();
        let mut screen = ScreenBuffer::default();
        screen.unlock_keyboard();
        run(&mut codec, &mut screen, &[SNA_WRITE, 0x00]);
        assert!(screen.is_keyboard_locked());
    }

    #[test]
    fn test_erase_write_alternate_resizes() {
        let mut codec = StreamCodec::new(ScreenSize::Model2, ScreenSize::Model5);
        let mut screen = ScreenBuffer::default();
        run(&mut codec, &mut screen, &[CMD_ERASE_WRITE_ALTERNATE, 0x00]);
        assert_eq!(screen.size(), ScreenSize::Model5);
        run(&mut codec, &mut screen, &[CMD_ERASE_WRITE, 0x00]);
        assert_eq!(screen.size(), ScreenSize::Model2);
    }

    #[test]
    fn test_set_buffer_address_order() {
        let mut codec = StreamCodec::default();
        let mut screen = ScreenBuffer::default();
        let mut message = vec![CMD_WRITE, 0x00];
        message.extend(sba(81));
        message.push(0xC1);
        run(&mut codec, &mut screen, &message);
        assert_eq!(screen.cell(81).value(), 0xC1);
    }

    #[test]
    fn test_start_field_order() {
        let mut codec = StreamCodec::default();
        let mut screen = ScreenBuffer::default();
        run(&mut codec, &mut screen, &[CMD_WRITE, 0x00, ORDER_SF, ATTR_PROTECTED, 0xC1]);
        assert!(screen.cell(0).is_start_field());
        assert_eq!(screen.cell(1).value(), 0xC1);
        assert!(screen.field_index().fields()[0].is_protected());
    }

    #[test]
    fn test_decode_orders_in_sequence() {
        let data = [
            ORDER_SBA, 0x40, 0x50, ORDER_SFE, 2, XA_3270, 0x60, XA_FOREGROUND, COLOR_RED, ORDER_IC,
            0xC1, 0xC2, ORDER_SA, XA_RESET, 0x00, ORDER_RA, 0x40, 0x60, ORDER_GE, 0xA2, ORDER_PT,
        ];
        let decoded = decode_orders(&data, 0);
        assert!(decoded.error.is_none());
        assert_eq!(
            decoded.orders,
            vec![
                Order::SetBufferAddress(16),
                Order::StartFieldExtended {
                    attribute: StartFieldAttribute::new(0x60),
                    extended: vec![Attribute::Foreground(Color::Red)],
                },
                Order::InsertCursor,
                Order::Text(vec![0xC1, 0xC2]),
                Order::SetAttribute(Attribute::Reset),
                Order::RepeatToAddress { stop: 32, value: 0xA2, graphics: true },
                Order::ProgramTab,
            ]
        );
    }

    #[test]
    fn test_truncated_order_keeps_prefix() {
        let mut codec = StreamCodec::default();
        let mut screen = ScreenBuffer::default();
        let mut effects = Vec::new();
        let err = codec
            .process(
                &mut screen,
                &[CMD_WRITE, WCC_RESTORE, 0xC1, 0xC2, ORDER_SBA, 0x40],
                &mut effects,
            )
            .unwrap_err();

        assert_eq!(err, DecodeError::Truncated { what: "SBA", offset: 5 });
        assert_eq!(screen.cell(0).value(), 0xC1);
        assert_eq!(screen.cell(1).value(), 0xC2);
        assert!(!screen.is_keyboard_locked());
    }

    #[test]
    fn test_unknown_command() {
        let mut codec = StreamCodec::default();
        let mut screen = ScreenBuffer::default();
        let mut effects = Vec::new();
        assert_eq!(
            codec.process(&mut screen, &[0x99, 0x00], &mut effects),
            Err(DecodeError::UnknownCommand(0x99))
        );
    }

    #[test]
    fn test_read_buffer_response() {
        let mut codec = StreamCodec::default();
        let mut screen = ScreenBuffer::default();
        run(&mut codec, &mut screen, &[CMD_WRITE, 0x00, ORDER_SF, 0xE0, 0xC1]);
        let effects = run(&mut codec, &mut screen, &[CMD_READ_BUFFER]);

        let Effect::Reply(reply) = &effects[0] else { panic!("expected reply") };
        assert_eq!(&reply[..3], &[AID_NO_AID, 0x40, 0x40]);
        assert_eq!(&reply[3..6], &[ORDER_SF, 0xE0, 0xC1]);
        assert_eq!(reply.len(), 3 + 2 + 1919);
    }

    #[test]
    fn test_read_modified_sends_modified_fields() {
        let mut codec = StreamCodec::default();
        let mut screen = ScreenBuffer::default();
        let mut message = vec![CMD_WRITE, WCC_RESTORE, ORDER_SF, ATTR_PROTECTED];
        message.extend(ascii_to_ebcdic_vec("NAME"));
        message.extend([ORDER_SF, ATTR_MDT, 0xC1, 0xC2]);
        message.extend(sba(20));
        message.extend([ORDER_SF, 0x00, 0xC3]);
        run(&mut codec, &mut screen, &message);
        screen.set_cursor(9);

        let reply = codec.read_modified(&screen, AidKey::Enter, false);
        let mut expected = vec![AID_ENTER];
        expected.extend(addressing::encode_12bit(9));
        expected.extend(sba(6));
        expected.extend([0xC1, 0xC2]);
        assert_eq!(reply, expected);
    }

    #[test]
    fn test_short_read() {
        let codec = StreamCodec::default();
        let screen = ScreenBuffer::default();
        assert_eq!(codec.read_modified(&screen, AidKey::Clear, false), vec![AID_CLEAR]);
        assert_eq!(codec.read_modified(&screen, AidKey::PA1, true).len(), 3);
    }

    #[test]
    fn test_character_reply_mode_packs_attributes() {
        let mut codec = StreamCodec::default();
        let mut screen = ScreenBuffer::default();
        let wsf = [
            CMD_WRITE_STRUCTURED_FIELD,
            0x00,
            0x06,
            SF_SET_REPLY_MODE,
            0x00,
            REPLY_MODE_CHARACTER,
            XA_FOREGROUND,
        ];
        run(&mut codec, &mut screen, &wsf);
        assert_eq!(codec.reply_mode(), ReplyMode::Character);
        assert_eq!(codec.reply_types(), &[XA_FOREGROUND]);

        run(&mut codec, &mut screen, &[CMD_WRITE, 0x00, ORDER_SA, XA_FOREGROUND, COLOR_BLUE, 0xC1]);
        let reply = codec.read_modified(&screen, AidKey::Enter, false);
        assert_eq!(&reply[3..], &[ORDER_SA, XA_FOREGROUND, COLOR_BLUE, 0xC1]);

        run(&mut codec, &mut screen, &[CMD_WRITE, WCC_RESET]);
        assert_eq!(codec.reply_mode(), ReplyMode::Field);
    }

    #[test]
    fn test_query_reply() {
        let mut codec = StreamCodec::default();
        let mut screen = ScreenBuffer::default();
        let effects = run(
            &mut codec,
            &mut screen,
            &[CMD_WRITE_STRUCTURED_FIELD, 0x00, 0x05, SF_READ_PARTITION, 0xFF, RP_QUERY],
        );
        let Effect::Reply(reply) = &effects[0] else { panic!("expected reply") };
        assert_eq!(reply[0], AID_STRUCTURED_FIELD);
        assert_eq!(&reply[3..5], &[SF_QUERY_REPLY, QR_SUMMARY]);
    }

    #[test]
    fn test_structured_field_zero_length_means_rest() {
        let mut codec = StreamCodec::default();
        let mut screen = ScreenBuffer::default();
        let effects = run(
            &mut codec,
            &mut screen,
            &[CMD_WRITE_STRUCTURED_FIELD, 0x00, 0x00, SF_FILE_TRANSFER, 0x00, 0x12],
        );
        assert_eq!(effects, vec![Effect::FileTransfer(vec![SF_FILE_TRANSFER, 0x00, 0x12])]);
    }

    #[test]
    fn test_bad_structured_field_length() {
        let mut codec = StreamCodec::default();
        let mut screen = ScreenBuffer::default();
        let mut effects = Vec::new();
        let err = codec
            .process(
                &mut screen,
                &[CMD_WRITE_STRUCTURED_FIELD, 0x00, 0x09, SF_ERASE_RESET],
                &mut effects,
            )
            .unwrap_err();
        assert_eq!(err, DecodeError::BadStructuredFieldLength { offset: 1, length: 9 });
    }

    #[test]
    fn test_outbound_3270ds() {
        let mut codec = StreamCodec::default();
        let mut screen = ScreenBuffer::default();
        run(
            &mut codec,
            &mut screen,
            &[
                CMD_WRITE_STRUCTURED_FIELD,
                0x00,
                0x07,
                SF_OUTBOUND_3270DS,
                0x00,
                SNA_ERASE_WRITE,
                WCC_RESTORE,
                0xC1,
            ],
        );
        assert_eq!(screen.cell(0).value(), 0xC1);
        assert!(!screen.is_keyboard_locked());
    }

    #[test]
    fn test_erase_reset_alternate() {
        let mut codec = StreamCodec::new(ScreenSize::Model2, ScreenSize::Model4);
        let mut screen = ScreenBuffer::default();
        run(
            &mut codec,
            &mut screen,
            &[CMD_WRITE_STRUCTURED_FIELD, 0x00, 0x04, SF_ERASE_RESET, ERASE_RESET_ALTERNATE],
        );
        assert_eq!(screen.size(), ScreenSize::Model4);
    }
}
