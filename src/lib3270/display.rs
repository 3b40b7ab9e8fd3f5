//! 3270 screen buffer
//!
//! [`ScreenBuffer`] owns exactly rows x cols [`Cell`]s plus the write cursor
//! (the current buffer address), the display cursor set by Insert Cursor,
//! the keyboard lock and the alarm. Every address operand is taken modulo the
//! buffer size. The [`FieldIndex`] is derived lazily and dropped whenever a
//! start field or its attribute changes.

use std::fmt;

use log::trace;
use once_cell::unsync::OnceCell;
use serde::{Deserialize, Serialize};

use super::attribute::{Attribute, ScreenContext, StartFieldAttribute};
use super::cell::Cell;
use super::field::FieldIndex;
use crate::error::InputError;

/// Standard 3270 screen sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenSize {
    /// Model 2: 24 rows x 80 columns (1920 characters)
    Model2,
    /// Model 3: 32 rows x 80 columns (2560 characters)
    Model3,
    /// Model 4: 43 rows x 80 columns (3440 characters)
    Model4,
    /// Model 5: 27 rows x 132 columns (3564 characters)
    Model5,
}

impl ScreenSize {
    pub fn rows(&self) -> usize {
        match self {
            Self::Model2 => 24,
            Self::Model3 => 32,
            Self::Model4 => 43,
            Self::Model5 => 27,
        }
    }

    pub fn cols(&self) -> usize {
        match self {
            Self::Model2 | Self::Model3 | Self::Model4 => 80,
            Self::Model5 => 132,
        }
    }

    /// Total number of cells (rows * cols)
    pub fn buffer_size(&self) -> usize {
        self.rows() * self.cols()
    }

    /// Convert a buffer address to (row, col), wrapping out-of-range addresses
    pub fn address_to_coords(&self, address: usize) -> (usize, usize) {
        let address = address % self.buffer_size();
        (address / self.cols(), address % self.cols())
    }

    pub fn coords_to_address(&self, row: usize, col: usize) -> usize {
        (row * self.cols() + col) % self.buffer_size()
    }
}

impl Default for ScreenSize {
    fn default() -> Self {
        Self::Model2
    }
}

/// The mutable 3270 presentation space
#[derive(Debug)]
pub struct ScreenBuffer {
    size: ScreenSize,
    cells: Vec<Cell>,
    /// Write cursor, advanced by every order that stores a cell
    buffer_address: usize,
    /// Display cursor, moved by Insert Cursor and operator input
    cursor: usize,
    keyboard_locked: bool,
    alarm: bool,
    base: ScreenContext,
    prompts: Vec<String>,
    fields: OnceCell<FieldIndex>,
}

impl ScreenBuffer {
    pub fn new(size: ScreenSize) -> Self {
        let base = ScreenContext::default();
        Self {
            size,
            cells: blank_cells(size, base),
            buffer_address: 0,
            cursor: 0,
            keyboard_locked: true,
            alarm: false,
            base,
            prompts: Vec::new(),
            fields: OnceCell::new(),
        }
    }

    /// Texts that identify the label in front of a command-entry field
    pub fn set_command_prompts(&mut self, prompts: Vec<String>) {
        self.prompts = prompts;
        self.invalidate_fields();
    }

    pub fn size(&self) -> ScreenSize {
        self.size
    }

    pub fn rows(&self) -> usize {
        self.size.rows()
    }

    pub fn cols(&self) -> usize {
        self.size.cols()
    }

    pub fn buffer_size(&self) -> usize {
        self.cells.len()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, position: usize) -> &Cell {
        &self.cells[position % self.cells.len()]
    }

    pub fn base_context(&self) -> ScreenContext {
        self.base
    }

    pub fn buffer_address(&self) -> usize {
        self.buffer_address
    }

    /// SBA. Out-of-range operands wrap.
    pub fn set_buffer_address(&mut self, address: usize) {
        self.buffer_address = address % self.cells.len();
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_cursor(&mut self, position: usize) {
        self.cursor = position % self.cells.len();
    }

    pub fn cursor_coords(&self) -> (usize, usize) {
        self.size.address_to_coords(self.cursor)
    }

    pub fn lock_keyboard(&mut self) {
        self.keyboard_locked = true;
    }

    pub fn unlock_keyboard(&mut self) {
        self.keyboard_locked = false;
    }

    pub fn is_keyboard_locked(&self) -> bool {
        self.keyboard_locked
    }

    pub fn set_alarm(&mut self, alarm: bool) {
        self.alarm = alarm;
    }

    pub fn is_alarm(&self) -> bool {
        self.alarm
    }

    /// The field index for the current cells, built on first use
    pub fn field_index(&self) -> &FieldIndex {
        self.fields.get_or_init(|| FieldIndex::build(&self.cells, &self.prompts))
    }

    fn invalidate_fields(&mut self) {
        self.fields.take();
    }

    fn advance(&mut self) {
        self.buffer_address = (self.buffer_address + 1) % self.cells.len();
    }

    /// Store a data byte at the write cursor and advance
    pub fn write_char(&mut self, value: u8) {
        self.store_data(value, false);
        self.advance();
    }

    /// GE. Store a graphic escape byte at the write cursor and advance
    pub fn write_graphics(&mut self, value: u8) {
        self.store_data(value, true);
        self.advance();
    }

    fn store_data(&mut self, value: u8, graphics: bool) {
        let address = self.buffer_address;
        let base = self.base;
        let cell = &mut self.cells[address];
        if cell.is_start_field() {
            cell.reset(base);
            self.fields.take();
        }
        if graphics {
            cell.set_graphics_char(value);
        } else {
            cell.set_char(value);
        }
    }

    /// SF
    pub fn start_field(&mut self, attribute: StartFieldAttribute) {
        self.start_field_extended(attribute, Vec::new());
    }

    /// SFE. `extended` holds every pair except the field attribute itself.
    pub fn start_field_extended(
        &mut self,
        attribute: StartFieldAttribute,
        extended: Vec<Attribute>,
    ) {
        let address = self.buffer_address;
        let cell = &mut self.cells[address];
        cell.reset(self.base);
        cell.set_start_field(attribute);
        for attr in extended {
            cell.add_attribute(attr);
        }
        self.invalidate_fields();
        self.advance();
    }

    /// SA. Attaches to the cell at the write cursor without advancing.
    pub fn set_attribute(&mut self, attribute: Attribute) {
        let address = self.buffer_address;
        self.cells[address].add_attribute(attribute);
    }

    /// MF. Updates the start field at the write cursor, replacing attributes
    /// of the same type, then advances. Ignored on a data cell.
    pub fn modify_field(
        &mut self,
        attribute: Option<StartFieldAttribute>,
        extended: Vec<Attribute>,
    ) {
        let address = self.buffer_address;
        let cell = &mut self.cells[address];
        if cell.is_start_field() {
            if let (Some(new), Some(current)) = (attribute, cell.start_field_attribute_mut()) {
                *current = new;
            }
            let mut merged: Vec<Attribute> = cell.attributes().to_vec();
            for attr in extended {
                match merged.iter_mut().find(|a| a.kind() == attr.kind()) {
                    Some(existing) => *existing = attr,
                    None => merged.push(attr),
                }
            }
            cell.clear_attributes();
            for attr in merged {
                cell.add_attribute(attr);
            }
            self.invalidate_fields();
        } else {
            trace!("modify field at {address} is not a start field");
        }
        self.advance();
    }

    /// RA. Fills from the write cursor up to, not including, `stop`. A stop
    /// equal to the write cursor fills the whole buffer.
    pub fn repeat_to_address(&mut self, stop: usize, value: u8, graphics: bool) {
        let stop = stop % self.cells.len();
        loop {
            self.store_data(value, graphics);
            self.advance();
            if self.buffer_address == stop {
                break;
            }
        }
    }

    /// EUA. Nulls unprotected data cells from the write cursor up to, not
    /// including, `stop`. Start fields and protected fields are left alone.
    pub fn erase_unprotected_to_address(&mut self, stop: usize) {
        let size = self.cells.len();
        let stop = stop % size;
        let index = self.fields.get_or_init(|| FieldIndex::build(&self.cells, &self.prompts));

        let mut position = self.buffer_address;
        loop {
            let cell = &mut self.cells[position];
            let protected = index.field_at(position).is_some_and(|f| f.is_protected());
            if !cell.is_start_field() && !protected {
                cell.reset(self.base);
            }
            position = (position + 1) % size;
            if position == stop {
                break;
            }
        }
        self.buffer_address = stop;
    }

    /// IC
    pub fn insert_cursor(&mut self) {
        self.cursor = self.buffer_address;
    }

    /// PT. Moves the write cursor to the first data position of the next
    /// unprotected field, or to 0 when there is none.
    pub fn program_tab(&mut self) {
        let target = self
            .field_index()
            .next_unprotected_after(self.buffer_address)
            .map(|field| field.data_start())
            .unwrap_or(0);
        self.buffer_address = target;
    }

    /// Erase every cell in place and home both cursors
    pub fn erase_all(&mut self) {
        for cell in &mut self.cells {
            cell.reset(self.base);
        }
        self.buffer_address = 0;
        self.cursor = 0;
        self.invalidate_fields();
    }

    /// Replace the buffer with a blank one of the given geometry
    pub fn resize(&mut self, size: ScreenSize) {
        self.size = size;
        self.cells = blank_cells(size, self.base);
        self.buffer_address = 0;
        self.cursor = 0;
        self.invalidate_fields();
    }

    /// Erase, switching geometry when it differs
    pub fn erase_to(&mut self, size: ScreenSize) {
        if size == self.size {
            self.erase_all();
        } else {
            self.resize(size);
        }
    }

    /// EAU. Nulls every unprotected field, resets their MDTs, puts the
    /// cursor in the first unprotected field and unlocks the keyboard.
    pub fn erase_all_unprotected(&mut self) {
        let index = self.field_index().clone();

        if index.is_unformatted() {
            self.erase_all();
        } else {
            for field in index.unprotected_fields() {
                for position in field.data_positions() {
                    self.cells[position].reset(self.base);
                }
                if let Some(attribute) = self.cells[field.start()].start_field_attribute_mut() {
                    attribute.set_modified(false);
                }
            }
            self.invalidate_fields();

            let home = index.unprotected_fields().next().map(|f| f.data_start()).unwrap_or(0);
            self.buffer_address = home;
            self.cursor = home;
        }
        self.unlock_keyboard();
    }

    /// Clear the MDT of every field
    pub fn reset_modified(&mut self) {
        let mut changed = false;
        for cell in &mut self.cells {
            if let Some(attribute) = cell.start_field_attribute_mut() {
                changed |= attribute.is_modified();
                attribute.set_modified(false);
            }
        }
        if changed {
            self.invalidate_fields();
        }
    }

    /// Operator input at `position`. Sets the field's MDT and moves the
    /// display cursor past the typed character.
    pub fn type_char(&mut self, position: usize, value: u8) -> Result<(), InputError> {
        let position = position % self.cells.len();
        if self.keyboard_locked {
            return Err(InputError::KeyboardLocked);
        }
        if self.cells[position].is_start_field() {
            return Err(InputError::StartField { position });
        }

        let field = self.field_index().field_at(position).cloned();
        if let Some(field) = &field {
            if field.is_protected() {
                return Err(InputError::Protected { position });
            }
            if field.attribute().is_numeric() && !(0xF0..=0xF9).contains(&value) && value != 0x40 {
                return Err(InputError::NumericOnly { field: field.start(), byte: value });
            }
        }

        self.cells[position].set_char(value);
        if let Some(field) = field {
            if let Some(attribute) = self.cells[field.start()].start_field_attribute_mut() {
                if !attribute.is_modified() {
                    attribute.set_modified(true);
                    self.invalidate_fields();
                }
            }
        }
        self.cursor = (position + 1) % self.cells.len();
        Ok(())
    }

    /// Recompute every cell's rendering context and visibility.
    ///
    /// Each field starts from its attribute's context plus the start cell's
    /// extended attributes. Data cells then apply their own attributes to a
    /// running context that carries on until the next start field.
    pub fn resolve_contexts(&mut self) {
        let size = self.cells.len();
        let base = self.base;
        let index = self.fields.get_or_init(|| FieldIndex::build(&self.cells, &self.prompts));

        if index.is_unformatted() {
            let mut running = base;
            for cell in &mut self.cells {
                for attribute in cell.attributes() {
                    attribute.apply(&mut running, base);
                }
                cell.set_context(running);
                cell.set_visible(true);
            }
            return;
        }

        for field in index.fields() {
            let start = &mut self.cells[field.start()];
            let plain = field.attribute().context(base);
            let mut field_context = plain;
            for attribute in start.attributes() {
                attribute.apply(&mut field_context, plain);
            }
            start.set_context(field_context);
            start.set_visible(false);

            let hidden = field.attribute().is_hidden();
            let mut running = field_context;
            for position in field.data_positions() {
                let cell = &mut self.cells[position % size];
                for attribute in cell.attributes() {
                    attribute.apply(&mut running, field_context);
                }
                cell.set_context(running);
                cell.set_visible(!hidden);
            }
        }
    }

    /// One screen row as rendered text
    pub fn row_text(&self, row: usize) -> Option<String> {
        if row >= self.rows() {
            return None;
        }
        let cols = self.cols();
        Some(
            self.cells[row * cols..(row + 1) * cols]
                .iter()
                .map(|cell| if cell.is_visible() { cell.decoded_str() } else { " " })
                .collect(),
        )
    }

    /// Whole-screen dump, one line per row
    pub fn text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ScreenBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.rows() {
            if row > 0 {
                writeln!(f)?;
            }
            if let Some(line) = self.row_text(row) {
                write!(f, "{line}")?;
            }
        }
        Ok(())
    }
}

impl Default for ScreenBuffer {
    fn default() -> Self {
        Self::new(ScreenSize::default())
    }
}

fn blank_cells(size: ScreenSize, base: ScreenContext) -> Vec<Cell> {
    (0..size.buffer_size()).map(|position| Cell::new(position, base)).collect()
}

/// Buffer address encoding
///
/// Inbound addresses are self-describing: when the top two bits of the first
/// byte are zero the pair is a 14-bit binary address, otherwise each byte
/// carries six bits. Outbound 12-bit addresses go through the code table so
/// every byte is a printable EBCDIC graphic.
pub mod addressing {
    const CODE_TABLE: [u8; 64] = [
        0x40, 0xC1, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7,
        0xC8, 0xC9, 0x4A, 0x4B, 0x4C, 0x4D, 0x4E, 0x4F,
        0x50, 0xD1, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7,
        0xD8, 0xD9, 0x5A, 0x5B, 0x5C, 0x5D, 0x5E, 0x5F,
        0x60, 0x61, 0xE2, 0xE3, 0xE4, 0xE5, 0xE6, 0xE7,
        0xE8, 0xE9, 0x6A, 0x6B, 0x6C, 0x6D, 0x6E, 0x6F,
        0xF0, 0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7,
        0xF8, 0xF9, 0x7A, 0x7B, 0x7C, 0x7D, 0x7E, 0x7F,
    ];

    /// Largest address expressible in 12 bits
    pub const MAX_12BIT_ADDRESS: usize = 0x0FFF;

    pub fn decode(byte1: u8, byte2: u8) -> usize {
        if (byte1 & 0xC0) == 0 {
            decode_14bit(byte1, byte2)
        } else {
            decode_12bit(byte1, byte2)
        }
    }

    pub fn decode_12bit(byte1: u8, byte2: u8) -> usize {
        (((byte1 & 0x3F) as usize) << 6) | (byte2 & 0x3F) as usize
    }

    pub fn decode_14bit(byte1: u8, byte2: u8) -> usize {
        (((byte1 & 0x3F) as usize) << 8) | byte2 as usize
    }

    /// Encode for a buffer of `buffer_size` cells: 12-bit when every address
    /// fits, 14-bit otherwise.
    pub fn encode(address: usize, buffer_size: usize) -> [u8; 2] {
        if buffer_size > MAX_12BIT_ADDRESS + 1 {
            encode_14bit(address)
        } else {
            encode_12bit(address)
        }
    }

    pub fn encode_12bit(address: usize) -> [u8; 2] {
        [CODE_TABLE[(address >> 6) & 0x3F], CODE_TABLE[address & 0x3F]]
    }

    pub fn encode_14bit(address: usize) -> [u8; 2] {
        [((address >> 8) & 0x3F) as u8, (address & 0xFF) as u8]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lib3270::attribute::{Color, Highlight};
    use crate::lib3270::codes::*;

    fn screen() -> ScreenBuffer {
        ScreenBuffer::new(ScreenSize::Model2)
    }

    #[test]
    fn test_screen_size_model2() {
        let size = ScreenSize::Model2;
        assert_eq!(size.rows(), 24);
        assert_eq!(size.cols(), 80);
        assert_eq!(size.buffer_size(), 1920);
        assert_eq!(ScreenSize::Model5.buffer_size(), 3564);
    }

    #[test]
    fn test_screen_size_coords() {
        let size = ScreenSize::Model2;
        assert_eq!(size.address_to_coords(0), (0, 0));
        assert_eq!(size.address_to_coords(81), (1, 1));
        assert_eq!(size.address_to_coords(1921), (0, 1));
        assert_eq!(size.coords_to_address(1, 1), 81);
    }

    #[test]
    fn test_set_buffer_address_wraps() {
        let mut s = screen();
        s.set_buffer_address(1925);
        assert_eq!(s.buffer_address(), 5);
    }

    #[test]
    fn test_write_char_advances_and_wraps() {
        let mut s = screen();
        s.set_buffer_address(1919);
        s.write_char(0xC1);
        assert_eq!(s.buffer_address(), 0);
        assert_eq!(s.cell(1919).value(), 0xC1);
    }

    #[test]
    fn test_write_over_start_field_removes_field() {
        let mut s = screen();
        s.start_field(StartFieldAttribute::new(ATTR_PROTECTED));
        assert_eq!(s.field_index().fields().len(), 1);
        s.set_buffer_address(0);
        s.write_char(0xC1);
        assert!(s.field_index().is_unformatted());
    }

    #[test]
    fn test_set_attribute_does_not_advance() {
        let mut s = screen();
        s.set_buffer_address(10);
        s.set_attribute(Attribute::Foreground(Color::Red));
        assert_eq!(s.buffer_address(), 10);
        s.write_char(0xC1);
        assert_eq!(s.cell(10).attributes(), &[Attribute::Foreground(Color::Red)]);
    }

    #[test]
    fn test_repeat_to_address_exclusive_stop() {
        let mut s = screen();
        s.set_buffer_address(5);
        s.repeat_to_address(10, 0xC1, false);
        assert_eq!(s.buffer_address(), 10);
        assert!((5..10).all(|p| s.cell(p).value() == 0xC1));
        assert!(s.cell(10).is_null());
    }

    #[test]
    fn test_repeat_to_same_address_fills_buffer() {
        let mut s = screen();
        s.set_buffer_address(100);
        s.repeat_to_address(100, 0x5C, false);
        assert!(s.cells().iter().all(|c| c.value() == 0x5C));
        assert_eq!(s.buffer_address(), 100);
    }

    #[test]
    fn test_erase_unprotected_skips_protected() {
        let mut s = screen();
        s.start_field(StartFieldAttribute::new(ATTR_PROTECTED));
        s.repeat_to_address(10, 0xC1, false);
        s.start_field(StartFieldAttribute::new(0));
        s.repeat_to_address(20, 0xC2, false);

        s.set_buffer_address(0);
        s.erase_unprotected_to_address(20);
        assert_eq!(s.buffer_address(), 20);
        assert_eq!(s.cell(5).value(), 0xC1);
        assert!(s.cell(10).is_start_field());
        assert!(s.cell(15).is_null());
    }

    #[test]
    fn test_program_tab() {
        let mut s = screen();
        s.program_tab();
        assert_eq!(s.buffer_address(), 0);

        s.set_buffer_address(100);
        s.start_field(StartFieldAttribute::new(0));
        s.set_buffer_address(200);
        s.program_tab();
        assert_eq!(s.buffer_address(), 101);
    }

    #[test]
    fn test_insert_cursor() {
        let mut s = screen();
        s.set_buffer_address(81);
        s.insert_cursor();
        assert_eq!(s.cursor(), 81);
        assert_eq!(s.cursor_coords(), (1, 1));
    }

    #[test]
    fn test_modify_field_replaces_same_type() {
        let mut s = screen();
        s.start_field_extended(
            StartFieldAttribute::new(0),
            vec![Attribute::Foreground(Color::Red), Attribute::Highlight(Highlight::Blink)],
        );
        s.set_buffer_address(0);
        s.modify_field(
            Some(StartFieldAttribute::new(ATTR_PROTECTED)),
            vec![Attribute::Foreground(Color::Blue)],
        );
        assert_eq!(s.buffer_address(), 1);
        assert!(s.field_index().fields()[0].is_protected());
        assert_eq!(s.cell(0).attributes()[0], Attribute::Foreground(Color::Blue));
        assert_eq!(s.cell(0).attributes().len(), 2);
    }

    #[test]
    fn test_type_char_sets_mdt() {
        let mut s = screen();
        s.start_field(StartFieldAttribute::new(ATTR_PROTECTED));
        s.set_buffer_address(10);
        s.start_field(StartFieldAttribute::new(0));
        s.unlock_keyboard();

        assert_eq!(s.type_char(5, 0xC1), Err(InputError::Protected { position: 5 }));
        assert_eq!(s.type_char(10, 0xC1), Err(InputError::StartField { position: 10 }));
        assert!(s.type_char(11, 0xC1).is_ok());
        assert_eq!(s.cursor(), 12);
        assert_eq!(s.field_index().modified_fields().count(), 1);

        s.reset_modified();
        assert_eq!(s.field_index().modified_fields().count(), 0);
    }

    #[test]
    fn test_type_char_when_locked() {
        let mut s = screen();
        assert_eq!(s.type_char(0, 0xC1), Err(InputError::KeyboardLocked));
    }

    #[test]
    fn test_erase_all_unprotected() {
        let mut s = screen();
        s.start_field(StartFieldAttribute::new(ATTR_PROTECTED));
        s.write_char(0xC1);
        s.set_buffer_address(40);
        s.start_field(StartFieldAttribute::new(ATTR_MDT));
        s.write_char(0xC2);

        s.erase_all_unprotected();
        assert_eq!(s.cell(1).value(), 0xC1);
        assert!(s.cell(41).is_null());
        assert_eq!(s.cursor(), 41);
        assert!(!s.is_keyboard_locked());
        assert_eq!(s.field_index().modified_fields().count(), 0);
    }

    #[test]
    fn test_resolve_contexts_hidden_and_colors() {
        let mut s = screen();
        s.start_field_extended(
            StartFieldAttribute::new(DISPLAY_HIDDEN),
            vec![Attribute::Foreground(Color::Yellow)],
        );
        s.write_char(0xC1);
        s.set_buffer_address(20);
        s.start_field(StartFieldAttribute::new(0));
        s.set_attribute(Attribute::Foreground(Color::Pink));
        s.write_char(0xC2);
        s.write_char(0xC3);

        s.resolve_contexts();
        assert!(!s.cell(1).is_visible());
        assert_eq!(s.cell(1).context().foreground, Color::Yellow);
        assert!(s.cell(21).is_visible());
        assert_eq!(s.cell(21).context().foreground, Color::Pink);
        assert_eq!(s.cell(22).context().foreground, Color::Pink);
        assert_eq!(s.row_text(0).map(|r| r.starts_with("  ")), Some(true));
    }

    #[test]
    fn test_resize_replaces_cells() {
        let mut s = screen();
        s.write_char(0xC1);
        s.resize(ScreenSize::Model5);
        assert_eq!(s.buffer_size(), 3564);
        assert_eq!(s.cols(), 132);
        assert!(s.cell(0).is_null());
    }

    #[test]
    fn test_addressing_12bit() {
        assert_eq!(addressing::encode_12bit(0), [0x40, 0x40]);
        assert_eq!(addressing::encode_12bit(80), [0xC1, 0x50]);
        assert_eq!(addressing::decode(0xC1, 0x50), 80);
        assert_eq!(addressing::decode(0x5D, 0x7F), 1919);
    }

    #[test]
    fn test_addressing_14bit() {
        let bytes = addressing::encode_14bit(3000);
        assert_eq!(bytes[0] & 0xC0, 0);
        assert_eq!(addressing::decode(bytes[0], bytes[1]), 3000);
        assert_eq!(addressing::encode(3000, 5000), bytes);
        assert_eq!(addressing::encode(100, 1920), addressing::encode_12bit(100));
    }
}
