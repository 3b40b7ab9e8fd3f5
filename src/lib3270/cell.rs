//! A single addressable screen position
//!
//! Each cell is either a data cell or a start-field cell, never both. Both
//! kinds keep an insertion-ordered attribute list: extended field attributes
//! for a start field, SA attributes for data.

use super::attribute::{Attribute, ScreenContext, StartFieldAttribute};
use super::codes::{ORDER_SA, ORDER_SF, ORDER_SFE, XA_3270};
use crate::ebcdic::{display_str, ebcdic_to_ascii};

// Graphic escape line-drawing characters
const HORIZONTAL_LINE: u8 = 0xA2;
const VERTICAL_LINE: u8 = 0x85;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Data { value: u8, graphics: bool },
    FieldStart(StartFieldAttribute),
}

/// Which order a start-field cell is packed with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldForm {
    /// SF followed by the attribute byte
    Basic,
    /// SFE followed by a pair count and every pair, field attribute first
    Extended,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    position: usize,
    kind: CellKind,
    attributes: Vec<Attribute>,
    visible: bool,
    context: ScreenContext,
}

impl Cell {
    pub fn new(position: usize, base: ScreenContext) -> Self {
        Self {
            position,
            kind: CellKind::Data { value: 0, graphics: false },
            attributes: Vec::new(),
            visible: true,
            context: base,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn kind(&self) -> CellKind {
        self.kind
    }

    /// Store a data byte. A start-field marker at this position is replaced.
    pub fn set_char(&mut self, value: u8) {
        self.kind = CellKind::Data { value, graphics: false };
    }

    /// Store a byte from the graphic escape character set
    pub fn set_graphics_char(&mut self, value: u8) {
        self.kind = CellKind::Data { value, graphics: true };
    }

    pub fn set_start_field(&mut self, attribute: StartFieldAttribute) {
        self.kind = CellKind::FieldStart(attribute);
    }

    pub fn add_attribute(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    pub fn clear_attributes(&mut self) {
        self.attributes.clear();
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn reset(&mut self, base: ScreenContext) {
        self.kind = CellKind::Data { value: 0, graphics: false };
        self.attributes.clear();
        self.visible = true;
        self.context = base;
    }

    pub fn is_start_field(&self) -> bool {
        matches!(self.kind, CellKind::FieldStart(_))
    }

    pub fn start_field_attribute(&self) -> Option<StartFieldAttribute> {
        match self.kind {
            CellKind::FieldStart(attribute) => Some(attribute),
            CellKind::Data { .. } => None,
        }
    }

    pub fn start_field_attribute_mut(&mut self) -> Option<&mut StartFieldAttribute> {
        match &mut self.kind {
            CellKind::FieldStart(attribute) => Some(attribute),
            CellKind::Data { .. } => None,
        }
    }

    /// Data byte; start-field cells read as null
    pub fn value(&self) -> u8 {
        match self.kind {
            CellKind::Data { value, .. } => value,
            CellKind::FieldStart(_) => 0,
        }
    }

    pub fn is_graphics(&self) -> bool {
        matches!(self.kind, CellKind::Data { graphics: true, .. })
    }

    pub fn is_null(&self) -> bool {
        self.value() == 0
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Password fields and the like
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn context(&self) -> ScreenContext {
        self.context
    }

    pub fn set_context(&mut self, context: ScreenContext) {
        self.context = context;
    }

    pub fn decoded_char(&self) -> char {
        match self.kind {
            CellKind::FieldStart(_) => ' ',
            CellKind::Data { value, .. } if value <= 0x20 => ' ',
            CellKind::Data { value, graphics: true } => graphics_glyph(value),
            CellKind::Data { value, graphics: false } => {
                let ch = ebcdic_to_ascii(value);
                if ch.is_control() { ' ' } else { ch }
            }
        }
    }

    /// Same as [`Cell::decoded_char`] but borrowed from the static table
    pub fn decoded_str(&self) -> &'static str {
        match self.kind {
            CellKind::FieldStart(_) => " ",
            CellKind::Data { value, .. } if value <= 0x20 => " ",
            CellKind::Data { value, graphics: true } => match value {
                HORIZONTAL_LINE => "-",
                VERTICAL_LINE => "|",
                _ => "*",
            },
            CellKind::Data { value, graphics: false } => display_str(value),
        }
    }

    /// Append this cell's outbound encoding.
    ///
    /// Start fields use `form`. Data cells emit an SA order for every
    /// attribute that is a reset or whose type is in `reply_types`, in
    /// insertion order, followed by the data byte.
    pub fn pack(&self, out: &mut Vec<u8>, form: FieldForm, reply_types: &[u8]) {
        match self.kind {
            CellKind::FieldStart(attribute) => match form {
                FieldForm::Basic => {
                    out.push(ORDER_SF);
                    out.push(attribute.value());
                }
                FieldForm::Extended => {
                    let count = (self.attributes.len() + 1).min(u8::MAX as usize);
                    out.push(ORDER_SFE);
                    out.push(count as u8);
                    out.push(XA_3270);
                    out.push(attribute.value());
                    for extended in self.attributes.iter().take(count - 1) {
                        extended.pack(out);
                    }
                }
            },
            CellKind::Data { value, .. } => {
                for attribute in &self.attributes {
                    if attribute.is_reset() || attribute.matches(reply_types) {
                        out.push(ORDER_SA);
                        attribute.pack(out);
                    }
                }
                out.push(value);
            }
        }
    }
}

fn graphics_glyph(value: u8) -> char {
    match value {
        HORIZONTAL_LINE => '-',
        VERTICAL_LINE => '|',
        _ => '*',
    }
}
