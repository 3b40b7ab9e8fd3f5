//! Field index for 3270
//!
//! Fields are not stored anywhere: they are the spans between consecutive
//! start-field cells. [`FieldIndex::build`] derives them from a snapshot of the
//! cells and the screen buffer memoizes the result until a start field is
//! added or removed.

use super::attribute::{Attribute, StartFieldAttribute};
use super::cell::Cell;
use super::codes::{VALIDATION_MANDATORY_ENTRY, VALIDATION_MANDATORY_FILL, VALIDATION_TRIGGER};
use crate::error::InputError;

/// A field span: the start-field cell plus the data positions that follow it,
/// up to (not including) the next start-field cell. Wraps past the end of the
/// buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    start: usize,
    len: usize,
    buffer_size: usize,
    attribute: StartFieldAttribute,
    validation: Option<u8>,
}

impl Field {
    /// Position of the start-field cell
    pub fn start(&self) -> usize {
        self.start
    }

    /// First data position
    pub fn data_start(&self) -> usize {
        (self.start + 1) % self.buffer_size
    }

    /// Number of positions, start-field cell included
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.data_len() == 0
    }

    pub fn data_len(&self) -> usize {
        self.len - 1
    }

    pub fn attribute(&self) -> StartFieldAttribute {
        self.attribute
    }

    pub fn is_protected(&self) -> bool {
        self.attribute.is_protected()
    }

    pub fn is_modified(&self) -> bool {
        self.attribute.is_modified()
    }

    pub fn contains(&self, position: usize) -> bool {
        self.offset_of(position) < self.len
    }

    fn offset_of(&self, position: usize) -> usize {
        (position % self.buffer_size + self.buffer_size - self.start) % self.buffer_size
    }

    /// Data positions in order, wrapping
    pub fn data_positions(&self) -> impl Iterator<Item = usize> + '_ {
        (1..self.len).map(move |offset| (self.start + offset) % self.buffer_size)
    }

    /// Raw data bytes of the field
    pub fn data(&self, cells: &[Cell]) -> Vec<u8> {
        self.data_positions().map(|p| cells[p].value()).collect()
    }

    /// Rendered text of the field
    pub fn text(&self, cells: &[Cell]) -> String {
        self.data_positions().map(|p| cells[p].decoded_char()).collect()
    }

    pub fn is_mandatory_fill(&self) -> bool {
        self.validation.is_some_and(|v| (v & VALIDATION_MANDATORY_FILL) != 0)
    }

    pub fn is_mandatory_entry(&self) -> bool {
        self.validation.is_some_and(|v| (v & VALIDATION_MANDATORY_ENTRY) != 0)
    }

    pub fn is_trigger(&self) -> bool {
        self.validation.is_some_and(|v| (v & VALIDATION_TRIGGER) != 0)
    }

    /// Check field content against its validation and numeric attributes
    pub fn validate_content(&self, content: &[u8]) -> Result<(), InputError> {
        let blank = |ch: u8| ch == 0x00 || ch == 0x40;

        let short = content.len() < self.data_len() || content.iter().any(|&ch| blank(ch));
        if self.is_mandatory_fill() && short {
            return Err(InputError::MandatoryFill { field: self.start });
        }

        if self.is_mandatory_entry() && content.iter().all(|&ch| blank(ch)) {
            return Err(InputError::MandatoryEntry { field: self.start });
        }

        if self.attribute.is_numeric() && !self.is_protected() {
            // EBCDIC digits are 0xF0-0xF9
            let digit = |ch: u8| (0xF0..=0xF9).contains(&ch);
            if let Some(&ch) = content.iter().find(|&&ch| !blank(ch) && !digit(ch)) {
                return Err(InputError::NumericOnly { field: self.start, byte: ch });
            }
        }

        Ok(())
    }
}

/// Derived view of every field on the screen
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldIndex {
    fields: Vec<Field>,
    owner: Vec<Option<usize>>,
    command_field: Option<usize>,
}

impl FieldIndex {
    /// Derive the fields from a cell snapshot. `prompts` are the texts that
    /// mark the protected field in front of a command-entry field.
    pub fn build(cells: &[Cell], prompts: &[String]) -> Self {
        let buffer_size = cells.len();
        let starts: Vec<usize> = cells
            .iter()
            .filter(|cell| cell.is_start_field())
            .map(Cell::position)
            .collect();

        let mut owner = vec![None; buffer_size];
        let mut fields = Vec::with_capacity(starts.len());

        for (i, &start) in starts.iter().enumerate() {
            let next = starts[(i + 1) % starts.len()];
            let len = if starts.len() == 1 {
                buffer_size
            } else {
                (next + buffer_size - start) % buffer_size
            };

            for offset in 0..len {
                owner[(start + offset) % buffer_size] = Some(i);
            }

            let validation = cells[start].attributes().iter().rev().find_map(|a| match a {
                Attribute::Validation(v) => Some(*v),
                _ => None,
            });

            fields.push(Field {
                start,
                len,
                buffer_size,
                attribute: cells[start].start_field_attribute().unwrap_or_default(),
                validation,
            });
        }

        let command_field = find_command_field(&fields, cells, prompts);

        Self { fields, owner, command_field }
    }

    /// Fields in buffer order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// True when the screen has no start fields at all
    pub fn is_unformatted(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_at(&self, position: usize) -> Option<&Field> {
        self.owner
            .get(position)
            .copied()
            .flatten()
            .map(|i| &self.fields[i])
    }

    pub fn command_field(&self) -> Option<&Field> {
        self.command_field.map(|i| &self.fields[i])
    }

    pub fn is_command_field(&self, position: usize) -> bool {
        match (self.command_field, self.owner.get(position).copied().flatten()) {
            (Some(command), Some(owner)) => command == owner,
            _ => false,
        }
    }

    /// The unprotected field whose start-field cell is nearest at or after
    /// `position`, wrapping.
    pub fn next_unprotected_after(&self, position: usize) -> Option<&Field> {
        self.fields
            .iter()
            .filter(|field| !field.is_protected())
            .min_by_key(|field| {
                let size = field.buffer_size;
                (field.start + size - position % size) % size
            })
    }

    pub fn modified_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|field| field.is_modified())
    }

    pub fn unprotected_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|field| !field.is_protected())
    }
}

fn find_command_field(fields: &[Field], cells: &[Cell], prompts: &[String]) -> Option<usize> {
    if fields.len() < 2 || prompts.is_empty() {
        return None;
    }

    (0..fields.len()).find(|&i| {
        let previous = &fields[(i + fields.len() - 1) % fields.len()];
        if fields[i].is_protected() || !previous.is_protected() {
            return false;
        }
        let label = previous.text(cells);
        let label = label.trim_end();
        prompts.iter().any(|prompt| label.ends_with(prompt.as_str()))
    })
}
