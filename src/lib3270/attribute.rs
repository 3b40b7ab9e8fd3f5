//! Field and character attributes for 3270
//!
//! A start-field cell carries a [`StartFieldAttribute`] (the field attribute
//! byte from SF, or the 0xC0 pair of SFE) plus any extended attributes. Data
//! cells pick up [`Attribute`]s from SA orders. Both feed the resolved
//! [`ScreenContext`] a renderer draws with.

use log::trace;

use super::codes::*;

/// The 3270 field attribute byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StartFieldAttribute(u8);

impl StartFieldAttribute {
    pub fn new(value: u8) -> Self {
        Self(value)
    }

    /// Raw attribute byte as sent on the wire
    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_protected(self) -> bool {
        (self.0 & ATTR_PROTECTED) != 0
    }

    pub fn is_numeric(self) -> bool {
        (self.0 & ATTR_NUMERIC) != 0
    }

    /// Protected and numeric together mean the cursor skips the field
    pub fn is_auto_skip(self) -> bool {
        self.is_protected() && self.is_numeric()
    }

    pub fn is_hidden(self) -> bool {
        (self.0 & ATTR_DISPLAY) == DISPLAY_HIDDEN
    }

    pub fn is_intensified(self) -> bool {
        (self.0 & ATTR_DISPLAY) == DISPLAY_INTENSIFIED
    }

    /// Modified Data Tag
    pub fn is_modified(self) -> bool {
        (self.0 & ATTR_MDT) != 0
    }

    pub fn set_modified(&mut self, modified: bool) {
        if modified {
            self.0 |= ATTR_MDT;
        } else {
            self.0 &= !ATTR_MDT;
        }
    }

    /// Base display context of a field before extended attributes apply.
    ///
    /// Follows the four-color convention of base 3270 terminals: protection
    /// and intensity select the foreground.
    pub fn context(self, base: ScreenContext) -> ScreenContext {
        let foreground = match (self.is_protected(), self.is_intensified()) {
            (true, true) => Color::White,
            (true, false) => Color::Blue,
            (false, true) => Color::Red,
            (false, false) => Color::Green,
        };
        ScreenContext {
            foreground,
            high_intensity: self.is_intensified(),
            ..base
        }
    }
}

/// Extended colors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Neutral,
    Blue,
    Red,
    Pink,
    Green,
    Turquoise,
    Yellow,
    White,
    Black,
    DeepBlue,
    Orange,
    Purple,
    PaleGreen,
    PaleTurquoise,
    Grey,
    /// Default (0x00) or a code this terminal does not know
    Other(u8),
}

impl Color {
    pub fn from_code(code: u8) -> Self {
        match code {
            COLOR_NEUTRAL => Self::Neutral,
            COLOR_BLUE => Self::Blue,
            COLOR_RED => Self::Red,
            COLOR_PINK => Self::Pink,
            COLOR_GREEN => Self::Green,
            COLOR_TURQUOISE => Self::Turquoise,
            COLOR_YELLOW => Self::Yellow,
            COLOR_WHITE => Self::White,
            COLOR_BLACK => Self::Black,
            COLOR_DEEP_BLUE => Self::DeepBlue,
            COLOR_ORANGE => Self::Orange,
            COLOR_PURPLE => Self::Purple,
            COLOR_PALE_GREEN => Self::PaleGreen,
            COLOR_PALE_TURQUOISE => Self::PaleTurquoise,
            COLOR_GREY => Self::Grey,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Neutral => COLOR_NEUTRAL,
            Self::Blue => COLOR_BLUE,
            Self::Red => COLOR_RED,
            Self::Pink => COLOR_PINK,
            Self::Green => COLOR_GREEN,
            Self::Turquoise => COLOR_TURQUOISE,
            Self::Yellow => COLOR_YELLOW,
            Self::White => COLOR_WHITE,
            Self::Black => COLOR_BLACK,
            Self::DeepBlue => COLOR_DEEP_BLUE,
            Self::Orange => COLOR_ORANGE,
            Self::Purple => COLOR_PURPLE,
            Self::PaleGreen => COLOR_PALE_GREEN,
            Self::PaleTurquoise => COLOR_PALE_TURQUOISE,
            Self::Grey => COLOR_GREY,
            Self::Other(code) => code,
        }
    }

    /// Default and neutral defer to whatever the field says
    fn is_inherit(self) -> bool {
        matches!(self, Self::Other(COLOR_DEFAULT) | Self::Neutral)
    }
}

/// Extended highlighting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    Default,
    Normal,
    Blink,
    Reverse,
    Underscore,
    Other(u8),
}

impl Highlight {
    pub fn from_code(code: u8) -> Self {
        match code {
            HIGHLIGHT_DEFAULT => Self::Default,
            HIGHLIGHT_NORMAL => Self::Normal,
            HIGHLIGHT_BLINK => Self::Blink,
            HIGHLIGHT_REVERSE => Self::Reverse,
            HIGHLIGHT_UNDERSCORE => Self::Underscore,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Default => HIGHLIGHT_DEFAULT,
            Self::Normal => HIGHLIGHT_NORMAL,
            Self::Blink => HIGHLIGHT_BLINK,
            Self::Reverse => HIGHLIGHT_REVERSE,
            Self::Underscore => HIGHLIGHT_UNDERSCORE,
            Self::Other(code) => code,
        }
    }
}

/// A type/value attribute pair as carried by SFE, SA and MF orders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    /// Returns character attributes to the field's defaults
    Reset,
    Highlight(Highlight),
    Foreground(Color),
    Background(Color),
    Charset(u8),
    Transparency(u8),
    Validation(u8),
    Outlining(u8),
}

impl Attribute {
    /// Build an attribute from a wire pair. The field attribute type (0xC0)
    /// and unknown types yield `None`.
    pub fn from_pair(kind: u8, value: u8) -> Option<Self> {
        let attribute = match kind {
            XA_RESET => Self::Reset,
            XA_HIGHLIGHTING => Self::Highlight(Highlight::from_code(value)),
            XA_FOREGROUND => Self::Foreground(Color::from_code(value)),
            XA_BACKGROUND => Self::Background(Color::from_code(value)),
            XA_CHARSET => Self::Charset(value),
            XA_TRANSPARENCY => Self::Transparency(value),
            XA_VALIDATION => Self::Validation(value),
            XA_OUTLINING => Self::Outlining(value),
            _ => {
                trace!("ignoring attribute type 0x{kind:02X} value 0x{value:02X}");
                return None;
            }
        };
        Some(attribute)
    }

    /// Attribute type byte
    pub fn kind(&self) -> u8 {
        match self {
            Self::Reset => XA_RESET,
            Self::Highlight(_) => XA_HIGHLIGHTING,
            Self::Foreground(_) => XA_FOREGROUND,
            Self::Background(_) => XA_BACKGROUND,
            Self::Charset(_) => XA_CHARSET,
            Self::Transparency(_) => XA_TRANSPARENCY,
            Self::Validation(_) => XA_VALIDATION,
            Self::Outlining(_) => XA_OUTLINING,
        }
    }

    /// Attribute value byte
    pub fn value(&self) -> u8 {
        match self {
            Self::Reset => 0x00,
            Self::Highlight(h) => h.code(),
            Self::Foreground(c) | Self::Background(c) => c.code(),
            Self::Charset(v) | Self::Transparency(v) | Self::Validation(v) | Self::Outlining(v) => {
                *v
            }
        }
    }

    pub fn is_reset(&self) -> bool {
        matches!(self, Self::Reset)
    }

    /// True when this attribute's type appears in `reply_types`
    pub fn matches(&self, reply_types: &[u8]) -> bool {
        reply_types.contains(&self.kind())
    }

    /// Append the type/value pair
    pub fn pack(&self, out: &mut Vec<u8>) {
        out.push(self.kind());
        out.push(self.value());
    }

    /// Apply this attribute to a running context. `field` is the context of
    /// the enclosing field, which `Reset` and default values fall back to.
    pub fn apply(&self, context: &mut ScreenContext, field: ScreenContext) {
        match self {
            Self::Reset => *context = field,
            Self::Foreground(color) => {
                context.foreground = if color.is_inherit() { field.foreground } else { *color };
            }
            Self::Background(color) => {
                context.background = if color.is_inherit() { field.background } else { *color };
            }
            Self::Highlight(highlight) => match highlight {
                Highlight::Reverse => context.reverse_video = true,
                Highlight::Underscore => context.underscore = true,
                Highlight::Default | Highlight::Normal => {
                    context.reverse_video = field.reverse_video;
                    context.underscore = field.underscore;
                }
                Highlight::Blink | Highlight::Other(_) => {}
            },
            Self::Charset(_)
            | Self::Transparency(_)
            | Self::Validation(_)
            | Self::Outlining(_) => {}
        }
    }
}

/// Resolved rendering state of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenContext {
    pub foreground: Color,
    pub background: Color,
    pub reverse_video: bool,
    pub high_intensity: bool,
    pub underscore: bool,
}

impl Default for ScreenContext {
    fn default() -> Self {
        Self {
            foreground: Color::Green,
            background: Color::Black,
            reverse_video: false,
            high_intensity: false,
            underscore: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_attribute_bits() {
        let attr = StartFieldAttribute::new(ATTR_PROTECTED | ATTR_NUMERIC);
        assert!(attr.is_protected());
        assert!(attr.is_numeric());
        assert!(attr.is_auto_skip());
        assert!(!attr.is_modified());

        let hidden = StartFieldAttribute::new(DISPLAY_HIDDEN);
        assert!(hidden.is_hidden());
        assert!(!hidden.is_intensified());
    }

    #[test]
    fn test_field_attribute_mdt() {
        let mut attr = StartFieldAttribute::new(0x40);
        attr.set_modified(true);
        assert_eq!(attr.value(), 0x41);
        attr.set_modified(false);
        assert_eq!(attr.value(), 0x40);
    }

    #[test]
    fn test_attribute_pair_round_trip() {
        let pairs = [
            (XA_RESET, 0x00),
            (XA_HIGHLIGHTING, HIGHLIGHT_REVERSE),
            (XA_FOREGROUND, COLOR_YELLOW),
            (XA_BACKGROUND, 0x00),
            (XA_CHARSET, 0xF1),
            (XA_VALIDATION, VALIDATION_MANDATORY_ENTRY),
        ];
        for (kind, value) in pairs {
            let attribute = Attribute::from_pair(kind, value).unwrap();
            let mut out = Vec::new();
            attribute.pack(&mut out);
            assert_eq!(out, vec![kind, value]);
        }
    }

    #[test]
    fn test_field_type_is_not_a_character_attribute() {
        assert_eq!(Attribute::from_pair(XA_3270, 0x60), None);
        assert_eq!(Attribute::from_pair(0x99, 0x01), None);
    }

    #[test]
    fn test_reply_type_matching() {
        let attribute = Attribute::Foreground(Color::Red);
        assert!(attribute.matches(&[XA_HIGHLIGHTING, XA_FOREGROUND]));
        assert!(!attribute.matches(&[XA_BACKGROUND]));
        assert!(!attribute.matches(&[]));
    }

    #[test]
    fn test_field_context_colors() {
        let base = ScreenContext::default();
        assert_eq!(StartFieldAttribute::new(ATTR_PROTECTED).context(base).foreground, Color::Blue);
        let bright = StartFieldAttribute::new(DISPLAY_INTENSIFIED).context(base);
        assert_eq!(bright.foreground, Color::Red);
        assert!(bright.high_intensity);
    }

    #[test]
    fn test_apply_and_reset() {
        let field = ScreenContext::default();
        let mut context = field;
        Attribute::Foreground(Color::Pink).apply(&mut context, field);
        Attribute::Highlight(Highlight::Reverse).apply(&mut context, field);
        assert_eq!(context.foreground, Color::Pink);
        assert!(context.reverse_video);

        Attribute::Foreground(Color::Other(COLOR_DEFAULT)).apply(&mut context, field);
        assert_eq!(context.foreground, field.foreground);

        Attribute::Reset.apply(&mut context, field);
        assert_eq!(context, field);
    }
}
