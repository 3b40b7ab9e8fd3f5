//! EBCDIC code page 037 translation and display glyph tables
//!
//! Screen cells hold raw host bytes. Rendering goes through [`display_str`],
//! which hands out pre-expanded one-character strings so that a renderer
//! never allocates per cell.

use once_cell::sync::Lazy;

/// Host code page 037 (US/Canada) to Unicode.
pub const EBCDIC_CP037_TO_ASCII: [char; 256] = [
    // 0x00-0x0F: Control characters
    '\x00', '\x01', '\x02', '\x03', '\u{009C}', '\t', '\u{0086}', '\x7F',
    '\u{0097}', '\u{008D}', '\u{008E}', '\x0B', '\x0C', '\r', '\x0E', '\x0F',
    // 0x10-0x1F: Control characters
    '\x10', '\x11', '\x12', '\x13', '\u{009D}', '\u{0085}', '\x08', '\u{0087}',
    '\x18', '\x19', '\u{0092}', '\u{008F}', '\x1C', '\x1D', '\x1E', '\x1F',
    // 0x20-0x2F: Control characters and special
    '\u{0080}', '\u{0081}', '\u{0082}', '\u{0083}', '\u{0084}', '\n', '\x17', '\x1B',
    '\u{0088}', '\u{0089}', '\u{008A}', '\u{008B}', '\u{008C}', '\x05', '\x06', '\x07',
    // 0x30-0x3F: Control characters
    '\u{0090}', '\u{0091}', '\x16', '\u{0093}', '\u{0094}', '\u{0095}', '\u{0096}', '\x04',
    '\u{0098}', '\u{0099}', '\u{009A}', '\u{009B}', '\x14', '\x15', '\u{009E}', '\x1A',
    // 0x40-0x4F: Space and special characters
    ' ', '\u{00A0}', '\u{00E2}', '\u{00E4}', '\u{00E0}', '\u{00E1}', '\u{00E3}', '\u{00E5}',
    '\u{00E7}', '\u{00F1}', '\u{00A2}', '.', '<', '(', '+', '|',
    // 0x50-0x5F: Ampersand and special characters
    '&', '\u{00E9}', '\u{00EA}', '\u{00EB}', '\u{00E8}', '\u{00ED}', '\u{00EE}', '\u{00EF}',
    '\u{00EC}', '\u{00DF}', '!', '$', '*', ')', ';', '\u{00AC}',
    // 0x60-0x6F: Dash and special characters
    '-', '/', '\u{00C2}', '\u{00C4}', '\u{00C0}', '\u{00C1}', '\u{00C3}', '\u{00C5}',
    '\u{00C7}', '\u{00D1}', '\u{00A6}', ',', '%', '_', '>', '?',
    // 0x70-0x7F: Special characters and quotes
    '\u{00F8}', '\u{00C9}', '\u{00CA}', '\u{00CB}', '\u{00C8}', '\u{00CD}', '\u{00CE}', '\u{00CF}',
    '\u{00CC}', '`', ':', '#', '@', '\'', '=', '"',
    // 0x80-0x8F: Special character and lowercase a-i
    '\u{00D8}', 'a', 'b', 'c', 'd', 'e', 'f', 'g',
    'h', 'i', '\u{00AB}', '\u{00BB}', '\u{00F0}', '\u{00FD}', '\u{00FE}', '\u{00B1}',
    // 0x90-0x9F: Degree symbol and lowercase j-r
    '\u{00B0}', 'j', 'k', 'l', 'm', 'n', 'o', 'p',
    'q', 'r', '\u{00AA}', '\u{00BA}', '\u{00E6}', '\u{00B8}', '\u{00C6}', '\u{00A4}',
    // 0xA0-0xAF: Micro sign and lowercase s-z
    '\u{00B5}', '~', 's', 't', 'u', 'v', 'w', 'x',
    'y', 'z', '\u{00A1}', '\u{00BF}', '\u{00D0}', '\u{00DD}', '\u{00DE}', '\u{00AE}',
    // 0xB0-0xBF: Caret and special characters
    '^', '\u{00A3}', '\u{00A5}', '\u{00B7}', '\u{00A9}', '\u{00A7}', '\u{00B6}', '\u{00BC}',
    '\u{00BD}', '\u{00BE}', '[', ']', '\u{00AF}', '\u{00A8}', '\u{00B4}', '\u{00D7}',
    // 0xC0-0xCF: Left brace and uppercase A-I
    '{', 'A', 'B', 'C', 'D', 'E', 'F', 'G',
    'H', 'I', '\u{00AD}', '\u{00F4}', '\u{00F6}', '\u{00F2}', '\u{00F3}', '\u{00F5}',
    // 0xD0-0xDF: Right brace and uppercase J-R
    '}', 'J', 'K', 'L', 'M', 'N', 'O', 'P',
    'Q', 'R', '\u{00B9}', '\u{00FB}', '\u{00FC}', '\u{00F9}', '\u{00FA}', '\u{00FF}',
    // 0xE0-0xEF: Backslash and uppercase S-Z
    '\\', '\u{00F7}', 'S', 'T', 'U', 'V', 'W', 'X',
    'Y', 'Z', '\u{00B2}', '\u{00D4}', '\u{00D6}', '\u{00D2}', '\u{00D3}', '\u{00D5}',
    // 0xF0-0xFF: Digits 0-9 and special characters
    '0', '1', '2', '3', '4', '5', '6', '7',
    '8', '9', '\u{00B3}', '\u{00DB}', '\u{00DC}', '\u{00D9}', '\u{00DA}', '\u{009F}',
];

/// Reverse of [`EBCDIC_CP037_TO_ASCII`]; characters with no code point map to
/// the EBCDIC space.
static ASCII_TO_EBCDIC: Lazy<[u8; 256]> = Lazy::new(|| {
    let mut table = [0x40u8; 256];
    // walk backwards so the lowest EBCDIC code wins for duplicates
    for (ebcdic, ch) in EBCDIC_CP037_TO_ASCII.iter().enumerate().rev() {
        let code = *ch as u32;
        if code < 256 {
            table[code as usize] = ebcdic as u8;
        }
    }
    table
});

/// One string per EBCDIC byte, built once. Values up to 0x20 and anything that
/// translates to a control character render as a blank.
static DISPLAY_STRINGS: Lazy<Vec<String>> = Lazy::new(|| {
    (0..256usize)
        .map(|byte| {
            let ch = EBCDIC_CP037_TO_ASCII[byte];
            if byte <= 0x20 || ch.is_control() {
                " ".to_string()
            } else {
                ch.to_string()
            }
        })
        .collect()
});

/// Convert an EBCDIC byte to its Unicode character
///
/// ```
/// use tn3270r::ebcdic::ebcdic_to_ascii;
///
/// assert_eq!(ebcdic_to_ascii(0xC1), 'A');
/// assert_eq!(ebcdic_to_ascii(0x81), 'a');
/// assert_eq!(ebcdic_to_ascii(0xF0), '0');
/// ```
pub fn ebcdic_to_ascii(byte: u8) -> char {
    EBCDIC_CP037_TO_ASCII[byte as usize]
}

/// Convert a character to EBCDIC, falling back to 0x40 (space)
///
/// ```
/// use tn3270r::ebcdic::ascii_to_ebcdic;
///
/// assert_eq!(ascii_to_ebcdic('A'), 0xC1);
/// assert_eq!(ascii_to_ebcdic('0'), 0xF0);
/// ```
pub fn ascii_to_ebcdic(ch: char) -> u8 {
    let code = ch as u32;
    if code < 256 {
        ASCII_TO_EBCDIC[code as usize]
    } else {
        0x40
    }
}

/// Display string for a non-graphics data byte.
pub fn display_str(byte: u8) -> &'static str {
    DISPLAY_STRINGS[byte as usize].as_str()
}

/// Convert a run of EBCDIC bytes to a `String`
pub fn ebcdic_to_ascii_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| ebcdic_to_ascii(b)).collect()
}

/// Convert a string to EBCDIC bytes
pub fn ascii_to_ebcdic_vec(s: &str) -> Vec<u8> {
    s.chars().map(ascii_to_ebcdic).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letters_and_digits() {
        for (i, ch) in ('A'..='I').enumerate() {
            assert_eq!(ebcdic_to_ascii(0xC1 + i as u8), ch);
        }
        for (i, ch) in ('0'..='9').enumerate() {
            assert_eq!(ebcdic_to_ascii(0xF0 + i as u8), ch);
        }
    }

    #[test]
    fn test_round_trip_printable() {
        for ch in " ABCXYZabcxyz0123456789.,:;=+-*/()<>".chars() {
            assert_eq!(ebcdic_to_ascii(ascii_to_ebcdic(ch)), ch, "char {ch:?}");
        }
    }

    #[test]
    fn test_display_strings_blank_controls() {
        assert_eq!(display_str(0x00), " ");
        assert_eq!(display_str(0x20), " ");
        assert_eq!(display_str(0x15), " ");
        assert_eq!(display_str(0xC1), "A");
        assert_eq!(display_str(0x4B), ".");
    }

    #[test]
    fn test_unmapped_char_becomes_space() {
        assert_eq!(ascii_to_ebcdic('\u{4E2D}'), 0x40);
    }

    #[test]
    fn test_string_conversion() {
        let bytes = ascii_to_ebcdic_vec("HELLO");
        assert_eq!(bytes, vec![0xC8, 0xC5, 0xD3, 0xD3, 0xD6]);
        assert_eq!(ebcdic_to_ascii_string(&bytes), "HELLO");
    }
}
