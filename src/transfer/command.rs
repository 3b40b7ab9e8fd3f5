//! IND$FILE command strings
//!
//! The host side of a transfer is started by typing an IND$FILE command.
//! The command staged here also tells the engine how to finalize the file
//! the host sends back: ASCII conversion, whether the data set name already
//! carries a top-level qualifier, and the record format.

use std::fmt;

use crate::error::TransferProtocolError;

const PROGRAM: &str = "IND$FILE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Host to terminal
    Get,
    /// Terminal to host
    Put,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndFileCommand {
    pub direction: Direction,
    /// Upper-cased data set name, without quotes
    pub dataset: String,
    /// The name was quoted, so the host will not add the user's prefix
    pub has_tlq: bool,
    pub ascii: bool,
    pub crlf: bool,
    pub append: bool,
    pub record_format: Option<char>,
    pub lrecl: Option<u32>,
}

impl IndFileCommand {
    /// Text transfer of `file_name`: upper-cased with any `.TXT` suffix
    /// removed, ASCII and CRLF on.
    pub fn text(direction: Direction, file_name: &str) -> Self {
        let mut dataset = file_name.trim().to_uppercase();
        if let Some(stem) = dataset.strip_suffix(".TXT") {
            dataset = stem.to_string();
        }
        let has_tlq = dataset.starts_with('\'');
        Self {
            direction,
            dataset: dataset.trim_matches('\'').to_string(),
            has_tlq,
            ascii: true,
            crlf: true,
            append: false,
            record_format: None,
            lrecl: None,
        }
    }

    /// Parse a command as typed, with or without a leading `TSO`
    pub fn parse(command: &str) -> Result<Self, TransferProtocolError> {
        let malformed =
            |why: &str| TransferProtocolError::InvalidCommand(format!("{why}: {command}"));
        let upper = command.trim().to_uppercase();
        let mut words = upper.split_whitespace().peekable();

        if words.peek() == Some(&"TSO") {
            words.next();
        }
        if words.next() != Some(PROGRAM) {
            return Err(malformed("not an IND$FILE command"));
        }
        let direction = match words.next() {
            Some("GET") => Direction::Get,
            Some("PUT") => Direction::Put,
            _ => return Err(malformed("missing GET or PUT")),
        };
        let name = words.next().ok_or_else(|| malformed("missing data set name"))?;

        let mut parsed = Self {
            direction,
            dataset: name.trim_matches('\'').to_string(),
            has_tlq: name.starts_with('\''),
            ascii: false,
            crlf: false,
            append: false,
            record_format: None,
            lrecl: None,
        };

        for word in words {
            match word {
                "ASCII" => parsed.ascii = true,
                "CRLF" => parsed.crlf = true,
                "APPEND" => parsed.append = true,
                _ => {
                    if let Some(value) = option_value(word, "RECFM") {
                        parsed.record_format = value.chars().next();
                    } else if let Some(value) = option_value(word, "LRECL") {
                        parsed.lrecl = Some(value.parse().map_err(|_| malformed("bad LRECL"))?);
                    } else {
                        return Err(malformed("unknown option"));
                    }
                }
            }
        }
        Ok(parsed)
    }

    /// The command line to type. Outside the TSO READY prompt the command
    /// needs a `TSO` prefix.
    pub fn command_line(&self, on_tso_prompt: bool) -> String {
        if on_tso_prompt {
            self.to_string()
        } else {
            format!("TSO {self}")
        }
    }
}

/// `RECFM(V)` -> `Some("V")`
fn option_value<'a>(word: &'a str, name: &str) -> Option<&'a str> {
    word.strip_prefix(name)?.strip_prefix('(')?.strip_suffix(')')
}

impl fmt::Display for IndFileCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.direction {
            Direction::Get => "GET",
            Direction::Put => "PUT",
        };
        if self.has_tlq {
            write!(f, "{PROGRAM} {verb} '{}'", self.dataset)?;
        } else {
            write!(f, "{PROGRAM} {verb} {}", self.dataset)?;
        }
        if self.ascii {
            write!(f, " ASCII")?;
        }
        if self.crlf {
            write!(f, " CRLF")?;
        }
        if self.append {
            write!(f, " APPEND")?;
        }
        if let Some(recfm) = self.record_format {
            write!(f, " RECFM({recfm})")?;
        }
        if let Some(lrecl) = self.lrecl {
            write!(f, " LRECL({lrecl})")?;
        }
        Ok(())
    }
}
