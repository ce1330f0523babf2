//! SCRAM attribute-value pairs (`r=...,s=...,i=...`) and value grammar.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::SaslErrorKind;

/// Parsed `name=value` pairs of a server message.
#[derive(Debug)]
pub(crate) struct Attributes<'a> {
    pairs: Vec<(char, &'a str)>,
}

impl<'a> Attributes<'a> {
    /// Split a comma-separated list of single-letter attributes.
    pub(crate) fn parse(text: &'a str) -> Result<Self, SaslErrorKind> {
        let mut pairs = Vec::new();
        for entry in text.split(',') {
            let mut chars = entry.chars();
            let (Some(name), Some('=')) = (chars.next(), chars.next()) else {
                return Err(SaslErrorKind::InvalidAttributePair);
            };
            pairs.push((name, chars.as_str()));
        }
        Ok(Self { pairs })
    }

    /// Value of an attribute; a repeated attribute yields its last value.
    pub(crate) fn get(&self, name: char) -> Option<&'a str> {
        self.pairs
            .iter()
            .rev()
            .find(|(n, _)| *n == name)
            .map(|(_, value)| *value)
    }

    /// Value of a mandatory attribute; empty counts as missing.
    pub(crate) fn require(&self, name: char, what: &'static str) -> Result<&'a str, SaslErrorKind> {
        match self.get(name) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(SaslErrorKind::MissingAttribute(what)),
        }
    }
}

/// `printable = %x21-2B / %x2D-7E` (printable ASCII except ",").
pub(crate) fn is_printable(text: &str) -> bool {
    text.bytes()
        .all(|c| (0x21..=0x2b).contains(&c) || (0x2d..=0x7e).contains(&c))
}

/// Standard base64 with canonical `=` padding.
pub(crate) fn is_base64(text: &str) -> bool {
    let bytes = text.as_bytes();
    if bytes.len() % 4 != 0 {
        return false;
    }
    let padding = bytes.iter().rev().take_while(|&&b| b == b'=').count();
    padding <= 2
        && bytes[..bytes.len() - padding]
            .iter()
            .all(|&b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
}

/// `^[1-9][0-9]*$`
pub(crate) fn is_positive_integer(text: &str) -> bool {
    let mut bytes = text.bytes();
    matches!(bytes.next(), Some(b'1'..=b'9')) && bytes.all(|b| b.is_ascii_digit())
}

pub(crate) fn encode(data: impl AsRef<[u8]>) -> String {
    STANDARD.encode(data)
}

pub(crate) fn decode(text: &str) -> Option<Vec<u8>> {
    STANDARD.decode(text).ok()
}
