//! Sorted-key JSON text used as the block digest preimage.
//!
//! Separators are `", "` between items and `": "` after keys. Every character
//! outside printable ASCII is written as one or two `\uXXXX` UTF-16 escapes, so
//! the output is pure ASCII. Floats use their shortest round-trip digits, with
//! an exponent (`1e+16`, `1.5e-05`) below `1e-4` or from `1e16` upward.

use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use std::{fmt, io, str};

/// Serde formatter producing the canonical spacing and escaping.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    // Control characters, quotes and backslashes never reach this point;
    // serde_json escapes them itself.
    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut start = 0;
        for (at, ch) in fragment.char_indices() {
            if (' '..='~').contains(&ch) {
                continue;
            }
            writer.write_all(fragment[start..at].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = at + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }

    fn write_f64<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: f64) -> io::Result<()> {
        writer.write_all(float_text(value).as_bytes())
    }
}

fn float_text(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude == 0.0 || (1e-4..1e16).contains(&magnitude) {
        let text = value.to_string();
        if text.contains('.') {
            text
        } else {
            text + ".0"
        }
    } else {
        let text = format!("{value:e}");
        match text.split_once('e') {
            Some((mantissa, exponent)) => {
                let (sign, digits) = match exponent.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exponent),
                };
                format!("{mantissa}e{sign}{digits:0>2}")
            }
            None => text,
        }
    }
}

/// Bridges serde_json's byte writer onto a `fmt::Formatter`. The canonical
/// output is ASCII, so every chunk is valid UTF-8.
struct FmtWriter<'a, 'b> {
    inner: &'a mut fmt::Formatter<'b>,
}

impl io::Write for FmtWriter<'_, '_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = str::from_utf8(buf).map_err(io::Error::other)?;
        self.inner.write_str(text).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Displays the wrapped value in canonical form.
pub struct Canonical<'a, T: ?Sized>(pub &'a T);

impl<T: Serialize + ?Sized> fmt::Display for Canonical<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut serializer = Serializer::with_formatter(FmtWriter { inner: f }, CanonicalFormatter);
        self.0.serialize(&mut serializer).map_err(|_| fmt::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn spacing_between_items_and_after_keys() {
        let value = json!({ "b": [1, 2], "a": { "y": true, "x": null } });
        assert_eq!(
            Canonical(&value).to_string(),
            r#"{"a": {"x": null, "y": true}, "b": [1, 2]}"#
        );
    }

    #[test]
    fn empty_containers() {
        assert_eq!(
            Canonical(&json!({ "a": [], "b": {} })).to_string(),
            r#"{"a": [], "b": {}}"#
        );
    }

    #[test]
    fn non_ascii_is_escaped_as_utf16() {
        let value = json!("Zoë \u{1F642} \u{7f}");
        assert_eq!(
            Canonical(&value).to_string(),
            r#""Zo\u00eb \ud83d\ude42 \u007f""#
        );
    }

    #[test]
    fn control_characters_and_quotes() {
        let value = json!("a\"b\\c\nd\u{1}");
        assert_eq!(Canonical(&value).to_string(), r#""a\"b\\c\nd\u0001""#);
    }

    #[test]
    fn float_text_forms() {
        assert_eq!(float_text(1.0), "1.0");
        assert_eq!(float_text(-0.0), "-0.0");
        assert_eq!(float_text(1_600_000_200.5), "1600000200.5");
        assert_eq!(float_text(1_700_000_000.123_456_7), "1700000000.1234567");
        assert_eq!(float_text(0.0001), "0.0001");
        assert_eq!(float_text(1e-5), "1e-05");
        assert_eq!(float_text(1.5e-5), "1.5e-05");
        assert_eq!(float_text(1e16), "1e+16");
        assert_eq!(float_text(1.25e120), "1.25e+120");
    }
}
