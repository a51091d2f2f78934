//! ASCII line codec.
//!
//! Maps between protocol ASCII lines (one command/state/event per line) and
//! the typed message model, in both directions. The mapping is lossy by
//! design: lines that match no rule are dropped, and a batch of N lines
//! yields at most N messages without ever failing as a whole.
//!
//! Dispatch is a prioritized chain of matchers; ordering matters because
//! several prefixes are ambiguous (`HWCg#` vs `HWCgRGB#`/`HWCgGray#`, the
//! generic single-integer settings vs register writes).

mod gfx;
mod inbound;
mod outbound;
mod text;

pub use gfx::GfxAssembler;
pub use inbound::{encode_inbound, InboundDecoder};
pub use outbound::{decode_outbound, encode_outbound};

use crate::message::{HwcColor, InboundMessage};

/// Decodes a batch of inbound lines with a fresh graphics reassembly state.
///
/// For a long-lived connection use [`InboundDecoder`], which keeps the
/// multi-line graphics state across batches.
pub fn decode_inbound<S: AsRef<str>>(lines: &[S]) -> Vec<InboundMessage> {
    InboundDecoder::new().decode(lines)
}

/// Parses an integer the way the wire format expects: surrounding whitespace
/// ignored, anything unparsable reads as zero.
pub(crate) fn int_val(s: &str) -> i64 {
    s.trim().parse().unwrap_or(0)
}

/// True if `s` is a non-empty run of ASCII digits.
pub(crate) fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// True if `s` is a valid `HWC#`-style ID list: digits and commas only.
pub(crate) fn valid_id_list(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit() || b == b',')
}

/// Splits a comma-separated ID list; unparsable entries read as zero.
pub(crate) fn parse_id_list(s: &str) -> Vec<u32> {
    s.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| int_val(part) as u32)
        .collect()
}

/// Splits on `token`, trims each part, and drops empties.
pub(crate) fn trim_explode(s: &str, token: char) -> Vec<String> {
    s.split(token)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Collapses a multi-line string to a single line: each line trimmed, then
/// concatenated. Required because the wire format is strictly line oriented.
pub(crate) fn strip_line_breaks(s: &str) -> String {
    s.split('\n').map(str::trim).collect()
}

/// Line-break stripping for SVG: a trimmed line not ending in `>` is joined
/// with a trailing space so path data split across lines keeps its
/// separators.
pub(crate) fn strip_line_breaks_svg(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for part in s.split('\n') {
        let part = part.trim();
        out.push_str(part);
        if !part.is_empty() && !part.ends_with('>') {
            out.push(' ');
        }
    }
    out
}

/// Maps an 8-bit color channel down to the 2-bit wire field.
fn channel_to_wire(v: u32) -> u32 {
    (v.min(0xFF) * 3 + 127) / 255
}

/// Maps a 2-bit wire field back up to an 8-bit color channel.
fn channel_from_wire(v: u32) -> u32 {
    (v & 0x3) * 85
}

/// Packs a color into the shared color-integer scheme: bit 0x40 set means
/// RGB with 2-bit channels at shifts 4/2/0, clear means a 5-bit palette
/// index. (The `HWCc#` command additionally sets bit 0x80 on encode.)
pub(crate) fn color_to_wire(color: &HwcColor) -> u32 {
    match color {
        HwcColor::Rgb { red, green, blue } => {
            0b100_0000
                | (channel_to_wire(*red) << 4)
                | (channel_to_wire(*green) << 2)
                | channel_to_wire(*blue)
        }
        HwcColor::Index { index } => index & 0x1F,
    }
}

/// Unpacks the shared color-integer scheme.
pub(crate) fn color_from_wire(value: u32) -> HwcColor {
    if value & 0b100_0000 > 0 {
        HwcColor::Rgb {
            red: channel_from_wire(value >> 4),
            green: channel_from_wire(value >> 2),
            blue: channel_from_wire(value),
        }
    } else {
        HwcColor::Index { index: value & 0x1F }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_val() {
        assert_eq!(int_val("42"), 42);
        assert_eq!(int_val(" -7 "), -7);
        assert_eq!(int_val("bad"), 0);
        assert_eq!(int_val(""), 0);
    }

    #[test]
    fn test_id_list() {
        assert!(valid_id_list("3,4,5"));
        assert!(!valid_id_list("3,x"));
        assert!(!valid_id_list(""));
        assert_eq!(parse_id_list("3,4,5"), vec![3, 4, 5]);
    }

    #[test]
    fn test_strip_line_breaks() {
        assert_eq!(strip_line_breaks(" test1 "), "test1");
        assert_eq!(strip_line_breaks("a\n  b\nc  "), "abc");
    }

    #[test]
    fn test_strip_line_breaks_svg() {
        // Tag lines concatenate directly, continuation lines keep a space.
        assert_eq!(strip_line_breaks_svg("<svg>\n<path d=\"M0 0\n L1 1\"/>"), "<svg><path d=\"M0 0 L1 1\"/>");
    }

    #[test]
    fn test_color_wire_roundtrip() {
        let rgb = HwcColor::Rgb { red: 255, green: 0, blue: 85 };
        let packed = color_to_wire(&rgb);
        assert_eq!(packed, 0b100_0000 | (3 << 4) | 1);
        assert_eq!(color_from_wire(packed), rgb);

        let index = HwcColor::Index { index: 5 };
        assert_eq!(color_to_wire(&index), 5);
        assert_eq!(color_from_wire(5), index);
    }
}
