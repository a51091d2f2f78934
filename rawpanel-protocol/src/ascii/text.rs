//! Positional field packing for `HWCt#` text-tile lines.
//!
//! A text line carries up to 21 pipe-delimited fields (missing trailing
//! fields read as empty/zero). Field 14 is not used in protocol 2.0.

use super::{color_from_wire, color_to_wire, int_val};
use crate::message::{FontStyle, HwcText, TextScale, TextStyle};

/// Decodes the pipe-delimited field list of a `HWCt#` line.
pub(crate) fn decode_text_fields(value: &str) -> HwcText {
    let fields: Vec<&str> = value.split('|').collect();
    let f_str = |i: usize| -> &str { fields.get(i).copied().unwrap_or("") };
    let f_int = |i: usize| -> i32 { int_val(f_str(i)) as i32 };

    let formatting = f_int(1) as u32;

    // A second value or second text line forces pair mode on.
    let mut pair_mode = f_int(8) as u32;
    if (!f_str(7).is_empty() || !f_str(6).is_empty()) && pair_mode == 0 {
        pair_mode = 1;
    }

    let font_face = f_int(15);
    let font_sizes = f_int(16);
    let settings = f_int(17);

    let mut text = HwcText {
        integer_value: f_int(0),
        formatting,
        state_icon: (f_int(2) & 0x3) as u32,
        modifier_icon: ((f_int(2) >> 3) & 0x7) as u32,
        title: f_str(3).to_string(),
        solid_header_bar: f_int(4) == 0,
        textline1: f_str(5).to_string(),
        textline2: f_str(6).to_string(),
        integer_value2: f_int(7),
        pair_mode,
        scale: Some(TextScale {
            scale_type: f_int(9) as u32,
            range_low: f_int(10),
            range_high: f_int(11),
            limit_low: f_int(12),
            limit_high: f_int(13),
        }),
        styling: Some(TextStyle {
            text_font: FontStyle {
                font_face: (font_face & 0x7) as u32,
                text_width: (font_sizes & 0x3) as u32,
                text_height: ((font_sizes >> 2) & 0x3) as u32,
            },
            title_font: FontStyle {
                font_face: ((font_face >> 3) & 0x7) as u32,
                text_width: ((font_sizes >> 4) & 0x3) as u32,
                text_height: ((font_sizes >> 6) & 0x3) as u32,
            },
            // Formatting 10/11 repurposes field 0 as a font size.
            unformatted_font_size: if formatting == HwcText::FMT_ONE_LINE
                || formatting == HwcText::FMT_TWO_LINES
            {
                f_int(0) as u32
            } else {
                0
            },
            fixed_width: (font_face >> 6) & 1 > 0,
            title_bar_padding: (settings & 0x3) as u32,
            extra_character_spacing: ((settings >> 2) & 0x7) as u32,
        }),
        inverted: f_int(18) > 0,
        pixel_color: (f_int(19) > 0).then(|| color_from_wire(f_int(19) as u32)),
        background_color: (f_int(20) > 0).then(|| color_from_wire(f_int(20) as u32)),
    };

    // An empty value field with default formatting means "hide the value".
    if f_str(0).is_empty() && text.formatting == 0 {
        text.formatting = HwcText::FMT_HIDE;
    }
    if text.styling.is_some_and(|s| s.unformatted_font_size > 0) {
        text.integer_value = 0;
    }
    if text.formatting == HwcText::FMT_HIDE {
        text.integer_value = 0;
    }
    if text.formatting == HwcText::FMT_ONE_LINE || text.formatting == HwcText::FMT_TWO_LINES {
        text.solid_header_bar = false;
        text.pair_mode = 0;
    }
    if text.title.is_empty() {
        text.solid_header_bar = false;
    }

    text
}

/// Reconstructs the pipe-delimited field list, trailing empties trimmed.
pub(crate) fn encode_text_fields(text: &HwcText) -> String {
    let mut fields: [String; 21] = std::array::from_fn(|_| String::new());

    if let Some(color) = &text.background_color {
        fields[20] = color_to_wire(color).to_string();
    }
    if let Some(color) = &text.pixel_color {
        fields[19] = color_to_wire(color).to_string();
    }
    if text.inverted {
        fields[18] = "1".to_string();
    }
    if let Some(s) = &text.styling {
        // Bit 0-2: text font face, bit 3-5: title font face, bit 6: fixed width.
        let mut font_face = (s.text_font.font_face & 0x7) | ((s.title_font.font_face & 0x7) << 3);
        if s.fixed_width {
            font_face |= 1 << 6;
        }
        // Bit 0-1: text size H, 2-3: text size V, 4-5: title size H, 6-7: title size V.
        let font_sizes = (s.text_font.text_width & 0x3)
            | ((s.text_font.text_height & 0x3) << 2)
            | ((s.title_font.text_width & 0x3) << 4)
            | ((s.title_font.text_height & 0x3) << 6);
        // Bit 0-1: title bar padding, bit 2-4: extra character spacing.
        let settings = (s.title_bar_padding & 0x3) | ((s.extra_character_spacing & 0x7) << 2);

        if font_face > 0 {
            fields[15] = font_face.to_string();
        }
        if font_sizes > 0 {
            fields[16] = font_sizes.to_string();
        }
        if settings > 0 {
            fields[17] = settings.to_string();
        }
    }
    if let Some(scale) = &text.scale {
        if scale.scale_type > 0 {
            fields[9] = scale.scale_type.to_string();
            fields[10] = scale.range_low.to_string();
            fields[11] = scale.range_high.to_string();
            fields[12] = scale.limit_low.to_string();
            fields[13] = scale.limit_high.to_string();
        }
    }
    if text.pair_mode > 0 {
        fields[8] = text.pair_mode.to_string();
    }
    if text.integer_value2 != 0 {
        fields[7] = text.integer_value2.to_string();
    }
    if !text.textline2.is_empty() {
        fields[6] = text.textline2.clone();
    }
    if !text.textline1.is_empty() {
        fields[5] = text.textline1.clone();
    }
    if !text.solid_header_bar {
        fields[4] = "1".to_string();
    }
    if !text.title.is_empty() {
        fields[3] = text.title.clone();
    }
    if text.state_icon > 0 || text.modifier_icon > 0 {
        let icons = (text.state_icon & 0x3) | ((text.modifier_icon & 0x7) << 3);
        if icons > 0 {
            fields[2] = icons.to_string();
        }
    }
    if text.formatting > 0 {
        fields[1] = text.formatting.to_string();
    }
    match text.formatting {
        HwcText::FMT_ONE_LINE | HwcText::FMT_TWO_LINES => {
            fields[0] = text
                .styling
                .map_or(0, |s| s.unformatted_font_size)
                .to_string();
        }
        HwcText::FMT_HIDE => {
            fields[0].clear();
            fields[1].clear();
        }
        _ => {
            fields[0] = text.integer_value.to_string();
        }
    }

    match fields.iter().rposition(|f| !f.is_empty()) {
        Some(last) => fields[..=last].join("|"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::HwcColor;

    #[test]
    fn test_decode_basic_fields() {
        let text = decode_text_fields("512|3|1|Title|1|Line1|Line2|600");
        assert_eq!(text.integer_value, 512);
        assert_eq!(text.formatting, 3);
        assert_eq!(text.state_icon, 1);
        assert_eq!(text.title, "Title");
        assert!(!text.solid_header_bar);
        assert_eq!(text.textline1, "Line1");
        assert_eq!(text.textline2, "Line2");
        assert_eq!(text.integer_value2, 600);
        // A second value forces pair mode.
        assert_eq!(text.pair_mode, 1);
    }

    #[test]
    fn test_empty_value_forces_hide_formatting() {
        let text = decode_text_fields("");
        assert_eq!(text.formatting, HwcText::FMT_HIDE);
        assert_eq!(text.integer_value, 0);
    }

    #[test]
    fn test_unformatted_modes_clear_header_and_pair() {
        let text = decode_text_fields("2|10|0|Title||||5|3");
        assert_eq!(text.formatting, HwcText::FMT_ONE_LINE);
        assert_eq!(text.styling.unwrap().unformatted_font_size, 2);
        assert_eq!(text.integer_value, 0);
        assert!(!text.solid_header_bar);
        assert_eq!(text.pair_mode, 0);
    }

    #[test]
    fn test_empty_title_clears_solid_header() {
        let text = decode_text_fields("55|0|0||0");
        assert!(!text.solid_header_bar);
    }

    #[test]
    fn test_roundtrip_trims_trailing_fields() {
        let line = "512|3|1|Title|1|Line1|Line2|600|1";
        let text = decode_text_fields(line);
        assert_eq!(encode_text_fields(&text), line);
    }

    #[test]
    fn test_roundtrip_scale_and_styling() {
        let line = "400|2||Pan|1|||||1|0|1000|100|900||9|20|5";
        let text = decode_text_fields(line);
        let scale = text.scale.unwrap();
        assert_eq!(scale.scale_type, 1);
        assert_eq!(scale.range_high, 1000);
        let styling = text.styling.unwrap();
        assert_eq!(styling.text_font.font_face, 1);
        assert_eq!(styling.title_font.font_face, 1);
        assert_eq!(encode_text_fields(&text), line);
    }

    #[test]
    fn test_color_fields() {
        // 0x40 | (3 << 4) = RGB full red; palette index 5.
        let text = decode_text_fields("1||||||||||||||||||0|112|5");
        assert_eq!(
            text.pixel_color,
            Some(HwcColor::Rgb { red: 255, green: 0, blue: 0 })
        );
        assert_eq!(text.background_color, Some(HwcColor::Index { index: 5 }));
    }

    #[test]
    fn test_encode_default_text() {
        // An all-default text still carries the zero value field.
        assert_eq!(encode_text_fields(&HwcText::default()), "0");
    }
}
