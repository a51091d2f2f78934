//! Multi-line graphics transfer: chunk encoding and reassembly.
//!
//! An image travels as a run of `HWCg#`/`HWCgGray#`/`HWCgRGB#` lines. Part 0
//! carries the header (`/maxIndex,WxH[,X,Y]`); a header-less part 0 is the
//! legacy three-line 64x32 form. Parts must arrive in sequence with a
//! matching image type and HWC list; anything else drops the line and the
//! transfer stays dead until the next part 0.

use super::parse_id_list;
use crate::message::{HwcGfx, HwcState, ImageType};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

/// Payload bytes per graphics line before base64 encoding.
pub(crate) const BYTES_PER_LINE: usize = 170;

/// One parsed graphics line.
pub(crate) struct GfxPart<'a> {
    pub image_type: ImageType,
    /// The raw HWC list text; compared verbatim between parts.
    pub ids: &'a str,
    pub index: u32,
    pub header: Option<GfxHeader>,
    pub data: Vec<u8>,
}

pub(crate) struct GfxHeader {
    pub max_index: u32,
    pub width: u32,
    pub height: u32,
    pub offset: Option<(u32, u32)>,
}

#[derive(Debug)]
struct Transfer {
    image: HwcGfx,
    ids: String,
    /// Index of the most recently counted part. Advances even when a part is
    /// rejected for being out of sequence, so a gap kills the transfer until
    /// the next part 0.
    last_index: i64,
    max_index: i64,
}

/// Reassembles multi-line graphics transfers.
///
/// One instance belongs to exactly one reading direction of one connection;
/// it is the only mutable state the ASCII codec keeps between lines.
#[derive(Debug, Default)]
pub struct GfxAssembler {
    current: Option<Transfer>,
}

impl GfxAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops any transfer in progress.
    pub fn reset(&mut self) {
        self.current = None;
    }

    /// Feeds one parsed graphics line. Returns the assembled state when the
    /// final part completes a transfer.
    pub(crate) fn feed(&mut self, part: GfxPart<'_>) -> Option<HwcState> {
        if part.index == 0 {
            if let Some(t) = &self.current {
                if t.last_index < t.max_index {
                    tracing::warn!(hwc = %t.ids, "graphics transfer restarted before completion");
                }
            }
            let image = match &part.header {
                Some(h) => HwcGfx {
                    image_type: part.image_type,
                    width: h.width,
                    height: h.height,
                    xy_offset: h.offset.is_some(),
                    x: h.offset.map_or(0, |o| o.0),
                    y: h.offset.map_or(0, |o| o.1),
                    data: Vec::new(),
                },
                // Legacy three-line format: fixed 64x32 mono-sized tile.
                None => HwcGfx {
                    image_type: part.image_type,
                    width: 64,
                    height: 32,
                    ..Default::default()
                },
            };
            self.current = Some(Transfer {
                image,
                ids: part.ids.to_string(),
                last_index: -1,
                max_index: part.header.as_ref().map_or(2, |h| i64::from(h.max_index)),
            });
        }

        let transfer = match &mut self.current {
            Some(t) => t,
            None => {
                tracing::debug!("graphics part with no transfer in progress");
                return None;
            }
        };
        if transfer.image.image_type != part.image_type {
            tracing::debug!("graphics part image type mismatch, dropping line");
            return None;
        }
        if transfer.ids != part.ids {
            tracing::debug!(
                expected = %transfer.ids,
                got = %part.ids,
                "graphics part addresses a different HWC list, dropping line"
            );
            return None;
        }

        transfer.last_index += 1;
        if i64::from(part.index) != transfer.last_index {
            tracing::debug!(
                expected = transfer.last_index,
                got = part.index,
                "graphics part out of sequence, dropping line"
            );
            return None;
        }

        transfer.image.data.extend_from_slice(&part.data);
        if transfer.last_index != transfer.max_index {
            return None;
        }

        self.current.take().map(|t| HwcState {
            ids: parse_id_list(&t.ids),
            gfx: Some(t.image),
            ..Default::default()
        })
    }
}

/// Parses a graphics line into its parts, or `None` if the line is not a
/// well-formed graphics command. Malformed base64 decodes to zero bytes
/// rather than rejecting the line; the protocol has no way to signal the
/// error back and an aborted transfer would lose the whole image.
pub(crate) fn parse_gfx_part(line: &str) -> Option<GfxPart<'_>> {
    // Order matters: `HWCg#` must not swallow the RGB/Gray variants.
    let (prefix, image_type) = [
        ("HWCgRGB#", ImageType::Rgb16),
        ("HWCgGray#", ImageType::Gray4),
        ("HWCg#", ImageType::Mono),
    ]
    .into_iter()
    .find(|(p, _)| line.starts_with(p))?;

    let rest = line.strip_prefix(prefix)?;
    let (addr, payload) = rest.split_once(':')?;
    let (ids, desc) = addr.split_once('=')?;
    if !super::valid_id_list(ids) {
        return None;
    }

    let (index_str, header) = match desc.split_once('/') {
        Some((index, header)) => (index, Some(parse_gfx_header(header)?)),
        None => (desc, None),
    };
    if !super::all_digits(index_str) {
        return None;
    }

    Some(GfxPart {
        image_type,
        ids,
        index: index_str.parse().ok()?,
        header,
        data: BASE64.decode(payload).unwrap_or_default(),
    })
}

/// Parses the part-0 header group: `max,WxH` or `max,WxH,X,Y`.
fn parse_gfx_header(header: &str) -> Option<GfxHeader> {
    let mut parts = header.split(',');
    let max_index = parse_u32(parts.next()?)?;
    let (w, h) = parts.next()?.split_once('x')?;
    let offset = match (parts.next(), parts.next()) {
        (None, _) => None,
        (Some(x), Some(y)) => Some((parse_u32(x)?, parse_u32(y)?)),
        (Some(_), None) => return None,
    };
    if parts.next().is_some() {
        return None;
    }
    Some(GfxHeader {
        max_index,
        width: parse_u32(w)?,
        height: parse_u32(h)?,
        offset,
    })
}

fn parse_u32(s: &str) -> Option<u32> {
    if !super::all_digits(s) {
        return None;
    }
    s.parse().ok()
}

/// Emits the line run for an image addressed to a single HWC ID.
pub(crate) fn encode_gfx_lines(gfx: &HwcGfx, id: u32, out: &mut Vec<String>) {
    let command = match gfx.image_type {
        ImageType::Mono => "HWCg",
        ImageType::Gray4 => "HWCgGray",
        ImageType::Rgb16 => "HWCgRGB",
    };
    let total = gfx.data.len().div_ceil(BYTES_PER_LINE);
    for (index, chunk) in gfx.data.chunks(BYTES_PER_LINE).enumerate() {
        let mut line = format!("{command}#{id}={index}");
        if index == 0 {
            line.push_str(&format!("/{},{}x{}", total - 1, gfx.width, gfx.height));
            if gfx.xy_offset {
                line.push_str(&format!(",{},{}", gfx.x, gfx.y));
            }
        }
        line.push(':');
        line.push_str(&BASE64.encode(chunk));
        out.push(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b64(data: &[u8]) -> String {
        BASE64.encode(data)
    }

    fn feed_line(assembler: &mut GfxAssembler, line: &str) -> Option<HwcState> {
        assembler.feed(parse_gfx_part(line).expect("line should parse"))
    }

    #[test]
    fn test_three_part_reassembly() {
        // A 64x32 mono image is 256 bytes, split over three parts.
        let part_a = vec![0xAAu8; 100];
        let part_b = vec![0x55u8; 100];
        let part_c = vec![0x0Fu8; 56];

        let mut assembler = GfxAssembler::new();
        assert!(feed_line(&mut assembler, &format!("HWCg#5=0/2,64x32:{}", b64(&part_a))).is_none());
        assert!(feed_line(&mut assembler, &format!("HWCg#5=1:{}", b64(&part_b))).is_none());
        let state = feed_line(&mut assembler, &format!("HWCg#5=2:{}", b64(&part_c))).unwrap();

        assert_eq!(state.ids, vec![5]);
        let gfx = state.gfx.unwrap();
        assert_eq!(gfx.image_type, ImageType::Mono);
        assert_eq!((gfx.width, gfx.height), (64, 32));
        let mut expected = part_a;
        expected.extend(part_b);
        expected.extend(part_c);
        assert_eq!(expected.len(), 256);
        assert_eq!(gfx.data, expected);
    }

    #[test]
    fn test_out_of_sequence_kills_transfer() {
        let mut assembler = GfxAssembler::new();
        assert!(feed_line(&mut assembler, &format!("HWCg#5=0/2,64x32:{}", b64(&[1]))).is_none());
        // Part 1 skipped; part 2 is rejected and so is a late part 1.
        assert!(feed_line(&mut assembler, &format!("HWCg#5=2:{}", b64(&[3]))).is_none());
        assert!(feed_line(&mut assembler, &format!("HWCg#5=1:{}", b64(&[2]))).is_none());

        // A fresh part 0 restarts cleanly.
        assert!(feed_line(&mut assembler, &format!("HWCg#5=0/1,8x8:{}", b64(&[7]))).is_none());
        let state = feed_line(&mut assembler, &format!("HWCg#5=1:{}", b64(&[8]))).unwrap();
        assert_eq!(state.gfx.unwrap().data, vec![7, 8]);
    }

    #[test]
    fn test_mismatched_hwc_list_drops_line() {
        let mut assembler = GfxAssembler::new();
        assert!(feed_line(&mut assembler, &format!("HWCg#5=0/1,8x8:{}", b64(&[1]))).is_none());
        // Wrong component list; the line is ignored, the transfer survives.
        assert!(feed_line(&mut assembler, &format!("HWCg#6=1:{}", b64(&[9]))).is_none());
        let state = feed_line(&mut assembler, &format!("HWCg#5=1:{}", b64(&[2]))).unwrap();
        assert_eq!(state.gfx.unwrap().data, vec![1, 2]);
    }

    #[test]
    fn test_mismatched_image_type_drops_line() {
        let mut assembler = GfxAssembler::new();
        assert!(feed_line(&mut assembler, &format!("HWCg#5=0/1,8x8:{}", b64(&[1]))).is_none());
        assert!(feed_line(&mut assembler, &format!("HWCgRGB#5=1:{}", b64(&[9]))).is_none());
        let state = feed_line(&mut assembler, &format!("HWCg#5=1:{}", b64(&[2]))).unwrap();
        assert_eq!(state.gfx.unwrap().data, vec![1, 2]);
    }

    #[test]
    fn test_legacy_header_defaults() {
        // No header group: three parts, 64x32.
        let mut assembler = GfxAssembler::new();
        assert!(feed_line(&mut assembler, &format!("HWCg#5=0:{}", b64(&[1]))).is_none());
        assert!(feed_line(&mut assembler, &format!("HWCg#5=1:{}", b64(&[2]))).is_none());
        let state = feed_line(&mut assembler, &format!("HWCg#5=2:{}", b64(&[3]))).unwrap();
        let gfx = state.gfx.unwrap();
        assert_eq!((gfx.width, gfx.height), (64, 32));
        assert_eq!(gfx.data, vec![1, 2, 3]);
    }

    #[test]
    fn test_single_part_transfer_with_offset() {
        let mut assembler = GfxAssembler::new();
        let state =
            feed_line(&mut assembler, &format!("HWCgRGB#9=0/0,16x8,4,2:{}", b64(&[1, 2]))).unwrap();
        let gfx = state.gfx.unwrap();
        assert_eq!(gfx.image_type, ImageType::Rgb16);
        assert!(gfx.xy_offset);
        assert_eq!((gfx.x, gfx.y), (4, 2));
    }

    #[test]
    fn test_malformed_base64_contributes_nothing() {
        let mut assembler = GfxAssembler::new();
        assert!(feed_line(&mut assembler, "HWCg#5=0/1,8x8:!!notbase64!!").is_none());
        let state = feed_line(&mut assembler, &format!("HWCg#5=1:{}", b64(&[2]))).unwrap();
        // The bad chunk decoded to zero bytes; the transfer still completed.
        assert_eq!(state.gfx.unwrap().data, vec![2]);
    }

    #[test]
    fn test_encode_chunking() {
        let gfx = HwcGfx {
            image_type: ImageType::Mono,
            width: 64,
            height: 32,
            data: vec![0xFF; 256],
            ..Default::default()
        };
        let mut lines = Vec::new();
        encode_gfx_lines(&gfx, 5, &mut lines);

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("HWCg#5=0/1,64x32:"));
        assert!(lines[1].starts_with("HWCg#5=1:"));

        // And the emitted lines reassemble into the original image.
        let mut assembler = GfxAssembler::new();
        assert!(feed_line(&mut assembler, &lines[0]).is_none());
        let state = feed_line(&mut assembler, &lines[1]).unwrap();
        assert_eq!(state.gfx.unwrap().data, gfx.data);
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        assert!(parse_gfx_part("HWCg#x=0:AA==").is_none());
        assert!(parse_gfx_part("HWCg#5=abc:AA==").is_none());
        assert!(parse_gfx_part("HWCg#5=0/1,64x32,5:AA==").is_none());
        assert!(parse_gfx_part("HWCq#5=0:AA==").is_none());
    }
}
