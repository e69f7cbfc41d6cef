use alog_imaging::engine::{calc_fit_inside, sniff_with_format, SniffedFormat};
use alog_imaging::{sniff, Dimensions};
use proptest::prelude::*;

fn png_header(width: u32, height: u32) -> Vec<u8> {
    let mut buf = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    buf.extend_from_slice(&13u32.to_be_bytes());
    buf.extend_from_slice(b"IHDR");
    buf.extend_from_slice(&width.to_be_bytes());
    buf.extend_from_slice(&height.to_be_bytes());
    buf
}

fn jpeg_header(segments: &[Vec<u8>], width: u16, height: u16) -> Vec<u8> {
    let mut buf = vec![0xFF, 0xD8];
    for payload in segments {
        buf.extend_from_slice(&[0xFF, 0xE1]);
        buf.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        buf.extend_from_slice(payload);
    }
    buf.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08]);
    buf.extend_from_slice(&height.to_be_bytes());
    buf.extend_from_slice(&width.to_be_bytes());
    buf.push(0x03);
    buf
}

fn vp8_header(width: u16, height: u16) -> Vec<u8> {
    let mut buf = b"RIFF\x00\x00\x00\x00WEBPVP8 \x00\x00\x00\x00".to_vec();
    buf.extend_from_slice(&[0x30, 0x01, 0x00, 0x9D, 0x01, 0x2A]);
    buf.extend_from_slice(&width.to_le_bytes());
    buf.extend_from_slice(&height.to_le_bytes());
    buf
}

fn segment_payloads() -> impl Strategy<Value = Vec<Vec<u8>>> {
    // Payload bytes avoid 0xFF so the scan never sees a stray marker.
    prop::collection::vec(prop::collection::vec(0u8..0xFF, 0..64), 0..6)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_arbitrary_bytes_never_panic(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let first = sniff(&data);
        // Pure: same input, same answer.
        prop_assert_eq!(sniff(&data), first);
        prop_assert_eq!(sniff_with_format(&data).map(|(_, d)| d), first);
    }

    #[test]
    fn prop_jpeg_like_bytes_never_panic(tail in prop::collection::vec(any::<u8>(), 0..512)) {
        let mut data = vec![0xFF, 0xD8];
        data.extend_from_slice(&tail);
        let _ = sniff(&data);
    }

    #[test]
    fn prop_png_round_trip(width in any::<u32>(), height in any::<u32>()) {
        prop_assert_eq!(
            sniff_with_format(&png_header(width, height)),
            Some((SniffedFormat::Png, Dimensions::new(width, height)))
        );
    }

    #[test]
    fn prop_jpeg_finds_frame_after_segments(
        segments in segment_payloads(),
        width in any::<u16>(),
        height in any::<u16>(),
    ) {
        let data = jpeg_header(&segments, width, height);
        prop_assert_eq!(
            sniff_with_format(&data),
            Some((SniffedFormat::Jpeg, Dimensions::new(u32::from(width), u32::from(height))))
        );
    }

    #[test]
    fn prop_vp8_masks_to_14_bits(width in any::<u16>(), height in any::<u16>()) {
        let dims = sniff(&vp8_header(width, height)).unwrap();
        prop_assert_eq!(dims, Dimensions::new(u32::from(width & 0x3FFF), u32::from(height & 0x3FFF)));
        prop_assert!(dims.width < 16384 && dims.height < 16384);
    }

    #[test]
    fn prop_truncated_png_is_none(width in any::<u32>(), height in any::<u32>(), cut in 0usize..24) {
        let header = png_header(width, height);
        prop_assert_eq!(sniff(&header[..cut]), None);
    }

    #[test]
    fn prop_fit_inside_never_enlarges(
        orig_w in 1u32..=20_000,
        orig_h in 1u32..=20_000,
        edge in 1u32..=2_000,
    ) {
        let (w, h) = calc_fit_inside(orig_w, orig_h, edge, edge);
        prop_assert!(w >= 1 && h >= 1);
        prop_assert!(w <= orig_w && h <= orig_h);
        prop_assert!(w <= edge && h <= edge);
        if orig_w > edge || orig_h > edge {
            prop_assert!(w == edge || h == edge);
        }
    }
}
