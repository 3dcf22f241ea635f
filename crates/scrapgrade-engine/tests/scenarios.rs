//! End-to-end grading of synthetic board photos.

#![allow(clippy::unwrap_used)]

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::{Rgb, RgbImage};
use scrapgrade_engine::{Grade, GradeError, GradeThresholds, ScanReport, grade};

const PCB_GREEN: Rgb<u8> = Rgb([20, 140, 40]);
const GRAY: Rgb<u8> = Rgb([128, 128, 128]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

fn png(image: &RgbImage) -> Vec<u8> {
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    image::ImageEncoder::write_image(
        encoder,
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::Rgb8,
    )
    .unwrap();
    buf
}

/// 300x300 green board carrying 90 black 14x14 parts on a 30px pitch
/// (10 columns by 9 rows).
fn dense_board() -> RgbImage {
    RgbImage::from_fn(300, 300, |x, y| {
        let (dx, dy) = (x % 30, y % 30);
        let in_part = y / 30 < 9 && (8..22).contains(&dx) && (8..22).contains(&dy);
        if in_part { BLACK } else { PCB_GREEN }
    })
}

/// Gray 100x100 background with a green square of side `side` at (40, 40).
fn gray_with_patch(side: u32) -> RgbImage {
    RgbImage::from_fn(100, 100, |x, y| {
        if (40..40 + side).contains(&x) && (40..40 + side).contains(&y) {
            PCB_GREEN
        } else {
            GRAY
        }
    })
}

#[test]
fn scenario_a_bare_green_board() {
    let bytes = png(&RgbImage::from_pixel(100, 100, PCB_GREEN));
    let result = grade(&bytes, &GradeThresholds::default()).unwrap();

    assert!(result.board_detected());
    assert_eq!(result.components_count(), 0);
    assert_eq!(result.grade(), Some(Grade::Low));
    assert!(result.density_score().abs() < f64::EPSILON);
    assert_eq!(result.diagnostics().image_size, "100x100");
    assert!(result.diagnostics().board_ratio >= 0.99);
}

#[test]
fn scenario_b_gray_and_white_is_not_a_board() {
    let image = RgbImage::from_fn(120, 80, |x, _| if x < 90 { GRAY } else { WHITE });
    let result = grade(&png(&image), &GradeThresholds::default()).unwrap();

    assert!(!result.board_detected());
    assert_eq!(result.grade(), None);
    assert_eq!(result.components_count(), 0);
    assert!(result.diagnostics().board_ratio < 0.05);
}

#[test]
fn scenario_c_dense_board_grades_high() {
    let result = grade(&png(&dense_board()), &GradeThresholds::default()).unwrap();

    assert!(result.board_detected());
    assert_eq!(result.components_count(), 90);
    assert_eq!(result.grade(), Some(Grade::High));
    let diagnostics = result.diagnostics();
    assert_eq!(diagnostics.valid_contours, 90);
    assert_eq!(diagnostics.large_components, 0);
    assert!(diagnostics.board_pixels < 90_000);
}

#[test]
fn tiny_images_follow_their_colour() {
    let thresholds = GradeThresholds::default();
    for size in [1, 2] {
        let gray = png(&RgbImage::from_pixel(size, size, GRAY));
        assert!(!grade(&gray, &thresholds).unwrap().board_detected(), "{size}x{size} gray");

        let green = png(&RgbImage::from_pixel(size, size, PCB_GREEN));
        let green = grade(&green, &thresholds).unwrap();
        assert!(green.board_detected(), "{size}x{size} green");
        assert_eq!(green.grade(), Some(Grade::Low));
        assert_eq!(green.components_count(), 0);
    }
}

#[test]
fn dense_board_grades_low_under_stricter_policy() {
    let strict = GradeThresholds {
        low_density_threshold: 0.01,
        high_density_threshold: 0.02,
        ..GradeThresholds::default()
    };
    let result = grade(&png(&dense_board()), &strict).unwrap();
    assert_eq!(result.components_count(), 90);
    assert_eq!(result.grade(), Some(Grade::Low));
}

#[test]
fn grading_is_deterministic() {
    let bytes = png(&dense_board());
    let thresholds = GradeThresholds::default();
    let first = grade(&bytes, &thresholds).unwrap();
    let second = grade(&bytes, &thresholds).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap(),
    );
}

#[test]
fn gate_is_monotone_in_substrate_coverage() {
    let thresholds = GradeThresholds::default();

    // 400 / 10000 = 4%.
    let small = grade(&png(&gray_with_patch(20)), &thresholds).unwrap();
    assert!(!small.board_detected());
    assert_eq!(small.diagnostics().board_pixels, 400);

    // 625 / 10000 = 6.25%.
    let large = grade(&png(&gray_with_patch(25)), &thresholds).unwrap();
    assert!(large.board_detected());
    assert_eq!(large.diagnostics().board_pixels, 625);
}

#[test]
fn lowering_min_ratio_admits_the_small_patch() {
    let relaxed = GradeThresholds {
        min_board_ratio: 0.03,
        ..GradeThresholds::default()
    };
    let result = grade(&png(&gray_with_patch(20)), &relaxed).unwrap();
    assert!(result.board_detected());
}

#[test]
fn base64_and_data_uri_payloads_match_raw_bytes() {
    let raw = png(&dense_board());
    let thresholds = GradeThresholds::default();
    let expected = grade(&raw, &thresholds).unwrap();

    let encoded = STANDARD.encode(&raw);
    assert_eq!(grade(encoded.as_bytes(), &thresholds).unwrap(), expected);

    let uri = format!("data:image/png;base64,{encoded}");
    assert_eq!(grade(uri.as_bytes(), &thresholds).unwrap(), expected);
}

#[test]
fn undecodable_payload_is_an_error_not_a_no_board_result() {
    let thresholds = GradeThresholds::default();

    let garbage = grade(&[0x00, 0x13, 0x37, 0xfe, 0xff], &thresholds).unwrap_err();
    assert!(garbage.is_decode_error());

    let malformed = grade(b"data:image/png;base64", &thresholds).unwrap_err();
    assert!(matches!(malformed, GradeError::MalformedDataUri));

    let no_board = grade(&png(&RgbImage::from_pixel(10, 10, GRAY)), &thresholds).unwrap();
    assert!(!no_board.board_detected());
}

#[test]
fn scan_report_for_dense_board() {
    let result = grade(&png(&dense_board()), &GradeThresholds::default()).unwrap();
    let report = ScanReport::build(result, None);

    assert!(report.explanation.contains("90"));
    assert!(report.explanation.contains("high value"));
    // 0.5 + min(density * 1e4, 0.3) + 50/100, capped.
    assert!((report.confidence - 0.95).abs() < 1e-9);
}

#[test]
fn scan_report_for_missing_board() {
    let result = grade(&png(&RgbImage::from_pixel(30, 30, WHITE)), &GradeThresholds::default())
        .unwrap();
    let report = ScanReport::build(result, None);

    assert!(report.explanation.contains("retry"));
    assert!(report.confidence.abs() < f64::EPSILON);
}
