use ndarray::s;

use crate::detection::domain::detection_result::DetectionResult;
use crate::detection::domain::frame_analyzer::FrameAnalyzer;
use crate::detection::domain::skin_tone::is_skin_tone;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::capture_error::CaptureError;
use crate::shared::constants::SAMPLE_STRIDE;
use crate::shared::frame::Frame;

/// Skin ratio must exceed this for a face to count as present.
pub const MIN_SKIN_RATIO: f64 = 0.08;
/// Above this the scene is dominated by a skin-colored surface.
pub const MAX_SKIN_RATIO: f64 = 0.5;
/// Skin samples required before a bounding box is derived.
pub const MIN_REGION_SAMPLES: usize = 50;
/// Allowed centroid offset from frame center, as a fraction of each axis.
pub const CENTER_TOLERANCE: f64 = 0.25;
/// Left/right balance required for gaze to count as focused.
pub const SYMMETRY_THRESHOLD: f64 = 0.7;

/// Color-segmentation attention heuristic.
///
/// Samples every [`SAMPLE_STRIDE`]th row and column, classifies pixels with
/// [`is_skin_tone`], and derives face presence, head pose (region centroid
/// near frame center) and gaze (left/right symmetry of the region).
#[derive(Clone, Copy, Debug, Default)]
pub struct SkinToneAnalyzer;

impl SkinToneAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

/// Extent of the sampled skin pixels, before padding.
#[derive(Clone, Copy, Debug, PartialEq)]
struct SkinExtent {
    min_x: u32,
    max_x: u32,
    min_y: u32,
    max_y: u32,
}

impl SkinExtent {
    fn of(points: &[(u32, u32)]) -> Option<Self> {
        let (&(x0, y0), rest) = points.split_first()?;
        let mut extent = Self {
            min_x: x0,
            max_x: x0,
            min_y: y0,
            max_y: y0,
        };
        for &(x, y) in rest {
            extent.min_x = extent.min_x.min(x);
            extent.max_x = extent.max_x.max(x);
            extent.min_y = extent.min_y.min(y);
            extent.max_y = extent.max_y.max(y);
        }
        Some(extent)
    }

    fn center(&self) -> (f64, f64) {
        (
            (self.min_x as f64 + self.max_x as f64) / 2.0,
            (self.min_y as f64 + self.max_y as f64) / 2.0,
        )
    }
}

fn sample_skin_points(frame: &Frame) -> Result<Vec<(u32, u32)>, CaptureError> {
    let pixels = frame.as_ndarray().ok_or_else(|| {
        CaptureError::unknown(format!(
            "pixel buffer of {} bytes does not match {}x{} RGBA",
            frame.data().len(),
            frame.width(),
            frame.height()
        ))
    })?;

    let step = SAMPLE_STRIDE as isize;
    let sampled = pixels.slice(s![..;step, ..;step, ..]);

    let mut points = Vec::new();
    for (row, line) in sampled.outer_iter().enumerate() {
        let y = (row * SAMPLE_STRIDE) as u32;
        for (col, px) in line.outer_iter().enumerate() {
            if is_skin_tone(px[0], px[1], px[2]) {
                points.push(((col * SAMPLE_STRIDE) as u32, y));
            }
        }
    }
    Ok(points)
}

fn is_centered(cx: f64, cy: f64, width: f64, height: f64) -> bool {
    (cx - width / 2.0).abs() < width * CENTER_TOLERANCE
        && (cy - height / 2.0).abs() < height * CENTER_TOLERANCE
}

fn symmetry_ratio(points: &[(u32, u32)], cx: f64) -> f64 {
    let left = points.iter().filter(|&&(x, _)| (x as f64) < cx).count();
    let right = points.len() - left;
    let max = left.max(right);
    if max == 0 {
        return 0.0;
    }
    left.min(right) as f64 / max as f64
}

impl FrameAnalyzer for SkinToneAnalyzer {
    fn analyze(&self, frame: &Frame) -> Result<DetectionResult, CaptureError> {
        let points = sample_skin_points(frame)?;

        let width = frame.width() as f64;
        let height = frame.height() as f64;
        let total_samples = width * height / (SAMPLE_STRIDE * SAMPLE_STRIDE) as f64;
        let skin_ratio = points.len() as f64 / total_samples;
        let face_detected = skin_ratio > MIN_SKIN_RATIO && skin_ratio < MAX_SKIN_RATIO;

        if !face_detected || points.len() <= MIN_REGION_SAMPLES {
            return Ok(DetectionResult::new(face_detected, false, false, None));
        }
        let Some(extent) = SkinExtent::of(&points) else {
            return Ok(DetectionResult::new(face_detected, false, false, None));
        };

        let bounding_box = BoundingBox::from_extent(
            extent.min_x,
            extent.max_x,
            extent.min_y,
            extent.max_y,
            frame.width(),
            frame.height(),
        );
        let (cx, cy) = extent.center();
        let head_pose_engaged = is_centered(cx, cy, width, height);
        let eye_gaze_focused = symmetry_ratio(&points, cx) > SYMMETRY_THRESHOLD;

        Ok(DetectionResult::new(
            face_detected,
            eye_gaze_focused,
            head_pose_engaged,
            Some(bounding_box),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::detection_result::EngagementLevel;
    use approx::assert_relative_eq;
    use rstest::rstest;

    const BLACK: [u8; 4] = [0, 0, 0, 255];
    const SKIN: [u8; 4] = [150, 90, 70, 255];

    /// 640x480 black frame with a `side`-pixel skin square at (x, y).
    fn frame_with_square(x: u32, y: u32, side: u32) -> Frame {
        let mut frame = Frame::filled(640, 480, BLACK);
        frame.fill_rect(x, y, side, side, SKIN);
        frame
    }

    fn analyze(frame: &Frame) -> DetectionResult {
        SkinToneAnalyzer::new().analyze(frame).unwrap()
    }

    fn assert_score_matches_signals(d: &DetectionResult) {
        let expected = (0.40 * d.face_detected as u8 as f64
            + 0.35 * d.eye_gaze_focused as u8 as f64
            + 0.25 * d.head_pose_engaged as u8 as f64)
            .min(1.0);
        assert_relative_eq!(d.attention_score, expected, epsilon = 1e-9);
        assert!((0.0..=1.0).contains(&d.attention_score));
    }

    // ── Scenarios ────────────────────────────────────────────────────

    #[test]
    fn test_all_black_frame_is_away() {
        let d = analyze(&Frame::filled(640, 480, BLACK));
        assert!(!d.face_detected);
        assert_eq!(d.attention_score, 0.0);
        assert!(d.bounding_box.is_none());
        assert_eq!(d.engagement_level(), EngagementLevel::Away);
    }

    #[test]
    fn test_centered_square_is_fully_engaged() {
        // 216px square = 54x54 samples = 2916 / 19200 ≈ 0.152 skin ratio.
        let d = analyze(&frame_with_square(212, 132, 216));
        assert!(d.face_detected);
        assert!(d.head_pose_engaged);
        assert!(d.eye_gaze_focused);
        assert_relative_eq!(d.attention_score, 1.0, epsilon = 1e-9);
        assert_eq!(d.engagement_level(), EngagementLevel::FullyEngaged);
    }

    #[test]
    fn test_centered_square_bounding_box() {
        // Samples span x 212..=424, y 132..=344.
        let d = analyze(&frame_with_square(212, 132, 216));
        let b = d.bounding_box.unwrap();
        assert_eq!(b.x_min, 192);
        assert_eq!(b.y_min, 112);
        assert_eq!(b.width, 252);
        assert_eq!(b.height, 252);
    }

    #[test]
    fn test_corner_square_fails_head_pose_only() {
        let d = analyze(&frame_with_square(0, 0, 216));
        assert!(d.face_detected);
        assert!(!d.head_pose_engaged);
        assert!(d.eye_gaze_focused);
        assert_relative_eq!(d.attention_score, 0.75, epsilon = 1e-9);
        assert_eq!(d.engagement_level(), EngagementLevel::FullyEngaged);
        let b = d.bounding_box.unwrap();
        assert_eq!((b.x_min, b.y_min), (0, 0));
    }

    // ── Face presence ────────────────────────────────────────────────

    #[test]
    fn test_skin_dominated_frame_is_not_a_face() {
        let d = analyze(&Frame::filled(640, 480, SKIN));
        assert!(!d.face_detected);
        assert!(d.bounding_box.is_none());
        assert!(!d.eye_gaze_focused);
        assert!(!d.head_pose_engaged);
    }

    #[rstest]
    // 96px = 24x24 samples = 576 / 19200 = 0.03
    #[case::too_small(96, false)]
    // 152px = 38x38 samples = 1444 / 19200 ≈ 0.075
    #[case::just_below_min(152, false)]
    // 160px = 40x40 samples = 1600 / 19200 ≈ 0.083
    #[case::just_above_min(160, true)]
    // 392px = 98x98 samples = 9604 / 19200 ≈ 0.5002
    #[case::just_above_max(392, false)]
    // 388px = 97x97 samples = 9409 / 19200 ≈ 0.49
    #[case::just_below_max(388, true)]
    fn test_skin_ratio_bounds(#[case] side: u32, #[case] expected: bool) {
        let d = analyze(&frame_with_square(0, 0, side));
        assert_eq!(d.face_detected, expected);
        assert_eq!(d.bounding_box.is_some(), expected);
        assert_score_matches_signals(&d);
    }

    #[test]
    fn test_small_region_has_face_but_no_box() {
        // 40x40 frame = 100 samples; 5x4 skin samples = 20% ratio but only
        // 20 samples, below the box threshold.
        let mut frame = Frame::filled(40, 40, BLACK);
        frame.fill_rect(0, 0, 20, 16, SKIN);
        let d = analyze(&frame);
        assert!(d.face_detected);
        assert!(d.bounding_box.is_none());
        assert!(!d.eye_gaze_focused);
        assert!(!d.head_pose_engaged);
        assert_relative_eq!(d.attention_score, 0.40, epsilon = 1e-9);
        assert_eq!(d.engagement_level(), EngagementLevel::PassivelyPresent);
    }

    // ── Gaze symmetry ────────────────────────────────────────────────

    #[test]
    fn test_lopsided_region_is_not_focused() {
        // A wide thin bar plus a tall column at its left end: the centroid
        // sits mid-bar while most samples fall left of it.
        let mut frame = Frame::filled(640, 480, BLACK);
        frame.fill_rect(200, 200, 400, 8, SKIN);
        frame.fill_rect(200, 100, 120, 280, SKIN);
        let d = analyze(&frame);
        assert!(d.face_detected);
        assert!(d.bounding_box.is_some());
        assert!(!d.eye_gaze_focused);
        assert_score_matches_signals(&d);
    }

    #[test]
    fn test_symmetry_ratio_counts_center_column_right() {
        let points = [(0, 0), (4, 0), (8, 0)];
        // cx = 4: left = {0}, right = {4, 8}
        assert_relative_eq!(symmetry_ratio(&points, 4.0), 0.5);
    }

    #[test]
    fn test_symmetry_ratio_empty_is_zero() {
        assert_eq!(symmetry_ratio(&[], 0.0), 0.0);
    }

    // ── Head pose ────────────────────────────────────────────────────

    #[rstest]
    #[case::center(320.0, 240.0, true)]
    #[case::inside_left(161.0, 240.0, true)]
    #[case::on_left_limit(160.0, 240.0, false)]
    #[case::inside_bottom(320.0, 359.0, true)]
    #[case::on_bottom_limit(320.0, 360.0, false)]
    fn test_is_centered(#[case] cx: f64, #[case] cy: f64, #[case] expected: bool) {
        assert_eq!(is_centered(cx, cy, 640.0, 480.0), expected);
    }

    // ── Robustness ───────────────────────────────────────────────────

    #[test]
    fn test_analysis_is_deterministic() {
        let frame = frame_with_square(100, 60, 200);
        let analyzer = SkinToneAnalyzer::new();
        assert_eq!(analyzer.analyze(&frame), analyzer.analyze(&frame));
    }

    #[test]
    fn test_gaze_and_pose_false_without_box() {
        for side in [0, 40, 96, 600] {
            let d = analyze(&frame_with_square(0, 0, side));
            if d.bounding_box.is_none() {
                assert!(!d.eye_gaze_focused);
                assert!(!d.head_pose_engaged);
            }
            assert_score_matches_signals(&d);
        }
    }

    #[test]
    fn test_extent_of_points() {
        let extent = SkinExtent::of(&[(8, 4), (0, 12), (16, 0)]).unwrap();
        assert_eq!(
            extent,
            SkinExtent {
                min_x: 0,
                max_x: 16,
                min_y: 0,
                max_y: 12
            }
        );
        assert_eq!(extent.center(), (8.0, 6.0));
        assert!(SkinExtent::of(&[]).is_none());
    }
}
