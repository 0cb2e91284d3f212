//! Skeleton overlay drawing on RGB frames.

use crate::provider::Renderer;
use crate::types::{Landmark, LandmarkSet, PoseLandmark};
use image::{Rgb, RgbImage};

use PoseLandmark::*;

/// Bone segments of the BlazePose topology.
pub const POSE_CONNECTIONS: [(PoseLandmark, PoseLandmark); 35] = [
    (Nose, LeftEyeInner),
    (LeftEyeInner, LeftEye),
    (LeftEye, LeftEyeOuter),
    (LeftEyeOuter, LeftEar),
    (Nose, RightEyeInner),
    (RightEyeInner, RightEye),
    (RightEye, RightEyeOuter),
    (RightEyeOuter, RightEar),
    (MouthLeft, MouthRight),
    (LeftShoulder, RightShoulder),
    (LeftShoulder, LeftElbow),
    (LeftElbow, LeftWrist),
    (LeftWrist, LeftPinky),
    (LeftWrist, LeftIndex),
    (LeftWrist, LeftThumb),
    (LeftPinky, LeftIndex),
    (RightShoulder, RightElbow),
    (RightElbow, RightWrist),
    (RightWrist, RightPinky),
    (RightWrist, RightIndex),
    (RightWrist, RightThumb),
    (RightPinky, RightIndex),
    (LeftShoulder, LeftHip),
    (RightShoulder, RightHip),
    (LeftHip, RightHip),
    (LeftHip, LeftKnee),
    (LeftKnee, LeftAnkle),
    (LeftAnkle, LeftHeel),
    (LeftHeel, LeftFootIndex),
    (LeftAnkle, LeftFootIndex),
    (RightHip, RightKnee),
    (RightKnee, RightAnkle),
    (RightAnkle, RightHeel),
    (RightHeel, RightFootIndex),
    (RightAnkle, RightFootIndex),
];

/// Landmarks less visible than this are not drawn.
const VISIBILITY_THRESHOLD: f32 = 0.5;

/// Draws landmarks as dots and connections as lines.
#[derive(Debug, Clone)]
pub struct OverlayRenderer {
    pub landmark_color: Rgb<u8>,
    pub connection_color: Rgb<u8>,
    pub radius: i32,
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self {
            landmark_color: Rgb([255, 48, 48]),
            connection_color: Rgb([224, 224, 224]),
            radius: 3,
        }
    }
}

impl Renderer for OverlayRenderer {
    fn draw(&self, frame: &RgbImage, sets: &[LandmarkSet]) -> RgbImage {
        let mut out = frame.clone();
        let (w, h) = (f64::from(out.width()), f64::from(out.height()));
        let to_px = |lm: &Landmark| (f64::from(lm.x) * w, f64::from(lm.y) * h);

        for set in sets {
            for &(a, b) in POSE_CONNECTIONS.iter() {
                let (Some(la), Some(lb)) = (drawable(set, a), drawable(set, b)) else {
                    continue;
                };
                if let Some((p0, p1)) = clip_segment(to_px(la), to_px(lb), w, h) {
                    draw_line(&mut out, round_px(p0), round_px(p1), self.connection_color);
                }
            }
            let reach = f64::from(self.radius);
            for lm in set.landmarks.iter().filter(|lm| is_drawable(lm)) {
                let (x, y) = to_px(lm);
                if x < -reach || y < -reach || x > w + reach || y > h + reach {
                    continue;
                }
                fill_circle(&mut out, round_px((x, y)), self.radius, self.landmark_color);
            }
        }

        out
    }
}

fn is_drawable(lm: &Landmark) -> bool {
    lm.is_finite() && lm.visibility >= VISIBILITY_THRESHOLD
}

fn drawable(set: &LandmarkSet, landmark: PoseLandmark) -> Option<&Landmark> {
    set.get(landmark).filter(|lm| is_drawable(lm))
}

fn round_px((x, y): (f64, f64)) -> (i32, i32) {
    (x.round() as i32, y.round() as i32)
}

type Segment = ((f64, f64), (f64, f64));

/// Liang-Barsky clip of a pixel-space segment to `[-1, w] x [-1, h]`.
/// `None` when the segment misses the frame entirely.
fn clip_segment(p0: (f64, f64), p1: (f64, f64), w: f64, h: f64) -> Option<Segment> {
    let (dx, dy) = (p1.0 - p0.0, p1.1 - p0.1);
    let (mut t0, mut t1) = (0.0f64, 1.0f64);

    for (p, q) in [(-dx, p0.0 + 1.0), (dx, w - p0.0), (-dy, p0.1 + 1.0), (dy, h - p0.1)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    Some((
        (p0.0 + t0 * dx, p0.1 + t0 * dy),
        (p0.0 + t1 * dx, p0.1 + t1 * dy),
    ))
}

fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && x < i64::from(img.width()) && y < i64::from(img.height()) {
        img.put_pixel(x as u32, y as u32, color);
    }
}

/// Bresenham line. Error terms are `i64` so any `i32` endpoints are safe.
fn draw_line(img: &mut RgbImage, (x0, y0): (i32, i32), (x1, y1): (i32, i32), color: Rgb<u8>) {
    let (mut x, mut y) = (i64::from(x0), i64::from(y0));
    let (x1, y1) = (i64::from(x1), i64::from(y1));
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        put(img, x, y, color);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn fill_circle(img: &mut RgbImage, (cx, cy): (i32, i32), radius: i32, color: Rgb<u8>) {
    let (cx, cy, radius) = (i64::from(cx), i64::from(cy), i64::from(radius));
    let r2 = radius * radius;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= r2 {
                put(img, cx + dx, cy + dy, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::POSE_LANDMARK_COUNT;

    fn set_with(points: &[(PoseLandmark, f32, f32, f32)]) -> LandmarkSet {
        let mut landmarks = vec![
            Landmark {
                x: 0.0,
                y: 0.0,
                z: 0.0,
                visibility: 0.0
            };
            POSE_LANDMARK_COUNT
        ];
        for &(lm, x, y, visibility) in points {
            landmarks[lm.index()] = Landmark { x, y, z: 0.0, visibility };
        }
        LandmarkSet::new(landmarks)
    }

    #[test]
    fn test_draw_leaves_input_untouched() {
        let frame = RgbImage::new(32, 32);
        let set = set_with(&[(Nose, 0.5, 0.5, 1.0)]);
        let out = OverlayRenderer::default().draw(&frame, &[set]);
        assert!(frame.pixels().all(|p| p.0 == [0, 0, 0]));
        assert_eq!(out.get_pixel(16, 16).0, [255, 48, 48]);
    }

    #[test]
    fn test_draw_connection_between_visible_landmarks() {
        let frame = RgbImage::new(100, 100);
        let set = set_with(&[
            (LeftShoulder, 0.1, 0.5, 1.0),
            (RightShoulder, 0.9, 0.5, 1.0),
        ]);
        let renderer = OverlayRenderer::default();
        let out = renderer.draw(&frame, &[set]);
        assert_eq!(*out.get_pixel(50, 50), renderer.connection_color);
    }

    #[test]
    fn test_draw_skips_low_visibility() {
        let frame = RgbImage::new(100, 100);
        let set = set_with(&[
            (LeftShoulder, 0.1, 0.5, 1.0),
            (RightShoulder, 0.9, 0.5, 0.2),
        ]);
        let out = OverlayRenderer::default().draw(&frame, &[set]);
        assert_eq!(out.get_pixel(50, 50).0, [0, 0, 0]);
        assert_eq!(out.get_pixel(90, 50).0, [0, 0, 0]);
    }

    #[test]
    fn test_draw_clips_out_of_frame_points() {
        let frame = RgbImage::new(10, 10);
        let set = set_with(&[(LeftHip, -0.5, 1.5, 1.0), (RightHip, 1.5, -0.5, 1.0)]);
        let out = OverlayRenderer::default().draw(&frame, &[set]);
        assert_eq!(out.dimensions(), (10, 10));
    }

    #[test]
    fn test_draw_far_out_of_frame_points() {
        let frame = RgbImage::new(64, 48);
        let set = set_with(&[(LeftHip, -1.0e7, 0.5, 1.0), (RightHip, 1.0e7, 0.5, 1.0)]);
        let renderer = OverlayRenderer::default();
        let out = renderer.draw(&frame, &[set]);

        // The connection crosses the whole frame; the dots are off-frame.
        assert_eq!(*out.get_pixel(0, 24), renderer.connection_color);
        assert_eq!(*out.get_pixel(32, 24), renderer.connection_color);
        assert_eq!(*out.get_pixel(63, 24), renderer.connection_color);
        assert_eq!(out.get_pixel(32, 10).0, [0, 0, 0]);
    }

    #[test]
    fn test_draw_line_extreme_endpoints() {
        let mut img = RgbImage::new(8, 8);
        let color = Rgb([1, 2, 3]);
        draw_line(&mut img, (i32::MIN, 4), (i32::MIN + 3, 4), color);
        assert!(img.pixels().all(|p| p.0 == [0, 0, 0]));

        draw_line(&mut img, (2, 2), (5, 5), color);
        assert_eq!(*img.get_pixel(3, 3), color);
    }

    #[test]
    fn test_clip_segment() {
        let ((x0, y0), (x1, y1)) = clip_segment((-1.0e9, 5.0), (1.0e9, 5.0), 10.0, 10.0).unwrap();
        assert!((x0 + 1.0).abs() < 1e-3 && (x1 - 10.0).abs() < 1e-3);
        assert_eq!((y0, y1), (5.0, 5.0));

        assert!(clip_segment((-50.0, -50.0), (-20.0, 5.0), 10.0, 10.0).is_none());
        assert!(clip_segment((2.0, 20.0), (8.0, 30.0), 10.0, 10.0).is_none());
        assert_eq!(
            clip_segment((1.0, 1.0), (4.0, 6.0), 10.0, 10.0),
            Some(((1.0, 1.0), (4.0, 6.0)))
        );
    }
}
