//! Eye Aspect Ratio from the six landmarks of one eye
//!
//! Landmarks follow the 68-point facial layout: `p0`/`p3` are the eye
//! corners, `p1`/`p2` the upper lid, `p5`/`p4` the lower lid.

use serde::{Deserialize, Serialize};

/// 2D landmark in image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// `(|p1 - p5| + |p2 - p4|) / (2 * |p0 - p3|)`
///
/// A degenerate eye with zero width yields 0.0.
pub fn eye_aspect_ratio(eye: &[Point; 6]) -> f64 {
    let vertical_a = eye[1].distance(&eye[5]);
    let vertical_b = eye[2].distance(&eye[4]);
    let horizontal = eye[0].distance(&eye[3]);

    if horizontal == 0.0 {
        return 0.0;
    }
    (vertical_a + vertical_b) / (2.0 * horizontal)
}

/// Mean EAR of both eyes, the value fed to the monitor
pub fn average_ear(left: &[Point; 6], right: &[Point; 6]) -> f64 {
    (eye_aspect_ratio(left) + eye_aspect_ratio(right)) / 2.0
}
