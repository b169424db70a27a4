//! 68-point facial shape in the iBUG-300W layout.
//!
//! Index ranges (0-based): jaw 0-16, brows 17-26, nose 27-35, right eye
//! 36-41, left eye 42-47, mouth 48-67. "Right" and "left" are the
//! subject's, so the right eye appears on the left of an unmirrored image.
//! Each eye runs outer corner, upper lid (2), inner corner, lower lid (2).

use std::ops::Range;

use crate::monitoring::domain::eye_aspect_ratio::{EarError, EyePoints, EYE_POINT_COUNT};
use crate::shared::point::Point;

pub const LANDMARK_COUNT: usize = 68;
pub const RIGHT_EYE: Range<usize> = 36..42;
pub const LEFT_EYE: Range<usize> = 42..48;

#[derive(Clone, Debug, PartialEq)]
pub struct FaceShape {
    points: Vec<Point>,
}

impl FaceShape {
    /// Fails with [`EarError::InvalidInput`] unless exactly 68 points are given.
    pub fn new(points: Vec<Point>) -> Result<Self, EarError> {
        if points.len() != LANDMARK_COUNT {
            return Err(EarError::InvalidInput {
                expected: LANDMARK_COUNT,
                actual: points.len(),
            });
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn left_eye(&self) -> EyePoints {
        self.eye(LEFT_EYE)
    }

    pub fn right_eye(&self) -> EyePoints {
        self.eye(RIGHT_EYE)
    }

    fn eye(&self, range: Range<usize>) -> EyePoints {
        let mut eye = [Point::default(); EYE_POINT_COUNT];
        eye.copy_from_slice(&self.points[range]);
        EyePoints::new(eye)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Points numbered so that point `i` sits at `(i, i * 10)`.
    fn numbered_shape() -> FaceShape {
        let points = (0..LANDMARK_COUNT)
            .map(|i| Point::new(i as f64, i as f64 * 10.0))
            .collect();
        FaceShape::new(points).unwrap()
    }

    #[test]
    fn test_new_accepts_68_points() {
        let shape = numbered_shape();
        assert_eq!(shape.points().len(), 68);
    }

    #[test]
    fn test_new_rejects_other_counts() {
        let err = FaceShape::new(vec![Point::default(); 5]).unwrap_err();
        assert_eq!(
            err,
            EarError::InvalidInput {
                expected: 68,
                actual: 5
            }
        );
    }

    #[test]
    fn test_right_eye_is_points_36_to_41() {
        let eye = numbered_shape().right_eye();
        let xs: Vec<f64> = eye.points().iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![36.0, 37.0, 38.0, 39.0, 40.0, 41.0]);
    }

    #[test]
    fn test_left_eye_is_points_42_to_47() {
        let eye = numbered_shape().left_eye();
        let xs: Vec<f64> = eye.points().iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![42.0, 43.0, 44.0, 45.0, 46.0, 47.0]);
        assert_eq!(eye.points()[0].y, 420.0);
    }
}
