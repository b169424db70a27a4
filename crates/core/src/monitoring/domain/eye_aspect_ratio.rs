//! Eye aspect ratio (EAR) over a six-point eye contour.
//!
//! Points are ordered outer corner, two upper-lid points, inner corner, two
//! lower-lid points. EAR is `(|p1-p5| + |p2-p4|) / (2 * |p0-p3|)`: the mean
//! lid opening divided by the eye width. Open eyes sit around 0.3, closed
//! eyes approach 0.

use thiserror::Error;

use crate::shared::point::Point;

pub const EYE_POINT_COUNT: usize = 6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EarError {
    #[error("eye contour needs {expected} points, got {actual}")]
    InvalidInput { expected: usize, actual: usize },
    #[error("eye corners coincide; aspect ratio is undefined")]
    DegenerateGeometry,
    #[error("eye point {index} is not finite")]
    NonFinitePoint { index: usize },
}

/// Exactly six points describing one eye.
#[derive(Clone, Debug, PartialEq)]
pub struct EyePoints([Point; EYE_POINT_COUNT]);

impl EyePoints {
    pub fn new(points: [Point; EYE_POINT_COUNT]) -> Self {
        Self(points)
    }

    pub fn points(&self) -> &[Point; EYE_POINT_COUNT] {
        &self.0
    }

    /// Horizontal span between the two eye corners.
    pub fn width(&self) -> f64 {
        self.0[0].distance(&self.0[3])
    }
}

impl TryFrom<&[Point]> for EyePoints {
    type Error = EarError;

    fn try_from(points: &[Point]) -> Result<Self, Self::Error> {
        let array: [Point; EYE_POINT_COUNT] =
            points.try_into().map_err(|_| EarError::InvalidInput {
                expected: EYE_POINT_COUNT,
                actual: points.len(),
            })?;
        Ok(Self(array))
    }
}

impl TryFrom<&[(f64, f64)]> for EyePoints {
    type Error = EarError;

    fn try_from(points: &[(f64, f64)]) -> Result<Self, Self::Error> {
        let points: Vec<Point> = points.iter().copied().map(Point::from).collect();
        EyePoints::try_from(points.as_slice())
    }
}

/// Eye aspect ratio for one eye.
///
/// Coincident corners (zero width) are rejected with
/// [`EarError::DegenerateGeometry`] instead of dividing by zero, and NaN or
/// infinite coordinates with [`EarError::NonFinitePoint`].
pub fn eye_aspect_ratio(eye: &EyePoints) -> Result<f64, EarError> {
    if let Some(index) = eye
        .points()
        .iter()
        .position(|p| !(p.x.is_finite() && p.y.is_finite()))
    {
        return Err(EarError::NonFinitePoint { index });
    }
    let [p0, p1, p2, p3, p4, p5] = eye.points();
    let a = p1.distance(p5);
    let b = p2.distance(p4);
    let c = p0.distance(p3);

    if c <= f64::EPSILON {
        return Err(EarError::DegenerateGeometry);
    }

    Ok((a + b) / (2.0 * c))
}

/// Per-eye ratios and their mean for one face.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EarReading {
    pub left: f64,
    pub right: f64,
    pub average: f64,
}

impl EarReading {
    pub fn from_eyes(left: &EyePoints, right: &EyePoints) -> Result<Self, EarError> {
        let left = eye_aspect_ratio(left)?;
        let right = eye_aspect_ratio(right)?;
        Ok(Self {
            left,
            right,
            average: (left + right) / 2.0,
        })
    }
}
