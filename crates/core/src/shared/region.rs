/// A detected face box in frame pixel coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// Detector score in `[0, 1]`.
    pub confidence: f64,
}

impl Region {
    pub fn new(x: i32, y: i32, width: i32, height: i32, confidence: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence,
        }
    }

    /// Box area in pixels; degenerate boxes have zero area.
    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    /// Intersection with a `frame_w` x `frame_h` frame, or `None` when the
    /// box lies entirely outside it.
    pub fn clamp_to(&self, frame_w: u32, frame_h: u32) -> Option<Region> {
        let x1 = self.x.max(0);
        let y1 = self.y.max(0);
        let x2 = (self.x + self.width).min(frame_w as i32);
        let y2 = (self.y + self.height).min(frame_h as i32);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(Region {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
            confidence: self.confidence,
        })
    }

    /// Square box around the same center, grown by `margin` (fraction of the
    /// longer side) on every edge. Not clamped.
    pub fn expand_to_square(&self, margin: f64) -> Region {
        let (cx, cy) = self.center();
        let side = self.width.max(self.height) as f64 * (1.0 + 2.0 * margin);
        let half = side / 2.0;
        Region {
            x: (cx - half).round() as i32,
            y: (cy - half).round() as i32,
            width: side.round() as i32,
            height: side.round() as i32,
            confidence: self.confidence,
        }
    }
}
