use crate::detection::domain::face_shape::FaceShape;
use crate::monitoring::domain::drowsiness_monitor::AlertStatus;
use crate::presentation::domain::bitmap_font::{self, GLYPH_HEIGHT, GLYPH_SPACING, GLYPH_WIDTH};
use crate::shared::frame::Frame;
use crate::shared::point::Point;

pub const EYE_COLOR: [u8; 3] = [0, 255, 0];
pub const EAR_TEXT_COLOR: [u8; 3] = [255, 255, 255];
pub const ALERT_TEXT_COLOR: [u8; 3] = [255, 0, 0];

/// Bottom-left corners of the two labels.
pub const EAR_TEXT_ORIGIN: (i64, i64) = (300, 30);
pub const ALERT_TEXT_ORIGIN: (i64, i64) = (10, 30);

pub const ALERT_TEXT: &str = "DROWSINESS ALERT!";

const LABEL_SCALE: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    pub color: [u8; 3],
    /// Pixels per glyph cell edge.
    pub scale: u32,
}

/// Draws the per-frame status overlay.
///
/// Eye hulls and the EAR label appear only when the frame produced a
/// reading; the alert banner appears on every frame while alerting.
pub fn annotate(frame: &mut Frame, face: Option<&FaceShape>, ear: Option<f64>, status: AlertStatus) {
    if let Some(face) = face {
        draw_contour(frame, face.left_eye().points(), EYE_COLOR);
        draw_contour(frame, face.right_eye().points(), EYE_COLOR);
    }

    if let Some(ear) = ear {
        let style = TextStyle {
            color: EAR_TEXT_COLOR,
            scale: LABEL_SCALE,
        };
        draw_text(frame, &format!("EAR: {ear:.2}"), EAR_TEXT_ORIGIN, style);
    }

    if status == AlertStatus::Alerting {
        let style = TextStyle {
            color: ALERT_TEXT_COLOR,
            scale: LABEL_SCALE,
        };
        draw_text(frame, ALERT_TEXT, ALERT_TEXT_ORIGIN, style);
    }
}

/// Convex hull by monotone chain, starting from the leftmost point.
///
/// Collinear boundary points are dropped. Fewer than three distinct points
/// are returned as-is.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    fn cross(o: &Point, a: &Point, b: &Point) -> f64 {
        (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
    }

    let mut hull: Vec<Point> = Vec::with_capacity(pts.len() * 2);
    for p in &pts {
        while hull.len() >= 2 && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(*p);
    }
    let lower_len = hull.len() + 1;
    for p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len
            && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= 0.0
        {
            hull.pop();
        }
        hull.push(*p);
    }
    hull.pop();
    hull
}

/// Closed outline around the convex hull of `points`.
pub fn draw_contour(frame: &mut Frame, points: &[Point], color: [u8; 3]) {
    let hull = convex_hull(points);
    let rounded: Vec<(i64, i64)> = hull
        .iter()
        .map(|p| (p.x.round() as i64, p.y.round() as i64))
        .collect();
    match rounded.len() {
        0 => {}
        1 => frame.put_pixel(rounded[0].0, rounded[0].1, color),
        n => {
            for i in 0..n {
                draw_line(frame, rounded[i], rounded[(i + 1) % n], color);
            }
        }
    }
}

/// One-pixel line (Bresenham). Pixels outside the frame are skipped.
pub fn draw_line(frame: &mut Frame, from: (i64, i64), to: (i64, i64), color: [u8; 3]) {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        frame.put_pixel(x, y, color);
        if (x, y) == to {
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

/// Renders `text` with its bottom-left corner at `origin`.
pub fn draw_text(frame: &mut Frame, text: &str, origin: (i64, i64), style: TextStyle) {
    let scale = style.scale.max(1) as i64;
    let top = origin.1 - GLYPH_HEIGHT as i64 * scale;
    let advance = (GLYPH_WIDTH + GLYPH_SPACING) as i64 * scale;

    for (i, c) in text.chars().enumerate() {
        let Some(glyph) = bitmap_font::glyph(c) else {
            continue;
        };
        let left = origin.0 + i as i64 * advance;
        for row in 0..GLYPH_HEIGHT {
            for col in 0..GLYPH_WIDTH {
                if !bitmap_font::is_set(&glyph, col, row) {
                    continue;
                }
                let x0 = left + col as i64 * scale;
                let y0 = top + row as i64 * scale;
                for y in y0..y0 + scale {
                    for x in x0..x0 + scale {
                        frame.put_pixel(x, y, style.color);
                    }
                }
            }
        }
    }
}
