use imageproc::point::Point;
use imageproc::rect::Rect;

/// Spatial moments up to first order of a closed polygon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
}

impl Moments {
    /// The center of mass, or `None` when the polygon encloses no area.
    pub fn centroid(&self) -> Option<Point<f64>> {
        if self.m00 == 0.0 {
            return None;
        }
        Some(Point::new(self.m10 / self.m00, self.m01 / self.m00))
    }
}

/// Computes the moments of the polygon traced by `points` using Green's
/// theorem. The polygon is closed implicitly and its orientation does not
/// matter: `m00` is always the non-negative enclosed area.
pub fn polygon_moments(points: &[Point<i32>]) -> Moments {
    let mut m00 = 0.0;
    let mut m10 = 0.0;
    let mut m01 = 0.0;

    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        let (x0, y0) = (p.x as f64, p.y as f64);
        let (x1, y1) = (q.x as f64, q.y as f64);
        let cross = x0 * y1 - x1 * y0;
        m00 += cross;
        m10 += cross * (x0 + x1);
        m01 += cross * (y0 + y1);
    }

    let sign = if m00 < 0.0 { -1.0 } else { 1.0 };
    Moments {
        m00: sign * m00 / 2.0,
        m10: sign * m10 / 6.0,
        m01: sign * m01 / 6.0,
    }
}

/// The smallest rect containing every point, edges inclusive.
pub fn bounding_rect(points: &[Point<i32>]) -> Option<Rect> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(Rect::at(min_x, min_y).of_size((max_x - min_x + 1) as u32, (max_y - min_y + 1) as u32))
}
