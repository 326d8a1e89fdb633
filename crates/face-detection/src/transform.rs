//! 2-D affine transforms for mapping detections between coordinate spaces

use face_analysis_common::{Point, Rect};

/// Affine transform `x' = a*x + c*y + tx`, `y' = b*x + d*y + ty`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineTransform {
    #[must_use]
    pub const fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            tx: 0.0,
            ty: 0.0,
        }
    }

    #[must_use]
    pub const fn scale(sx: f32, sy: f32) -> Self {
        Self {
            a: sx,
            b: 0.0,
            c: 0.0,
            d: sy,
            tx: 0.0,
            ty: 0.0,
        }
    }

    #[must_use]
    pub const fn translation(tx: f32, ty: f32) -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            tx,
            ty,
        }
    }

    /// Transform that applies `self` first, then `other`
    #[must_use]
    pub fn then(&self, other: &AffineTransform) -> AffineTransform {
        AffineTransform {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            tx: self.tx * other.a + self.ty * other.c + other.tx,
            ty: self.tx * other.b + self.ty * other.d + other.ty,
        }
    }

    #[must_use]
    #[inline]
    pub fn apply_point(&self, point: &Point) -> Point {
        Point::new(
            self.a * point.x + self.c * point.y + self.tx,
            self.b * point.x + self.d * point.y + self.ty,
        )
    }

    /// Smallest axis-aligned rectangle containing the transformed corners
    #[must_use]
    pub fn apply_rect(&self, rect: &Rect) -> Rect {
        let corners = [
            Point::new(rect.x, rect.y),
            Point::new(rect.max_x(), rect.y),
            Point::new(rect.x, rect.max_y()),
            Point::new(rect.max_x(), rect.max_y()),
        ]
        .map(|p| self.apply_point(&p));

        let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
        let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for p in corners {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_point_and_rect() {
        let t = AffineTransform::scale(2.0, 2.0);
        assert_eq!(t.apply_point(&Point::new(3.0, 4.0)), Point::new(6.0, 8.0));
        assert_eq!(
            t.apply_rect(&Rect::new(10.0, 20.0, 30.0, 40.0)),
            Rect::new(20.0, 40.0, 60.0, 80.0)
        );
    }

    #[test]
    fn test_negative_scale_normalizes_rect() {
        let t = AffineTransform::scale(-1.0, 1.0);
        assert_eq!(
            t.apply_rect(&Rect::new(10.0, 0.0, 5.0, 5.0)),
            Rect::new(-15.0, 0.0, 5.0, 5.0)
        );
    }

    #[test]
    fn test_scale_round_trip() {
        let scale = 0.3125_f32;
        let forward = AffineTransform::scale(scale, scale);
        let inverse = AffineTransform::scale(1.0 / scale, 1.0 / scale);
        let rect = Rect::new(123.0, 45.0, 67.0, 89.0);
        let back = inverse.apply_rect(&forward.apply_rect(&rect));
        assert!((back.x - rect.x).abs() < 1e-3);
        assert!((back.y - rect.y).abs() < 1e-3);
        assert!((back.width - rect.width).abs() < 1e-3);
        assert!((back.height - rect.height).abs() < 1e-3);
    }

    #[test]
    fn test_then_composes_in_order() {
        let t = AffineTransform::scale(2.0, 2.0).then(&AffineTransform::translation(1.0, -1.0));
        assert_eq!(t.apply_point(&Point::new(1.0, 1.0)), Point::new(3.0, 1.0));
        assert_eq!(AffineTransform::default(), AffineTransform::identity());
    }
}
