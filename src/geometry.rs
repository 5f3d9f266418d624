//! Planar polygon helpers shared by the solver, the triangulator and the
//! raster surface.

use crate::types::Point;

/// Twice the signed area of triangle `(p0, p1, p2)`.
///
/// Positive when the points turn counter-clockwise in a y-up frame. This is
/// the Cramer's rule denominator `x0(y1−y2) + x1(y2−y0) + x2(y0−y1)`.
#[inline]
pub fn signed_area2(p0: Point, p1: Point, p2: Point) -> f32 {
    p0.x * (p1.y - p2.y) + p1.x * (p2.y - p0.y) + p2.x * (p0.y - p1.y)
}

/// Area of a polygon using the shoelace formula.
pub fn polygon_area(points: &[Point]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    let n = points.len();

    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x * points[j].y;
        area -= points[j].x * points[i].y;
    }

    (area / 2.0).abs()
}

/// Even-odd containment test for a closed polygon.
pub fn point_in_polygon(p: Point, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let a = polygon[i];
        let b = polygon[j];
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Axis-aligned bounds `(min, max)` of a point list.
pub fn bounds(points: &[Point]) -> Option<(Point, Point)> {
    let first = *points.first()?;
    let (min, max) = points.iter().skip(1).fold((first, first), |(lo, hi), p| {
        (
            Point::new(lo.x.min(p.x), lo.y.min(p.y)),
            Point::new(hi.x.max(p.x), hi.y.max(p.y)),
        )
    });
    Some((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polygon_area_triangle() {
        let triangle = vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(2.0, 3.0),
        ];
        // 0.5 * base * height
        assert!((polygon_area(&triangle) - 6.0).abs() < 0.01);
    }

    #[test]
    fn test_polygon_area_square() {
        let square = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        assert!((polygon_area(&square) - 100.0).abs() < 0.01);
    }

    #[test]
    fn signed_area_orientation() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(4.0, 0.0);
        let c = Point::new(0.0, 3.0);
        assert_eq!(signed_area2(a, b, c), 12.0);
        assert_eq!(signed_area2(a, c, b), -12.0);
        assert_eq!(
            signed_area2(Point::new(0.0, 0.0), Point::new(1.0, 1.0), Point::new(2.0, 2.0)),
            0.0
        );
    }

    #[test]
    fn containment() {
        let tri = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
        ];
        assert!(point_in_polygon(Point::new(2.0, 2.0), &tri));
        assert!(!point_in_polygon(Point::new(8.0, 8.0), &tri));
        assert!(!point_in_polygon(Point::new(-1.0, 1.0), &tri));
    }

    #[test]
    fn bounds_of_points() {
        let pts = [Point::new(3.0, -1.0), Point::new(-2.0, 4.0), Point::new(1.0, 1.0)];
        let (lo, hi) = bounds(&pts).unwrap();
        assert_eq!(lo, Point::new(-2.0, -1.0));
        assert_eq!(hi, Point::new(3.0, 4.0));
        assert!(bounds(&[]).is_none());
    }
}
