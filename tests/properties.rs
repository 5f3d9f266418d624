use face_warp::{
    compute_similarity, signed_area2, solve_affine, triangulate, AlignmentInfo, Error, Point,
};
use proptest::prelude::*;

fn point() -> impl Strategy<Value = Point> {
    (-500.0f32..500.0, -500.0f32..500.0).prop_map(|(x, y)| Point::new(x, y))
}

/// Triangles whose doubled area is comfortably away from zero.
fn fat_triangle() -> impl Strategy<Value = [Point; 3]> {
    (point(), point(), point())
        .prop_map(|(a, b, c)| [a, b, c])
        .prop_filter("area too small", |[a, b, c]| signed_area2(*a, *b, *c).abs() > 1000.0)
}

fn close(a: f32, b: f32, scale: f32) -> bool {
    (a - b).abs() <= 1e-3 * scale.max(1.0)
}

#[test]
fn solved_affine_reproduces_destination() {
    proptest!(|(src in fat_triangle(), dst in fat_triangle())| {
        let t = solve_affine(src, dst).unwrap();
        prop_assert!(t.is_finite());
        let magnitude = t.to_array().iter().fold(1.0f32, |m, v| m.max(v.abs()));
        for (s, d) in src.iter().zip(dst.iter()) {
            let mapped = t.apply(*s);
            prop_assert!(close(mapped.x, d.x, magnitude * 500.0), "{} vs {}", mapped.x, d.x);
            prop_assert!(close(mapped.y, d.y, magnitude * 500.0), "{} vs {}", mapped.y, d.y);
        }
    });
}

#[test]
fn same_triangle_solves_to_identity() {
    proptest!(|(t in fat_triangle())| {
        let m = solve_affine(t, t).unwrap();
        prop_assert!((m.a - 1.0).abs() < 1e-2);
        prop_assert!(m.b.abs() < 1e-2);
        prop_assert!(m.c.abs() < 1e-2);
        prop_assert!((m.d - 1.0).abs() < 1e-2);
        prop_assert!(m.e.abs() < 1.0);
        prop_assert!(m.f.abs() < 1.0);
    });
}

#[test]
fn collinear_sources_are_rejected() {
    proptest!(|(
        origin in (-500i32..500, -500i32..500),
        dir in (-50i32..50, -50i32..50),
        k1 in -5i32..5,
        k2 in -5i32..5,
        dst in fat_triangle()
    )| {
        // Small integer coordinates keep the doubled area exactly zero in f32.
        let at = |k: i32| Point::new((origin.0 + k * dir.0) as f32, (origin.1 + k * dir.1) as f32);
        let src = [at(0), at(k1), at(k2)];
        match solve_affine(src, dst) {
            Err(Error::DegenerateTriangle { .. }) => {}
            other => prop_assert!(false, "expected DegenerateTriangle, got {:?}", other),
        }
    });
}

#[test]
fn triangulation_indices_stay_in_range() {
    proptest!(|(points in prop::collection::vec(point(), 3..60))| {
        let n = points.len();
        let tri = triangulate(&points);
        prop_assert_eq!(tri.num_points(), n);
        prop_assert_eq!(tri.to_flat().len(), 3 * tri.len());
        for idx in tri.to_flat() {
            prop_assert!(idx < n);
        }
        // Reuse against a different face of the same cardinality.
        let other: Vec<Point> = points.iter().map(|p| *p * 0.7 + Point::new(3.0, -2.0)).collect();
        let other = face_warp::LandmarkSet::new(other);
        prop_assert!(tri.check_compatible(&other).is_ok());
        for t in 0..tri.len() {
            prop_assert!(tri.triangle_points(&other, t).is_ok());
        }
    });
}

#[test]
fn identical_alignment_is_unit_similarity() {
    proptest!(|(a in point(), b in point())| {
        prop_assume!(a.distance(&b) > 1e-3);
        let info = AlignmentInfo::from_pair(a, b);
        let s = compute_similarity(&info, &info).unwrap();
        prop_assert!((s.scale - 1.0).abs() < 1e-6);
        prop_assert!(s.rotation.abs() < 1e-6);
    });
}
