use proptest::num::f32::NORMAL;
use proptest::prelude::*;
use proptest::strategy::Strategy;
use strata_geom::{ChunkCoord, Vec3};

fn approx_abs_rel(a: f32, b: f32, atol: f32, rtol: f32) -> bool {
    let diff = (a - b).abs();
    let scale = a.abs().max(b.abs());
    diff <= atol + rtol * scale
}

fn bounded_f32() -> impl Strategy<Value = f32> {
    NORMAL.prop_filter("bounded", |v| v.is_finite() && v.abs() <= 1e4)
}

fn arb_vec3() -> impl Strategy<Value = Vec3> {
    (bounded_f32(), bounded_f32(), bounded_f32()).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

fn small_i32() -> impl Strategy<Value = i32> {
    -100_000i32..=100_000
}

proptest! {
    // Distance is symmetric: |a - b| == |b - a|
    #[test]
    fn distance_symmetric(a in arb_vec3(), b in arb_vec3()) {
        prop_assert!(approx_abs_rel(a.distance(b), b.distance(a), 1e-4, 1e-5));
    }

    // Distance is never negative and zero to itself
    #[test]
    fn distance_non_negative(a in arb_vec3(), b in arb_vec3()) {
        prop_assert!(a.distance(b) >= 0.0);
        prop_assert_eq!(a.distance(a), 0.0);
    }

    // length_squared agrees with length^2
    #[test]
    fn length_squared_matches_length(a in arb_vec3()) {
        let l = a.length();
        prop_assert!(approx_abs_rel(l * l, a.length_squared(), 1e-3, 1e-4));
    }

    // Grid distance is symmetric and zero to itself
    #[test]
    fn coord_distance_sq_symmetric(
        ax in small_i32(), ay in small_i32(), az in small_i32(),
        bx in small_i32(), by in small_i32(), bz in small_i32(),
    ) {
        let a = ChunkCoord::new(ax, ay, az);
        let b = ChunkCoord::new(bx, by, bz);
        prop_assert_eq!(a.distance_sq(b), b.distance_sq(a));
        prop_assert_eq!(a.distance_sq(a), 0);
    }

    // offset then negative offset returns to start
    #[test]
    fn coord_offset_roundtrip(
        cx in small_i32(), cy in small_i32(), cz in small_i32(),
        dx in -64i32..=64, dy in -64i32..=64, dz in -64i32..=64,
    ) {
        let c = ChunkCoord::new(cx, cy, cz);
        prop_assert_eq!(c.offset(dx, dy, dz).offset(-dx, -dy, -dz), c);
    }
}

#[test]
fn center_of_origin_chunk_is_half_size() {
    let c = ChunkCoord::new(0, 0, 0).center(16);
    assert_eq!(c, Vec3::new(8.0, 8.0, 8.0));
    let n = ChunkCoord::new(-1, 0, 2).center(16);
    assert_eq!(n, Vec3::new(-8.0, 8.0, 40.0));
}
