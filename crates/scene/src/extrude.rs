//! Polygon extrusion into closed triangle meshes.
//!
//! Caps are fan-triangulated from the first ring vertex, which is exact for
//! convex rings only. Concave footprints still produce a closed solid, but the
//! caps may cover area outside the footprint.

use foundation::math::{Vec2, Vec3};

use crate::mesh::Mesh;

const DOWN: Vec3 = Vec3 { x: 0.0, y: 0.0, z: -1.0 };
const UP: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 1.0 };

/// Twice the signed area; positive for counter-clockwise rings.
pub fn signed_area2(ring: &[Vec2]) -> f64 {
    let Some(&origin) = ring.first() else {
        return 0.0;
    };
    let mut sum = 0.0;
    for i in 0..ring.len() {
        let a = ring[i] - origin;
        let b = ring[(i + 1) % ring.len()] - origin;
        sum += a.cross(b);
    }
    sum
}

/// Clean a projected ring for extrusion.
///
/// Drops repeated consecutive points and the closing duplicate, rejects rings
/// with fewer than three points or zero area, and returns the ring in
/// counter-clockwise order.
pub fn normalize_ring(points: &[Vec2]) -> Option<Vec<Vec2>> {
    let mut ring: Vec<Vec2> = Vec::with_capacity(points.len());
    for &p in points {
        if ring.last() != Some(&p) {
            ring.push(p);
        }
    }
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    if ring.len() < 3 {
        return None;
    }

    let area2 = signed_area2(&ring);
    if area2 == 0.0 || !area2.is_finite() {
        return None;
    }
    if area2 < 0.0 {
        ring.reverse();
    }
    Some(ring)
}

/// Extrude `points` from `base` up by `height` and append to `mesh`.
///
/// `height` must not be negative. Returns the number of triangles added; zero
/// when the ring is degenerate. Side walls are emitted only for edges longer
/// than `edge_epsilon` and only when `height` exceeds `edge_epsilon`.
pub fn extrude_ring_into(
    mesh: &mut Mesh,
    points: &[Vec2],
    base: f64,
    height: f64,
    edge_epsilon: f64,
) -> usize {
    let Some(ring) = normalize_ring(points) else {
        return 0;
    };
    let before = mesh.triangle_count();
    let top = base + height;
    let n = ring.len() as u32;

    let bottom_start = mesh.vertex_count() as u32;
    for p in &ring {
        mesh.push_vertex(Vec3::new(p.x, p.y, base), DOWN);
    }
    for i in 1..n - 1 {
        mesh.push_triangle(bottom_start, bottom_start + i + 1, bottom_start + i);
    }

    let top_start = mesh.vertex_count() as u32;
    for p in &ring {
        mesh.push_vertex(Vec3::new(p.x, p.y, top), UP);
    }
    for i in 1..n - 1 {
        mesh.push_triangle(top_start, top_start + i, top_start + i + 1);
    }

    if height > edge_epsilon {
        for i in 0..ring.len() {
            let p0 = ring[i];
            let p1 = ring[(i + 1) % ring.len()];
            let edge = p1 - p0;
            let len = edge.length();
            if len <= edge_epsilon {
                continue;
            }
            let out = edge.perp_cw().scale(1.0 / len);
            mesh.push_quad(
                [
                    Vec3::new(p0.x, p0.y, base),
                    Vec3::new(p1.x, p1.y, base),
                    Vec3::new(p1.x, p1.y, top),
                    Vec3::new(p0.x, p0.y, top),
                ],
                Vec3::new(out.x, out.y, 0.0),
            );
        }
    }

    mesh.triangle_count() - before
}

pub fn extrude_ring(points: &[Vec2], base: f64, height: f64, edge_epsilon: f64) -> Mesh {
    let mut mesh = Mesh::default();
    extrude_ring_into(&mut mesh, points, base, height, edge_epsilon);
    mesh
}

/// Split an open polyline into one rectangle per segment, `width` wide.
///
/// Segments not longer than `edge_epsilon` are skipped. Each rectangle is
/// convex, so fan-triangulated caps are exact.
pub fn ribbon_segments(polyline: &[Vec2], width: f64, edge_epsilon: f64) -> Vec<[Vec2; 4]> {
    let half = width * 0.5;
    polyline
        .windows(2)
        .filter_map(|pair| {
            let (a, b) = (pair[0], pair[1]);
            let dir = b - a;
            let len = dir.length();
            if len <= edge_epsilon {
                return None;
            }
            let side = dir.perp_cw().scale(half / len);
            Some([a + side, b + side, b - side, a - side])
        })
        .collect()
}
