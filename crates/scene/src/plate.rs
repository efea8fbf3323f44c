use foundation::math::Vec3;

use crate::mesh::{Mesh, Rgba};

pub const PLATE_MESH_NAME: &str = "plate";

/// Square base plate centered on the origin, top face at z = 0.
pub fn build_plate(size: f64, thickness: f64, color: Rgba) -> Mesh {
    let h = size * 0.5;
    let t = -thickness;
    let p = Vec3::new;
    let mut mesh = Mesh::new(PLATE_MESH_NAME, color);

    mesh.push_quad(
        [p(-h, -h, 0.0), p(h, -h, 0.0), p(h, h, 0.0), p(-h, h, 0.0)],
        p(0.0, 0.0, 1.0),
    );
    mesh.push_quad(
        [p(-h, -h, t), p(-h, h, t), p(h, h, t), p(h, -h, t)],
        p(0.0, 0.0, -1.0),
    );
    mesh.push_quad(
        [p(h, -h, t), p(h, h, t), p(h, h, 0.0), p(h, -h, 0.0)],
        p(1.0, 0.0, 0.0),
    );
    mesh.push_quad(
        [p(-h, h, t), p(-h, -h, t), p(-h, -h, 0.0), p(-h, h, 0.0)],
        p(-1.0, 0.0, 0.0),
    );
    mesh.push_quad(
        [p(h, h, t), p(-h, h, t), p(-h, h, 0.0), p(h, h, 0.0)],
        p(0.0, 1.0, 0.0),
    );
    mesh.push_quad(
        [p(-h, -h, t), p(h, -h, t), p(h, -h, 0.0), p(-h, -h, 0.0)],
        p(0.0, -1.0, 0.0),
    );

    mesh
}
