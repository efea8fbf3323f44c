use foundation::math::Vec3;

/// Linear RGBA colour in `[0, 1]`.
pub type Rgba = [f32; 4];

/// Indexed triangle mesh in plate space (millimetres, z up).
///
/// Each vertex carries exactly one unit normal; faces that meet at a crease
/// use separate vertices.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Mesh {
    pub name: String,
    pub color: Rgba,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    /// Triangle list, three entries per triangle, local to this mesh's buffers.
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new(name: impl Into<String>, color: Rgba) -> Self {
        Self {
            name: name.into(),
            color,
            ..Self::default()
        }
    }

    pub fn with_style(mut self, name: impl Into<String>, color: Rgba) -> Self {
        self.name = name.into();
        self.color = color;
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn push_vertex(&mut self, position: Vec3, normal: Vec3) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(position.to_f32());
        self.normals.push(normal.to_f32());
        index
    }

    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    /// Append a planar quad given counter-clockwise as seen from outside.
    pub fn push_quad(&mut self, corners: [Vec3; 4], normal: Vec3) {
        let base = self.push_vertex(corners[0], normal);
        for &corner in &corners[1..] {
            self.push_vertex(corner, normal);
        }
        self.push_triangle(base, base + 1, base + 2);
        self.push_triangle(base, base + 2, base + 3);
    }

    /// Append another mesh's geometry, shifting its indices past our vertices.
    pub fn merge(&mut self, other: &Mesh) {
        let offset = self.positions.len() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.indices.extend(other.indices.iter().map(|&i| i + offset));
    }

    /// True when every index resolves into this mesh's own vertex buffer.
    pub fn indices_in_range(&self) -> bool {
        let len = self.positions.len() as u32;
        self.indices.len() % 3 == 0 && self.indices.iter().all(|&i| i < len)
    }
}
