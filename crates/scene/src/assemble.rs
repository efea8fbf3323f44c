use crate::mesh::Mesh;

/// A mesh placed in the scene with its slot in the global vertex numbering.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub mesh: Mesh,
    /// Global index of this node's first vertex. Node ranges never overlap and
    /// increase strictly in node order.
    pub base_vertex: u32,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Scene {
    pub nodes: Vec<SceneNode>,
}

impl Scene {
    pub fn meshes(&self) -> impl Iterator<Item = &Mesh> {
        self.nodes.iter().map(|node| &node.mesh)
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes().map(Mesh::vertex_count).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes().map(Mesh::triangle_count).sum()
    }
}

/// Collects the plate and feature meshes into a scene, one node per mesh.
///
/// Meshes keep their local index buffers; the assembler only hands out the
/// global vertex range each node occupies.
#[derive(Debug)]
pub struct SceneAssembler {
    scene: Scene,
    next_vertex: u32,
}

impl SceneAssembler {
    pub fn new(plate: Mesh) -> Self {
        let mut assembler = Self {
            scene: Scene::default(),
            next_vertex: 0,
        };
        assembler.push(plate);
        assembler
    }

    /// Append a feature mesh. Empty meshes are not added; returns whether the
    /// mesh became a node.
    pub fn add(&mut self, mesh: Mesh) -> bool {
        if mesh.is_empty() {
            return false;
        }
        self.push(mesh);
        true
    }

    fn push(&mut self, mesh: Mesh) {
        debug_assert!(mesh.indices_in_range(), "mesh {} has stray indices", mesh.name);
        let base_vertex = self.next_vertex;
        self.next_vertex += mesh.vertex_count() as u32;
        self.scene.nodes.push(SceneNode { mesh, base_vertex });
    }

    pub fn node_count(&self) -> usize {
        self.scene.nodes.len()
    }

    pub fn finish(self) -> Scene {
        self.scene
    }
}

#[cfg(test)]
mod tests {
    use super::SceneAssembler;
    use crate::extrude::extrude_ring;
    use crate::mesh::Mesh;
    use crate::plate::{PLATE_MESH_NAME, build_plate};
    use foundation::math::Vec2;

    fn footprint(x: f64, y: f64, points: usize) -> Vec<Vec2> {
        (0..points)
            .map(|i| {
                let a = i as f64 * std::f64::consts::TAU / points as f64;
                Vec2::new(x + 2.0 * a.cos(), y + 2.0 * a.sin())
            })
            .collect()
    }

    #[test]
    fn plate_is_first_and_features_keep_order() {
        let mut assembler = SceneAssembler::new(build_plate(200.0, 5.0, [1.0; 4]));
        for (i, n) in [4usize, 6, 3].into_iter().enumerate() {
            let mesh = extrude_ring(&footprint(i as f64 * 10.0, 0.0, n), 0.0, 3.0, 0.001)
                .with_style(format!("feature-{i}"), [0.5; 4]);
            assert!(assembler.add(mesh));
        }
        let scene = assembler.finish();

        let names: Vec<&str> = scene.meshes().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec![PLATE_MESH_NAME, "feature-0", "feature-1", "feature-2"]);
    }

    #[test]
    fn global_vertex_ranges_are_disjoint_and_increasing() {
        let mut assembler = SceneAssembler::new(build_plate(200.0, 5.0, [1.0; 4]));
        for i in 0..5 {
            assembler.add(extrude_ring(&footprint(0.0, i as f64 * 5.0, 4 + i), 0.0, 1.0, 0.001));
        }
        let scene = assembler.finish();

        let mut expected = 0u32;
        for node in &scene.nodes {
            assert_eq!(node.base_vertex, expected);
            expected += node.mesh.vertex_count() as u32;
        }
        assert_eq!(expected as usize, scene.vertex_count());
    }

    #[test]
    fn every_index_resolves_within_its_own_mesh() {
        let mut assembler = SceneAssembler::new(build_plate(200.0, 5.0, [1.0; 4]));
        for i in 0..8 {
            assembler.add(extrude_ring(&footprint(i as f64, -(i as f64), 3 + i), -1.0, 2.0, 0.001));
        }
        let scene = assembler.finish();
        assert_eq!(scene.nodes.len(), 9);
        assert!(scene.meshes().all(Mesh::indices_in_range));
    }

    #[test]
    fn empty_meshes_are_skipped() {
        let mut assembler = SceneAssembler::new(build_plate(200.0, 5.0, [1.0; 4]));
        assert!(!assembler.add(Mesh::new("empty", [1.0; 4])));
        assert_eq!(assembler.node_count(), 1);
    }
}
