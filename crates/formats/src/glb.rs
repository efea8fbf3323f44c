//! Binary glTF 2.0 writer for assembled plate scenes.
//!
//! Plate space is millimetres with z up and y pointing south. glTF is metres
//! with y up, so positions and normals are mapped `(x, y, z) -> (x, z, y)`
//! and scaled to metres. The axis swap mirrors the geometry, so every
//! triangle's winding is flipped to keep front faces outward.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use foundation::math::GeoPoint;
use gltf::binary::{Glb, Header};
use gltf::json;
use gltf::json::validation::Checked::Valid;
use gltf::json::validation::USize64;
use scene::{Mesh, Scene};
use serde_json::value::RawValue;

const MM_PER_METER: f32 = 1000.0;
const GLB_HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

/// Free-form description attached to the encoded model.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneMetadata {
    pub address: String,
    pub origin: GeoPoint,
    pub area_km2: f64,
}

impl SceneMetadata {
    fn to_extras(&self) -> Result<Box<RawValue>, serde_json::Error> {
        serde_json::value::to_raw_value(&serde_json::json!({
            "address": self.address,
            "origin": { "lat": self.origin.lat_deg, "lon": self.origin.lon_deg },
            "area_km2": self.area_km2,
        }))
    }
}

#[derive(Debug)]
pub enum CodecError {
    Json(serde_json::Error),
    Glb(gltf::Error),
    TooLarge { bytes: usize },
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::Json(err) => write!(f, "glTF JSON encoding failed: {err}"),
            CodecError::Glb(err) => write!(f, "GLB container encoding failed: {err}"),
            CodecError::TooLarge { bytes } => {
                write!(f, "model of {bytes} bytes exceeds the GLB size limit")
            }
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CodecError::Json(err) => Some(err),
            CodecError::Glb(err) => Some(err),
            CodecError::TooLarge { .. } => None,
        }
    }
}

/// Serializes a scene into an interchange buffer.
pub trait ModelCodec {
    fn encode(&self, scene: &Scene, metadata: &SceneMetadata) -> Result<Vec<u8>, CodecError>;
}

#[derive(Debug, Clone)]
pub struct GlbCodec {
    /// Vertices whose position and normal agree within this distance (metres)
    /// are merged.
    pub weld_tolerance: f32,
    pub generator: String,
    pub metallic: f32,
    pub roughness: f32,
}

impl Default for GlbCodec {
    fn default() -> Self {
        Self {
            weld_tolerance: 1e-4,
            generator: format!("plate-tools {}", env!("CARGO_PKG_VERSION")),
            metallic: 0.1,
            roughness: 0.8,
        }
    }
}

/// Geometry of one node after axis mapping and welding.
#[derive(Debug, Default)]
struct WeldedMesh {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    indices: Vec<u32>,
}

impl GlbCodec {
    fn weld(&self, mesh: &Mesh) -> WeldedMesh {
        let tol = self.weld_tolerance.max(f32::MIN_POSITIVE);
        let quantize = |v: [f32; 3]| {
            [
                (v[0] / tol).round() as i64,
                (v[1] / tol).round() as i64,
                (v[2] / tol).round() as i64,
            ]
        };

        let mut out = WeldedMesh::default();
        let mut seen: HashMap<([i64; 3], [i64; 3]), u32> = HashMap::new();
        let mut remap: Vec<u32> = Vec::with_capacity(mesh.positions.len());

        for (p, n) in mesh.positions.iter().zip(&mesh.normals) {
            let position = [p[0] / MM_PER_METER, p[2] / MM_PER_METER, p[1] / MM_PER_METER];
            let normal = [n[0], n[2], n[1]];
            let key = (quantize(position), quantize(normal));
            let index = *seen.entry(key).or_insert_with(|| {
                out.positions.push(position);
                out.normals.push(normal);
                (out.positions.len() - 1) as u32
            });
            remap.push(index);
        }

        for tri in mesh.indices.chunks_exact(3) {
            let (a, b, c) = (
                remap[tri[0] as usize],
                remap[tri[1] as usize],
                remap[tri[2] as usize],
            );
            // Welding can collapse a sliver triangle onto an edge.
            if a == b || b == c || a == c {
                continue;
            }
            out.indices.extend_from_slice(&[a, c, b]);
        }

        out
    }
}

impl ModelCodec for GlbCodec {
    fn encode(&self, scene: &Scene, metadata: &SceneMetadata) -> Result<Vec<u8>, CodecError> {
        let mut root = json::Root {
            asset: json::Asset {
                generator: Some(self.generator.clone()),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut bin: Vec<u8> = Vec::new();
        let mut views: Vec<(usize, usize, json::buffer::Target)> = Vec::new();
        let mut primitives: Vec<(String, json::Material, PrimitiveSlots)> = Vec::new();

        for mesh in scene.meshes() {
            let welded = self.weld(mesh);
            if welded.indices.is_empty() {
                continue;
            }

            let slots = PrimitiveSlots {
                positions: append_vec3(&mut bin, &mut views, &welded.positions),
                normals: append_vec3(&mut bin, &mut views, &welded.normals),
                indices: append_indices(&mut bin, &mut views, &welded.indices),
                vertex_count: welded.positions.len(),
                index_count: welded.indices.len(),
                bounds: bounds(&welded.positions),
            };
            let material = json::Material {
                name: Some(format!("{}-material", mesh.name)),
                pbr_metallic_roughness: json::material::PbrMetallicRoughness {
                    base_color_factor: json::material::PbrBaseColorFactor(mesh.color),
                    metallic_factor: json::material::StrengthFactor(self.metallic),
                    roughness_factor: json::material::StrengthFactor(self.roughness),
                    ..Default::default()
                },
                ..Default::default()
            };
            primitives.push((mesh.name.clone(), material, slots));
        }

        if !bin.is_empty() {
            let buffer = root.push(json::Buffer {
                byte_length: USize64::from(bin.len()),
                extensions: Default::default(),
                extras: Default::default(),
                name: None,
                uri: None,
            });
            let view_ids: Vec<json::Index<json::buffer::View>> = views
                .iter()
                .map(|&(offset, length, target)| {
                    root.push(json::buffer::View {
                        buffer,
                        byte_length: USize64::from(length),
                        byte_offset: Some(USize64::from(offset)),
                        byte_stride: None,
                        extensions: Default::default(),
                        extras: Default::default(),
                        name: None,
                        target: Some(Valid(target)),
                    })
                })
                .collect();

            let mut nodes = Vec::with_capacity(primitives.len());
            for (name, material, slots) in primitives {
                let (min, max) = slots.bounds;
                let positions = root.push(accessor(
                    view_ids[slots.positions],
                    slots.vertex_count,
                    json::accessor::ComponentType::F32,
                    json::accessor::Type::Vec3,
                    Some((min, max)),
                ));
                let normals = root.push(accessor(
                    view_ids[slots.normals],
                    slots.vertex_count,
                    json::accessor::ComponentType::F32,
                    json::accessor::Type::Vec3,
                    None,
                ));
                let indices = root.push(accessor(
                    view_ids[slots.indices],
                    slots.index_count,
                    json::accessor::ComponentType::U32,
                    json::accessor::Type::Scalar,
                    None,
                ));
                let material = root.push(material);

                let mut attributes = BTreeMap::new();
                attributes.insert(Valid(json::mesh::Semantic::Positions), positions);
                attributes.insert(Valid(json::mesh::Semantic::Normals), normals);
                let mesh = root.push(json::Mesh {
                    extensions: Default::default(),
                    extras: Default::default(),
                    name: Some(name.clone()),
                    primitives: vec![json::mesh::Primitive {
                        attributes,
                        extensions: Default::default(),
                        extras: Default::default(),
                        indices: Some(indices),
                        material: Some(material),
                        mode: Valid(json::mesh::Mode::Triangles),
                        targets: None,
                    }],
                    weights: None,
                });
                nodes.push(root.push(json::Node {
                    mesh: Some(mesh),
                    name: Some(name),
                    ..Default::default()
                }));
            }

            let scene = root.push(json::Scene {
                extensions: Default::default(),
                extras: Some(metadata.to_extras().map_err(CodecError::Json)?),
                name: Some("plate".to_string()),
                nodes,
            });
            root.scene = Some(scene);
        }

        let json_bytes = serde_json::to_vec(&root).map_err(CodecError::Json)?;
        let mut length = GLB_HEADER_LEN + CHUNK_HEADER_LEN + padded(json_bytes.len());
        if !bin.is_empty() {
            length += CHUNK_HEADER_LEN + padded(bin.len());
        }
        let length = u32::try_from(length).map_err(|_| CodecError::TooLarge { bytes: length })?;

        let glb = Glb {
            header: Header {
                magic: *b"glTF",
                version: 2,
                length,
            },
            json: Cow::Owned(json_bytes),
            bin: (!bin.is_empty()).then_some(Cow::Owned(bin)),
        };
        glb.to_vec().map_err(CodecError::Glb)
    }
}

/// Buffer view slots and counts of one mesh primitive.
struct PrimitiveSlots {
    positions: usize,
    normals: usize,
    indices: usize,
    vertex_count: usize,
    index_count: usize,
    bounds: ([f32; 3], [f32; 3]),
}

fn accessor(
    view: json::Index<json::buffer::View>,
    count: usize,
    component: json::accessor::ComponentType,
    kind: json::accessor::Type,
    bounds: Option<([f32; 3], [f32; 3])>,
) -> json::Accessor {
    json::Accessor {
        buffer_view: Some(view),
        byte_offset: None,
        count: USize64::from(count),
        component_type: Valid(json::accessor::GenericComponentType(component)),
        extensions: Default::default(),
        extras: Default::default(),
        type_: Valid(kind),
        min: bounds.map(|(min, _)| json::Value::from(min.to_vec())),
        max: bounds.map(|(_, max)| json::Value::from(max.to_vec())),
        name: None,
        normalized: false,
        sparse: None,
    }
}

fn padded(len: usize) -> usize {
    len.div_ceil(4) * 4
}

fn bounds(positions: &[[f32; 3]]) -> ([f32; 3], [f32; 3]) {
    let mut min = [f32::MAX; 3];
    let mut max = [f32::MIN; 3];
    for p in positions {
        for k in 0..3 {
            min[k] = min[k].min(p[k]);
            max[k] = max[k].max(p[k]);
        }
    }
    (min, max)
}

fn append_vec3(
    bin: &mut Vec<u8>,
    views: &mut Vec<(usize, usize, json::buffer::Target)>,
    data: &[[f32; 3]],
) -> usize {
    let offset = bin.len();
    for c in data.iter().flatten() {
        bin.extend_from_slice(&c.to_le_bytes());
    }
    views.push((offset, bin.len() - offset, json::buffer::Target::ArrayBuffer));
    views.len() - 1
}

fn append_indices(
    bin: &mut Vec<u8>,
    views: &mut Vec<(usize, usize, json::buffer::Target)>,
    indices: &[u32],
) -> usize {
    let offset = bin.len();
    for i in indices {
        bin.extend_from_slice(&i.to_le_bytes());
    }
    views.push((offset, bin.len() - offset, json::buffer::Target::ElementArrayBuffer));
    views.len() - 1
}
