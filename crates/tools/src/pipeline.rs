//! Request-level plate pipeline: validate, fetch, classify, project, extrude,
//! assemble, encode.

use std::collections::BTreeMap;

use formats::{CodecError, MapData, ModelCodec, SceneMetadata};
use foundation::math::{BoundingBox, GeoPoint, PlateProjector, validate_area_km2};
use foundation::{InputError, PlateConfig};
use layers::{ClassifiedFeature, DropReason, category_color, classify_feature, plate_color};
use scene::{Mesh, Scene, SceneAssembler, build_plate, extrude_ring, ribbon_segments};
use serde::Serialize;
use streaming::{FailoverFetcher, FetchError, build_query};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct PlateRequest {
    pub lat: f64,
    pub lon: f64,
    /// Capture area in km². Falls back to the configured default.
    pub area_km2: Option<f64>,
    /// Label stored in the model metadata only.
    pub address: Option<String>,
}

impl PlateRequest {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            area_km2: None,
            address: None,
        }
    }
}

/// Failures that abort a whole request.
#[derive(Debug)]
pub enum PlateError {
    Input(InputError),
    DataSource(FetchError),
    Codec(CodecError),
}

impl std::fmt::Display for PlateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlateError::Input(err) => write!(f, "invalid request: {err}"),
            PlateError::DataSource(err) => write!(f, "{err}"),
            PlateError::Codec(err) => write!(f, "model encoding failed: {err}"),
        }
    }
}

impl std::error::Error for PlateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlateError::Input(err) => Some(err),
            PlateError::DataSource(err) => Some(err),
            PlateError::Codec(err) => Some(err),
        }
    }
}

impl From<InputError> for PlateError {
    fn from(err: InputError) -> Self {
        PlateError::Input(err)
    }
}

impl From<FetchError> for PlateError {
    fn from(err: FetchError) -> Self {
        PlateError::DataSource(err)
    }
}

impl From<CodecError> for PlateError {
    fn from(err: CodecError) -> Self {
        PlateError::Codec(err)
    }
}

/// Per-request feature accounting.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    /// Ways and relations in the provider response, plus elements that could
    /// not be decoded at all.
    pub fetched: usize,
    /// Features that became a scene node.
    pub built: usize,
    /// Skipped features keyed by reason.
    pub dropped: BTreeMap<&'static str, usize>,
    pub vertices: usize,
    pub triangles: usize,
}

impl PipelineStats {
    fn record_drop(&mut self, reason: DropReason) {
        *self.dropped.entry(reason.as_str()).or_default() += 1;
    }

    pub fn dropped_total(&self) -> usize {
        self.dropped.values().sum()
    }
}

/// Encoded model handed to persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateOutput {
    pub bytes: Vec<u8>,
    pub byte_length: usize,
    pub stats: PipelineStats,
}

pub fn default_address(center: GeoPoint) -> String {
    format!("{:.5}, {:.5}", center.lat_deg, center.lon_deg)
}

/// Extrude one classified feature in plate space. Open roads become one
/// ribbon rectangle per segment, all in the same mesh.
pub fn feature_mesh(
    feature: &ClassifiedFeature,
    projector: &PlateProjector,
    cfg: &PlateConfig,
) -> Mesh {
    let points = projector.project_ring(&feature.ring);
    let (base, height, eps) = (feature.base_height_mm, feature.height_mm, cfg.edge_epsilon_mm);
    let name = feature.mesh_name();
    let color = category_color(feature.category);

    if feature.closed {
        return extrude_ring(&points, base, height, eps).with_style(name, color);
    }

    let mut mesh = Mesh::new(name, color);
    for quad in ribbon_segments(&points, cfg.road_width_mm, eps) {
        mesh.merge(&extrude_ring(&quad, base, height, eps));
    }
    mesh
}

/// Build the plate and every usable feature of `data` into a scene.
///
/// Features never fail the scene; each one that cannot be built is counted
/// under its [`DropReason`].
pub fn build_scene(
    data: &MapData,
    projector: &PlateProjector,
    cfg: &PlateConfig,
) -> (Scene, PipelineStats) {
    let mut stats = PipelineStats::default();
    let plate = build_plate(cfg.plate_size_mm, cfg.plate_thickness_mm, plate_color());
    let mut assembler = SceneAssembler::new(plate);

    for _ in 0..data.malformed_elements() {
        stats.fetched += 1;
        stats.record_drop(DropReason::MalformedElement);
    }

    for feature in data.features() {
        stats.fetched += 1;

        let classified = match classify_feature(feature, data, cfg) {
            Ok(classified) => classified,
            Err(reason) => {
                debug!(id = feature.id, reason = reason.as_str(), "feature skipped");
                stats.record_drop(reason);
                continue;
            }
        };

        let mesh = feature_mesh(&classified, projector, cfg);
        if assembler.add(mesh) {
            stats.built += 1;
        } else {
            debug!(id = feature.id, "feature produced no triangles");
            stats.record_drop(DropReason::DegenerateGeometry);
        }
    }

    let scene = assembler.finish();
    stats.vertices = scene.vertex_count();
    stats.triangles = scene.triangle_count();
    (scene, stats)
}

/// Run the full pipeline for one request.
///
/// Input is validated before anything is fetched. Only invalid input, an
/// exhausted provider list and encoding failures are errors.
pub async fn generate_plate(
    request: &PlateRequest,
    cfg: &PlateConfig,
    server_timeout_secs: u32,
    fetcher: &FailoverFetcher,
    codec: &dyn ModelCodec,
) -> Result<PlateOutput, PlateError> {
    let center = GeoPoint::validated(request.lat, request.lon)?;
    let area_km2 = validate_area_km2(request.area_km2.unwrap_or(cfg.default_area_km2))?;
    let bbox = BoundingBox::around(center, area_km2)?;
    let projector = PlateProjector::new(center, area_km2, cfg.plate_size_mm)?;

    info!(
        lat = center.lat_deg,
        lon = center.lon_deg,
        area_km2,
        mm_per_m = projector.scale(),
        providers = fetcher.provider_count(),
        "generating plate"
    );

    let query = build_query(&bbox, server_timeout_secs);
    let data = fetcher.fetch(&query).await?;
    let (scene, stats) = build_scene(&data, &projector, cfg);

    let address = request
        .address
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| default_address(center));
    let metadata = SceneMetadata {
        address,
        origin: projector.center(),
        area_km2,
    };
    let bytes = codec.encode(&scene, &metadata)?;

    info!(
        fetched = stats.fetched,
        built = stats.built,
        dropped = stats.dropped_total(),
        bytes = bytes.len(),
        "plate generated"
    );

    Ok(PlateOutput {
        byte_length: bytes.len(),
        bytes,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{
        PlateError, PlateRequest, build_scene, default_address, feature_mesh, generate_plate,
    };
    use formats::{GlbCodec, MapData};
    use foundation::math::{GeoPoint, PlateProjector};
    use foundation::{InputError, PlateConfig};
    use layers::{Category, classify_feature};
    use pretty_assertions::assert_eq;
    use scene::PLATE_MESH_NAME;
    use streaming::{
        FailoverFetcher, FetchError, MapDataProvider, StaticProvider, StaticResponse,
    };

    const LAT: f64 = 52.52;
    const LON: f64 = 13.405;

    // Features within about 60 m of the center.
    const SAMPLE: &str = r#"{"elements": [
        {"type": "node", "id": 1, "lat": 52.5200, "lon": 13.4050},
        {"type": "node", "id": 2, "lat": 52.5200, "lon": 13.4053},
        {"type": "node", "id": 4, "lat": 52.5202, "lon": 13.4050},
        {"type": "node", "id": 5, "lat": 52.5202, "lon": 13.4053},
        {"type": "node", "id": 6, "lat": 52.5199, "lon": 13.4040},
        {"type": "node", "id": 7, "lat": 52.5199, "lon": 13.4046},
        {"type": "node", "id": 8, "lat": 52.5197, "lon": 13.4049},
        {"type": "way", "id": 100, "nodes": [1, 2, 5, 4, 1], "tags": {"building": "yes", "building:levels": "5"}},
        {"type": "way", "id": 101, "nodes": [6, 7, 8], "tags": {"highway": "residential"}},
        {"type": "way", "id": 102, "nodes": [1, 2, 5, 4, 1], "tags": {"natural": "water"}},
        {"type": "way", "id": 103, "nodes": [1, 2, 4, 1], "tags": {"amenity": "bench"}},
        {"type": "way", "id": 104, "nodes": [6, 6, 6], "tags": {"highway": "service"}},
        {"type": "relation", "id": 200, "members": [], "tags": {"building": "yes"}}
    ]}"#;

    // One element of each broken shape next to a usable building.
    const MIXED: &str = r#"{"elements": [
        {"type": "node", "id": 1, "lat": 52.5200, "lon": 13.4050},
        {"type": "node", "id": 2, "lat": 52.5200, "lon": 13.4053},
        {"type": "node", "id": 3, "lat": 52.5202},
        {"type": "node", "id": 4, "lat": 52.5202, "lon": 13.4050},
        {"type": "node", "id": 5, "lat": 52.5202, "lon": 13.4053},
        {"type": "way", "id": 100, "nodes": [1, 2, 5, 4, 1], "tags": {"building": "yes"}},
        {"type": "way", "id": 101, "nodes": "1,2,5", "tags": {"highway": "residential"}},
        {"type": "way", "id": 102, "nodes": [1, 2, 3, 1], "tags": {"building": "yes"}}
    ]}"#;

    fn projector(cfg: &PlateConfig) -> PlateProjector {
        PlateProjector::new(GeoPoint::new(LAT, LON), 1.0, cfg.plate_size_mm).expect("projector")
    }

    fn fetcher_with(body: &str) -> (Arc<StaticProvider>, FailoverFetcher) {
        let provider = Arc::new(StaticProvider::with_body("static", body));
        let fetcher = FailoverFetcher::new(vec![provider.clone() as Arc<dyn MapDataProvider>]);
        (provider, fetcher)
    }

    #[test]
    fn scene_has_plate_first_and_one_node_per_built_feature() {
        let cfg = PlateConfig::default();
        let data = MapData::from_json_str(SAMPLE).expect("sample");
        let (scene, stats) = build_scene(&data, &projector(&cfg), &cfg);

        assert_eq!(scene.nodes[0].mesh.name, PLATE_MESH_NAME);
        let names: Vec<&str> = scene.meshes().skip(1).map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["building-100", "road-101", "water-102"]);

        assert_eq!(stats.fetched, 6);
        assert_eq!(stats.built, 3);
        assert_eq!(stats.dropped.get("unclassified"), Some(&1));
        assert_eq!(stats.dropped.get("degenerate_geometry"), Some(&1));
        assert_eq!(stats.dropped.get("relation"), Some(&1));
        assert_eq!(stats.dropped_total() + stats.built, stats.fetched);
        assert_eq!(stats.vertices, scene.vertex_count());
    }

    #[test]
    fn malformed_elements_are_counted_and_the_rest_is_built() {
        let cfg = PlateConfig::default();
        let data = MapData::from_json_str(MIXED).expect("mixed response parses");
        let (scene, stats) = build_scene(&data, &projector(&cfg), &cfg);

        let names: Vec<&str> = scene.meshes().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec![PLATE_MESH_NAME, "building-100"]);

        assert_eq!(stats.fetched, 4);
        assert_eq!(stats.built, 1);
        assert_eq!(stats.dropped.get("malformed_element"), Some(&2));
        // Way 102 lost its third corner with the malformed node.
        assert_eq!(stats.dropped.get("below_min_area"), Some(&1));
        assert_eq!(stats.dropped_total() + stats.built, stats.fetched);
    }

    #[test]
    fn every_index_resolves_within_its_own_mesh() {
        let cfg = PlateConfig::default();
        let data = MapData::from_json_str(SAMPLE).expect("sample");
        let (scene, _) = build_scene(&data, &projector(&cfg), &cfg);

        let mut expected_base = 0u32;
        for node in &scene.nodes {
            let len = node.mesh.positions.len() as u32;
            assert!(node.mesh.indices.iter().all(|&i| i < len), "{}", node.mesh.name);
            assert_eq!(node.base_vertex, expected_base);
            expected_base += len;
        }
    }

    #[test]
    fn water_sits_below_the_plate_top_without_walls() {
        let cfg = PlateConfig::default();
        let data = MapData::from_json_str(SAMPLE).expect("sample");
        let water = data
            .features()
            .iter()
            .find(|f| f.id == 102)
            .expect("water way");
        let classified = classify_feature(water, &data, &cfg).expect("kept");
        assert_eq!(classified.category, Category::Water);

        let mesh = feature_mesh(&classified, &projector(&cfg), &cfg);
        // Two caps of a quad, no side quads.
        assert_eq!(mesh.triangle_count(), 4);
        assert!(mesh.positions.iter().all(|p| p[2] == -cfg.water_depth_mm as f32));
    }

    #[test]
    fn open_road_becomes_ribbon_boxes() {
        let cfg = PlateConfig::default();
        let data = MapData::from_json_str(SAMPLE).expect("sample");
        let road = data
            .features()
            .iter()
            .find(|f| f.id == 101)
            .expect("road way");
        let classified = classify_feature(road, &data, &cfg).expect("kept");
        assert!(!classified.closed);

        let mesh = feature_mesh(&classified, &projector(&cfg), &cfg);
        // Two segments, each a closed box of 12 triangles.
        assert_eq!(mesh.triangle_count(), 24);
        assert!(mesh.indices_in_range());
        let top = mesh
            .positions
            .iter()
            .map(|p| p[2])
            .fold(f32::MIN, f32::max);
        assert_eq!(top, cfg.road_height_mm as f32);
    }

    #[test]
    fn default_address_uses_five_decimals() {
        assert_eq!(default_address(GeoPoint::new(LAT, LON)), "52.52000, 13.40500");
    }

    #[tokio::test]
    async fn generates_glb_from_static_provider() {
        let cfg = PlateConfig::default();
        let (provider, fetcher) = fetcher_with(SAMPLE);
        let request = PlateRequest {
            address: Some("Alexanderplatz".to_string()),
            ..PlateRequest::new(LAT, LON)
        };

        let out = generate_plate(&request, &cfg, 25, &fetcher, &GlbCodec::default())
            .await
            .expect("plate");

        assert_eq!(provider.calls(), 1);
        assert_eq!(out.byte_length, out.bytes.len());
        assert_eq!(&out.bytes[0..4], b"glTF");
        assert_eq!(out.stats.built, 3);

        let json_len = u32::from_le_bytes(out.bytes[12..16].try_into().expect("len")) as usize;
        let json: serde_json::Value =
            serde_json::from_slice(&out.bytes[20..20 + json_len]).expect("json chunk");
        assert_eq!(json["scenes"][0]["extras"]["address"], "Alexanderplatz");
        assert_eq!(json["nodes"][0]["name"], PLATE_MESH_NAME);
    }

    #[tokio::test]
    async fn partially_malformed_response_still_yields_a_plate() {
        let cfg = PlateConfig::default();
        let (_, fetcher) = fetcher_with(MIXED);

        let out = generate_plate(
            &PlateRequest::new(LAT, LON),
            &cfg,
            25,
            &fetcher,
            &GlbCodec::default(),
        )
        .await
        .expect("plate");

        assert_eq!(out.stats.built, 1);
        assert_eq!(out.stats.dropped.get("malformed_element"), Some(&2));
        let glb = gltf::Gltf::from_slice(&out.bytes).expect("valid glb");
        assert_eq!(glb.meshes().count(), 2);
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_fetching() {
        let cfg = PlateConfig::default();
        let (provider, fetcher) = fetcher_with(SAMPLE);

        for (request, expected) in [
            (PlateRequest::new(91.0, LON), InputError::InvalidLatitude(91.0)),
            (PlateRequest::new(LAT, -181.0), InputError::InvalidLongitude(-181.0)),
            (
                PlateRequest {
                    area_km2: Some(0.0),
                    ..PlateRequest::new(LAT, LON)
                },
                InputError::InvalidArea(0.0),
            ),
        ] {
            let err = generate_plate(&request, &cfg, 25, &fetcher, &GlbCodec::default())
                .await
                .expect_err("invalid");
            assert!(matches!(err, PlateError::Input(e) if e == expected));
        }
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn exhausted_providers_fail_the_request() {
        let cfg = PlateConfig::default();
        let fetcher = FailoverFetcher::new(vec![
            Arc::new(StaticProvider::new("a", StaticResponse::Status(429)))
                as Arc<dyn MapDataProvider>,
            Arc::new(StaticProvider::new("b", StaticResponse::Status(503)))
                as Arc<dyn MapDataProvider>,
        ]);
        let err = generate_plate(
            &PlateRequest::new(LAT, LON),
            &cfg,
            25,
            &fetcher,
            &GlbCodec::default(),
        )
        .await
        .expect_err("unavailable");
        assert!(matches!(
            err,
            PlateError::DataSource(FetchError::DataSourceUnavailable { attempts: 2, .. })
        ));
    }

    #[tokio::test]
    async fn empty_response_still_yields_a_plate() {
        let cfg = PlateConfig::default();
        let (_, fetcher) = fetcher_with(r#"{"elements": []}"#);
        let out = generate_plate(
            &PlateRequest::new(LAT, LON),
            &cfg,
            25,
            &fetcher,
            &GlbCodec::default(),
        )
        .await
        .expect("plate only");
        assert_eq!(out.stats.fetched, 0);
        assert_eq!(out.stats.triangles, 12);
    }
}
