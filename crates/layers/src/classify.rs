//! Tag-driven feature classification.
//!
//! A feature's tags select exactly one [`Category`] through an ordered rule
//! table; the first matching rule wins. The category together with the
//! feature's real-world area then fixes its extrusion range in plate space.

use std::collections::BTreeMap;

use foundation::PlateConfig;
use foundation::math::{GeoPoint, ring_area_m2};
use formats::{ElementKind, MapData, MapFeature};

/// Highway classes rendered as roads.
pub const ROAD_CLASSES: [&str; 6] = [
    "primary",
    "secondary",
    "tertiary",
    "residential",
    "unclassified",
    "service",
];
/// `landuse` values rendered as green areas.
pub const GREEN_LANDUSE: [&str; 3] = ["grass", "meadow", "park"];
/// `natural` values rendered as sand.
pub const SAND_NATURAL: [&str; 2] = ["beach", "sand"];

pub type Tags = BTreeMap<String, String>;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    Building,
    Road,
    Water,
    Green,
    Sand,
    Unclassified,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Building => "building",
            Category::Road => "road",
            Category::Water => "water",
            Category::Green => "green",
            Category::Sand => "sand",
            Category::Unclassified => "unclassified",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn tag<'a>(tags: &'a Tags, key: &str) -> Option<&'a str> {
    tags.get(key).map(String::as_str)
}

fn is_building(tags: &Tags) -> bool {
    tags.contains_key("building")
}

fn is_road(tags: &Tags) -> bool {
    tag(tags, "highway").is_some_and(|v| ROAD_CLASSES.contains(&v))
}

fn is_water(tags: &Tags) -> bool {
    tag(tags, "natural") == Some("water") || tags.contains_key("waterway")
}

fn is_green(tags: &Tags) -> bool {
    tag(tags, "landuse").is_some_and(|v| GREEN_LANDUSE.contains(&v))
}

fn is_sand(tags: &Tags) -> bool {
    tag(tags, "natural").is_some_and(|v| SAND_NATURAL.contains(&v))
}

const RULES: [(Category, fn(&Tags) -> bool); 5] = [
    (Category::Building, is_building),
    (Category::Road, is_road),
    (Category::Water, is_water),
    (Category::Green, is_green),
    (Category::Sand, is_sand),
];

pub fn categorize(tags: &Tags) -> Category {
    RULES
        .iter()
        .find(|(_, matches)| matches(tags))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Unclassified)
}

/// `building:levels`, falling back to one storey when absent or unusable.
pub fn building_levels(tags: &Tags) -> f64 {
    tag(tags, "building:levels")
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|levels| levels.is_finite() && *levels > 0.0)
        .unwrap_or(1.0)
}

/// Why a feature does not become a mesh. None of these fail the request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DropReason {
    Unclassified,
    BelowMinArea,
    ZeroHeight,
    /// Too few usable points for the feature's shape.
    DegenerateGeometry,
    /// Relations are fetched but not expanded into geometry.
    Relation,
    /// The provider element did not decode as its declared type.
    MalformedElement,
}

impl DropReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DropReason::Unclassified => "unclassified",
            DropReason::BelowMinArea => "below_min_area",
            DropReason::ZeroHeight => "zero_height",
            DropReason::DegenerateGeometry => "degenerate_geometry",
            DropReason::Relation => "relation",
            DropReason::MalformedElement => "malformed_element",
        }
    }
}

/// Extrusion range (plate millimetres) chosen for a category.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Classification {
    pub category: Category,
    pub height_mm: f64,
    pub base_height_mm: f64,
    pub skip: bool,
}

impl Classification {
    fn new(category: Category, base_height_mm: f64, height_mm: f64, skip: bool) -> Self {
        Self {
            category,
            height_mm,
            base_height_mm,
            skip,
        }
    }

    /// The reason this classification is not extruded, if any.
    pub fn drop_reason(&self) -> Option<DropReason> {
        match self.category {
            Category::Unclassified => Some(DropReason::Unclassified),
            _ if self.skip => Some(DropReason::BelowMinArea),
            Category::Water => None,
            _ if self.height_mm == 0.0 => Some(DropReason::ZeroHeight),
            _ => None,
        }
    }
}

pub fn classify(tags: &Tags, area_m2: f64, cfg: &PlateConfig) -> Classification {
    let category = categorize(tags);
    match category {
        Category::Building => {
            let levels_mm =
                building_levels(tags) * cfg.building_level_height_m * cfg.height_scale_mm_per_m;
            Classification::new(
                category,
                0.0,
                cfg.building_min_height_mm.max(levels_mm),
                area_m2 < cfg.building_min_area_m2,
            )
        }
        Category::Road => Classification::new(category, 0.0, cfg.road_height_mm, false),
        Category::Water => Classification::new(
            category,
            -cfg.water_depth_mm,
            0.0,
            area_m2 < cfg.water_min_area_m2,
        ),
        Category::Green => Classification::new(category, 0.0, cfg.grass_height_mm, false),
        Category::Sand => Classification::new(category, 0.0, cfg.sand_height_mm, false),
        Category::Unclassified => Classification::new(category, 0.0, 0.0, true),
    }
}

/// A feature ready for projection and extrusion.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedFeature {
    pub id: i64,
    pub category: Category,
    /// Resolved outline. Closed ways keep their closing point.
    pub ring: Vec<GeoPoint>,
    /// False for open polylines, which are only kept for roads.
    pub closed: bool,
    pub height_mm: f64,
    pub base_height_mm: f64,
    pub area_m2: f64,
}

impl ClassifiedFeature {
    /// Mesh node name, unique per source feature.
    pub fn mesh_name(&self) -> String {
        format!("{}-{}", self.category, self.id)
    }
}

fn distinct_points(points: &[GeoPoint]) -> usize {
    let mut seen: Vec<GeoPoint> = Vec::with_capacity(points.len());
    for p in points {
        if !seen.contains(p) {
            seen.push(*p);
        }
    }
    seen.len()
}

/// Resolve, measure and classify one fetched feature.
pub fn classify_feature(
    feature: &MapFeature,
    data: &MapData,
    cfg: &PlateConfig,
) -> Result<ClassifiedFeature, DropReason> {
    if feature.kind == ElementKind::Relation {
        return Err(DropReason::Relation);
    }

    let ring = data.resolve_points(feature);
    let area_m2 = ring_area_m2(&ring);
    let classification = classify(&feature.tags, area_m2, cfg);
    if let Some(reason) = classification.drop_reason() {
        return Err(reason);
    }

    let closed = feature.is_closed();
    let open_road = classification.category == Category::Road && !closed;
    let min_points = if open_road { 2 } else { 3 };
    if distinct_points(&ring) < min_points {
        return Err(DropReason::DegenerateGeometry);
    }

    Ok(ClassifiedFeature {
        id: feature.id,
        category: classification.category,
        ring,
        closed: !open_road,
        height_mm: classification.height_mm,
        base_height_mm: classification.base_height_mm,
        area_m2,
    })
}
