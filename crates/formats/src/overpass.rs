//! Overpass API JSON responses.
//!
//! Only the parts the plate pipeline consumes are modelled: nodes become a
//! coordinate lookup, ways and relations become [`MapFeature`]s in response
//! order. Relations are kept as features but carry no resolvable geometry.
//!
//! Elements are decoded one at a time. An element that does not match its
//! declared type is skipped and counted; it does not fail the response.

use std::collections::{BTreeMap, HashMap};

use foundation::math::GeoPoint;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Way,
    Relation,
}

/// A way or relation exactly as the provider returned it.
#[derive(Debug, Clone, PartialEq)]
pub struct MapFeature {
    pub id: i64,
    pub kind: ElementKind,
    /// Node ids in way order. Empty for relations.
    pub node_refs: Vec<i64>,
    pub tags: BTreeMap<String, String>,
}

impl MapFeature {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn has_tag(&self, key: &str) -> bool {
        self.tags.contains_key(key)
    }

    /// A way whose last node is its first.
    pub fn is_closed(&self) -> bool {
        self.node_refs.len() >= 4 && self.node_refs.first() == self.node_refs.last()
    }
}

#[derive(Debug)]
pub enum MapDataError {
    Json(serde_json::Error),
    /// The body parsed but has no `elements` array.
    MissingElements,
}

impl std::fmt::Display for MapDataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapDataError::Json(err) => write!(f, "invalid map data JSON: {err}"),
            MapDataError::MissingElements => write!(f, "map data response has no elements"),
        }
    }
}

impl std::error::Error for MapDataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MapDataError::Json(err) => Some(err),
            MapDataError::MissingElements => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(default)]
    elements: Option<Value>,
    #[serde(default)]
    remark: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RawElement {
    Node {
        id: i64,
        lat: f64,
        lon: f64,
    },
    Way {
        id: i64,
        #[serde(default)]
        nodes: Vec<i64>,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    Relation {
        id: i64,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    #[serde(other)]
    Other,
}

/// Parsed provider response.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MapData {
    nodes: HashMap<i64, GeoPoint>,
    features: Vec<MapFeature>,
    malformed: usize,
    remark: Option<String>,
}

impl MapData {
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, MapDataError> {
        let raw: RawResponse = serde_json::from_slice(bytes).map_err(MapDataError::Json)?;
        Self::from_raw(raw)
    }

    pub fn from_json_str(payload: &str) -> Result<Self, MapDataError> {
        Self::from_json_slice(payload.as_bytes())
    }

    fn from_raw(raw: RawResponse) -> Result<Self, MapDataError> {
        let Some(Value::Array(elements)) = raw.elements else {
            return Err(MapDataError::MissingElements);
        };

        let mut nodes = HashMap::new();
        let mut features = Vec::new();
        let mut malformed = 0;
        for (position, element) in elements.into_iter().enumerate() {
            let element = match serde_json::from_value::<RawElement>(element) {
                Ok(element) => element,
                Err(err) => {
                    debug!(position, error = %err, "skipping malformed element");
                    malformed += 1;
                    continue;
                }
            };
            match element {
                RawElement::Node { id, lat, lon } => {
                    nodes.insert(id, GeoPoint::new(lat, lon));
                }
                RawElement::Way { id, nodes: refs, tags } => features.push(MapFeature {
                    id,
                    kind: ElementKind::Way,
                    node_refs: refs,
                    tags,
                }),
                RawElement::Relation { id, tags } => features.push(MapFeature {
                    id,
                    kind: ElementKind::Relation,
                    node_refs: Vec::new(),
                    tags,
                }),
                RawElement::Other => {}
            }
        }

        Ok(Self {
            nodes,
            features,
            malformed,
            remark: raw.remark,
        })
    }

    pub fn features(&self) -> &[MapFeature] {
        &self.features
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Elements skipped because they did not decode as their declared type.
    pub fn malformed_elements(&self) -> usize {
        self.malformed
    }

    /// Server-side note, e.g. a runtime error that truncated the result.
    pub fn remark(&self) -> Option<&str> {
        self.remark.as_deref()
    }

    pub fn node(&self, id: i64) -> Option<GeoPoint> {
        self.nodes.get(&id).copied()
    }

    /// Coordinates of a feature's nodes in order.
    ///
    /// Unknown node ids are dropped and consecutive repeats collapsed. A closed
    /// way keeps its closing point.
    pub fn resolve_points(&self, feature: &MapFeature) -> Vec<GeoPoint> {
        let mut points: Vec<GeoPoint> = Vec::with_capacity(feature.node_refs.len());
        for p in feature.node_refs.iter().filter_map(|&id| self.node(id)) {
            if points.last() != Some(&p) {
                points.push(p);
            }
        }
        points
    }
}
