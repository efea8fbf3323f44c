//! Overpass QL query for the features a plate is built from.

use foundation::math::BoundingBox;
use layers::{GREEN_LANDUSE, ROAD_CLASSES, SAND_NATURAL};

/// Overpass bbox filter: `south,west,north,east`.
pub fn overpass_bbox(bbox: &BoundingBox) -> String {
    format!(
        "{:.7},{:.7},{:.7},{:.7}",
        bbox.south, bbox.west, bbox.north, bbox.east
    )
}

fn one_of(values: &[&str]) -> String {
    format!("^({})$", values.join("|"))
}

/// Select buildings, roads, water, green areas, sand and building relations
/// inside `bbox`, then recurse down to their nodes so ways can be resolved.
pub fn build_query(bbox: &BoundingBox, server_timeout_secs: u32) -> String {
    let b = overpass_bbox(bbox);
    let roads = one_of(&ROAD_CLASSES);
    let green = one_of(&GREEN_LANDUSE);
    let sand = one_of(&SAND_NATURAL);

    format!(
        "[out:json][timeout:{server_timeout_secs}];\n\
         (\n\
         \x20 way[\"building\"]({b});\n\
         \x20 way[\"highway\"~\"{roads}\"]({b});\n\
         \x20 way[\"natural\"=\"water\"]({b});\n\
         \x20 way[\"landuse\"~\"{green}\"]({b});\n\
         \x20 way[\"natural\"~\"{sand}\"]({b});\n\
         \x20 relation[\"building\"]({b});\n\
         );\n\
         (._;>;);\n\
         out body;\n"
    )
}
