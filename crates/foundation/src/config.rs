//! Plate build configuration.
//!
//! Every dimension that ends up in the generated model is expressed in plate
//! millimetres. Real-world quantities (metres, m², km²) only appear where they
//! are compared against map data; the conversion into plate space happens in
//! exactly two places: the projector scale for horizontal coordinates and
//! `height_scale_mm_per_m` for building heights.

/// Numeric constants injected into every stage of the plate pipeline.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlateConfig {
    /// Edge length of the square base plate.
    pub plate_size_mm: f64,
    pub plate_thickness_mm: f64,

    /// Lower bound for any extruded building.
    pub building_min_height_mm: f64,
    /// Real-world height of one `building:levels` storey.
    pub building_level_height_m: f64,
    /// Vertical exaggeration: plate millimetres per real-world metre.
    pub height_scale_mm_per_m: f64,

    pub road_height_mm: f64,
    /// Ribbon width used when a road is an open polyline.
    pub road_width_mm: f64,
    pub water_depth_mm: f64,
    pub grass_height_mm: f64,
    pub sand_height_mm: f64,

    /// Buildings strictly below this footprint (real m²) are skipped.
    pub building_min_area_m2: f64,
    /// Water bodies strictly below this area (real m²) are skipped.
    pub water_min_area_m2: f64,

    /// Side walls shorter than this are not emitted.
    pub edge_epsilon_mm: f64,

    /// Capture area used when a request does not name one.
    pub default_area_km2: f64,
}

impl PlateConfig {
    pub const DEFAULT: Self = Self {
        plate_size_mm: 200.0,
        plate_thickness_mm: 5.0,
        building_min_height_mm: 2.0,
        building_level_height_m: 3.0,
        height_scale_mm_per_m: 0.5,
        road_height_mm: 0.6,
        road_width_mm: 1.2,
        water_depth_mm: 1.0,
        grass_height_mm: 0.4,
        sand_height_mm: 0.3,
        building_min_area_m2: 1.0,
        water_min_area_m2: 10.0,
        edge_epsilon_mm: 0.001,
        default_area_km2: 1.0,
    };

    /// Half the plate edge; features are placed within `[-half, half]`.
    pub fn half_size_mm(&self) -> f64 {
        self.plate_size_mm * 0.5
    }
}

impl Default for PlateConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
