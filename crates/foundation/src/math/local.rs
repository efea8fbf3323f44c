use super::{GeoPoint, METERS_PER_DEGREE, Vec2, capture_radius_km, validate_area_km2};
use crate::error::InputError;

/// Maps geographic points onto the plate's local planar frame.
///
/// The frame is centered on the capture center, in plate millimetres.
/// `x` grows east; `y` is the negated north offset, which is the layout the
/// model codec expects before it swaps into its up-axis convention.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlateProjector {
    center: GeoPoint,
    cos_center_lat: f64,
    /// Plate millimetres per real-world meter.
    scale: f64,
}

impl PlateProjector {
    pub fn new(center: GeoPoint, area_km2: f64, plate_size_mm: f64) -> Result<Self, InputError> {
        let area_km2 = validate_area_km2(area_km2)?;
        let radius_m = capture_radius_km(area_km2) * 1000.0;
        Ok(Self {
            center,
            cos_center_lat: center.lat_deg.to_radians().cos(),
            scale: plate_size_mm / (2.0 * radius_m),
        })
    }

    pub fn center(&self) -> GeoPoint {
        self.center
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn project(&self, p: GeoPoint) -> Vec2 {
        let lat_offset_m = (p.lat_deg - self.center.lat_deg) * METERS_PER_DEGREE;
        let lon_offset_m = (p.lon_deg - self.center.lon_deg) * METERS_PER_DEGREE * self.cos_center_lat;
        Vec2::new(lon_offset_m * self.scale, -lat_offset_m * self.scale)
    }

    pub fn project_ring(&self, ring: &[GeoPoint]) -> Vec<Vec2> {
        ring.iter().map(|&p| self.project(p)).collect()
    }
}
