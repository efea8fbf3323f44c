use crate::error::InputError;

/// Mean Earth radius used by the flat-Earth area approximation (meters).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
/// Meters per degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = 111_320.0;
/// Kilometers per degree of latitude.
pub const KM_PER_DEGREE: f64 = METERS_PER_DEGREE / 1000.0;

/// Geographic point in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeoPoint {
    pub lat_deg: f64,
    pub lon_deg: f64,
}

impl GeoPoint {
    pub fn new(lat_deg: f64, lon_deg: f64) -> Self {
        Self { lat_deg, lon_deg }
    }

    /// Build a point from request input, rejecting non-finite or out-of-range values.
    pub fn validated(lat_deg: f64, lon_deg: f64) -> Result<Self, InputError> {
        if !lat_deg.is_finite() || !(-90.0..=90.0).contains(&lat_deg) {
            return Err(InputError::InvalidLatitude(lat_deg));
        }
        if !lon_deg.is_finite() || !(-180.0..=180.0).contains(&lon_deg) {
            return Err(InputError::InvalidLongitude(lon_deg));
        }
        Ok(Self::new(lat_deg, lon_deg))
    }
}

/// Radius (km) of the circle whose area is `area_km2`.
///
/// Both the fetched bounding box and the plate projection scale derive from
/// this one function so that projected features line up with the queried area.
pub fn capture_radius_km(area_km2: f64) -> f64 {
    (area_km2 / std::f64::consts::PI).sqrt()
}

pub fn validate_area_km2(area_km2: f64) -> Result<f64, InputError> {
    if area_km2.is_finite() && area_km2 > 0.0 {
        Ok(area_km2)
    } else {
        Err(InputError::InvalidArea(area_km2))
    }
}

/// Geographic bounding box in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BoundingBox {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
}

impl BoundingBox {
    /// Box enclosing the capture circle around `center`.
    ///
    /// Near the poles the longitude delta blows up and the box degenerates;
    /// that case is not handled.
    pub fn around(center: GeoPoint, area_km2: f64) -> Result<Self, InputError> {
        let area_km2 = validate_area_km2(area_km2)?;
        let radius_km = capture_radius_km(area_km2);

        let lat_delta = radius_km / KM_PER_DEGREE;
        let lon_delta = radius_km / (KM_PER_DEGREE * center.lat_deg.to_radians().cos());

        Ok(Self {
            south: center.lat_deg - lat_delta,
            north: center.lat_deg + lat_delta,
            west: center.lon_deg - lon_delta,
            east: center.lon_deg + lon_delta,
        })
    }

    pub fn contains(&self, p: GeoPoint) -> bool {
        (self.south..=self.north).contains(&p.lat_deg) && (self.west..=self.east).contains(&p.lon_deg)
    }
}

#[cfg(test)]
mod tests {
    use super::{BoundingBox, GeoPoint, KM_PER_DEGREE, capture_radius_km};
    use crate::error::InputError;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn radius_of_pi_square_km_is_one_km() {
        assert_close(capture_radius_km(std::f64::consts::PI), 1.0, 1e-12);
    }

    #[test]
    fn bbox_at_equator_is_symmetric() {
        let bbox = BoundingBox::around(GeoPoint::new(0.0, 0.0), std::f64::consts::PI)
            .expect("bbox");
        let delta = 1.0 / KM_PER_DEGREE;
        assert_close(bbox.north, delta, 1e-12);
        assert_close(bbox.south, -delta, 1e-12);
        assert_close(bbox.east, delta, 1e-12);
        assert_close(bbox.west, -delta, 1e-12);
    }

    #[test]
    fn bbox_widens_in_longitude_away_from_equator() {
        let center = GeoPoint::new(60.0, 10.0);
        let bbox = BoundingBox::around(center, 1.0).expect("bbox");
        let lat_span = bbox.north - bbox.south;
        let lon_span = bbox.east - bbox.west;
        // cos(60°) = 0.5
        assert_close(lon_span, lat_span * 2.0, 1e-9);
        assert!(bbox.contains(center));
    }

    #[test]
    fn bbox_rejects_non_positive_area() {
        let center = GeoPoint::new(48.0, 11.0);
        assert_eq!(
            BoundingBox::around(center, 0.0),
            Err(InputError::InvalidArea(0.0))
        );
        assert!(BoundingBox::around(center, -2.0).is_err());
        assert!(BoundingBox::around(center, f64::NAN).is_err());
    }

    #[test]
    fn validated_rejects_out_of_range_coordinates() {
        assert_eq!(
            GeoPoint::validated(91.0, 0.0),
            Err(InputError::InvalidLatitude(91.0))
        );
        assert_eq!(
            GeoPoint::validated(0.0, 181.0),
            Err(InputError::InvalidLongitude(181.0))
        );
        assert!(GeoPoint::validated(f64::NAN, 0.0).is_err());
        assert_eq!(
            GeoPoint::validated(52.52, 13.405),
            Ok(GeoPoint::new(52.52, 13.405))
        );
    }
}
