use super::{EARTH_RADIUS_M, GeoPoint};

/// Approximate area of a geographic ring in m².
///
/// Shoelace sum over (lon, lat) in radians scaled by R². No latitude
/// correction is applied, so this is only meaningful as a size filter for
/// small rings near the capture center. The ring may be open or closed.
///
/// Radians rather than degrees keep the result in m², so the building and
/// water thresholds in `PlateConfig` can be stated in square metres.
pub fn ring_area_m2(ring: &[GeoPoint]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }

    // Relative to the first vertex to keep the products small.
    let origin = ring[0];
    let local = |p: GeoPoint| {
        (
            (p.lon_deg - origin.lon_deg).to_radians(),
            (p.lat_deg - origin.lat_deg).to_radians(),
        )
    };

    let mut sum = 0.0;
    for (i, &a) in ring.iter().enumerate() {
        let (ax, ay) = local(a);
        let (bx, by) = local(ring[(i + 1) % ring.len()]);
        sum += ax * by - bx * ay;
    }

    sum.abs() * EARTH_RADIUS_M * EARTH_RADIUS_M / 2.0
}
