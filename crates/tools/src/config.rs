//! Environment overrides for plate and provider configuration.
//!
//! Unset variables keep their defaults. Set but unparsable values also keep the
//! default and are reported with a warning.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use foundation::PlateConfig;
use streaming::FetchConfig;
use tracing::warn;

fn parsed<T: FromStr + Copy>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(key, value = raw.as_str(), "ignoring unparsable environment value");
            default
        }
    }
}

fn env_var_f64(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: f64) -> f64 {
    let v = parsed(lookup, key, default);
    if v.is_finite() {
        v
    } else {
        warn!(key, "ignoring non-finite environment value");
        default
    }
}

/// [`PlateConfig`] with `PLATE_*` overrides taken from `lookup`.
pub fn plate_config_with(lookup: impl Fn(&str) -> Option<String>) -> PlateConfig {
    let d = PlateConfig::default();
    PlateConfig {
        plate_size_mm: env_var_f64(&lookup, "PLATE_SIZE_MM", d.plate_size_mm),
        plate_thickness_mm: env_var_f64(&lookup, "PLATE_THICKNESS_MM", d.plate_thickness_mm),
        building_min_height_mm: env_var_f64(
            &lookup,
            "PLATE_BUILDING_MIN_HEIGHT_MM",
            d.building_min_height_mm,
        ),
        building_level_height_m: env_var_f64(
            &lookup,
            "PLATE_BUILDING_LEVEL_HEIGHT_M",
            d.building_level_height_m,
        ),
        height_scale_mm_per_m: env_var_f64(
            &lookup,
            "PLATE_HEIGHT_SCALE_MM_PER_M",
            d.height_scale_mm_per_m,
        ),
        road_height_mm: env_var_f64(&lookup, "PLATE_ROAD_HEIGHT_MM", d.road_height_mm),
        road_width_mm: env_var_f64(&lookup, "PLATE_ROAD_WIDTH_MM", d.road_width_mm),
        water_depth_mm: env_var_f64(&lookup, "PLATE_WATER_DEPTH_MM", d.water_depth_mm),
        grass_height_mm: env_var_f64(&lookup, "PLATE_GRASS_HEIGHT_MM", d.grass_height_mm),
        sand_height_mm: env_var_f64(&lookup, "PLATE_SAND_HEIGHT_MM", d.sand_height_mm),
        building_min_area_m2: env_var_f64(
            &lookup,
            "PLATE_BUILDING_MIN_AREA_M2",
            d.building_min_area_m2,
        ),
        water_min_area_m2: env_var_f64(&lookup, "PLATE_WATER_MIN_AREA_M2", d.water_min_area_m2),
        edge_epsilon_mm: env_var_f64(&lookup, "PLATE_EDGE_EPSILON_MM", d.edge_epsilon_mm),
        default_area_km2: env_var_f64(&lookup, "PLATE_DEFAULT_AREA_KM2", d.default_area_km2),
    }
}

pub fn plate_config_from_env() -> PlateConfig {
    plate_config_with(|key| env::var(key).ok())
}

/// [`FetchConfig`] with `PLATE_PROVIDERS` (comma separated) and
/// `PLATE_FETCH_TIMEOUT_SECS` overrides.
pub fn fetch_config_with(lookup: impl Fn(&str) -> Option<String>) -> FetchConfig {
    let d = FetchConfig::default();

    let endpoints = lookup("PLATE_PROVIDERS")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|list| !list.is_empty())
        .unwrap_or(d.endpoints);

    let timeout_secs: u64 = parsed(&lookup, "PLATE_FETCH_TIMEOUT_SECS", d.attempt_timeout.as_secs());
    let timeout_secs = timeout_secs.max(1);

    FetchConfig {
        endpoints,
        attempt_timeout: Duration::from_secs(timeout_secs),
        server_timeout_secs: u32::try_from(timeout_secs).unwrap_or(u32::MAX),
    }
}

pub fn fetch_config_from_env() -> FetchConfig {
    fetch_config_with(|key| env::var(key).ok())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::{fetch_config_with, plate_config_with};
    use foundation::PlateConfig;
    use pretty_assertions::assert_eq;
    use streaming::FetchConfig;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_keeps_defaults() {
        assert_eq!(plate_config_with(vars(&[])), PlateConfig::default());
        assert_eq!(fetch_config_with(vars(&[])), FetchConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = plate_config_with(vars(&[
            ("PLATE_SIZE_MM", "150"),
            ("PLATE_ROAD_HEIGHT_MM", " 0.8 "),
        ]));
        assert_eq!(cfg.plate_size_mm, 150.0);
        assert_eq!(cfg.road_height_mm, 0.8);
        assert_eq!(cfg.plate_thickness_mm, PlateConfig::DEFAULT.plate_thickness_mm);
    }

    #[test]
    fn unparsable_values_fall_back() {
        let cfg = plate_config_with(vars(&[
            ("PLATE_SIZE_MM", "large"),
            ("PLATE_THICKNESS_MM", "NaN"),
        ]));
        assert_eq!(cfg.plate_size_mm, 200.0);
        assert_eq!(cfg.plate_thickness_mm, 5.0);
    }

    #[test]
    fn provider_list_and_timeout() {
        let cfg = fetch_config_with(vars(&[
            ("PLATE_PROVIDERS", "http://a/api, ,http://b/api"),
            ("PLATE_FETCH_TIMEOUT_SECS", "40"),
        ]));
        assert_eq!(cfg.endpoints, vec!["http://a/api", "http://b/api"]);
        assert_eq!(cfg.attempt_timeout, Duration::from_secs(40));
        assert_eq!(cfg.server_timeout_secs, 40);

        let cfg = fetch_config_with(vars(&[("PLATE_PROVIDERS", " , ")]));
        assert_eq!(cfg.endpoints, FetchConfig::default().endpoints);
    }
}
