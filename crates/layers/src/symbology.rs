use scene::Rgba;

use crate::classify::Category;

pub const PLATE_COLOR_HEX: &str = "#2B2B2B";

const BUILDING_HEX: &str = "#D9D4CC";
const ROAD_HEX: &str = "#4A4A4A";
const WATER_HEX: &str = "#3A7BD5";
const GREEN_HEX: &str = "#6DBE45";
const SAND_HEX: &str = "#E8D8A0";
const FALLBACK: Rgba = [1.0, 1.0, 1.0, 1.0];

/// Parse `#RRGGBB` (leading `#` optional) into an opaque colour.
pub fn parse_hex_color(hex: &str) -> Option<Rgba> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |i: usize| {
        u8::from_str_radix(&digits[i..i + 2], 16)
            .ok()
            .map(|v| v as f32 / 255.0)
    };
    Some([channel(0)?, channel(2)?, channel(4)?, 1.0])
}

pub fn plate_color() -> Rgba {
    parse_hex_color(PLATE_COLOR_HEX).unwrap_or(FALLBACK)
}

pub fn category_color(category: Category) -> Rgba {
    let hex = match category {
        Category::Building => BUILDING_HEX,
        Category::Road => ROAD_HEX,
        Category::Water => WATER_HEX,
        Category::Green => GREEN_HEX,
        Category::Sand => SAND_HEX,
        Category::Unclassified => return FALLBACK,
    };
    parse_hex_color(hex).unwrap_or(FALLBACK)
}

#[cfg(test)]
mod tests {
    use super::{category_color, parse_hex_color, plate_color};
    use crate::classify::Category;

    #[test]
    fn parses_hex_colors() {
        assert_eq!(parse_hex_color("#FF0000"), Some([1.0, 0.0, 0.0, 1.0]));
        assert_eq!(parse_hex_color("00ff00"), Some([0.0, 1.0, 0.0, 1.0]));
        assert_eq!(parse_hex_color("#12345"), None);
        assert_eq!(parse_hex_color("#GG0000"), None);
        assert_eq!(parse_hex_color("#ÄÄÄ"), None);
    }

    #[test]
    fn plate_is_dark_grey() {
        let c = plate_color();
        assert_eq!(c[0], 0x2B as f32 / 255.0);
        assert_eq!(c[0], c[1]);
        assert_eq!(c[1], c[2]);
    }

    #[test]
    fn categories_have_distinct_colors() {
        let colors: Vec<_> = [
            Category::Building,
            Category::Road,
            Category::Water,
            Category::Green,
            Category::Sand,
        ]
        .into_iter()
        .map(category_color)
        .collect();
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
