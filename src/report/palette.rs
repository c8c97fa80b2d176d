//! Categorical series palette
//!
//! Colors repeat after exhausting the list.

/// Default categorical palette
pub const CATEGORICAL: [&str; 8] = [
    "#5470c6", "#91cc75", "#fac858", "#ee6666", "#73c0de", "#3ba272", "#fc8452", "#9a60b4",
];

/// Alpha suffix applied to boxplot fills (`#rrggbbaa`)
pub const BOX_FILL_ALPHA: &str = "30";

/// Color by index, wrapping around
pub fn color(index: usize) -> &'static str {
    CATEGORICAL[index % CATEGORICAL.len()]
}

/// Append a two-digit hex alpha to a `#rrggbb` color
///
/// Colors that are not plain `#rrggbb` are returned unchanged.
pub fn with_alpha(hex: &str, alpha: &str) -> String {
    if parse_hex_color(hex).is_some() {
        format!("{}{}", hex, alpha)
    } else {
        hex.to_string()
    }
}

/// Parse `#rrggbb` into RGB components
pub fn parse_hex_color(hex: &str) -> Option<[u8; 3]> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_wraps() {
        assert_eq!(color(0), "#5470c6");
        assert_eq!(color(8), "#5470c6");
        assert_eq!(color(11), "#ee6666");
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#5470c6"), Some([0x54, 0x70, 0xc6]));
        assert_eq!(parse_hex_color("5470c6"), None);
        assert_eq!(parse_hex_color("#zz0000"), None);
        assert_eq!(parse_hex_color("#fff"), None);
    }

    #[test]
    fn test_with_alpha() {
        assert_eq!(with_alpha("#91cc75", BOX_FILL_ALPHA), "#91cc7530");
        assert_eq!(with_alpha("red", BOX_FILL_ALPHA), "red");
    }
}
