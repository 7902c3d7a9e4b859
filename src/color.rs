use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::error::ConfigError;

/// RGB color with 0..1 float channels, the form the shaders consume.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub const fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    /// Parses `#rrggbb` (leading `#` optional).
    pub fn from_hex(hex: &str) -> Result<Self, ConfigError> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(ConfigError::BadColor(hex.to_owned()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map(|v| f32::from(v) / 255.0)
                .map_err(|_| ConfigError::BadColor(hex.to_owned()))
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    /// Linear interpolation; `t` is clamped to [0, 1].
    pub fn lerp(self, other: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let s = 1.0 - t;
        Rgb::new(
            self.r * s + other.r * t,
            self.g * s + other.g * t,
            self.b * s + other.b * t,
        )
    }

    pub fn scale(self, k: f32) -> Rgb {
        Rgb::new(self.r * k, self.g * k, self.b * k)
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// `#rrggbb`, each channel rounded to the nearest byte.
    pub fn to_css_hex(self) -> String {
        let byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", byte(self.r), byte(self.g), byte(self.b))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css_hex())
    }
}

impl FromStr for Rgb {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rgb::from_hex(s)
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Rgb::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_theme_hex_values() {
        let sky = Rgb::from_hex("#38bdf8").unwrap();
        assert_eq!(sky.to_css_hex(), "#38bdf8");
        assert!(Rgb::from_hex("38BDF8").is_ok());
        assert!(Rgb::from_hex("#38bdf").is_err());
        assert!(Rgb::from_hex("#zzzzzz").is_err());
    }

    #[test]
    fn lerp_endpoints_are_exact() {
        let a = Rgb::from_hex("#020408").unwrap();
        let b = Rgb::from_hex("#050505").unwrap();
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 7.0), b);
    }
}
