use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

const SEED_MULTIPLIER: u64 = 9301;
const SEED_INCREMENT: u64 = 49297;
const SEED_MODULUS: u64 = 233280;

/// Colour in HSL space; hue in degrees, saturation and lightness in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HslColor {
    /// Hue in `[0, 360)`.
    pub hue: u16,
    /// Saturation in `[0, 100]`.
    pub saturation: u8,
    /// Lightness in `[0, 100]`.
    pub lightness: u8,
}

impl HslColor {
    /// Hash an app id into a colour.
    ///
    /// A linear congruential step picks the hue; saturation stays in
    /// `70..90` and lightness in `45..55` so every node reads on a dark scene.
    pub fn from_app_id(app_id: u32) -> Self {
        let id = u64::from(app_id);
        let seed = (id * SEED_MULTIPLIER + SEED_INCREMENT) % SEED_MODULUS;
        let hue = (seed as f64 / SEED_MODULUS as f64 * 360.0).floor() as u16;
        Self {
            hue,
            saturation: 70 + (id % 20) as u8,
            lightness: 45 + (id % 10) as u8,
        }
    }

    /// Parse a token in the `hsl(H, S%, L%)` form produced by [`fmt::Display`].
    pub fn parse(token: &str) -> Option<Self> {
        static HSL_RE: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"^\s*hsl\(\s*(\d{1,3})\s*,\s*(\d{1,3})%\s*,\s*(\d{1,3})%\s*\)\s*$")
                .expect("invalid hsl regex")
        });

        let caps = HSL_RE.captures(token)?;
        let hue = caps.get(1)?.as_str().parse::<u16>().ok()?;
        let saturation = caps.get(2)?.as_str().parse::<u8>().ok()?;
        let lightness = caps.get(3)?.as_str().parse::<u8>().ok()?;
        if hue >= 360 || saturation > 100 || lightness > 100 {
            return None;
        }
        Some(Self {
            hue,
            saturation,
            lightness,
        })
    }

    /// Convert to 8-bit RGB for terminals and image exports.
    pub fn to_rgb(self) -> (u8, u8, u8) {
        let s = f64::from(self.saturation) / 100.0;
        let l = f64::from(self.lightness) / 100.0;
        let h = f64::from(self.hue) / 60.0;

        let chroma = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
        let (r, g, b) = match h as u8 {
            0 => (chroma, x, 0.0),
            1 => (x, chroma, 0.0),
            2 => (0.0, chroma, x),
            3 => (0.0, x, chroma),
            4 => (x, 0.0, chroma),
            _ => (chroma, 0.0, x),
        };
        let m = l - chroma / 2.0;
        let channel = |value: f64| ((value + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        (channel(r), channel(g), channel(b))
    }
}

impl fmt::Display for HslColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hsl({}, {}%, {}%)",
            self.hue, self.saturation, self.lightness
        )
    }
}

/// Colour token for a game; the same id always yields the same string.
pub fn color_from_app_id(app_id: u32) -> String {
    HslColor::from_app_id(app_id).to_string()
}
