use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// RGBA color with 8-bit channels. Alpha 0 marks the "no paint" brush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[repr(C)]
#[ts(export)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
    pub const TRANSPARENT: Color = Color { r: 0, g: 0, b: 0, a: 0 };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create from unit-range float channels (0.0-1.0). Out-of-range values clamp.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_unit(r: f32, g: f32, b: f32, a: f32) -> Self {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::rgba(q(r), q(g), q(b), q(a))
    }

    /// Tolerant equality: every channel differs by less than 1% of full scale.
    ///
    /// `|a - b| / 255 < 0.01` is evaluated in integers as `100 * |a - b| < 255`.
    pub fn approx_eq(self, other: Self) -> bool {
        let close = |a: u8, b: u8| u16::from(a.abs_diff(b)) * 100 < 255;
        close(self.r, other.r) && close(self.g, other.g) && close(self.b, other.b) && close(self.a, other.a)
    }

    /// `#rrggbbaa`, lowercase.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }

    /// Parse `#rrggbb` or `#rrggbbaa`. The leading `#` is optional.
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| hex.get(i..i + 2).and_then(|c| u8::from_str_radix(c, 16).ok());
        match hex.len() {
            6 => Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Self::rgba(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn from_unit_rounds_to_nearest() {
        assert_eq!(Color::from_unit(1.0, 0.92, 0.016, 1.0), Color::rgb(255, 235, 4));
        assert_eq!(Color::from_unit(0.5, 0.5, 0.5, 1.0), Color::rgb(128, 128, 128));
        assert_eq!(Color::from_unit(0.0, 0.0, 0.0, 0.0), Color::TRANSPARENT);
    }

    #[test]
    fn from_unit_clamps() {
        assert_eq!(Color::from_unit(2.0, -1.0, 0.0, 1.0), Color::rgb(255, 0, 0));
    }

    #[test]
    fn approx_eq_tolerates_two_steps() {
        let base = Color::rgb(100, 100, 100);
        assert!(base.approx_eq(Color::rgb(102, 98, 100)));
        assert!(!base.approx_eq(Color::rgb(103, 100, 100)));
        assert!(!base.approx_eq(Color::rgba(100, 100, 100, 250)));
    }

    #[test]
    fn transparent_is_not_black() {
        assert!(!Color::TRANSPARENT.approx_eq(Color::BLACK));
        assert_ne!(Color::TRANSPARENT, Color::BLACK);
    }

    #[test]
    fn hex_forms() {
        assert_eq!(Color::rgb(255, 0, 16).to_hex(), "#ff0010ff");
        assert_eq!(Color::from_hex("#ff0010"), Some(Color::rgb(255, 0, 16)));
        assert_eq!(Color::from_hex("00000000"), Some(Color::TRANSPARENT));
        assert_eq!(Color::from_hex("#abc"), None);
        assert_eq!(Color::from_hex("#gg0000"), None);
    }

    #[test]
    fn default_is_white_background() {
        assert_eq!(Color::default(), Color::WHITE);
    }
}
