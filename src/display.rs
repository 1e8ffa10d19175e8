use serde::Serialize;

use crate::models::{MAX_RATING, MIN_RATING};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Orange,
    Gray,
    Teal,
    Green,
}

impl Color {
    pub fn hex(self) -> &'static str {
        match self {
            Color::Red => "#e5484d",
            Color::Orange => "#f76b15",
            Color::Gray => "#8b8d98",
            Color::Teal => "#12a594",
            Color::Green => "#30a46c",
        }
    }
}

/// A point on the five-step mood scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Mood {
    pub level: i32,
    pub glyph: &'static str,
    pub color: Color,
}

impl Mood {
    /// Rounds half away from zero, then clamps onto the scale.
    pub fn from_average(average: f64) -> Self {
        let level = if average.is_nan() {
            0
        } else {
            (average.round() as i32).clamp(MIN_RATING, MAX_RATING)
        };
        Self::from_level(level)
    }

    pub fn from_level(level: i32) -> Self {
        let (level, glyph, color) = match level {
            i32::MIN..=-2 => (-2, "😞", Color::Red),
            -1 => (-1, "🙁", Color::Orange),
            0 => (0, "😐", Color::Gray),
            1 => (1, "🙂", Color::Teal),
            _ => (2, "😄", Color::Green),
        };
        Self {
            level,
            glyph,
            color,
        }
    }
}

pub fn format_average(average: f64) -> String {
    format!("{average:.1}")
}
