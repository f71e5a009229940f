use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Mix, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

fn to_color32(rgb: Srgb) -> Color32 {
    Color32::from_rgb(
        (rgb.red.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.green.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.blue.clamp(0.0, 1.0) * 255.0) as u8,
    )
}

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            to_color32(rgb)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: category label → Color32
// ---------------------------------------------------------------------------

/// Maps category labels (counties, bedroom columns) to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorMap {
    /// Build a colour map from the given labels, in order.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        let palette = generate_palette(labels.len());
        ColorMap {
            mapping: labels.into_iter().zip(palette).collect(),
            default_color: Color32::LIGHT_BLUE,
        }
    }

    /// Look up the colour for a label.
    pub fn color_for(&self, label: &str) -> Color32 {
        self.mapping
            .get(label)
            .copied()
            .unwrap_or(self.default_color)
    }
}

// ---------------------------------------------------------------------------
// Sequential scale: value → Color32
// ---------------------------------------------------------------------------

/// Two-stop colour scale for map values.
#[derive(Debug, Clone, Copy)]
pub struct ValueScale {
    min: f64,
    max: f64,
}

impl ValueScale {
    pub fn new(min: f64, max: f64) -> Self {
        ValueScale { min, max }
    }

    /// Blend from cool blue (low) to warm red (high); grey when missing.
    pub fn color_for(&self, value: Option<f64>) -> Color32 {
        let Some(v) = value else {
            return Color32::GRAY;
        };
        let span = self.max - self.min;
        let t = if span.abs() < f64::EPSILON {
            0.5
        } else {
            ((v - self.min) / span).clamp(0.0, 1.0)
        };
        let low = Srgb::new(0.2_f32, 0.4, 0.9).into_linear();
        let high = Srgb::new(0.9_f32, 0.25, 0.2).into_linear();
        to_color32(Srgb::from_linear(low.mix(high, t as f32)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_distinct_colours() {
        let p = generate_palette(4);
        assert_eq!(p.len(), 4);
        assert_ne!(p[0], p[1]);
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn unknown_label_gets_default() {
        let map = ColorMap::new(["Kent", "Surrey"]);
        assert_ne!(map.color_for("Kent"), map.color_for("Surrey"));
        assert_eq!(map.color_for("Essex"), Color32::LIGHT_BLUE);
    }

    #[test]
    fn scale_ends_differ_and_missing_is_grey() {
        let scale = ValueScale::new(0.0, 10.0);
        assert_ne!(scale.color_for(Some(0.0)), scale.color_for(Some(10.0)));
        assert_eq!(scale.color_for(Some(-5.0)), scale.color_for(Some(0.0)));
        assert_eq!(scale.color_for(None), Color32::GRAY);
    }
}
