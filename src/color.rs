use palette::{Hsl, IntoColor, Srgb, Srgba};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Colormaps: scalar in [0, 1] → colour
// ---------------------------------------------------------------------------

/// Monotonic colour ramps used to shade bands and heatmap cells.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Colormap {
    /// Black at 0, white at 1.
    #[default]
    Gray,
    /// White at 0, black at 1.
    Yarg,
    /// HSL lightness ramp at a fixed hue (degrees).
    Hue(f32),
}

impl Colormap {
    pub fn color(&self, value: f64) -> Srgb {
        let v = value.clamp(0.0, 1.0) as f32;
        match *self {
            Colormap::Gray => Srgb::new(v, v, v),
            Colormap::Yarg => Srgb::new(1.0 - v, 1.0 - v, 1.0 - v),
            Colormap::Hue(hue) => {
                let hsl = Hsl::new(hue, 0.75, 0.15 + 0.8 * v);
                hsl.into_color()
            }
        }
    }

    pub fn color_with_alpha(&self, value: f64, alpha: f64) -> Srgba {
        let rgb = self.color(value);
        Srgba::new(rgb.red, rgb.green, rgb.blue, alpha.clamp(0.0, 1.0) as f32)
    }

    /// Colour that stays visible on top of the innermost band.
    pub fn contrast(&self) -> Srgba {
        match self {
            Colormap::Gray => Srgba::new(1.0, 1.0, 1.0, 1.0),
            Colormap::Yarg | Colormap::Hue(_) => Srgba::new(0.0, 0.0, 0.0, 1.0),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Colormap::Gray => "Gray".to_string(),
            Colormap::Yarg => "Gray (reversed)".to_string(),
            Colormap::Hue(h) => format!("Hue {h:.0}°"),
        }
    }
}

/// Convert to 8-bit RGBA components for rendering backends.
pub fn to_rgba8(color: Srgba) -> [u8; 4] {
    let c: Srgba<u8> = color.into_format();
    [c.red, c.green, c.blue, c.alpha]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn luminance(c: Srgb) -> f32 {
        c.red + c.green + c.blue
    }

    #[test]
    fn gray_ramp_is_monotonic() {
        let cm = Colormap::Gray;
        let mut last = -1.0;
        for i in 0..=10 {
            let l = luminance(cm.color(i as f64 / 10.0));
            assert!(l > last);
            last = l;
        }
    }

    #[test]
    fn yarg_is_gray_reversed() {
        let gray = Colormap::Gray.color(0.3);
        let yarg = Colormap::Yarg.color(0.7);
        assert!((gray.red - yarg.red).abs() < 1e-6);
    }

    #[test]
    fn hue_ramp_brightens_with_value() {
        let cm = Colormap::Hue(210.0);
        assert!(luminance(cm.color(0.9)) > luminance(cm.color(0.1)));
    }

    #[test]
    fn alpha_is_clamped_and_converted() {
        let c = Colormap::Gray.color_with_alpha(1.0, 2.0);
        assert_eq!(to_rgba8(c), [255, 255, 255, 255]);
        let c = Colormap::Gray.color_with_alpha(0.0, 0.1);
        let alpha = to_rgba8(c)[3];
        assert!((25..=26).contains(&alpha));
    }

    #[test]
    fn serde_names() {
        let cm: Colormap = serde_json::from_str("\"yarg\"").unwrap();
        assert_eq!(cm, Colormap::Yarg);
        let cm: Colormap = serde_json::from_str("{\"hue\":120.0}").unwrap();
        assert_eq!(cm, Colormap::Hue(120.0));
    }
}
