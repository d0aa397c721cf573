//! Watermark configuration.
//!
//! Callers fill in only the fields they want to override; everything else
//! takes a default. Options are validated and resolved once, before any
//! image is touched.

use std::path::PathBuf;

use image::Rgba;

use crate::color::{parse_hex_color, WHITE};
use crate::diagnostics::{Diagnostics, Event};
use crate::error::{Error, Result};
use crate::mark::MarkStyle;
use crate::position::{Anchor, PositionStyle};

/// Default tile color.
pub const DEFAULT_COLOR: &str = "#4db6ac";
/// Default gap between tiles, in pixels.
pub const DEFAULT_SPACING: i32 = 75;
/// Default tiling rotation, in degrees.
pub const DEFAULT_ANGLE: i32 = 30;
/// Default opacity for both modes.
pub const DEFAULT_OPACITY: f64 = 0.5;
/// Default tile font size, in pixels per em.
pub const DEFAULT_FONT_SIZE: u32 = 48;
/// Default tile height crop factor (no rescale).
pub const DEFAULT_HEIGHT_CROP: f64 = 1.0;
/// Default anchored margin, as a fraction of each dimension.
pub const DEFAULT_MARGIN_RATIO: f64 = 0.04;

/// Overrides for tiled ("repeat") mode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepeatOptions {
    /// Hex tile color.
    pub color: Option<String>,
    /// Gap between tiles in pixels; may be negative.
    pub spacing: Option<i32>,
    /// Rotation in degrees, counter-clockwise.
    pub angle: Option<i32>,
    /// Opacity in `[0, 1]`.
    pub opacity: Option<f64>,
    /// Font file. Required: repeat mode has no font fallback.
    pub font_path: Option<PathBuf>,
    /// Font size in pixels per em.
    pub font_size: Option<u32>,
    /// Height multiplier applied to the cropped tile.
    pub height_crop: Option<f64>,
}

/// Fully resolved tiled-mode settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RepeatSettings {
    /// How the mark tile is rendered.
    pub mark: MarkStyle,
    /// Gap between tiles in pixels.
    pub spacing: i32,
    /// Rotation in degrees.
    pub angle: i32,
    /// Font file.
    pub font_path: PathBuf,
}

impl RepeatOptions {
    /// Apply defaults and validate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a missing font path, an unparseable
    /// color, an opacity outside `[0, 1]`, a zero font size or a height crop
    /// that is not a positive number.
    pub fn resolve(&self) -> Result<RepeatSettings> {
        let font_path = self
            .font_path
            .clone()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| Error::config("repeat mode requires a font path"))?;

        let color = parse_hex_color(self.color.as_deref().unwrap_or(DEFAULT_COLOR))?;
        let opacity = validate_opacity(self.opacity.unwrap_or(DEFAULT_OPACITY))?;

        let font_size = self.font_size.unwrap_or(DEFAULT_FONT_SIZE);
        if font_size == 0 {
            return Err(Error::config("font size must be positive"));
        }

        let height_crop = self.height_crop.unwrap_or(DEFAULT_HEIGHT_CROP);
        if !(height_crop.is_finite() && height_crop > 0.0) {
            return Err(Error::config(format!(
                "font height crop must be a positive number, got {height_crop}"
            )));
        }

        Ok(RepeatSettings {
            mark: MarkStyle {
                color,
                font_size,
                height_crop,
                opacity,
            },
            spacing: self.spacing.unwrap_or(DEFAULT_SPACING),
            angle: self.angle.unwrap_or(DEFAULT_ANGLE),
            font_path,
        })
    }
}

/// Overrides for anchored ("position") mode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionOptions {
    /// Opacity in `[0, 1]`.
    pub opacity: Option<f64>,
    /// Anchor name; unknown names fall back to bottom-right.
    pub anchor: Option<String>,
    /// Preferred font file; falls back to system and bundled fonts.
    pub font_path: Option<PathBuf>,
    /// Margin as a fraction of each dimension, in `[0, 1)`. Anything else is
    /// rejected by [`PositionOptions::resolve`].
    pub margin_ratio: Option<f64>,
    /// Background used when saving to a format without alpha.
    pub jpeg_background: Option<Rgba<u8>>,
}

/// Fully resolved anchored-mode settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionSettings {
    /// Placement parameters.
    pub style: PositionStyle,
    /// Preferred font file, if any.
    pub font_path: Option<PathBuf>,
    /// Background used when saving to a format without alpha.
    pub jpeg_background: Rgba<u8>,
}

impl PositionOptions {
    /// Apply defaults and validate.
    ///
    /// An unrecognized anchor is not an error: bottom-right is used and
    /// [`Event::UnknownAnchor`] is reported.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an opacity outside `[0, 1]` or a margin
    /// ratio outside `[0, 1)`.
    pub fn resolve(&self, diagnostics: &dyn Diagnostics) -> Result<PositionSettings> {
        let opacity = validate_opacity(self.opacity.unwrap_or(DEFAULT_OPACITY))?;

        let margin_ratio = self.margin_ratio.unwrap_or(DEFAULT_MARGIN_RATIO);
        if !(0.0..1.0).contains(&margin_ratio) {
            return Err(Error::config(format!(
                "margin ratio must be in [0, 1), got {margin_ratio}"
            )));
        }

        let anchor = match self.anchor.as_deref().filter(|a| !a.trim().is_empty()) {
            None => Anchor::default(),
            Some(name) => Anchor::from_name(name).unwrap_or_else(|| {
                diagnostics.report(Event::UnknownAnchor(name.to_string()));
                Anchor::default()
            }),
        };

        Ok(PositionSettings {
            style: PositionStyle {
                opacity,
                anchor,
                margin_ratio,
            },
            font_path: self.font_path.clone().filter(|p| !p.as_os_str().is_empty()),
            jpeg_background: self.jpeg_background.unwrap_or(WHITE),
        })
    }
}

/// Mode-specific options.
#[derive(Debug, Clone, PartialEq)]
pub enum ModeOptions {
    /// Tiled, rotated repetition over the whole image.
    Repeat(RepeatOptions),
    /// A single instance at an anchor.
    Position(PositionOptions),
}

/// A complete watermark request.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkConfig {
    /// The watermark text.
    pub text: String,
    /// Mode and its options.
    pub mode: ModeOptions,
}

fn validate_opacity(opacity: f64) -> Result<f64> {
    if (0.0..=1.0).contains(&opacity) {
        Ok(opacity)
    } else {
        Err(Error::config(format!(
            "opacity must be between 0 and 1, got {opacity}"
        )))
    }
}
