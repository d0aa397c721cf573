//! Mark tile generation for tiled watermarks.
//!
//! A mark tile is the watermark text rendered once, cropped to its visible
//! pixels, optionally rescaled in height, with its alpha pre-multiplied by
//! the configured opacity. It is built once per configuration and stamped
//! repeatedly by the tile compositor.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::blending::scale_opacity;
use crate::error::{Error, Result};
use crate::font::Font;

/// Rendering parameters for a mark tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkStyle {
    /// Text color; its alpha is multiplied by glyph coverage.
    pub color: Rgba<u8>,
    /// Font size in pixels per em.
    pub font_size: u32,
    /// Height multiplier applied after cropping; `1.0` keeps the cropped height.
    pub height_crop: f64,
    /// Alpha multiplier in `[0, 1]`.
    pub opacity: f64,
}

/// A cropped, opacity-scaled watermark raster. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkTile(RgbaImage);

impl MarkTile {
    #[cfg(test)]
    pub(crate) fn from_raw(image: RgbaImage) -> Self {
        Self(image)
    }

    /// The tile pixels.
    #[must_use]
    pub fn image(&self) -> &RgbaImage {
        &self.0
    }

    /// Tile width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.0.width()
    }

    /// Tile height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.0.height()
    }
}

/// Build a mark tile for `text`.
///
/// Returns `Ok(None)` when the text renders no visible pixel at all (for
/// example a font without outlines for the given characters); callers should
/// treat that as "no visible watermark".
///
/// # Errors
///
/// Returns [`Error::Config`] for blank text, a zero font size, a height crop
/// that is not a positive finite number, or an opacity outside `[0, 1]`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn build_mark(font: &Font, text: &str, style: &MarkStyle) -> Result<Option<MarkTile>> {
    if text.trim().is_empty() {
        return Err(Error::config("mark text must not be empty"));
    }
    if style.font_size == 0 {
        return Err(Error::config("font size must be positive"));
    }
    if !(style.height_crop.is_finite() && style.height_crop > 0.0) {
        return Err(Error::config("font height crop must be a positive number"));
    }
    if !(0.0..=1.0).contains(&style.opacity) {
        return Err(Error::config("opacity must be between 0 and 1"));
    }

    let size = style.font_size;
    let glyphs = font.rasterize(text, size as f32);
    if glyphs.is_empty() {
        return Ok(None);
    }

    // Canvas spans the exact ink box, so bearings and accents are never clipped
    let (ink_w, ink_h) = glyphs.ink_size();
    let (left, top) = glyphs.offset();
    let mut canvas = RgbaImage::new(ink_w, ink_h);
    glyphs.paint(
        &mut canvas,
        -i64::from(left),
        -i64::from(top),
        style.color,
    );

    let Some((x, y, w, h)) = tight_alpha_bounds(&canvas) else {
        return Ok(None);
    };
    let mut mark = imageops::crop_imm(&canvas, x, y, w, h).to_image();

    if (style.height_crop - 1.0).abs() > f64::EPSILON {
        let new_h = ((f64::from(size) * style.height_crop).round() as u32).max(1);
        mark = imageops::resize(&mark, mark.width(), new_h, FilterType::Lanczos3);
    }

    Ok(Some(MarkTile(scale_opacity(&mark, style.opacity)?)))
}

/// Tight bounding box `(x, y, width, height)` of all pixels with non-zero
/// alpha, or `None` if the image is fully transparent.
#[must_use]
pub fn tight_alpha_bounds(image: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, px) in image.enumerate_pixels() {
        if px[3] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }
    bounds.map(|(x0, y0, x1, y1)| (x0, y0, x1 - x0 + 1, y1 - y0 + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(opacity: f64) -> MarkStyle {
        MarkStyle {
            color: Rgba([0x4d, 0xb6, 0xac, 255]),
            font_size: 48,
            height_crop: 1.0,
            opacity,
        }
    }

    fn build(text: &str, style: &MarkStyle) -> Result<Option<MarkTile>> {
        build_mark(&Font::bundled().unwrap(), text, style)
    }

    #[test]
    fn tight_bounds_of_single_block() {
        let mut img = RgbaImage::new(10, 8);
        img.put_pixel(2, 3, Rgba([0, 0, 0, 1]));
        img.put_pixel(6, 5, Rgba([0, 0, 0, 255]));
        assert_eq!(tight_alpha_bounds(&img), Some((2, 3, 5, 3)));
        assert_eq!(tight_alpha_bounds(&RgbaImage::new(3, 3)), None);
    }

    #[test]
    fn mark_edges_all_contain_visible_pixels() {
        let tile = build("CONFIDENTIAL", &style(1.0)).unwrap().unwrap();
        let img = tile.image();
        let (w, h) = img.dimensions();

        assert!((0..w).any(|x| img.get_pixel(x, 0)[3] > 0), "top row empty");
        assert!((0..w).any(|x| img.get_pixel(x, h - 1)[3] > 0), "bottom row empty");
        assert!((0..h).any(|y| img.get_pixel(0, y)[3] > 0), "left column empty");
        assert!((0..h).any(|y| img.get_pixel(w - 1, y)[3] > 0), "right column empty");
    }

    #[test]
    fn mark_keeps_ink_beyond_line_origin() {
        // "J" overhangs the origin on the left, "Ǻ" rises above the ascent
        let font = Font::bundled().unwrap();
        for text in ["Jump", "\u{01FA}BC", "\u{2031}\u{2031}\u{2031}\u{2031}\u{2031}"] {
            let ink = font.rasterize(text, 48.0).ink_size();
            let tile = build_mark(&font, text, &style(1.0)).unwrap().unwrap();
            assert_eq!((tile.width(), tile.height()), ink, "{text:?}");
        }
    }

    #[test]
    fn mark_pixels_keep_requested_color() {
        let tile = build("Mark", &style(1.0)).unwrap().unwrap();
        for px in tile.image().pixels().filter(|p| p[3] > 0) {
            assert_eq!([px[0], px[1], px[2]], [0x4d, 0xb6, 0xac]);
        }
    }

    #[test]
    fn opacity_scales_alpha_once_with_rounding() {
        let full = build("Mark", &style(1.0)).unwrap().unwrap();
        let faded = build("Mark", &style(0.3)).unwrap().unwrap();
        assert_eq!(full.image().dimensions(), faded.image().dimensions());

        for (a, b) in full.image().pixels().zip(faded.image().pixels()) {
            let expected = (f64::from(a[3]) * 0.3).round();
            assert!((f64::from(b[3]) - expected).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn height_crop_rescales_height_only() {
        let plain = build("Mark", &style(1.0)).unwrap().unwrap();
        let cropped = build(
            "Mark",
            &MarkStyle {
                height_crop: 0.5,
                ..style(1.0)
            },
        )
        .unwrap()
        .unwrap();
        assert_eq!(cropped.height(), 24);
        assert_eq!(cropped.width(), plain.width());
    }

    #[test]
    fn blank_text_is_a_configuration_error() {
        assert!(matches!(build("", &style(0.5)), Err(Error::Config(_))));
        assert!(matches!(build("  \t", &style(0.5)), Err(Error::Config(_))));
    }

    #[test]
    fn invisible_glyphs_yield_empty_mark() {
        // Zero-width space: not whitespace, but has no outline
        assert_eq!(build("\u{200B}", &style(0.5)).unwrap(), None);
    }

    #[test]
    fn invalid_style_is_rejected() {
        assert!(build("Mark", &style(1.5)).is_err());
        assert!(build("Mark", &style(-0.1)).is_err());
        for crop in [0.0, -1.0, f64::NAN] {
            let s = MarkStyle {
                height_crop: crop,
                ..style(0.5)
            };
            assert!(matches!(build("Mark", &s), Err(Error::Config(_))));
        }
        let s = MarkStyle {
            font_size: 0,
            ..style(0.5)
        };
        assert!(build("Mark", &s).is_err());
    }
}
