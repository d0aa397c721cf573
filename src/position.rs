//! Single anchored watermark placement.
//!
//! The text is sized relative to the image, colored for contrast against the
//! brightness at the image center, and drawn once at one of five anchors with
//! a fainter outline in the opposite color.

use std::fmt;

use image::{Rgba, RgbaImage};

use crate::blending::same_rgb;
use crate::diagnostics::{Diagnostics, Event};
use crate::error::{Error, Result};
use crate::font::{Font, GlyphMask};

/// Smallest font size used for anchored text.
pub const MIN_FONT_SIZE: u32 = 16;

/// Outline alpha relative to fill alpha.
pub const OUTLINE_ALPHA_FACTOR: f64 = 0.6;

/// Outline thickness in pixels.
pub const OUTLINE_RADIUS: i64 = 2;

/// Mean red intensity above which the background counts as bright.
const BRIGHTNESS_THRESHOLD: f64 = 128.0;

/// Named placement position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Anchor {
    /// Bottom-right corner.
    #[default]
    BottomRight,
    /// Bottom-left corner.
    BottomLeft,
    /// Top-right corner.
    TopRight,
    /// Top-left corner.
    TopLeft,
    /// Image center.
    Center,
}

impl Anchor {
    /// All anchors.
    pub const ALL: [Self; 5] = [
        Self::BottomRight,
        Self::BottomLeft,
        Self::TopRight,
        Self::TopLeft,
        Self::Center,
    ];

    /// Kebab-case name, e.g. `"bottom-right"`.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::BottomRight => "bottom-right",
            Self::BottomLeft => "bottom-left",
            Self::TopRight => "top-right",
            Self::TopLeft => "top-left",
            Self::Center => "center",
        }
    }

    /// Look up an anchor by name, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|anchor| anchor.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Axis-aligned rectangle in image coordinates. `x`/`y` may be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementRect {
    /// Left edge.
    pub x: i64,
    /// Top edge.
    pub y: i64,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PlacementRect {
    /// Exclusive right edge.
    #[must_use]
    pub fn right(&self) -> i64 {
        self.x + i64::from(self.width)
    }

    /// Exclusive bottom edge.
    #[must_use]
    pub fn bottom(&self) -> i64 {
        self.y + i64::from(self.height)
    }

    /// Whether the rectangle lies entirely within a `width` x `height` image.
    #[must_use]
    pub fn is_within(&self, width: u32, height: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.right() <= i64::from(width)
            && self.bottom() <= i64::from(height)
    }

    /// Whether the two rectangles share at least one pixel.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Fill and outline colors for anchored text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// Text color.
    pub fill: Rgba<u8>,
    /// Outline color, fainter than the fill.
    pub outline: Rgba<u8>,
}

impl Palette {
    /// Pick colors that contrast with `brightness` (mean red, `0..=255`).
    ///
    /// Bright backgrounds get black text with a white outline, dark ones the
    /// reverse. Fill alpha is `round(255 * opacity)`, outline alpha
    /// `round(255 * opacity * 0.6)`, both clamped to `0..=255`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn for_brightness(brightness: f64, opacity: f64) -> Self {
        let alpha = |scale: f64| (255.0 * opacity * scale).round().clamp(0.0, 255.0) as u8;
        let fill_a = alpha(1.0);
        let outline_a = alpha(OUTLINE_ALPHA_FACTOR);

        if brightness > BRIGHTNESS_THRESHOLD {
            Self {
                fill: Rgba([0, 0, 0, fill_a]),
                outline: Rgba([255, 255, 255, outline_a]),
            }
        } else {
            Self {
                fill: Rgba([255, 255, 255, fill_a]),
                outline: Rgba([0, 0, 0, outline_a]),
            }
        }
    }
}

/// Parameters for anchored placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionStyle {
    /// Alpha multiplier in `[0, 1]`.
    pub opacity: f64,
    /// Where to place the text.
    pub anchor: Anchor,
    /// Margin as a fraction of each image dimension, in `[0, 1)`.
    pub margin_ratio: f64,
}

/// Font size for an image: `max(min(width, height) / 25, 16)`.
#[must_use]
pub fn font_size_for(width: u32, height: u32) -> u32 {
    (width.min(height) / 25).max(MIN_FONT_SIZE)
}

/// Text-sized rectangle centered on the image, clipped to its bounds.
///
/// Falls back to the whole image if the clipped rectangle is empty.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn sample_rect(width: u32, height: u32, text_w: u32, text_h: u32) -> PlacementRect {
    let (w, h) = (i64::from(width), i64::from(height));
    let (half_tw, half_th) = (i64::from(text_w / 2), i64::from(text_h / 2));

    let x0 = (w / 2 - half_tw).max(0);
    let y0 = (h / 2 - half_th).max(0);
    let x1 = (w / 2 + half_tw).min(w);
    let y1 = (h / 2 + half_th).min(h);

    if x0 >= x1 || y0 >= y1 {
        return PlacementRect {
            x: 0,
            y: 0,
            width,
            height,
        };
    }
    PlacementRect {
        x: x0,
        y: y0,
        width: (x1 - x0) as u32,
        height: (y1 - y0) as u32,
    }
}

/// Mean red channel over `rect` (clipped to the image), or 0 if empty.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn mean_red(image: &RgbaImage, rect: &PlacementRect) -> f64 {
    let x0 = rect.x.max(0) as u32;
    let y0 = rect.y.max(0) as u32;
    let x1 = rect.right().clamp(0, i64::from(image.width())) as u32;
    let y1 = rect.bottom().clamp(0, i64::from(image.height())) as u32;

    let mut sum = 0u64;
    let mut count = 0u64;
    for y in y0..y1 {
        for x in x0..x1 {
            sum += u64::from(image.get_pixel(x, y)[0]);
            count += 1;
        }
    }

    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

/// Rectangle for `text_w` x `text_h` text at `anchor`.
///
/// Corner anchors are inset by `round(width * margin_ratio)` horizontally and
/// `round(height * margin_ratio)` vertically; the center anchor ignores the
/// margin.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn placement(
    anchor: Anchor,
    width: u32,
    height: u32,
    text_w: u32,
    text_h: u32,
    margin_ratio: f64,
) -> PlacementRect {
    let (w, h) = (i64::from(width), i64::from(height));
    let (tw, th) = (i64::from(text_w), i64::from(text_h));
    let margin_w = (w as f64 * margin_ratio).round() as i64;
    let margin_h = (h as f64 * margin_ratio).round() as i64;

    let (x, y) = match anchor {
        Anchor::BottomRight => (w - tw - margin_w, h - th - margin_h),
        Anchor::BottomLeft => (margin_w, h - th - margin_h),
        Anchor::TopRight => (w - tw - margin_w, margin_h),
        Anchor::TopLeft => (margin_w, margin_h),
        Anchor::Center => ((w - tw) / 2, (h - th) / 2),
    };

    PlacementRect {
        x,
        y,
        width: text_w,
        height: text_h,
    }
}

/// Draw `glyphs` with their ink's top-left corner at `(x, y)`, outlined.
///
/// The outline is the text drawn in `palette.outline` at every offset within
/// `radius` pixels (except zero), then the fill is drawn on top.
pub fn draw_outlined_text(
    dst: &mut RgbaImage,
    glyphs: &GlyphMask,
    x: i64,
    y: i64,
    palette: &Palette,
    radius: i64,
) {
    let (left, top) = glyphs.offset();
    let origin_x = x - i64::from(left);
    let origin_y = y - i64::from(top);

    for dx in -radius..=radius {
        for dy in -radius..=radius {
            if dx == 0 && dy == 0 {
                continue;
            }
            glyphs.paint(dst, origin_x + dx, origin_y + dy, palette.outline);
        }
    }
    glyphs.paint(dst, origin_x, origin_y, palette.fill);
}

/// Draw `text` once onto a copy of `base` at `style.anchor`.
///
/// # Errors
///
/// Returns [`Error::Config`] for an out-of-range opacity or margin ratio and
/// [`Error::EmptyTextBounds`] if the text has no visible extent.
#[allow(clippy::cast_precision_loss)]
pub fn apply_positioned(
    base: &RgbaImage,
    text: &str,
    font: &Font,
    style: &PositionStyle,
    diagnostics: &dyn Diagnostics,
) -> Result<RgbaImage> {
    if !(0.0..=1.0).contains(&style.opacity) {
        return Err(Error::config("opacity must be between 0 and 1"));
    }
    if !(0.0..1.0).contains(&style.margin_ratio) {
        return Err(Error::config("margin ratio must be in [0, 1)"));
    }

    let (width, height) = base.dimensions();
    let size = font_size_for(width, height);

    let glyphs = font.rasterize(text, size as f32);
    if glyphs.is_empty() {
        return Err(Error::EmptyTextBounds);
    }
    let (text_w, text_h) = glyphs.ink_size();

    let sample = sample_rect(width, height, text_w, text_h);
    let palette = Palette::for_brightness(mean_red(base, &sample), style.opacity);
    let rect = placement(
        style.anchor,
        width,
        height,
        text_w,
        text_h,
        style.margin_ratio,
    );

    let mut out = base.clone();
    draw_outlined_text(&mut out, &glyphs, rect.x, rect.y, &palette, OUTLINE_RADIUS);

    if same_rgb(base, &out) {
        diagnostics.report(Event::InvisibleWatermark);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::EventLog;

    fn style(anchor: Anchor) -> PositionStyle {
        PositionStyle {
            opacity: 1.0,
            anchor,
            margin_ratio: 0.04,
        }
    }

    #[test]
    fn font_size_scales_with_image_and_has_floor() {
        assert_eq!(font_size_for(1000, 500), 20);
        assert_eq!(font_size_for(100, 100), MIN_FONT_SIZE);
        assert_eq!(font_size_for(2000, 3000), 80);
    }

    #[test]
    fn anchor_names_round_trip() {
        for anchor in Anchor::ALL {
            assert_eq!(Anchor::from_name(anchor.name()), Some(anchor));
        }
        assert_eq!(Anchor::from_name(" Top-Left "), Some(Anchor::TopLeft));
        assert_eq!(Anchor::from_name("middle"), None);
        assert_eq!(Anchor::default(), Anchor::BottomRight);
        assert_eq!(Anchor::Center.to_string(), "center");
    }

    #[test]
    fn sample_rect_is_centered_and_clipped() {
        assert_eq!(
            sample_rect(100, 100, 20, 10),
            PlacementRect { x: 40, y: 45, width: 20, height: 10 }
        );
        assert_eq!(
            sample_rect(10, 10, 40, 40),
            PlacementRect { x: 0, y: 0, width: 10, height: 10 }
        );
        // Degenerate text falls back to the whole image
        assert_eq!(
            sample_rect(30, 20, 1, 1),
            PlacementRect { x: 0, y: 0, width: 30, height: 20 }
        );
    }

    #[test]
    fn mean_red_averages_rect() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([0, 255, 255, 255]));
        img.put_pixel(0, 0, Rgba([100, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([200, 0, 0, 255]));
        let rect = PlacementRect { x: 0, y: 0, width: 2, height: 1 };
        assert!((mean_red(&img, &rect) - 150.0).abs() < 1e-9);

        let empty = PlacementRect { x: 10, y: 10, width: 2, height: 2 };
        assert!(mean_red(&img, &empty).abs() < f64::EPSILON);
    }

    #[test]
    fn bright_background_gets_dark_text() {
        let img = RgbaImage::from_pixel(50, 50, Rgba([200, 200, 200, 255]));
        let brightness = mean_red(&img, &sample_rect(50, 50, 20, 10));
        let palette = Palette::for_brightness(brightness, 1.0);
        assert_eq!(palette.fill, Rgba([0, 0, 0, 255]));
        assert_eq!(palette.outline, Rgba([255, 255, 255, 153]));
    }

    #[test]
    fn dark_background_gets_light_text() {
        let img = RgbaImage::from_pixel(50, 50, Rgba([50, 50, 50, 255]));
        let brightness = mean_red(&img, &sample_rect(50, 50, 20, 10));
        let palette = Palette::for_brightness(brightness, 1.0);
        assert_eq!(palette.fill, Rgba([255, 255, 255, 255]));
        assert_eq!(palette.outline, Rgba([0, 0, 0, 153]));

        // The threshold itself counts as dark
        assert_eq!(Palette::for_brightness(128.0, 1.0).fill[0], 255);
    }

    #[test]
    fn palette_alpha_follows_opacity() {
        let p = Palette::for_brightness(0.0, 0.2);
        assert_eq!(p.fill[3], 51);
        assert_eq!(p.outline[3], 31);
        assert_eq!(Palette::for_brightness(0.0, 0.0).fill[3], 0);
    }

    #[test]
    fn bottom_right_placement_uses_margins_from_each_dimension() {
        let rect = placement(Anchor::BottomRight, 1000, 500, 200, 30, 0.04);
        assert_eq!(rect.x, 1000 - 200 - 40);
        assert_eq!(rect.y, 500 - 30 - 20);
        assert_eq!((rect.width, rect.height), (200, 30));
    }

    #[test]
    fn center_placement_ignores_margin() {
        let rect = placement(Anchor::Center, 1000, 500, 200, 30, 0.3);
        assert_eq!((rect.x, rect.y), (400, 235));
    }

    #[test]
    fn corner_anchors_stay_inside_and_apart() {
        let (w, h, tw, th) = (1000, 500, 300, 100);
        for ratio in [0.0, 0.04, 0.25, 0.5] {
            let rect = |a| placement(a, w, h, tw, th, ratio);
            for anchor in [
                Anchor::BottomRight,
                Anchor::BottomLeft,
                Anchor::TopRight,
                Anchor::TopLeft,
            ] {
                assert!(rect(anchor).is_within(w, h), "{anchor} at {ratio}");
            }
            assert!(!rect(Anchor::TopLeft).overlaps(&rect(Anchor::BottomRight)));
            assert!(!rect(Anchor::TopRight).overlaps(&rect(Anchor::BottomLeft)));
        }
    }

    #[test]
    fn outlined_text_has_fill_and_outline_colors() {
        let font = Font::bundled().unwrap();
        let glyphs = font.rasterize("Hi", 40.0);
        let palette = Palette::for_brightness(200.0, 1.0);

        let mut canvas = RgbaImage::from_pixel(120, 80, Rgba([128, 128, 128, 255]));
        draw_outlined_text(&mut canvas, &glyphs, 10, 10, &palette, OUTLINE_RADIUS);

        assert!(canvas.pixels().any(|p| *p == Rgba([0, 0, 0, 255])));
        // Outline is lighter than the gray background
        assert!(canvas.pixels().any(|p| p[0] > 128));
    }

    #[test]
    fn apply_positioned_draws_inside_anchor_rect() {
        let font = Font::bundled().unwrap();
        let base = RgbaImage::from_pixel(400, 200, Rgba([30, 30, 30, 255]));
        let log = EventLog::new();

        let out = apply_positioned(&base, "Sample", &font, &style(Anchor::TopLeft), &log).unwrap();
        assert_eq!(out.dimensions(), base.dimensions());
        assert!(log.events().is_empty());

        // Light fill on a dark background
        assert!(out.pixels().any(|p| p[0] > 150 && p[1] > 150 && p[2] > 150));
        assert!(out.pixels().all(|p| p[3] == 255));

        // Bottom-right quadrant untouched for a top-left anchor
        for y in 150..200 {
            for x in 300..400 {
                assert_eq!(out.get_pixel(x, y), base.get_pixel(x, y));
            }
        }
    }

    #[test]
    fn apply_positioned_rejects_blank_text_and_bad_style() {
        let font = Font::bundled().unwrap();
        let base = RgbaImage::from_pixel(100, 100, Rgba([0, 0, 0, 255]));
        let log = EventLog::new();

        assert!(matches!(
            apply_positioned(&base, "   ", &font, &style(Anchor::Center), &log),
            Err(Error::EmptyTextBounds)
        ));

        let too_opaque = PositionStyle {
            opacity: 1.2,
            ..style(Anchor::Center)
        };
        assert!(matches!(
            apply_positioned(&base, "x", &font, &too_opaque, &log),
            Err(Error::Config(_))
        ));

        let wide_margin = PositionStyle {
            margin_ratio: 1.0,
            ..style(Anchor::Center)
        };
        assert!(apply_positioned(&base, "x", &font, &wide_margin, &log).is_err());
    }

    #[test]
    fn zero_opacity_reports_invisible_result() {
        let font = Font::bundled().unwrap();
        let base = RgbaImage::from_pixel(100, 60, Rgba([10, 200, 10, 255]));
        let log = EventLog::new();
        let faint = PositionStyle {
            opacity: 0.0,
            ..style(Anchor::BottomLeft)
        };

        let out = apply_positioned(&base, "Mark", &font, &faint, &log).unwrap();
        assert_eq!(out, base);
        assert!(log.contains(&Event::InvisibleWatermark));
    }
}
