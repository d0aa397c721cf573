//! Tiled watermark compositing.
//!
//! The mark tile is repeated in a staggered brick pattern over a square
//! canvas large enough to cover the source image at any rotation. The whole
//! canvas is then rotated once and composited centered over the source; only
//! the part of the rotated canvas that lands on the source is ever sampled.
//! Rotating the canvas rather than each tile avoids seams between tile edges.

use image::{Rgba, RgbaImage};

use crate::blending::{blend_over, overlay, same_rgb, to_channel};
use crate::diagnostics::{Diagnostics, Event};
use crate::error::{Error, Result};
use crate::mark::MarkTile;

/// Side length of the tiling canvas for a `base_w` x `base_h` image.
///
/// `ceil(hypot(base_w, base_h)) + 2 * max(tile_w, tile_h)`: after rotation by
/// any angle the canvas, centered on the image, still covers it completely.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn canvas_side(base_w: u32, base_h: u32, tile_w: u32, tile_h: u32) -> u32 {
    let diagonal = f64::from(base_w).hypot(f64::from(base_h)).ceil() as u32;
    diagonal.saturating_add(tile_w.max(tile_h).saturating_mul(2))
}

/// Repeat `tile` over a transparent `side` x `side` canvas.
///
/// Rows advance by `tile height + spacing`; every other row is shifted left
/// by half of `tile width + spacing`. `spacing` may be negative as long as
/// both strides stay positive.
///
/// # Errors
///
/// Returns [`Error::Config`] if either stride is zero or negative.
pub fn tile_canvas(tile: &MarkTile, side: u32, spacing: i32) -> Result<RgbaImage> {
    let step_x = i64::from(tile.width()) + i64::from(spacing);
    let step_y = i64::from(tile.height()) + i64::from(spacing);
    if step_x <= 0 || step_y <= 0 {
        return Err(Error::config(format!(
            "spacing {spacing} leaves no room between {}x{} tiles",
            tile.width(),
            tile.height()
        )));
    }

    let side_len = i64::from(side);
    let mut canvas = RgbaImage::new(side, side);

    let mut y = 0i64;
    let mut shifted = false;
    while y < side_len {
        let mut x = if shifted { -(step_x / 2) } else { 0 };
        shifted = !shifted;
        while x < side_len {
            overlay(&mut canvas, tile.image(), x, y);
            x += step_x;
        }
        y += step_y;
    }

    Ok(canvas)
}

/// Inverse mapping from a rotated, enlarged canvas back into a source image.
///
/// Lets callers sample any sub-window of the rotated output without
/// materializing the whole of it.
struct Rotation<'a> {
    image: &'a RgbaImage,
    sin: f64,
    cos: f64,
    width: u32,
    height: u32,
}

impl<'a> Rotation<'a> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn new(image: &'a RgbaImage, angle_degrees: i32) -> Self {
        let (sin, cos) = f64::from(angle_degrees).to_radians().sin_cos();
        let src_w = f64::from(image.width());
        let src_h = f64::from(image.height());
        // Shave float noise so e.g. 90 degrees does not grow by a pixel
        let width = ((src_w * cos.abs() + src_h * sin.abs()) - 1e-6).ceil().max(1.0) as u32;
        let height = ((src_w * sin.abs() + src_h * cos.abs()) - 1e-6).ceil().max(1.0) as u32;
        Self {
            image,
            sin,
            cos,
            width,
            height,
        }
    }

    fn texel(&self, x: i64, y: i64) -> Rgba<u8> {
        match (u32::try_from(x), u32::try_from(y)) {
            (Ok(x), Ok(y)) if x < self.image.width() && y < self.image.height() => {
                *self.image.get_pixel(x, y)
            }
            _ => Rgba([0, 0, 0, 0]),
        }
    }

    /// Bilinear sample of output pixel `(dx, dy)`; `None` where uncovered.
    #[allow(clippy::cast_possible_truncation)]
    fn sample(&self, dx: u32, dy: u32) -> Option<Rgba<u8>> {
        let src_w = f64::from(self.image.width());
        let src_h = f64::from(self.image.height());

        // Destination pixel center, relative to the canvas center
        let rx = f64::from(dx) + 0.5 - f64::from(self.width) / 2.0;
        let ry = f64::from(dy) + 0.5 - f64::from(self.height) / 2.0;

        // Inverse rotation into source pixel-index space
        let sx = rx * self.cos - ry * self.sin + src_w / 2.0 - 0.5;
        let sy = rx * self.sin + ry * self.cos + src_h / 2.0 - 0.5;
        if sx <= -1.0 || sy <= -1.0 || sx >= src_w || sy >= src_h {
            return None;
        }

        let (x0, y0) = (sx.floor(), sy.floor());
        let (fx, fy) = ((sx - x0) as f32, (sy - y0) as f32);
        let (x0, y0) = (x0 as i64, y0 as i64);

        let mut color = [0.0f32; 3];
        let mut alpha = 0.0f32;
        for (px, weight) in [
            (self.texel(x0, y0), (1.0 - fx) * (1.0 - fy)),
            (self.texel(x0 + 1, y0), fx * (1.0 - fy)),
            (self.texel(x0, y0 + 1), (1.0 - fx) * fy),
            (self.texel(x0 + 1, y0 + 1), fx * fy),
        ] {
            let a = f32::from(px[3]) * weight;
            alpha += a;
            for (acc, &c) in color.iter_mut().zip(&px.0[..3]) {
                *acc += f32::from(c) * a;
            }
        }

        let a = to_channel(alpha);
        if a == 0 {
            return None;
        }
        Some(Rgba([
            to_channel(color[0] / alpha),
            to_channel(color[1] / alpha),
            to_channel(color[2] / alpha),
            a,
        ]))
    }
}

/// Rotate `image` counter-clockwise by `angle_degrees` about its center.
///
/// The output is enlarged to the rotated bounding box; uncovered corners are
/// fully transparent. Multiples of 360 return an exact copy. Sampling is
/// bilinear on alpha-weighted color so transparent neighbours do not darken
/// glyph edges.
#[must_use]
pub fn rotate(image: &RgbaImage, angle_degrees: i32) -> RgbaImage {
    if angle_degrees.rem_euclid(360) == 0 {
        return image.clone();
    }

    let rotation = Rotation::new(image, angle_degrees);
    let mut rotated = RgbaImage::new(rotation.width, rotation.height);
    for (dx, dy, out) in rotated.enumerate_pixels_mut() {
        if let Some(px) = rotation.sample(dx, dy) {
            *out = px;
        }
    }
    rotated
}

/// Composite a tiled, rotated watermark over a copy of `base`.
///
/// Equivalent to rotating the whole tiling canvas and overlaying it centered
/// on `base`, but only the base-sized window of the rotated canvas is ever
/// sampled. Reports [`Event::InvisibleWatermark`] if the result is identical
/// to `base` in every RGB channel.
///
/// # Errors
///
/// Returns [`Error::Config`] if `spacing` makes the tiling stride non-positive.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn apply_tiled(
    base: &RgbaImage,
    tile: &MarkTile,
    spacing: i32,
    angle_degrees: i32,
    diagnostics: &dyn Diagnostics,
) -> Result<RgbaImage> {
    let (base_w, base_h) = base.dimensions();
    let side = canvas_side(base_w, base_h, tile.width(), tile.height());
    let tiled = tile_canvas(tile, side, spacing)?;

    let mut result = base.clone();
    if angle_degrees.rem_euclid(360) == 0 {
        let off_x = (i64::from(base_w) - i64::from(side)) / 2;
        let off_y = (i64::from(base_h) - i64::from(side)) / 2;
        overlay(&mut result, &tiled, off_x, off_y);
    } else {
        let rotation = Rotation::new(&tiled, angle_degrees);
        // Negative: the rotated canvas is larger than the base
        let off_x = (i64::from(base_w) - i64::from(rotation.width)) / 2;
        let off_y = (i64::from(base_h) - i64::from(rotation.height)) / 2;
        let (rot_w, rot_h) = (i64::from(rotation.width), i64::from(rotation.height));

        for (x, y, px) in result.enumerate_pixels_mut() {
            let (rx, ry) = (i64::from(x) - off_x, i64::from(y) - off_y);
            if rx < 0 || ry < 0 || rx >= rot_w || ry >= rot_h {
                continue;
            }
            if let Some(mark) = rotation.sample(rx as u32, ry as u32) {
                *px = blend_over(*px, mark);
            }
        }
    }

    if same_rgb(base, &result) {
        diagnostics.report(Event::InvisibleWatermark);
    }

    Ok(result)
}
