//! Alpha compositing primitives.
//!
//! All rasters are non-premultiplied RGBA. Watermarks are applied with the
//! Porter-Duff "over" operator:
//! `out_a = src_a + dst_a * (1 - src_a)`,
//! `out_c = (src_c * src_a + dst_c * dst_a * (1 - src_a)) / out_a`.
//!
//! Against an opaque destination this reduces to
//! `src_c * src_a + dst_c * (1 - src_a)`.

use image::{Rgba, RgbaImage};

use crate::error::{Error, Result};

/// Round and clamp a channel value to `u8`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn to_channel(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Composite `src` over `dst` for a single pixel.
#[must_use]
pub fn blend_over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    match src[3] {
        0 => return dst,
        255 => return src,
        _ => {}
    }

    let src_a = f32::from(src[3]) / 255.0;
    let dst_a = f32::from(dst[3]) / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);

    let mut out = [0u8; 4];
    for ch in 0..3 {
        let v = (f32::from(src[ch]) * src_a + f32::from(dst[ch]) * dst_a * (1.0 - src_a)) / out_a;
        out[ch] = to_channel(v);
    }
    out[3] = to_channel(out_a * 255.0);
    Rgba(out)
}

/// Composite `src` over `dst` with `src`'s top-left corner at `(x, y)`.
///
/// The offset may be negative; anything falling outside `dst` is clipped.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn overlay(dst: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64) {
    let (dst_w, dst_h) = (i64::from(dst.width()), i64::from(dst.height()));
    let (src_w, src_h) = (i64::from(src.width()), i64::from(src.height()));

    // Clip to destination bounds
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + src_w).min(dst_w);
    let y1 = (y + src_h).min(dst_h);

    if x0 >= x1 || y0 >= y1 {
        return;
    }

    for ty in y0..y1 {
        for tx in x0..x1 {
            let s = *src.get_pixel((tx - x) as u32, (ty - y) as u32);
            if s[3] == 0 {
                continue;
            }
            let d = dst.get_pixel_mut(tx as u32, ty as u32);
            *d = blend_over(*d, s);
        }
    }
}

/// Composite `image` over an opaque canvas filled with `background`.
///
/// The background's own alpha is ignored; the result is always fully
/// opaque. Required before encoding to a format without an alpha channel,
/// otherwise translucent pixels are encoded against the encoder's implicit
/// (usually black) background.
#[must_use]
pub fn flatten(image: &RgbaImage, background: Rgba<u8>) -> RgbaImage {
    let bg = Rgba([background[0], background[1], background[2], 255]);
    let mut canvas = RgbaImage::from_pixel(image.width(), image.height(), bg);
    overlay(&mut canvas, image, 0, 0);
    canvas
}

/// Whether two images have the same dimensions and identical RGB channels.
///
/// Alpha is not compared.
#[must_use]
pub fn same_rgb(a: &RgbaImage, b: &RgbaImage) -> bool {
    a.dimensions() == b.dimensions()
        && a
            .pixels()
            .zip(b.pixels())
            .all(|(pa, pb)| pa[0] == pb[0] && pa[1] == pb[1] && pa[2] == pb[2])
}

/// Scale every pixel's alpha by `opacity`: `alpha = round(alpha * opacity)`.
///
/// # Errors
///
/// Returns [`Error::Config`] if `opacity` is not within `[0, 1]`.
pub fn scale_opacity(image: &RgbaImage, opacity: f64) -> Result<RgbaImage> {
    if !(0.0..=1.0).contains(&opacity) {
        return Err(Error::config("opacity must be between 0 and 1"));
    }
    let mut out = image.clone();
    for px in out.pixels_mut() {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            px[3] = (f64::from(px[3]) * opacity).round() as u8;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transparent_source_leaves_destination_untouched() {
        let dst = Rgba([10, 20, 30, 200]);
        assert_eq!(blend_over(dst, Rgba([255, 0, 0, 0])), dst);
    }

    #[test]
    fn opaque_source_replaces_destination() {
        let src = Rgba([1, 2, 3, 255]);
        assert_eq!(blend_over(Rgba([200, 200, 200, 255]), src), src);
    }

    #[test]
    fn half_alpha_over_opaque_mixes_evenly() {
        let out = blend_over(Rgba([0, 0, 0, 255]), Rgba([255, 255, 255, 128]));
        assert_eq!(out, Rgba([128, 128, 128, 255]));
    }

    #[test]
    fn translucent_over_transparent_keeps_source() {
        let src = Rgba([77, 182, 172, 90]);
        assert_eq!(blend_over(Rgba([0, 0, 0, 0]), src), src);
    }

    #[test]
    fn overlay_clips_negative_offsets() {
        let mut dst = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let src = RgbaImage::from_pixel(3, 3, Rgba([255, 255, 255, 255]));
        overlay(&mut dst, &src, -2, -2);

        assert_eq!(dst.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(dst.get_pixel(1, 0), &Rgba([0, 0, 0, 255]));
        assert_eq!(dst.get_pixel(0, 1), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn overlay_outside_bounds_is_noop() {
        let mut dst = RgbaImage::from_pixel(4, 4, Rgba([9, 9, 9, 255]));
        let before = dst.clone();
        let src = RgbaImage::from_pixel(3, 3, Rgba([255, 255, 255, 255]));
        overlay(&mut dst, &src, 10, 0);
        overlay(&mut dst, &src, 0, -3);
        assert_eq!(dst, before);
    }

    #[test]
    fn flatten_opaque_image_is_identity() {
        let mut img = RgbaImage::new(3, 2);
        for (i, px) in img.pixels_mut().enumerate() {
            let v = u8::try_from(i * 40).unwrap();
            *px = Rgba([v, 255 - v, v / 2, 255]);
        }
        assert_eq!(flatten(&img, Rgba([255, 0, 0, 255])), img);
        assert_eq!(flatten(&img, Rgba([0, 0, 255, 0])), img);
    }

    #[test]
    fn flatten_blends_translucent_pixels_onto_background() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 128]));
        let flat = flatten(&img, Rgba([255, 255, 255, 255]));
        for px in flat.pixels() {
            assert_eq!(px[3], 255);
            assert_eq!(px[0], 127);
        }

        let clear = RgbaImage::new(1, 1);
        assert_eq!(flatten(&clear, Rgba([12, 34, 56, 0])).get_pixel(0, 0), &Rgba([12, 34, 56, 255]));
    }

    #[test]
    fn same_rgb_ignores_alpha() {
        let a = RgbaImage::from_pixel(2, 2, Rgba([5, 6, 7, 255]));
        let b = RgbaImage::from_pixel(2, 2, Rgba([5, 6, 7, 10]));
        let c = RgbaImage::from_pixel(2, 2, Rgba([5, 6, 8, 255]));
        assert!(same_rgb(&a, &b));
        assert!(!same_rgb(&a, &c));
        assert!(!same_rgb(&a, &RgbaImage::new(2, 3)));
    }

    #[test]
    fn scale_opacity_rounds_a_single_application() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 101]));

        let once = scale_opacity(&img, 0.25).unwrap();
        assert_eq!(once.get_pixel(0, 0)[3], 25);

        // Two roundings do not compose to one
        let twice = scale_opacity(&scale_opacity(&img, 0.5).unwrap(), 0.5).unwrap();
        assert_eq!(twice.get_pixel(0, 0)[3], 26);
    }

    #[test]
    fn scale_opacity_bounds() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([1, 2, 3, 255]));
        assert_eq!(scale_opacity(&img, 1.0).unwrap(), img);
        assert_eq!(scale_opacity(&img, 0.0).unwrap().get_pixel(0, 0), &Rgba([1, 2, 3, 0]));
        assert_eq!(scale_opacity(&img, 0.5).unwrap().get_pixel(0, 0)[3], 128);
        assert!(scale_opacity(&img, 1.01).is_err());
        assert!(scale_opacity(&img, -0.1).is_err());
        assert!(scale_opacity(&img, f64::NAN).is_err());
    }
}
