//! Font loading and single-line glyph rasterization.
//!
//! Text is laid out left to right by horizontal advance only, with the
//! baseline placed at the face's ascent below the requested origin. Font
//! sizes are in pixels per em.

use std::fmt;
use std::path::{Path, PathBuf};

use ab_glyph::{point, Font as _, FontArc, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};

use crate::blending::{blend_over, to_channel};
use crate::diagnostics::{Diagnostics, Event};
use crate::error::{Error, Result};

/// Embedded fallback face (DejaVu Sans, Bitstream Vera license).
const BUNDLED_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// Well-known Arial locations tried when no usable font path is given.
/// The first path that exists is used.
pub const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    r"C:\Windows\Fonts\arial.ttf",
    "/usr/share/fonts/truetype/msttcorefonts/Arial.ttf",
    "/usr/share/fonts/truetype/msttcorefonts/arial.ttf",
];

/// Where a [`Font`] was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontOrigin {
    /// Loaded from a font file.
    File(PathBuf),
    /// The face embedded in this crate.
    Bundled,
}

/// A parsed font face. Cheap to clone and safe to share between threads.
#[derive(Clone)]
pub struct Font {
    face: FontArc,
    origin: FontOrigin,
}

impl fmt::Debug for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Font").field("origin", &self.origin).finish()
    }
}

impl Font {
    /// Load a `.ttf`/`.otf` file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty path and [`Error::FontLoad`] if
    /// the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(Error::config("font path is required"));
        }
        let load_err = |reason: String| Error::FontLoad {
            path: path.to_path_buf(),
            reason,
        };
        let data = std::fs::read(path).map_err(|e| load_err(e.to_string()))?;
        let face = FontArc::try_from_vec(data).map_err(|e| load_err(e.to_string()))?;
        Ok(Self {
            face,
            origin: FontOrigin::File(path.to_path_buf()),
        })
    }

    /// The face embedded in the crate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FontLoad`] if the embedded data cannot be parsed
    /// (only possible if the binary is corrupted).
    pub fn bundled() -> Result<Self> {
        let face = FontArc::try_from_slice(BUNDLED_FONT).map_err(|e| Error::FontLoad {
            path: PathBuf::from("<bundled>"),
            reason: e.to_string(),
        })?;
        Ok(Self {
            face,
            origin: FontOrigin::Bundled,
        })
    }

    /// Where this face came from.
    #[must_use]
    pub fn origin(&self) -> &FontOrigin {
        &self.origin
    }

    /// `ab_glyph` scales by line height; convert from pixels per em.
    fn scale(&self, size: f32) -> PxScale {
        match self.face.units_per_em() {
            Some(upem) if upem > 0.0 => PxScale::from(size * self.face.height_unscaled() / upem),
            _ => PxScale::from(size),
        }
    }

    /// Rasterize `text` at `size` pixels per em into a coverage mask.
    ///
    /// Text without any drawable glyph (empty or whitespace only) yields an
    /// empty mask.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn rasterize(&self, text: &str, size: f32) -> GlyphMask {
        let scale = self.scale(size);
        let scaled = self.face.as_scaled(scale);
        let baseline = scaled.ascent();

        let mut caret = 0.0f32;
        let mut outlines = Vec::new();
        for c in text.chars() {
            let id = scaled.glyph_id(c);
            let glyph = id.with_scale_and_position(scale, point(caret, baseline));
            caret += scaled.h_advance(id);
            if let Some(outlined) = self.face.outline_glyph(glyph) {
                outlines.push(outlined);
            }
        }

        let Some(first) = outlines.first().map(ab_glyph::OutlinedGlyph::px_bounds) else {
            return GlyphMask::default();
        };
        let (mut min_x, mut min_y, mut max_x, mut max_y) =
            (first.min.x, first.min.y, first.max.x, first.max.y);
        for b in outlines.iter().map(ab_glyph::OutlinedGlyph::px_bounds) {
            min_x = min_x.min(b.min.x);
            min_y = min_y.min(b.min.y);
            max_x = max_x.max(b.max.x);
            max_y = max_y.max(b.max.y);
        }

        let width = (max_x - min_x).max(0.0) as u32;
        let height = (max_y - min_y).max(0.0) as u32;
        let mut coverage = vec![0.0f32; width as usize * height as usize];

        for outlined in &outlines {
            let b = outlined.px_bounds();
            let ox = (b.min.x - min_x) as u32;
            let oy = (b.min.y - min_y) as u32;
            outlined.draw(|gx, gy, c| {
                let (x, y) = (ox + gx, oy + gy);
                if x < width && y < height {
                    let slot = &mut coverage[(y * width + x) as usize];
                    *slot = (*slot + c).min(1.0);
                }
            });
        }

        GlyphMask {
            left: min_x as i32,
            top: min_y as i32,
            width,
            height,
            coverage,
        }
    }
}

/// Resolve a face for position mode.
///
/// Tries `explicit` first, then the first existing entry of
/// [`SYSTEM_FONT_CANDIDATES`], then the bundled face. Each failure is
/// reported as [`Event::FontFallback`].
///
/// # Errors
///
/// Returns [`Error::FontLoad`] only if the bundled face fails too.
pub fn resolve_font(explicit: Option<&Path>, diagnostics: &dyn Diagnostics) -> Result<Font> {
    let attempt = |path: &Path| match Font::from_path(path) {
        Ok(font) => Some(font),
        Err(err) => {
            let reason = match err {
                Error::FontLoad { reason, .. } => reason,
                other => other.to_string(),
            };
            diagnostics.report(Event::FontFallback {
                path: path.to_path_buf(),
                reason,
            });
            None
        }
    };

    if let Some(path) = explicit.filter(|p| !p.as_os_str().is_empty()) {
        if let Some(font) = attempt(path) {
            return Ok(font);
        }
    }

    if let Some(path) = SYSTEM_FONT_CANDIDATES
        .iter()
        .map(Path::new)
        .find(|p| p.exists())
    {
        if let Some(font) = attempt(path) {
            return Ok(font);
        }
    }

    Font::bundled()
}

/// Per-pixel glyph coverage for one line of text.
///
/// The mask covers exactly the ink of the rendered glyphs. `left`/`top` give
/// its offset from the line origin passed to [`GlyphMask::paint`].
#[derive(Debug, Clone, Default)]
pub struct GlyphMask {
    left: i32,
    top: i32,
    width: u32,
    height: u32,
    coverage: Vec<f32>,
}

impl GlyphMask {
    /// Whether no pixel is covered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Ink width and height in pixels.
    #[must_use]
    pub fn ink_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Ink offset from the line origin.
    #[must_use]
    pub fn offset(&self) -> (i32, i32) {
        (self.left, self.top)
    }

    /// Draw the text in `color` with its line origin at `(x, y)`.
    ///
    /// Coverage scales the color's alpha; pixels are composited "over" the
    /// destination and clipped to its bounds.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn paint(&self, dst: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
        let (dst_w, dst_h) = (i64::from(dst.width()), i64::from(dst.height()));
        let base_x = x + i64::from(self.left);
        let base_y = y + i64::from(self.top);
        let alpha = f32::from(color[3]);

        for my in 0..self.height {
            let ty = base_y + i64::from(my);
            if ty < 0 || ty >= dst_h {
                continue;
            }
            for mx in 0..self.width {
                let tx = base_x + i64::from(mx);
                if tx < 0 || tx >= dst_w {
                    continue;
                }
                let c = self.coverage[(my * self.width + mx) as usize];
                let a = to_channel(alpha * c);
                if a == 0 {
                    continue;
                }
                let px = dst.get_pixel_mut(tx as u32, ty as u32);
                *px = blend_over(*px, Rgba([color[0], color[1], color[2], a]));
            }
        }
    }
}
