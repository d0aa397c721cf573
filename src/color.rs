//! Color parsing for watermark configuration.
//!
//! Colors are plain [`image::Rgba<u8>`] values (non-premultiplied).

use image::Rgba;

use crate::error::{Error, Result};

/// Opaque white, the default background for flattening.
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Parse a hex color string.
///
/// Accepts `rgb` (each digit doubled), `rrggbb` (opaque) and `rrggbbaa`, with
/// or without a leading `#`. Surrounding whitespace is ignored.
///
/// # Errors
///
/// Returns [`Error::Config`] for an empty string, a wrong digit count or a
/// non-hex digit.
pub fn parse_hex_color(raw: &str) -> Result<Rgba<u8>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::config("color must not be empty"));
    }
    let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::config(format!("invalid color format: {raw:?}")));
    }

    let digit = |i: usize| u8::from_str_radix(&hex[i..=i], 16);
    let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
    let bad = |_| Error::config(format!("invalid color format: {raw:?}"));

    match hex.len() {
        3 => Ok(Rgba([
            digit(0).map_err(bad)? * 17,
            digit(1).map_err(bad)? * 17,
            digit(2).map_err(bad)? * 17,
            255,
        ])),
        6 => Ok(Rgba([
            pair(0).map_err(bad)?,
            pair(2).map_err(bad)?,
            pair(4).map_err(bad)?,
            255,
        ])),
        8 => Ok(Rgba([
            pair(0).map_err(bad)?,
            pair(2).map_err(bad)?,
            pair(4).map_err(bad)?,
            pair(6).map_err(bad)?,
        ])),
        _ => Err(Error::config(format!("invalid color format: {raw:?}"))),
    }
}

/// Parse an `r,g,b` triple into an opaque color.
///
/// # Errors
///
/// Returns [`Error::Config`] unless there are exactly three comma-separated
/// integers in `0..=255`.
pub fn parse_rgb(raw: &str) -> Result<Rgba<u8>> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(Error::config("expected format r,g,b"));
    }
    let mut channels = [0u8; 3];
    for (slot, part) in channels.iter_mut().zip(&parts) {
        *slot = part
            .parse::<u8>()
            .map_err(|_| Error::config(format!("invalid channel: {part:?}")))?;
    }
    Ok(Rgba([channels[0], channels[1], channels[2], 255]))
}
