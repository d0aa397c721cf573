//! Watermark engine: configuration, application and persistence.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use crate::blending::flatten;
use crate::color::WHITE;
use crate::config::{ModeOptions, PositionSettings, RepeatSettings, WatermarkConfig};
use crate::diagnostics::{Diagnostics, Event};
use crate::error::{Error, Result};
use crate::font::{resolve_font, Font};
use crate::mark::{build_mark, MarkTile};
use crate::position::apply_positioned;
use crate::tile::apply_tiled;

/// Encoder family chosen from an output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// PNG, alpha preserved.
    Png,
    /// JPEG at maximum quality, flattened onto a background first.
    Jpeg,
}

impl OutputFormat {
    /// `.png` selects PNG; `.jpg`, `.jpeg` and anything else select JPEG.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("png") => Self::Png,
            _ => Self::Jpeg,
        }
    }
}

/// Result of processing a single image file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the processed file.
    pub path: PathBuf,
    /// Whether processing succeeded.
    pub success: bool,
    /// Human-readable status message.
    pub message: String,
}

enum Mode {
    Repeat {
        settings: RepeatSettings,
        mark: Option<MarkTile>,
    },
    Position {
        settings: PositionSettings,
        font: Font,
    },
}

/// A configured watermark, ready to apply to any number of images.
///
/// Create once with [`WatermarkEngine::new()`]. Tiled mode renders its mark
/// tile up front; anchored mode resolves its font up front.
pub struct WatermarkEngine {
    text: String,
    mode: Mode,
}

impl WatermarkEngine {
    /// Validate `config` and prepare the mark tile or font.
    ///
    /// In tiled mode a mark that renders no visible pixels is reported as
    /// [`Event::EmptyMark`]; [`apply`](Self::apply) then fails with
    /// [`Error::EmptyMark`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for invalid options or blank text, and
    /// [`Error::FontLoad`] if the tiled-mode font cannot be loaded (or, in
    /// anchored mode, if even the bundled font fails).
    pub fn new(config: &WatermarkConfig, diagnostics: &dyn Diagnostics) -> Result<Self> {
        if config.text.trim().is_empty() {
            return Err(Error::config("mark text must not be empty"));
        }

        let mode = match &config.mode {
            ModeOptions::Repeat(opts) => {
                let settings = opts.resolve()?;
                let font = Font::from_path(&settings.font_path)?;
                let mark = build_mark(&font, &config.text, &settings.mark)?;
                if mark.is_none() {
                    diagnostics.report(Event::EmptyMark);
                }
                Mode::Repeat { settings, mark }
            }
            ModeOptions::Position(opts) => {
                let settings = opts.resolve(diagnostics)?;
                let font = resolve_font(settings.font_path.as_deref(), diagnostics)?;
                Mode::Position { settings, font }
            }
        };

        Ok(Self {
            text: config.text.clone(),
            mode,
        })
    }

    /// The prepared mark tile, in tiled mode with visible text.
    #[must_use]
    pub fn mark(&self) -> Option<&MarkTile> {
        match &self.mode {
            Mode::Repeat { mark, .. } => mark.as_ref(),
            Mode::Position { .. } => None,
        }
    }

    /// Background used when saving to a format without alpha.
    #[must_use]
    pub fn jpeg_background(&self) -> Rgba<u8> {
        match &self.mode {
            Mode::Repeat { .. } => WHITE,
            Mode::Position { settings, .. } => settings.jpeg_background,
        }
    }

    /// Watermark a copy of `image`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyMark`] in tiled mode if the mark is empty,
    /// [`Error::EmptyTextBounds`] in anchored mode if the text has no extent,
    /// and [`Error::Config`] if the tiling stride is not positive.
    pub fn apply(&self, image: &RgbaImage, diagnostics: &dyn Diagnostics) -> Result<RgbaImage> {
        match &self.mode {
            Mode::Repeat { settings, mark } => {
                let mark = mark.as_ref().ok_or(Error::EmptyMark)?;
                apply_tiled(image, mark, settings.spacing, settings.angle, diagnostics)
            }
            Mode::Position { settings, font } => {
                apply_positioned(image, &self.text, font, &settings.style, diagnostics)
            }
        }
    }

    /// Load `input`, watermark it and save it to `output`.
    ///
    /// Failures are reported in the returned [`ProcessResult`].
    #[must_use]
    pub fn process_file(
        &self,
        input: &Path,
        output: &Path,
        diagnostics: &dyn Diagnostics,
    ) -> ProcessResult {
        let mut result = ProcessResult {
            path: input.to_path_buf(),
            success: false,
            message: String::new(),
        };

        let image = match image::open(input) {
            Ok(img) => img.to_rgba8(),
            Err(e) => {
                result.message = format!("Failed to load: {e}");
                return result;
            }
        };

        let marked = match self.apply(&image, diagnostics) {
            Ok(img) => img,
            Err(e) => {
                result.message = format!("Failed to watermark: {e}");
                return result;
            }
        };

        match save_image(&marked, output, self.jpeg_background()) {
            Ok(()) => {
                result.success = true;
                result.message = format!("Saved to {}", output.display());
            }
            Err(e) => {
                result.message = format!("Failed to save: {e}");
            }
        }

        result
    }

    /// Watermark every supported image in `input_dir` into `output_dir`,
    /// keeping file names.
    ///
    /// Files are processed in parallel when the `cli` feature is enabled
    /// (via rayon).
    #[must_use]
    pub fn process_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        diagnostics: &dyn Diagnostics,
    ) -> Vec<ProcessResult> {
        let inputs: Vec<PathBuf> = match std::fs::read_dir(input_dir) {
            Ok(rd) => rd
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
                .map(|e| e.path())
                .filter(|p| is_supported_image(p))
                .collect(),
            Err(e) => {
                return vec![ProcessResult {
                    path: input_dir.to_path_buf(),
                    success: false,
                    message: format!("Failed to read directory: {e}"),
                }];
            }
        };

        if let Err(e) = std::fs::create_dir_all(output_dir) {
            return vec![ProcessResult {
                path: output_dir.to_path_buf(),
                success: false,
                message: format!("Failed to create output directory: {e}"),
            }];
        }

        let process = |input: &PathBuf| {
            let output = input
                .file_name()
                .map_or_else(|| output_dir.to_path_buf(), |name| output_dir.join(name));
            self.process_file(input, &output, diagnostics)
        };

        #[cfg(feature = "cli")]
        {
            use rayon::prelude::*;
            inputs.par_iter().map(process).collect()
        }

        #[cfg(not(feature = "cli"))]
        {
            inputs.iter().map(process).collect()
        }
    }
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp"
        ),
        None => false,
    }
}

/// Save an image, choosing the encoder from the file extension.
///
/// PNG keeps the alpha channel. Every other extension is written as JPEG at
/// quality 100 after flattening onto `background`. Missing parent
/// directories are created.
///
/// # Errors
///
/// Returns an error if a directory or the file cannot be created, or if
/// encoding fails.
pub fn save_image(img: &RgbaImage, path: &Path, background: Rgba<u8>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    match OutputFormat::from_path(path) {
        OutputFormat::Png => img.save_with_format(path, ImageFormat::Png)?,
        OutputFormat::Jpeg => {
            let flat = DynamicImage::ImageRgba8(flatten(img, background)).to_rgb8();
            let file = BufWriter::new(File::create(path)?);
            let mut encoder = JpegEncoder::new_with_quality(file, 100);
            encoder.encode_image(&flat)?;
        }
    }

    Ok(())
}

/// Generate a default output path from an input path.
///
/// Example: `"photo.jpg"` becomes `"photo_watermarked.jpg"`.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let ext = input.extension().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}_watermarked.{ext}"))
}
