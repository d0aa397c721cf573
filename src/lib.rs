//! Overlay text watermarks onto raster images.
//!
//! Two modes are supported:
//!
//! - **Repeat**: the text is rendered once into a cropped, opacity-scaled
//!   mark tile, repeated in a staggered brick pattern, rotated as a whole and
//!   composited over the image.
//! - **Position**: the text is drawn once at a corner or the center, sized to
//!   the image and colored (with an outline) for contrast against the
//!   background.
//!
//! Images without alpha support (JPEG) are flattened onto a solid background
//! before encoding so translucent watermark edges keep their colors.
//!
//! # Quick Start
//!
//! ```no_run
//! use text_watermark::{
//!     save_image, ModeOptions, RepeatOptions, TracingDiagnostics, WatermarkConfig,
//!     WatermarkEngine,
//! };
//!
//! let config = WatermarkConfig {
//!     text: "CONFIDENTIAL".to_string(),
//!     mode: ModeOptions::Repeat(RepeatOptions {
//!         font_path: Some("fonts/Roboto-Regular.ttf".into()),
//!         ..RepeatOptions::default()
//!     }),
//! };
//! let engine = WatermarkEngine::new(&config, &TracingDiagnostics).expect("invalid config");
//! let img = image::open("photo.jpg").unwrap().to_rgba8();
//! let marked = engine.apply(&img, &TracingDiagnostics).unwrap();
//! save_image(&marked, "marked.jpg".as_ref(), engine.jpeg_background()).unwrap();
//! ```
//!
//! # Diagnostics
//!
//! Non-fatal conditions (an invisible result, a font fallback, an unknown
//! anchor) are delivered to the [`Diagnostics`] value passed in by the
//! caller. [`TracingDiagnostics`] forwards them to `tracing`; [`EventLog`]
//! records them.

#![deny(missing_docs)]

pub mod blending;
pub mod color;
pub mod config;
pub mod diagnostics;
mod engine;
pub mod error;
pub mod font;
pub mod mark;
pub mod position;
pub mod tile;

pub use config::{
    ModeOptions, PositionOptions, PositionSettings, RepeatOptions, RepeatSettings,
    WatermarkConfig,
};
pub use diagnostics::{Diagnostics, Event, EventLog, Silent, TracingDiagnostics};
pub use engine::{
    default_output_path, is_supported_image, save_image, OutputFormat, ProcessResult,
    WatermarkEngine,
};
pub use error::{Error, Result};
pub use font::Font;
pub use mark::MarkTile;
pub use position::Anchor;
