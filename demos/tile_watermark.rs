//! Tile a text watermark across a single image.
//!
//! Usage:
//! ```sh
//! cargo run --example tile_watermark -- input.jpg output.jpg "CONFIDENTIAL" [font.ttf]
//! ```
//!
//! Without a font argument the bundled face shipped in `assets/` is used.

use std::env;
use std::path::PathBuf;
use std::process;

use text_watermark::{
    save_image, ModeOptions, RepeatOptions, TracingDiagnostics, WatermarkConfig,
    WatermarkEngine,
};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage: {} <input> <output> <text> [font]", args[0]);
        process::exit(1);
    }

    let font = args.get(4).map_or_else(
        || PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/DejaVuSans.ttf"),
        PathBuf::from,
    );
    let config = WatermarkConfig {
        text: args[3].clone(),
        mode: ModeOptions::Repeat(RepeatOptions {
            font_path: Some(font),
            ..RepeatOptions::default()
        }),
    };

    let engine = WatermarkEngine::new(&config, &TracingDiagnostics).expect("invalid watermark");
    let img = match image::open(&args[1]) {
        Ok(img) => img.to_rgba8(),
        Err(e) => {
            eprintln!("Error: failed to load {}: {e}", args[1]);
            process::exit(1);
        }
    };

    let marked = match engine.apply(&img, &TracingDiagnostics) {
        Ok(marked) => marked,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = save_image(&marked, args[2].as_ref(), engine.jpeg_background()) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
    println!("Done: saved to {}", args[2]);
}
