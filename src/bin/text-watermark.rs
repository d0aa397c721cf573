use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use text_watermark::color::parse_rgb;
use text_watermark::{
    Error, ModeOptions, PositionOptions, ProcessResult, RepeatOptions, TracingDiagnostics,
    WatermarkConfig, WatermarkEngine,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Tile the text across the whole image
    Repeat,
    /// Draw the text once at an anchor
    Position,
}

#[derive(Parser)]
#[command(
    name = "text-watermark",
    about = "Overlay tiled or anchored text watermarks onto images",
    version,
    after_help = "Examples:\n  \
                  text-watermark --mode repeat --in photo.jpg --out marked.jpg --text CONFIDENTIAL --font Roboto.ttf\n  \
                  text-watermark --mode position --in photos/ --out marked/ --text \"(c) 2025\" --position top-left"
)]
struct Cli {
    /// Watermark mode
    #[arg(long, value_enum, default_value_t = Mode::Repeat, ignore_case = true)]
    mode: Mode,

    /// Input image file or directory
    #[arg(long = "in", value_name = "PATH")]
    input: PathBuf,

    /// Output image file or directory
    #[arg(long = "out", value_name = "PATH")]
    output: PathBuf,

    /// Watermark text
    #[arg(long)]
    text: String,

    /// Repeat: watermark color hex
    #[arg(long, default_value = "#4db6ac")]
    color: String,

    /// Repeat: spacing between tiles in pixels
    #[arg(long, default_value_t = 75, allow_negative_numbers = true)]
    space: i32,

    /// Repeat: rotation angle in degrees
    #[arg(long, default_value_t = 30, allow_negative_numbers = true)]
    angle: i32,

    /// Opacity 0..1
    #[arg(long, default_value_t = 0.5)]
    opacity: f64,

    /// Font path (.ttf/.otf); required in repeat mode
    #[arg(long)]
    font: Option<PathBuf>,

    /// Repeat: font size in pixels
    #[arg(long, default_value_t = 48)]
    font_size: u32,

    /// Repeat: font height crop factor
    #[arg(long, default_value_t = 1.0)]
    font_height_crop: f64,

    /// Position: bottom-right|bottom-left|top-right|top-left|center
    #[arg(long, default_value = "bottom-right")]
    position: String,

    /// Position: margin ratio relative to image size
    #[arg(long, default_value_t = 0.04)]
    margin_ratio: f64,

    /// JPEG background RGB, e.g. 255,255,255
    #[arg(long, default_value = "255,255,255")]
    jpg_bg: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    if cli.text.trim().is_empty() {
        eprintln!("Error: --text must not be empty");
        process::exit(2);
    }

    let jpeg_background = match parse_rgb(&cli.jpg_bg) {
        Ok(bg) => bg,
        Err(e) => {
            eprintln!("Error: invalid --jpg-bg: {e}");
            process::exit(2);
        }
    };

    let mode = match cli.mode {
        Mode::Repeat => {
            let Some(font) = cli.font.clone().filter(|f| !f.as_os_str().is_empty()) else {
                eprintln!("Error: repeat mode requires --font to be set");
                process::exit(2);
            };
            ModeOptions::Repeat(RepeatOptions {
                color: Some(cli.color.clone()),
                spacing: Some(cli.space),
                angle: Some(cli.angle),
                opacity: Some(cli.opacity),
                font_path: Some(font),
                font_size: Some(cli.font_size),
                height_crop: Some(cli.font_height_crop),
            })
        }
        Mode::Position => ModeOptions::Position(PositionOptions {
            opacity: Some(cli.opacity),
            anchor: Some(cli.position.clone()),
            font_path: cli.font.clone(),
            margin_ratio: Some(cli.margin_ratio),
            jpeg_background: Some(jpeg_background),
        }),
    };

    let config = WatermarkConfig {
        text: cli.text.clone(),
        mode,
    };

    let diagnostics = TracingDiagnostics;
    let engine = match WatermarkEngine::new(&config, &diagnostics) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {e}");
            let code = if matches!(e, Error::Config(_)) { 2 } else { 1 };
            process::exit(code);
        }
    };

    if !cli.input.exists() {
        eprintln!("Error: Input path does not exist: {}", cli.input.display());
        process::exit(1);
    }

    let results = if cli.input.is_dir() {
        engine.process_directory(&cli.input, &cli.output, &diagnostics)
    } else {
        vec![engine.process_file(&cli.input, &cli.output, &diagnostics)]
    };

    let mut success_count = 0usize;
    let mut fail_count = 0usize;

    for r in &results {
        print_result(r, &cli);
        if r.success {
            success_count += 1;
        } else {
            fail_count += 1;
        }
    }

    if results.len() > 1 && !cli.quiet {
        eprintln!();
        eprint!("[Summary] Processed: {success_count}");
        if fail_count > 0 {
            eprint!(", Failed: {fail_count}");
        }
        eprintln!(" (Total: {})", results.len());
    }

    if fail_count > 0 {
        process::exit(1);
    }
}

fn init_tracing(cli: &Cli) {
    let default_level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_result(result: &ProcessResult, cli: &Cli) {
    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    if result.success {
        if !cli.quiet {
            eprintln!("[OK] {filename}");
        }
    } else {
        eprintln!("[FAIL] {filename}: {}", result.message);
    }

    if cli.verbose && result.success {
        eprintln!("  -> {}", result.message);
    }
}
