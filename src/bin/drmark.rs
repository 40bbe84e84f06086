//! drmark CLI - section extraction and reversible watermarking for JPEG/WebP.

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use drmark_rs::jfif::{JfifContainer, JfifSegment};
use drmark_rs::jpeg_marker_code::JpegMarkerCode;
use drmark_rs::riff::RiffContainer;
use drmark_rs::settings::Settings;
use drmark_rs::{
    EncryptionKey, ImageKind, OriginX, OriginY, Section, WatermarkTask, codec, embed, section,
};

/// Reversible watermarking for JPEG and WebP images
#[derive(Parser)]
#[command(name = "drmark")]
#[command(version)]
#[command(about = "Watermark JPEG/WebP images and restore them with a key", long_about = None)]
#[command(after_help = "EXAMPLES:
    drmark section -i photo.jpg -o crop.jpg --x 10 --y 10 --width 64 --height 64
    drmark watermark -i photo.webp -w logo.webp -o marked.webp --origin-x right --key <64 hex>
    drmark restore -i marked.webp -o original.webp --config drmark.yaml
    drmark info -i marked.jpg

SETTINGS FILE (YAML):
    key: <64 hex digits>
    x: 8
    y: 8
    origin_x: 1      # 0 = left, else right
    origin_y: 0      # 0 = top, else bottom
    jpeg_quality: 90")]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// YAML settings file; command line flags take precedence
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crop a rectangle out of an image, keeping its format
    #[command(visible_alias = "s")]
    Section {
        #[arg(short, long, help = "Path to the input image file")]
        input: PathBuf,

        #[arg(short, long, help = "Path for the cropped image")]
        output: PathBuf,

        #[arg(long, default_value = "0")]
        x: u32,

        #[arg(long, default_value = "0")]
        y: u32,

        #[arg(long)]
        width: u32,

        #[arg(long)]
        height: u32,
    },

    /// Composite a watermark and hide the covered pixels in the output
    #[command(visible_alias = "w")]
    Watermark {
        #[arg(short, long, help = "Path to the target image")]
        input: PathBuf,

        #[arg(short, long, help = "Path to the watermark image")]
        watermark: PathBuf,

        #[arg(short, long, help = "Path for the watermarked image")]
        output: PathBuf,

        /// Offset from the horizontal origin
        #[arg(long)]
        x: Option<u32>,

        /// Offset from the vertical origin
        #[arg(long)]
        y: Option<u32>,

        #[arg(long, value_enum)]
        origin_x: Option<Horizontal>,

        #[arg(long, value_enum)]
        origin_y: Option<Vertical>,

        /// Output format; defaults to the target's format
        #[arg(short, long, value_enum)]
        format: Option<Format>,

        /// AES-256 key as 64 hex digits
        #[arg(short, long)]
        key: Option<String>,

        /// JPEG quality (1-100)
        #[arg(short, long)]
        quality: Option<u8>,

        /// Also write the covered pixels to this path
        #[arg(long)]
        old_section: Option<PathBuf>,
    },

    /// Put the hidden pixels back into a watermarked image
    #[command(visible_alias = "r")]
    Restore {
        #[arg(short, long, help = "Path to the watermarked image")]
        input: PathBuf,

        #[arg(short, long, help = "Path for the restored image")]
        output: PathBuf,

        /// AES-256 key as 64 hex digits
        #[arg(short, long)]
        key: Option<String>,
    },

    /// Show container structure and whether a hidden section is present
    #[command(visible_alias = "i")]
    Info {
        #[arg(short, long, help = "Path to the image file to inspect")]
        input: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Horizontal {
    Left,
    Right,
}

#[derive(Clone, Copy, ValueEnum)]
enum Vertical {
    Top,
    Bottom,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Jpeg,
    Webp,
}

impl From<Horizontal> for OriginX {
    fn from(value: Horizontal) -> Self {
        match value {
            Horizontal::Left => OriginX::Left,
            Horizontal::Right => OriginX::Right,
        }
    }
}

impl From<Vertical> for OriginY {
    fn from(value: Vertical) -> Self {
        match value {
            Vertical::Top => OriginY::Top,
            Vertical::Bottom => OriginY::Bottom,
        }
    }
}

impl From<Format> for ImageKind {
    fn from(value: Format) -> Self {
        match value {
            Format::Jpeg => ImageKind::Jpeg,
            Format::Webp => ImageKind::WebP,
        }
    }
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = load_settings(cli.config.as_deref()).and_then(|settings| match cli.command {
        Commands::Section {
            input,
            output,
            x,
            y,
            width,
            height,
        } => extract_section(&input, &output, Section::new(x, y, width, height)),
        Commands::Watermark {
            input,
            watermark,
            output,
            x,
            y,
            origin_x,
            origin_y,
            format,
            key,
            quality,
            old_section,
        } => {
            let mut placement = settings.placement();
            placement.x = x.unwrap_or(placement.x);
            placement.y = y.unwrap_or(placement.y);
            if let Some(origin) = origin_x {
                placement.origin_x = origin.into();
            }
            if let Some(origin) = origin_y {
                placement.origin_y = origin.into();
            }

            let mut task = WatermarkTask::new();
            task.set_placement(placement);
            task.set_key(resolve_key(key.as_deref(), &settings)?);
            task.set_jpeg_quality(quality.unwrap_or(settings.jpeg_quality));
            apply_watermark(
                &mut task,
                &input,
                &watermark,
                &output,
                format.map(ImageKind::from),
                old_section.as_deref(),
            )
        }
        Commands::Restore { input, output, key } => {
            let key = resolve_key(key.as_deref(), &settings)?;
            restore_image(&input, &output, &key)
        }
        Commands::Info { input } => show_info(&input),
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_settings(path: Option<&Path>) -> CliResult<Settings> {
    match path {
        Some(path) => {
            let settings = Settings::from_file(path)?;
            info!("Loaded settings from {}", path.display());
            Ok(settings)
        }
        None => Ok(Settings::default()),
    }
}

fn resolve_key(flag: Option<&str>, settings: &Settings) -> CliResult<EncryptionKey> {
    if let Some(hex) = flag {
        return Ok(EncryptionKey::from_hex(hex)?);
    }
    settings
        .key()?
        .ok_or_else(|| "no key given: pass --key or set `key` in the settings file".into())
}

fn read_image(path: &Path) -> CliResult<(Vec<u8>, ImageKind)> {
    let data = fs::read(path)?;
    let kind = ImageKind::detect(&data)
        .ok_or_else(|| format!("{}: not a JPEG or WebP file", path.display()))?;
    Ok((data, kind))
}

fn extract_section(input: &Path, output: &Path, area: Section) -> CliResult<()> {
    let (data, kind) = read_image(input)?;
    let (written, cropped) = section::crop_section(&data, kind, area)?;
    fs::write(output, &cropped)?;
    println!(
        "✓ Wrote {}x{} {} section at ({}, {}) to {:?}",
        written.width, written.height, kind, written.x, written.y, output
    );
    Ok(())
}

fn apply_watermark(
    task: &mut WatermarkTask,
    input: &Path,
    watermark: &Path,
    output: &Path,
    format: Option<ImageKind>,
    old_section: Option<&Path>,
) -> CliResult<()> {
    let (target_data, target_kind) = read_image(input)?;
    let (mark_data, mark_kind) = read_image(watermark)?;
    task.load_target(&target_data, target_kind)?;
    task.load_watermark(&mark_data, mark_kind)?;
    task.process()?;

    let kind = format.unwrap_or(target_kind);
    fs::write(output, task.render(kind)?)?;
    if let Some(path) = old_section {
        fs::write(path, task.render_old_section(kind)?)?;
    }

    let position = task.absolute_watermark_position()?;
    println!(
        "✓ Watermarked {:?} at ({}, {}), wrote {} to {:?}",
        input, position.x, position.y, kind, output
    );
    Ok(())
}

fn restore_image(input: &Path, output: &Path, key: &EncryptionKey) -> CliResult<()> {
    let (data, kind) = read_image(input)?;
    let restored = embed::restore(&data, kind, key)?;
    fs::write(output, &restored)?;
    println!("✓ Restored {} image to {:?}", kind, output);
    Ok(())
}

fn show_info(input: &Path) -> CliResult<()> {
    let (data, kind) = read_image(input)?;

    println!("File: {:?}", input);
    println!("Size: {} bytes", data.len());
    println!("Format: {}", kind);

    let image = codec::decode(&data, kind)?;
    println!("Dimensions: {}x{}", image.width(), image.height());
    println!("Color: {:?}", image.color());
    println!();

    match kind {
        ImageKind::Jpeg => {
            let container = JfifContainer::parse(&data)?;
            println!("Segments:");
            for segment in container.segments() {
                match segment {
                    JfifSegment::EntropyCoded(bytes) => {
                        println!("  {:<6} {:>8} bytes", "ECS", bytes.len());
                    }
                    JfifSegment::Trailing(bytes) => {
                        println!("  {:<6} {:>8} bytes after EOI", "TRAIL", bytes.len());
                    }
                    other => {
                        let marker = other.marker().unwrap_or_default();
                        let name = JpegMarkerCode::try_from(marker)
                            .map(|code| code.mnemonic())
                            .unwrap_or("?");
                        println!(
                            "  {:<6} FF{:02X} {:>8} bytes",
                            name,
                            marker,
                            other.encoded_len()
                        );
                    }
                }
            }
            println!();
            println!("Hidden section: {}", yes_no(container.has_payload()));
        }
        ImageKind::WebP => {
            let container = RiffContainer::parse(&data)?;
            println!("Chunks:");
            for chunk in container.chunks() {
                println!("  {:<6} {:>8} bytes", chunk.id_str(), chunk.data.len());
            }
            println!();
            println!("Hidden section: {}", yes_no(container.has_payload()));
        }
    }
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
