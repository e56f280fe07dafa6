use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use versereel::{
    GenerateRequest, Generator, GeneratorConfig, Orientation, OutputMode,
    model::VerseRange,
};

#[derive(Parser, Debug)]
#[command(name = "versereel", version)]
struct Cli {
    /// Generator configuration JSON; defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a verse video (requires `ffmpeg` on PATH).
    Generate(GenerateArgs),
    /// Remove generated artifacts older than the retention window.
    Cleanup,
    /// Print metadata for a generated artifact.
    Show(ShowArgs),
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    /// Surah number (1-114).
    #[arg(long)]
    surah: u16,

    /// First ayah of the range.
    #[arg(long)]
    ayah_start: u16,

    /// Last ayah of the range; defaults to a single verse.
    #[arg(long)]
    ayah_end: Option<u16>,

    /// Reciter directory name on the audio CDN.
    #[arg(long, default_value = "Alafasy_128kbps")]
    reciter: String,

    /// Background video file to loop behind the text.
    #[arg(long)]
    background: PathBuf,

    #[arg(long, value_enum, default_value_t = Orientation::Landscape)]
    orientation: Orientation,

    /// Skip audio; show each verse for this many seconds over silence.
    #[arg(long, value_name = "SECS")]
    preview: Option<f64>,

    /// Text color as #rrggbb or #rrggbbaa.
    #[arg(long)]
    text_color: Option<String>,

    /// Starting Arabic font size in pixels.
    #[arg(long)]
    font_size: Option<u32>,

    /// Logical font name for the Arabic block.
    #[arg(long)]
    arabic_font: Option<String>,

    /// Logical font name for the translation block.
    #[arg(long)]
    translation_font: Option<String>,
}

#[derive(Parser, Debug)]
struct ShowArgs {
    /// Artifact id as reported by `generate`.
    #[arg(long)]
    id: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => GeneratorConfig::from_json_file(path)?,
        None => GeneratorConfig::default(),
    };

    match cli.cmd {
        Command::Generate(args) => cmd_generate(config, args).await,
        Command::Cleanup => cmd_cleanup(config),
        Command::Show(args) => cmd_show(config, args),
    }
}

async fn cmd_generate(config: GeneratorConfig, args: GenerateArgs) -> anyhow::Result<()> {
    let mode = match args.preview {
        Some(secs_per_verse) => OutputMode::Preview { secs_per_verse },
        None => OutputMode::Full,
    };
    let request = GenerateRequest {
        range: VerseRange {
            surah: args.surah,
            ayah_start: args.ayah_start,
            ayah_end: args.ayah_end,
        },
        reciter: args.reciter,
        background: args.background,
        orientation: args.orientation,
        mode,
        text_color: args.text_color,
        base_font_size_px: args.font_size,
        arabic_font: args.arabic_font,
        translation_font: args.translation_font,
    };

    let generator = Generator::new(config)?;
    let meta = generator.generate(&request).await?;
    eprintln!("wrote {}", meta.path.display());
    println!("{}", meta.id);
    Ok(())
}

fn cmd_cleanup(config: GeneratorConfig) -> anyhow::Result<()> {
    let generator = Generator::new(config)?;
    let removed = generator.sweep_expired()?;
    eprintln!("removed {removed} expired artifact(s)");
    Ok(())
}

fn cmd_show(config: GeneratorConfig, args: ShowArgs) -> anyhow::Result<()> {
    let generator = Generator::new(config)?;
    let meta = generator.store().metadata(&args.id)?;
    println!("{}", serde_json::to_string_pretty(&meta)?);
    Ok(())
}
