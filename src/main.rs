use clap::{Parser, Subcommand, ValueEnum};
use instant_film::audio::{self, AudioEngine, MOTOR_DELAY};
use instant_film::compose::{self, CardStyle};
use instant_film::config::{self, Config};
use instant_film::imaging::{self, CardGeometry, SourceImage};
use instant_film::naming;
use instant_film::output::{self, CropReport, DevelopReport, FileReport, SoundReport};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{Level, debug, info};

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once; only called at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "instant-film")]
#[command(about = "Develop a photo into an instant-film card")]
#[command(long_about = "\
Develop a photo into an instant-film card

The photo is center-cropped to the 552x744 image window of a 648x1032 card
(Instax Mini proportions), then given the film look:

  vignette   radial darkening toward the edges
  grain      per-pixel luminance noise, the same on card and preview
  gloss      diagonal sheen with a shine line
  shadow     1px inset ring so the photo sits in the paper (card only)

Two PNGs are written: the full card for keeping and a borderless preview.

Run 'instant-film gen-config' to generate a documented config file.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (TOML); stock defaults when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Develop a photo into a card and a preview
    Develop {
        /// Photo to develop (jpg, png, webp, tiff)
        input: PathBuf,
        /// Directory to write the card into
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// Seed the grain for reproducible output
        #[arg(long)]
        seed: Option<u64>,
        /// Play the shutter and motor sounds
        #[arg(long)]
        sound: bool,
        /// Print a JSON report instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show how a photo of the given size would be cropped
    Crop { width: u32, height: u32 },
    /// Print a stock config file with all options documented
    GenConfig,
    /// Synthesize and play the camera sounds
    Sound {
        #[arg(value_enum, default_value_t = Sound::Both)]
        which: Sound,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Sound {
    Shutter,
    Motor,
    Both,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Develop {
            input,
            out,
            seed,
            sound,
            json,
        } => {
            let config = config::load_config(cli.config.as_deref())?;
            init_thread_pool(&config.processing);
            let sound = sound && configure_audio(&config);
            develop(&config, &input, &out, seed, sound, json)?;
        }
        Command::Crop { width, height } => {
            let window = CardGeometry::INSTAX_MINI.preview_rect();
            let crop = imaging::resolve_crop(width, height, window.width, window.height)?;
            let report = CropReport::new(&crop, window);
            output::print_crop(width, height, window, &report);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Sound { which } => {
            let config = config::load_config(cli.config.as_deref())?;
            configure_audio(&config);
            play_sounds(which);
        }
    }

    Ok(())
}

fn develop(
    config: &Config,
    input: &Path,
    out: &Path,
    seed: Option<u64>,
    sound: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !imaging::is_supported_path(input) {
        return Err(format!(
            "unsupported input {}: expected one of {}",
            input.display(),
            imaging::supported_input_extensions().join(", ")
        )
        .into());
    }

    let shutter_at = Instant::now();
    if sound {
        audio::play_shutter();
    }

    let source = SourceImage::open(input)?;
    info!(
        path = %input.display(),
        width = source.width(),
        height = source.height(),
        "decoded source"
    );
    let style = CardStyle::from_config(config);
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let artifacts = compose::develop_with_rng(&source, &style, &mut rng)?;

    std::fs::create_dir_all(out)?;
    let token = naming::timestamp_token();
    let prefix = &config.output.filename_prefix;

    let card_path = out.join(naming::card_file_name(prefix, &token));
    artifacts.card.save(&card_path)?;
    let card = FileReport {
        path: card_path,
        width: artifacts.card.width(),
        height: artifacts.card.height(),
        bytes: artifacts.card.as_bytes().len(),
    };

    let preview = if config.output.write_preview {
        let path = out.join(naming::preview_file_name(prefix, &token));
        artifacts.preview.save(&path)?;
        Some(FileReport {
            path,
            width: artifacts.preview.width(),
            height: artifacts.preview.height(),
            bytes: artifacts.preview.as_bytes().len(),
        })
    } else {
        None
    };

    let report = DevelopReport {
        source: input.to_path_buf(),
        source_width: source.width(),
        source_height: source.height(),
        crop: CropReport::new(&artifacts.crop, style.geometry().preview_rect()),
        card,
        preview,
        seed,
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        output::print_develop_output(&report);
    }

    if sound {
        std::thread::sleep(MOTOR_DELAY.saturating_sub(shutter_at.elapsed()));
        let motor = audio::play_motor();
        if motor.queued {
            wait_for(motor.audio.duration());
        }
    }
    Ok(())
}

/// Play the requested sounds and report what was rendered for each.
fn play_sounds(which: Sound) {
    let mut reports = Vec::new();

    if matches!(which, Sound::Shutter | Sound::Both) {
        let shutter = audio::play_shutter();
        reports.push(SoundReport::new("shutter", &shutter));
        if which == Sound::Both {
            std::thread::sleep(MOTOR_DELAY);
        } else if shutter.queued {
            wait_for(shutter.audio.duration());
        }
    }
    if matches!(which, Sound::Motor | Sound::Both) {
        let motor = audio::play_motor();
        reports.push(SoundReport::new("motor", &motor));
        if motor.queued {
            wait_for(motor.audio.duration());
        }
    }

    output::print_sound_output(&reports);
}

/// Apply `[audio]` to the shared engine; returns whether sound can play.
fn configure_audio(config: &Config) -> bool {
    let mut engine = match AudioEngine::global().lock() {
        Ok(e) => e,
        Err(poisoned) => poisoned.into_inner(),
    };
    engine.set_enabled(config.audio.enabled);
    engine.set_sample_rate(config.audio.sample_rate);
    let available = engine.is_available();
    debug!(
        enabled = config.audio.enabled,
        sample_rate = config.audio.sample_rate,
        available,
        "audio configured"
    );
    available
}

/// Keep the process alive while queued audio drains.
fn wait_for(seconds: f64) {
    std::thread::sleep(Duration::from_secs_f64(seconds + 0.05));
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: config can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
