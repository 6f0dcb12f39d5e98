// boxtrain - bounding-box annotation and PLM fine-tuning launcher
// Main entry point

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use boxtrain::annotations::AnnotationStore;
use boxtrain::config::{load_config, Settings};
use boxtrain::errors::{self, TrainingError};
use boxtrain::images;
use boxtrain::models::ModelSelection;
use boxtrain::session::AnnotationSession;
use boxtrain::training::{self, launch_training, LaunchRequest, TrainingEvent, TrainingPanel};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "boxtrain")]
#[command(about = "Bounding-box annotation and PLM fine-tuning launcher", version)]
struct Args {
    /// Settings file (default: ~/.config/boxtrain/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Parser, Debug)]
enum Command {
    /// List images and how many boxes each has
    List {
        /// Image directory
        image_dir: PathBuf,
    },
    /// Show the annotations of one image
    Show {
        /// Image directory
        image_dir: PathBuf,
        /// Image file name (default: first image)
        #[arg(long)]
        image: Option<String>,
    },
    /// Add a labeled box to an image
    Annotate {
        /// Image directory
        image_dir: PathBuf,
        /// Image file name
        #[arg(long)]
        image: String,
        /// Box corners: X1 Y1 X2 Y2
        #[arg(long = "box", num_args = 4, value_names = ["X1", "Y1", "X2", "Y2"], allow_negative_numbers = true)]
        bbox: Vec<i64>,
        /// Box label
        #[arg(long)]
        label: String,
    },
    /// Decode an image the way the annotator displays it
    Inspect {
        /// Image file
        image: PathBuf,
    },
    /// List available base checkpoints
    Models,
    /// Stage annotated images and write train.jsonl
    Prepare {
        /// Image directory
        image_dir: PathBuf,
    },
    /// Prepare data and run the external trainer
    Train {
        /// Image directory
        image_dir: PathBuf,
        /// Base checkpoint (default: first discovered)
        #[arg(long)]
        model: Option<String>,
        /// Trainer repository root (default: from config)
        #[arg(long = "trainer-root")]
        trainer_root: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let settings = load_config(args.config.as_deref())?;

    match args.command {
        Command::List { image_dir } => run_list(&image_dir),
        Command::Show { image_dir, image } => run_show(&image_dir, image.as_deref()),
        Command::Annotate {
            image_dir,
            image,
            bbox,
            label,
        } => run_annotate(&image_dir, &image, &bbox, &label),
        Command::Inspect { image } => run_inspect(&image),
        Command::Models => run_models(&settings),
        Command::Prepare { image_dir } => run_prepare(&image_dir, &settings),
        Command::Train {
            image_dir,
            model,
            trainer_root,
        } => run_train(image_dir, model, trainer_root, settings).await,
    }
}

fn init_tracing() {
    // BOXTRAIN_DEBUG=1 forces debug output unless RUST_LOG is set
    let show_debug = std::env::var("BOXTRAIN_DEBUG")
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false);
    let default_level = if show_debug { "debug" } else { "info" };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // stdout carries command output and trainer lines; logs go to stderr
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing_log::LogTracer::init().ok();
}

fn run_list(image_dir: &Path) -> Result<()> {
    let store = AnnotationStore::for_image_dir(image_dir);
    let names = images::list_images(image_dir)?;

    if names.is_empty() {
        println!("No images in {}", image_dir.display());
        return Ok(());
    }

    for name in &names {
        if !store.has_annotations(name) {
            println!("  {}", name);
            continue;
        }
        match store.load(name) {
            Ok(anns) => println!("✓ {} ({} boxes)", name, anns.len()),
            Err(e) => {
                tracing::error!(image = %name, error = %e, "Unreadable annotation file");
                println!("! {} (unreadable annotations)", name);
            }
        }
    }
    Ok(())
}

fn run_show(image_dir: &Path, image: Option<&str>) -> Result<()> {
    let mut session = match AnnotationSession::open(image_dir) {
        Ok(session) => session,
        Err(e) => return Err(recoverable_annotation_error(image_dir, e)),
    };
    if let Some(name) = image {
        session
            .goto(name)
            .map_err(|e| recoverable_annotation_error(image_dir, e))?;
    }

    let Some(current) = session.current_image() else {
        println!("No images in {}", image_dir.display());
        return Ok(());
    };

    println!("{}", current);
    let entries = session.entries();
    if entries.is_empty() {
        println!("  (no annotations)");
    }
    for line in entries {
        println!("  {}", line);
    }
    Ok(())
}

fn run_annotate(image_dir: &Path, image: &str, bbox: &[i64], label: &str) -> Result<()> {
    let [x1, y1, x2, y2] = <[i64; 4]>::try_from(bbox).context("--box takes exactly four values")?;

    let mut session = AnnotationSession::open(image_dir)?;
    session.goto(image)?;
    if !session.add_annotation(x1, y1, x2, y2, label) {
        bail!("Label must not be empty");
    }
    session.save()?;

    tracing::info!(image = %image, label = %label, "Added annotation");
    for line in session.entries() {
        println!("{}", line);
    }
    Ok(())
}

fn run_inspect(image: &Path) -> Result<()> {
    let rgb = images::open_rgb(image)?;
    let (width, height) = rgb.dimensions();
    println!("{}: {}x{} RGB", image.display(), width, height);
    Ok(())
}

fn run_models(settings: &Settings) -> Result<()> {
    let selection = ModelSelection::discover(&settings.models_dir)?;
    println!("Models in {}:", settings.models_dir.display());
    if selection.available().is_empty() {
        println!("  {}", selection.display_name());
    }
    for name in selection.available() {
        let marker = if Some(name.as_str()) == selection.selected() { "*" } else { " " };
        println!("{} {}", marker, name);
    }
    Ok(())
}

fn run_prepare(image_dir: &Path, settings: &Settings) -> Result<()> {
    let dataset = training::prepare(image_dir, &settings.training.question)?;
    println!(
        "Wrote {} entries to {}",
        dataset.entries,
        dataset.manifest_path.display()
    );
    Ok(())
}

async fn run_train(
    image_dir: PathBuf,
    model: Option<String>,
    trainer_root: Option<PathBuf>,
    settings: Settings,
) -> Result<()> {
    let mut selection = ModelSelection::discover(&settings.models_dir)?;
    let model = match model {
        Some(name) if selection.select(&name) => Some(name),
        Some(name) => {
            tracing::warn!(model = %name, dir = %settings.models_dir.display(), "Unknown model");
            None
        }
        None => selection.selected().map(str::to_string),
    };

    let request = LaunchRequest {
        image_dir,
        model,
        trainer_root: trainer_root.or_else(|| settings.trainer_root.clone()),
    };

    let models_dir = settings.models_dir.clone();
    let mut panel = TrainingPanel::new();
    panel.try_begin()?;

    let (tx, mut rx) = training::channel();
    let worker = tokio::spawn(launch_training(request, settings, tx));
    let mut interrupted = false;

    // Dispatch loop: the only place panel state changes
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => {
                    if let TrainingEvent::Log(line) = &event {
                        println!("{}", line);
                    }
                    panel.apply(event);
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                tracing::warn!("Interrupted, stopping trainer and restoring dataset registry");
                worker.abort();
            }
        }
    }

    tracing::debug!(start_enabled = panel.start_enabled(), "Training control released");

    match worker.await {
        Ok(Ok(summary)) => {
            if summary.success {
                println!("✓ Training completed ({} images)", summary.entries);
                Ok(())
            } else {
                match summary.exit_code {
                    Some(code) => bail!("Trainer exited with status {}", code),
                    None => bail!("Trainer was terminated by a signal"),
                }
            }
        }
        Ok(Err(e)) => Err(explain_training_error(e, &models_dir)),
        Err(e) if e.is_cancelled() => bail!("Training interrupted"),
        Err(e) => Err(e).context("Training worker panicked"),
    }
}

fn explain_training_error(error: anyhow::Error, models_dir: &Path) -> anyhow::Error {
    match error.downcast_ref::<TrainingError>() {
        Some(TrainingError::RegistryNotFound(path)) => {
            anyhow::anyhow!(errors::registry_not_found_error(&path.display().to_string()))
        }
        Some(TrainingError::NoModelSelected) => anyhow::anyhow!(errors::wrap_error_with_suggestion(
            &error,
            &format!(
                "Place a checkpoint directory under {} or pass --model",
                models_dir.display()
            ),
        )),
        Some(TrainingError::TrainerRootNotProvided) => {
            anyhow::anyhow!(errors::wrap_error_with_suggestion(
                &error,
                "Pass --trainer-root or set trainer_root in the config file",
            ))
        }
        _ => error,
    }
}

fn recoverable_annotation_error(image_dir: &Path, error: anyhow::Error) -> anyhow::Error {
    tracing::error!(dir = %image_dir.display(), error = %error, "Failed to load annotations");
    let store = AnnotationStore::for_image_dir(image_dir);
    anyhow::anyhow!(errors::annotation_file_error(
        &store.dir().display().to_string(),
        &format!("{:#}", error)
    ))
}
