//! `acmodel` — command-line front end for HTK-ASCII acoustic models.
//!
//! # Startup sequence
//!
//! 1. Initialise logging (`RUST_LOG`, default `info`).
//! 2. Load [`EngineConfig`] (defaults when the file is missing or broken).
//! 3. Run the requested subcommand.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use htk_acmodel::{
    config::EngineConfig, AcousticModel, HtkCodec, ModelMixer, ModelReadWrite,
};

/// Inspect, merge and mix HTK-ASCII acoustic models.
#[derive(Parser, Debug)]
#[command(name = "acmodel")]
#[command(about = "Inspect, merge and mix HTK-ASCII acoustic models")]
struct Args {
    /// Settings file (default: <config dir>/htk-acmodel/settings.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarise a model folder
    Info { folder: PathBuf },

    /// Print a model folder as JSON
    Dump {
        folder: PathBuf,
        /// Indent the output
        #[arg(long)]
        pretty: bool,
    },

    /// Write a training prototype
    Proto { vector_size: usize, file: PathBuf },

    /// Merge OTHER into BASE and write the result to OUT
    Merge {
        base: PathBuf,
        other: PathBuf,
        out: PathBuf,
        /// Weight of BASE (0.0 – 1.0)
        #[arg(short, long)]
        gamma: Option<f64>,
        /// Output format
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Mix the monophones of a text model and a speaker model
    Mix {
        text_model: PathBuf,
        speaker_model: PathBuf,
        out: PathBuf,
        /// Weight of the text model (0.0 – 1.0)
        #[arg(short, long)]
        gamma: Option<f64>,
        /// Output format
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Keep only context-independent HMMs
    Monophones { folder: PathBuf, out: PathBuf },
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let loaded = match &args.config {
        Some(path) => EngineConfig::load_from(path),
        None => EngineConfig::load(),
    };
    let config = loaded.unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        EngineConfig::default()
    });

    match args.command {
        Command::Info { folder } => {
            let model = read(&folder, &config)?;
            print_info(&model);
        }
        Command::Dump { folder, pretty } => {
            let model = read(&folder, &config)?;
            let json = if pretty {
                serde_json::to_string_pretty(&model)?
            } else {
                serde_json::to_string(&model)?
            };
            println!("{json}");
        }
        Command::Proto { vector_size, file } => {
            HtkCodec::new(config.files.clone(), config.proto.clone())
                .write_hmm_proto(vector_size, &file)
                .with_context(|| format!("writing prototype {}", file.display()))?;
            println!("wrote {}", file.display());
        }
        Command::Merge {
            base,
            other,
            out,
            gamma,
            format,
        } => {
            let mut model = read(&base, &config)?;
            let other = read(&other, &config)?;
            let stats = model
                .merge_model(&other, gamma.unwrap_or(config.mix.gamma))
                .context("merging models")?;
            let format = format.unwrap_or_else(|| config.mix.format.clone());
            ModelReadWrite::with_config(&out, &config)
                .write(&model, &format)
                .with_context(|| format!("writing {}", out.display()))?;
            println!("{stats}");
        }
        Command::Mix {
            text_model,
            speaker_model,
            out,
            gamma,
            format,
        } => {
            let mut mixer = ModelMixer::new(config.clone());
            mixer
                .read(&text_model, &speaker_model)
                .context("reading models to mix")?;
            let format = format.unwrap_or_else(|| config.mix.format.clone());
            let stats = mixer
                .mix(&out, &format, gamma.unwrap_or(config.mix.gamma))
                .with_context(|| format!("mixing into {}", out.display()))?;
            println!("{stats}");
        }
        Command::Monophones { folder, out } => {
            let model = read(&folder, &config)?.extract_monophones()?;
            ModelReadWrite::with_config(&out, &config)
                .write(&model, &config.mix.format)
                .with_context(|| format!("writing {}", out.display()))?;
            println!("{} monophones", model.hmms().len());
        }
    }
    Ok(())
}

fn read(folder: &Path, config: &EngineConfig) -> Result<AcousticModel> {
    ModelReadWrite::with_config(folder, config)
        .read()
        .with_context(|| format!("reading {}", folder.display()))
}

fn print_info(model: &AcousticModel) {
    let kind = model.get_mfcc_parameter_kind();
    println!("name:           {}", model.name);
    println!("parameter kind: {}", if kind.is_empty() { "-" } else { kind.as_str() });
    println!("macros:         {}", model.macros().len());
    println!("hmms:           {}", model.hmms().len());
    println!("observed units: {}", model.tiedlist().observed_len());
    println!("tied units:     {}", model.tiedlist().tied_len());
    println!("phone mappings: {}", model.repl().len());
}
