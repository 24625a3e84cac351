//! vodframes CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vodframes::{
    commands::{
        cmd_clip, cmd_init, cmd_locate, cmd_recover, cmd_status, print_clip_result,
        print_location, print_recovery_stats, print_status, RecoverOptions,
    },
    config::Config,
    error::Result,
    progress::LogWriterFactory,
};

#[derive(Parser)]
#[command(name = "vodframes")]
#[command(version, about = "Recover missing stream frames from archived broadcasts", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Recover the frames listed in <IMAGE_DIR>/missing.txt
    Recover {
        /// Directory holding missing.txt and the frame artifacts
        image_dir: PathBuf,

        /// Event log database (frame id -> logged time)
        input_db: PathBuf,

        /// Broadcast index database
        broadcast_db: PathBuf,

        /// Tesseract trained data directory
        #[arg(long, env = "VODFRAMES_TESSDATA")]
        tesseract_data_dir: Option<String>,

        /// Tesseract language / model
        #[arg(long)]
        tesseract_language: Option<String>,

        /// Tesseract config restricting output to digits
        #[arg(long)]
        tesseract_digits: Option<String>,

        /// Playlist cache directory
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },

    /// Download the segment covering a point in time
    Clip {
        /// Broadcast index database
        broadcast_db: PathBuf,

        /// Time to fetch (ISO-8601, UTC unless an offset is given)
        time: String,

        /// Output file
        output: PathBuf,
    },

    /// Show which broadcast and segment cover a point in time
    Locate {
        /// Broadcast index database
        broadcast_db: PathBuf,

        /// Time to look up (ISO-8601, UTC unless an offset is given)
        time: String,
    },

    /// Show recovery progress of an image directory
    Status {
        /// Directory holding missing.txt and the frame artifacts
        image_dir: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(LogWriterFactory))
        .with(filter)
        .init();

    match cli.command {
        Commands::Init { force } => {
            let path = cli.config.unwrap_or_else(Config::default_config_path);
            let written = cmd_init(&path, force).await?;
            println!("✓ Wrote default configuration to {}", written.display());
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "vodframes", &mut std::io::stdout());
        }

        Commands::Recover {
            image_dir,
            input_db,
            broadcast_db,
            tesseract_data_dir,
            tesseract_language,
            tesseract_digits,
            cache_dir,
        } => {
            let mut config = Config::load_or_default(cli.config.as_deref())?;
            if let Some(dir) = tesseract_data_dir {
                config.ocr.data_dir = dir;
            }
            if let Some(language) = tesseract_language {
                config.ocr.language = language;
            }
            if let Some(digits) = tesseract_digits {
                config.ocr.digits_config = digits;
            }
            if let Some(dir) = cache_dir {
                config.cache_dir = dir;
            }

            let options = RecoverOptions {
                image_dir,
                input_db,
                broadcast_db,
            };
            let stats = cmd_recover(&config, options).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_recovery_stats(&stats);
            }
        }

        Commands::Clip {
            broadcast_db,
            time,
            output,
        } => {
            let config = Config::load_or_default(cli.config.as_deref())?;
            let result = cmd_clip(&config, &broadcast_db, &time, &output).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_clip_result(&result);
            }
        }

        Commands::Locate { broadcast_db, time } => {
            let config = Config::load_or_default(cli.config.as_deref())?;
            let location = cmd_locate(&config, &broadcast_db, &time).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&location)?);
            } else {
                print_location(&location);
            }
        }

        Commands::Status { image_dir } => {
            let status = cmd_status(&image_dir).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }
    }

    Ok(())
}
