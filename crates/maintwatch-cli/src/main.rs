//! CLI for maintwatch: predictive maintenance from machine telemetry.

mod commands;
mod dashboard;
mod tui;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::PipelineArgs;

#[derive(Parser)]
#[command(name = "maintwatch")]
#[command(about = "maintwatch — rolling-window telemetry features and maintenance predictions")]
#[command(version = maintwatch_core::VERSION)]
struct Cli {
    /// JSON config file (keys of MonitorConfig; env MAINTWATCH_* and flags override it)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP telemetry server with a background sampling task
    Serve {
        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Bind address
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },

    /// Poll the sampler and print readings with the rolling-window features
    Sample {
        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Number of readings to take
        #[arg(long, default_value = "10")]
        count: usize,

        /// Print one JSON object per reading
        #[arg(long)]
        json: bool,
    },

    /// Classify one feature vector with the configured artifact
    Predict {
        /// Classifier artifact (default: config model_path)
        #[arg(long)]
        model: Option<PathBuf>,

        /// Feature vector as a JSON object; overrides the individual flags
        #[arg(long)]
        features: Option<String>,

        #[arg(long)]
        mean_vibration: Option<f64>,

        #[arg(long)]
        std_vibration: Option<f64>,

        #[arg(long)]
        temp_difference: Option<f64>,

        #[arg(long)]
        pressure_diff: Option<f64>,
    },

    /// Load an artifact and run the startup self-check
    CheckModel {
        /// Classifier artifact (default: config model_path)
        model: Option<PathBuf>,
    },

    /// Record readings to a session directory for offline replay
    Record {
        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Maximum recording duration (e.g. "5m", "30s", "1h")
        #[arg(long)]
        duration: Option<String>,

        /// Metadata tags as key:value pairs
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Session note
        #[arg(long)]
        note: Option<String>,

        /// Output directory (default: ./sessions/)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Replay a recorded session through the feature window and the classifier
    Replay {
        /// Session directory written by `record`
        session: PathBuf,

        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Print one JSON object per reading
        #[arg(long)]
        json: bool,
    },

    /// Live dashboard polling a running server
    Dashboard {
        /// Server base URL (default: derived from config host/port)
        #[arg(long)]
        url: Option<String>,

        /// Refresh interval in milliseconds (default: config sample_interval_ms)
        #[arg(long)]
        refresh_ms: Option<u64>,

        /// Print one line per refresh instead of the terminal UI
        #[arg(long)]
        plain: bool,

        /// Feature window length in seconds
        #[arg(long)]
        window_seconds: Option<u64>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = commands::load_config(cli.config.as_deref());

    match cli.command {
        Commands::Serve {
            pipeline,
            host,
            port,
        } => {
            pipeline.apply(&mut config);
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            commands::serve::run(&config, pipeline.remote.as_deref());
        }
        Commands::Sample {
            pipeline,
            count,
            json,
        } => {
            pipeline.apply(&mut config);
            commands::sample::run(&config, pipeline.remote.as_deref(), count, json);
        }
        Commands::Predict {
            model,
            features,
            mean_vibration,
            std_vibration,
            temp_difference,
            pressure_diff,
        } => {
            if let Some(model) = model {
                config.model_path = model;
            }
            let input = commands::predict::PredictInput {
                json: features,
                fields: [mean_vibration, std_vibration, temp_difference, pressure_diff],
            };
            commands::predict::run(&config, input);
        }
        Commands::CheckModel { model } => {
            let path = model.unwrap_or_else(|| config.model_path.clone());
            commands::check_model::run(&path);
        }
        Commands::Record {
            pipeline,
            duration,
            tags,
            note,
            output,
        } => {
            pipeline.apply(&mut config);
            commands::record::run(commands::record::RecordCommandConfig {
                config: &config,
                remote: pipeline.remote.as_deref(),
                duration: duration.as_deref(),
                tags: &tags,
                note: note.as_deref(),
                output,
            });
        }
        Commands::Replay {
            session,
            pipeline,
            json,
        } => {
            pipeline.apply(&mut config);
            commands::replay::run(&config, &session, json);
        }
        Commands::Dashboard {
            url,
            refresh_ms,
            plain,
            window_seconds,
        } => {
            if let Some(ms) = refresh_ms {
                config.sample_interval_ms = ms;
            }
            if let Some(w) = window_seconds {
                config.window_seconds = w;
            }
            let url = url.unwrap_or_else(|| config.base_url());
            commands::dashboard::run(&config, &url, plain);
        }
    }
}
