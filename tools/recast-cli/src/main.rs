//! Recast CLI: Turn recorded conferencing sessions into editable projects.
//!
//! Usage:
//!   recast export <SESSION> <OUTPUT>   Assemble a session into a GES project
//!   recast plan <SESSION>              Print the assembled layers and clips
//!   recast info <SESSION>              Show session information
//!   recast validate <SESSION>          Check that referenced media exists

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use recast_common::config::{AppConfig, AssemblyConfig, CreditSpec, WebcamCorner};

mod commands;

#[derive(Parser)]
#[command(
    name = "recast",
    about = "Convert recorded web-conference sessions into editable video projects",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble a session and write a GES project
    Export {
        /// Path to the session directory
        session: PathBuf,

        /// Output project file (.xges)
        output: PathBuf,

        #[command(flatten)]
        assembly: AssemblyArgs,

        /// Directory for generated composites (defaults to the session)
        #[arg(long)]
        work_dir: Option<PathBuf>,
    },

    /// Assemble a session and print the resulting timeline
    Plan {
        /// Path to the session directory
        session: PathBuf,

        #[command(flatten)]
        assembly: AssemblyArgs,

        /// Print the composition as JSON
        #[arg(long)]
        json: bool,

        /// Directory for generated composites (defaults to the session)
        #[arg(long)]
        work_dir: Option<PathBuf>,
    },

    /// Show session information
    Info {
        /// Path to the session directory
        session: PathBuf,
    },

    /// Validate a session directory
    Validate {
        /// Path to the session directory
        session: PathBuf,
    },
}

/// Per-run overrides of the configured assembly settings.
#[derive(Args, Debug, Default)]
struct AssemblyArgs {
    /// Start point in the recording (seconds, or mm:ss, hh:mm:ss, dd:hh:mm:ss)
    #[arg(long, value_name = "TIME", value_parser = parse_timecode)]
    start: Option<f64>,

    /// End point in the recording
    #[arg(long, value_name = "TIME", value_parser = parse_timecode)]
    end: Option<f64>,

    /// Video width
    #[arg(long)]
    width: Option<u32>,

    /// Video height
    #[arg(long)]
    height: Option<u32>,

    /// Share of the width reserved for the camera, in percent
    #[arg(long, value_name = "PERCENT")]
    webcam_size: Option<u32>,

    /// Crop webcam to 16:9 aspect ratio
    #[arg(long)]
    crop_webcam: bool,

    /// Stretch webcam to 16:9 aspect ratio
    #[arg(long)]
    stretch_webcam: bool,

    /// Corner for the camera: top-left, top-right, bottom-left, bottom-right
    #[arg(long)]
    webcam_corner: Option<WebcamCorner>,

    /// Backdrop image for the project
    #[arg(long, value_name = "FILE")]
    backdrop: Option<PathBuf>,

    /// File to use as opening credits (may be repeated)
    #[arg(long, value_name = "FILE[:DURATION]")]
    opening_credits: Vec<CreditSpec>,

    /// File to use as closing credits (may be repeated)
    #[arg(long, value_name = "FILE[:DURATION]")]
    closing_credits: Vec<CreditSpec>,

    /// Add annotations to slides
    #[arg(long)]
    annotations: bool,

    /// Do not draw the presenter's cursor
    #[arg(long)]
    no_cursor: bool,

    /// Image to use as the cursor dot
    #[arg(long, value_name = "FILE")]
    cursor_dot: Option<PathBuf>,
}

impl AssemblyArgs {
    /// Layer these arguments over the configured defaults.
    fn apply(self, mut config: AssemblyConfig) -> AssemblyConfig {
        if let Some(start) = self.start {
            config.start_secs = start;
        }
        if self.end.is_some() {
            config.end_secs = self.end;
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(percent) = self.webcam_size {
            config.webcam_size_percent = percent;
        }
        config.crop_webcam |= self.crop_webcam;
        config.stretch_webcam |= self.stretch_webcam;
        if let Some(corner) = self.webcam_corner {
            config.webcam_corner = corner;
        }
        if self.backdrop.is_some() {
            config.backdrop = self.backdrop;
        }
        if !self.opening_credits.is_empty() {
            config.opening_credits = self.opening_credits;
        }
        if !self.closing_credits.is_empty() {
            config.closing_credits = self.closing_credits;
        }
        config.annotations |= self.annotations;
        if self.no_cursor {
            config.cursor = false;
        }
        if self.cursor_dot.is_some() {
            config.cursor_dot = self.cursor_dot;
        }
        config
    }
}

fn parse_timecode(value: &str) -> Result<f64, String> {
    recast_common::parse_time(value).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let app_config = AppConfig::load();

    // Initialize logging
    let mut logging = app_config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    recast_common::logging::init_logging(&logging)?;

    match cli.command {
        Commands::Export {
            session,
            output,
            assembly,
            work_dir,
        } => {
            let config = assembly.apply(app_config.assembly);
            commands::export::run(session, output, config, work_dir).await
        }
        Commands::Plan {
            session,
            assembly,
            json,
            work_dir,
        } => {
            let config = assembly.apply(app_config.assembly);
            commands::plan::run(session, config, json, work_dir)
        }
        Commands::Info { session } => commands::info::run(session),
        Commands::Validate { session } => commands::validate::run(session),
    }
}
