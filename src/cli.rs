use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fairway")]
#[command(author, version, about = "Hole imagery service: uploads, AI stylization, and display selection")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server and the stylization queue
    Start {
        /// Host to bind to (defaults to the config value)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (defaults to the config value)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run one stylization job inline and print its outcome
    Stylize {
        /// Hole to stylize
        hole_id: String,

        /// Upload to stylize; without it the hole's layout is used
        #[arg(long)]
        image: Option<String>,
    },

    /// Crop an image file the way the upload client does
    Crop {
        /// Image to crop
        input: PathBuf,

        /// Where to write the cropped file
        #[arg(short, long)]
        out: PathBuf,

        /// Aspect ratio as "w:h" or a decimal
        #[arg(long, default_value = "3:4")]
        aspect: String,

        /// Zoom factor, clamped to 1..=3
        #[arg(long, default_value_t = 1.0)]
        zoom: f64,

        /// Horizontal pan in viewport pixels
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        offset_x: f64,

        /// Vertical pan in viewport pixels
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        offset_y: f64,

        /// Container width the viewport is fitted into
        #[arg(long, default_value_t = 640.0)]
        viewport_width: f64,

        /// Height available to the viewport
        #[arg(long, default_value_t = 800.0)]
        viewport_height: f64,
    },

    /// Create a course and its holes
    AddCourse {
        name: String,
        location: String,

        /// 9 or 18
        #[arg(long, default_value_t = 18)]
        holes: i64,

        /// Style seed shared by the course's stylized images
        #[arg(long)]
        seed: Option<i64>,

        #[arg(long)]
        description: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
