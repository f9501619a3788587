//! Pulse Layout CLI
//!
//! Usage:
//!   pulse-layout [OPTIONS] [FILE]
//!
//! Options:
//!   -d, --debug            Dump the layout tree and draw content boxes
//!   -p, --padding <N>      Padding around the viewBox
//!   -h, --help             Print help
//!
//! Log verbosity follows `RUST_LOG` (default `warn`).

use std::io::{self, Read};
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pulse_layout::{render_with_config, RenderConfig, SvgConfig};

#[derive(Parser)]
#[command(name = "pulse-layout")]
#[command(about = "Lay out and render timing diagrams from TOML scenes")]
struct Cli {
    /// Scene file (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// Debug mode: dump the layout tree and draw content boxes and names
    #[arg(short, long)]
    debug: bool,

    /// Padding around the viewBox
    #[arg(short, long)]
    padding: Option<f64>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let source = match &cli.input {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            let mut buffer = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut buffer) {
                eprintln!("Error reading from stdin: {}", e);
                std::process::exit(1);
            }
            buffer
        }
    };

    let mut svg = SvgConfig::default();
    if let Some(padding) = cli.padding {
        svg = svg.with_viewbox_padding(padding);
    }
    let config = RenderConfig::new().with_svg(svg).with_debug(cli.debug);

    match render_with_config(&source, config) {
        Ok(svg) => println!("{}", svg),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
