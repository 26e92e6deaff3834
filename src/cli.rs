use crate::config::load_config;
use crate::ir::{Diagram, Orientation};
use crate::layout::{LayoutOptions, compute_layout};
use crate::layout_dump::{LayoutDump, write_layout_dump};
use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dlay", version, about = "Orthogonal diagram layout engine")]
pub struct Args {
    /// Input diagram (.json) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file for the layout dump. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Config file (JSON5, camelCase keys)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Direction layers advance in
    #[arg(long = "orientation", value_enum, default_value = "landscape")]
    pub orientation: OrientationArg,

    /// Viewport width used to centre portrait layouts
    #[arg(short = 'w', long = "viewportWidth")]
    pub viewport_width: Option<f32>,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG wins.
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OrientationArg {
    Landscape,
    Portrait,
}

impl From<OrientationArg> for Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Landscape => Orientation::Landscape,
            OrientationArg::Portrait => Orientation::Portrait,
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = load_config(args.config.as_deref())?;
    let input = read_input(args.input.as_deref())?;
    let diagram = Diagram::from_json_str(&input).context("failed to load diagram")?;

    let options = LayoutOptions {
        orientation: args.orientation.into(),
        viewport_width: args.viewport_width,
    };
    let layout = compute_layout(&diagram, &options, &config);
    tracing::info!(
        nodes = layout.flat_nodes().len(),
        connections = layout.connections.len(),
        dropped = layout.dropped_connections.len(),
        "layout complete"
    );
    for index in &layout.dropped_connections {
        if let Some(conn) = diagram.connections.get(*index) {
            tracing::warn!(index, from = %conn.from, to = %conn.to, "connection references unknown node");
        }
    }

    match args.output.as_deref() {
        Some(path) => write_layout_dump(path, &layout)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => {
            let json = LayoutDump::from_layout(&layout).to_json()?;
            let mut stdout = io::stdout().lock();
            stdout.write_all(json.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    // A second install (e.g. from tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()));
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}
