use clap::{Args, Parser, Subcommand};
use forcesim_core::{analyze_graph, GraphData, Phase, Simulation, SimulationConfig};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod viewer;

/// Viewport the default center force targets
const DEFAULT_WIDTH: f64 = 928.0;
const DEFAULT_HEIGHT: f64 = 600.0;

#[derive(Parser)]
#[command(name = "forcesim")]
#[command(about = "Force-directed graph layout", long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a layout to completion and print the final positions
    Run {
        /// Path to the graph JSON file
        file: PathBuf,
        #[command(flatten)]
        layout: LayoutArgs,
        /// Stop after this many steps even if not settled
        #[arg(long, default_value_t = 10_000)]
        max_steps: u64,
        /// Print positions as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate a graph file and report every problem found
    Check {
        /// Path to the graph JSON file
        file: PathBuf,
    },
    /// Open an interactive window with draggable nodes
    View {
        /// Path to the graph JSON file
        file: PathBuf,
        #[command(flatten)]
        layout: LayoutArgs,
    },
}

/// Options shared by every command that builds a simulation
#[derive(Args)]
struct LayoutArgs {
    /// Simulation configuration JSON
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Center force target x (overrides the config file)
    #[arg(long)]
    center_x: Option<f64>,
    /// Center force target y (overrides the config file)
    #[arg(long)]
    center_y: Option<f64>,
}

impl LayoutArgs {
    /// Configuration from the file, or the defaults centered on the standard
    /// viewport, with flag overrides applied
    fn load(&self) -> Result<SimulationConfig, Box<dyn std::error::Error>> {
        let mut config = match self.config.as_deref() {
            Some(path) => {
                let text = fs::read_to_string(path)?;
                serde_json::from_str(&text)?
            }
            None => SimulationConfig::default().for_viewport(DEFAULT_WIDTH, DEFAULT_HEIGHT),
        };
        if let Some(x) = self.center_x {
            config.center.x = x;
        }
        if let Some(y) = self.center_y {
            config.center.y = y;
        }
        Ok(config)
    }
}

#[derive(Serialize)]
struct NodePosition<'a> {
    id: &'a str,
    x: f64,
    y: f64,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Run {
            file,
            layout,
            max_steps,
            json,
        } => run_file(&file, &layout, max_steps, json),
        Commands::Check { file } => check_file(&file),
        Commands::View { file, layout } => view_file(file, &layout),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_file(
    file: &Path,
    layout: &LayoutArgs,
    max_steps: u64,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = GraphData::from_json_file(file)?;
    let config = layout.load()?;
    let mut sim = Simulation::new(&data, config)?;

    while sim.steps() < max_steps {
        if sim.tick() != Phase::Running {
            break;
        }
    }
    tracing::info!(
        steps = sim.steps(),
        alpha = sim.alpha(),
        phase = ?sim.phase(),
        "layout finished"
    );

    let positions: Vec<NodePosition> = sim
        .graph()
        .nodes
        .iter()
        .map(|node| NodePosition {
            id: node.id(),
            x: node.pos.x,
            y: node.pos.y,
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&positions)?);
    } else {
        for p in positions {
            println!("{} {:.3} {:.3}", p.id, p.x, p.y);
        }
    }

    Ok(())
}

fn check_file(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let data = GraphData::from_json_file(file)?;
    let errors = analyze_graph(&data);
    if errors.is_empty() {
        println!("{}: {} nodes, {} links, ok", file.display(), data.nodes.len(), data.links.len());
        return Ok(());
    }

    for error in &errors {
        println!("{}: {}", file.display(), error);
    }
    Err(format!("{} problem(s) found", errors.len()).into())
}

fn view_file(file: PathBuf, layout: &LayoutArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = layout.load()?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([DEFAULT_WIDTH as f32, DEFAULT_HEIGHT as f32 + 40.0])
            .with_title(format!("forcesim - {}", file.display())),
        ..Default::default()
    };

    eframe::run_native(
        "forcesim",
        options,
        Box::new(move |cc| Ok(Box::new(viewer::ViewerApp::new(file, config, cc)))),
    )
    .map_err(|e| format!("viewer error: {}", e))?;

    Ok(())
}
