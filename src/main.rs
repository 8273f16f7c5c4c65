use std::time::Duration;

use clap::{Parser, Subcommand};
use roll_optimizer::render;
use roll_optimizer::roll_finder::{self, Orientation};
use roll_optimizer::solver::Solver;
use roll_optimizer::types::{NestConfig, PanelDemand};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "roll_optimizer",
    about = "Tiles oversized panels and nests them on a roll of fixed width"
)]
struct Cli {
    /// Log search progress to stderr
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Nest panels on a roll and report the consumed length
    Nest(NestArgs),
    /// Rank stock roll widths for a single artwork
    FindRoll {
        /// Artwork dimensions in cm (WxH, e.g. 120x80)
        #[arg(long)]
        artwork: String,
    },
}

#[derive(clap::Args)]
struct NestArgs {
    /// Roll width in cm
    #[arg(long, default_value_t = NestConfig::DEFAULT_ROLL_WIDTH)]
    roll_width: f64,

    /// Seam overlap between tiles in cm
    #[arg(long, default_value_t = NestConfig::DEFAULT_OVERLAP)]
    overlap: f64,

    /// Number of optimization passes
    #[arg(long, default_value_t = NestConfig::DEFAULT_PASSES)]
    passes: usize,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Limit the available roll length in cm
    #[arg(long)]
    roll_length: Option<f64>,

    /// Stop starting new passes after this many milliseconds
    #[arg(long)]
    time_limit_ms: Option<u64>,

    /// Run passes on a single thread
    #[arg(long)]
    serial: bool,

    /// Panels as WxH:qty in cm (e.g. 300x50:1 80x40:3)
    #[arg(long = "panels", num_args = 1.., required = true)]
    panels: Vec<String>,

    /// Show ASCII layout of the roll
    #[arg(long)]
    layout: bool,

    /// Print the solution as JSON
    #[arg(long)]
    json: bool,
}

fn parse_dimensions(s: &str) -> Result<(f64, f64), String> {
    let parts: Vec<&str> = s.split('x').collect();
    if parts.len() != 2 {
        return Err(format!("invalid dimensions '{}', expected WxH", s));
    }
    let width = parts[0]
        .parse::<f64>()
        .map_err(|_| format!("invalid width in '{}'", s))?;
    let height = parts[1]
        .parse::<f64>()
        .map_err(|_| format!("invalid height in '{}'", s))?;
    if !(width.is_finite() && width > 0.0 && height.is_finite() && height > 0.0) {
        return Err(format!("dimensions must be positive and finite in '{}'", s));
    }
    Ok((width, height))
}

fn parse_panel(id: u32, s: &str) -> Result<PanelDemand, String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 2 {
        return Err(format!("invalid panel '{}', expected WxH:qty", s));
    }
    let (width, height) = parse_dimensions(parts[0])?;
    let quantity = parts[1]
        .parse::<u32>()
        .map_err(|_| format!("invalid quantity in '{}'", s))?;
    Ok(PanelDemand::new(id, width, height, quantity))
}

fn fail(e: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", e);
    std::process::exit(1);
}

fn run_nest(args: NestArgs) {
    let demands: Vec<PanelDemand> = args
        .panels
        .iter()
        .enumerate()
        .map(|(i, p)| parse_panel(i as u32 + 1, p))
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|e| fail(e));

    let config = NestConfig {
        roll_width: args.roll_width,
        overlap: args.overlap,
        passes: args.passes,
        seed: args.seed,
        roll_length: args.roll_length,
        time_limit: args.time_limit_ms.map(Duration::from_millis),
        parallel: !args.serial && cfg!(feature = "parallel"),
    };

    let solution = Solver::new(config, demands)
        .solve()
        .unwrap_or_else(|e| fail(e));

    if args.json {
        match serde_json::to_string_pretty(&solution) {
            Ok(json) => println!("{}", json),
            Err(e) => fail(e),
        }
        return;
    }

    print!("{}", render::piece_table(&solution.layout));
    if args.layout {
        println!();
        print!(
            "{}",
            render::render_layout(solution.roll_width, &solution.layout)
        );
    }
    println!();
    println!(
        "Summary: {} piece{}, length {:.2} cm ({:.2} m), {:.1}% waste, best of {} pass{}",
        solution.piece_count(),
        if solution.piece_count() == 1 { "" } else { "s" },
        solution.length,
        solution.length / 100.0,
        solution.waste_percent(),
        solution.stats.passes_run,
        if solution.stats.passes_run == 1 { "" } else { "es" },
    );
}

fn run_find_roll(artwork: &str) {
    let (width, height) = parse_dimensions(artwork).unwrap_or_else(|e| fail(e));
    let options = roll_finder::find_rolls(width, height, 10);
    if options.is_empty() {
        fail(format!("artwork {} does not fit any roll", artwork));
    }

    println!(
        "{:>10}  {:<12}  {:>12}  {:>14}",
        "Roll (cm)", "Orientation", "Length (cm)", "Waste (cm2)"
    );
    for o in &options {
        let orientation = match o.orientation {
            Orientation::Normal => "Normal",
            Orientation::Rotated => "Rotated 90",
        };
        println!(
            "{:>10.0}  {:<12}  {:>12.1}  {:>14.1}",
            o.roll_width, orientation, o.used_length, o.waste_area
        );
    }
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    match cli.command {
        Command::Nest(args) => run_nest(args),
        Command::FindRoll { artwork } => run_find_roll(&artwork),
    }
}
