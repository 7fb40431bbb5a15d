#[cfg(feature = "line")]
mod line_mode;
mod logging;
#[cfg(feature = "tui")]
mod render_help;
#[cfg(feature = "tui")]
mod tui_mode;

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use tabcalc::config::Config;
use tabcalc::format::{format_number, DecimalPolicy, Grouping};
use tabcalc::{evaluate_traced, EvaluationTrace};
use tracing::info;

#[derive(Parser)]
#[command(name = "tabcalc")]
#[command(about = "Calculator with a running tab", long_about = None)]
struct Cli {
    /// Expression to evaluate once, e.g. `tabcalc 100-5%`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    expression: Vec<String>,

    /// Print every evaluation step
    #[arg(long)]
    details: bool,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Use the line editor instead of the full-screen interface
    #[arg(long)]
    line: bool,

    /// Write the effective config back to its file and exit
    #[arg(long)]
    write_config: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);
    logging::init(&log_dir(&config_path));

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };

    if cli.write_config {
        config.save_to(&config_path)?;
        println!("Wrote {}", config_path.display());
        return Ok(());
    }

    if !cli.expression.is_empty() {
        run_once(&cli);
        return Ok(());
    }

    info!(line = cli.line, "starting interactive mode");
    run_interactive(&cli, config)
}

/// The log file sits next to whichever config file is in use.
fn log_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Prints the bare number so the output can be fed to other tools.
fn run_once(cli: &Cli) {
    let expr = cli.expression.join(" ");
    let mut trace = EvaluationTrace::new(cli.details);

    // malformed input prints 0, like the live preview
    let result = match evaluate_traced(&expr, &mut trace) {
        Ok(result) => result,
        Err(e) => {
            if cli.details {
                eprintln!("Error: {}", e);
            }
            0.0
        }
    };

    for (i, step) in trace.steps.iter().enumerate() {
        println!("Step {}: {} = {}", i + 1, step.operation, step.result);
    }
    println!("{}", format_number(result, DecimalPolicy::Auto, Grouping::None));
}

fn run_interactive(cli: &Cli, config: Config) -> Result<()> {
    #[cfg(feature = "line")]
    if cli.line || !cfg!(feature = "tui") {
        return line_mode::run_line(config);
    }

    #[cfg(feature = "tui")]
    {
        let _ = cli;
        tui_mode::run_tui(config)
    }

    #[cfg(not(feature = "tui"))]
    {
        let _ = (cli, config);
        anyhow::bail!("built without an interactive front-end; pass an expression instead")
    }
}
