//! rectpack command-line packer

use anyhow::Context;
use clap::{ArgAction, Parser};
use rectpack_cli::{load_config, InstanceParser, ResultWriter};
use rectpack_core::{Config, SolveSummary, Strategy};
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rectpack")]
#[command(about = "Packs rectangles into a bounding box of minimal area")]
#[command(version)]
struct Cli {
    /// Instance file (reads standard input when omitted)
    input: Option<PathBuf>,

    /// Output file for the placement (writes standard output when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Search strategy: auto, greedy, bounding-box, tradeoff, fixed-height,
    /// genetic, polish-genetic
    #[arg(short, long, value_parser = parse_strategy)]
    strategy: Option<Strategy>,

    /// Wall-clock limit in seconds [default: 300]
    #[arg(short, long)]
    time_limit: Option<u64>,

    /// Seconds kept back at the end of the limit to stop the search [default: 5]
    #[arg(long)]
    reserve: Option<u64>,

    /// Random seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// JSON configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write a JSON summary of the run to this file
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Repeat the instance before the placement
    #[arg(long)]
    echo: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn parse_strategy(value: &str) -> Result<Strategy, String> {
    value.parse().map_err(|e: rectpack_core::Error| e.to_string())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("cannot read configuration {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(strategy) = cli.strategy {
        config.strategy = strategy;
    }
    if let Some(seconds) = cli.time_limit {
        config.time_limit_ms = seconds.saturating_mul(1_000);
    }
    if let Some(seconds) = cli.reserve {
        config.reserve_ms = seconds.saturating_mul(1_000);
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    Ok(config)
}

fn read_input(path: Option<&PathBuf>) -> io::Result<String> {
    match path {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = build_config(&cli)?;

    let text = read_input(cli.input.as_ref()).context("cannot read the instance")?;
    let instance = match InstanceParser::new().parse_str(&text) {
        Ok(instance) => instance,
        Err(e) => {
            log::error!("no instance: {e}");
            return Ok(());
        }
    };

    let result = match rectpack_packing::solve(&instance, &config) {
        Ok(result) => result,
        Err(e) => {
            log::error!("packing failed: {e}");
            return Ok(());
        }
    };
    let Some(best) = &result.best else {
        log::error!("no packing found");
        return Ok(());
    };

    let writer = ResultWriter::new().with_echo(cli.echo);
    match &cli.output {
        Some(path) => {
            let mut file = fs::File::create(path)
                .with_context(|| format!("cannot create {}", path.display()))?;
            writer.write(&mut file, best)?;
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            writer.write(&mut lock, best)?;
            lock.flush()?;
        }
    }

    if let Some(path) = &cli.summary {
        let summary = SolveSummary::from(&result);
        let json = serde_json::to_string_pretty(&summary)?;
        fs::write(path, json).with_context(|| format!("cannot write {}", path.display()))?;
    }
    log::info!(
        "{} rectangles in {}x{} ({} used, {})",
        instance.size(),
        best.width(),
        best.height(),
        result.utilization_percent(),
        result.status
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "rectpack",
            "input.txt",
            "--strategy",
            "tradeoff",
            "--time-limit",
            "60",
            "--reserve",
            "2",
            "--seed",
            "9",
            "-vv",
        ]);
        assert_eq!(cli.verbose, 2);
        let config = build_config(&cli).unwrap();
        assert_eq!(config.strategy, Strategy::Tradeoff);
        assert_eq!(config.time_limit_ms, 60_000);
        assert_eq!(config.reserve_ms, 2_000);
        assert_eq!(config.seed, Some(9));
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["rectpack"]);
        assert!(cli.input.is_none());
        let config = build_config(&cli).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.time_limit_ms, 300_000);
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        assert!(Cli::try_parse_from(["rectpack", "--strategy", "annealing"]).is_err());
    }
}
