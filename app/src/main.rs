use std::path::Path;

use clap::{Parser, Subcommand};
use common::{
    config::Config,
    plot::{PlotOutcome, plot},
};
use eyre::{Context, Result};
use tokio::fs::{read_to_string, try_exists};
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter,
    fmt::{layer, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const DEFAULT_CONFIG: &str = "plots.yaml";

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    #[arg(short, long)]
    log: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured plots and the files they write
    Ls {
        #[arg(short, long)]
        config_file: Option<String>,
    },
    /// Generate plots
    Plot {
        /// Defaults to plots.yaml, or the built-in batch if that is missing
        #[arg(short, long)]
        config_file: Option<String>,
    },
    /// Print the reshaped data of every plot
    Print {
        #[arg(short, long)]
        config_file: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let log_level = std::env::var("RUST_LOG").unwrap_or("warn".to_owned());
    let args = Cli::parse();
    let file_appender = tracing_appender::rolling::never(".", "bench-plots.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let mut env_filter = EnvFilter::new(format!("bench_plots={log_level}"));

    if !args.log.is_empty() {
        for log in &args.log {
            env_filter = env_filter.add_directive(log.parse()?);
        }
    }

    for module in default_plots::PLOT_MODULES {
        if !args.log.iter().any(|x| x.starts_with(module)) {
            env_filter = env_filter.add_directive(format!("{module}={log_level}").parse()?);
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            layer()
                .with_timer(ChronoLocal::new("%v %k:%M:%S %z".to_owned()))
                .compact(),
        )
        .with(layer().with_writer(non_blocking))
        .init();

    default_plots::init_plots();

    match args.command.unwrap_or(Commands::Plot { config_file: None }) {
        Commands::Ls { config_file } => list_plots(&load_config(config_file).await?),
        Commands::Plot { config_file } => run_plots(&load_config(config_file).await?).await?,
        Commands::Print { config_file } => print_data(&load_config(config_file).await?).await?,
    };

    Ok(())
}

async fn load_config(config_file: Option<String>) -> Result<Config> {
    let path = match config_file {
        Some(path) => path,
        None => {
            if !try_exists(DEFAULT_CONFIG).await? {
                info!("No {DEFAULT_CONFIG}, using the built-in plots");
                return Ok(default_plots::default_config());
            }
            DEFAULT_CONFIG.to_owned()
        }
    };
    let data = read_to_string(Path::new(&path))
        .await
        .context(format!("Read {path}"))?;
    Config::from_yaml(&data)
}

fn list_plots(config: &Config) {
    println!("{}:", config.name);
    for item in &config.plots {
        println!("{} -> {}", item.name(), item.outputs().join(", "));
    }
}

async fn run_plots(config: &Config) -> Result<()> {
    info!("Running {} ({} plots)", config.name, config.plots.len());
    let outcomes = match plot(config).await {
        Ok(outcomes) => outcomes,
        Err(err) => {
            error!("{err:#?}");
            return Err(err);
        }
    };

    let generated = outcomes
        .iter()
        .map(|outcome| match outcome {
            PlotOutcome::Generated(paths) => paths.len(),
            PlotOutcome::Skipped { .. } => 0,
        })
        .sum::<usize>();
    info!("{generated} images written to {}", config.settings.output_dir.display());
    Ok(())
}

async fn print_data(config: &Config) -> Result<()> {
    for item in &config.plots {
        match item.dump(&config.settings).await? {
            Some(data) => println!(
                "{}: {}",
                item.name(),
                serde_json::to_string_pretty(&data)?
            ),
            None => println!("{}: no data", item.name()),
        }
    }
    Ok(())
}
