use std::env;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing::debug;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use wiregraph_core::config::{Config, CONFIG_FILE};
use wiregraph_core::pipeline::{AnalysisPipeline, FullAnalysis};
use wiregraph_core::Granularity;
use wiregraph_java::JavaAnalyzer;
use wiregraph_report::{dot, json, text};
use wiregraph_xml::XmlBeansAnalyzer;

#[derive(Parser)]
#[command(name = "wiregraph")]
#[command(about = "Find import cycles, DI wiring cycles and coupling hot spots")]
#[command(version)]
struct Cli {
    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum GraphKind {
    Imports,
    Wiring,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a project and print a full report
    Analyze {
        /// Path to the project root
        path: PathBuf,
        /// Config file path (defaults to .wiregraph.toml in the project or an ancestor)
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
        /// Single-line JSON
        #[arg(long)]
        compact: bool,
        /// Import graph node granularity: package or type
        #[arg(long)]
        granularity: Option<String>,
        /// Reuse cached facts for unchanged files
        #[arg(long)]
        incremental: bool,
    },
    /// Analyze and exit with code 0 (pass) or 1 (fail)
    Check {
        /// Path to the project root
        path: PathBuf,
        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
        #[arg(long)]
        compact: bool,
    },
    /// Print a GraphViz DOT diagram of one graph
    Diagram {
        /// Path to the project root
        path: PathBuf,
        #[arg(long, value_enum, default_value = "wiring")]
        graph: GraphKind,
        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Create a default .wiregraph.toml configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Analyze {
            path,
            config,
            format,
            compact,
            granularity,
            incremental,
        } => cmd_analyze(
            &path,
            config.as_deref(),
            format,
            compact,
            granularity.as_deref(),
            incremental,
        ),
        Commands::Check {
            path,
            config,
            format,
            compact,
        } => cmd_check(&path, config.as_deref(), format, compact),
        Commands::Diagram {
            path,
            graph,
            config,
        } => cmd_diagram(&path, graph, config.as_deref()),
        Commands::Init { force } => cmd_init(force),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(2);
    }
}

/// Logs go to stderr; `WIREGRAPH_LOG` overrides the level, `WIREGRAPH_LOG_FORMAT=json` the format.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("WIREGRAPH_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "wiregraph=debug"
        } else {
            "wiregraph=warn"
        })
    });

    let format = env::var("WIREGRAPH_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn cmd_analyze(
    path: &Path,
    config_path: Option<&Path>,
    format: OutputFormat,
    compact: bool,
    granularity: Option<&str>,
    incremental: bool,
) -> Result<()> {
    let mut config = load_config(path, config_path)?;
    if let Some(granularity) = granularity {
        config.graph.granularity = granularity.parse::<Granularity>()?;
    }
    let report_config = config.report.clone();
    let analysis = run_analysis(path, config, incremental)?;

    let report = match format {
        OutputFormat::Text => text::format_report(&analysis.summary, &report_config),
        OutputFormat::Json => json::format_report(&analysis.summary, compact),
    };
    println!("{report}");
    Ok(())
}

fn cmd_check(
    path: &Path,
    config_path: Option<&Path>,
    format: OutputFormat,
    compact: bool,
) -> Result<()> {
    let config = load_config(path, config_path)?;
    let report_config = config.report.clone();
    let analysis = run_analysis(path, config, false)?;

    let (report, passed) = match format {
        OutputFormat::Text => text::format_check(&analysis.summary, &report_config),
        OutputFormat::Json => json::format_check(&analysis.summary, &report_config, compact),
    };
    println!("{report}");
    if !passed {
        process::exit(1);
    }
    Ok(())
}

fn cmd_diagram(path: &Path, graph: GraphKind, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(path, config_path)?;
    let analysis = run_analysis(path, config, false)?;

    let diagram = match graph {
        GraphKind::Imports => dot::import_diagram(&analysis.import_graph),
        GraphKind::Wiring => dot::wiring_diagram(&analysis.wiring_graph),
    };
    print!("{diagram}");
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let target = PathBuf::from(CONFIG_FILE);
    if target.exists() && !force {
        anyhow::bail!("{CONFIG_FILE} already exists. Use --force to overwrite.");
    }
    std::fs::write(&target, Config::default_toml())
        .with_context(|| format!("failed to write {CONFIG_FILE}"))?;
    println!("{} {CONFIG_FILE} with default configuration.", "Created".green());
    Ok(())
}

fn load_config(project_path: &Path, config_path: Option<&Path>) -> Result<Config> {
    if !project_path.is_dir() {
        anyhow::bail!("{} is not a directory", project_path.display());
    }
    match config_path {
        Some(p) => Config::load(p),
        None => Ok(Config::load_or_default(project_path)),
    }
}

fn run_analysis(project_path: &Path, config: Config, incremental: bool) -> Result<FullAnalysis> {
    let java = JavaAnalyzer::new().context("failed to initialize Java analyzer")?;
    debug!(granularity = %config.graph.granularity, incremental, "starting analysis");

    let pipeline = AnalysisPipeline::new(
        vec![Box::new(java)],
        vec![Box::new(XmlBeansAnalyzer::new())],
        config,
    );
    if incremental {
        pipeline.analyze_incremental(project_path)
    } else {
        pipeline.analyze(project_path)
    }
}
