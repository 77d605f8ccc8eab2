use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use jlens_index::SearchType;
use jlens_maven::{MavenConfigLayer, Scope};

mod commands;
mod config;
mod logging;
mod render;
mod telemetry;

use config::{ConfigLayer, JlensConfig};
use logging::{LogLevel, LoggingConfigLayer};

#[derive(Parser, Debug)]
#[command(name = "jlens")]
#[command(about = "Resolve Maven modules and Java class names", long_about = None, version)]
struct Cli {
    /// Configuration file (defaults to ./jlens.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn or error
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Emit logs as JSON on stderr
    #[arg(long, global = true)]
    log_json: bool,

    /// Maven executable; enables resolution through `mvn dependency:list`
    #[arg(long, global = true)]
    mvn: Option<PathBuf>,

    /// Local repository root (defaults to ~/.m2/repository)
    #[arg(long, global = true)]
    local_repository: Option<PathBuf>,

    /// Pass --offline to the Maven executable
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn layer(&self) -> ConfigLayer {
        ConfigLayer {
            maven: MavenConfigLayer {
                executable: self.mvn.clone().map(Some),
                local_repository: self.local_repository.clone().map(Some),
                offline: self.offline.then_some(true),
                ..MavenConfigLayer::default()
            },
            logging: LoggingConfigLayer {
                level: self.log_level,
                json: self.log_json.then_some(true),
            },
            max_concurrent_archives: None,
        }
    }
}

/// Which module to resolve and how.
#[derive(Args, Debug, Clone)]
struct ModuleArgs {
    /// Build descriptor; searched upwards from the working directory if omitted
    #[arg(long, short = 'f')]
    pom: Option<PathBuf>,

    /// Dependency scope to resolve
    #[arg(long, default_value_t = Scope::Compile)]
    scope: Scope,

    /// Active profiles (repeatable or comma separated)
    #[arg(long = "profile", short = 'P', value_delimiter = ',')]
    profiles: Vec<String>,

    /// Skip the Maven executable and parse the descriptor directly
    #[arg(long)]
    direct: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve a module and print its context
    Module {
        #[command(flatten)]
        module: ModuleArgs,
        /// Emit machine-readable JSON
        #[arg(long)]
        json: bool,
    },
    /// List the dependencies of a module
    Deps {
        #[command(flatten)]
        module: ModuleArgs,
        /// Only show dependencies declared with this scope
        #[arg(long)]
        only: Option<Scope>,
        /// Only show dependencies whose archive is missing locally
        #[arg(long)]
        missing: bool,
        #[arg(long)]
        json: bool,
    },
    /// Build the class index of a module and summarize it
    Index {
        #[command(flatten)]
        module: ModuleArgs,
        #[arg(long)]
        json: bool,
    },
    /// Search indexed classes by simple name
    Search {
        #[command(flatten)]
        module: ModuleArgs,
        /// Pattern matched against simple class names
        pattern: String,
        /// exact, prefix, suffix, contains or wildcard
        #[arg(long = "type", default_value_t = SearchType::Wildcard)]
        search_type: SearchType,
        #[arg(long, default_value_t = 50)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Resolve unqualified class names against a module's classpath
    ResolveClass {
        #[command(flatten)]
        module: ModuleArgs,
        /// Simple class names to resolve
        #[arg(required = true)]
        names: Vec<String>,
        /// Import statement in scope (repeatable)
        #[arg(long = "import")]
        imports: Vec<String>,
        /// Package of the referencing source file
        #[arg(long)]
        package: Option<String>,
        /// Java source whose imports and package are used
        #[arg(long)]
        source: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    if let Err(error) = real_main() {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<()> {
    let cli = Cli::parse();
    let working_dir = std::env::current_dir().context("failed to determine working directory")?;

    let env_layer = ConfigLayer::from_env(|name| std::env::var(name).ok())
        .context("invalid JLENS_* environment variable")?;
    let config = JlensConfig::load(cli.config.as_deref(), &working_dir)?
        .with_layers(&[env_layer, cli.layer()]);
    telemetry::init(&config.logging);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(commands::run(cli.command, config, working_dir))
}
