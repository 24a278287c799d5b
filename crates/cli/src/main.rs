mod config_commands;
mod skill_commands;

use {
    clap::{Parser, Subcommand},
    skillbridge_skills::{InstallOptions, Scope},
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "skillbridge", about = "Skillbridge: share agent skills across coding tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Custom config directory (overrides default ~/.config/skillbridge/).
    #[arg(long, global = true, env = "SKILLBRIDGE_CONFIG_DIR")]
    config_dir: Option<std::path::PathBuf>,
    /// Custom data directory (overrides default data dir).
    #[arg(long, global = true, env = "SKILLBRIDGE_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Link one or more skills into tool skills directories.
    Install {
        /// Skill slugs.
        #[arg(required = true)]
        slugs: Vec<String>,
        /// Target platform (repeatable). Defaults to the configured platforms.
        #[arg(long = "platform", short = 'p')]
        platforms: Vec<String>,
        /// Target scope: global or project (repeatable).
        #[arg(long = "scope", short = 's')]
        scopes: Vec<Scope>,
    },
    /// Remove a skill's links.
    Uninstall {
        slug: String,
        /// Remove every recorded link plus untracked links in global tool dirs.
        #[arg(long, conflicts_with_all = ["platforms", "scopes"])]
        all: bool,
        #[arg(long = "platform", short = 'p')]
        platforms: Vec<String>,
        #[arg(long = "scope", short = 's')]
        scopes: Vec<Scope>,
    },
    /// List installed skills and where they are linked.
    List {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Show supported platforms and which are present on this machine.
    Platforms,
    /// Rebuild the installation ledger from the links on disk.
    Sync,
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

impl Commands {
    /// Commands that read or write the installation ledger.
    fn uses_ledger(&self) -> bool {
        matches!(
            self,
            Self::Install { .. } | Self::Uninstall { .. } | Self::List { .. }
        )
    }
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "skillbridge starting");

    // Apply directory overrides before loading config
    if let Some(ref dir) = cli.config_dir {
        skillbridge_config::set_config_dir(dir.clone());
    }
    if let Some(ref dir) = cli.data_dir {
        skillbridge_config::set_data_dir(dir.clone());
    }

    let command = match cli.command {
        Commands::Platforms => return skill_commands::platforms(),
        Commands::Config { action } => return config_commands::handle_config(action),
        other => other,
    };

    let config = skillbridge_config::discover_and_load();
    let service = skill_commands::open_service(&config).await?;

    if config.sync.on_startup
        && command.uses_ledger()
        && let Err(e) = service.installer().sync_install_state().await
    {
        warn!(error = %e, "startup reconciliation failed");
    }

    match command {
        Commands::Install {
            slugs,
            platforms,
            scopes,
        } => {
            skill_commands::install(&service, slugs, InstallOptions { platforms, scopes }).await
        },
        Commands::Uninstall {
            slug,
            all,
            platforms,
            scopes,
        } => {
            skill_commands::uninstall(&service, &slug, all, InstallOptions { platforms, scopes })
                .await
        },
        Commands::List { json } => skill_commands::list(&service, json).await,
        Commands::Sync => skill_commands::sync(&service).await,
        Commands::Platforms | Commands::Config { .. } => Ok(()),
    }
}
