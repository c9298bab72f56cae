mod commands;
mod input;

use clap::{Parser, Subcommand};
use lbsync_config::CloudConfig;
use lbsync_core::{Cloud, EngineSettings};
use lbsync_tencent::{Credentials, TencentCloud};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "lbsync")]
#[command(about = "Converge Service load balancers onto Tencent Cloud", long_about = None)]
struct Cli {
    /// Config file (defaults to LBSYNC_CONFIG_PATH, then the config dir)
    #[arg(short, long, global = true, env = "LBSYNC_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or converge the load balancer of a Service
    Ensure {
        /// Service JSON file
        #[arg(short, long)]
        service: PathBuf,
        /// Node list JSON file
        #[arg(short, long)]
        nodes: PathBuf,
    },
    /// Converge only the backend targets of a Service
    Update {
        #[arg(short, long)]
        service: PathBuf,
        #[arg(short, long)]
        nodes: PathBuf,
    },
    /// Show the load balancer status of a Service
    Get {
        #[arg(short, long)]
        service: PathBuf,
    },
    /// Delete the load balancer of a Service
    Delete {
        #[arg(short, long)]
        service: PathBuf,
    },
    /// Print the load balancer name derived for a Service
    Name {
        #[arg(short, long)]
        service: PathBuf,
    },
    /// Instance lookups by provider id
    #[command(subcommand)]
    Instance(InstanceCommands),
    /// Cluster route table
    #[command(subcommand)]
    Routes(RouteCommands),
    /// Show version information
    Version,
}

#[derive(Subcommand)]
pub enum InstanceCommands {
    /// Whether the instance still exists
    Exists { provider_id: String },
    /// Whether the instance is shut down
    Shutdown { provider_id: String },
    /// Node addresses of the instance
    Addresses { provider_id: String },
}

#[derive(Subcommand)]
pub enum RouteCommands {
    /// List routes
    List,
    /// Route a CIDR through a node
    Create {
        /// Node name (private IP)
        #[arg(long)]
        node: String,
        #[arg(long)]
        cidr: String,
    },
    /// Remove a route
    Delete {
        #[arg(long)]
        node: String,
        #[arg(long)]
        cidr: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Version does not need a config
    if matches!(cli.command, Commands::Version) {
        println!("lbsync {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = CloudConfig::load(cli.config.as_deref())?;

    // Name only needs the prefix
    if let Commands::Name { service } = &cli.command {
        let service = input::read_service(service)?;
        println!("{}", lbsync_core::load_balancer_name(&config.name_prefix, &service));
        return Ok(());
    }

    let backend = TencentCloud::new(
        Credentials::new(&config.secret_id, &config.secret_key),
        &config.region,
    )?;
    tracing::debug!(region = backend.region(), vpc_id = %config.vpc_id, "connected backend");
    let cloud = Cloud::new(Arc::new(config), Arc::new(backend), EngineSettings::default());

    match cli.command {
        Commands::Ensure { service, nodes } => {
            commands::service::ensure(&cloud, &service, &nodes).await?;
        }
        Commands::Update { service, nodes } => {
            commands::service::update(&cloud, &service, &nodes).await?;
        }
        Commands::Get { service } => {
            commands::service::get(&cloud, &service).await?;
        }
        Commands::Delete { service } => {
            commands::service::delete(&cloud, &service).await?;
        }
        Commands::Instance(cmd) => {
            commands::instance::handle(&cloud, cmd).await?;
        }
        Commands::Routes(cmd) => {
            commands::routes::handle(&cloud, cmd).await?;
        }
        Commands::Name { .. } | Commands::Version => {}
    }

    Ok(())
}
