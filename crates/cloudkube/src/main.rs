use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use converge::ConvergenceWaiter;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use cloudkube::{
    api::{ClusterCreateRequest, NodePoolCreateRequest, NodePoolUpdateRequest},
    config::Config,
    lifecycle::{Lifecycle, RetryPolicy},
    repository::RestClient,
    resources::{ClusterCredentials, ClusterRepository, NodePoolRepository, cluster, node_pool},
};

#[derive(Debug, Clone, Parser)]
#[command(version, about)]
struct Cli {
    /// YAML configuration file
    #[arg(long, short, env = "CLOUDKUBE_CONFIG", global = true)]
    config: Option<PathBuf>,
    /// Base URL of the cloud API
    #[arg(long, env = "CLOUDKUBE_ENDPOINT", global = true)]
    endpoint: Option<String>,
    /// Cloud project owning the clusters
    #[arg(long, env = "OVH_PROJECT_ID", global = true)]
    project_id: Option<String>,
    /// Bearer token sent with every request
    #[arg(long, env = "CLOUDKUBE_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
enum Commands {
    /// Manage Kubernetes clusters
    #[command(subcommand)]
    Cluster(ClusterCommand),
    /// Manage node pools of a cluster
    #[command(subcommand)]
    NodePool(NodePoolCommand),
    /// Output the JSON schema of the configuration file
    ConfigSchema,
}

#[derive(Debug, Clone, Subcommand)]
enum ClusterCommand {
    /// Create a cluster and wait until it is READY
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        region: Option<String>,
        /// Kubernetes version, e.g. 1.29
        #[arg(long)]
        version: String,
    },
    Get {
        id: String,
    },
    /// Delete a cluster and wait until it is gone
    Delete {
        id: String,
        /// Fail on the first transport error instead of retrying
        #[arg(long)]
        no_retry: bool,
    },
    /// Print the admin kubeconfig of a cluster
    Kubeconfig {
        id: String,
        /// Print the current context's credentials instead of the raw file
        #[arg(long)]
        credentials: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
enum NodePoolCommand {
    /// Create a node pool and wait until it is READY
    Create {
        #[arg(long)]
        cluster_id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        flavor: String,
        #[arg(long)]
        desired_nodes: u32,
        #[arg(long)]
        min_nodes: u32,
        #[arg(long)]
        max_nodes: u32,
        #[arg(long)]
        monthly_billed: bool,
    },
    Get {
        #[arg(long)]
        cluster_id: String,
        id: String,
    },
    /// Resize a node pool and wait until it is READY again
    Update {
        #[arg(long)]
        cluster_id: String,
        id: String,
        #[arg(long)]
        desired_nodes: u32,
        #[arg(long)]
        min_nodes: u32,
        #[arg(long)]
        max_nodes: u32,
    },
    /// Delete a node pool and wait until it is gone
    Delete {
        #[arg(long)]
        cluster_id: String,
        id: String,
        #[arg(long)]
        no_retry: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(EnvFilter::from_default_env())
        .try_init()?;

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if cli.endpoint.is_some() {
        config.endpoint = cli.endpoint;
    }
    if cli.project_id.is_some() {
        config.project_id = cli.project_id;
    }
    if cli.token.is_some() {
        config.token = cli.token;
    }

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, cancelling");
                cancel.cancel();
            }
        }
    });
    let waiter = ConvergenceWaiter::new(cancel);

    match cli.command {
        Commands::Cluster(command) => run_cluster(command, &config, waiter).await?,
        Commands::NodePool(command) => run_node_pool(command, &config, waiter).await?,
        Commands::ConfigSchema => {
            println!("{}", serde_json::to_string_pretty(&Config::schema())?);
        }
    }

    Ok(())
}

async fn run_cluster(
    command: ClusterCommand,
    config: &Config,
    waiter: ConvergenceWaiter,
) -> anyhow::Result<()> {
    let repository = ClusterRepository::new(client(config)?, project_id(config)?);
    let plan = config.cluster.apply(cluster::plan()?)?;
    let clusters = Lifecycle::new(repository, plan, waiter);

    match command {
        ClusterCommand::Create {
            name,
            region,
            version,
        } => {
            let request = ClusterCreateRequest {
                name,
                region,
                version,
            };
            let created = clusters.create(&request).await.map_err(surface_id)?;
            print_yaml(&created)?;
        }
        ClusterCommand::Get { id } => print_yaml(&clusters.read(&id).await?)?,
        ClusterCommand::Delete { id, no_retry } => {
            clusters.delete_with_retry(&id, retry_policy(config, no_retry)).await?;
        }
        ClusterCommand::Kubeconfig { id, credentials } => {
            let kubeconfig = clusters.repository().kubeconfig(&id).await?;
            if credentials {
                print_yaml(&ClusterCredentials::from_kubeconfig(&kubeconfig.content)?)?;
            } else {
                print!("{}", kubeconfig.content);
            }
        }
    }

    Ok(())
}

async fn run_node_pool(
    command: NodePoolCommand,
    config: &Config,
    waiter: ConvergenceWaiter,
) -> anyhow::Result<()> {
    let cluster_id = match &command {
        NodePoolCommand::Create { cluster_id, .. }
        | NodePoolCommand::Get { cluster_id, .. }
        | NodePoolCommand::Update { cluster_id, .. }
        | NodePoolCommand::Delete { cluster_id, .. } => cluster_id.clone(),
    };
    let repository = NodePoolRepository::new(client(config)?, project_id(config)?, cluster_id);
    let plan = config.node_pool.apply(node_pool::plan()?)?;
    let pools = Lifecycle::new(repository, plan, waiter);

    match command {
        NodePoolCommand::Create {
            name,
            flavor,
            desired_nodes,
            min_nodes,
            max_nodes,
            monthly_billed,
            ..
        } => {
            let request = NodePoolCreateRequest {
                name,
                flavor_name: flavor,
                desired_nodes,
                min_nodes,
                max_nodes,
                monthly_billed,
            };
            let created = pools.create(&request).await.map_err(surface_id)?;
            print_yaml(&created)?;
        }
        NodePoolCommand::Get { id, .. } => print_yaml(&pools.read(&id).await?)?,
        NodePoolCommand::Update {
            id,
            desired_nodes,
            min_nodes,
            max_nodes,
            ..
        } => {
            let request = NodePoolUpdateRequest {
                desired_nodes,
                min_nodes,
                max_nodes,
            };
            print_yaml(&pools.update(&id, &request).await?)?;
        }
        NodePoolCommand::Delete { id, no_retry, .. } => {
            pools.delete_with_retry(&id, retry_policy(config, no_retry)).await?;
        }
    }

    Ok(())
}

fn client(config: &Config) -> anyhow::Result<RestClient> {
    RestClient::new(config.endpoint(), config.token.clone()).context("build HTTP client")
}

fn project_id(config: &Config) -> anyhow::Result<&str> {
    config
        .project_id
        .as_deref()
        .context("no project id given (--project-id, OVH_PROJECT_ID or project_id in config)")
}

fn retry_policy(config: &Config, no_retry: bool) -> RetryPolicy {
    let policy = config.delete_retry();
    if no_retry {
        RetryPolicy {
            attempts: 1,
            ..policy
        }
    } else {
        policy
    }
}

/// Keep the identifier of a partially created resource visible to the user.
fn surface_id(err: cloudkube::Error) -> anyhow::Error {
    match err.resource_id().map(str::to_string) {
        Some(id) => {
            tracing::error!("Resource {} may exist in a partial state", id);
            anyhow::Error::new(err)
                .context(format!("resource {id} was created but did not become ready"))
        }
        None => err.into(),
    }
}

fn print_yaml<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_yaml_ng::to_string(value)?);
    Ok(())
}
