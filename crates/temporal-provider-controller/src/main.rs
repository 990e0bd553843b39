//! temporal-provider - reconcile Temporal namespaces and search attributes

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use kube::{Client, CustomResourceExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use temporal_provider::credentials::{CredentialSource, KubeCredentials, StaticCredentials};
use temporal_provider::resolver::{
    KubeNamespaceLookup, StaticNamespaceLookup, TemporalNamespaceLookup,
};
use temporal_provider::telemetry::{init_telemetry, LogFormat};
use temporal_provider::{Manifest, Provider};
use temporal_provider_client::{CallContext, GrpcDialer};
use temporal_provider_common::crd::{ProviderConfig, SearchAttribute, TemporalNamespace};

/// Reconcile Temporal namespaces and search attributes
#[derive(Parser, Debug)]
#[command(name = "temporal-provider", version, about, long_about = None)]
struct Cli {
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Plain, env = "TEMPORAL_PROVIDER_LOG_FORMAT", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the CRD manifests and exit
    Crd,
    /// Reconcile the resources of a manifest
    Reconcile(ReconcileArgs),
}

#[derive(Args, Debug)]
struct ReconcileArgs {
    /// Multi-document YAML of TemporalNamespace and SearchAttribute objects
    #[arg(long, env = "TEMPORAL_PROVIDER_MANIFEST")]
    manifest: PathBuf,

    /// JSON service config used for every ProviderConfig
    #[arg(long, env = "TEMPORAL_PROVIDER_CREDENTIALS", conflicts_with = "kube", required_unless_present = "kube")]
    credentials: Option<PathBuf>,

    /// Read ProviderConfigs, Secrets and referenced TemporalNamespaces from the cluster
    #[arg(long)]
    kube: bool,

    /// Seconds between reconcile rounds
    #[arg(long, default_value_t = 30, env = "TEMPORAL_PROVIDER_INTERVAL")]
    interval: u64,

    /// Run a single round and exit
    #[arg(long)]
    once: bool,

    /// Seconds allowed for one reconcile pass
    #[arg(long, default_value_t = 30)]
    pass_timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(cli.log_format)?;

    match cli.command {
        Commands::Crd => print_crds(),
        Commands::Reconcile(args) => reconcile(args).await,
    }
}

fn print_crds() -> anyhow::Result<()> {
    let crds = [
        serde_yaml::to_string(&ProviderConfig::crd())?,
        serde_yaml::to_string(&TemporalNamespace::crd())?,
        serde_yaml::to_string(&SearchAttribute::crd())?,
    ];
    print!("{}", crds.join("---\n"));
    Ok(())
}

async fn reconcile(args: ReconcileArgs) -> anyhow::Result<()> {
    let mut manifest = Manifest::load(&args.manifest).await?;
    info!(
        manifest = %args.manifest.display(),
        namespaces = manifest.namespaces.len(),
        search_attributes = manifest.search_attributes.len(),
        "Loaded manifest"
    );

    let (credentials, lookup): (Arc<dyn CredentialSource>, Arc<dyn TemporalNamespaceLookup>) =
        if args.kube {
            let client = Client::try_default().await?;
            (
                Arc::new(KubeCredentials::new(client.clone())),
                Arc::new(KubeNamespaceLookup::new(client)),
            )
        } else {
            let path = args
                .credentials
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("--credentials or --kube is required"))?;
            (
                Arc::new(StaticCredentials::from_file(path).await?),
                Arc::new(StaticNamespaceLookup::new(manifest.namespaces.clone())),
            )
        };

    let provider = Provider::new(credentials, lookup, Arc::new(GrpcDialer))
        .with_pass_timeout(Duration::from_secs(args.pass_timeout));

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling in-flight calls");
                shutdown.cancel();
            }
        }
    });
    let cx = CallContext::new(shutdown.clone());

    loop {
        let summary = provider.reconcile_all(&cx, &mut manifest).await;
        if args.once || shutdown.is_cancelled() || manifest.is_empty() {
            if summary.failed > 0 {
                warn!(failed = summary.failed, "Some passes failed");
            }
            break;
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(Duration::from_secs(args.interval)) => {}
        }
    }

    print!("{}", manifest.to_yaml()?);
    Ok(())
}
