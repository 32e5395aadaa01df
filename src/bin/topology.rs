// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology operator CLI
//!
//! Builds the reference topology from `TOPOLOGY_*` environment variables and
//! renders, validates, orders or hands it off.
//!
//! ```text
//! topology synth [path]        render the manifest (stdout when no path)
//! topology plan                print the apply order
//! topology validate [--strict] check invariants, production posture with --strict
//! topology deploy              publish the manifest over NATS (NATS_URL)
//! topology withdraw            publish a teardown request over NATS
//! ```

use anyhow::{bail, Context, Result};
use cim_topology::{
    handoff::{FilePublisher, ManifestPublisher, NatsConfig, NatsPublisher},
    DependencyGraph, Manifest, StackConfig, Topology, TopologyDescriptor,
};
use tracing::{info, warn};

const USAGE: &str = "usage: topology <synth [path] | plan | validate [--strict] | deploy | withdraw>";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        bail!(USAGE);
    };

    let config = StackConfig::from_env().context("Failed to load stack configuration")?;
    info!("📋 Configuration loaded:");
    info!("  - Stack: {} v{}", config.stack_name, config.stack_version);
    info!("  - Region: {} ({} zones)", config.region, config.max_azs);
    info!("  - CIDR: {}", config.cidr);

    match command.as_str() {
        "synth" => synth(&config, args.get(1).map(String::as_str)).await,
        "plan" => plan(&config),
        "validate" => validate(&config, args.iter().any(|a| a == "--strict")),
        "deploy" => deploy(&config).await,
        "withdraw" => withdraw(&config).await,
        other => bail!("unknown command {:?}\n{}", other, USAGE),
    }
}

fn build(config: &StackConfig) -> Result<Topology> {
    TopologyDescriptor::build(config).context("Failed to build topology")
}

async fn synth(config: &StackConfig, path: Option<&str>) -> Result<()> {
    let manifest = Manifest::render(&build(config)?).context("Failed to render manifest")?;

    match path {
        Some(path) => {
            let receipt = FilePublisher::new(path)
                .publish(&manifest)
                .await
                .with_context(|| format!("Failed to write manifest to {}", path))?;
            info!("✅ Manifest written to {}", receipt.destination);
        }
        None => println!("{}", manifest.to_json_pretty()?),
    }
    Ok(())
}

fn plan(config: &StackConfig) -> Result<()> {
    let topology = build(config)?;
    let graph = DependencyGraph::from_topology(&topology)?;

    for (step, id) in graph.apply_order()?.iter().enumerate() {
        let kind = topology
            .get(id)
            .map(|r| r.kind().engine_type())
            .unwrap_or("?");
        let deps: Vec<_> = graph.dependencies_of(id).iter().map(|d| d.as_str()).collect();
        if deps.is_empty() {
            println!("{:>3}. {} ({})", step + 1, id, kind);
        } else {
            println!("{:>3}. {} ({}) after {}", step + 1, id, kind, deps.join(", "));
        }
    }
    Ok(())
}

fn validate(config: &StackConfig, strict: bool) -> Result<()> {
    let topology = build(config)?;

    if strict {
        topology
            .validate_production_readiness()
            .context("Topology is not production ready")?;
        info!("✅ Topology is valid and production ready");
    } else {
        // each warning was already logged by the build
        let warnings = topology.warnings().len();
        if warnings > 0 {
            warn!("⚠️ {} posture warning(s), rerun with --strict to enforce", warnings);
        }
        info!("✅ Topology is valid ({} resources)", topology.resources().len());
    }
    Ok(())
}

async fn deploy(config: &StackConfig) -> Result<()> {
    let manifest = Manifest::render(&build(config)?).context("Failed to render manifest")?;
    let publisher = connect().await?;

    let receipt = publisher
        .publish(&manifest)
        .await
        .context("Failed to hand off manifest")?;
    info!(
        "✅ Published {} resources to {} ({})",
        manifest.resources.len(),
        receipt.destination,
        receipt.message_id
    );
    Ok(())
}

async fn withdraw(config: &StackConfig) -> Result<()> {
    let publisher = connect().await?;
    let receipt = publisher
        .withdraw(&config.stack_name, config.stack_version)
        .await
        .context("Failed to request teardown")?;
    info!("✅ Withdrawal requested on {}", receipt.destination);
    Ok(())
}

async fn connect() -> Result<NatsPublisher> {
    let nats = NatsConfig::from_env();
    info!("🔌 Connecting to NATS at {:?}", nats.servers);
    NatsPublisher::connect(nats)
        .await
        .context("Failed to connect to NATS")
}
