/// # wp-snapshot CLI Interface
///
/// Command parsing and orchestration for the `wp-snapshot` batch job. The
/// harvest loop, normalizer and publisher live in [`wp-snapshot-core`]; this
/// module only wires them to the config file, the environment secrets and
/// the GitHub client.
///
/// ## How To Use
/// - From a shell: `wp-snapshot harvest --config harvest.yaml`.
/// - From tests: build a [`Cli`] and call [`run`].
///
/// A run prints a one-line summary to stdout. Any failure (bad config,
/// missing secrets, a harvest below the minimum yield, a rejected write) is
/// returned as an error so the binary exits non-zero.
///
/// [`wp-snapshot-core`]: ../../wp-snapshot-core/
use crate::github::GitHubClient;
use crate::load_config::{load_config, load_secrets};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wp_snapshot_core::fetch::WordPressFetcher;
use wp_snapshot_core::harvest::{harvest, HarvestReport};
use wp_snapshot_core::identity::IdentityPool;
use wp_snapshot_core::pacing::TokioPacer;
use wp_snapshot_core::publish::{publish, PublishTarget};

/// CLI for wp-snapshot: harvest WordPress articles into a published JSON snapshot.
#[derive(Parser)]
#[clap(
    name = "wp-snapshot",
    version,
    about = "Harvest WordPress posts into a JSON knowledge-base snapshot and publish it to GitHub"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Harvest posts and publish the snapshot using the given config file
    Harvest {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Stop after this many records (overrides harvest.target_count)
        #[clap(long)]
        max_records: Option<usize>,
        /// Harvest and write the local artifact only; skip publishing
        #[clap(long)]
        no_publish: bool,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Harvest {
            config,
            max_records,
            no_publish,
        } => run_harvest(config, max_records, no_publish).await,
    }
}

async fn run_harvest(config_path: PathBuf, max_records: Option<usize>, no_publish: bool) -> Result<()> {
    let config = load_config(&config_path)?;
    // Secrets are checked before any request goes out.
    let secrets = if no_publish {
        tracing::info!(command = "harvest", "Publishing disabled, secrets not required");
        None
    } else {
        Some(load_secrets()?)
    };

    let target_count = max_records
        .or(config.harvest.target_count)
        .unwrap_or(usize::MAX);
    tracing::info!(command = "harvest", target_count, "Starting harvest");

    let fetcher = WordPressFetcher::new(&config.source)
        .map_err(|e| anyhow::anyhow!("Failed to build WordPress client: {e}"))?;
    let pacer = TokioPacer::new(config.pacing.clone());
    let mut identities = IdentityPool::browsers();

    let report = harvest(&config.harvest, &fetcher, &pacer, &mut identities, target_count).await;
    tracing::info!(
        command = "harvest",
        stop_reason = ?report.stop_reason,
        pages = report.pages_fetched,
        blocked = report.blocked_attempts,
        accumulated = report.accumulated,
        records = report.snapshot.len(),
        gated = report.gated,
        "Harvest finished"
    );

    if let Some(local_path) = &config.output.local_path {
        if report.snapshot.is_empty() {
            tracing::warn!(path = ?local_path, "Empty snapshot, leaving local file untouched");
        } else {
            report
                .snapshot
                .write_to(local_path)
                .with_context(|| format!("Failed to write local snapshot to {:?}", local_path))?;
            tracing::info!(path = ?local_path, records = report.snapshot.len(), "Local snapshot written");
        }
    }

    let Some(secrets) = secrets else {
        println!("{}", harvest_summary(&report));
        if report.gated {
            bail!(
                "harvest yielded {} records, below the minimum of {}",
                report.accumulated,
                config.harvest.min_records
            );
        }
        return Ok(());
    };

    let store = GitHubClient::new(
        &config.publish.api_base,
        secrets.repository,
        secrets.token,
        config.publish.branch.clone(),
    )
    .map_err(|e| anyhow::anyhow!("Failed to build GitHub client: {e}"))?;
    let target = PublishTarget {
        path: &config.publish.path,
        message_prefix: config.publish.message_prefix.as_deref(),
    };

    match publish(&report.snapshot, &store, target).await {
        Ok(published) => {
            tracing::info!(command = "harvest", ?published, "Publish complete");
            println!(
                "{}; published {} records to {} ({:?}, revision {})",
                harvest_summary(&report),
                published.record_count,
                published.path,
                published.action,
                published.revision
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!(command = "harvest", error = %e, "Publish failed");
            Err(anyhow::Error::new(e).context(harvest_summary(&report)))
        }
    }
}

fn harvest_summary(report: &HarvestReport) -> String {
    format!(
        "Harvested {} records from {} pages (stop: {:?}, gated: {})",
        report.accumulated, report.pages_fetched, report.stop_reason, report.gated
    )
}
