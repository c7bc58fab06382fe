// revcheck/src/pipeline/planner.rs
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use reqwest::Client;
use revcheck_common::config::Config;
use revcheck_common::dependency::resolve;
use revcheck_common::error::Result;
use revcheck_common::model::{MetadataSnapshot, PackageForm};
use revcheck_common::pipeline::{Phase, PipelineEvent};
use revcheck_core::{
    fetch_snapshot, plan, read_installed, system_library, HttpIndexFetcher, IndexFetcher,
    InstallPlan, LibrarySearchPath,
};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

/// Everything decided before anything is installed or checked.
pub struct PreparedRun {
    pub source_snapshot: Arc<MetadataSnapshot>,
    pub binary_snapshot: Arc<MetadataSnapshot>,
    pub resolved: BTreeSet<String>,
    pub plan: InstallPlan,
    pub search_path: LibrarySearchPath,
}

/// Libraries the tool always loads from, after the search path.
async fn site_libraries(config: &Config) -> Vec<PathBuf> {
    if let Some(paths) = &config.site_library_paths {
        return paths.clone();
    }
    let tool = config.tool_command.clone();
    match tokio::task::spawn_blocking(move || system_library(&tool)).await {
        Ok(found) => {
            debug!("Tool library: {:?}", found);
            found.into_iter().collect()
        }
        Err(e) => {
            warn!("Could not locate the tool's library: {}", e);
            Vec::new()
        }
    }
}

async fn fetch_snapshots<F>(
    config: &Config,
    fetcher: &F,
) -> Result<(Arc<MetadataSnapshot>, Arc<MetadataSnapshot>)>
where
    F: IndexFetcher + Sync,
{
    let repositories = config.repositories();
    match config.binary_form() {
        PackageForm::Source => {
            let source =
                Arc::new(fetch_snapshot(&repositories, &PackageForm::Source, fetcher).await?);
            Ok((Arc::clone(&source), source))
        }
        binary_form => {
            let (source, binary) = tokio::try_join!(
                fetch_snapshot(&repositories, &PackageForm::Source, fetcher),
                fetch_snapshot(&repositories, &binary_form, fetcher),
            )?;
            Ok((Arc::new(source), Arc::new(binary)))
        }
    }
}

#[instrument(skip_all, fields(targets = targets.len()))]
pub async fn prepare_run(
    targets: &[String],
    config: &Config,
    client: &Client,
    event_tx: &broadcast::Sender<PipelineEvent>,
) -> Result<PreparedRun> {
    let _ = event_tx.send(PipelineEvent::PhaseStarted {
        phase: Phase::FetchingMetadata,
    });
    let fetcher = HttpIndexFetcher::new(client.clone());
    let (source_snapshot, binary_snapshot) = fetch_snapshots(config, &fetcher).await?;

    for name in targets {
        if !source_snapshot.contains(name) {
            let _ = event_tx.send(PipelineEvent::LogWarn {
                message: format!("{name} is not in any repository; it will be skipped"),
            });
        }
    }

    let _ = event_tx.send(PipelineEvent::PhaseStarted {
        phase: Phase::Resolving,
    });
    let resolved = resolve(targets.iter().map(String::as_str), &source_snapshot);
    info!("Resolved {} packages for {} targets", resolved.len(), targets.len());

    let _ = event_tx.send(PipelineEvent::PhaseStarted {
        phase: Phase::Planning,
    });
    let search_path =
        LibrarySearchPath::with_private(config.library_dir(), &LibrarySearchPath::inherited());
    let mut library_dirs = search_path.entries().to_vec();
    library_dirs.extend(site_libraries(config).await);
    let installed = read_installed(&library_dirs);
    let plan = plan(&resolved, &installed, &binary_snapshot);
    for name in &plan.unsatisfiable {
        let _ = event_tx.send(PipelineEvent::LogWarn {
            message: format!("No {} artifact for dependency {name}", config.binary_form()),
        });
    }
    let _ = event_tx.send(PipelineEvent::LogInfo {
        message: format!(
            "{} dependencies resolved: {} to install, {} up to date",
            resolved.len(),
            plan.to_install.len(),
            plan.up_to_date.len()
        ),
    });

    Ok(PreparedRun {
        source_snapshot,
        binary_snapshot,
        resolved,
        plan,
        search_path,
    })
}
