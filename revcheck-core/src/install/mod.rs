// revcheck-core/src/install/mod.rs
pub mod command;

use std::collections::BTreeSet;
use std::path::Path;

use revcheck_common::dependency::DependencyExt;
use revcheck_common::error::Result;
use revcheck_common::model::{MetadataSnapshot, PackageRecord};
use revcheck_common::pipeline::PipelineEvent;
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument};

pub use command::CommandInstaller;

/// Puts one package into a library directory.
pub trait PackageInstaller: Send + Sync {
    fn install_package(&self, record: &PackageRecord, library: &Path) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub installed: Vec<String>,
    /// Name and reason for every package that could not be installed.
    pub failed: Vec<(String, String)>,
}

impl InstallReport {
    pub fn all_installed(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Orders `to_install` so each package follows its strong dependencies
/// that are also being installed. Ties are broken by name.
pub fn install_order(to_install: &BTreeSet<String>, snapshot: &MetadataSnapshot) -> Vec<String> {
    fn visit(
        name: &str,
        to_install: &BTreeSet<String>,
        snapshot: &MetadataSnapshot,
        visiting: &mut BTreeSet<String>,
        done: &mut BTreeSet<String>,
        order: &mut Vec<String>,
    ) {
        if done.contains(name) || !visiting.insert(name.to_string()) {
            return;
        }
        if let Some(record) = snapshot.get(name) {
            let mut deps: Vec<&str> = record
                .dependencies
                .strong()
                .into_iter()
                .map(|d| d.name.as_str())
                .filter(|d| to_install.contains(*d))
                .collect();
            deps.sort_unstable();
            for dep in deps {
                visit(dep, to_install, snapshot, visiting, done, order);
            }
        }
        visiting.remove(name);
        done.insert(name.to_string());
        order.push(name.to_string());
    }

    let mut visiting = BTreeSet::new();
    let mut done = BTreeSet::new();
    let mut order = Vec::with_capacity(to_install.len());
    for name in to_install {
        visit(name, to_install, snapshot, &mut visiting, &mut done, &mut order);
    }
    order
}

/// Installs every package of `to_install`, one at a time. A failure is
/// reported and the loop moves on to the next package.
#[instrument(skip_all, fields(count = to_install.len(), library = %library.display()))]
pub fn install(
    to_install: &BTreeSet<String>,
    snapshot: &MetadataSnapshot,
    library: &Path,
    installer: &dyn PackageInstaller,
    event_tx: &broadcast::Sender<PipelineEvent>,
) -> InstallReport {
    let mut report = InstallReport::default();
    for name in install_order(to_install, snapshot) {
        let Some(record) = snapshot.get(&name) else {
            continue;
        };
        debug!("Installing {} {}", name, record.version);
        let _ = event_tx.send(PipelineEvent::InstallStarted { name: name.clone() });
        match installer.install_package(record, library) {
            Ok(()) => {
                let _ = event_tx.send(PipelineEvent::InstallFinished { name: name.clone() });
                report.installed.push(name);
            }
            Err(e) => {
                error!("Failed to install {}: {}", name, e);
                let _ = event_tx.send(PipelineEvent::install_failed(name.clone(), &e));
                report.failed.push((name, e.to_string()));
            }
        }
    }
    info!(
        "Installed {} of {} dependencies",
        report.installed.len(),
        to_install.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use revcheck_common::error::RevcheckError;
    use revcheck_common::model::PackageForm;

    use super::*;

    #[derive(Default)]
    struct RecordingInstaller {
        seen: Mutex<Vec<String>>,
        broken: BTreeSet<String>,
    }

    impl PackageInstaller for RecordingInstaller {
        fn install_package(&self, record: &PackageRecord, _library: &Path) -> Result<()> {
            self.seen.lock().unwrap().push(record.name.clone());
            if self.broken.contains(&record.name) {
                return Err(RevcheckError::InstallFailure(
                    record.name.clone(),
                    "compilation failed".to_string(),
                ));
            }
            Ok(())
        }
    }

    const INDEX: &str = "\
Package: A
Version: 1.0
Imports: C, B
Suggests: D

Package: B
Version: 1.0
LinkingTo: C

Package: C
Version: 1.0

Package: D
Version: 1.0
Depends: A
";

    fn names(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn snapshot() -> MetadataSnapshot {
        MetadataSnapshot::from_index("https://repo.example", &PackageForm::Source, INDEX).unwrap()
    }

    #[test]
    fn dependencies_install_first() {
        let order = install_order(&names(&["A", "B", "C", "D"]), &snapshot());
        assert_eq!(order, vec!["C", "B", "A", "D"]);
    }

    #[test]
    fn failure_does_not_stop_the_loop() {
        let (tx, mut rx) = broadcast::channel(16);
        let installer = RecordingInstaller {
            broken: names(&["B"]),
            ..Default::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let report = install(&names(&["A", "B", "C"]), &snapshot(), dir.path(), &installer, &tx);

        assert_eq!(*installer.seen.lock().unwrap(), vec!["C", "B", "A"]);
        assert_eq!(report.installed, vec!["C", "A"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "B");
        assert!(!report.all_installed());

        let mut failures = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, PipelineEvent::InstallFailed { .. }) {
                failures += 1;
            }
        }
        assert_eq!(failures, 1);
    }
}
