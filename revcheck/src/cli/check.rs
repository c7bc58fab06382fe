// revcheck/src/cli/check.rs
use std::path::PathBuf;

use clap::Args;
use revcheck_common::config::Config;
use revcheck_common::error::Result;
use tracing::instrument;

use super::TargetArgs;
use crate::pipeline::runner;

#[derive(Debug, Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub targets: TargetArgs,

    /// Number of checks to run at once [env: REVCHECK_NCPUS]
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Directory for check output; a temporary one is created if unset [env: REVCHECK_RESULTS]
    #[arg(long, value_name = "DIR")]
    pub results: Option<PathBuf>,
}

impl CheckArgs {
    pub(super) fn configure(&self, config: &mut Config) {
        if let Some(jobs) = self.jobs {
            config.concurrency = jobs;
        }
        if let Some(results) = &self.results {
            config.results_directory = Some(results.clone());
        }
    }

    #[instrument(skip(self, config), fields(jobs = config.concurrency))]
    pub async fn run(&self, config: &Config) -> Result<()> {
        let targets = self.targets.collect()?;
        let summary = runner::run_check_pipeline(&targets, config).await?;
        // The results directory is the command's output; package failures
        // are reported there, not through the exit status.
        println!("{}", summary.results_dir.display());
        Ok(())
    }
}
