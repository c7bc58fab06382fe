// revcheck/src/cli/plan.rs
use std::collections::BTreeSet;

use clap::Args;
use colored::Colorize;
use revcheck_common::config::Config;
use revcheck_common::error::Result;
use revcheck_common::pipeline::PipelineEvent;
use tokio::sync::broadcast;

use super::TargetArgs;
use crate::pipeline::planner::prepare_run;

#[derive(Debug, Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub targets: TargetArgs,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

fn print_set(label: colored::ColoredString, names: &BTreeSet<String>) {
    println!("{} ({})", label, names.len());
    for name in names {
        println!("  {name}");
    }
}

impl PlanArgs {
    pub async fn run(&self, config: &Config) -> Result<()> {
        config.validate()?;
        let targets = self.targets.collect()?;
        let client = revcheck_net::build_http_client()?;

        let (event_tx, event_rx) = broadcast::channel::<PipelineEvent>(64);
        let status_handle = tokio::spawn(super::status::handle_events(event_rx));
        let prepared = prepare_run(&targets, config, &client, &event_tx).await;
        drop(event_tx);
        let _ = status_handle.await;
        let prepared = prepared?;

        if self.json {
            let value = serde_json::json!({
                "targets": targets,
                "resolved": prepared.resolved,
                "plan": prepared.plan,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
            return Ok(());
        }

        print_set("Resolved".bold(), &prepared.resolved);
        print_set("To install".green().bold(), &prepared.plan.to_install);
        print_set("Up to date".blue().bold(), &prepared.plan.up_to_date);
        print_set("Unsatisfiable".red().bold(), &prepared.plan.unsatisfiable);
        Ok(())
    }
}
