// revcheck/src/cli.rs
//! Defines the command-line argument structure using clap.
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use revcheck_common::error::Result;
use revcheck_common::Config;

pub mod check;
pub mod plan;
pub mod status;
pub mod targets;

use crate::cli::check::CheckArgs;
use crate::cli::plan::PlanArgs;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, name = "revcheck", bin_name = "revcheck")]
#[command(propagate_version = true)]
pub struct CliArgs {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install dependencies into the private library and check every target
    Check(CheckArgs),
    /// Resolve and plan dependency installation without changing anything
    Plan(PlanArgs),
}

impl Command {
    pub fn target_args(&self) -> &TargetArgs {
        match self {
            Self::Check(command) => &command.targets,
            Self::Plan(command) => &command.targets,
        }
    }

    /// Applies command-line overrides on top of the environment config.
    pub fn configure(&self, config: &mut Config) {
        self.target_args().configure(config);
        if let Self::Check(command) = self {
            command.configure(config);
        }
    }

    pub async fn run(&self, config: &Config) -> Result<()> {
        match self {
            Self::Check(command) => command.run(config).await,
            Self::Plan(command) => command.run(config).await,
        }
    }
}

/// Target selection and repository options shared by every command.
#[derive(Debug, Args)]
pub struct TargetArgs {
    /// Packages to check, in order
    pub names: Vec<String>,

    /// Read further package names from a file, one per line
    #[arg(long, value_name = "FILE")]
    pub targets_file: Option<PathBuf>,

    /// Private library for dependencies [env: REVCHECK_LIB]
    #[arg(long, value_name = "DIR")]
    pub lib: Option<PathBuf>,

    /// Directory for downloaded archives [env: REVCHECK_CACHE]
    #[arg(long, value_name = "DIR")]
    pub cache: Option<PathBuf>,

    /// Binary platform, or `source` to build everything [env: REVCHECK_PLATFORM]
    #[arg(long, value_name = "PLATFORM")]
    pub platform: Option<String>,

    /// Also consult the secondary repository [env: REVCHECK_INCLUDE_SECONDARY]
    #[arg(long)]
    pub secondary: bool,
}

impl TargetArgs {
    fn configure(&self, config: &mut Config) {
        if let Some(lib) = &self.lib {
            config.dependency_library_path = lib.clone();
        }
        if let Some(cache) = &self.cache {
            config.source_cache_path = Some(cache.clone());
        }
        if let Some(platform) = &self.platform {
            config.platform_type = platform.clone();
        }
        if self.secondary {
            config.include_secondary_source = true;
        }
    }

    pub fn collect(&self) -> Result<Vec<String>> {
        targets::collect_targets(&self.names, self.targets_file.as_deref())
    }
}
