// Copyright 2025 Cornell University
// released under MIT License

use std::fmt;
use std::str::FromStr;

use crate::backend::ToolBuildSystem;
use crate::config::Config;
use crate::errors::{Error, Result};
use crate::makefile::MakefileBuildSystem;

/// UVM message verbosity. Rendered with the `UVM_` prefix wherever it ends up
/// on a simulator command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum UvmVerbosity {
    Low,
    Medium,
    High,
    Debug,
}

impl UvmVerbosity {
    pub fn as_uvm(&self) -> &'static str {
        match self {
            UvmVerbosity::Low => "UVM_LOW",
            UvmVerbosity::Medium => "UVM_MEDIUM",
            UvmVerbosity::High => "UVM_HIGH",
            UvmVerbosity::Debug => "UVM_DEBUG",
        }
    }
}

impl fmt::Display for UvmVerbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_uvm())
    }
}

impl FromStr for UvmVerbosity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        // accept both `HIGH` and `UVM_HIGH`
        let normalized = s.to_ascii_uppercase();
        let normalized = normalized.strip_prefix("UVM_").unwrap_or(&normalized);
        match normalized {
            "LOW" => Ok(UvmVerbosity::Low),
            "MEDIUM" => Ok(UvmVerbosity::Medium),
            "HIGH" => Ok(UvmVerbosity::High),
            "DEBUG" => Ok(UvmVerbosity::Debug),
            _ => Err(format!("invalid verbosity: {}", s)),
        }
    }
}

/// Options for building a testbench.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    pub debug: bool,
    pub incremental: bool,
    pub verbose: bool,
}

/// Options for running a single test.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub seed: Option<u64>,
    pub verbosity: Option<UvmVerbosity>,
    pub coverage: bool,
    pub verbose: bool,
    pub runtime_args: Vec<String>,
}

/// Common interface of the build system adapters.
pub trait BuildSystem {
    /// Compiles the testbench.
    fn build(&self, testbench: &str, options: &BuildOptions) -> Result<()>;

    /// Runs a single test of the given testbench.
    fn run(&self, testbench: &str, test: &str, options: &RunOptions) -> Result<()>;

    /// Removes build artifacts of the testbench.
    fn clean(&self, testbench: &str) -> Result<()>;

    fn available_testbenches(&self) -> Result<Vec<String>>;

    fn available_tests(&self, testbench: &str) -> Result<Vec<String>>;
}

/// Creates the build system selected by `build_system` in the config.
/// Anything other than the two known values is an error, never a fallback.
pub fn from_config(config: &Config) -> Result<Box<dyn BuildSystem>> {
    match config.build_system.as_str() {
        "makefile" => Ok(Box::new(MakefileBuildSystem::new(config.clone())?)),
        "edalize" => Ok(Box::new(ToolBuildSystem::new(config.clone()))),
        other => Err(Error::UnsupportedBuildSystem(other.to_string())),
    }
}
