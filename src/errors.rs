// Copyright 2025 Cornell University
// released under MIT License

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the testbench automation tool.
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration file not found: {0}")]
    ConfigNotFound(PathBuf),
    #[error(
        "no configuration file found, create tester.yml or config.yml, or specify one with --config"
    )]
    NoDefaultConfig,
    #[error("failed to read configuration file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML in {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("unsupported build system: {0}")]
    UnsupportedBuildSystem(String),
    #[error("unsupported Makefile template type: {0}")]
    UnsupportedTemplate(String),
    #[error("unknown testbench: {0}")]
    UnknownTestbench(String),
    #[error("no default testbench configured and no testbenches found in config")]
    NoDefaultTestbench,
    #[error("test name is required")]
    MissingTestName,
    #[error("invalid build command format: {0}")]
    InvalidBuildCommand(String),
    #[error("failed to execute command: `{cmd}`\n{stdout}\n{stderr}")]
    CommandFailed {
        cmd: String,
        stdout: String,
        stderr: String,
    },
    #[error("{failed} of {total} tests failed")]
    RegressionFailed { failed: usize, total: usize },
    #[error("failed to perform i/o: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
