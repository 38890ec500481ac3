// Copyright 2025 Cornell University
// released under MIT License

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};

use tbrun::build_system::{self, BuildOptions, BuildSystem, RunOptions, UvmVerbosity};
use tbrun::config::Config;
use tbrun::errors::{Error, Result};
use tbrun::report::{RegressionRunner, TestStatus};

/// UVM Testbench Automation Tool
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "CONFIG_FILE", global = true)]
    config: Option<PathBuf>,

    /// Users can specify `-v` or `--verbose` to toggle debug logging
    #[command(flatten)]
    verbosity: Verbosity<InfoLevel>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List available testbenches
    ListTestbenches,
    /// List available tests for a testbench
    ListTests {
        testbench: Option<String>,
    },
    /// Build a testbench
    Build {
        testbench: Option<String>,
        /// Enable debug build
        #[arg(long)]
        debug: bool,
        /// Enable incremental build
        #[arg(long)]
        incremental: bool,
    },
    /// Run a specific test
    ///
    /// Usage: `run [TESTBENCH] TEST`, `run TEST --testbench TESTBENCH`, or
    /// `run TEST` against the default testbench.
    Run {
        arg1: Option<String>,
        arg2: Option<String>,
        /// Testbench name (alternative to the positional argument)
        #[arg(short, long)]
        testbench: Option<String>,
        /// Random seed for the test
        #[arg(long)]
        seed: Option<u64>,
        /// UVM verbosity level
        #[arg(long, value_enum, ignore_case = true)]
        verbosity: Option<UvmVerbosity>,
        /// Enable coverage collection
        #[arg(long)]
        coverage: bool,
        /// Additional runtime arguments (can be used multiple times)
        #[arg(short = 'r', long = "runtime-args")]
        runtime_args: Vec<String>,
    },
    /// Run every configured test of a testbench and write an HTML report
    Regress {
        testbench: Option<String>,
        /// Directory to place the report in
        #[arg(long, default_value = "reports")]
        report_dir: PathBuf,
    },
    /// Clean testbench artifacts
    Clean {
        testbench: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    // For concision, we disable timestamps and the module paths in the log
    env_logger::Builder::new()
        .format_timestamp(None)
        .format_target(false)
        .filter_level(cli.verbosity.log_level_filter())
        .init();

    if let Err(err) = dispatch(cli) {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    let verbose = cli.verbosity.log_level_filter() >= log::LevelFilter::Debug;
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::ListTestbenches => list_testbenches(&config),
        Command::ListTests { testbench } => list_tests(&config, testbench),
        Command::Build {
            testbench,
            debug,
            incremental,
        } => build(&config, testbench, debug, incremental, verbose),
        Command::Run {
            arg1,
            arg2,
            testbench,
            seed,
            verbosity,
            coverage,
            runtime_args,
        } => run(
            &config,
            arg1,
            arg2,
            testbench,
            seed,
            verbosity,
            coverage,
            runtime_args,
            verbose,
        ),
        Command::Regress {
            testbench,
            report_dir,
        } => regress(&config, testbench, &report_dir, verbose),
        Command::Clean { testbench } => clean(&config, testbench),
    }
}

fn list_testbenches(config: &Config) -> Result<()> {
    let build_system = build_system::from_config(config)?;
    let testbenches = build_system.available_testbenches()?;

    if testbenches.is_empty() {
        println!("No testbenches found");
        return Ok(());
    }

    println!("Available testbenches:");
    for tb in testbenches {
        println!("  - {}", tb);
    }
    Ok(())
}

fn list_tests(config: &Config, testbench: Option<String>) -> Result<()> {
    let testbench = match testbench {
        Some(tb) => tb,
        None => config.default_testbench()?,
    };
    let build_system = build_system::from_config(config)?;
    let tests = build_system.available_tests(&testbench)?;

    if tests.is_empty() {
        println!("No tests found for testbench '{}'", testbench);
        return Ok(());
    }

    println!("Available tests for {}:", testbench);
    for test in tests {
        println!("  - {}", test);
    }
    Ok(())
}

fn build(
    config: &Config,
    testbench: Option<String>,
    debug: bool,
    incremental: bool,
    verbose: bool,
) -> Result<()> {
    let testbench = match testbench {
        Some(tb) => tb,
        None => config.default_testbench()?,
    };
    let build_system = build_system::from_config(config)?;
    let options = BuildOptions {
        debug,
        incremental,
        verbose,
    };
    build_system.build(&testbench, &options)?;
    println!("Successfully built testbench '{}'", testbench);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run(
    config: &Config,
    arg1: Option<String>,
    arg2: Option<String>,
    testbench: Option<String>,
    seed: Option<u64>,
    verbosity: Option<UvmVerbosity>,
    coverage: bool,
    runtime_args: Vec<String>,
    verbose: bool,
) -> Result<()> {
    // Two positionals: testbench then test. One positional: the test name,
    // with the testbench from `-t` or the configured default.
    let (tb_name, test_name) = match (arg1, arg2, testbench) {
        (Some(tb), Some(test), _) => (tb, test),
        (Some(test), None, Some(tb)) => (tb, test),
        (Some(test), None, None) => (config.default_testbench()?, test),
        (None, _, _) => return Err(Error::MissingTestName),
    };

    let build_system = build_system::from_config(config)?;

    // config-level runtime args come first, command-line ones after
    let mut all_runtime_args = config.test_runtime_args(&tb_name, &test_name);
    all_runtime_args.extend(runtime_args);

    let options = RunOptions {
        seed,
        verbosity,
        coverage,
        verbose,
        runtime_args: all_runtime_args,
    };
    build_system.run(&tb_name, &test_name, &options)?;
    println!(
        "Successfully ran test '{}' for testbench '{}'",
        test_name, tb_name
    );
    Ok(())
}

fn regress(
    config: &Config,
    testbench: Option<String>,
    report_dir: &Path,
    verbose: bool,
) -> Result<()> {
    let testbench = match testbench {
        Some(tb) => tb,
        None => config.default_testbench()?,
    };
    let build_system = build_system::from_config(config)?;
    let tests = build_system.available_tests(&testbench)?;

    if tests.is_empty() {
        println!("No tests found for testbench '{}'", testbench);
        return Ok(());
    }

    let pairs: Vec<(String, String)> = tests
        .into_iter()
        .map(|test| (testbench.clone(), test))
        .collect();
    let options = RunOptions {
        verbose,
        ..RunOptions::default()
    };

    let mut runner = RegressionRunner::new(build_system.as_ref());
    let report_path = runner.run_regression(&pairs, &options, report_dir)?;

    let failed = runner.report().count(TestStatus::Failed);
    println!("Report written to {}", report_path.display());
    if failed > 0 {
        return Err(Error::RegressionFailed {
            failed,
            total: pairs.len(),
        });
    }
    println!("All {} tests passed", pairs.len());
    Ok(())
}

fn clean(config: &Config, testbench: Option<String>) -> Result<()> {
    let testbench = match testbench {
        Some(tb) => tb,
        None => config.default_testbench()?,
    };
    let build_system = build_system::from_config(config)?;
    build_system.clean(&testbench)?;
    println!("Successfully cleaned testbench '{}'", testbench);
    Ok(())
}
