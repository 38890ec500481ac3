// Copyright 2025 Cornell University
// released under MIT License

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Command;

use crate::build_system::{BuildOptions, BuildSystem, RunOptions};
use crate::config::Config;
use crate::errors::{Error, Result};
use crate::templates::template_for;

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

/// Build system adapter that drives a hand-written or generated Makefile.
///
/// Every operation maps onto `make -C <dir> <target> VAR=value...`; the
/// argument vector is a pure function of the config and the options.
pub struct MakefileBuildSystem {
    config: Config,
    makefile_path: PathBuf,
}

impl MakefileBuildSystem {
    pub fn new(config: Config) -> Result<Self> {
        let mut makefile_path = config.makefile_path.clone();
        if !config.use_custom_makefile {
            let output = config
                .generated_makefile_path
                .clone()
                .unwrap_or_else(|| config.makefile_path.join("Makefile"));
            let template = template_for(&config.template_type, &config.template_config)?;
            template.generate(&output)?;
            if let Some(parent) = output.parent() {
                if !parent.as_os_str().is_empty() {
                    makefile_path = parent.to_path_buf();
                }
            }
        }
        Ok(Self {
            config,
            makefile_path,
        })
    }

    /// Like [`Self::new`], but generates the Makefile into a fresh temporary
    /// directory that outlives the process.
    pub fn with_temp_dir(mut config: Config) -> Result<Self> {
        let dir = tempfile::TempDir::new()?.keep();
        config.use_custom_makefile = false;
        config.generated_makefile_path = Some(dir.join("Makefile"));
        config.makefile_path = dir;
        Self::new(config)
    }

    /// Make variable assignments for a build invocation.
    pub fn build_vars(testbench: &str, options: &BuildOptions) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        vars.insert("TESTBENCH".to_string(), testbench.to_string());
        vars.insert("DEBUG".to_string(), flag(options.debug).to_string());
        vars.insert("VERBOSE".to_string(), flag(options.verbose).to_string());
        vars
    }

    /// Make variable assignments for a run invocation.
    pub fn run_vars(testbench: &str, test: &str, options: &RunOptions) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        vars.insert("TESTBENCH".to_string(), testbench.to_string());
        vars.insert("TEST".to_string(), test.to_string());
        vars.insert("COVERAGE".to_string(), flag(options.coverage).to_string());
        vars.insert("VERBOSE".to_string(), flag(options.verbose).to_string());
        if let Some(seed) = options.seed {
            vars.insert("SEED".to_string(), seed.to_string());
        }
        if let Some(verbosity) = options.verbosity {
            vars.insert("VERBOSITY".to_string(), verbosity.as_uvm().to_string());
        }
        if !options.runtime_args.is_empty() {
            vars.insert("RUNTIME_ARGS".to_string(), options.runtime_args.join(" "));
        }
        vars
    }

    /// The full argument vector passed to the make command.
    pub fn make_args(&self, target: &str, vars: &BTreeMap<String, String>) -> Vec<String> {
        let mut args = vec![
            "-C".to_string(),
            self.makefile_path.display().to_string(),
            target.to_string(),
        ];
        for (key, value) in vars {
            args.push(format!("{}={}", key, value));
        }
        args
    }

    /// Runs a make target, returning captured stdout. A non-zero exit wraps
    /// the rendered command line plus both output streams in the error.
    fn run_make(&self, target: &str, vars: &BTreeMap<String, String>) -> Result<String> {
        let args = self.make_args(target, vars);
        log::debug!("running command: {} {}", self.config.make_command, args.join(" "));

        let res = Command::new(&self.config.make_command).args(&args).output()?;
        let stdout = String::from_utf8_lossy(&res.stdout).to_string();
        if res.status.success() {
            Ok(stdout)
        } else {
            let stderr = String::from_utf8_lossy(&res.stderr).to_string();
            Err(Error::CommandFailed {
                cmd: format!("{} {}", self.config.make_command, args.join(" ")),
                stdout,
                stderr,
            })
        }
    }

    /// Resolves a custom `build_command` config entry of the form
    /// `make <target>` to its target name.
    fn custom_build_target(&self, testbench: &str) -> Result<Option<String>> {
        let Some(command) = self
            .config
            .targets
            .get(testbench)
            .and_then(|t| t.build_command.as_deref())
        else {
            return Ok(None);
        };
        let parts: Vec<&str> = command.split_whitespace().collect();
        match parts.as_slice() {
            [make, target, ..] if make.eq_ignore_ascii_case("make") => {
                Ok(Some(target.to_string()))
            }
            _ => Err(Error::InvalidBuildCommand(command.to_string())),
        }
    }
}

impl BuildSystem for MakefileBuildSystem {
    fn build(&self, testbench: &str, options: &BuildOptions) -> Result<()> {
        if !options.incremental {
            log::info!("performing clean build for testbench {}", testbench);
            self.clean(testbench)?;
        }

        let vars = Self::build_vars(testbench, options);
        let target = match self.custom_build_target(testbench)? {
            Some(target) => {
                log::info!("using custom build target: {}", target);
                target
            }
            None => "build".to_string(),
        };
        self.run_make(&target, &vars)?;
        Ok(())
    }

    fn run(&self, testbench: &str, test: &str, options: &RunOptions) -> Result<()> {
        if self.custom_build_target(testbench)?.is_some() {
            log::info!("building testbench {} before running test", testbench);
            let build_options = BuildOptions {
                debug: false,
                incremental: true,
                verbose: options.verbose,
            };
            self.build(testbench, &build_options)?;
        } else {
            log::info!(
                "no separate build command for {}, assuming run target handles the build",
                testbench
            );
        }

        let vars = Self::run_vars(testbench, test, options);
        self.run_make("run", &vars)?;
        Ok(())
    }

    fn clean(&self, testbench: &str) -> Result<()> {
        let mut vars = BTreeMap::new();
        vars.insert("TESTBENCH".to_string(), testbench.to_string());
        self.run_make("clean", &vars)?;
        Ok(())
    }

    fn available_testbenches(&self) -> Result<Vec<String>> {
        let out = self.run_make("list-testbenches", &BTreeMap::new())?;
        Ok(parse_listing(&out))
    }

    fn available_tests(&self, testbench: &str) -> Result<Vec<String>> {
        let mut vars = BTreeMap::new();
        vars.insert("TESTBENCH".to_string(), testbench.to_string());
        let out = self.run_make("list-tests", &vars)?;
        Ok(parse_listing(&out))
    }
}

/// One name per non-blank line.
fn parse_listing(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
