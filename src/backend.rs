// Copyright 2025 Cornell University
// released under MIT License

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::build_system::{BuildOptions, BuildSystem, RunOptions};
use crate::config::{Config, ParamValue, SourceFile, ToolOptions};
use crate::errors::{Error, Result};

/// Tools that understand the UVM plusarg conventions.
const UVM_TOOLS: &[&str] = &["vcs", "questa", "xcelium"];

/// Flattened description of one testbench: global plus testbench-level files
/// and parameters, with test-level parameters merged on top.
#[derive(Debug, Clone)]
pub struct Edam {
    pub name: String,
    pub toplevel: String,
    pub files: Vec<SourceFile>,
    pub parameters: BTreeMap<String, ParamValue>,
}

impl Edam {
    fn filelist_name(&self) -> String {
        format!("{}.f", self.name)
    }

    /// Parameters rendered as plusargs, in sorted key order. A `true` value
    /// renders as a bare `+KEY`, `false` is dropped.
    fn plusargs(&self) -> Vec<String> {
        let mut args = Vec::new();
        for (key, value) in &self.parameters {
            match value {
                ParamValue::Bool(true) => args.push(format!("+{}", key)),
                ParamValue::Bool(false) => {}
                other => args.push(format!("+{}={}", key, other)),
            }
        }
        args
    }
}

/// Command construction for one simulator. The returned vectors start with
/// the program name and are pure functions of their inputs.
trait ToolBackend {
    fn compile_command(&self, edam: &Edam, options: &BuildOptions, extra: &ToolOptions)
        -> Vec<String>;

    fn run_command(&self, edam: &Edam, options: &RunOptions, extra: &ToolOptions) -> Vec<String>;
}

struct Vcs;
struct Questa;
struct Xcelium;
struct Icarus;

impl ToolBackend for Vcs {
    fn compile_command(
        &self,
        edam: &Edam,
        options: &BuildOptions,
        extra: &ToolOptions,
    ) -> Vec<String> {
        let mut cmd: Vec<String> = ["vcs", "-full64", "-sverilog", "-ntb_opts", "uvm-1.2"]
            .map(str::to_string)
            .to_vec();
        if options.debug {
            cmd.push("-debug_access+all".to_string());
        }
        cmd.extend(extra.compile_args.iter().cloned());
        cmd.extend([
            "-f".to_string(),
            edam.filelist_name(),
            "-top".to_string(),
            edam.toplevel.clone(),
            "-o".to_string(),
            "simv".to_string(),
        ]);
        cmd
    }

    fn run_command(&self, edam: &Edam, options: &RunOptions, extra: &ToolOptions) -> Vec<String> {
        let mut cmd = vec!["./simv".to_string(), "-l".to_string(), "sim.log".to_string()];
        if let Some(seed) = options.seed {
            cmd.push(format!("+ntb_random_seed={}", seed));
        }
        if let Some(verbosity) = options.verbosity {
            cmd.push(format!("+UVM_VERBOSITY={}", verbosity));
        }
        if options.coverage {
            cmd.extend(["-cm".to_string(), "line+cond+fsm+branch+tgl".to_string()]);
        }
        cmd.extend(edam.plusargs());
        cmd.extend(extra.run_args.iter().cloned());
        cmd.extend(options.runtime_args.iter().cloned());
        cmd
    }
}

impl ToolBackend for Questa {
    fn compile_command(
        &self,
        edam: &Edam,
        options: &BuildOptions,
        extra: &ToolOptions,
    ) -> Vec<String> {
        let mut cmd: Vec<String> = ["vlog", "-64", "-sv", "-mfcu"].map(str::to_string).to_vec();
        if options.debug {
            cmd.push("+acc".to_string());
        }
        cmd.extend(extra.compile_args.iter().cloned());
        cmd.extend(["-f".to_string(), edam.filelist_name()]);
        cmd
    }

    fn run_command(&self, edam: &Edam, options: &RunOptions, extra: &ToolOptions) -> Vec<String> {
        let mut cmd: Vec<String> = [
            "vsim",
            "-batch",
            "-do",
            "run -all; quit -f",
            "-l",
            "sim.log",
        ]
        .map(str::to_string)
        .to_vec();
        cmd.push(format!("work.{}", edam.toplevel));
        if let Some(seed) = options.seed {
            cmd.extend(["-sv_seed".to_string(), seed.to_string()]);
        }
        if let Some(verbosity) = options.verbosity {
            cmd.push(format!("+UVM_VERBOSITY={}", verbosity));
        }
        if options.coverage {
            cmd.push("-coverage".to_string());
        }
        cmd.extend(edam.plusargs());
        cmd.extend(extra.run_args.iter().cloned());
        cmd.extend(options.runtime_args.iter().cloned());
        cmd
    }
}

impl ToolBackend for Xcelium {
    fn compile_command(
        &self,
        edam: &Edam,
        options: &BuildOptions,
        extra: &ToolOptions,
    ) -> Vec<String> {
        let mut cmd: Vec<String> = ["xrun", "-elaborate", "-64bit", "-sv", "-uvmhome", "CDNS-1.2"]
            .map(str::to_string)
            .to_vec();
        if options.debug {
            cmd.push("-linedebug".to_string());
        }
        cmd.extend(extra.compile_args.iter().cloned());
        cmd.extend([
            "-f".to_string(),
            edam.filelist_name(),
            "-top".to_string(),
            edam.toplevel.clone(),
        ]);
        cmd
    }

    fn run_command(&self, edam: &Edam, options: &RunOptions, extra: &ToolOptions) -> Vec<String> {
        let mut cmd: Vec<String> = ["xrun", "-R", "-l", "sim.log"].map(str::to_string).to_vec();
        if let Some(seed) = options.seed {
            cmd.extend(["-svseed".to_string(), seed.to_string()]);
        }
        if let Some(verbosity) = options.verbosity {
            cmd.push(format!("+UVM_VERBOSITY={}", verbosity));
        }
        if options.coverage {
            cmd.push("-covoverwrite".to_string());
        }
        cmd.extend(edam.plusargs());
        cmd.extend(extra.run_args.iter().cloned());
        cmd.extend(options.runtime_args.iter().cloned());
        cmd
    }
}

impl ToolBackend for Icarus {
    fn compile_command(
        &self,
        edam: &Edam,
        _options: &BuildOptions,
        extra: &ToolOptions,
    ) -> Vec<String> {
        let mut cmd: Vec<String> = ["iverilog", "-g2012"].map(str::to_string).to_vec();
        cmd.extend(extra.compile_args.iter().cloned());
        cmd.extend([
            "-c".to_string(),
            edam.filelist_name(),
            "-s".to_string(),
            edam.toplevel.clone(),
            "-o".to_string(),
            "sim.vvp".to_string(),
        ]);
        cmd
    }

    fn run_command(&self, edam: &Edam, options: &RunOptions, extra: &ToolOptions) -> Vec<String> {
        let mut cmd = vec!["vvp".to_string(), "sim.vvp".to_string()];
        if let Some(verbosity) = options.verbosity {
            cmd.push(format!("+UVM_VERBOSITY={}", verbosity));
        }
        cmd.extend(edam.plusargs());
        cmd.extend(extra.run_args.iter().cloned());
        cmd.extend(options.runtime_args.iter().cloned());
        cmd
    }
}

fn backend_for(tool: &str) -> Result<Box<dyn ToolBackend>> {
    match tool {
        "vcs" => Ok(Box::new(Vcs)),
        "questa" => Ok(Box::new(Questa)),
        "xcelium" => Ok(Box::new(Xcelium)),
        "icarus" => Ok(Box::new(Icarus)),
        other => Err(Error::UnsupportedBuildSystem(format!("tool: {}", other))),
    }
}

/// Build system adapter that drives the simulators directly, selected by the
/// `edalize` build-system value. Each testbench gets its own work directory
/// under `work_root`.
pub struct ToolBuildSystem {
    config: Config,
    work_root: PathBuf,
}

impl ToolBuildSystem {
    pub fn new(config: Config) -> Self {
        let work_root = config
            .work_root
            .clone()
            .unwrap_or_else(|| PathBuf::from("build"));
        Self { config, work_root }
    }

    pub fn work_dir(&self, testbench: &str) -> PathBuf {
        self.work_root.join(testbench)
    }

    fn tool_options(&self) -> ToolOptions {
        match self.config.tool.as_str() {
            "vcs" => self.config.vcs_options.clone(),
            "questa" => self.config.questa_options.clone(),
            "xcelium" => self.config.xcelium_options.clone(),
            _ => ToolOptions::default(),
        }
    }

    /// Flattens config into the description the backend consumes.
    pub fn edam(&self, testbench: &str, test: Option<&str>) -> Edam {
        let tb = self.config.testbenches.get(testbench);

        let mut files = self.config.files.clone();
        let mut parameters = self.config.parameters.clone();
        let mut toplevel = testbench.to_string();

        if let Some(tb) = tb {
            files.extend(tb.files.iter().cloned());
            parameters.extend(tb.parameters.clone());
            if let Some(top) = &tb.toplevel {
                toplevel = top.clone();
            }
            if let Some(test) = test {
                if let Some(test_config) = tb.tests.get(test) {
                    parameters.extend(test_config.parameters.clone());
                }
            }
        }

        if let Some(test) = test {
            if UVM_TOOLS.contains(&self.config.tool.as_str())
                && !parameters.contains_key("UVM_TESTNAME")
            {
                parameters.insert(
                    "UVM_TESTNAME".to_string(),
                    ParamValue::Str(test.to_string()),
                );
            }
        }

        Edam {
            name: testbench.to_string(),
            toplevel,
            files,
            parameters,
        }
    }

    /// Creates the work directory and writes the filelist the compile
    /// commands reference.
    fn configure(&self, edam: &Edam) -> Result<PathBuf> {
        let work_dir = self.work_dir(&edam.name);
        fs::create_dir_all(&work_dir)?;
        let filelist = work_dir.join(edam.filelist_name());
        let mut contents = String::new();
        for file in &edam.files {
            contents.push_str(file.name());
            contents.push('\n');
        }
        fs::write(&filelist, contents)?;
        Ok(work_dir)
    }

    fn is_configured(&self, edam: &Edam) -> bool {
        self.work_dir(&edam.name).join(edam.filelist_name()).is_file()
    }

    /// Runs a tool command inside the work directory, capturing output.
    fn run_tool(&self, work_dir: &Path, cmd: &[String]) -> Result<()> {
        log::debug!("running command: {}", cmd.join(" "));
        let res = Command::new(&cmd[0])
            .args(&cmd[1..])
            .current_dir(work_dir)
            .output()?;
        if res.status.success() {
            Ok(())
        } else {
            Err(Error::CommandFailed {
                cmd: cmd.join(" "),
                stdout: String::from_utf8_lossy(&res.stdout).to_string(),
                stderr: String::from_utf8_lossy(&res.stderr).to_string(),
            })
        }
    }
}

impl BuildSystem for ToolBuildSystem {
    fn build(&self, testbench: &str, options: &BuildOptions) -> Result<()> {
        if !options.incremental {
            log::info!("performing clean build for testbench {}", testbench);
            self.clean(testbench)?;
        }
        let edam = self.edam(testbench, None);
        let backend = backend_for(&self.config.tool)?;
        log::info!(
            "building testbench {} with {}",
            testbench,
            self.config.tool
        );
        let work_dir = self.configure(&edam)?;
        let extra = self.tool_options();
        let cmd = backend.compile_command(&edam, options, &extra);
        self.run_tool(&work_dir, &cmd)
    }

    fn run(&self, testbench: &str, test: &str, options: &RunOptions) -> Result<()> {
        let edam = self.edam(testbench, Some(test));
        let backend = backend_for(&self.config.tool)?;
        if !self.is_configured(&edam) {
            log::info!(
                "configuring testbench {} with {}",
                testbench,
                self.config.tool
            );
            self.configure(&edam)?;
        }
        log::info!(
            "running test {} for testbench {} with {}",
            test,
            testbench,
            self.config.tool
        );
        let work_dir = self.work_dir(testbench);
        let extra = self.tool_options();
        let cmd = backend.run_command(&edam, options, &extra);
        self.run_tool(&work_dir, &cmd)
    }

    fn clean(&self, testbench: &str) -> Result<()> {
        let work_dir = self.work_dir(testbench);
        if work_dir.exists() {
            log::info!("cleaning directory {}", work_dir.display());
            fs::remove_dir_all(&work_dir)?;
        }
        Ok(())
    }

    fn available_testbenches(&self) -> Result<Vec<String>> {
        Ok(self.config.testbenches.keys().cloned().collect())
    }

    fn available_tests(&self, testbench: &str) -> Result<Vec<String>> {
        let Some(tb) = self.config.testbenches.get(testbench) else {
            return Err(Error::UnknownTestbench(testbench.to_string()));
        };
        Ok(tb.tests.keys().cloned().collect())
    }
}
