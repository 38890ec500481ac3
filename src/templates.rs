// Copyright 2025 Cornell University
// released under MIT License

use std::fs;
use std::path::Path;

use crate::config::{TemplateBuildOptions, TemplateConfig};
use crate::errors::{Error, Result};

/// A Makefile text generator. Rendering is a pure function of the template
/// config: same input, same text.
pub trait MakefileTemplate {
    fn render(&self) -> String;

    /// Renders the Makefile and writes it to `output_path`, creating parent
    /// directories as needed.
    fn generate(&self, output_path: &Path) -> Result<String> {
        let content = self.render();
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(output_path, &content)?;
        log::info!("generated Makefile at {}", output_path.display());
        Ok(content)
    }
}

/// Creates the template selected by `template_type`. The type is matched
/// case-insensitively; anything unknown is an error.
pub fn template_for(kind: &str, config: &TemplateConfig) -> Result<Box<dyn MakefileTemplate>> {
    match kind.to_ascii_lowercase().as_str() {
        "uvm" => Ok(Box::new(UvmMakefile::new(config.clone()))),
        "riviera-pro" => Ok(Box::new(RivieraMakefile::new(config.clone()))),
        _ => Err(Error::UnsupportedTemplate(kind.to_string())),
    }
}

/// Template for UVM testbench Makefiles driving VCS, Questa or Xcelium.
pub struct UvmMakefile {
    config: TemplateConfig,
}

impl UvmMakefile {
    pub fn new(config: TemplateConfig) -> Self {
        Self { config }
    }

    fn vcs_section(&self, opts: &TemplateBuildOptions) -> Vec<String> {
        let vcs_home = opts.vcs_home.as_deref().unwrap_or("$(VCS_HOME)");
        let compile_args = opts
            .compile_args
            .as_deref()
            .unwrap_or("-full64 -sverilog -timescale=1ns/1ps -CFLAGS -DVCS");
        let debug_args = if opts.debug { "-debug_access+all" } else { "" };
        let coverage_args = if opts.coverage {
            "-cm line+cond+fsm+branch+tgl"
        } else {
            ""
        };

        vec![
            "# VCS-specific settings".to_string(),
            "ifeq ($(SIMULATOR),vcs)".to_string(),
            format!("  VCS_HOME ?= {}", vcs_home),
            "  VCS = $(VCS_HOME)/bin/vcs".to_string(),
            "  SIMV = $(BUILD_DIR)/simv".to_string(),
            "".to_string(),
            "  # Debug settings".to_string(),
            "  ifeq ($(DEBUG),1)".to_string(),
            format!("    DEBUG_ARGS = {}", debug_args),
            "  else".to_string(),
            "    DEBUG_ARGS =".to_string(),
            "  endif".to_string(),
            "".to_string(),
            "  # Coverage settings".to_string(),
            "  ifeq ($(COVERAGE),1)".to_string(),
            format!("    COVERAGE_ARGS = {}", coverage_args),
            "  else".to_string(),
            "    COVERAGE_ARGS =".to_string(),
            "  endif".to_string(),
            "".to_string(),
            "  # Build command".to_string(),
            "  BUILD_CMD = $(VCS) -o $(SIMV) $(SRC_FILES) $(TB_FILES) \\".to_string(),
            "              $(INCLUDE_DIRS) $(DEFINES) \\".to_string(),
            format!("              {} \\", compile_args),
            "              $(DEBUG_ARGS) $(COVERAGE_ARGS) \\".to_string(),
            "              -ntb_opts uvm-1.2".to_string(),
            "".to_string(),
            "  # Run command".to_string(),
            "  RUN_CMD = $(SIMV) -l $(RESULTS_DIR)/sim.log \\".to_string(),
            "            +UVM_TESTNAME=$(TEST) \\".to_string(),
            "            +UVM_VERBOSITY=$(VERBOSITY) \\".to_string(),
            "            +ntb_random_seed=$(SEED) \\".to_string(),
            "            $(if $(COVERAGE),,-cm_dir $(RESULTS_DIR)/coverage)".to_string(),
            "endif".to_string(),
        ]
    }

    fn questa_section(&self, opts: &TemplateBuildOptions) -> Vec<String> {
        let questa_home = opts.questa_home.as_deref().unwrap_or("$(QUESTA_HOME)");
        let compile_args = opts
            .compile_args
            .as_deref()
            .unwrap_or("-64 -sv -timescale=1ns/1ps -mfcu +acc=rmb");
        let debug_args = if opts.debug { "-debugdb" } else { "" };
        let coverage_args = if opts.coverage { "+cover=bcestf" } else { "" };

        vec![
            "# Questa-specific settings".to_string(),
            "ifeq ($(SIMULATOR),questa)".to_string(),
            format!("  QUESTA_HOME ?= {}", questa_home),
            "  VLOG = $(QUESTA_HOME)/bin/vlog".to_string(),
            "  VSIM = $(QUESTA_HOME)/bin/vsim".to_string(),
            "  VLIB = $(QUESTA_HOME)/bin/vlib".to_string(),
            "  VMAP = $(QUESTA_HOME)/bin/vmap".to_string(),
            "".to_string(),
            "  # Debug settings".to_string(),
            "  ifeq ($(DEBUG),1)".to_string(),
            format!("    DEBUG_ARGS = {}", debug_args),
            "  else".to_string(),
            "    DEBUG_ARGS =".to_string(),
            "  endif".to_string(),
            "".to_string(),
            "  # Coverage settings".to_string(),
            "  ifeq ($(COVERAGE),1)".to_string(),
            format!("    COVERAGE_ARGS = {}", coverage_args),
            "  else".to_string(),
            "    COVERAGE_ARGS =".to_string(),
            "  endif".to_string(),
            "".to_string(),
            "  # Build command".to_string(),
            "  BUILD_CMD = cd $(BUILD_DIR) && \\".to_string(),
            "             $(VLIB) work && \\".to_string(),
            "             $(VMAP) work work && \\".to_string(),
            "             $(VLOG) $(SRC_FILES) $(TB_FILES) \\".to_string(),
            "             $(INCLUDE_DIRS) $(DEFINES) \\".to_string(),
            format!("             {} \\", compile_args),
            "             $(DEBUG_ARGS) $(COVERAGE_ARGS) \\".to_string(),
            "             -suppress 2263 \\".to_string(),
            "             +define+UVM_CMDLINE_NO_DPI \\".to_string(),
            "             +define+UVM_REGEX_NO_DPI".to_string(),
            "".to_string(),
            "  # Run command".to_string(),
            "  RUN_CMD = cd $(BUILD_DIR) && \\".to_string(),
            "           $(VSIM) -batch -do \"run -all; quit -f\" \\".to_string(),
            "           -l $(RESULTS_DIR)/sim.log \\".to_string(),
            "           work.top \\".to_string(),
            "           +UVM_TESTNAME=$(TEST) \\".to_string(),
            "           +UVM_VERBOSITY=$(VERBOSITY) \\".to_string(),
            "           -sv_seed $(SEED) \\".to_string(),
            "           $(if $(COVERAGE),-coverage)".to_string(),
            "endif".to_string(),
        ]
    }

    fn xcelium_section(&self, opts: &TemplateBuildOptions) -> Vec<String> {
        let xcelium_home = opts.xcelium_home.as_deref().unwrap_or("$(XCELIUM_HOME)");
        let compile_args = opts
            .compile_args
            .as_deref()
            .unwrap_or("-64bit -sv -timescale 1ns/1ps -access +rwc");
        let debug_args = if opts.debug { "-debug" } else { "" };
        let coverage_args = if opts.coverage {
            "-coverage all -covoverwrite"
        } else {
            ""
        };

        vec![
            "# Xcelium-specific settings".to_string(),
            "ifeq ($(SIMULATOR),xcelium)".to_string(),
            format!("  XCELIUM_HOME ?= {}", xcelium_home),
            "  XRUN = $(XCELIUM_HOME)/bin/xrun".to_string(),
            "".to_string(),
            "  # Debug settings".to_string(),
            "  ifeq ($(DEBUG),1)".to_string(),
            format!("    DEBUG_ARGS = {}", debug_args),
            "  else".to_string(),
            "    DEBUG_ARGS =".to_string(),
            "  endif".to_string(),
            "".to_string(),
            "  # Coverage settings".to_string(),
            "  ifeq ($(COVERAGE),1)".to_string(),
            format!("    COVERAGE_ARGS = {}", coverage_args),
            "  else".to_string(),
            "    COVERAGE_ARGS =".to_string(),
            "  endif".to_string(),
            "".to_string(),
            "  # Build and run combined for Xcelium".to_string(),
            "  BUILD_CMD = $(XRUN) -elaborate \\".to_string(),
            "             $(SRC_FILES) $(TB_FILES) \\".to_string(),
            "             $(INCLUDE_DIRS) $(DEFINES) \\".to_string(),
            format!("             {} \\", compile_args),
            "             $(DEBUG_ARGS) $(COVERAGE_ARGS) \\".to_string(),
            "             -uvmhome CDNS-1.2".to_string(),
            "".to_string(),
            "  # Run command".to_string(),
            "  RUN_CMD = $(XRUN) -R \\".to_string(),
            "           -xmlibdirname $(BUILD_DIR) \\".to_string(),
            "           -l $(RESULTS_DIR)/sim.log \\".to_string(),
            "           +UVM_TESTNAME=$(TEST) \\".to_string(),
            "           +UVM_VERBOSITY=$(VERBOSITY) \\".to_string(),
            "           -svseed $(SEED)".to_string(),
            "endif".to_string(),
        ]
    }
}

impl MakefileTemplate for UvmMakefile {
    fn render(&self) -> String {
        let simulator = self.config.simulator.as_deref().unwrap_or("vcs");

        let mut content = vec![
            "# Generated UVM Testbench Makefile".to_string(),
            "# Do not edit manually".to_string(),
            "".to_string(),
            "# Default variables".to_string(),
            format!("SIMULATOR ?= {}", simulator),
            "TESTBENCH ?= $(error TESTBENCH is not set)".to_string(),
            "TEST ?= $(error TEST is not set)".to_string(),
            "SEED ?= random".to_string(),
            "DEBUG ?= 0".to_string(),
            "COVERAGE ?= 0".to_string(),
            "VERBOSITY ?= UVM_MEDIUM".to_string(),
            "".to_string(),
            "# Directory structure".to_string(),
            "SIM_DIR ?= ./sim".to_string(),
            "BUILD_DIR ?= $(SIM_DIR)/build/$(TESTBENCH)".to_string(),
            "RESULTS_DIR ?= $(SIM_DIR)/results/$(TESTBENCH)/$(TEST)".to_string(),
            "".to_string(),
            "# Include paths".to_string(),
        ];

        for include in &self.config.includes {
            content.push(format!("INCLUDE_DIRS += {}", include));
        }

        content.push("".to_string());
        content.push("# Define macros".to_string());

        for (name, value) in &self.config.defines {
            match value {
                Some(value) => content.push(format!("DEFINES += +define+{}={}", name, value)),
                None => content.push(format!("DEFINES += +define+{}", name)),
            }
        }

        content.push("".to_string());
        content.push("# Source files".to_string());

        for src_file in &self.config.src_files {
            content.push(format!("SRC_FILES += {}", src_file));
        }

        content.push("".to_string());
        content.push("# Testbench files".to_string());

        for tb_file in &self.config.tb_files {
            content.push(format!("TB_FILES += {}", tb_file));
        }

        content.push("".to_string());

        let opts = &self.config.build_options;
        match simulator.to_ascii_lowercase().as_str() {
            "vcs" => content.extend(self.vcs_section(opts)),
            "questa" => content.extend(self.questa_section(opts)),
            "xcelium" => content.extend(self.xcelium_section(opts)),
            other => content.push(format!("# Unsupported simulator: {}", other)),
        }

        content.extend([
            "".to_string(),
            "# Common targets".to_string(),
            ".PHONY: all build run clean help list-testbenches list-tests".to_string(),
            "".to_string(),
            "all: build run".to_string(),
            "".to_string(),
            "build:".to_string(),
            "\t@mkdir -p $(BUILD_DIR)".to_string(),
            "\t$(BUILD_CMD)".to_string(),
            "".to_string(),
            "run:".to_string(),
            "\t@mkdir -p $(RESULTS_DIR)".to_string(),
            "\t$(RUN_CMD)".to_string(),
            "".to_string(),
            "clean:".to_string(),
            "\trm -rf $(BUILD_DIR)".to_string(),
            "".to_string(),
            "help:".to_string(),
            "\t@echo \"UVM Testbench Makefile\"".to_string(),
            "\t@echo \"Usage:\"".to_string(),
            "\t@echo \"  make build TESTBENCH=<testbench>\"".to_string(),
            "\t@echo \"  make run TESTBENCH=<testbench> TEST=<test> [SEED=<seed>] [DEBUG=0|1] [COVERAGE=0|1]\"".to_string(),
            "\t@echo \"  make clean TESTBENCH=<testbench>\"".to_string(),
            "\t@echo \"  make list-testbenches\"".to_string(),
            "\t@echo \"  make list-tests TESTBENCH=<testbench>\"".to_string(),
            "".to_string(),
            "list-testbenches:".to_string(),
        ]);

        for tb_name in self.config.testbenches.keys() {
            content.push(format!("\t@echo \"{}\"", tb_name));
        }

        content.push("".to_string());
        content.push("list-tests:".to_string());

        if !self.config.testbenches.is_empty() {
            content.push("\t@case \"$(TESTBENCH)\" in \\".to_string());

            for (tb_name, tb_data) in &self.config.testbenches {
                content.push(format!("\t\t{}) \\", tb_name));
                for test in &tb_data.tests {
                    content.push(format!("\t\t\techo \"{}\"; \\", test));
                }
                content.push("\t\t\t;; \\".to_string());
            }

            content.push("\t\t*) \\".to_string());
            content.push("\t\t\techo \"Unknown testbench: $(TESTBENCH)\"; \\".to_string());
            content.push("\t\t\texit 1; \\".to_string());
            content.push("\t\t\t;; \\".to_string());
            content.push("\tesac".to_string());
        }

        content.join("\n")
    }
}

/// Template for Riviera-Pro Makefiles.
pub struct RivieraMakefile {
    config: TemplateConfig,
}

impl RivieraMakefile {
    pub fn new(config: TemplateConfig) -> Self {
        Self { config }
    }

    fn variable<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.config
            .variables
            .get(name)
            .map(String::as_str)
            .unwrap_or(default)
    }

    fn directory<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.config
            .directories
            .get(name)
            .map(String::as_str)
            .unwrap_or(default)
    }
}

impl MakefileTemplate for RivieraMakefile {
    fn render(&self) -> String {
        let vsim = self.variable("VSIM", "vsim");
        let vlog = self.variable("VLOG", "vlog");
        let vsimflags = self.variable("VSIMFLAGS", "-c -do \"run -all; exit;\"");

        let rtl_dir = self.directory("rtl", "rtl");
        let tb_dir = self.directory("testbench", "tb");
        let build_dir = self.directory("build", "build");
        let results_dir = self.directory("results", "results");

        let mut content = vec![
            "# Generated Riviera-Pro Makefile".to_string(),
            "# Do not edit manually".to_string(),
            "".to_string(),
            "# Simulator settings".to_string(),
            format!("VSIM = {}", vsim),
            format!("VLOG = {}", vlog),
            format!("VSIMFLAGS = {}", vsimflags),
            "".to_string(),
            "# Directory structure".to_string(),
            format!("RTL_DIR = {}", rtl_dir),
            format!("TB_DIR = {}", tb_dir),
            format!("BUILD_DIR = {}", build_dir),
            format!("RESULTS_DIR = {}", results_dir),
            "".to_string(),
            "# Source files".to_string(),
            "RTL_SRCS = $(wildcard $(RTL_DIR)/*.v)".to_string(),
            "TB_SRCS = $(wildcard $(TB_DIR)/*.sv)".to_string(),
            "".to_string(),
            "# Default variables".to_string(),
            "TESTBENCH ?= $(error TESTBENCH is not set)".to_string(),
            "TEST ?= $(error TEST is not set)".to_string(),
            "SEED ?= random".to_string(),
            "DEBUG ?= 0".to_string(),
            "COVERAGE ?= 0".to_string(),
            "VERBOSITY ?= UVM_MEDIUM".to_string(),
            "".to_string(),
            "# Targets".to_string(),
            ".PHONY: build run clean list-testbenches list-tests".to_string(),
            "".to_string(),
            "build:".to_string(),
            "\t@mkdir -p $(BUILD_DIR)".to_string(),
            "\t$(VLOG) $(RTL_SRCS) $(TB_DIR)/$(TESTBENCH).sv".to_string(),
            "".to_string(),
            "run: build".to_string(),
            "\t@mkdir -p $(RESULTS_DIR)/$(TESTBENCH)".to_string(),
            "\t$(VSIM) $(VSIMFLAGS) \\".to_string(),
            "\t\t-l $(RESULTS_DIR)/$(TESTBENCH)/$(TEST).log \\".to_string(),
            "\t\t+UVM_TESTNAME=$(TEST) \\".to_string(),
            "\t\t+UVM_VERBOSITY=$(VERBOSITY) \\".to_string(),
            "\t\t$(TESTBENCH)".to_string(),
            "".to_string(),
            "clean:".to_string(),
            "\trm -rf $(BUILD_DIR) $(RESULTS_DIR) work transcript vsim.wlf".to_string(),
            "".to_string(),
            "list-testbenches:".to_string(),
        ];

        for tb_name in self.config.testbenches.keys() {
            content.push(format!("\t@echo \"{}\"", tb_name));
        }

        content.push("".to_string());
        content.push("list-tests:".to_string());
        content.push("\t@case \"$(TESTBENCH)\" in \\".to_string());

        for (tb_name, tb_data) in &self.config.testbenches {
            content.push(format!("\t\t{}) \\", tb_name));
            for test in &tb_data.tests {
                content.push(format!("\t\t\techo \"{}\"; \\", test));
            }
            content.push("\t\t\t;; \\".to_string());
        }

        content.push("\t\t*) \\".to_string());
        content.push("\t\t\techo \"Unknown testbench: $(TESTBENCH)\"; \\".to_string());
        content.push("\t\t\texit 1; \\".to_string());
        content.push("\t\t\t;; \\".to_string());
        content.push("\tesac".to_string());

        content.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::config::TemplateTestbench;

    fn sample_config() -> TemplateConfig {
        let mut config = TemplateConfig::default();
        config.simulator = Some("vcs".to_string());
        config.includes = vec!["include".to_string(), "tb/include".to_string()];
        config
            .defines
            .insert("UVM_NO_DPI".to_string(), Some("1".to_string()));
        config.defines.insert("SIMULATION".to_string(), None);
        config.src_files = vec!["rtl/alu.sv".to_string()];
        config.tb_files = vec!["tb/alu_tb.sv".to_string()];
        config.testbenches.insert(
            "alu_tb".to_string(),
            TemplateTestbench {
                tests: vec!["basic_test".to_string(), "random_test".to_string()],
            },
        );
        config
    }

    fn snap(name: &str, content: String) {
        let mut settings = insta::Settings::clone_current();
        settings.set_snapshot_path(Path::new("../tests/snapshots"));
        settings.set_prepend_module_to_snapshot(false);
        settings.bind(|| {
            insta::assert_snapshot!(name, content);
        });
    }

    #[test]
    fn test_uvm_render_is_deterministic() {
        let config = sample_config();
        let a = UvmMakefile::new(config.clone()).render();
        let b = UvmMakefile::new(config).render();
        assert_eq!(a, b);
    }

    #[test]
    fn test_uvm_vcs_content() {
        let content = UvmMakefile::new(sample_config()).render();
        assert!(content.contains("SIMULATOR ?= vcs"));
        assert!(content.contains("ifeq ($(SIMULATOR),vcs)"));
        assert!(content.contains("INCLUDE_DIRS += include"));
        assert!(content.contains("DEFINES += +define+UVM_NO_DPI=1"));
        assert!(content.contains("DEFINES += +define+SIMULATION"));
        assert!(content.contains("SRC_FILES += rtl/alu.sv"));
        assert!(content.contains("TB_FILES += tb/alu_tb.sv"));
        assert!(content.contains("-ntb_opts uvm-1.2"));
        assert!(content.contains("+ntb_random_seed=$(SEED)"));
        assert!(content.contains("\t@echo \"alu_tb\""));
        assert!(content.contains("\t\t\techo \"basic_test\"; \\"));
        assert!(content.contains("echo \"Unknown testbench: $(TESTBENCH)\""));
    }

    #[test]
    fn test_uvm_questa_content() {
        let mut config = sample_config();
        config.simulator = Some("questa".to_string());
        let content = UvmMakefile::new(config).render();
        assert!(content.contains("ifeq ($(SIMULATOR),questa)"));
        assert!(content.contains("$(VLIB) work"));
        assert!(content.contains("-sv_seed $(SEED)"));
        assert!(content.contains("+define+UVM_CMDLINE_NO_DPI"));
        assert!(!content.contains("ifeq ($(SIMULATOR),vcs)"));
    }

    #[test]
    fn test_uvm_xcelium_content() {
        let mut config = sample_config();
        config.simulator = Some("xcelium".to_string());
        let content = UvmMakefile::new(config).render();
        assert!(content.contains("ifeq ($(SIMULATOR),xcelium)"));
        assert!(content.contains("$(XRUN) -elaborate"));
        assert!(content.contains("-uvmhome CDNS-1.2"));
        assert!(content.contains("-svseed $(SEED)"));
    }

    #[test]
    fn test_uvm_unknown_simulator_gets_comment() {
        let mut config = sample_config();
        config.simulator = Some("verilator".to_string());
        let content = UvmMakefile::new(config).render();
        assert!(content.contains("# Unsupported simulator: verilator"));
        assert!(!content.contains("BUILD_CMD ="));
    }

    #[test]
    fn test_uvm_debug_and_coverage_disabled() {
        let mut config = sample_config();
        config.build_options.debug = false;
        config.build_options.coverage = false;
        let content = UvmMakefile::new(config).render();
        assert!(!content.contains("-debug_access+all"));
        assert!(!content.contains("-cm line+cond+fsm+branch+tgl"));
    }

    #[test]
    fn test_uvm_empty_testbenches_omit_case() {
        let content = UvmMakefile::new(TemplateConfig::default()).render();
        assert!(content.ends_with("list-tests:"));
        assert!(!content.contains("esac"));
    }

    #[test]
    fn test_riviera_defaults() {
        let content = RivieraMakefile::new(TemplateConfig::default()).render();
        assert!(content.contains("VSIM = vsim"));
        assert!(content.contains("VSIMFLAGS = -c -do \"run -all; exit;\""));
        assert!(content.contains("RTL_DIR = rtl"));
        assert!(content.contains("rm -rf $(BUILD_DIR) $(RESULTS_DIR) work transcript vsim.wlf"));
    }

    #[test]
    fn test_riviera_overrides() {
        let mut config = TemplateConfig::default();
        config
            .variables
            .insert("VSIM".to_string(), "/opt/riviera/bin/vsim".to_string());
        config
            .directories
            .insert("rtl".to_string(), "hdl".to_string());
        let content = RivieraMakefile::new(config).render();
        assert!(content.contains("VSIM = /opt/riviera/bin/vsim"));
        assert!(content.contains("RTL_DIR = hdl"));
    }

    #[test]
    fn test_factory_known_types() {
        let config = TemplateConfig::default();
        assert!(template_for("uvm", &config).is_ok());
        assert!(template_for("UVM", &config).is_ok());
        assert!(template_for("riviera-pro", &config).is_ok());
    }

    #[test]
    fn test_factory_unknown_type() {
        let res = template_for("ninja", &TemplateConfig::default());
        assert!(matches!(res, Err(Error::UnsupportedTemplate(_))));
    }

    #[test]
    fn test_generate_writes_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("gen").join("Makefile");
        let template = UvmMakefile::new(sample_config());
        let content = template.generate(&path).unwrap();
        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, on_disk);
    }

    #[test]
    fn test_snapshot_uvm_vcs() {
        snap("uvm_vcs_makefile", UvmMakefile::new(sample_config()).render());
    }

    #[test]
    fn test_snapshot_riviera_defaults() {
        snap(
            "riviera_default_makefile",
            RivieraMakefile::new(TemplateConfig::default()).render(),
        );
    }
}
