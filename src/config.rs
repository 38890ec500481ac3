// Copyright 2025 Cornell University
// released under MIT License

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::{Error, Result};

/// Config files that are picked up from the working directory when the user
/// does not pass `--config`, in order of preference.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["tester.yml", "config.yml"];

/// A scalar parameter value from the YAML config. Rendered in decimal / as-is
/// when it ends up on a tool command line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::Str(s) => write!(f, "{}", s),
        }
    }
}

/// A source file entry, either a bare path or `{name, file_type}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SourceFile {
    Path(String),
    Entry {
        name: String,
        #[serde(default)]
        file_type: Option<String>,
    },
}

impl SourceFile {
    pub fn name(&self) -> &str {
        match self {
            SourceFile::Path(p) => p,
            SourceFile::Entry { name, .. } => name,
        }
    }
}

/// Per-test settings under `testbenches.<tb>.tests.<test>`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    pub runtime_args: Vec<String>,
    /// Any remaining keys are tool parameters merged on top of the
    /// testbench-level parameters.
    #[serde(flatten)]
    pub parameters: BTreeMap<String, ParamValue>,
}

/// Per-testbench settings under `testbenches.<tb>`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TestbenchConfig {
    pub toplevel: Option<String>,
    pub files: Vec<SourceFile>,
    pub parameters: BTreeMap<String, ParamValue>,
    pub tests: BTreeMap<String, TestConfig>,
}

/// Per-testbench overrides for the make adapter, e.g. a custom build target.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub build_command: Option<String>,
}

/// Extra arguments for one tool backend.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ToolOptions {
    pub compile_args: Vec<String>,
    pub run_args: Vec<String>,
}

/// Testbench entry as seen by the Makefile templates (only the test names
/// matter for the generated `list-tests` target).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TemplateTestbench {
    pub tests: Vec<String>,
}

/// Build options consumed by the simulator-specific template sections.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TemplateBuildOptions {
    pub vcs_home: Option<String>,
    pub questa_home: Option<String>,
    pub xcelium_home: Option<String>,
    pub compile_args: Option<String>,
    pub debug: bool,
    pub coverage: bool,
}

impl Default for TemplateBuildOptions {
    fn default() -> Self {
        Self {
            vcs_home: None,
            questa_home: None,
            xcelium_home: None,
            compile_args: None,
            debug: true,
            coverage: true,
        }
    }
}

/// Inputs for Makefile generation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub simulator: Option<String>,
    pub includes: Vec<String>,
    /// Macro name to optional value, emitted as `+define+NAME[=VALUE]`.
    pub defines: BTreeMap<String, Option<String>>,
    pub src_files: Vec<String>,
    pub tb_files: Vec<String>,
    pub testbenches: BTreeMap<String, TemplateTestbench>,
    pub build_options: TemplateBuildOptions,
    /// Variable overrides for the Riviera-Pro template (VSIM, VLOG, ...).
    pub variables: BTreeMap<String, String>,
    /// Directory overrides for the Riviera-Pro template (rtl, testbench, ...).
    pub directories: BTreeMap<String, String>,
}

/// Top-level tool configuration, usually loaded from `tester.yml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub build_system: String,
    pub makefile_path: PathBuf,
    pub make_command: String,
    pub template_type: String,
    pub use_custom_makefile: bool,
    pub generated_makefile_path: Option<PathBuf>,
    pub template_config: TemplateConfig,
    pub default_testbench: Option<String>,
    pub testbenches: BTreeMap<String, TestbenchConfig>,
    pub targets: BTreeMap<String, TargetConfig>,
    pub work_root: Option<PathBuf>,
    pub tool: String,
    pub parameters: BTreeMap<String, ParamValue>,
    pub files: Vec<SourceFile>,
    pub vcs_options: ToolOptions,
    pub questa_options: ToolOptions,
    pub xcelium_options: ToolOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            build_system: "makefile".to_string(),
            makefile_path: PathBuf::from("."),
            make_command: "make".to_string(),
            template_type: "uvm".to_string(),
            use_custom_makefile: true,
            generated_makefile_path: None,
            template_config: TemplateConfig::default(),
            default_testbench: None,
            testbenches: BTreeMap::new(),
            targets: BTreeMap::new(),
            work_root: None,
            tool: "icarus".to_string(),
            parameters: BTreeMap::new(),
            files: Vec::new(),
            vcs_options: ToolOptions::default(),
            questa_options: ToolOptions::default(),
            xcelium_options: ToolOptions::default(),
        }
    }
}

impl Config {
    /// Parses a config from YAML text. An empty document yields the defaults.
    pub fn from_yaml(path: &Path, contents: &str) -> Result<Self> {
        let value: serde_yaml::Value =
            serde_yaml::from_str(contents).map_err(|source| Error::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_yaml::from_value(value).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads the configuration, using the discovery rules of
    /// [`find_config_file`] when no explicit path is given.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let path = find_config_file(config_file)?;
        log::debug!("using config file: {}", path.display());
        let contents = std::fs::read_to_string(&path).map_err(|source| Error::ConfigRead {
            path: path.clone(),
            source,
        })?;
        Self::from_yaml(&path, &contents)
    }

    /// The testbench to use when none was given on the command line:
    /// the configured default, else the first configured testbench.
    pub fn default_testbench(&self) -> Result<String> {
        if let Some(tb) = &self.default_testbench {
            return Ok(tb.clone());
        }
        if let Some(name) = self.testbenches.keys().next() {
            return Ok(name.clone());
        }
        if let Some(name) = self.template_config.testbenches.keys().next() {
            return Ok(name.clone());
        }
        Err(Error::NoDefaultTestbench)
    }

    /// Runtime args configured for a specific test, if any.
    pub fn test_runtime_args(&self, testbench: &str, test: &str) -> Vec<String> {
        self.testbenches
            .get(testbench)
            .and_then(|tb| tb.tests.get(test))
            .map(|t| t.runtime_args.clone())
            .unwrap_or_default()
    }
}

/// Resolves the config file to use: an explicit path must exist, otherwise
/// the default file names are probed in the current directory.
pub fn find_config_file(config_file: Option<&Path>) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    find_config_file_in(config_file, &cwd)
}

fn find_config_file_in(config_file: Option<&Path>, dir: &Path) -> Result<PathBuf> {
    if let Some(path) = config_file {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(Error::ConfigNotFound(path.to_path_buf()));
    }
    for name in DEFAULT_CONFIG_FILES {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    Err(Error::NoDefaultConfig)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
build_system: makefile
make_command: gmake
default_testbench: alu_tb
testbenches:
  alu_tb:
    toplevel: alu_top
    tests:
      basic_test:
        runtime_args: ["+TIMEOUT=1000"]
      extended_test:
        runtime_args: ["+TIMEOUT=2000"]
        timeout: 2000
  fifo_tb: {}
"#;

    #[test]
    fn test_parse_sample() {
        let config = Config::from_yaml(Path::new("tester.yml"), SAMPLE).unwrap();
        assert_eq!(config.build_system, "makefile");
        assert_eq!(config.make_command, "gmake");
        assert_eq!(config.makefile_path, PathBuf::from("."));
        assert!(config.use_custom_makefile);
        let tb = &config.testbenches["alu_tb"];
        assert_eq!(tb.toplevel.as_deref(), Some("alu_top"));
        assert_eq!(tb.tests.len(), 2);
        assert_eq!(
            tb.tests["extended_test"].parameters["timeout"],
            ParamValue::Int(2000)
        );
    }

    #[test]
    fn test_parse_empty_yields_defaults() {
        let config = Config::from_yaml(Path::new("empty.yml"), "").unwrap();
        assert_eq!(config.build_system, "makefile");
        assert_eq!(config.tool, "icarus");
        assert!(config.testbenches.is_empty());
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let res = Config::from_yaml(Path::new("bad.yml"), "invalid: yaml: content:");
        assert!(matches!(res, Err(Error::ConfigParse { .. })));
    }

    #[test]
    fn test_default_testbench_explicit() {
        let config = Config::from_yaml(Path::new("tester.yml"), SAMPLE).unwrap();
        assert_eq!(config.default_testbench().unwrap(), "alu_tb");
    }

    #[test]
    fn test_default_testbench_first_in_sorted_order() {
        let yaml = "testbenches:\n  zeta_tb: {}\n  alpha_tb: {}\n";
        let config = Config::from_yaml(Path::new("tester.yml"), yaml).unwrap();
        assert_eq!(config.default_testbench().unwrap(), "alpha_tb");
    }

    #[test]
    fn test_default_testbench_from_template_config() {
        let yaml = "template_config:\n  testbenches:\n    gen_tb:\n      tests: [smoke]\n";
        let config = Config::from_yaml(Path::new("tester.yml"), yaml).unwrap();
        assert_eq!(config.default_testbench().unwrap(), "gen_tb");
    }

    #[test]
    fn test_default_testbench_missing() {
        let config = Config::default();
        assert!(matches!(
            config.default_testbench(),
            Err(Error::NoDefaultTestbench)
        ));
    }

    #[test]
    fn test_runtime_args_lookup() {
        let config = Config::from_yaml(Path::new("tester.yml"), SAMPLE).unwrap();
        assert_eq!(
            config.test_runtime_args("alu_tb", "basic_test"),
            vec!["+TIMEOUT=1000".to_string()]
        );
        assert!(config.test_runtime_args("alu_tb", "nope").is_empty());
        assert!(config.test_runtime_args("nope", "basic_test").is_empty());
    }

    #[test]
    fn test_load_read_failure_names_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tester.yml");
        // not valid UTF-8, so reading the file into a string fails
        std::fs::write(&path, [0xff, 0xfe, 0xff]).unwrap();
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
        assert!(err.to_string().contains("tester.yml"));
    }

    #[test]
    fn test_find_config_file_explicit_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("nope.yml");
        let res = find_config_file_in(Some(&missing), dir.path());
        assert!(matches!(res, Err(Error::ConfigNotFound(_))));
    }

    #[test]
    fn test_find_config_file_prefers_tester_yml() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.yml"), "").unwrap();
        std::fs::write(dir.path().join("tester.yml"), "").unwrap();
        let found = find_config_file_in(None, dir.path()).unwrap();
        assert!(found.ends_with("tester.yml"));
    }

    #[test]
    fn test_find_config_file_falls_back_to_config_yml() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.yml"), "").unwrap();
        let found = find_config_file_in(None, dir.path()).unwrap();
        assert!(found.ends_with("config.yml"));
    }

    #[test]
    fn test_find_config_file_none_available() {
        let dir = tempfile::TempDir::new().unwrap();
        let res = find_config_file_in(None, dir.path());
        assert!(matches!(res, Err(Error::NoDefaultConfig)));
    }
}
