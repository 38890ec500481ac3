// Copyright 2025 Cornell University
// released under MIT License

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Local;

use crate::build_system::{BuildSystem, RunOptions};
use crate::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::Skipped => "skipped",
        }
    }
}

/// Outcome of a single test run.
#[derive(Debug, Clone)]
pub struct TestRecord {
    pub name: String,
    pub testbench: String,
    pub status: TestStatus,
    pub duration_secs: f64,
    pub seed: String,
    pub details: Option<String>,
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Collects test results and renders them as a self-contained HTML report.
#[derive(Debug, Default)]
pub struct TestReport {
    tests: Vec<TestRecord>,
}

impl TestReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_result(&mut self, record: TestRecord) {
        self.tests.push(record);
    }

    pub fn count(&self, status: TestStatus) -> usize {
        self.tests.iter().filter(|t| t.status == status).count()
    }

    /// Renders the report for a given timestamp. Pure text generation, the
    /// clock is the caller's problem.
    pub fn render(&self, timestamp: &str) -> String {
        let mut out = String::new();
        out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        out.push_str("<title>Testbench Regression Report</title>\n");
        out.push_str("<style>\n");
        out.push_str("body { font-family: sans-serif; margin: 2em; }\n");
        out.push_str("table { border-collapse: collapse; margin-top: 1em; }\n");
        out.push_str("th, td { border: 1px solid #ccc; padding: 0.4em 0.8em; text-align: left; }\n");
        out.push_str(".passed { color: #2a7a2a; }\n");
        out.push_str(".failed { color: #b02a2a; }\n");
        out.push_str(".skipped { color: #888888; }\n");
        out.push_str("</style>\n</head>\n<body>\n");
        out.push_str("<h1>Testbench Regression Report</h1>\n");
        writeln!(out, "<p>Generated: {}</p>", escape(timestamp)).unwrap();

        writeln!(
            out,
            "<p>Total: {} &mdash; <span class=\"passed\">{} passed</span>, \
             <span class=\"failed\">{} failed</span>, \
             <span class=\"skipped\">{} skipped</span></p>",
            self.tests.len(),
            self.count(TestStatus::Passed),
            self.count(TestStatus::Failed),
            self.count(TestStatus::Skipped),
        )
        .unwrap();

        out.push_str("<table>\n<tr><th>Test</th><th>Testbench</th><th>Status</th>");
        out.push_str("<th>Duration (s)</th><th>Seed</th><th>Details</th></tr>\n");
        for test in &self.tests {
            writeln!(
                out,
                "<tr><td>{}</td><td>{}</td><td class=\"{status}\">{status}</td>\
                 <td>{:.2}</td><td>{}</td><td>{}</td></tr>",
                escape(&test.name),
                escape(&test.testbench),
                test.duration_secs,
                escape(&test.seed),
                escape(test.details.as_deref().unwrap_or("")),
                status = test.status.as_str(),
            )
            .unwrap();
        }
        out.push_str("</table>\n</body>\n</html>\n");
        out
    }

    /// Writes the rendered report to `output_path`, creating parent
    /// directories as needed.
    pub fn generate(&self, output_path: &Path) -> Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let html = self.render(&timestamp);
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(output_path, html)?;
        Ok(())
    }
}

/// Runs a list of tests through a build system sequentially and collects the
/// outcomes. A failing test is recorded and the regression continues.
pub struct RegressionRunner<'a> {
    build_system: &'a dyn BuildSystem,
    report: TestReport,
}

impl<'a> RegressionRunner<'a> {
    pub fn new(build_system: &'a dyn BuildSystem) -> Self {
        Self {
            build_system,
            report: TestReport::new(),
        }
    }

    pub fn report(&self) -> &TestReport {
        &self.report
    }

    pub fn run_test(&mut self, testbench: &str, test: &str, options: &RunOptions) -> TestStatus {
        let seed = options
            .seed
            .map(|s| s.to_string())
            .unwrap_or_else(|| "random".to_string());
        let start = Instant::now();
        let (status, details) = match self.build_system.run(testbench, test, options) {
            Ok(()) => (TestStatus::Passed, None),
            Err(err) => {
                log::error!("test {} failed: {}", test, err);
                (TestStatus::Failed, Some(err.to_string()))
            }
        };
        let duration_secs = start.elapsed().as_secs_f64();
        self.report.add_result(TestRecord {
            name: test.to_string(),
            testbench: testbench.to_string(),
            status,
            duration_secs,
            seed,
            details,
        });
        status
    }

    /// Runs every `(testbench, test)` pair and writes the HTML report under
    /// `report_dir`. Returns the report path.
    pub fn run_regression(
        &mut self,
        tests: &[(String, String)],
        options: &RunOptions,
        report_dir: &Path,
    ) -> Result<PathBuf> {
        for (testbench, test) in tests {
            self.run_test(testbench, test, options);
        }
        let report_path = report_dir.join(format!(
            "report_{}.html",
            Local::now().format("%Y%m%d_%H%M%S")
        ));
        self.report.generate(&report_path)?;
        Ok(report_path)
    }
}
