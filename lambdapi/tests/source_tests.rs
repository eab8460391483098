use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::process;
use std::{env, fs, io};
use walkdir::WalkDir;

use libtest_mimic::{Arguments, Failed, Trial};

fn main() {
    let args = Arguments::from_args();

    env::set_current_dir("..").unwrap();

    let tests = find_source_files("tests").map(extract_test).collect();

    libtest_mimic::run(&args, tests).exit();
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
#[serde(rename_all = "kebab-case")]
struct Config {
    #[serde(default = "DEFAULT_IGNORE")]
    ignore: bool,
    #[serde(default = "DEFAULT_EXIT_CODE")]
    exit_code: i32,
    #[serde(default = "DEFAULT_ALLOW_ERRORS")]
    allow_errors: bool,
    #[serde(skip)]
    update_snapshots: bool,
}

const DEFAULT_IGNORE: fn() -> bool = || false;
const DEFAULT_EXIT_CODE: fn() -> i32 = || 0;
const DEFAULT_ALLOW_ERRORS: fn() -> bool = || false;

const CONFIG_COMMENT_START: &str = "//~";

struct TestFailure {
    name: &'static str,
    details: Vec<(&'static str, String)>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
#[serde(rename_all = "kebab-case")]
struct SnapshotData {
    stdout: String,
    stderr: String,
}

#[derive(Debug)]
struct Snapshot {
    path: PathBuf,
    expected: Option<SnapshotData>,
    actual: SnapshotData,
}

#[derive(Eq, PartialEq, Debug)]
enum SnapshotOutcome {
    Equal,
    Different,
    Missing,
}

/// Recursively walk over test files under a file path.
fn find_source_files(root: impl AsRef<Path>) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| matches!(entry.path().extension(), Some(ext) if ext == "lp"))
        .map(|entry| entry.into_path())
}

fn extract_test(path: PathBuf) -> Trial {
    let name = path.display().to_string();
    let config = read_config(&path);
    let ignored = matches!(&config, Ok(config) if config.ignore);

    Trial::test(name, move || run_test(&path, config)).with_ignored_flag(ignored)
}

fn read_config(input_file: &Path) -> Result<Config, TestFailure> {
    use itertools::Itertools;

    let input_source = fs::read_to_string(input_file).map_err(|error| TestFailure {
        name: "unexpected test file error",
        details: vec![("std::io::Error", error.to_string())],
    })?;
    // Collect the lines with CONFIG_COMMENT_START prefix, stripping the prefix in the process
    let config_source = input_source
        .lines()
        .filter_map(|line| line.split(CONFIG_COMMENT_START).nth(1))
        .join("\n");

    // Parse those lines as TOML
    match toml::from_str::<Config>(&config_source) {
        Ok(mut config) => {
            config.update_snapshots = env::var_os("LAMBDAPI_UPDATE_SNAP").is_some();
            Ok(config)
        }
        Err(error) => Err(TestFailure {
            name: "config parse error",
            details: vec![("toml::de::Error", error.to_string())],
        }),
    }
}

fn run_test(input_file: &Path, config: Result<Config, TestFailure>) -> Result<(), Failed> {
    let config = match config {
        Ok(config) => config,
        Err(failure) => return failures_to_outcome(&[failure]),
    };

    let failures = match run_command(&config, input_file) {
        Ok(failures) => failures,
        Err(error) => vec![TestFailure {
            name: "unexpected test command error",
            details: vec![("std::io::Error", error.to_string())],
        }],
    };

    failures_to_outcome(&failures)
}

fn failures_to_outcome(failures: &[TestFailure]) -> Result<(), Failed> {
    if failures.is_empty() {
        return Ok(());
    }

    let mut msg = String::new();

    writeln!(msg).unwrap();
    for failure in failures {
        writeln!(msg, "    {}:", failure.name).unwrap();
        for (name, data) in &failure.details {
            writeln!(msg, "        ---- {} ----", name).unwrap();
            for line in data.lines() {
                writeln!(msg, "        {}", line).unwrap();
            }
        }
        writeln!(msg).unwrap();
    }
    writeln!(msg).unwrap();
    writeln!(msg, "    failures:").unwrap();
    for failure in failures {
        writeln!(msg, "        {}", failure.name).unwrap();
    }

    Err(msg.into())
}

fn check_command(config: &Config, input_file: &Path) -> process::Command {
    let mut exe = process::Command::new(env!("CARGO_BIN_EXE_lambdapi"));
    exe.arg("check");
    if config.allow_errors {
        exe.arg("--allow-errors");
    }
    exe.arg(input_file);
    exe
}

fn run_command(config: &Config, input_file: &Path) -> Result<Vec<TestFailure>, io::Error> {
    let mut failures = Vec::new();
    let mut exe = check_command(config, input_file);

    let output = match exe.output() {
        Ok(output) => output,
        Err(error) => {
            failures.push(TestFailure {
                name: "unexpected command error",
                details: vec![("std::io::Error", error.to_string())],
            });
            return Ok(failures);
        }
    };

    let mut snapshot = Snapshot::new(input_file, &output)?;

    // Update if requested
    if config.update_snapshots && snapshot.outcome() != SnapshotOutcome::Equal {
        snapshot.update()?;
    }

    match snapshot.outcome() {
        SnapshotOutcome::Equal => {}
        SnapshotOutcome::Different => {
            let mut details = vec![("path", snapshot.path.to_string_lossy().into_owned())];
            if let Some(diff) = snapshot.stdout_diff() {
                details.push(("stdout diff", diff));
            }
            if let Some(diff) = snapshot.stderr_diff() {
                details.push(("stderr diff", diff));
            }

            failures.push(TestFailure {
                name: "snapshot mismatch",
                details,
            });
        }
        SnapshotOutcome::Missing => {
            let mut details = vec![("path", snapshot.path.to_string_lossy().into_owned())];
            if !snapshot.stdout().is_empty() {
                details.push(("stdout", snapshot.stdout().to_string()));
            }
            if !snapshot.stderr().is_empty() {
                details.push(("stderr", snapshot.stderr().to_string()));
            }

            failures.push(TestFailure {
                name: "snapshot missing",
                details,
            });
        }
    }

    if output.status.code() != Some(config.exit_code) {
        let mut details = vec![
            ("command", format!("{:?}", exe)),
            ("status", output.status.to_string()),
        ];
        if !snapshot.stdout().is_empty() {
            details.push(("stdout", snapshot.stdout().to_string()));
        }
        if !snapshot.stderr().is_empty() {
            details.push(("stderr", snapshot.stderr().to_string()));
        }
        failures.push(TestFailure {
            name: "unexpected command output",
            details,
        });
    }

    Ok(failures)
}

impl Snapshot {
    fn new(test_path: &Path, output: &process::Output) -> Result<Snapshot, io::Error> {
        let path = test_path.with_extension("snap");
        let actual = SnapshotData {
            stdout: String::from_utf8_lossy(&output.stdout).into(),
            stderr: String::from_utf8_lossy(&output.stderr).into(),
        };
        let expected = match fs::read_to_string(&path) {
            Ok(snap) => toml::from_str(&snap)
                .map(Some)
                .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?,
            Err(err) => match err.kind() {
                io::ErrorKind::NotFound => {
                    // Snapshot is missing and needs to be generated
                    None
                }
                _ => return Err(err),
            },
        };
        Ok(Snapshot {
            path,
            expected,
            actual,
        })
    }

    fn stdout(&self) -> &str {
        &self.actual.stdout
    }

    fn stderr(&self) -> &str {
        &self.actual.stderr
    }

    fn update(&mut self) -> Result<(), io::Error> {
        let serialised = toml::to_string_pretty(&self.actual)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
        fs::write(&self.path, serialised)?;
        self.expected = Some(self.actual.clone());
        Ok(())
    }

    fn outcome(&self) -> SnapshotOutcome {
        match self.expected {
            Some(ref expected) if expected == &self.actual => SnapshotOutcome::Equal,
            Some(_) => SnapshotOutcome::Different,
            None => SnapshotOutcome::Missing,
        }
    }

    fn stdout_diff(&self) -> Option<String> {
        self.expected
            .as_ref()
            .and_then(|expected| make_diff(&self.actual.stdout, &expected.stdout))
    }

    fn stderr_diff(&self) -> Option<String> {
        self.expected
            .as_ref()
            .and_then(|expected| make_diff(&self.actual.stderr, &expected.stderr))
    }
}

fn make_diff(actual: &str, expected: &str) -> Option<String> {
    let mut diff = String::new();
    let mut left_line_number = 0;
    let mut right_line_number = 0;
    let line_width = (actual.lines().count().max(expected.lines().count()) as f32)
        .log10()
        .ceil() as usize;
    for result in diff::lines(expected, actual).into_iter() {
        match result {
            diff::Result::Left(l) => {
                left_line_number += 1;
                diff.push_str(&diff_line('-', left_line_number, line_width, l));
            }
            diff::Result::Both(_l, _r) => {
                left_line_number += 1;
                right_line_number += 1;
            }
            diff::Result::Right(r) => {
                right_line_number += 1;
                diff.push_str(&diff_line('+', right_line_number, line_width, r));
            }
        }
    }
    if diff.is_empty() {
        None
    } else {
        Some(diff)
    }
}

fn diff_line(sign: char, line_number: usize, line_width: usize, line: &str) -> String {
    format!(
        "{:>width$}| {} {}\n",
        line_number,
        sign,
        line,
        width = line_width
    )
}
