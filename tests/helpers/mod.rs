use std::fs;
use std::sync::Mutex;

use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use imgprov::executor::{CommandExecutor, CommandSpec, ExecutionResult};
use tempfile::TempDir;

/// Creates a temporary directory and returns it along with its UTF-8 path.
///
/// The directory is removed when the returned `TempDir` is dropped.
#[allow(dead_code)]
pub fn utf8_tempdir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf())
        .expect("temp dir path should be valid UTF-8");
    (temp_dir, path)
}

/// Writes `content` to `dir/name` and returns the full path.
#[allow(dead_code)]
pub fn write_file(dir: &Utf8Path, name: &str, content: &str) -> Utf8PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create parent directory");
    }
    fs::write(&path, content).expect("failed to write file");
    path
}

/// Writes a profile YAML into `dir` and returns its path.
#[allow(dead_code)]
pub fn write_profile(dir: &Utf8Path, yaml: &str) -> Utf8PathBuf {
    write_file(dir, "profile.yaml", yaml)
}

/// Executor that records every command and reports success.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingExecutor {
    specs: Mutex<Vec<CommandSpec>>,
}

#[allow(dead_code)]
impl RecordingExecutor {
    pub fn recorded(&self) -> Vec<CommandSpec> {
        self.specs.lock().unwrap().clone()
    }

    /// Returns the shell command passed after `-c` for each recorded spec.
    pub fn shell_commands(&self) -> Vec<String> {
        self.recorded()
            .iter()
            .filter_map(|spec| {
                let position = spec.args.iter().position(|a| a == "-c")?;
                spec.args.get(position + 1).cloned()
            })
            .collect()
    }
}

impl CommandExecutor for RecordingExecutor {
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult> {
        self.specs.lock().unwrap().push(spec.clone());
        Ok(ExecutionResult { status: None })
    }
}

/// Executor whose every command fails to start.
#[allow(dead_code)]
pub struct FailingExecutor;

impl CommandExecutor for FailingExecutor {
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult> {
        anyhow::bail!("command not found: {}", spec.command)
    }
}
