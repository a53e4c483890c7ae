use serde::Serialize;

/// Captured result of one lifecycle command execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandOutput {
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }

    /// A synthetic failure produced without running anything (spawn error,
    /// timeout). Exit code -1 mirrors what the caller would see from a
    /// killed process.
    pub fn failure(command: &str, stderr: String, timed_out: bool) -> Self {
        Self {
            command: command.to_string(),
            exit_code: -1,
            stdout: String::new(),
            stderr,
            timed_out,
        }
    }
}
