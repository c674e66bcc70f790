use log::{debug, info, warn};
use std::env;
use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    Pre,
    Post,
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookStage::Pre => f.write_str("pre-script"),
            HookStage::Post => f.write_str("post-script"),
        }
    }
}

/// Outcome of one hook invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookResult {
    /// The script was found and started
    pub ran: bool,
    /// The script exited with status zero
    pub succeeded: bool,
    /// Captured stdout and stderr, in the order they were written
    pub output: Vec<u8>,
    pub exit_code: Option<i32>,
}

impl HookResult {
    pub fn skipped() -> Self {
        Self::default()
    }

    pub fn output_lossy(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// Runs the hook at `script`, if any.
///
/// The script is executed with no arguments in the current working directory, and a
/// relative path is resolved against that directory rather than `PATH`. A missing or
/// failing script never aborts the caller; the result only records what happened.
pub fn run_hook(stage: HookStage, script: Option<&Path>) -> HookResult {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    run_hook_from(stage, script, &cwd)
}

pub(crate) fn run_hook_from(stage: HookStage, script: Option<&Path>, base: &Path) -> HookResult {
    let Some(script) = script.filter(|p| !p.as_os_str().is_empty()) else {
        debug!("*{stage}* not configured");
        return HookResult::skipped();
    };

    let script = base.join(script);
    if !script.exists() {
        info!("*{stage}* {} does not exist. Skipping", script.display());
        return HookResult::skipped();
    }

    info!("*{stage}* Running {}", script.display());
    let (status, output) = match execute(&script) {
        Ok(done) => done,
        Err(error) => {
            warn!("*{stage}* Failed to start {}: {error}", script.display());
            warn!("Continuing the update process");
            return HookResult {
                ran: true,
                succeeded: false,
                output: error.to_string().into_bytes(),
                exit_code: None,
            };
        }
    };

    let result = HookResult {
        ran: true,
        succeeded: status.success(),
        output,
        exit_code: status.code(),
    };

    if result.succeeded {
        info!("*{stage}* Execution completed {}", result.output_lossy());
    } else {
        warn!("*{stage}* Failed to run ({status}) {}", result.output_lossy());
        warn!("Continuing the update process");
    }
    result
}

/// Runs `script` with stdout and stderr sharing one pipe, so the captured output
/// keeps the order the script wrote it in.
fn execute(script: &Path) -> io::Result<(ExitStatus, Vec<u8>)> {
    let (mut reader, writer) = io::pipe()?;
    let mut child = Command::new(script)
        .stdin(Stdio::null())
        .stdout(writer.try_clone()?)
        .stderr(writer)
        .spawn()?;

    let mut output = Vec::new();
    let read = reader.read_to_end(&mut output);
    let status = child.wait()?;
    read?;
    Ok((status, output))
}
