//! Invocation of the external document compiler.
//!
//! The compiler is a black box: it gets the entry file and the output root,
//! and only its exit status and combined output are looked at. A failed build
//! is reported to the caller and never retried here; the next qualifying
//! change simply tries again.

use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::config::RebuildConfig;
use crate::context::MirrorContext;

/// Errors from a rebuild attempt.
#[derive(Error, Debug)]
pub enum RebuildError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("Rebuild exited with {status}: {output}")]
    Failed { status: ExitStatus, output: String },
}

/// Result of a successful build.
#[derive(Debug, Clone)]
pub struct RebuildOutcome {
    /// stdout followed by stderr, trimmed.
    pub output: String,
    pub duration: Duration,
}

/// Something that can regenerate the output tree.
pub trait Rebuilder {
    fn rebuild(&mut self) -> Result<RebuildOutcome, RebuildError>;
}

/// Runs `<program> [args..] <entry> -D <output_root>` from the source root.
///
/// The entry file only exists in the source tree, so the compiler works from
/// there and writes into the output root through `-D`.
#[derive(Debug, Clone)]
pub struct CompilerCommand {
    program: String,
    args: Vec<String>,
    entry_file: String,
    source_root: PathBuf,
    output_root: PathBuf,
}

impl CompilerCommand {
    pub fn new(ctx: &MirrorContext, config: &RebuildConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            entry_file: ctx.entry_file().to_string(),
            source_root: ctx.source_root().to_path_buf(),
            output_root: ctx.output_root().to_path_buf(),
        }
    }

    /// Command line as logged, for humans.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.push(self.entry_file.clone());
        parts.push("-D".to_string());
        parts.push(self.output_root.display().to_string());
        parts.join(" ")
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(&self.entry_file)
            .arg("-D")
            .arg(&self.output_root)
            .current_dir(&self.source_root)
            .stdin(Stdio::null());
        cmd
    }
}

impl Rebuilder for CompilerCommand {
    fn rebuild(&mut self) -> Result<RebuildOutcome, RebuildError> {
        crate::log_event!("rebuild", "run", "{}", self.display());

        let started = Instant::now();
        let output = self
            .command()
            .output()
            .map_err(|source| RebuildError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        let combined = combined.trim().to_string();

        if output.status.success() {
            Ok(RebuildOutcome {
                output: combined,
                duration: started.elapsed(),
            })
        } else {
            Err(RebuildError::Failed {
                status: output.status,
                output: combined,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TrackedExtensions;
    use std::fs;
    use tempfile::TempDir;

    fn context(temp: &TempDir) -> MirrorContext {
        let src = temp.path().join("src");
        let out = temp.path().join("out");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&out).unwrap();
        fs::write(src.join("index.adoc"), "= Doc").unwrap();
        MirrorContext::new(&src, &out, TrackedExtensions::default(), "index").unwrap()
    }

    fn config(program: &str, args: &[&str]) -> RebuildConfig {
        RebuildConfig {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            debounce_ms: 0,
        }
    }

    #[test]
    fn test_display_command_line() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp);
        let cmd = CompilerCommand::new(&ctx, &config("asciidoctor", &["-a", "toc"]));

        assert_eq!(
            cmd.display(),
            format!("asciidoctor -a toc index.adoc -D {}", ctx.output_root().display())
        );
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp);
        let mut cmd = CompilerCommand::new(&ctx, &config("docmirror-no-such-compiler", &[]));

        let err = cmd.rebuild().unwrap_err();
        assert!(matches!(err, RebuildError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_success_captures_output_and_runs_in_source_root() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp);
        // sh -c '<script>' index.adoc -D <out>  => $0 = index.adoc, $2 = out
        let script = "test -f \"$0\" && echo built \"$0\" && echo warn >&2 && touch \"$2/index.html\"";
        let mut cmd = CompilerCommand::new(&ctx, &config("sh", &["-c", script]));

        let outcome = cmd.rebuild().unwrap();
        assert_eq!(outcome.output, "built index.adoc\nwarn");
        assert!(ctx.output_root().join("index.html").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_is_failure_with_output() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp);
        let mut cmd = CompilerCommand::new(&ctx, &config("sh", &["-c", "echo broken >&2; exit 3"]));

        match cmd.rebuild().unwrap_err() {
            RebuildError::Failed { status, output } => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(output, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
