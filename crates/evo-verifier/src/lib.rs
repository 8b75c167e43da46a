//! # evo-verifier
//!
//! Writes a candidate source to disk and runs the external compiler on it.
//!
//! The verifier classifies every invocation into exactly one of:
//!
//! - [`BuildOutcome::Success`] - exit status 0 and the binary exists;
//! - [`BuildOutcome::CompileFailure`] - the compiler rejected the candidate
//!   (stderr is the diagnostic fed back into the next prompt);
//! - [`VerifierError`] - the build *environment* failed (compiler missing,
//!   spawn error, wall-clock timeout). These say nothing about the
//!   candidate's quality and must never be fed back as "fix this" prompts.
//!
//! Each attempt's source file is named by its sequence number, so a run's
//! working directory doubles as its forensic history. The working directory
//! is exclusive to one loop run; concurrent runs need distinct directories.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;

/// How the external compiler is invoked.
///
/// The command line is `command [args...] <source> -o <binary>`, which fits
/// the cc/gcc/clang/tcc family the source scripts shelled out to.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Compiler executable name or path.
    pub command: String,
    /// Extra arguments placed before the source path.
    pub args: Vec<String>,
    /// Extension for candidate source files (no leading dot).
    pub source_extension: String,
    /// Wall-clock bound on one compiler invocation.
    pub timeout: Duration,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            command: "cc".to_string(),
            args: Vec::new(),
            source_extension: "c".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl CompilerConfig {
    /// Full argument vector for one invocation (everything after the
    /// command itself).
    fn build_args(&self, source: &Path, binary: &Path) -> Vec<std::ffi::OsString> {
        let mut args: Vec<std::ffi::OsString> =
            self.args.iter().map(|a| a.into()).collect();
        args.push(source.into());
        args.push("-o".into());
        args.push(binary.into());
        args
    }
}

/// Classification of one compile attempt.
#[derive(Debug, Clone)]
pub enum BuildOutcome {
    /// Exit status 0 and the expected binary artifact exists.
    Success {
        source_path: PathBuf,
        binary_path: PathBuf,
    },
    /// The compiler rejected the candidate. `diagnostic` is the captured
    /// stderr, verbatim.
    CompileFailure { diagnostic: String },
}

/// Infrastructure failures, distinct from a candidate failing to compile.
#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    #[error("compiler executable `{command}` not found")]
    CompilerNotFound { command: String },

    #[error("failed to spawn compiler: {0}")]
    Spawn(std::io::Error),

    #[error("compiler exceeded timeout of {0:?}")]
    Timeout(Duration),

    #[error("failed to write candidate source: {0}")]
    Io(std::io::Error),
}

/// Compiles candidate sources inside a per-run working directory.
pub struct BuildVerifier {
    config: CompilerConfig,
    workdir: PathBuf,
}

impl BuildVerifier {
    pub fn new(config: CompilerConfig, workdir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// File names for the given attempt, keyed by sequence number so no
    /// prior attempt's file is ever overwritten.
    fn attempt_paths(&self, sequence: u32) -> (PathBuf, PathBuf) {
        let source = self
            .workdir
            .join(format!("attempt_{:03}.{}", sequence, self.config.source_extension));
        let binary = self.workdir.join(format!("attempt_{:03}.bin", sequence));
        (source, binary)
    }

    /// Write `source` to a fresh sequence-keyed file and compile it.
    pub async fn verify(
        &self,
        source: &str,
        sequence: u32,
    ) -> Result<BuildOutcome, VerifierError> {
        debug_assert!(sequence >= 1, "Sequence numbers are 1-indexed");

        let (source_path, binary_path) = self.attempt_paths(sequence);

        tokio::fs::create_dir_all(&self.workdir)
            .await
            .map_err(VerifierError::Io)?;
        tokio::fs::write(&source_path, source)
            .await
            .map_err(VerifierError::Io)?;

        let result = tokio::time::timeout(
            self.config.timeout,
            Command::new(&self.config.command)
                .args(self.config.build_args(&source_path, &binary_path))
                .current_dir(&self.workdir)
                .output(),
        )
        .await;

        match result {
            Ok(Ok(output)) => {
                let binary_exists = tokio::fs::metadata(&binary_path).await.is_ok();
                if output.status.success() && binary_exists {
                    Ok(BuildOutcome::Success {
                        source_path,
                        binary_path,
                    })
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    let diagnostic = if stderr.trim().is_empty() {
                        if output.status.success() {
                            format!(
                                "compiler exited successfully but produced no binary at {}",
                                binary_path.display()
                            )
                        } else {
                            format!("compiler exited with {} and no diagnostics", output.status)
                        }
                    } else {
                        stderr.into_owned()
                    };
                    Ok(BuildOutcome::CompileFailure { diagnostic })
                }
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(VerifierError::CompilerNotFound {
                    command: self.config.command.clone(),
                })
            }
            Ok(Err(e)) => Err(VerifierError::Spawn(e)),
            Err(_) => Err(VerifierError::Timeout(self.config.timeout)),
        }
    }
}

/// Extract the first error line from a compiler diagnostic.
///
/// Used to condense progress output; the full text is always what gets
/// recorded and fed back to the model.
pub fn first_error_line(diagnostic: &str) -> &str {
    for line in diagnostic.lines() {
        if line.contains("error:") || line.contains("error[") {
            return line;
        }
    }
    diagnostic
        .lines()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("unknown error")
}
