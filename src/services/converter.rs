use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

use crate::config::GatewayConfig;

/// One invocation of the conversion tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Drop any video stream (audio extraction)
    pub drop_video: bool,
}

#[derive(Error, Debug)]
pub enum ConversionError {
    /// The tool ran and reported failure
    #[error("conversion tool exited with {status}")]
    ToolFailed { status: String, stderr: String },

    #[error("conversion timed out after {}s", .0.as_secs_f64())]
    TimedOut(Duration),

    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while converting: {0}")]
    Io(#[from] std::io::Error),
}

/// The external transcoder, behind a trait so handlers can be tested without ffmpeg.
#[async_trait::async_trait]
pub trait MediaConverter: Send + Sync {
    /// Runs the conversion to completion. `Ok` means the output file was written.
    async fn convert(&self, job: &ConversionJob) -> Result<(), ConversionError>;

    /// Tool version, or `None` when the tool cannot be run.
    async fn version(&self) -> Option<String>;
}

/// Runs `ffmpeg -y -i <input> [-vn] <output>` as a subprocess.
pub struct FfmpegConverter {
    program: PathBuf,
    timeout: Duration,
}

impl FfmpegConverter {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn build_args(job: &ConversionJob) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-y".into(), "-i".into(), job.input.clone().into()];
        if job.drop_video {
            args.push("-vn".into());
        }
        args.push(job.output.clone().into());
        args
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }
}

#[async_trait::async_trait]
impl MediaConverter for FfmpegConverter {
    async fn convert(&self, job: &ConversionJob) -> Result<(), ConversionError> {
        let child = Command::new(&self.program)
            .args(Self::build_args(job))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ConversionError::Spawn {
                program: self.program_name(),
                source,
            })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => return Err(ConversionError::TimedOut(self.timeout)),
        };

        if !output.status.success() {
            return Err(ConversionError::ToolFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(())
    }

    async fn version(&self) -> Option<String> {
        let probe = Command::new(&self.program)
            .arg("-version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(Duration::from_secs(5), probe).await {
            Ok(Ok(output)) if output.status.success() => output,
            Ok(Ok(output)) => {
                tracing::debug!("{} -version exited with {}", self.program_name(), output.status);
                return None;
            }
            Ok(Err(e)) => {
                tracing::debug!("{} -version failed: {}", self.program_name(), e);
                return None;
            }
            Err(_) => return None,
        };

        // "ffmpeg version 7.1 Copyright ..." -> "7.1"
        let stdout = String::from_utf8_lossy(&output.stdout);
        Some(
            stdout
                .split_whitespace()
                .nth(2)
                .unwrap_or("unknown")
                .to_string(),
        )
    }
}

/// Factory for the configured converter.
pub fn create_converter(config: &GatewayConfig) -> Arc<dyn MediaConverter> {
    Arc::new(FfmpegConverter::new(
        config.ffmpeg_path.clone(),
        config.conversion_timeout,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(drop_video: bool) -> ConversionJob {
        ConversionJob {
            input: PathBuf::from("uploads/abc_movie.mp4"),
            output: PathBuf::from("uploads/abc_movie.mp3"),
            drop_video,
        }
    }

    #[test]
    fn test_build_args_generic() {
        let args = FfmpegConverter::build_args(&job(false));
        assert_eq!(
            args,
            vec!["-y", "-i", "uploads/abc_movie.mp4", "uploads/abc_movie.mp3"]
                .into_iter()
                .map(OsString::from)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_build_args_drop_video() {
        let args = FfmpegConverter::build_args(&job(true));
        assert_eq!(args[3], OsString::from("-vn"));
        assert_eq!(args.last(), Some(&OsString::from("uploads/abc_movie.mp3")));
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let converter = FfmpegConverter::new(
            "/nonexistent/definitely-not-ffmpeg",
            Duration::from_secs(1),
        );
        let err = converter.convert(&job(false)).await.unwrap_err();
        assert!(matches!(err, ConversionError::Spawn { .. }));
        assert!(converter.version().await.is_none());
    }

    #[cfg(unix)]
    mod subprocess {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use std::path::Path;

        fn write_script(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("fake-ffmpeg");
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[tokio::test]
        async fn test_success_writes_output() {
            let dir = tempfile::tempdir().unwrap();
            let script = write_script(dir.path(), "for last; do :; done\ncp \"$3\" \"$last\"");
            let input = dir.path().join("in.wav");
            let output = dir.path().join("out.flac");
            std::fs::write(&input, b"RIFF").unwrap();

            let converter = FfmpegConverter::new(script, Duration::from_secs(10));
            converter
                .convert(&ConversionJob {
                    input,
                    output: output.clone(),
                    drop_video: false,
                })
                .await
                .unwrap();

            assert_eq!(std::fs::read(output).unwrap(), b"RIFF");
        }

        #[tokio::test]
        async fn test_nonzero_exit_captures_stderr() {
            let dir = tempfile::tempdir().unwrap();
            let script = write_script(dir.path(), "echo 'Invalid data found' >&2\nexit 3");

            let converter = FfmpegConverter::new(script, Duration::from_secs(10));
            let err = converter.convert(&job(false)).await.unwrap_err();
            match err {
                ConversionError::ToolFailed { stderr, .. } => {
                    assert!(stderr.contains("Invalid data found"));
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_slow_tool_times_out() {
            let dir = tempfile::tempdir().unwrap();
            let script = write_script(dir.path(), "sleep 5");

            let converter = FfmpegConverter::new(script, Duration::from_millis(200));
            let started = std::time::Instant::now();
            let err = converter.convert(&job(false)).await.unwrap_err();
            assert!(matches!(err, ConversionError::TimedOut(_)));
            assert!(started.elapsed() < Duration::from_secs(4));
        }

        #[tokio::test]
        async fn test_version_parsing() {
            let dir = tempfile::tempdir().unwrap();
            let script = write_script(dir.path(), "echo 'ffmpeg version 7.1 Copyright (c) 2000-2024'");

            let converter = FfmpegConverter::new(script, Duration::from_secs(1));
            assert_eq!(converter.version().await.as_deref(), Some("7.1"));
        }
    }
}
