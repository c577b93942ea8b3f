use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use serde::{Deserialize, Serialize};

use crate::core::error::SessionError;
use crate::placement::Owner;

const DONE_MARKER: &str = "Done!";
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Brick layout the converter should produce
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ConversionMode {
    Default,
    Tile,
    Micro,
}

impl ConversionMode {
    fn flag(self) -> Option<&'static str> {
        match self {
            ConversionMode::Default => None,
            ConversionMode::Tile => Some("--tile"),
            ConversionMode::Micro => Some("--micro"),
        }
    }
}

/// One image-to-artifact job
#[derive(Clone, Debug)]
pub struct ConversionRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub owner: Owner,
    pub mode: ConversionMode,
}

/// Pixel counts from the converter's `Reduced <before> to <after>` report
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reduction {
    pub before: u64,
    pub after: u64,
}

/// Turns an image file into a placeable artifact.
pub trait Converter: Send + Sync {
    /// Must return early with [`SessionError::ConversionFailed`] once `cancel` is set.
    fn convert(&self, request: &ConversionRequest, cancel: &AtomicBool) -> Result<Reduction, SessionError>;
}

/// Drives the external `heightmap` binary as a subprocess.
pub struct HeightmapConverter {
    program: PathBuf,
    scale: u32,
    verbosity: u32,
    timeout: Duration,
}

impl HeightmapConverter {
    pub fn new(program: impl Into<PathBuf>, scale: u32, verbosity: u32, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            scale,
            verbosity,
            timeout,
        }
    }

    pub fn command_args(&self, request: &ConversionRequest) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            request.output.to_string_lossy().to_string(),
            "--nocollide".to_string(),
            "--cull".to_string(),
            "--owner_id".to_string(),
            request.owner.id.to_string(),
            "--owner".to_string(),
            request.owner.name.to_string(),
            "-s".to_string(),
            self.scale.to_string(),
            "-v".to_string(),
            self.verbosity.to_string(),
            "--img".to_string(),
            request.input.to_string_lossy().to_string(),
        ];
        if let Some(flag) = request.mode.flag() {
            args.push(flag.to_string());
        }
        args
    }

    /// Poll until exit, timeout or cancellation. Returns whether the exit was successful.
    fn wait(&self, child: &mut Child, cancel: &AtomicBool, started: Instant) -> Result<bool, SessionError> {
        loop {
            if cancel.load(Ordering::SeqCst) {
                kill(child);
                return Err(cancelled());
            }
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status.success()),
                Ok(None) => {}
                Err(e) => {
                    kill(child);
                    return Err(SessionError::ConversionFailed(format!("wait failed: {}", e)));
                }
            }
            if started.elapsed() > self.timeout {
                kill(child);
                return Err(self.timed_out());
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Stdout closes only when every process holding the pipe is gone, which a forked
    /// helper can delay past the child's own exit. The same deadline and cancel flag apply.
    fn collect_output(
        &self,
        output: &Receiver<String>,
        cancel: &AtomicBool,
        started: Instant,
    ) -> Result<String, SessionError> {
        loop {
            if cancel.load(Ordering::SeqCst) {
                return Err(cancelled());
            }
            match output.recv_timeout(POLL_INTERVAL) {
                Ok(out) => return Ok(out),
                Err(RecvTimeoutError::Disconnected) => return Ok(String::new()),
                Err(RecvTimeoutError::Timeout) => {}
            }
            if started.elapsed() > self.timeout {
                return Err(self.timed_out());
            }
        }
    }

    fn timed_out(&self) -> SessionError {
        SessionError::ConversionFailed(format!("timed out after {:.1}s", self.timeout.as_secs_f64()))
    }
}

fn cancelled() -> SessionError {
    SessionError::ConversionFailed("cancelled".to_string())
}

impl Converter for HeightmapConverter {
    fn convert(&self, request: &ConversionRequest, cancel: &AtomicBool) -> Result<Reduction, SessionError> {
        let args = self.command_args(request);
        crate::utils::logger::debug(&format!("{} {}", self.program.display(), args.join(" ")));

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                SessionError::ConversionFailed(format!("could not start {}: {}", self.program.display(), e))
            })?;

        // drain stdout on the side so a chatty converter never blocks on a full pipe
        let reader = child.stdout.take().map(|mut stdout| {
            let (tx, rx) = crossbeam_channel::bounded(1);
            thread::spawn(move || {
                let mut out = String::new();
                let _ = stdout.read_to_string(&mut out);
                let _ = tx.send(out);
            });
            rx
        });

        let started = Instant::now();
        let success = self.wait(&mut child, cancel, started)?;
        let stdout = match &reader {
            Some(output) => self.collect_output(output, cancel, started)?,
            None => String::new(),
        };

        crate::utils::logger::debug(&format!("converter output: {}", stdout.trim()));
        validate_output(success, &stdout)
    }
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// A run only counts when it exited cleanly and printed both the report and the marker.
pub fn validate_output(exited_ok: bool, stdout: &str) -> Result<Reduction, SessionError> {
    if !exited_ok {
        return Err(SessionError::ConversionFailed("converter exited abnormally".to_string()));
    }
    if !stdout.contains(DONE_MARKER) {
        return Err(SessionError::ConversionFailed("could not finish conversion".to_string()));
    }
    parse_reduction(stdout)
        .ok_or_else(|| SessionError::ConversionFailed("missing reduction report".to_string()))
}

/// First `Reduced <int> to <int>` in the output
pub fn parse_reduction(stdout: &str) -> Option<Reduction> {
    let mut rest = stdout;
    while let Some(pos) = rest.find("Reduced ") {
        rest = &rest[pos + "Reduced ".len()..];
        if let Some(reduction) = reduction_at(rest) {
            return Some(reduction);
        }
    }
    None
}

fn reduction_at(s: &str) -> Option<Reduction> {
    let (before, rest) = take_number(s)?;
    let (after, _) = take_number(rest.strip_prefix(" to ")?)?;
    Some(Reduction { before, after })
}

fn take_number(s: &str) -> Option<(u64, &str)> {
    let digits = s.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    Some((s[..digits].parse().ok()?, &s[digits..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::OWNERS;

    const GOOD: &str = "Reading image\nReduced 38400 to 912 bricks\nWriting save\nDone!\n";

    fn request(mode: ConversionMode) -> ConversionRequest {
        ConversionRequest {
            input: PathBuf::from("/tmp/frame.png"),
            output: PathBuf::from("/saves/gba_temp_0.brs"),
            owner: OWNERS[1],
            mode,
        }
    }

    #[test]
    fn test_accepts_complete_output() {
        assert_eq!(
            validate_output(true, GOOD).unwrap(),
            Reduction { before: 38400, after: 912 }
        );
    }

    #[test]
    fn test_rejects_incomplete_or_abnormal_runs() {
        let no_marker = "Reduced 38400 to 912 bricks\n";
        let no_report = "Reading image\nDone!\n";
        let bad_report = "Reduced lots to 912\nDone!\n";

        for (ok, out) in [(true, no_marker), (true, no_report), (true, bad_report), (false, GOOD)] {
            assert!(
                matches!(validate_output(ok, out), Err(SessionError::ConversionFailed(_))),
                "accepted exited_ok={} stdout={:?}",
                ok,
                out
            );
        }
    }

    #[test]
    fn test_reduction_skips_unrelated_mentions() {
        let out = "Reduced colors\nReduced 10 to 4\nDone!";
        assert_eq!(parse_reduction(out), Some(Reduction { before: 10, after: 4 }));
    }

    #[test]
    fn test_command_line_layout() {
        let converter = HeightmapConverter::new("heightmap", 1, 1, Duration::from_secs(5));
        let args = converter.command_args(&request(ConversionMode::Micro));
        assert_eq!(
            args,
            vec![
                "-o", "/saves/gba_temp_0.brs", "--nocollide", "--cull",
                "--owner_id", "c4f9159c-2a1a-3131-b10e-296e950fe7f7",
                "--owner", "GBA EMU B", "-s", "1", "-v", "1",
                "--img", "/tmp/frame.png", "--micro",
            ]
        );

        let default_args = converter.command_args(&request(ConversionMode::Default));
        assert_eq!(default_args.last().map(String::as_str), Some("/tmp/frame.png"));
        let tile_args = converter.command_args(&request(ConversionMode::Tile));
        assert_eq!(tile_args.last().map(String::as_str), Some("--tile"));
    }

    #[test]
    fn test_missing_program_is_conversion_failure() {
        let converter = HeightmapConverter::new(
            "/nonexistent/brickscreen-heightmap",
            1,
            1,
            Duration::from_secs(1),
        );
        let cancel = AtomicBool::new(false);
        let result = converter.convert(&request(ConversionMode::Micro), &cancel);
        assert!(matches!(result, Err(SessionError::ConversionFailed(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_clean_exit_without_markers_still_fails() {
        let converter = HeightmapConverter::new("true", 1, 1, Duration::from_secs(5));
        let cancel = AtomicBool::new(false);
        let result = converter.convert(&request(ConversionMode::Micro), &cancel);
        assert!(matches!(result, Err(SessionError::ConversionFailed(_))));
    }

    /// Executable shell script standing in for the converter; it ignores its arguments.
    #[cfg(unix)]
    fn script(name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let dir = std::env::temp_dir().join("brickscreen_converter_tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    fn run_script(name: &str, body: &str, timeout: Duration, cancel: &AtomicBool) -> (Result<Reduction, SessionError>, Duration) {
        let converter = HeightmapConverter::new(script(name, body), 1, 1, timeout);
        let started = Instant::now();
        let result = converter.convert(&request(ConversionMode::Micro), cancel);
        (result, started.elapsed())
    }

    #[cfg(unix)]
    #[test]
    fn test_script_output_is_validated() {
        let cancel = AtomicBool::new(false);
        let (result, _) = run_script(
            "good.sh",
            "echo 'Reduced 38400 to 912 bricks'\necho 'Done!'",
            Duration::from_secs(5),
            &cancel,
        );
        assert_eq!(result.unwrap(), Reduction { before: 38400, after: 912 });
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_slow_converter() {
        let cancel = AtomicBool::new(false);
        let (result, elapsed) = run_script("slow.sh", "exec sleep 10", Duration::from_millis(300), &cancel);
        assert!(matches!(result, Err(SessionError::ConversionFailed(ref m)) if m.starts_with("timed out")));
        assert!(elapsed < Duration::from_secs(3), "took {:?}", elapsed);
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_not_held_up_by_forked_helper() {
        let cancel = AtomicBool::new(false);
        let (result, elapsed) = run_script("forking.sh", "sleep 6 &\nsleep 10", Duration::from_millis(300), &cancel);
        assert!(matches!(result, Err(SessionError::ConversionFailed(ref m)) if m.starts_with("timed out")));
        assert!(elapsed < Duration::from_secs(3), "took {:?}", elapsed);
    }

    #[cfg(unix)]
    #[test]
    fn test_helper_outliving_clean_exit_hits_timeout() {
        let cancel = AtomicBool::new(false);
        let (result, elapsed) = run_script(
            "lingering.sh",
            "sleep 6 &\necho 'Reduced 4 to 2'\necho 'Done!'",
            Duration::from_millis(300),
            &cancel,
        );
        assert!(matches!(result, Err(SessionError::ConversionFailed(_))));
        assert!(elapsed < Duration::from_secs(3), "took {:?}", elapsed);
    }

    #[cfg(unix)]
    #[test]
    fn test_cancel_stops_running_converter() {
        use std::sync::Arc;

        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            flag.store(true, Ordering::SeqCst);
        });

        let (result, elapsed) = run_script("cancelled.sh", "sleep 6 &\nsleep 10", Duration::from_secs(30), &cancel);
        canceller.join().unwrap();
        assert!(matches!(result, Err(SessionError::ConversionFailed(ref m)) if m == "cancelled"));
        assert!(elapsed < Duration::from_secs(3), "took {:?}", elapsed);
    }
}
