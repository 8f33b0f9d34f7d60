//! x11grab capture through an ffmpeg child process.
//!
//! ffmpeg grabs the configured screen area, scales it to the output
//! resolution and writes raw RGBA frames to its stdout, which is read one
//! whole frame at a time:
//!
//! ```text
//! ffmpeg -video_size WxH -framerate F -f x11grab -i :0.0+X,Y \
//!        -f rawvideo -vf scale=RW:RH -pix_fmt rgba -an -
//! ```
//!
//! stderr is drained on a helper thread. Each line goes to the `ffmpeg`
//! debug target and the last few are kept, so a stream that closes early
//! reports why ffmpeg gave up.

use std::collections::VecDeque;
use std::io::{self, Read};
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::{CaptureConfig, CaptureError, CaptureResult, CaptureSource};

/// Screen grabber backed by `ffmpeg -f x11grab`.
pub struct FfmpegCapture {
    config: CaptureConfig,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    stderr: Option<StderrTail>,
}

impl FfmpegCapture {
    /// Creates a stopped grabber.
    pub fn new(config: CaptureConfig) -> CaptureResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            child: None,
            stdout: None,
            stderr: None,
        })
    }

    /// Arguments passed to ffmpeg, without the program name.
    pub fn args(&self) -> Vec<String> {
        let area = &self.config.area;
        let (rw, rh) = self.config.output_resolution();
        vec![
            "-video_size".into(),
            format!("{}x{}", area.width, area.height),
            "-framerate".into(),
            self.config.framerate.to_string(),
            "-f".into(),
            "x11grab".into(),
            "-i".into(),
            format!("{}+{},{}", self.config.display, area.x, area.y),
            "-f".into(),
            "rawvideo".into(),
            "-vf".into(),
            format!("scale={rw}:{rh}"),
            "-pix_fmt".into(),
            "rgba".into(),
            "-an".into(),
            "-".into(),
        ]
    }

    /// True while the child process is attached.
    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    fn frame_len(&self) -> usize {
        let (w, h) = self.config.output_resolution();
        w as usize * h as usize * 4
    }
}

impl CaptureSource for FfmpegCapture {
    fn start(&mut self) -> CaptureResult<()> {
        if self.child.is_some() {
            return Ok(());
        }
        let program = self.config.ffmpeg.clone();
        let args = self.args();
        debug!(program = %program, args = ?args, "spawning capture process");

        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CaptureError::Spawn {
                program: program.clone(),
                source,
            })?;
        let pipes = match (child.stdout.take(), child.stderr.take()) {
            (Some(stdout), Some(stderr)) => StderrTail::spawn(stderr).map(|tail| (stdout, tail)),
            _ => Err(CaptureError::Closed),
        };
        let (stdout, tail) = match pipes {
            Ok(pipes) => pipes,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
        };

        info!(pid = child.id(), "ffmpeg capture started");
        self.child = Some(child);
        self.stdout = Some(stdout);
        self.stderr = Some(tail);
        Ok(())
    }

    fn stop(&mut self) -> CaptureResult<()> {
        self.stdout = None;
        self.stderr = None;
        if let Some(mut child) = self.child.take() {
            // kill fails if the process already exited; wait still reaps it.
            if let Err(e) = child.kill() {
                debug!(error = %e, "ffmpeg already exited");
            }
            let status = child.wait()?;
            info!(%status, "ffmpeg capture stopped");
        }
        Ok(())
    }

    fn read_frame(&mut self, dst: &mut [u8]) -> CaptureResult<()> {
        let expected = self.frame_len();
        if dst.len() != expected {
            return Err(CaptureError::FrameSize {
                expected,
                got: dst.len(),
            });
        }
        let stdout = self.stdout.as_mut().ok_or(CaptureError::NotStarted)?;
        let err = match stdout.read_exact(dst) {
            Ok(()) => return Ok(()),
            Err(e) => CaptureError::from_read(e),
        };
        if !matches!(err, CaptureError::Closed) {
            return Err(err);
        }
        match self.stderr.as_ref().and_then(StderrTail::collect) {
            Some(stderr) => {
                warn!(program = %self.config.ffmpeg, "ffmpeg exited: {stderr}");
                Err(CaptureError::Exited {
                    program: self.config.ffmpeg.clone(),
                    stderr,
                })
            }
            None => Err(err),
        }
    }

    fn resolution(&self) -> (u32, u32) {
        self.config.output_resolution()
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

impl Drop for FfmpegCapture {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!(error = %e, "failed to stop ffmpeg capture");
        }
    }
}

/// Lines kept from ffmpeg's stderr.
const TAIL_LINES: usize = 8;
/// Longest stderr line kept before it is split.
const MAX_LINE: usize = 4096;
/// How long a closed stream waits for the stderr reader to finish.
const TAIL_WAIT: Duration = Duration::from_millis(500);

/// Background reader for the child's stderr.
struct StderrTail {
    lines: Arc<Mutex<VecDeque<String>>>,
    /// Disconnects when the reader thread returns.
    done: Receiver<()>,
}

impl StderrTail {
    fn spawn(stderr: ChildStderr) -> CaptureResult<Self> {
        let lines = Arc::new(Mutex::new(VecDeque::with_capacity(TAIL_LINES)));
        let (done_tx, done) = mpsc::channel::<()>();
        let shared = Arc::clone(&lines);
        thread::Builder::new()
            .name("lapse-ffmpeg-stderr".into())
            .spawn(move || {
                let _done = done_tx;
                drain(stderr, &shared);
            })?;
        Ok(Self { lines, done })
    }

    /// Waits briefly for the reader to hit EOF, then joins the kept lines.
    fn collect(&self) -> Option<String> {
        let _ = self.done.recv_timeout(TAIL_WAIT);
        let lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        if lines.is_empty() {
            None
        } else {
            Some(lines.iter().map(String::as_str).collect::<Vec<_>>().join("\n"))
        }
    }
}

/// Reads `src` to EOF, splitting on `\n` and `\r` (ffmpeg redraws its
/// progress line with carriage returns).
fn drain(mut src: impl Read, lines: &Mutex<VecDeque<String>>) {
    let mut chunk = [0u8; 4096];
    let mut line = Vec::new();
    loop {
        let n = match src.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!(error = %e, "ffmpeg stderr read failed");
                break;
            }
        };
        for &b in &chunk[..n] {
            if b == b'\n' || b == b'\r' {
                push_line(&mut line, lines);
            } else {
                line.push(b);
                if line.len() >= MAX_LINE {
                    push_line(&mut line, lines);
                }
            }
        }
    }
    push_line(&mut line, lines);
}

fn push_line(line: &mut Vec<u8>, lines: &Mutex<VecDeque<String>>) {
    let text = String::from_utf8_lossy(line).trim().to_string();
    line.clear();
    if text.is_empty() {
        return;
    }
    debug!(target: "ffmpeg", "{text}");
    let mut lines = lines.lock().unwrap_or_else(|e| e.into_inner());
    if lines.len() == TAIL_LINES {
        lines.pop_front();
    }
    lines.push_back(text);
}
