//! Adapter for an external bitmap tracer (potrace command-line protocol).
//!
//! The bitmap is written as a binary PBM into a per-call temporary directory,
//! the tool is run with a hard timeout, and its SVG is rescaled onto the
//! source image's coordinate space. The directory is removed when the call
//! returns, whichever way it returns.

use crate::binarizer::BinaryBitmap;
use crate::error::ConvertError;
use crate::image_processor::Geometry;
use crate::markup;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Locations probed, in order, when looking for the tracer.
pub const CANDIDATES: &[&str] = &[
    "potrace",
    "/usr/bin/potrace",
    "/usr/local/bin/potrace",
    "/opt/homebrew/bin/potrace",
    r"C:\tools\potrace\potrace.exe",
];

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
pub const TRACE_TIMEOUT: Duration = Duration::from_secs(30);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, PartialEq)]
pub struct ExternalTracer {
    program: PathBuf,
    timeout: Duration,
    smooth_curves: bool,
    tight: bool,
}

impl ExternalTracer {
    /// Wrap a program without checking that it runs.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: TRACE_TIMEOUT,
            smooth_curves: true,
            tight: true,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_smoothing(mut self, smooth_curves: bool) -> Self {
        self.smooth_curves = smooth_curves;
        self
    }

    /// Toggle `--tight` (on by default).
    ///
    /// A tight trace crops to the ink bounding box, so its viewBox no longer
    /// matches the bitmap and the output is rejected unless the foreground
    /// touches every edge. Images with margins then take the fallback path.
    pub fn with_tight(mut self, tight: bool) -> Self {
        self.tight = tight;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Check that `program --version` exits successfully within [`PROBE_TIMEOUT`].
    pub fn probe(program: impl Into<PathBuf>) -> Result<Self, ConvertError> {
        let tracer = Self::new(program);
        let mut cmd = Command::new(&tracer.program);
        cmd.arg("--version");
        match run_with_timeout(&mut cmd, PROBE_TIMEOUT) {
            Ok(Some(status)) if status.success() => Ok(tracer),
            Ok(Some(status)) => {
                debug!(program = %tracer.program.display(), %status, "tracer probe rejected");
                Err(ConvertError::ToolUnavailable)
            }
            Ok(None) => Err(ConvertError::ToolTimeout(PROBE_TIMEOUT)),
            Err(e) => {
                debug!(program = %tracer.program.display(), error = %e, "tracer probe failed");
                Err(ConvertError::ToolUnavailable)
            }
        }
    }

    /// First candidate that answers a version query.
    pub fn discover<I, P>(candidates: I) -> Option<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let found = candidates.into_iter().find_map(|c| Self::probe(c).ok());
        match &found {
            Some(t) => info!(program = %t.program.display(), "external tracer available"),
            None => debug!("no external tracer found"),
        }
        found
    }

    /// Command-line arguments for one trace call.
    pub fn arguments(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![input.into(), "-s".into(), "-o".into(), output.into()];
        let curve_flags: &[&str] = if self.smooth_curves {
            &["--alphamax", "1.2", "--opttolerance", "0.4"]
        } else {
            &["--alphamax", "0"]
        };
        args.extend(curve_flags.iter().copied().map(OsString::from));
        if self.tight {
            args.push("--tight".into());
        }
        args
    }

    /// Trace `bitmap` and return SVG markup sized for `geometry`'s output canvas.
    pub fn trace(&self, bitmap: &BinaryBitmap, geometry: &Geometry) -> Result<String, ConvertError> {
        let failure = |what: &str, e: std::io::Error| ConvertError::ToolFailure(format!("{}: {}", what, e));

        let dir = tempfile::Builder::new()
            .prefix("raster2svg-")
            .tempdir()
            .map_err(|e| failure("cannot create temp dir", e))?;
        let input = dir.path().join("input.pbm");
        let output = dir.path().join("output.svg");

        std::fs::write(&input, encode_pbm(bitmap)).map_err(|e| failure("cannot write bitmap", e))?;

        let mut cmd = Command::new(&self.program);
        cmd.args(self.arguments(&input, &output));
        debug!(program = %self.program.display(), width = bitmap.width, height = bitmap.height, "running tracer");

        let started = Instant::now();
        let status = run_with_timeout(&mut cmd, self.timeout)
            .map_err(|e| failure("cannot run tracer", e))?
            .ok_or(ConvertError::ToolTimeout(self.timeout))?;
        if !status.success() {
            return Err(ConvertError::ToolFailure(format!("tracer exited with {}", status)));
        }

        let svg = std::fs::read_to_string(&output).map_err(|e| failure("missing tracer output", e))?;
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, bytes = svg.len(), "tracer finished");
        markup::rescale(&svg, geometry)
    }
}

/// Encode a bitmap as binary PBM (P4): one bit per pixel, 1 = foreground,
/// rows padded to whole bytes.
pub fn encode_pbm(bitmap: &BinaryBitmap) -> Vec<u8> {
    let row_bytes = bitmap.width.div_ceil(8) as usize;
    let header = format!("P4\n{} {}\n", bitmap.width, bitmap.height);
    let mut out = Vec::with_capacity(header.len() + row_bytes * bitmap.height as usize);
    out.extend_from_slice(header.as_bytes());
    for y in 0..bitmap.height {
        let mut row = vec![0u8; row_bytes];
        for x in 0..bitmap.width {
            if bitmap.get(x, y) {
                row[(x / 8) as usize] |= 0x80 >> (x % 8);
            }
        }
        out.extend_from_slice(&row);
    }
    out
}

/// Run a command to completion, killing it after `timeout`.
///
/// Returns `Ok(None)` when the deadline passed.
pub fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            // The process may exit between try_wait and kill.
            let _ = child.kill();
            child.wait()?;
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}
