//! Point-number to pixel-data assembly.
//!
//! A [`CbfHandler`] is constructed once when an acquisition is armed and
//! then called with successive point numbers by the collection driver. Each
//! call re-resolves the physical directory (storage may have been relocated
//! since the files were written), enumerates the files the active trigger
//! mode implies, and decodes them sequentially in ascending sub-frame order.
//!
//! An unreadable frame is degraded to a zero-filled placeholder and logged;
//! a single bad frame must never abort a multi-point scan, and downstream
//! consumers rely on the per-point array shape staying fixed across the
//! whole sequence. Configuration faults, by contrast, surface as
//! [`HandlerError`] and stop the run.

use ndarray::{Array2, Array3, Axis};
use tracing::{debug, warn};

use crate::decode;
use crate::error::{HandlerError, Result};
use crate::roots::RootRegistry;
use crate::shape::{RegionTable, Shape};
use crate::trigger::{FrameTemplate, TriggerMode};

/// Resource-registry key under which area-detector CBF files are served.
pub const HANDLER_SPEC: &str = "AD_CBF";

/// Pixel data for one point number.
///
/// Single-frame points come back 2-D, multi-frame points 3-D with the
/// leading axis in ascending sub-frame order.
#[derive(Debug, Clone, PartialEq)]
pub enum PointData {
    /// One frame, `(rows, cols)`.
    Single(Array2<i32>),
    /// Stacked frames, `(frames, rows, cols)`.
    Stack(Array3<i32>),
}

impl PointData {
    /// Array shape, leading frame axis included when present.
    pub fn shape(&self) -> Vec<usize> {
        match self {
            PointData::Single(a) => a.shape().to_vec(),
            PointData::Stack(a) => a.shape().to_vec(),
        }
    }

    /// Number of frames carried.
    pub fn frames(&self) -> usize {
        match self {
            PointData::Single(_) => 1,
            PointData::Stack(a) => a.len_of(Axis(0)),
        }
    }
}

/// Resolves point numbers to decoded detector frames for one acquisition
/// run.
///
/// Immutable after construction. The resolved read directory is a pure
/// per-call computation, so `&self` calls for different point numbers may
/// be issued from parallel threads if the caller chooses to.
#[derive(Debug, Clone)]
pub struct CbfHandler {
    roots: RootRegistry,
    read_root: String,
    write_path: String,
    template: FrameTemplate,
    expected: Shape,
}

impl CbfHandler {
    /// Arm a handler for one acquisition run.
    ///
    /// `rpath` is the directory the files were written under at acquisition
    /// time; a trailing separator is ensured so `{dir}{base}` concatenation
    /// matches the writer's convention. `read_root` names the registry
    /// entry current reads should go through.
    ///
    /// # Errors
    ///
    /// - [`HandlerError::UnrecognizedFormat`] when `template` contains no
    ///   registered detector-region keyword.
    /// - [`HandlerError::UnknownRoot`] when `rpath` matches no registered
    ///   prefix.
    /// - [`HandlerError::UnknownRootName`] when `read_root` is not
    ///   registered.
    pub fn new(
        roots: RootRegistry,
        read_root: impl Into<String>,
        rpath: &str,
        template: &str,
        filename: &str,
        mode: TriggerMode,
        regions: &RegionTable,
    ) -> Result<Self> {
        let expected = regions.resolve(template)?;

        let mut write_path = rpath.to_string();
        if !write_path.ends_with('/') {
            write_path.push('/');
        }
        roots.match_path(&write_path)?;

        let read_root = read_root.into();
        if roots.get(&read_root).is_none() {
            return Err(HandlerError::UnknownRootName { name: read_root });
        }

        debug!(?mode, template, filename, "initializing CBF handler");
        Ok(Self {
            roots,
            read_root,
            write_path,
            template: FrameTemplate::new(template, filename, mode),
            expected,
        })
    }

    /// Expected per-frame shape `(rows, cols)`.
    pub fn expected_shape(&self) -> Shape {
        self.expected
    }

    /// Current readable directory for this run.
    ///
    /// Recomputed from the write-time path and the designated read root on
    /// every call, never cached: the root substitution is a runtime
    /// decision, and the write-time path is never mutated.
    ///
    /// # Errors
    ///
    /// [`HandlerError::UnknownRoot`] / [`HandlerError::UnknownRootName`]
    /// when the registry no longer covers the configured roots.
    pub fn resolved_dir(&self) -> Result<String> {
        let dir = self.roots.rewrite(&self.write_path, &self.read_root)?;
        debug!(dir, "resolved read directory");
        Ok(dir)
    }

    /// Pixel data for `point_number` (zero-based).
    ///
    /// Per-frame read failures never surface here; the affected frame is
    /// zero-filled and logged. A decoded frame of unexpected shape is
    /// warned about but returned unchanged.
    ///
    /// # Errors
    ///
    /// Only configuration faults: root resolution or template formatting.
    pub fn assemble(&self, point_number: u32) -> Result<PointData> {
        let dir = self.resolved_dir()?;
        let paths = self.template.paths(&dir, point_number)?;

        let mut frames: Vec<Array2<i32>> = Vec::with_capacity(paths.len());
        for path in &paths {
            frames.push(self.frame_or_zero(path));
        }

        if frames.len() == 1 {
            // Single-frame points stay 2-D; the singleton axis is dropped.
            return Ok(PointData::Single(frames.remove(0)));
        }

        let views: Vec<_> = frames.iter().map(|frame| frame.view()).collect();
        match ndarray::stack(Axis(0), &views) {
            Ok(stacked) => Ok(PointData::Stack(stacked)),
            // Frames disagreed in shape, so they cannot share a tensor.
            // Non-conforming ones are zero-filled to keep the per-point
            // shape fixed.
            Err(_) => {
                let (rows, cols) = self.expected;
                let mut stacked = Array3::zeros((frames.len(), rows, cols));
                for (index, frame) in frames.iter().enumerate() {
                    if frame.dim() == self.expected {
                        stacked.index_axis_mut(Axis(0), index).assign(frame);
                    } else {
                        warn!(
                            index,
                            shape = ?frame.dim(),
                            "dropping mis-shaped frame from stack, substituting zeros"
                        );
                    }
                }
                Ok(PointData::Stack(stacked))
            }
        }
    }

    /// Decode one frame, degrading any failure to a zero-filled
    /// placeholder of the expected shape.
    fn frame_or_zero(&self, path: &str) -> Array2<i32> {
        match decode::decode(path) {
            Ok(data) => {
                if data.dim() != self.expected {
                    warn!(
                        path,
                        shape = ?data.dim(),
                        expected = ?self.expected,
                        "got incorrect image size"
                    );
                }
                data
            }
            Err(err) => {
                warn!(path, error = %err, "could not read frame, returning an empty one");
                Array2::zeros(self.expected)
            }
        }
    }
}
