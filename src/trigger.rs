//! Trigger modes and trigger-mode-dependent filename construction.
//!
//! The trigger mode the detector was armed with decides two things at read
//! time: how many files one point number maps to, and which integers land in
//! which template slots. Each [`TriggerMode`] variant carries exactly the
//! parameters its filename rule needs, so a new mode cannot be added without
//! spelling out both.
//!
//! Templates are `strfmt` strings with named slots:
//!
//! - `{dir}` - resolved read directory, trailing separator included
//! - `{base}` - base filename
//! - `{seq}` - the acquisition sequence number
//! - `{frame}` - per-frame index, present only in suffixed conventions
//!
//! A typical template is `{dir}{base}_{seq:0>6}_SAXS.cbf`. When the mode
//! writes one file per frame the extension position is rewritten at
//! construction time to carry the frame suffix, so `test_000125_SAXS.cbf`
//! becomes `test_000125_SAXS_00001.cbf`, matching the acquisition software's
//! convention exactly (zero-padded, width 5).

use std::collections::HashMap;
use std::num::NonZeroU32;

use strfmt::strfmt;

use crate::error::{HandlerError, Result};

/// Detector arming/triggering convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerMode {
    /// One software trigger, one frame, one file per point.
    SingleFrame,
    /// One software trigger, several frames per point, one file each.
    MultiFrame {
        /// Frames one point number produces.
        frames_per_point: NonZeroU32,
    },
    /// Detector counter advanced by external hardware triggers,
    /// independently of point enumeration.
    ExternalTrigger {
        /// Sequence number of the first externally triggered file.
        initial_frame: u32,
    },
    /// Continuous acquisition while a motor is in flight.
    FlyScan {
        /// Frames one point number produces.
        frames_per_point: NonZeroU32,
    },
}

impl TriggerMode {
    /// Number of files one point number maps to.
    pub fn frames_per_point(&self) -> u32 {
        match self {
            TriggerMode::SingleFrame | TriggerMode::ExternalTrigger { .. } => 1,
            TriggerMode::MultiFrame { frames_per_point }
            | TriggerMode::FlyScan { frames_per_point } => frames_per_point.get(),
        }
    }

    /// Whether the filename convention embeds a per-frame index suffix.
    fn uses_frame_suffix(&self) -> bool {
        match self {
            TriggerMode::SingleFrame => false,
            TriggerMode::MultiFrame { frames_per_point }
            | TriggerMode::FlyScan { frames_per_point } => frames_per_point.get() > 1,
            TriggerMode::ExternalTrigger { .. } => true,
        }
    }
}

/// Filename-construction rule for one acquisition run.
#[derive(Debug, Clone)]
pub struct FrameTemplate {
    template: String,
    base: String,
    mode: TriggerMode,
}

impl FrameTemplate {
    /// Build the rule for `mode`, rewriting the template's extension
    /// position to carry the per-frame suffix when the convention calls
    /// for one.
    pub fn new(template: &str, base_filename: &str, mode: TriggerMode) -> Self {
        let template = if mode.uses_frame_suffix() {
            let stem = template.strip_suffix(".cbf").unwrap_or(template);
            format!("{stem}_{{frame:0>5}}.cbf")
        } else {
            template.to_string()
        };
        Self {
            template,
            base: base_filename.to_string(),
            mode,
        }
    }

    /// The template actually used for formatting, suffix rewrite included.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Paths for every file `point_number` maps to, ascending sub-frame
    /// order.
    ///
    /// # Errors
    ///
    /// [`HandlerError::Template`] when the template's slots cannot be
    /// satisfied. That is a configuration fault, not a per-frame one.
    pub fn paths(&self, dir: &str, point_number: u32) -> Result<Vec<String>> {
        match self.mode {
            TriggerMode::SingleFrame => Ok(vec![self.format(dir, point_number + 1, None)?]),
            TriggerMode::MultiFrame { frames_per_point }
            | TriggerMode::FlyScan { frames_per_point } => {
                if frames_per_point.get() == 1 {
                    return Ok(vec![self.format(dir, point_number + 1, None)?]);
                }
                (0..frames_per_point.get())
                    .map(|index| self.format(dir, point_number + 1, Some(index)))
                    .collect()
            }
            // The externally advanced counter names the file; the sequence
            // slot stays pinned at the initial frame number.
            TriggerMode::ExternalTrigger { initial_frame } => {
                Ok(vec![self.format(dir, initial_frame, Some(point_number))?])
            }
        }
    }

    fn format(&self, dir: &str, seq: u32, frame: Option<u32>) -> Result<String> {
        let mut vars = HashMap::new();
        vars.insert("dir".to_string(), dir.to_string());
        vars.insert("base".to_string(), self.base.clone());
        vars.insert("seq".to_string(), seq.to_string());
        if let Some(frame) = frame {
            vars.insert("frame".to_string(), frame.to_string());
        }
        strfmt(&self.template, &vars).map_err(|source| HandlerError::Template {
            template: self.template.clone(),
            source,
        })
    }
}
