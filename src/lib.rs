//! `pilatus-cbf`
//!
//! Resolves logical acquisition events (point numbers) into the concrete
//! CBF image files a Pilatus detector wrote, decodes them, and hands pixel
//! data back to a data-collection pipeline.
//!
//! ## Components
//!
//! - [`roots::RootRegistry`]: named physical storage roots with prefix
//!   matching and substitution, covering data relocated after acquisition.
//! - [`trigger::TriggerMode`] / [`trigger::FrameTemplate`]: trigger-mode-
//!   dependent filename construction, one or many files per point.
//! - [`shape::RegionTable`]: detector-region keyword to expected image
//!   shape, checked once at construction.
//! - [`decode`]: miniCBF (byte-offset) image decoding.
//! - [`handler::CbfHandler`]: the assembler tying the above together, with
//!   zero-filled degradation for unreadable frames.
//!
//! ## Example
//!
//! ```no_run
//! use pilatus_cbf::{CbfHandler, RegionTable, RootRegistry, TriggerMode};
//!
//! # fn main() -> Result<(), pilatus_cbf::HandlerError> {
//! let mut roots = RootRegistry::new();
//! roots.register("write", "/data/write/");
//! roots.register("gpfs", "/mnt/gpfs/data/");
//!
//! let handler = CbfHandler::new(
//!     roots,
//!     "gpfs",
//!     "/data/write/run1",
//!     "{dir}{base}_{seq:0>6}_SAXS.cbf",
//!     "sample",
//!     TriggerMode::SingleFrame,
//!     &RegionTable::builtin(),
//! )?;
//!
//! let point = handler.assemble(4)?;
//! assert_eq!(point.shape(), vec![1043, 981]);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod decode;
pub mod error;
pub mod handler;
pub mod roots;
pub mod shape;
pub mod trigger;

pub use config::ResolverConfig;
pub use error::{DecodeError, HandlerError};
pub use handler::{CbfHandler, PointData, HANDLER_SPEC};
pub use roots::{RootEntry, RootMatch, RootRegistry};
pub use shape::{RegionTable, Shape};
pub use trigger::{FrameTemplate, TriggerMode};
