//! Detector-region shape resolution.
//!
//! Filename templates written by the acquisition software embed a
//! detector-region keyword (`SAXS`, `WAXS1`, ...), and the region fixes the
//! pixel-array shape every frame of a run must have. Resolution happens once
//! at handler construction, never per-frame.

use crate::error::{HandlerError, Result};

/// Expected pixel-array shape, `(rows, cols)`.
pub type Shape = (usize, usize);

/// Ordered keyword-to-shape table. The first keyword contained in the
/// template wins, so more specific keywords should be registered first.
///
/// Extend the table whenever a new detector or region is deployed.
#[derive(Debug, Clone, Default)]
pub struct RegionTable {
    entries: Vec<(String, Shape)>,
}

impl RegionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The regions currently deployed on the beamline.
    pub fn builtin() -> Self {
        let mut table = Self::new();
        table.insert("SAXS", (1043, 981));
        table.insert("WAXS1", (619, 487));
        table.insert("WAXS2", (1043, 981));
        table
    }

    /// Append a region keyword with its expected shape.
    pub fn insert(&mut self, keyword: impl Into<String>, shape: Shape) {
        self.entries.push((keyword.into(), shape));
    }

    /// Resolve the expected shape for a filename template.
    ///
    /// # Errors
    ///
    /// [`HandlerError::UnrecognizedFormat`] when the template contains none
    /// of the registered keywords.
    pub fn resolve(&self, template: &str) -> Result<Shape> {
        self.entries
            .iter()
            .find(|(keyword, _)| template.contains(keyword.as_str()))
            .map(|(_, shape)| *shape)
            .ok_or_else(|| HandlerError::UnrecognizedFormat {
                template: template.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_regions_resolve() {
        let table = RegionTable::builtin();
        let shape = table.resolve("{dir}{base}_{seq:0>6}_SAXS.cbf").unwrap();
        assert_eq!(shape, (1043, 981));
        let shape = table.resolve("{dir}{base}_{seq:0>6}_WAXS1.cbf").unwrap();
        assert_eq!(shape, (619, 487));
    }

    #[test]
    fn test_unknown_keyword_is_unrecognized_format() {
        let table = RegionTable::builtin();
        let err = table.resolve("{dir}{base}_{seq:0>6}.cbf").unwrap_err();
        assert!(matches!(err, HandlerError::UnrecognizedFormat { .. }));
    }

    #[test]
    fn test_first_registered_keyword_wins() {
        let mut table = RegionTable::new();
        table.insert("WAXS", (1, 2));
        table.insert("WAXS1", (3, 4));
        assert_eq!(table.resolve("run_WAXS1.cbf").unwrap(), (1, 2));
    }
}
