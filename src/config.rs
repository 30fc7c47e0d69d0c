//! Deployment configuration for root registry and region table.
//!
//! Configuration is loaded from:
//! 1. `cbf-resolver.toml` (base configuration)
//! 2. Environment variables (prefixed with `PILATUS_CBF_`)
//!
//! # Example
//! ```no_run
//! use pilatus_cbf::config::ResolverConfig;
//!
//! # fn main() -> Result<(), pilatus_cbf::HandlerError> {
//! let config = ResolverConfig::load()?;
//! let roots = config.root_registry();
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::roots::{RootEntry, RootRegistry};
use crate::shape::RegionTable;

/// Top-level resolver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Name of the root current reads should go through.
    pub read_root: String,
    /// Ordered storage roots; first match wins, so the canonical write
    /// root comes first.
    pub roots: Vec<RootEntry>,
    /// Detector-region keyword table. Empty means the built-in deployment
    /// defaults.
    #[serde(default)]
    pub regions: Vec<RegionEntry>,
}

/// One detector-region row of the configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionEntry {
    /// Keyword appearing in filename templates, e.g. `SAXS`.
    pub keyword: String,
    /// Expected image rows.
    pub rows: usize,
    /// Expected image columns.
    pub cols: usize,
}

impl ResolverConfig {
    /// Default configuration file name.
    pub const DEFAULT_PATH: &'static str = "cbf-resolver.toml";

    /// Load from [`Self::DEFAULT_PATH`] plus the environment.
    ///
    /// # Errors
    ///
    /// [`crate::HandlerError::Config`] when the file or environment cannot
    /// be parsed into a valid configuration.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::DEFAULT_PATH)
    }

    /// Load from an explicit TOML file plus the environment.
    ///
    /// # Errors
    ///
    /// See [`Self::load`].
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("PILATUS_CBF_").split("__"))
            .extract()?;
        Ok(config)
    }

    /// Root registry in configured order.
    pub fn root_registry(&self) -> RootRegistry {
        RootRegistry::from_entries(self.roots.clone())
    }

    /// Region table, falling back to the built-in deployment defaults when
    /// no regions are configured.
    pub fn region_table(&self) -> RegionTable {
        if self.regions.is_empty() {
            return RegionTable::builtin();
        }
        let mut table = RegionTable::new();
        for region in &self.regions {
            table.insert(region.keyword.clone(), (region.rows, region.cols));
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cbf-resolver.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"
read_root = "gpfs"

[[roots]]
name = "write"
prefix = "/data/write/"

[[roots]]
name = "gpfs"
prefix = "/mnt/gpfs/data/"

[[regions]]
keyword = "TEST"
rows = 4
cols = 5
"#
        )
        .unwrap();

        let config = ResolverConfig::load_from(&path).unwrap();
        assert_eq!(config.read_root, "gpfs");

        let roots = config.root_registry();
        assert_eq!(
            roots.rewrite("/data/write/run1/img.cbf", "gpfs").unwrap(),
            "/mnt/gpfs/data/run1/img.cbf"
        );

        let table = config.region_table();
        assert_eq!(table.resolve("{dir}{base}_TEST.cbf").unwrap(), (4, 5));
    }

    #[test]
    fn test_empty_regions_fall_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cbf-resolver.toml");
        std::fs::write(
            &path,
            "read_root = \"w\"\n\n[[roots]]\nname = \"w\"\nprefix = \"/w/\"\n",
        )
        .unwrap();

        let config = ResolverConfig::load_from(&path).unwrap();
        let table = config.region_table();
        assert_eq!(table.resolve("x_SAXS.cbf").unwrap(), (1043, 981));
    }
}
