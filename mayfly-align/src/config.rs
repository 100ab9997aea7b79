//! Alignment configuration.

use std::path::Path;

use mayfly_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Knobs of the gap-closing search.
///
/// The zero-valued limit defaults are deliberate: a search constructed with
/// them terminates on the first budget check, so gap closing must be opted
/// into by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapClosingConfig {
    /// Master switch for the gap-filler facade.
    pub run_dijkstra: bool,
    /// Extend both ends of single-subread mappings to the read boundaries.
    pub restore_ends: bool,
    /// Cap on vertices admitted into the reachable-vertex set; 0 leaves the
    /// search unrestricted.
    pub max_vertex_in_gap: usize,
    /// Cap on live frontier size; exceeding it terminates the search.
    pub queue_limit: usize,
    /// Cap on pop count; same behaviour.
    pub iteration_limit: usize,
    /// Keep exploring at equal priority instead of stopping on the first
    /// finalised path, tightening the bound as better paths appear.
    pub find_shortest_path: bool,
    /// Report a full mapping path in addition to the edge sequence.
    pub restore_mapping: bool,
    /// Row-gating slack in edit-distance units.
    pub penalty_interval: i32,
}

impl Default for GapClosingConfig {
    fn default() -> Self {
        GapClosingConfig {
            run_dijkstra: false,
            restore_ends: false,
            max_vertex_in_gap: 0,
            queue_limit: 0,
            iteration_limit: 0,
            find_shortest_path: false,
            restore_mapping: false,
            penalty_interval: 20,
        }
    }
}

/// Aligner-level configuration wrapping the gap-closing knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignerConfig {
    pub gap: GapClosingConfig,
    /// Multiplier applied to graph distances when deciding whether two
    /// anchors can be joined without a search.
    pub path_limit_stretching: f64,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        AlignerConfig {
            gap: GapClosingConfig::default(),
            path_limit_stretching: 1.3,
        }
    }
}

impl AlignerConfig {
    /// Loads a configuration from a JSON file and validates it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let cfg: AlignerConfig =
            serde_json::from_str(&text).map_err(|e| Error::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Stretch factors below 1.0 would make every consistent anchor pair look
    /// like a detour.
    pub fn validate(&self) -> Result<()> {
        if self.path_limit_stretching < 1.0 {
            return Err(Error::Config(format!(
                "path_limit_stretching must be >= 1.0, got {}",
                self.path_limit_stretching
            )));
        }
        Ok(())
    }
}
