use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::{CharacterId, Position};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Game-time units added per tick.
    pub time_step: u32,
    /// Position units a walker covers per tick.
    pub default_walk_step: Position,
    /// Per-character walk steps keyed by character name.
    pub walk_steps: BTreeMap<String, Position>,
    pub squeeze_multiplier: Position,
    /// Ticks two facing walkers wait before bursting past each other.
    pub opposite_wait_ticks: u8,
    /// Ticks an in-place animation runs when its sequence is unavailable.
    pub sequence_fallback_progress: i32,
    /// Ticks a dialog plays before `EndSound` is delivered.
    pub dialog_ticks: u16,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            time_step: 5,
            default_walk_step: 750,
            walk_steps: BTreeMap::new(),
            squeeze_multiplier: 2,
            opposite_wait_ticks: 8,
            sequence_fallback_progress: 100,
            dialog_ticks: 30,
        }
    }
}

impl WorldConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&data).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn walk_step(&self, who: CharacterId) -> Position {
        self.walk_steps
            .get(who.name())
            .copied()
            .unwrap_or(self.default_walk_step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: WorldConfig =
            serde_json::from_str(r#"{"walk_steps":{"anna":500},"time_step":3}"#)
                .expect("parse config");
        assert_eq!(config.time_step, 3);
        assert_eq!(config.walk_step(CharacterId::ANNA), 500);
        assert_eq!(config.walk_step(CharacterId::ALEXEI), 750);
        assert_eq!(config.squeeze_multiplier, 2);
    }
}
