//! Animation sequence metadata consumed by the positional simulation.
//!
//! The rendering layer owns the actual frames; the simulation only reads
//! per-frame position, duration, sound and flag metadata.

use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::Position;

/// Per-frame flag bits.
pub mod frame_flags {
    /// Ask the player to say "excuse me".
    pub const EXCUSE_ME_CATH: u8 = 0x01;
    /// Deliver `Action10` to the owning character.
    pub const ACTION10: u8 = 0x02;
    /// Deliver `Action4` to the owning character.
    pub const ACTION4: u8 = 0x10;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i16,
    pub y: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Hotspot {
    pub left: i16,
    pub top: i16,
    pub right: i16,
    pub bottom: i16,
}

impl Hotspot {
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left && point.x < self.right && point.y >= self.top && point.y < self.bottom
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameInfo {
    /// Entity position reached when this frame is shown (0 = unchanged).
    pub entity_position: Position,
    /// View slot occupied while this frame is shown (0 = none).
    pub view_slot: u8,
    /// Ticks this frame stays on screen.
    pub duration: u8,
    pub sound_action: u8,
    pub sound_delay: u8,
    pub flags: u8,
    pub keep_previous: bool,
    pub hotspot: Option<Hotspot>,
}

impl FrameInfo {
    pub fn has_flag(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub name: String,
    pub frames: Vec<FrameInfo>,
}

impl Sequence {
    pub fn new(name: impl Into<String>, frames: Vec<FrameInfo>) -> Self {
        Self {
            name: name.into(),
            frames,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frame(&self, index: i16) -> Option<&FrameInfo> {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.frames.get(index))
    }

    pub fn last_index(&self) -> i16 {
        self.frames.len() as i16 - 1
    }

    /// Frame whose entity position, shifted by `offset`, lands nearest to
    /// `target`. Ties go to the later frame.
    ///
    /// When `bounded` is set, a target further than `slack` outside the span
    /// covered by the sequence yields `None`.
    pub fn nearest_frame(
        &self,
        offset: Position,
        target: Position,
        slack: Position,
        bounded: bool,
    ) -> Option<i16> {
        let first = self.frames.first()?.entity_position;
        let last = self.frames.last()?.entity_position;

        if bounded {
            let (low, high) = if first <= last {
                (first, last)
            } else {
                (last, first)
            };
            if target < low - slack || target > high + slack {
                return None;
            }
        }

        let mut best: Option<(usize, Position)> = None;
        for (index, frame) in self.frames.iter().enumerate() {
            let distance = (offset + frame.entity_position - target).abs();
            match best {
                Some((_, best_distance)) if distance > best_distance => {}
                _ => best = Some((index, distance)),
            }
        }
        best.map(|(index, _)| index as i16)
    }
}

/// Source of sequence metadata by name.
pub trait SequenceLibrary {
    fn load(&self, name: &str) -> Option<Rc<Sequence>>;
}

/// Library that never resolves anything; in-place animations then finish on
/// their progress counter alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSequences;

impl SequenceLibrary for NoSequences {
    fn load(&self, _name: &str) -> Option<Rc<Sequence>> {
        None
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemorySequences {
    sequences: HashMap<String, Rc<Sequence>>,
}

impl InMemorySequences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sequence: Sequence) {
        self.sequences
            .insert(sequence.name.clone(), Rc::new(sequence));
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Loads a JSON array of sequences.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading sequence table {}", path.display()))?;
        let sequences: Vec<Sequence> = serde_json::from_str(&data)
            .with_context(|| format!("parsing sequence table {}", path.display()))?;
        let mut library = Self::new();
        for sequence in sequences {
            library.insert(sequence);
        }
        Ok(library)
    }
}

impl SequenceLibrary for InMemorySequences {
    fn load(&self, name: &str) -> Option<Rc<Sequence>> {
        self.sequences.get(name).cloned()
    }
}
