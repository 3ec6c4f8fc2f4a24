//! Per-state persisted parameters.
//!
//! Each call frame carries exactly one variant; the variant is chosen by the
//! state that owns the frame and is written to save images with its tag.

use crate::savegame::SaveKind;
use crate::types::{Action, Car, CharacterId, Compartment, Position};

pub const SCRATCH_SLOTS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StateParams {
    #[default]
    Empty,
    Walk {
        car: Car,
        position: Position,
    },
    Sequence {
        name: String,
    },
    BlockSequence {
        name: String,
        car: Car,
        slot: u8,
    },
    DoorSequence {
        name: String,
        compartment: Compartment,
    },
    /// Plays `name` and hands `action` (with `note`) to `recipient` once,
    /// on the first `Action10` frame or when the sequence ends.
    JoinedSequence {
        name: String,
        recipient: CharacterId,
        action: Action,
        note: String,
        sent: bool,
    },
    Dialog {
        name: String,
    },
    /// `deadline` is zero until the wait is armed.
    Wait {
        duration: u32,
        deadline: u32,
    },
    SaveGame {
        kind: SaveKind,
        event: u32,
    },
    /// Stay in the compartment cycling `name` until game time `until`.
    CompartmentWait {
        until: u32,
        name: String,
    },
    Scratch([i32; SCRATCH_SLOTS]),
}

impl StateParams {
    pub fn walk(car: Car, position: Position) -> Self {
        StateParams::Walk { car, position }
    }

    pub fn sequence(name: impl Into<String>) -> Self {
        StateParams::Sequence { name: name.into() }
    }

    pub fn block_sequence(name: impl Into<String>, car: Car, slot: u8) -> Self {
        StateParams::BlockSequence {
            name: name.into(),
            car,
            slot,
        }
    }

    pub fn door_sequence(name: impl Into<String>, compartment: Compartment) -> Self {
        StateParams::DoorSequence {
            name: name.into(),
            compartment,
        }
    }

    pub fn joined_sequence(
        name: impl Into<String>,
        recipient: CharacterId,
        action: Action,
        note: impl Into<String>,
    ) -> Self {
        StateParams::JoinedSequence {
            name: name.into(),
            recipient,
            action,
            note: note.into(),
            sent: false,
        }
    }

    pub fn compartment_wait(until: u32, name: impl Into<String>) -> Self {
        StateParams::CompartmentWait {
            until,
            name: name.into(),
        }
    }

    pub fn dialog(name: impl Into<String>) -> Self {
        StateParams::Dialog { name: name.into() }
    }

    pub fn wait(duration: u32) -> Self {
        StateParams::Wait {
            duration,
            deadline: 0,
        }
    }

    pub fn save(kind: SaveKind, event: u32) -> Self {
        StateParams::SaveGame { kind, event }
    }

    pub fn scratch() -> Self {
        StateParams::Scratch([0; SCRATCH_SLOTS])
    }

    pub fn tag(&self) -> u8 {
        match self {
            StateParams::Empty => 0,
            StateParams::Walk { .. } => 1,
            StateParams::Sequence { .. } => 2,
            StateParams::BlockSequence { .. } => 3,
            StateParams::DoorSequence { .. } => 4,
            StateParams::Dialog { .. } => 5,
            StateParams::Wait { .. } => 6,
            StateParams::SaveGame { .. } => 7,
            StateParams::Scratch(_) => 8,
            StateParams::JoinedSequence { .. } => 9,
            StateParams::CompartmentWait { .. } => 10,
        }
    }

    /// Name carried by sequence and dialog variants.
    pub fn name(&self) -> Option<&str> {
        match self {
            StateParams::Sequence { name }
            | StateParams::BlockSequence { name, .. }
            | StateParams::DoorSequence { name, .. }
            | StateParams::JoinedSequence { name, .. }
            | StateParams::CompartmentWait { name, .. }
            | StateParams::Dialog { name } => Some(name),
            _ => None,
        }
    }

    /// Scratch slots, turning an empty bank into a zeroed one on first use.
    /// Any other variant is replaced.
    pub fn scratch_mut(&mut self) -> &mut [i32; SCRATCH_SLOTS] {
        if !matches!(self, StateParams::Scratch(_)) {
            *self = StateParams::scratch();
        }
        match self {
            StateParams::Scratch(slots) => slots,
            _ => unreachable!("scratch bank just installed"),
        }
    }

    pub fn scratch_value(&self, slot: usize) -> i32 {
        match self {
            StateParams::Scratch(slots) => slots[slot],
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_bank_is_created_on_demand() {
        let mut params = StateParams::Empty;
        assert_eq!(params.scratch_value(3), 0);
        params.scratch_mut()[3] = 42;
        assert_eq!(params.scratch_value(3), 42);
        assert_eq!(params.tag(), 8);
    }

    #[test]
    fn names_come_from_sequence_and_dialog_variants() {
        let door = Compartment::from_door(37).expect("door 37");
        assert_eq!(
            StateParams::door_sequence("618Af", door).name(),
            Some("618Af")
        );
        assert_eq!(StateParams::dialog("TAT1133A").name(), Some("TAT1133A"));
        assert_eq!(StateParams::walk(Car::RedSleeping, 4070).name(), None);
    }
}
