//! Bit-per-character occupancy tables.
//!
//! `positions[100 * car + slot]` marks characters standing in a view slot,
//! while the two compartment tables mark characters blocking a compartment
//! doorway (hard and soft blocks). Enter and exit are idempotent.

use std::fmt;

use crate::types::{Car, CharacterId, Compartment, MAX_VIEW_SLOT};

pub const POSITION_SLOTS: usize = 1000;

/// Key addressing a single occupancy word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKey {
    View { car: Car, slot: u8 },
    Compartment(Compartment),
    SoftCompartment(Compartment),
}

impl SlotKey {
    pub fn view(car: Car, slot: u8) -> Self {
        SlotKey::View { car, slot }
    }

    fn position_index(car: Car, slot: u8) -> usize {
        assert!(
            slot <= MAX_VIEW_SLOT,
            "view slot {slot} out of range for car {car:?}"
        );
        100 * car as usize + slot as usize
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKey::View { car, slot } => write!(f, "{}:{slot}", car.label()),
            SlotKey::Compartment(compartment) => write!(f, "{}", compartment.label()),
            SlotKey::SoftCompartment(compartment) => write!(f, "{}~soft", compartment.label()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyMap {
    positions: Vec<u32>,
    compartments: [u32; Compartment::COUNT],
    soft_compartments: [u32; Compartment::COUNT],
    redundant_transitions: u32,
}

impl Default for OccupancyMap {
    fn default() -> Self {
        Self::new()
    }
}

impl OccupancyMap {
    pub fn new() -> Self {
        Self {
            positions: vec![0; POSITION_SLOTS],
            compartments: [0; Compartment::COUNT],
            soft_compartments: [0; Compartment::COUNT],
            redundant_transitions: 0,
        }
    }

    /// Rebuilds a map from raw tables (save images).
    pub fn from_raw(
        positions: Vec<u32>,
        compartments: [u32; Compartment::COUNT],
        soft_compartments: [u32; Compartment::COUNT],
    ) -> Option<Self> {
        if positions.len() != POSITION_SLOTS {
            return None;
        }
        Some(Self {
            positions,
            compartments,
            soft_compartments,
            redundant_transitions: 0,
        })
    }

    fn word(&self, key: SlotKey) -> u32 {
        match key {
            SlotKey::View { car, slot } => self.positions[SlotKey::position_index(car, slot)],
            SlotKey::Compartment(compartment) => self.compartments[compartment.index()],
            SlotKey::SoftCompartment(compartment) => self.soft_compartments[compartment.index()],
        }
    }

    fn word_mut(&mut self, key: SlotKey) -> &mut u32 {
        match key {
            SlotKey::View { car, slot } => &mut self.positions[SlotKey::position_index(car, slot)],
            SlotKey::Compartment(compartment) => &mut self.compartments[compartment.index()],
            SlotKey::SoftCompartment(compartment) => {
                &mut self.soft_compartments[compartment.index()]
            }
        }
    }

    /// Sets `who`'s bit. Returns whether the table changed.
    pub fn enter(&mut self, who: CharacterId, key: SlotKey) -> bool {
        let Some(bit) = who.occupancy_bit() else {
            return false;
        };
        let word = self.word_mut(key);
        if *word & bit != 0 {
            self.note_redundant("enter", who, key);
            return false;
        }
        *word |= bit;
        true
    }

    /// Clears `who`'s bit. Returns whether the table changed.
    pub fn exit(&mut self, who: CharacterId, key: SlotKey) -> bool {
        let Some(bit) = who.occupancy_bit() else {
            return false;
        };
        let word = self.word_mut(key);
        if *word & bit == 0 {
            self.note_redundant("exit", who, key);
            return false;
        }
        *word &= !bit;
        true
    }

    fn note_redundant(&mut self, op: &str, who: CharacterId, key: SlotKey) {
        self.redundant_transitions += 1;
        log::debug!("occupancy: redundant {op} of {key} by {who}");
    }

    pub fn is_occupied(&self, key: SlotKey) -> bool {
        self.word(key) != 0
    }

    pub fn is_occupied_by(&self, key: SlotKey, who: CharacterId) -> bool {
        who.occupancy_bit()
            .is_some_and(|bit| self.word(key) & bit != 0)
    }

    pub fn is_occupied_by_other(&self, key: SlotKey, excluding: CharacterId) -> bool {
        let mask = excluding.occupancy_bit().unwrap_or(0);
        self.word(key) & !mask != 0
    }

    /// Lowest-numbered occupant of a slot, if any.
    pub fn first_occupant(&self, key: SlotKey) -> Option<CharacterId> {
        let word = self.word(key);
        (word != 0).then(|| CharacterId::from_index(word.trailing_zeros() as usize))
    }

    /// Lowest-numbered occupant other than `excluding`.
    pub fn first_other_occupant(&self, key: SlotKey, excluding: CharacterId) -> Option<CharacterId> {
        let word = self.word(key) & !excluding.occupancy_bit().unwrap_or(0);
        (word != 0).then(|| CharacterId::from_index(word.trailing_zeros() as usize))
    }

    /// Doorway blocker for a compartment, hard blocks first.
    pub fn compartment_blocker(&self, compartment: Compartment) -> Option<CharacterId> {
        self.first_occupant(SlotKey::Compartment(compartment))
            .or_else(|| self.first_occupant(SlotKey::SoftCompartment(compartment)))
    }

    /// Removes every bit owned by `who`.
    pub fn clear_character(&mut self, who: CharacterId) {
        let Some(bit) = who.occupancy_bit() else {
            return;
        };
        for word in self
            .positions
            .iter_mut()
            .chain(self.compartments.iter_mut())
            .chain(self.soft_compartments.iter_mut())
        {
            *word &= !bit;
        }
    }

    pub fn clear(&mut self) {
        self.positions.iter_mut().for_each(|word| *word = 0);
        self.compartments = [0; Compartment::COUNT];
        self.soft_compartments = [0; Compartment::COUNT];
    }

    pub fn positions(&self) -> &[u32] {
        &self.positions
    }

    pub fn compartments(&self) -> &[u32; Compartment::COUNT] {
        &self.compartments
    }

    pub fn soft_compartments(&self) -> &[u32; Compartment::COUNT] {
        &self.soft_compartments
    }

    /// Count of enter/exit calls that found the bit already in the requested
    /// state. Diagnostic only.
    pub fn redundant_transitions(&self) -> u32 {
        self.redundant_transitions
    }

    /// Occupied view slots as `(car, slot, bits)`.
    pub fn occupied_views(&self) -> impl Iterator<Item = (Car, u8, u32)> + '_ {
        self.positions
            .iter()
            .enumerate()
            .filter(|(_, word)| **word != 0)
            .filter_map(|(index, word)| {
                let car = Car::try_from((index / 100) as u8).ok()?;
                Some((car, (index % 100) as u8, *word))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn door(raw: u8) -> Compartment {
        Compartment::from_door(raw).expect("valid door")
    }

    #[test]
    fn enter_and_exit_are_idempotent() {
        let mut map = OccupancyMap::new();
        let key = SlotKey::Compartment(door(3));

        assert!(map.enter(CharacterId::ANNA, key));
        let once = map.clone();
        assert!(!map.enter(CharacterId::ANNA, key));
        assert_eq!(map.compartments(), once.compartments());
        assert_eq!(map.redundant_transitions(), 1);

        assert!(map.exit(CharacterId::ANNA, key));
        assert!(!map.exit(CharacterId::ANNA, key));
        assert!(!map.is_occupied(key));
        assert_eq!(map.redundant_transitions(), 2);
    }

    #[test]
    fn occupied_by_other_ignores_the_excluded_character() {
        let mut map = OccupancyMap::new();
        let key = SlotKey::view(Car::RedSleeping, 41);
        map.enter(CharacterId::TATIANA, key);

        assert!(!map.is_occupied_by_other(key, CharacterId::TATIANA));
        assert!(map.is_occupied_by_other(key, CharacterId::ALEXEI));

        map.enter(CharacterId::ALEXEI, key);
        assert!(map.is_occupied_by_other(key, CharacterId::TATIANA));
        assert_eq!(map.first_occupant(key), Some(CharacterId::TATIANA));
    }

    #[test]
    fn untracked_characters_never_set_bits() {
        let mut map = OccupancyMap::new();
        let key = SlotKey::view(Car::Restaurant, 63);
        assert!(!map.enter(CharacterId::TABLE_B, key));
        assert!(!map.is_occupied(key));

        assert!(map.enter(CharacterId::MITCHELL, key));
        assert!(map.is_occupied_by(key, CharacterId::CATH));
    }

    #[test]
    fn clear_character_removes_all_tables() {
        let mut map = OccupancyMap::new();
        map.enter(CharacterId::VASSILI, SlotKey::view(Car::GreenSleeping, 41));
        map.enter(CharacterId::VASSILI, SlotKey::Compartment(door(32)));
        map.enter(CharacterId::VASSILI, SlotKey::SoftCompartment(door(32)));
        map.enter(CharacterId::ANNA, SlotKey::Compartment(door(32)));

        map.clear_character(CharacterId::VASSILI);

        assert_eq!(map.occupied_views().count(), 0);
        assert_eq!(
            map.compartment_blocker(door(32)),
            Some(CharacterId::ANNA)
        );
        assert!(!map.is_occupied(SlotKey::SoftCompartment(door(32))));
    }

    #[test]
    #[should_panic(expected = "view slot")]
    fn out_of_range_view_slot_fails_fast() {
        let mut map = OccupancyMap::new();
        map.enter(CharacterId::ANNA, SlotKey::view(Car::GreenSleeping, 120));
    }
}
