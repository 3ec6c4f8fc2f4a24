use std::convert::TryFrom;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// 1-D coordinate along a car, 0..10000.
pub type Position = i32;

/// Identity of one of the 40 simulated characters (index 0 is the player).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterId(u8);

const CHARACTER_NAMES: [&str; CharacterId::COUNT] = [
    "cath", "anna", "august", "cond1", "cond2", "headwait", "waiter1", "waiter2", "cook",
    "trainm", "tatiana", "vassili", "alexei", "abbot", "milos", "vesna", "ivo", "salko",
    "kronos", "kahina", "francois", "madame", "monsieur", "rebecca", "sophie", "mahmud",
    "yasmin", "hadija", "alouan", "police", "max", "master", "clerk", "table_a", "table_b",
    "table_c", "table_d", "table_e", "table_f", "mitchell",
];

impl CharacterId {
    pub const COUNT: usize = 40;

    pub const CATH: Self = Self(0);
    pub const ANNA: Self = Self(1);
    pub const AUGUST: Self = Self(2);
    pub const COND1: Self = Self(3);
    pub const COND2: Self = Self(4);
    pub const HEAD_WAIT: Self = Self(5);
    pub const WAITER1: Self = Self(6);
    pub const WAITER2: Self = Self(7);
    pub const COOK: Self = Self(8);
    pub const TRAIN_M: Self = Self(9);
    pub const TATIANA: Self = Self(10);
    pub const VASSILI: Self = Self(11);
    pub const ALEXEI: Self = Self(12);
    pub const ABBOT: Self = Self(13);
    pub const MILOS: Self = Self(14);
    pub const VESNA: Self = Self(15);
    pub const IVO: Self = Self(16);
    pub const SALKO: Self = Self(17);
    pub const KRONOS: Self = Self(18);
    pub const KAHINA: Self = Self(19);
    pub const FRANCOIS: Self = Self(20);
    pub const MADAME: Self = Self(21);
    pub const MONSIEUR: Self = Self(22);
    pub const REBECCA: Self = Self(23);
    pub const SOPHIE: Self = Self(24);
    pub const MAHMUD: Self = Self(25);
    pub const YASMIN: Self = Self(26);
    pub const HADIJA: Self = Self(27);
    pub const ALOUAN: Self = Self(28);
    pub const POLICE: Self = Self(29);
    pub const MAX: Self = Self(30);
    pub const MASTER: Self = Self(31);
    pub const CLERK: Self = Self(32);
    pub const TABLE_A: Self = Self(33);
    pub const TABLE_B: Self = Self(34);
    pub const TABLE_C: Self = Self(35);
    pub const TABLE_D: Self = Self(36);
    pub const TABLE_E: Self = Self(37);
    pub const TABLE_F: Self = Self(38);
    pub const MITCHELL: Self = Self(39);

    pub fn new(raw: u8) -> Option<Self> {
        ((raw as usize) < Self::COUNT).then_some(Self(raw))
    }

    /// Panics on an out-of-range id; ids never come from untrusted input here.
    pub fn from_index(index: usize) -> Self {
        assert!(index < Self::COUNT, "character index {index} out of range");
        Self(index as u8)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub fn name(self) -> &'static str {
        CHARACTER_NAMES[self.index()]
    }

    pub fn from_name(name: &str) -> Option<Self> {
        CHARACTER_NAMES
            .iter()
            .position(|candidate| candidate.eq_ignore_ascii_case(name))
            .map(Self::from_index)
    }

    /// Every id, player included.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..Self::COUNT as u8).map(Self)
    }

    /// Every non-player id in processing order.
    pub fn npcs() -> impl Iterator<Item = Self> {
        (1..Self::COUNT as u8).map(Self)
    }

    /// Occupancy bit owned by this character. Mitchell shares the player's
    /// bit and characters past Master are not tracked at all.
    pub fn occupancy_bit(self) -> Option<u32> {
        let owner = if self == Self::MITCHELL { Self::CATH } else { self };
        (owner <= Self::MASTER).then(|| 1u32 << owner.0)
    }

    pub fn is_table(self) -> bool {
        (Self::TABLE_A..=Self::TABLE_F).contains(&self)
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize_repr, Deserialize_repr, Default)]
#[repr(u8)]
pub enum Car {
    #[default]
    None = 0,
    BaggageRear = 1,
    Kronos = 2,
    GreenSleeping = 3,
    RedSleeping = 4,
    Restaurant = 5,
    Baggage = 6,
    CoalTender = 7,
    Locomotive = 8,
    Vestibule = 9,
}

impl Car {
    pub fn next(self) -> Option<Car> {
        Car::try_from(self as u8 + 1).ok()
    }

    pub fn prev(self) -> Option<Car> {
        match self {
            Car::None | Car::BaggageRear => None,
            other => Car::try_from(other as u8 - 1).ok(),
        }
    }

    pub fn is_sleeping_car(self) -> bool {
        matches!(self, Car::GreenSleeping | Car::RedSleeping)
    }

    pub fn label(self) -> &'static str {
        match self {
            Car::None => "none",
            Car::BaggageRear => "baggage_rear",
            Car::Kronos => "kronos",
            Car::GreenSleeping => "green",
            Car::RedSleeping => "red",
            Car::Restaurant => "restaurant",
            Car::Baggage => "baggage",
            Car::CoalTender => "coal_tender",
            Car::Locomotive => "locomotive",
            Car::Vestibule => "vestibule",
        }
    }

    pub fn from_label(label: &str) -> Option<Car> {
        (0..=9u8)
            .filter_map(|raw| Car::try_from(raw).ok())
            .find(|car| car.label().eq_ignore_ascii_case(label))
    }
}

impl TryFrom<u8> for Car {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Car::None),
            1 => Ok(Car::BaggageRear),
            2 => Ok(Car::Kronos),
            3 => Ok(Car::GreenSleeping),
            4 => Ok(Car::RedSleeping),
            5 => Ok(Car::Restaurant),
            6 => Ok(Car::Baggage),
            7 => Ok(Car::CoalTender),
            8 => Ok(Car::Locomotive),
            9 => Ok(Car::Vestibule),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr, Default)]
#[repr(u8)]
pub enum Location {
    #[default]
    OutsideCompartment = 0,
    InsideCompartment = 1,
    OutsideTrain = 2,
}

impl TryFrom<u8> for Location {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Location::OutsideCompartment),
            1 => Ok(Location::InsideCompartment),
            2 => Ok(Location::OutsideTrain),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr, Default)]
#[repr(u8)]
pub enum Direction {
    #[default]
    None = 0,
    Up = 1,
    Down = 2,
    Left = 3,
    Right = 4,
    Switch = 5,
}

impl Direction {
    pub fn is_walking(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }

    pub fn label(self) -> &'static str {
        match self {
            Direction::None => "none",
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Switch => "switch",
        }
    }
}

impl TryFrom<u8> for Direction {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Direction::None),
            1 => Ok(Direction::Up),
            2 => Ok(Direction::Down),
            3 => Ok(Direction::Left),
            4 => Ok(Direction::Right),
            5 => Ok(Direction::Switch),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr, Default)]
#[repr(u8)]
pub enum Clothes {
    #[default]
    Default = 0,
    Outfit1 = 1,
    Outfit2 = 2,
    Outfit3 = 3,
}

impl TryFrom<u8> for Clothes {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Clothes::Default),
            1 => Ok(Clothes::Outfit1),
            2 => Ok(Clothes::Outfit2),
            3 => Ok(Clothes::Outfit3),
            other => Err(other),
        }
    }
}

/// Direction the player's camera looks along the corridor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr, Default)]
#[repr(u8)]
pub enum Facing {
    #[default]
    None = 0,
    Up = 1,
    Down = 2,
}

impl TryFrom<u8> for Facing {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Facing::None),
            1 => Ok(Facing::Up),
            2 => Ok(Facing::Down),
            other => Err(other),
        }
    }
}

/// Action code carried by a save point. Codes above `CALLBACK` are opaque,
/// character-specific ids and are carried verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action(pub u32);

impl Action {
    pub const NONE: Action = Action(0);
    pub const ACTION1: Action = Action(1);
    pub const END_SOUND: Action = Action(2);
    pub const EXIT_COMPARTMENT: Action = Action(3);
    pub const ACTION4: Action = Action(4);
    pub const EXCUSE_ME_CATH: Action = Action(5);
    pub const EXCUSE_ME: Action = Action(6);
    pub const KNOCK: Action = Action(8);
    pub const OPEN_DOOR: Action = Action(9);
    pub const ACTION10: Action = Action(10);
    pub const ACTION11: Action = Action(11);
    pub const DEFAULT: Action = Action(12);
    pub const ACTION16: Action = Action(16);
    pub const DRAW_SCENE: Action = Action(17);
    pub const CALLBACK: Action = Action(18);
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match *self {
            Action::NONE => "none",
            Action::ACTION1 => "action1",
            Action::END_SOUND => "end_sound",
            Action::EXIT_COMPARTMENT => "exit_compartment",
            Action::ACTION4 => "action4",
            Action::EXCUSE_ME_CATH => "excuse_me_cath",
            Action::EXCUSE_ME => "excuse_me",
            Action::KNOCK => "knock",
            Action::OPEN_DOOR => "open_door",
            Action::ACTION10 => "action10",
            Action::ACTION11 => "action11",
            Action::DEFAULT => "default",
            Action::ACTION16 => "action16",
            Action::DRAW_SCENE => "draw_scene",
            Action::CALLBACK => "callback",
            Action(other) => return write!(f, "#{other}"),
        };
        f.write_str(label)
    }
}

/// Corridor positions of the eight compartment doors, shared by both
/// sleeping cars (compartment 1 / A at the top end).
pub const DOOR_POSITIONS: [Position; 8] = [8200, 7500, 6470, 5790, 4840, 4070, 3050, 2740];

/// Entity position associated with each scene slot (index 0 means "none").
pub const SCENE_POSITIONS: [Position; 41] = [
    0, 851, 1430, 2110, 0, 2410, 2980, 3450, 3760, 4100, 4680, 5140, 5440, 5810, 6410, 6850,
    7160, 7510, 8514, 0, 0, 0, 2086, 2690, 0, 3110, 3390, 3890, 4460, 4770, 5090, 5610, 6160,
    6460, 6800, 7320, 7870, 8160, 8500, 9020, 9269,
];

/// Player scene slots facing each door, per door index (looking up, looking down).
const DOOR_PLAYER_SLOTS: [(u8, u8); 8] = [
    (17, 38),
    (15, 36),
    (13, 34),
    (11, 32),
    (9, 30),
    (7, 28),
    (5, 26),
    (3, 25),
];

pub const MAX_VIEW_SLOT: u8 = 99;

/// One of the sixteen sleeping-car compartments (Green 1..8, then Red A..H).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Compartment(u8);

impl Compartment {
    pub const COUNT: usize = 16;

    pub const GREEN_1: Self = Self(0);
    pub const GREEN_2: Self = Self(1);
    pub const GREEN_3: Self = Self(2);
    pub const RED_A: Self = Self(8);
    pub const RED_B: Self = Self(9);
    pub const RED_F: Self = Self(13);

    pub fn new(index: u8) -> Option<Self> {
        ((index as usize) < Self::COUNT).then_some(Self(index))
    }

    /// Door object id: 1..=8 for the Green car, 32..=39 for the Red car.
    pub fn from_door(door: u8) -> Option<Self> {
        match door {
            1..=8 => Some(Self(door - 1)),
            32..=39 => Some(Self(door - 24)),
            _ => None,
        }
    }

    pub fn from_position(car: Car, position: Position) -> Option<Self> {
        let base = match car {
            Car::GreenSleeping => 0,
            Car::RedSleeping => 8,
            _ => return None,
        };
        DOOR_POSITIONS
            .iter()
            .position(|door| *door == position)
            .map(|offset| Self(base + offset as u8))
    }

    pub fn all() -> impl Iterator<Item = Self> {
        (0..Self::COUNT as u8).map(Self)
    }

    pub fn in_car(car: Car) -> impl Iterator<Item = Self> {
        Self::all().filter(move |compartment| compartment.car() == car)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub fn door(self) -> u8 {
        if self.0 < 8 {
            self.0 + 1
        } else {
            self.0 + 24
        }
    }

    pub fn car(self) -> Car {
        if self.0 < 8 {
            Car::GreenSleeping
        } else {
            Car::RedSleeping
        }
    }

    pub fn door_position(self) -> Position {
        DOOR_POSITIONS[(self.0 % 8) as usize]
    }

    /// View slots blocked while a character stands in the doorway.
    pub fn view_slots(self) -> (u8, u8) {
        let offset = self.0 % 8;
        (41 + offset, 51 + offset)
    }

    /// Player scene slots from which the doorway is in view.
    pub fn player_slots(self) -> (u8, u8) {
        DOOR_PLAYER_SLOTS[(self.0 % 8) as usize]
    }

    pub fn label(self) -> String {
        if self.0 < 8 {
            format!("green_{}", self.0 + 1)
        } else {
            format!("red_{}", (b'a' + self.0 - 8) as char)
        }
    }
}

/// Entity position associated with a player scene slot.
pub fn scene_position(slot: u8) -> Position {
    SCENE_POSITIONS.get(slot as usize).copied().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occupancy_bits_cover_tracked_characters_only() {
        assert_eq!(CharacterId::ANNA.occupancy_bit(), Some(1 << 1));
        assert_eq!(CharacterId::MASTER.occupancy_bit(), Some(1 << 31));
        assert_eq!(CharacterId::MITCHELL.occupancy_bit(), Some(1));
        assert_eq!(CharacterId::TABLE_A.occupancy_bit(), None);
    }

    #[test]
    fn compartment_doors_map_both_cars() {
        let green_one = Compartment::from_door(1).expect("door 1");
        assert_eq!(green_one.car(), Car::GreenSleeping);
        assert_eq!(green_one.door_position(), 8200);
        assert_eq!(green_one.view_slots(), (41, 51));

        let red_f = Compartment::from_door(37).expect("door 37");
        assert_eq!(red_f.index(), 13);
        assert_eq!(red_f.car(), Car::RedSleeping);
        assert_eq!(red_f.door_position(), 4070);
        assert_eq!(red_f.door(), 37);
        assert_eq!(red_f.label(), "red_f");

        assert_eq!(Compartment::from_door(9), None);
        assert_eq!(
            Compartment::from_position(Car::RedSleeping, 4070),
            Some(red_f)
        );
    }

    #[test]
    fn cars_step_in_train_order() {
        assert_eq!(Car::GreenSleeping.next(), Some(Car::RedSleeping));
        assert_eq!(Car::GreenSleeping.prev(), Some(Car::Kronos));
        assert_eq!(Car::Vestibule.next(), None);
        assert_eq!(Car::BaggageRear.prev(), None);
        assert_eq!(Car::from_label("restaurant"), Some(Car::Restaurant));
    }

    #[test]
    fn character_names_resolve() {
        assert_eq!(CharacterId::from_name("Alexei"), Some(CharacterId::ALEXEI));
        assert_eq!(CharacterId::TABLE_F.name(), "table_f");
        assert_eq!(Action(291662081).to_string(), "#291662081");
        assert_eq!(Action::CALLBACK.to_string(), "callback");
    }
}
