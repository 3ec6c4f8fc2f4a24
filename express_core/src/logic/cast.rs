//! Which characters are scripted, where they start each chapter, and the
//! chapter reset that puts them there.

use crate::params::StateParams;
use crate::record::Placement;
use crate::savepoint::SavePoint;
use crate::types::{Car, CharacterId, Clothes, Location, Position};
use crate::world::World;

use super::{alexei, anna, august, common::CommonState, conductor, kronos, tables, tatiana, vassili};

/// Game time at which each chapter opens.
const CHAPTER_START: [u32; 5] = [1_037_700, 1_750_500, 1_944_000, 2_353_500, 2_844_000];

pub fn chapter_start_time(chapter: u8) -> u32 {
    assert!((1..=5).contains(&chapter), "chapter {chapter} out of range");
    CHAPTER_START[chapter as usize - 1]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastRole {
    Anna,
    August,
    Alexei,
    Tatiana,
    Vassili,
    Kronos,
    Conductor,
    Table,
}

impl CastRole {
    pub fn of(who: CharacterId) -> Option<Self> {
        match who {
            CharacterId::ANNA => Some(CastRole::Anna),
            CharacterId::AUGUST => Some(CastRole::August),
            CharacterId::ALEXEI => Some(CastRole::Alexei),
            CharacterId::TATIANA => Some(CastRole::Tatiana),
            CharacterId::VASSILI => Some(CastRole::Vassili),
            CharacterId::KRONOS => Some(CastRole::Kronos),
            CharacterId::COND1 | CharacterId::COND2 => Some(CastRole::Conductor),
            other if other.is_table() => Some(CastRole::Table),
            _ => None,
        }
    }

    pub(crate) fn handle(self, world: &mut World, who: CharacterId, state: u8, msg: &SavePoint) {
        match self {
            CastRole::Anna => anna::handle(world, who, state, msg),
            CastRole::August => august::handle(world, who, state, msg),
            CastRole::Alexei => alexei::handle(world, who, state, msg),
            CastRole::Tatiana => tatiana::handle(world, who, state, msg),
            CastRole::Vassili => vassili::handle(world, who, state, msg),
            CastRole::Kronos => kronos::handle(world, who, state, msg),
            CastRole::Conductor => conductor::handle(world, who, state, msg),
            CastRole::Table => tables::handle(world, who, state, msg),
        }
    }

    pub fn state_label(self, state: u8) -> Option<&'static str> {
        match self {
            CastRole::Anna => anna::State::from_raw(state).map(anna::State::label),
            CastRole::August => august::State::from_raw(state).map(august::State::label),
            CastRole::Alexei => alexei::State::from_raw(state).map(alexei::State::label),
            CastRole::Tatiana => tatiana::State::from_raw(state).map(tatiana::State::label),
            CastRole::Vassili => vassili::State::from_raw(state).map(vassili::State::label),
            CastRole::Kronos => kronos::State::from_raw(state).map(kronos::State::label),
            CastRole::Conductor => conductor::State::from_raw(state).map(conductor::State::label),
            CastRole::Table => tables::State::from_raw(state).map(tables::State::label),
        }
    }

    /// Line spoken through the compartment door after a knock.
    pub(crate) fn knock_reply(self) -> Option<&'static str> {
        match self {
            CastRole::Anna => Some("ANN1016"),
            CastRole::Alexei => Some("ALX1134A"),
            CastRole::August => Some("AUG1128A"),
            CastRole::Tatiana => Some("TAT1133A"),
            _ => None,
        }
    }

    /// Starting placement for `who` at the opening of `chapter`.
    fn placement(self, who: CharacterId, chapter: u8) -> Placement {
        let (car, position, location) = match (self, chapter) {
            (CastRole::Anna, 1) => (Car::GreenSleeping, 8200, Location::InsideCompartment),
            (CastRole::Anna, _) => (Car::RedSleeping, 4070, Location::InsideCompartment),
            (CastRole::August, 1) => (Car::Restaurant, 4691, Location::InsideCompartment),
            (CastRole::August, _) => (Car::GreenSleeping, 6470, Location::InsideCompartment),
            (CastRole::Alexei, 1) => (Car::Restaurant, 3969, Location::InsideCompartment),
            (CastRole::Alexei, _) => (Car::GreenSleeping, 7500, Location::InsideCompartment),
            (CastRole::Tatiana, 1) => (Car::Restaurant, 5419, Location::InsideCompartment),
            (CastRole::Tatiana, _) => (Car::RedSleeping, 7500, Location::InsideCompartment),
            (CastRole::Vassili, _) => (Car::RedSleeping, 8200, Location::InsideCompartment),
            (CastRole::Kronos, _) => (Car::Kronos, 6000, Location::InsideCompartment),
            (CastRole::Conductor, 1) => (conductor::home_car(who), 9460, Location::OutsideCompartment),
            (CastRole::Conductor, _) => (conductor::home_car(who), 1500, Location::InsideCompartment),
            (CastRole::Table, _) => (Car::Restaurant, tables::position(who), Location::InsideCompartment),
        };
        Placement {
            car,
            position,
            location,
            clothes: Clothes::Default,
        }
    }
}

/// Starting placement of any character; unscripted characters sit nowhere.
pub fn chapter_defaults(who: CharacterId, chapter: u8) -> Placement {
    CastRole::of(who)
        .map(|role| role.placement(who, chapter))
        .unwrap_or_default()
}

/// Whether `position` is a valid corridor coordinate.
pub(crate) fn in_car_bounds(position: Position) -> bool {
    (0..=10_000).contains(&position)
}

impl World {
    /// Resets every character for `chapter` and starts the scripted ones.
    pub fn setup_chapter(&mut self, chapter: u8) {
        self.clock.chapter = chapter;
        self.clock.game_time = chapter_start_time(chapter);
        self.timers.kill_all();
        self.bus.clear();
        self.dialogs.clear();
        self.occupancy.clear();
        for who in CharacterId::all() {
            self.record_mut(who).reset_to_chapter_defaults(chapter);
        }
        let viewpoint = self.viewpoint();
        self.set_viewpoint(viewpoint.car, viewpoint.slot, viewpoint.facing);
        self.log_event(format!("chapter {chapter} game_time={}", self.clock.game_time));

        for who in CharacterId::npcs() {
            if CastRole::of(who).is_none() {
                continue;
            }
            if chapter == 1 {
                self.jump(who, super::FIRST_CHARACTER_STATE, StateParams::Empty);
            } else {
                self.jump(who, CommonState::Parked, StateParams::Empty);
            }
        }
    }
}
