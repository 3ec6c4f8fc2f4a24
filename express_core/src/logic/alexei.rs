//! Alexei through the first evening: dinner at table B, a spell in his
//! compartment, then the salon where he waits for Tatiana.

use crate::params::StateParams;
use crate::savegame::SaveKind;
use crate::savepoint::{MessageParam, SavePoint};
use crate::types::{Action, Car, CharacterId, Compartment, Location};
use crate::world::World;

use super::common::CommonState;

const EVENT_DINER: u32 = 76;
const EVENT_SALON_POEM: u32 = 80;

const SEAT: Action = Action(136455232);
const VACATE: Action = Action(103798704);
const HIDE_ITEM: Action = Action(168046720);
const SHOW_ITEM: Action = Action(168627977);
const AUGUST_NOTICED: Action = Action(225182640);
const MEET_TATIANA: Action = Action(124973510);
const GIVE_UP: Action = Action(188784532);

const POEM_ITEM: u8 = 10;

// AtDinner scratch slots.
const WATCHED: usize = 0;
const ITEM: usize = 1;
const STARE_DEADLINE: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum State {
    Birth = 16,
    AtDinner = 17,
    ReturnComp = 18,
    GoSalon = 19,
    Sitting = 20,
    WaitingForTat = 21,
}

impl State {
    pub(crate) fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            16 => State::Birth,
            17 => State::AtDinner,
            18 => State::ReturnComp,
            19 => State::GoSalon,
            20 => State::Sitting,
            21 => State::WaitingForTat,
            _ => return None,
        })
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            State::Birth => "alexei.birth",
            State::AtDinner => "alexei.at_dinner",
            State::ReturnComp => "alexei.return_comp",
            State::GoSalon => "alexei.go_salon",
            State::Sitting => "alexei.sitting",
            State::WaitingForTat => "alexei.waiting_for_tat",
        }
    }
}

impl From<State> for u8 {
    fn from(state: State) -> u8 {
        state as u8
    }
}

pub(crate) fn handle(world: &mut World, who: CharacterId, state: u8, msg: &SavePoint) {
    match State::from_raw(state) {
        Some(State::Birth) => {
            if msg.action == Action::NONE && world.clock.game_time > 1_062_000 {
                world.jump(who, State::AtDinner, StateParams::Empty);
            }
        }
        Some(State::AtDinner) => at_dinner(world, who, msg),
        Some(State::ReturnComp) => return_comp(world, who, msg),
        Some(State::GoSalon) => go_salon(world, who, msg),
        Some(State::Sitting) => sitting(world, who, msg),
        Some(State::WaitingForTat) => waiting_for_tat(world, who, msg),
        None => {}
    }
}

fn at_dinner(world: &mut World, who: CharacterId, msg: &SavePoint) {
    match msg.action {
        Action::NONE => {
            if world.clock.game_time > 1_089_000 && world.rc_clear() {
                world.record_mut(who).location = Location::OutsideCompartment;
                world.scratch(who)[ITEM] = 0;
                world.record_mut(who).inventory_item = 0;
                world.block_view(who, Car::Restaurant, 63);
                world.call_state(
                    who,
                    1,
                    CommonState::DoJoinedSeq,
                    StateParams::joined_sequence("005D", CharacterId::TABLE_B, VACATE, "005E"),
                );
                return;
            }
            // Staring at him from the next table gets the player moved along.
            let ticks = world.clock.ticks as i32;
            let scratch = world.scratch(who);
            if scratch[WATCHED] == 0 {
                scratch[STARE_DEADLINE] = 0;
                return;
            }
            if scratch[STARE_DEADLINE] == 0 {
                scratch[STARE_DEADLINE] = ticks + 90;
            }
            if scratch[STARE_DEADLINE] == i32::MAX || scratch[STARE_DEADLINE] >= ticks {
                return;
            }
            scratch[STARE_DEADLINE] = i32::MAX;
            world.load_scene(Car::Restaurant, 61);
        }
        Action::ACTION1 => {
            world.scratch(who)[ITEM] = 0;
            world.record_mut(who).inventory_item = 0;
            world.call_state(who, 2, CommonState::SaveGame, StateParams::save(SaveKind::Event, EVENT_DINER));
        }
        Action::DEFAULT => {
            world.send(who, CharacterId::TABLE_B, SEAT, MessageParam::None);
            world.start_cyc(who, "005B");
            world.scratch(who)[ITEM] = 0x80;
            world.record_mut(who).inventory_item = 0x80;
        }
        Action::DRAW_SCENE => {
            let watched = world.player_at(Car::Restaurant, 63);
            world.scratch(who)[WATCHED] = watched as i32;
        }
        Action::CALLBACK => match world.resume_tag(who) {
            1 => {
                world.release_view(who, Car::Restaurant, 63);
                world.jump(who, State::ReturnComp, StateParams::Empty);
            }
            2 => {
                world.send(who, CharacterId::TABLE_B, VACATE, "005E".into());
                let record = world.record_mut(who);
                record.position = 3650;
                record.location = Location::OutsideCompartment;
                world.end_graphics(who);
                world.load_scene(Car::Restaurant, 63);
                world.jump(who, State::ReturnComp, StateParams::Empty);
            }
            _ => {}
        },
        action if action == HIDE_ITEM || action == AUGUST_NOTICED => {
            world.record_mut(who).inventory_item = 0;
        }
        action if action == SHOW_ITEM => {
            let item = world.scratch(who)[ITEM];
            world.record_mut(who).inventory_item = item as u8;
        }
        _ => {}
    }
}

fn return_comp(world: &mut World, who: CharacterId, msg: &SavePoint) {
    match msg.action {
        Action::DEFAULT => world.call_state(who, 1, CommonState::DoSeq, StateParams::sequence("811DS")),
        Action::CALLBACK => match world.resume_tag(who) {
            1 => world.call_state(
                who,
                2,
                CommonState::DoWalk,
                StateParams::walk(Car::GreenSleeping, 7500),
            ),
            2 => world.call_state(
                who,
                3,
                CommonState::DoEnterCorrSeq,
                StateParams::door_sequence("602Eb", Compartment::GREEN_2),
            ),
            3 => world.call_state(
                who,
                4,
                CommonState::CompLogic,
                StateParams::compartment_wait(1_098_000, "411"),
            ),
            4 => world.jump(who, State::GoSalon, StateParams::Empty),
            _ => {}
        },
        _ => {}
    }
}

fn go_salon(world: &mut World, who: CharacterId, msg: &SavePoint) {
    match msg.action {
        Action::DEFAULT => world.call_state(
            who,
            1,
            CommonState::DoCorrSeq,
            StateParams::door_sequence("602Fb", Compartment::GREEN_2),
        ),
        Action::CALLBACK => match world.resume_tag(who) {
            1 => {
                world.record_mut(who).location = Location::OutsideCompartment;
                world.call_state(who, 2, CommonState::DoWalk, StateParams::walk(Car::Restaurant, 850));
            }
            2 => world.call_state(who, 3, CommonState::WaitRcClear, StateParams::Empty),
            3 => {
                let record = world.record_mut(who);
                record.position = 1540;
                record.location = Location::OutsideCompartment;
                world.call_state(
                    who,
                    4,
                    CommonState::DoBlockSeq,
                    StateParams::block_sequence("103A", Car::Restaurant, 52),
                );
            }
            4 => {
                world.record_mut(who).location = Location::InsideCompartment;
                world.jump(who, State::Sitting, StateParams::Empty);
            }
            _ => {}
        },
        _ => {}
    }
}

fn sitting(world: &mut World, who: CharacterId, msg: &SavePoint) {
    match msg.action {
        Action::NONE => {
            if world.clock.game_time > 1_111_500 && world.rc_clear() && world.once(who, 0) {
                let record = world.record_mut(who);
                record.location = Location::OutsideCompartment;
                record.inventory_item = 0;
                world.call_state(
                    who,
                    1,
                    CommonState::DoBlockSeq,
                    StateParams::block_sequence("103C", Car::Restaurant, 52),
                );
            }
        }
        Action::ACTION1 => {
            world.record_mut(who).inventory_item = 0;
            world.call_state(
                who,
                2,
                CommonState::SaveGame,
                StateParams::save(SaveKind::Event, EVENT_SALON_POEM),
            );
        }
        Action::DEFAULT => {
            world.start_cyc(who, "103B");
            world.record_mut(who).inventory_item = POEM_ITEM;
        }
        Action::CALLBACK => match world.resume_tag(who) {
            1 => {
                world.record_mut(who).location = Location::InsideCompartment;
                world.jump(who, State::WaitingForTat, StateParams::Empty);
            }
            2 => {
                world.record_mut(who).location = Location::OutsideCompartment;
                world.start_seq(who, "103D");
                world.queue_cyc(who, "103B");
                world.block_view(who, Car::Restaurant, 52);
                world.call_state(who, 3, CommonState::FinishSeq, StateParams::Empty);
            }
            3 => {
                world.start_cyc(who, "103B");
                world.release_view(who, Car::Restaurant, 52);
                world.record_mut(who).location = Location::InsideCompartment;
            }
            _ => {}
        },
        _ => {}
    }
}

fn waiting_for_tat(world: &mut World, who: CharacterId, msg: &SavePoint) {
    match msg.action {
        Action::DEFAULT => {
            world.record_mut(who).location = Location::InsideCompartment;
            world.start_cyc(who, "103F");
            world.send(who, CharacterId::TATIANA, MEET_TATIANA, MessageParam::None);
        }
        action if action == GIVE_UP => world.jump(who, CommonState::Parked, StateParams::Empty),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_dinner_once_the_room_is_clear() {
        let mut world = World::default();
        world.setup_chapter(1);
        let alexei = CharacterId::ALEXEI;
        world.clock.game_time = 1_062_500;
        world.fed_ex(CharacterId::CATH, alexei, Action::NONE, MessageParam::None);
        assert_eq!(world.record(alexei).inventory_item, 0x80);

        world.clock.game_time = 1_089_500;
        world.fed_ex(CharacterId::CATH, alexei, Action::NONE, MessageParam::None);
        let record = world.record(alexei);
        assert_eq!(record.current_state(), Some(CommonState::DoJoinedSeq as u8));
        assert_eq!(record.inventory_item, 0);
        assert!(world
            .occupancy
            .is_occupied_by(crate::occupancy::SlotKey::view(Car::Restaurant, 63), alexei));
    }

    #[test]
    fn messages_raised_while_leaving_dinner_wait_for_the_running_drain() {
        let mut world = World::default();
        world.setup_chapter(1);
        let alexei = CharacterId::ALEXEI;
        world.force_jump(alexei, State::AtDinner, StateParams::Empty);
        world.set_viewpoint(Car::Restaurant, 61, crate::types::Facing::Up);
        world.process();
        let before = world.events().len();

        world.send(CharacterId::CATH, alexei, Action::ACTION1, MessageParam::None);
        world.process();

        assert!(world.bus.is_empty());
        assert_eq!(world.viewpoint().slot, 63);
        let events = &world.events()[before..];
        let left = events
            .iter()
            .position(|entry| entry == "alexei.jump alexei.return_comp");
        let vacated: Vec<usize> = events
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.as_str() == "table_b.vacate 005E")
            .map(|(index, _)| index)
            .collect();
        assert_eq!(vacated.len(), 1, "{events:?}");
        assert!(left.is_some_and(|left| left < vacated[0]), "{events:?}");
    }

    #[test]
    fn draw_scene_tracks_the_players_gaze() {
        let mut world = World::default();
        world.setup_chapter(1);
        let alexei = CharacterId::ALEXEI;
        world.force_jump(alexei, State::AtDinner, StateParams::Empty);
        world.set_viewpoint(Car::Restaurant, 63, crate::types::Facing::Up);

        world.fed_ex(CharacterId::CATH, alexei, Action::DRAW_SCENE, MessageParam::None);
        assert_eq!(world.state_params(alexei).scratch_value(WATCHED), 1);

        world.clock.ticks = 10;
        world.fed_ex(CharacterId::CATH, alexei, Action::NONE, MessageParam::None);
        world.clock.ticks = 101;
        world.fed_ex(CharacterId::CATH, alexei, Action::NONE, MessageParam::None);
        assert_eq!(world.viewpoint().slot, 61);
    }
}
