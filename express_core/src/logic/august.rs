//! August at dinner in chapter one, then off to find Tyler.

use crate::params::StateParams;
use crate::savegame::SaveKind;
use crate::savepoint::{MessageParam, SavePoint};
use crate::types::{Action, Car, CharacterId, Compartment, Location};
use crate::world::World;

use super::common::CommonState;

const EVENT_ORIGINAL_JACKET: u32 = 4;

const SEAT: Action = Action(136455232);
const VACATE: Action = Action(103798704);
const CALL_HEAD_WAIT: Action = Action(239072064);
const DISMISS_HEAD_WAIT: Action = Action(191604416);
const CLEAR_TABLE: Action = Action(204704037);
const ALEXEI_NOTICED: Action = Action(225182640);
const HIDE_ITEM: Action = Action(168046720);
const SHOW_ITEM: Action = Action(168627977);

const HEAD_WAIT_SENT: usize = 0;
const ITEM: usize = 1;
const LATE: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum State {
    Birth = 16,
    WaitTyler = 17,
    SeekTyler = 18,
    InComp = 19,
}

impl State {
    pub(crate) fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            16 => State::Birth,
            17 => State::WaitTyler,
            18 => State::SeekTyler,
            19 => State::InComp,
            _ => return None,
        })
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            State::Birth => "august.birth",
            State::WaitTyler => "august.wait_tyler",
            State::SeekTyler => "august.seek_tyler",
            State::InComp => "august.in_comp",
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
        Some(State::Birth) => birth(world, who, msg),
        Some(State::WaitTyler) => wait_tyler(world, who, msg),
        Some(State::SeekTyler) => seek_tyler(world, who, msg),
        Some(State::InComp) => in_comp(world, who, msg),
        None => {}
    }
}

fn birth(world: &mut World, who: CharacterId, msg: &SavePoint) {
    if msg.action == Action::NONE && world.clock.game_time > 1_062_000 && world.once(who, 0) {
        world.jump(who, State::WaitTyler, StateParams::Empty);
    }
}

fn call_head_waiter(world: &mut World, who: CharacterId) {
    if world.scratch(who)[HEAD_WAIT_SENT] == 0 {
        world.send(who, CharacterId::HEAD_WAIT, CALL_HEAD_WAIT, MessageParam::None);
        world.scratch(who)[HEAD_WAIT_SENT] = 1;
    }
}

/// Seated at table D waiting for a dinner partner who never comes.
fn wait_tyler(world: &mut World, who: CharacterId, msg: &SavePoint) {
    match msg.action {
        Action::NONE => {
            if world.clock.game_time > 1_080_000 && world.once(who, LATE) {
                call_head_waiter(world, who);
            }
            if world.clock.game_time > 1_093_500 && world.rc_clear() {
                let record = world.record_mut(who);
                record.location = Location::OutsideCompartment;
                record.inventory_item = 0;
                world.call_state(
                    who,
                    1,
                    CommonState::DoJoinedSeq,
                    StateParams::joined_sequence("010J", CharacterId::TABLE_D, VACATE, "010K"),
                );
            }
        }
        Action::ACTION1 => {
            world.scratch(who)[ITEM] = 0;
            world.record_mut(who).inventory_item = 0;
            world.send(who, CharacterId::HEAD_WAIT, DISMISS_HEAD_WAIT, MessageParam::None);
            world.call_state(
                who,
                4,
                CommonState::SaveGame,
                StateParams::save(SaveKind::Event, EVENT_ORIGINAL_JACKET),
            );
        }
        Action::DEFAULT => {
            world.send(who, CharacterId::TABLE_D, SEAT, MessageParam::None);
            world.start_cyc(who, "010B");
            world.scratch(who)[ITEM] = 0x80;
            world.record_mut(who).inventory_item = 0x80;
        }
        Action::CALLBACK => match world.resume_tag(who) {
            1 | 5 => {
                world.send(who, CharacterId::WAITER1, CLEAR_TABLE, MessageParam::None);
                world.start_seq(who, "803DS");
                world.call_state(who, 2, CommonState::FinishSeq, StateParams::Empty);
            }
            2 => world.jump(who, State::SeekTyler, StateParams::Empty),
            4 => {
                world.send(who, CharacterId::ALEXEI, ALEXEI_NOTICED, MessageParam::None);
                world.record_mut(who).location = Location::OutsideCompartment;
                world.send(who, CharacterId::TABLE_D, VACATE, "010K".into());
                world.start_seq(who, "010P");
                world.bump_player(who);
                world.call_state(who, 5, CommonState::FinishSeq, StateParams::Empty);
            }
            _ => {}
        },
        action if action == HIDE_ITEM => world.record_mut(who).inventory_item = 0,
        action if action == SHOW_ITEM => {
            let item = world.scratch(who)[ITEM];
            world.record_mut(who).inventory_item = item as u8;
        }
        _ => {}
    }
}

fn seek_tyler(world: &mut World, who: CharacterId, msg: &SavePoint) {
    match msg.action {
        Action::DEFAULT => {
            world.call_state(who, 1, CommonState::DoWalk, StateParams::walk(Car::GreenSleeping, 8200))
        }
        Action::CALLBACK => match world.resume_tag(who) {
            1 => world.call_state(
                who,
                2,
                CommonState::DoCorrSeq,
                StateParams::door_sequence("626Ea", Compartment::GREEN_1),
            ),
            2 => world.call_state(who, 3, CommonState::DoDialog, StateParams::dialog("AUG1002B")),
            3 => world.call_state(
                who,
                4,
                CommonState::DoWalk,
                StateParams::walk(Car::GreenSleeping, 6470),
            ),
            4 => world.call_state(
                who,
                5,
                CommonState::DoEnterCorrSeq,
                StateParams::door_sequence("626Aa", Compartment::GREEN_3),
            ),
            5 => world.jump(who, State::InComp, StateParams::Empty),
            _ => {}
        },
        _ => {}
    }
}

fn in_comp(world: &mut World, who: CharacterId, msg: &SavePoint) {
    match msg.action {
        Action::DEFAULT => {
            let until = world.clock.game_time + 900;
            world.call_state(who, 1, CommonState::CompLogic, StateParams::compartment_wait(until, "NONE"));
        }
        Action::CALLBACK => world.jump(who, CommonState::Parked, StateParams::Empty),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seated_world() -> World {
        let mut world = World::default();
        world.setup_chapter(1);
        world.force_jump(CharacterId::AUGUST, State::WaitTyler, StateParams::Empty);
        world
    }

    #[test]
    fn seating_offers_an_item() {
        let mut world = seated_world();
        let august = world.record(CharacterId::AUGUST);
        assert_eq!(august.inventory_item, 0x80);
        assert_eq!(august.sequence_name, "010B");

        world.fed_ex(CharacterId::ALEXEI, CharacterId::AUGUST, HIDE_ITEM, MessageParam::None);
        assert_eq!(world.record(CharacterId::AUGUST).inventory_item, 0);
        world.fed_ex(CharacterId::ALEXEI, CharacterId::AUGUST, SHOW_ITEM, MessageParam::None);
        assert_eq!(world.record(CharacterId::AUGUST).inventory_item, 0x80);
    }

    #[test]
    fn interaction_requests_an_event_save() {
        let mut world = seated_world();
        world.fed_ex(CharacterId::CATH, CharacterId::AUGUST, Action::ACTION1, MessageParam::None);

        let requests = world.save_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].kind, SaveKind::Event);
        assert_eq!(requests[0].event, EVENT_ORIGINAL_JACKET);
        assert_eq!(world.record(CharacterId::AUGUST).sequence_name, "010P");
    }

    #[test]
    fn head_waiter_is_called_once_when_late() {
        let mut world = seated_world();
        world.clock.game_time = 1_085_000;
        world.bus.clear();
        for _ in 0..3 {
            world.fed_ex(CharacterId::CATH, CharacterId::AUGUST, Action::NONE, MessageParam::None);
        }
        let calls = world
            .bus
            .pending()
            .filter(|message| message.action == CALL_HEAD_WAIT)
            .count();
        assert_eq!(calls, 1);
    }
}
