//! The two sleeping-car conductors. Each walks to the seat at the end of
//! their car, sits, stands aside while passengers squeeze by, and runs
//! errands raised through auto-message latches.

use crate::params::StateParams;
use crate::savepoint::SavePoint;
use crate::types::{Action, Car, CharacterId, Compartment, Location, Position};
use crate::world::World;

use super::common::CommonState;

/// Auto-messages routed into Cond1's latch bank.
const COND1_LATCHES: [(u32, u8); 12] = [
    (171394341, 7),
    (169633856, 9),
    (238732837, 10),
    (269624833, 12),
    (302614416, 11),
    (190082817, 8),
    (269436673, 13),
    (303343617, 14),
    (224122407, 17),
    (201431954, 18),
    (188635520, 19),
    (204379649, 4),
];

/// Latch raised when August asks for a message to be delivered.
const AUGUST_MESSAGE: u8 = 9;

const SEAT: Position = 2000;
const AUGUST_DOOR: Position = 6470;

// Sitting scratch slots.
const PASSERS: usize = 0;
const STANDING: usize = 1;

struct Sequences {
    sit_down: &'static str,
    sitting: &'static str,
    stand: &'static str,
    aside: &'static str,
    sit_fast: &'static str,
}

fn sequences(who: CharacterId) -> Sequences {
    if who == CharacterId::COND1 {
        Sequences {
            sit_down: "601C",
            sitting: "601E",
            stand: "601A",
            aside: "601K",
            sit_fast: "601D",
        }
    } else {
        Sequences {
            sit_down: "627C",
            sitting: "627K",
            stand: "627H",
            aside: "627B",
            sit_fast: "627F",
        }
    }
}

pub(crate) fn home_car(who: CharacterId) -> Car {
    if who == CharacterId::COND1 {
        Car::GreenSleeping
    } else {
        Car::RedSleeping
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum State {
    Birth = 16,
    StartPart1 = 17,
    Sitting = 18,
    DeliverMessage = 19,
}

impl State {
    pub(crate) fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            16 => State::Birth,
            17 => State::StartPart1,
            18 => State::Sitting,
            19 => State::DeliverMessage,
            _ => return None,
        })
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            State::Birth => "conductor.birth",
            State::StartPart1 => "conductor.start_part1",
            State::Sitting => "conductor.sitting",
            State::DeliverMessage => "conductor.deliver_message",
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
        Some(State::StartPart1) => start_part1(world, who, msg),
        Some(State::Sitting) => sitting(world, who, msg),
        Some(State::DeliverMessage) => deliver_message(world, who, msg),
        None => {}
    }
}

fn birth(world: &mut World, who: CharacterId, msg: &SavePoint) {
    match msg.action {
        Action::NONE => {
            if world.clock.game_time > 1_062_000 && world.once(who, 0) {
                world.jump(who, State::StartPart1, StateParams::Empty);
            }
        }
        Action::DEFAULT => {
            if who == CharacterId::COND1 {
                for (action, latch) in COND1_LATCHES {
                    world.auto_message(who, Action(action), latch);
                }
            }
            let record = world.record_mut(who);
            record.car = home_car(who);
            record.position = 9460;
            record.location = Location::OutsideCompartment;
        }
        _ => {}
    }
}

fn start_part1(world: &mut World, who: CharacterId, msg: &SavePoint) {
    match msg.action {
        Action::DEFAULT => {
            world.call_state(who, 1, CommonState::DoWalk, StateParams::walk(home_car(who), SEAT))
        }
        Action::CALLBACK => match world.resume_tag(who) {
            1 => world.call_state(
                who,
                2,
                CommonState::DoSeq,
                StateParams::sequence(sequences(who).sit_down),
            ),
            2 => world.jump(who, State::Sitting, StateParams::Empty),
            _ => {}
        },
        _ => {}
    }
}

fn sitting(world: &mut World, who: CharacterId, msg: &SavePoint) {
    let names = sequences(who);
    match msg.action {
        Action::DEFAULT => {
            world.start_cyc(who, names.sitting);
            world.record_mut(who).inventory_item = 0x80;
        }
        Action::NONE => {
            let standing = world.state_params(who).scratch_value(STANDING) != 0;
            if !standing && world.record(who).latch(AUGUST_MESSAGE) {
                let record = world.record_mut(who);
                record.set_latch(AUGUST_MESSAGE, false);
                record.inventory_item = 0;
                world.jump(who, State::DeliverMessage, StateParams::Empty);
            }
        }
        Action::ACTION11 => {
            let scratch = world.scratch(who);
            scratch[PASSERS] += 1;
            if scratch[STANDING] == 0 {
                scratch[STANDING] = 1;
                world.call_state(who, 1, CommonState::DoSeq, StateParams::sequence(names.stand));
            }
        }
        Action::ACTION16 => {
            let scratch = world.scratch(who);
            scratch[PASSERS] = (scratch[PASSERS] - 1).max(0);
            if scratch[PASSERS] == 0 && scratch[STANDING] != 0 {
                scratch[STANDING] = 0;
                world.call_state(who, 2, CommonState::DoSeq, StateParams::sequence(names.sit_fast));
            }
        }
        Action::CALLBACK => match world.resume_tag(who) {
            1 => world.start_cyc(who, names.aside),
            2 => world.start_cyc(who, names.sitting),
            _ => {}
        },
        _ => {}
    }
}

/// Walks down to August's compartment, passes the message on and returns
/// to the seat.
fn deliver_message(world: &mut World, who: CharacterId, msg: &SavePoint) {
    let names = sequences(who);
    match msg.action {
        Action::DEFAULT => world.call_state(who, 1, CommonState::DoSeq, StateParams::sequence(names.stand)),
        Action::CALLBACK => match world.resume_tag(who) {
            1 => world.call_state(
                who,
                2,
                CommonState::DoWalk,
                StateParams::walk(home_car(who), AUGUST_DOOR),
            ),
            2 => {
                if let Some(door) = Compartment::from_position(home_car(who), AUGUST_DOOR) {
                    world.soft_block_at_door(who, door);
                }
                world.call_state(who, 3, CommonState::DoDialog, StateParams::dialog("CON1200"));
            }
            3 => {
                if let Some(door) = Compartment::from_position(home_car(who), AUGUST_DOOR) {
                    world.release_soft_at_door(who, door);
                }
                world.call_state(who, 4, CommonState::DoWalk, StateParams::walk(home_car(who), SEAT));
            }
            4 => world.call_state(
                who,
                5,
                CommonState::DoSeq,
                StateParams::sequence(names.sit_down),
            ),
            5 => world.jump(who, State::Sitting, StateParams::Empty),
            _ => {}
        },
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::savepoint::MessageParam;

    fn seated(who: CharacterId) -> World {
        let mut world = World::default();
        world.setup_chapter(1);
        world.record_mut(who).position = SEAT;
        world.force_jump(who, State::Sitting, StateParams::Empty);
        world
    }

    #[test]
    fn stands_for_the_first_passer_and_sits_after_the_last() {
        let cond2 = CharacterId::COND2;
        let mut world = seated(cond2);
        assert_eq!(world.record(cond2).sequence_name, "627K");

        world.fed_ex(CharacterId::ANNA, cond2, Action::ACTION11, MessageParam::None);
        assert_eq!(world.record(cond2).current_state(), Some(CommonState::DoSeq as u8));
        world.fed_ex(cond2, cond2, Action::EXIT_COMPARTMENT, MessageParam::None);
        assert_eq!(world.record(cond2).sequence_name, "627B");

        world.fed_ex(CharacterId::TATIANA, cond2, Action::ACTION11, MessageParam::None);
        world.fed_ex(CharacterId::ANNA, cond2, Action::ACTION16, MessageParam::None);
        assert_eq!(world.record(cond2).current_state(), Some(State::Sitting as u8));

        world.fed_ex(CharacterId::TATIANA, cond2, Action::ACTION16, MessageParam::None);
        assert_eq!(world.record(cond2).sequence_name, "627F");
    }

    #[test]
    fn auto_message_latch_sends_him_on_an_errand() {
        let cond1 = CharacterId::COND1;
        let mut world = seated(cond1);
        world.send(CharacterId::AUGUST, cond1, Action(169633856), MessageParam::None);
        world.process();
        assert!(world.record(cond1).latch(AUGUST_MESSAGE));
        assert_eq!(world.record(cond1).current_state(), Some(State::Sitting as u8));

        world.fed_ex(CharacterId::CATH, cond1, Action::NONE, MessageParam::None);
        let record = world.record(cond1);
        assert!(!record.latch(AUGUST_MESSAGE));
        assert_eq!(record.calls()[0].state, State::DeliverMessage as u8);
        assert_eq!(record.sequence_name, "601A");
    }
}
