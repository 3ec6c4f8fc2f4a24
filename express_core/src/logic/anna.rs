//! Anna's first evening: slipping out of Tyler's compartment, settling into
//! her own and going to dinner.

use crate::params::StateParams;
use crate::savepoint::{MessageParam, SavePoint};
use crate::types::{Action, Car, CharacterId, Compartment, Location};
use crate::world::World;

use super::common::CommonState;

const TYLER_LEAVES: Action = Action(291662081);
const TYLER_CAUGHT: Action = Action(238936000);
const MAX_GUARD: Action = Action(71277948);
const CALL_HEAD_WAIT: Action = Action(223262556);
const SHOWN_TO_TABLE: Action = Action(157370960);
const SEAT: Action = Action(136455232);
const ORDER: Action = Action(270410280);
const FINISHED: Action = Action(203859488);
const VACATE: Action = Action(103798704);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum State {
    Birth = 16,
    FleeTyler = 17,
    WaitDinner = 18,
    GoDinner = 19,
    WaitHeadWait = 20,
    Dining = 21,
}

impl State {
    pub(crate) fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            16 => State::Birth,
            17 => State::FleeTyler,
            18 => State::WaitDinner,
            19 => State::GoDinner,
            20 => State::WaitHeadWait,
            21 => State::Dining,
            _ => return None,
        })
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            State::Birth => "anna.birth",
            State::FleeTyler => "anna.flee_tyler",
            State::WaitDinner => "anna.wait_dinner",
            State::GoDinner => "anna.go_dinner",
            State::WaitHeadWait => "anna.wait_head_wait",
            State::Dining => "anna.dining",
        }
    }
}

impl From<State> for u8 {
    fn from(state: State) -> u8 {
        state as u8
    }
}

pub(crate) fn handle(world: &mut World, who: CharacterId, state: u8, msg: &SavePoint) {
    let Some(state) = State::from_raw(state) else {
        return;
    };
    match state {
        State::Birth => birth(world, who, msg),
        State::FleeTyler => flee_tyler(world, who, msg),
        State::WaitDinner => wait_dinner(world, who, msg),
        State::GoDinner => go_dinner(world, who, msg),
        State::WaitHeadWait => wait_head_wait(world, who, msg),
        State::Dining => dining(world, who, msg),
    }
}

fn birth(world: &mut World, who: CharacterId, msg: &SavePoint) {
    match msg.action {
        Action::DEFAULT => {
            world.auto_message(who, TYLER_LEAVES, 0);
            world.auto_message(who, TYLER_CAUGHT, 1);
        }
        Action::NONE => {
            if world.clock.game_time > 1_062_000 && world.once(who, 0) {
                world.jump(who, State::FleeTyler, StateParams::Empty);
            }
        }
        _ => {}
    }
}

fn flee_tyler(world: &mut World, who: CharacterId, msg: &SavePoint) {
    match msg.action {
        Action::DEFAULT => world.call_state(
            who,
            1,
            CommonState::DoCorrSeq,
            StateParams::door_sequence("618Ca", Compartment::GREEN_1),
        ),
        Action::CALLBACK => match world.resume_tag(who) {
            1 => {
                let record = world.record_mut(who);
                record.location = Location::OutsideCompartment;
                record.position = 8514;
                world.call_state(who, 2, CommonState::DoWalk, StateParams::walk(Car::RedSleeping, 4070));
            }
            2 => world.call_state(
                who,
                3,
                CommonState::DoEnterCorrSeq,
                StateParams::door_sequence("618Af", Compartment::RED_F),
            ),
            3 => {
                world.end_graphics(who);
                let record = world.record_mut(who);
                record.position = 4070;
                record.location = Location::InsideCompartment;
                world.jump(who, State::WaitDinner, StateParams::Empty);
            }
            _ => {}
        },
        _ => {}
    }
}

fn wait_dinner(world: &mut World, who: CharacterId, msg: &SavePoint) {
    match msg.action {
        Action::DEFAULT => world.call_state(
            who,
            1,
            CommonState::CompLogic,
            StateParams::compartment_wait(1_093_500, "NONE"),
        ),
        Action::CALLBACK => match world.resume_tag(who) {
            1 => world.call_state(
                who,
                2,
                CommonState::DoCorrSeq,
                StateParams::door_sequence("618Bf", Compartment::RED_F),
            ),
            2 => {
                world.record_mut(who).location = Location::OutsideCompartment;
                world.send(who, CharacterId::MAX, MAX_GUARD, MessageParam::None);
                world.jump(who, State::GoDinner, StateParams::Empty);
            }
            _ => {}
        },
        _ => {}
    }
}

fn go_dinner(world: &mut World, who: CharacterId, msg: &SavePoint) {
    match msg.action {
        Action::DEFAULT => {
            world.call_state(who, 1, CommonState::DoWalk, StateParams::walk(Car::Restaurant, 850))
        }
        Action::CALLBACK => match world.resume_tag(who) {
            1 => world.call_state(who, 2, CommonState::WaitRcClear, StateParams::Empty),
            2 => {
                world.record_mut(who).position = 1540;
                world.call_state(who, 3, CommonState::DoSeq, StateParams::sequence("801US"));
            }
            3 => {
                world.start_seq(who, "001B");
                world.call_state(who, 4, CommonState::FinishSeq, StateParams::Empty);
            }
            4 => world.jump(who, State::WaitHeadWait, StateParams::Empty),
            _ => {}
        },
        _ => {}
    }
}

/// Standing at the dining-car entrance until the head waiter seats her.
fn wait_head_wait(world: &mut World, who: CharacterId, msg: &SavePoint) {
    match msg.action {
        Action::DEFAULT => {
            world.start_cyc(who, "001A");
            world.send(who, CharacterId::HEAD_WAIT, CALL_HEAD_WAIT, MessageParam::None);
        }
        action if action == SHOWN_TO_TABLE => {
            world.record_mut(who).location = Location::InsideCompartment;
            world.jump(who, State::Dining, StateParams::Empty);
        }
        _ => {}
    }
}

fn dining(world: &mut World, who: CharacterId, msg: &SavePoint) {
    match msg.action {
        Action::DEFAULT => {
            world.start_cyc(who, "001D");
            world.send(who, CharacterId::WAITER1, ORDER, MessageParam::None);
            world.send(who, CharacterId::TABLE_A, SEAT, MessageParam::None);
            world.call_state(who, 1, CommonState::DoWait, StateParams::wait(4500));
        }
        Action::CALLBACK => match world.resume_tag(who) {
            1 => {
                world.start_cyc(who, "001E");
                world.call_state(who, 2, CommonState::DoDialog, StateParams::dialog("ANN1048"));
            }
            2 => world.call_state(who, 3, CommonState::DoSeq, StateParams::sequence("001F")),
            3 => {
                world.send(who, CharacterId::WAITER1, FINISHED, MessageParam::None);
                world.send(who, CharacterId::TABLE_A, VACATE, "001G".into());
                world.record_mut(who).location = Location::OutsideCompartment;
                world.jump(who, CommonState::Parked, StateParams::Empty);
            }
            _ => {}
        },
        _ => {}
    }
}
