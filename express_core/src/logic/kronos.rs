//! Kronos keeps to his private car and calls the concert once its timer
//! runs out.

use crate::params::StateParams;
use crate::savepoint::{MessageParam, SavePoint};
use crate::types::{Action, CharacterId};
use crate::world::World;

use super::common::CommonState;

/// Timer subroutine that starts the concert.
pub const CONCERT_TIMER: u16 = 1;
const CONCERT_DELAY_TICKS: u32 = 2700;

const CONCERT_ANNOUNCED: Action = Action(191070912);
const KAHINA_REPORT: Action = Action(171849314);
const KAHINA_BACK: Action = Action(138085344);

const ARMED: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum State {
    Birth = 16,
    Awaiting = 17,
    Concert = 18,
}

impl State {
    pub(crate) fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            16 => Some(State::Birth),
            17 => Some(State::Awaiting),
            18 => Some(State::Concert),
            _ => None,
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            State::Birth => "kronos.birth",
            State::Awaiting => "kronos.awaiting",
            State::Concert => "kronos.concert",
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
                world.jump(who, State::Awaiting, StateParams::Empty);
            }
        }
        Some(State::Awaiting) => awaiting(world, who, msg),
        Some(State::Concert) => concert(world, who, msg),
        None => {}
    }
}

fn awaiting(world: &mut World, who: CharacterId, msg: &SavePoint) {
    match msg.action {
        Action::DEFAULT => {
            if world.state_params(who).scratch_value(ARMED) == 0 {
                let deadline = world.clock.ticks + CONCERT_DELAY_TICKS;
                world.timers.add(deadline, CONCERT_TIMER);
                world.scratch(who)[ARMED] = 1;
            }
        }
        Action::NONE => {
            let armed = world.state_params(who).scratch_value(ARMED) != 0;
            if armed && !world.timers.contains(CONCERT_TIMER) {
                world.jump(who, State::Concert, StateParams::Empty);
            }
        }
        action if action == KAHINA_REPORT || action == KAHINA_BACK => {
            world.log_event(format!("{who}.heard {action} from {}", msg.sender));
        }
        _ => {}
    }
}

fn concert(world: &mut World, who: CharacterId, msg: &SavePoint) {
    match msg.action {
        Action::DEFAULT => {
            world.send_all(who, CONCERT_ANNOUNCED, MessageParam::None);
            world.call_state(who, 1, CommonState::DoDialog, StateParams::dialog("KRO3003"));
        }
        Action::CALLBACK => world.jump(who, CommonState::Parked, StateParams::Empty),
        _ => {}
    }
}
