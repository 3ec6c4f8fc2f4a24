//! Vassili stays in bed in the Red car suite; he only notices whether his
//! niece is in the compartment with him.

use crate::params::StateParams;
use crate::savepoint::SavePoint;
use crate::types::{Action, CharacterId, Location};
use crate::world::World;

use super::common::CommonState;

const TATIANA_LEFT: Action = Action(122732000);
const TATIANA_BACK: Action = Action(168459827);

const ALONE: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum State {
    Birth = 16,
    InBed = 17,
}

impl State {
    pub(crate) fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            16 => Some(State::Birth),
            17 => Some(State::InBed),
            _ => None,
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            State::Birth => "vassili.birth",
            State::InBed => "vassili.in_bed",
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
                world.jump(who, State::InBed, StateParams::Empty);
            }
        }
        Some(State::InBed) => in_bed(world, who, msg),
        None => {}
    }
}

fn in_bed(world: &mut World, who: CharacterId, msg: &SavePoint) {
    match msg.action {
        Action::DEFAULT => {
            world.record_mut(who).location = Location::InsideCompartment;
            world.start_cyc(who, "303A");
        }
        action if action == TATIANA_LEFT => {
            world.scratch(who)[ALONE] = 1;
            world.log_event(format!("{who}.alone"));
        }
        action if action == TATIANA_BACK => {
            world.scratch(who)[ALONE] = 0;
            world.start_cyc(who, "303A");
        }
        Action::KNOCK | Action::OPEN_DOOR => {
            if world.state_params(who).scratch_value(ALONE) != 0 {
                world.call_state(who, 1, CommonState::DoDialog, StateParams::dialog("VAS1002"));
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::savepoint::MessageParam;

    #[test]
    fn answers_the_door_only_when_alone() {
        let mut world = World::default();
        world.setup_chapter(1);
        let vassili = CharacterId::VASSILI;
        world.force_jump(vassili, State::InBed, StateParams::Empty);

        world.fed_ex(CharacterId::CATH, vassili, Action::KNOCK, MessageParam::None);
        assert!(!world.is_dialog_running(vassili));

        world.fed_ex(CharacterId::TATIANA, vassili, TATIANA_LEFT, MessageParam::None);
        world.fed_ex(CharacterId::CATH, vassili, Action::KNOCK, MessageParam::None);
        assert!(world.is_dialog_running(vassili));
        assert!(world.events().iter().any(|entry| entry == "vassili.alone"));
    }
}
