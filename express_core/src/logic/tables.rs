//! Dining-car tables. They are characters only so diners can message them:
//! a seat notice, and a vacate notice naming the clearing animation.

use crate::savepoint::SavePoint;
use crate::types::{Action, CharacterId, Position};
use crate::world::World;

const SEAT: Action = Action(136455232);
const VACATE: Action = Action(103798704);

const OCCUPIED: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum State {
    Waiting = 16,
}

impl State {
    pub(crate) fn from_raw(raw: u8) -> Option<Self> {
        (raw == State::Waiting as u8).then_some(State::Waiting)
    }

    pub(crate) fn label(self) -> &'static str {
        "table.waiting"
    }
}

impl From<State> for u8 {
    fn from(state: State) -> u8 {
        state as u8
    }
}

pub(crate) fn position(who: CharacterId) -> Position {
    match who {
        CharacterId::TABLE_A | CharacterId::TABLE_D => 3970,
        CharacterId::TABLE_B | CharacterId::TABLE_E => 4690,
        _ => 5420,
    }
}

pub(crate) fn handle(world: &mut World, who: CharacterId, state: u8, msg: &SavePoint) {
    if State::from_raw(state).is_none() {
        return;
    }
    match msg.action {
        action if action == SEAT => {
            world.scratch(who)[OCCUPIED] = 1;
            world.log_event(format!("{who}.seat {}", msg.sender));
        }
        action if action == VACATE => {
            world.scratch(who)[OCCUPIED] = 0;
            let note = msg.param.as_name().unwrap_or_default().to_string();
            world.log_event(format!("{who}.vacate {note}"));
            if note.is_empty() {
                world.end_graphics(who);
            } else {
                world.start_seq(who, &note);
            }
        }
        Action::EXIT_COMPARTMENT => world.end_graphics(who),
        _ => {}
    }
}
