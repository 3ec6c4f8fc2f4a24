//! Helper states shared by every scripted character.
//!
//! Each of these runs as a callee: the caller pushes it with `call_state`,
//! and it returns (redelivering `Callback`) once its job is done.

use crate::params::StateParams;
use crate::savepoint::SavePoint;
use crate::types::{Action, Car, CharacterId, Location, Position};
use crate::world::World;

use super::cast::CastRole;

const KNOCK_REPLY: u8 = 1;
const DOOR_REPLY: u8 = 2;
const CHARACTER_REPLY: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommonState {
    DebugWalk = 1,
    DoDialog = 2,
    DoSeq = 3,
    DoBlockSeq = 4,
    DoCorrSeq = 5,
    DoEnterCorrSeq = 6,
    FinishSeq = 7,
    DoJoinedSeq = 8,
    DoWait = 9,
    DoWaitTicks = 10,
    DoWalk = 11,
    WaitRcClear = 12,
    SaveGame = 13,
    CompLogic = 14,
    /// Permanent end state; ignores everything.
    Parked = 15,
}

impl CommonState {
    const ALL: [CommonState; 15] = [
        CommonState::DebugWalk,
        CommonState::DoDialog,
        CommonState::DoSeq,
        CommonState::DoBlockSeq,
        CommonState::DoCorrSeq,
        CommonState::DoEnterCorrSeq,
        CommonState::FinishSeq,
        CommonState::DoJoinedSeq,
        CommonState::DoWait,
        CommonState::DoWaitTicks,
        CommonState::DoWalk,
        CommonState::WaitRcClear,
        CommonState::SaveGame,
        CommonState::CompLogic,
        CommonState::Parked,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CommonState::DebugWalk => "debug_walk",
            CommonState::DoDialog => "do_dialog",
            CommonState::DoSeq => "do_seq",
            CommonState::DoBlockSeq => "do_block_seq",
            CommonState::DoCorrSeq => "do_corr_seq",
            CommonState::DoEnterCorrSeq => "do_enter_corr_seq",
            CommonState::FinishSeq => "finish_seq",
            CommonState::DoJoinedSeq => "do_joined_seq",
            CommonState::DoWait => "do_wait",
            CommonState::DoWaitTicks => "do_wait_ticks",
            CommonState::DoWalk => "do_walk",
            CommonState::WaitRcClear => "wait_rc_clear",
            CommonState::SaveGame => "save_game",
            CommonState::CompLogic => "comp_logic",
            CommonState::Parked => "parked",
        }
    }
}

impl From<CommonState> for u8 {
    fn from(state: CommonState) -> u8 {
        state as u8
    }
}

impl TryFrom<u8> for CommonState {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|state| *state as u8 == value)
            .ok_or(value)
    }
}

pub(crate) fn handle(world: &mut World, who: CharacterId, state: CommonState, msg: &SavePoint) {
    match state {
        CommonState::DebugWalk => debug_walk(world, who, msg),
        CommonState::DoDialog => do_dialog(world, who, msg),
        CommonState::DoSeq => do_seq(world, who, msg),
        CommonState::DoBlockSeq => do_block_seq(world, who, msg),
        CommonState::DoCorrSeq => do_corr_seq(world, who, msg, false),
        CommonState::DoEnterCorrSeq => do_corr_seq(world, who, msg, true),
        CommonState::FinishSeq => finish_seq(world, who, msg),
        CommonState::DoJoinedSeq => do_joined_seq(world, who, msg),
        CommonState::DoWait => do_wait(world, who, msg, false),
        CommonState::DoWaitTicks => do_wait(world, who, msg, true),
        CommonState::DoWalk => do_walk(world, who, msg),
        CommonState::WaitRcClear => wait_rc_clear(world, who, msg),
        CommonState::SaveGame => save_game(world, who, msg),
        CommonState::CompLogic => comp_logic(world, who, msg),
        CommonState::Parked => {}
    }
}

fn walk_target(world: &World, who: CharacterId) -> Option<(Car, Position)> {
    match world.state_params(who) {
        StateParams::Walk { car, position } => Some((*car, *position)),
        _ => None,
    }
}

/// Paces the current car end to end; used to exercise walking.
fn debug_walk(world: &mut World, who: CharacterId, msg: &SavePoint) {
    match msg.action {
        Action::DEFAULT => {
            if walk_target(world, who).is_none() {
                let car = world.record(who).car;
                *world.state_params_mut(who) = StateParams::walk(car, 9000);
            }
        }
        Action::NONE => {
            let Some((car, position)) = walk_target(world, who) else {
                return;
            };
            if world.update_entity(who, car, position) {
                *world.state_params_mut(who) = StateParams::walk(car, 10000 - position);
            }
        }
        _ => {}
    }
}

fn do_dialog(world: &mut World, who: CharacterId, msg: &SavePoint) {
    match msg.action {
        Action::DEFAULT => {
            if let Some(name) = world.state_params(who).name().map(str::to_string) {
                world.play_dialog(who, &name);
            }
        }
        Action::END_SOUND => world.return_from_state(who),
        _ => {}
    }
}

fn do_seq(world: &mut World, who: CharacterId, msg: &SavePoint) {
    match msg.action {
        Action::DEFAULT => {
            if let Some(name) = world.state_params(who).name().map(str::to_string) {
                world.start_seq(who, &name);
            }
        }
        Action::EXIT_COMPARTMENT => world.return_from_state(who),
        _ => {}
    }
}

fn do_block_seq(world: &mut World, who: CharacterId, msg: &SavePoint) {
    let StateParams::BlockSequence { name, car, slot } = world.state_params(who).clone() else {
        return;
    };
    match msg.action {
        Action::DEFAULT => {
            world.start_seq(who, &name);
            world.block_view(who, car, slot);
        }
        Action::EXIT_COMPARTMENT => {
            world.release_view(who, car, slot);
            world.return_from_state(who);
        }
        _ => {}
    }
}

fn do_corr_seq(world: &mut World, who: CharacterId, msg: &SavePoint, entering: bool) {
    let StateParams::DoorSequence { name, compartment } = world.state_params(who).clone() else {
        return;
    };
    match msg.action {
        Action::DEFAULT => {
            world.start_seq(who, &name);
            world.block_at_door(who, compartment);
        }
        Action::EXIT_COMPARTMENT => {
            world.release_at_door(who, compartment);
            if entering {
                world.record_mut(who).location = Location::InsideCompartment;
                world.end_graphics(who);
            }
            world.return_from_state(who);
        }
        _ => {}
    }
}

/// Waits for whatever in-place animation is running to end.
fn finish_seq(world: &mut World, who: CharacterId, msg: &SavePoint) {
    match msg.action {
        Action::NONE => {
            if world.record(who).direction != crate::types::Direction::Right {
                world.return_from_state(who);
            }
        }
        Action::EXIT_COMPARTMENT => world.return_from_state(who),
        _ => {}
    }
}

fn do_joined_seq(world: &mut World, who: CharacterId, msg: &SavePoint) {
    let StateParams::JoinedSequence {
        name,
        recipient,
        action,
        note,
        sent,
    } = world.state_params(who).clone()
    else {
        return;
    };
    match msg.action {
        Action::DEFAULT => world.start_seq(who, &name),
        Action::ACTION10 => {
            if !sent {
                world.fed_ex(who, recipient, action, note.as_str().into());
                if let StateParams::JoinedSequence { sent, .. } = world.state_params_mut(who) {
                    *sent = true;
                }
            }
        }
        Action::EXIT_COMPARTMENT => {
            if !sent {
                world.fed_ex(who, recipient, action, note.as_str().into());
            }
            world.return_from_state(who);
        }
        _ => {}
    }
}

fn do_wait(world: &mut World, who: CharacterId, msg: &SavePoint, real_ticks: bool) {
    if msg.action != Action::NONE {
        return;
    }
    let now = if real_ticks {
        world.clock.ticks
    } else {
        world.clock.game_time
    };
    let StateParams::Wait { duration, deadline } = world.state_params_mut(who) else {
        return;
    };
    if *deadline == 0 {
        *deadline = now.saturating_add(*duration).max(1);
    }
    if *deadline < now {
        world.return_from_state(who);
    }
}

fn do_walk(world: &mut World, who: CharacterId, msg: &SavePoint) {
    match msg.action {
        Action::NONE | Action::DEFAULT => {
            if let Some((car, position)) = walk_target(world, who) {
                if world.update_entity(who, car, position) {
                    world.return_from_state(who);
                }
            }
        }
        Action::EXCUSE_ME_CATH => {
            if !world.is_dialog_running(CharacterId::CATH) {
                world.sound().excuse_me(CharacterId::CATH, who);
            }
        }
        Action::EXCUSE_ME => {
            if !world.is_dialog_running(who) {
                world.sound().excuse_me(who, msg.sender);
            }
        }
        _ => {}
    }
}

fn wait_rc_clear(world: &mut World, who: CharacterId, msg: &SavePoint) {
    if matches!(msg.action, Action::NONE | Action::DEFAULT) && world.rc_clear() {
        world.return_from_state(who);
    }
}

fn save_game(world: &mut World, who: CharacterId, msg: &SavePoint) {
    if msg.action != Action::DEFAULT {
        return;
    }
    if let StateParams::SaveGame { kind, event } = *world.state_params(who) {
        world.request_save(who, kind, event);
    }
    world.return_from_state(who);
}

/// Sits in the compartment until a given time, answering knocks.
fn comp_logic(world: &mut World, who: CharacterId, msg: &SavePoint) {
    let StateParams::CompartmentWait { until, name } = world.state_params(who).clone() else {
        return;
    };
    match msg.action {
        Action::NONE => {
            if until < world.clock.game_time {
                world.return_from_state(who);
            }
        }
        Action::DEFAULT => {
            if name != "NONE" {
                world.start_cyc(who, &name);
            }
        }
        Action::KNOCK => {
            world.call_state(who, KNOCK_REPLY, CommonState::DoDialog, StateParams::dialog("LIB012"));
        }
        Action::OPEN_DOOR => {
            world.call_state(who, DOOR_REPLY, CommonState::DoDialog, StateParams::dialog("LIB013"));
        }
        Action::CALLBACK => {
            let tag = world.resume_tag(who);
            if tag == KNOCK_REPLY || tag == DOOR_REPLY {
                if let Some(reply) = CastRole::of(who).and_then(|role| role.knock_reply()) {
                    world.call_state(
                        who,
                        CHARACTER_REPLY,
                        CommonState::DoDialog,
                        StateParams::dialog(reply),
                    );
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::savepoint::MessageParam;

    fn parked_world() -> World {
        let mut world = World::default();
        world.setup_chapter(1);
        world.force_jump(CharacterId::AUGUST, CommonState::Parked, StateParams::Empty);
        world
    }

    #[test]
    fn state_ids_round_trip() {
        for state in CommonState::ALL {
            assert_eq!(CommonState::try_from(state as u8), Ok(state));
        }
        assert_eq!(CommonState::try_from(0), Err(0));
        assert_eq!(CommonState::try_from(16), Err(16));
    }

    #[test]
    fn dialog_returns_on_end_sound() {
        let mut world = parked_world();
        let august = CharacterId::AUGUST;
        world.call_state(august, 1, CommonState::DoDialog, StateParams::dialog("AUG1002B"));
        assert!(world.is_dialog_running(august));
        assert_eq!(world.record(august).current_call(), 2);

        world.finish_dialog(august);
        world.process();
        assert_eq!(world.record(august).current_call(), 1);
    }

    #[test]
    fn wait_arms_then_expires() {
        let mut world = parked_world();
        let august = CharacterId::AUGUST;
        world.call_state(august, 1, CommonState::DoWait, StateParams::wait(100));

        world.fed_ex(CharacterId::CATH, august, Action::NONE, MessageParam::None);
        assert_eq!(world.record(august).current_call(), 2);

        world.clock.game_time += 101;
        world.fed_ex(CharacterId::CATH, august, Action::NONE, MessageParam::None);
        assert_eq!(world.record(august).current_call(), 1);
    }

    #[test]
    fn joined_sequence_notifies_once() {
        let mut world = parked_world();
        let august = CharacterId::AUGUST;
        world.call_state(
            august,
            1,
            CommonState::DoJoinedSeq,
            StateParams::joined_sequence("010A", CharacterId::TABLE_D, Action(103798704), "010M"),
        );
        world.fed_ex(august, august, Action::ACTION10, MessageParam::None);
        world.fed_ex(august, august, Action::ACTION10, MessageParam::None);
        world.fed_ex(august, august, Action::EXIT_COMPARTMENT, MessageParam::None);

        let notes: Vec<_> = world
            .events()
            .iter()
            .filter(|entry| entry.starts_with("table_d.vacate"))
            .collect();
        assert_eq!(notes.len(), 1);
        assert_eq!(world.record(august).current_call(), 1);
    }
}
