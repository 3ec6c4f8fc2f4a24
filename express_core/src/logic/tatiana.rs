//! Tatiana's first evening: dinner at table E, back to the suite, then a
//! breath of air on the Green car platform before bed.

use crate::params::StateParams;
use crate::savepoint::{MessageParam, SavePoint};
use crate::types::{Action, Car, CharacterId, Clothes, Compartment, Location};
use crate::world::World;

use super::common::CommonState;

const LEFT_WITH_VASSILI: Action = Action(191198209);
const SEAT: Action = Action(136455232);
const VACATE: Action = Action(103798704);
const CALL_HEAD_WAIT: Action = Action(257489762);
const ALEXEI_WAITING: Action = Action(124973510);
const BLANK_TABLE: Action = Action(122358304);
const SHOW_TABLE: Action = Action(122288808);
const LEAVING_DINNER: Action = Action(223183000);
const CLEAR_TABLE: Action = Action(188893625);
const LEFT_DINNER: Action = Action(268620864);
const BACK_IN_SUITE: Action = Action(135854208);
const VASSILI_ALONE: Action = Action(122732000);
const VASSILI_NOT_ALONE: Action = Action(168459827);

// AtDinner scratch slots.
const WATCHED: usize = 0;
const REMARKS: usize = 2;
const OVERHEARD: usize = 3;
const REMARK_DEADLINE: usize = 4;
const HEAD_WAIT_SENT: usize = 6;
const STARE_DEADLINE: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum State {
    Birth = 16,
    AtDinner = 17,
    ExitDining = 18,
    ReturnToComp = 19,
    GetSomeAir = 20,
    ReturnToCompAgain = 21,
}

impl State {
    pub(crate) fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            16 => State::Birth,
            17 => State::AtDinner,
            18 => State::ExitDining,
            19 => State::ReturnToComp,
            20 => State::GetSomeAir,
            21 => State::ReturnToCompAgain,
            _ => return None,
        })
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            State::Birth => "tatiana.birth",
            State::AtDinner => "tatiana.at_dinner",
            State::ExitDining => "tatiana.exit_dining",
            State::ReturnToComp => "tatiana.return_to_comp",
            State::GetSomeAir => "tatiana.get_some_air",
            State::ReturnToCompAgain => "tatiana.return_to_comp_again",
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
        Some(State::AtDinner) => at_dinner(world, who, msg),
        Some(State::ExitDining) => exit_dining(world, who, msg),
        Some(State::ReturnToComp) => return_to_comp(world, who, msg),
        Some(State::GetSomeAir) => get_some_air(world, who, msg),
        Some(State::ReturnToCompAgain) => return_to_comp_again(world, who, msg),
        None => {}
    }
}

fn birth(world: &mut World, who: CharacterId, msg: &SavePoint) {
    match msg.action {
        Action::NONE => {
            if world.clock.game_time > 1_062_000 && world.once(who, 0) {
                world.jump(who, State::AtDinner, StateParams::Empty);
            }
        }
        Action::DEFAULT => {
            world.auto_message(who, LEFT_WITH_VASSILI, 0);
            let record = world.record_mut(who);
            record.car = Car::Restaurant;
            record.position = 5419;
            record.location = Location::InsideCompartment;
        }
        _ => {}
    }
}

fn at_dinner(world: &mut World, who: CharacterId, msg: &SavePoint) {
    match msg.action {
        Action::NONE => {
            let ticks = world.clock.ticks as i32;
            let remarks = world.state_params(who).scratch_value(REMARKS);
            let overheard = world.state_params(who).scratch_value(OVERHEARD) != 0;
            if overheard && remarks < 2 && !world.is_dialog_running(who) {
                let scratch = world.scratch(who);
                if scratch[REMARK_DEADLINE] == 0 {
                    scratch[REMARK_DEADLINE] = ticks + 450;
                }
                if scratch[REMARK_DEADLINE] < ticks {
                    scratch[REMARK_DEADLINE] = 0;
                    scratch[REMARKS] += 1;
                    let line = if remarks == 0 { "TAT1069A" } else { "TAT1069B" };
                    world.play_dialog(who, line);
                }
            }
            if world.clock.game_time > 1_084_500 && world.once(who, HEAD_WAIT_SENT) {
                world.send(who, CharacterId::HEAD_WAIT, CALL_HEAD_WAIT, MessageParam::None);
            }
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
            world.load_scene(Car::Restaurant, 65);
        }
        Action::DEFAULT => {
            world.send(who, CharacterId::TABLE_E, SEAT, MessageParam::None);
            world.start_cyc(who, "014A");
        }
        Action::DRAW_SCENE => {
            let watched = world.player_at(Car::Restaurant, 67);
            let overheard = (69..=71).any(|slot| world.player_at(Car::Restaurant, slot));
            let scratch = world.scratch(who);
            scratch[WATCHED] = watched as i32;
            scratch[OVERHEARD] = overheard as i32;
        }
        action if action == BLANK_TABLE => world.start_cyc(who, "BLANK"),
        action if action == SHOW_TABLE => world.start_cyc(who, "014A"),
        action if action == ALEXEI_WAITING => world.jump(who, State::ExitDining, StateParams::Empty),
        _ => {}
    }
}

fn exit_dining(world: &mut World, who: CharacterId, msg: &SavePoint) {
    match msg.action {
        Action::DEFAULT => world.call_state(who, 1, CommonState::WaitRcClear, StateParams::Empty),
        Action::CALLBACK => match world.resume_tag(who) {
            1 => {
                world.record_mut(who).location = Location::OutsideCompartment;
                world.send(who, CharacterId::AUGUST, LEAVING_DINNER, MessageParam::None);
                world.block_view(who, Car::Restaurant, 67);
                world.play_dialog(who, "TAT1070");
                world.call_state(
                    who,
                    2,
                    CommonState::DoJoinedSeq,
                    StateParams::joined_sequence("014C", CharacterId::TABLE_E, VACATE, "014D"),
                );
            }
            2 => {
                world.release_view(who, Car::Restaurant, 67);
                world.send(who, CharacterId::WAITER1, CLEAR_TABLE, MessageParam::None);
                world.send(who, CharacterId::AUGUST, LEFT_DINNER, MessageParam::None);
                world.jump(who, State::ReturnToComp, StateParams::Empty);
            }
            _ => {}
        },
        _ => {}
    }
}

fn return_to_comp(world: &mut World, who: CharacterId, msg: &SavePoint) {
    match msg.action {
        Action::DEFAULT => {
            world.record_mut(who).clothes = Clothes::Outfit1;
            world.call_state(who, 1, CommonState::DoWalk, StateParams::walk(Car::RedSleeping, 8513));
        }
        Action::CALLBACK => match world.resume_tag(who) {
            1 => {
                world.record_mut(who).clothes = Clothes::Default;
                world.play_dialog(who, "TAT1071");
                world.start_seq(who, "604Aa");
                world.block_at_door(who, Compartment::RED_A);
                world.record_mut(who).location = Location::InsideCompartment;
                world.call_state(who, 2, CommonState::FinishSeq, StateParams::Empty);
            }
            2 => {
                world.release_at_door(who, Compartment::RED_A);
                world.end_graphics(who);
                world.send(who, CharacterId::ALEXEI, BACK_IN_SUITE, MessageParam::None);
                wait_for_quiet(world, who);
            }
            3 => wait_for_quiet(world, who),
            4 => {
                world.record_mut(who).position = 7500;
                world.send(who, CharacterId::VASSILI, VASSILI_NOT_ALONE, MessageParam::None);
                world.call_state(
                    who,
                    5,
                    CommonState::CompLogic,
                    StateParams::compartment_wait(1_156_500, "NONE"),
                );
            }
            5 => world.jump(who, State::GetSomeAir, StateParams::Empty),
            _ => {}
        },
        _ => {}
    }
}

/// Lets a running line finish before saying goodnight to Vassili.
fn wait_for_quiet(world: &mut World, who: CharacterId) {
    if world.is_dialog_running(who) {
        world.call_state(who, 3, CommonState::DoWait, StateParams::wait(75));
    } else {
        world.call_state(who, 4, CommonState::DoDialog, StateParams::dialog("TAT1071A"));
    }
}

fn get_some_air(world: &mut World, who: CharacterId, msg: &SavePoint) {
    match msg.action {
        Action::DEFAULT => {
            world.send(who, CharacterId::VASSILI, VASSILI_ALONE, MessageParam::None);
            world.call_state(
                who,
                1,
                CommonState::DoCorrSeq,
                StateParams::door_sequence("673Bb", Compartment::RED_B),
            );
        }
        Action::NONE => {
            if world.clock.game_time > 1_233_000 && world.once(who, 0) {
                world.release_view(who, Car::GreenSleeping, 70);
                world.release_view(who, Car::GreenSleeping, 71);
                world.record_mut(who).inventory_item = 0;
                world.jump(who, State::ReturnToCompAgain, StateParams::Empty);
            }
        }
        Action::CALLBACK => match world.resume_tag(who) {
            1 => {
                world.record_mut(who).location = Location::OutsideCompartment;
                world.call_state(who, 2, CommonState::DoWalk, StateParams::walk(Car::GreenSleeping, 540));
            }
            2 => {
                world.start_cyc(who, "306B");
                world.block_view(who, Car::GreenSleeping, 70);
                world.block_view(who, Car::GreenSleeping, 71);
            }
            _ => {}
        },
        _ => {}
    }
}

fn return_to_comp_again(world: &mut World, who: CharacterId, msg: &SavePoint) {
    match msg.action {
        Action::DEFAULT => {
            world.call_state(who, 1, CommonState::DoWalk, StateParams::walk(Car::RedSleeping, 7500))
        }
        Action::CALLBACK => match world.resume_tag(who) {
            1 => world.call_state(
                who,
                2,
                CommonState::DoEnterCorrSeq,
                StateParams::door_sequence("673Db", Compartment::RED_B),
            ),
            2 => {
                world.send(who, CharacterId::VASSILI, VASSILI_NOT_ALONE, MessageParam::None);
                world.jump(who, CommonState::Parked, StateParams::Empty);
            }
            _ => {}
        },
        _ => {}
    }
}
