//! Character state machines.
//!
//! A character's behaviour is a stack of call frames. The top frame's state
//! id selects the handler: ids below `FIRST_CHARACTER_STATE` are the shared
//! helper states in [`common`], the rest belong to the character's cast role.

pub mod cast;
pub mod common;

mod alexei;
mod anna;
mod august;
mod conductor;
mod kronos;
mod tables;
mod tatiana;
mod vassili;

use crate::params::{StateParams, SCRATCH_SLOTS};
use crate::record::CallFrame;
use crate::savepoint::{MessageParam, SavePoint};
use crate::types::{Action, CharacterId};
use crate::world::World;

pub use cast::CastRole;
pub use common::CommonState;

pub const FIRST_CHARACTER_STATE: u8 = 16;

/// Hands `message` to the recipient's current state handler.
pub fn dispatch(world: &mut World, message: &SavePoint) {
    let who = message.recipient;
    let Some(state) = world.record(who).current_state() else {
        return;
    };
    if let Ok(common) = CommonState::try_from(state) {
        common::handle(world, who, common, message);
    } else if let Some(role) = CastRole::of(who) {
        role.handle(world, who, state, message);
    }
}

/// Whether `state` names a handler `who` can run.
pub fn is_known_state(who: CharacterId, state: u8) -> bool {
    CommonState::try_from(state).is_ok()
        || CastRole::of(who).is_some_and(|role| role.state_label(state).is_some())
}

pub fn state_label(who: CharacterId, state: u8) -> &'static str {
    if let Ok(common) = CommonState::try_from(state) {
        return common.label();
    }
    CastRole::of(who)
        .and_then(|role| role.state_label(state))
        .unwrap_or("unknown")
}

impl World {
    /// Suspends the current state under `resume` and enters `state`.
    pub(crate) fn call_state(
        &mut self,
        who: CharacterId,
        resume: u8,
        state: impl Into<u8>,
        params: StateParams,
    ) {
        let state = state.into();
        let record = self.record_mut(who);
        if let Some(top) = record.top_mut() {
            top.resume = resume;
        }
        record.push_call(CallFrame::new(state, params));
        self.log_event(format!("{who}.call {}", state_label(who, state)));
        self.fed_ex(who, who, Action::DEFAULT, MessageParam::None);
    }

    /// Leaves the current state and resumes the caller with `Callback`.
    pub(crate) fn return_from_state(&mut self, who: CharacterId) {
        let record = self.record_mut(who);
        let Some(frame) = record.pop_call() else {
            return;
        };
        let resumes = record.is_active();
        self.log_event(format!("{who}.return {}", state_label(who, frame.state)));
        if resumes {
            self.fed_ex(who, who, Action::CALLBACK, MessageParam::None);
        }
    }

    /// Replaces the current state, starting from fresh params.
    pub(crate) fn jump(&mut self, who: CharacterId, state: impl Into<u8>, params: StateParams) {
        let state = state.into();
        self.record_mut(who)
            .replace_top(CallFrame::new(state, params));
        self.log_event(format!("{who}.jump {}", state_label(who, state)));
        self.fed_ex(who, who, Action::DEFAULT, MessageParam::None);
    }

    /// Drops everything `who` is doing and starts over in `state`.
    pub fn force_jump(&mut self, who: CharacterId, state: impl Into<u8>, params: StateParams) {
        let record = self.record_mut(who);
        record.clear_calls();
        record.inventory_item = 0;
        self.stop_dialog(who);
        self.end_graphics(who);
        self.release_everything(who);
        self.jump(who, state, params);
    }

    pub(crate) fn resume_tag(&self, who: CharacterId) -> u8 {
        self.record(who).top().map_or(0, |frame| frame.resume)
    }

    pub(crate) fn state_params(&self, who: CharacterId) -> &StateParams {
        const EMPTY: &StateParams = &StateParams::Empty;
        self.record(who).top().map_or(EMPTY, |frame| &frame.params)
    }

    pub(crate) fn state_params_mut(&mut self, who: CharacterId) -> &mut StateParams {
        match self.record_mut(who).top_mut() {
            Some(frame) => &mut frame.params,
            None => panic!("{who} has no active state"),
        }
    }

    pub(crate) fn scratch(&mut self, who: CharacterId) -> &mut [i32; SCRATCH_SLOTS] {
        self.state_params_mut(who).scratch_mut()
    }

    /// Runs `who`'s one-shot guard: returns true the first time only.
    pub(crate) fn once(&mut self, who: CharacterId, slot: usize) -> bool {
        let scratch = self.scratch(who);
        if scratch[slot] != 0 {
            return false;
        }
        scratch[slot] = 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Car;

    #[test]
    fn unknown_states_are_rejected_per_character() {
        assert!(is_known_state(CharacterId::ANNA, CommonState::DoWalk as u8));
        assert!(is_known_state(CharacterId::ANNA, FIRST_CHARACTER_STATE));
        assert!(!is_known_state(CharacterId::ANNA, 200));
        assert!(!is_known_state(CharacterId::MAHMUD, FIRST_CHARACTER_STATE));
    }

    #[test]
    fn call_and_return_resume_the_caller() {
        let mut world = World::default();
        world.setup_chapter(1);
        let anna = CharacterId::ANNA;
        let depth = world.record(anna).current_call();

        world.call_state(anna, 7, CommonState::DoWait, StateParams::wait(900));
        assert_eq!(world.record(anna).current_call(), depth + 1);
        assert_eq!(world.record(anna).calls()[depth - 1].resume, 7);

        world.record_mut(anna).pop_call();
        assert_eq!(world.resume_tag(anna), 7);
        assert_eq!(world.record(anna).car, Car::GreenSleeping);
    }

    #[test]
    fn force_jump_clears_presence_and_stack() {
        let mut world = World::default();
        world.setup_chapter(1);
        let tatiana = CharacterId::TATIANA;
        world.block_view(tatiana, Car::Restaurant, 52);
        world.record_mut(tatiana).inventory_item = 3;

        world.force_jump(tatiana, CommonState::Parked, StateParams::Empty);

        let record = world.record(tatiana);
        assert_eq!(record.current_call(), 1);
        assert_eq!(record.current_state(), Some(CommonState::Parked as u8));
        assert_eq!(record.inventory_item, 0);
        assert_eq!(world.occupancy.occupied_views().count(), 0);
    }
}
