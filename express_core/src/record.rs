//! Per-character persisted state.

use std::rc::Rc;

use crate::logic::cast;
use crate::params::StateParams;
use crate::sequence::{FrameInfo, Sequence};
use crate::types::{Car, CharacterId, Clothes, Direction, Location, Position};

pub const MAX_CALL_DEPTH: usize = 8;
pub const LATCH_COUNT: u8 = 32;

/// One level of the character's state stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    pub state: u8,
    /// Sub-step tag redelivered with `Callback` when the callee returns.
    pub resume: u8,
    pub params: StateParams,
}

impl CallFrame {
    pub fn new(state: u8, params: StateParams) -> Self {
        Self {
            state,
            resume: 0,
            params,
        }
    }
}

/// Chapter starting point of a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Placement {
    pub car: Car,
    pub position: Position,
    pub location: Location,
    pub clothes: Clothes,
}

#[derive(Debug, Clone)]
pub struct EntityRecord {
    pub id: CharacterId,
    pub car: Car,
    pub position: Position,
    pub location: Location,
    pub direction: Direction,
    /// Direction taken once the queued second sequence starts.
    pub direction_switch: Direction,
    pub clothes: Clothes,
    pub inventory_item: u8,
    pub walk_step: Position,
    /// Ticks left before an opposite-walker burst.
    pub walk_wait: u8,
    /// Set while squeezing past a blocked doorway.
    pub squeeze: bool,
    pub attached_conductor: Option<CharacterId>,
    /// View slot entered by the last processed frame.
    pub entered_view: Option<(Car, u8)>,
    pub sequence_name: String,
    pub sequence_name2: String,
    pub current_frame: i16,
    pub frame_ticks: u16,
    /// Ticks spent in the current in-place animation.
    pub progress: i32,
    latches: u32,
    calls: Vec<CallFrame>,

    pub(crate) sequence: Option<Rc<Sequence>>,
    pub(crate) sequence2: Option<Rc<Sequence>>,
    pub(crate) drawn_frame: Option<FrameInfo>,
    pub(crate) do_process_entity: bool,
}

impl EntityRecord {
    pub fn new(id: CharacterId, walk_step: Position) -> Self {
        Self {
            id,
            car: Car::None,
            position: 0,
            location: Location::OutsideCompartment,
            direction: Direction::None,
            direction_switch: Direction::None,
            clothes: Clothes::Default,
            inventory_item: 0,
            walk_step,
            walk_wait: 0,
            squeeze: false,
            attached_conductor: None,
            entered_view: None,
            sequence_name: String::new(),
            sequence_name2: String::new(),
            current_frame: -1,
            frame_ticks: 0,
            progress: 0,
            latches: 0,
            calls: Vec::new(),
            sequence: None,
            sequence2: None,
            drawn_frame: None,
            do_process_entity: false,
        }
    }

    /// Depth of the state stack; zero means the character is inert.
    pub fn current_call(&self) -> usize {
        self.calls.len()
    }

    pub fn is_active(&self) -> bool {
        !self.calls.is_empty()
    }

    pub fn current_state(&self) -> Option<u8> {
        self.calls.last().map(|frame| frame.state)
    }

    pub fn calls(&self) -> &[CallFrame] {
        &self.calls
    }

    pub fn top(&self) -> Option<&CallFrame> {
        self.calls.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut CallFrame> {
        self.calls.last_mut()
    }

    pub fn push_call(&mut self, frame: CallFrame) {
        assert!(
            self.calls.len() < MAX_CALL_DEPTH,
            "{}: call stack overflow entering state {}",
            self.id,
            frame.state
        );
        self.calls.push(frame);
    }

    pub fn pop_call(&mut self) -> Option<CallFrame> {
        self.calls.pop()
    }

    /// Replaces the top frame, or pushes one on an empty stack.
    pub fn replace_top(&mut self, frame: CallFrame) {
        match self.calls.last_mut() {
            Some(top) => *top = frame,
            None => self.calls.push(frame),
        }
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub(crate) fn set_calls(&mut self, calls: Vec<CallFrame>) {
        assert!(calls.len() <= MAX_CALL_DEPTH, "call stack too deep");
        self.calls = calls;
    }

    pub fn latch(&self, index: u8) -> bool {
        assert!(index < LATCH_COUNT, "latch {index} out of range");
        self.latches & (1 << index) != 0
    }

    pub fn set_latch(&mut self, index: u8, value: bool) {
        assert!(index < LATCH_COUNT, "latch {index} out of range");
        if value {
            self.latches |= 1 << index;
        } else {
            self.latches &= !(1 << index);
        }
    }

    pub fn latches(&self) -> u32 {
        self.latches
    }

    pub(crate) fn set_latches(&mut self, latches: u32) {
        self.latches = latches;
    }

    /// Loaded sequence, if the rendering side resolved it.
    pub fn sequence(&self) -> Option<&Sequence> {
        self.sequence.as_deref()
    }

    pub fn drawn_frame(&self) -> Option<&FrameInfo> {
        self.drawn_frame.as_ref()
    }

    /// Drops every animation handle and name.
    pub fn clear_graphics(&mut self) {
        self.sequence = None;
        self.sequence2 = None;
        self.sequence_name.clear();
        self.sequence_name2.clear();
        self.direction = Direction::None;
        self.direction_switch = Direction::None;
        self.current_frame = -1;
        self.frame_ticks = 0;
        self.progress = 0;
        self.drawn_frame = None;
    }

    /// Restores the chapter's starting placement and drops all behaviour.
    pub fn reset_to_chapter_defaults(&mut self, chapter: u8) {
        let placement = cast::chapter_defaults(self.id, chapter);
        self.clear_calls();
        self.clear_graphics();
        self.inventory_item = 0;
        self.latches = 0;
        self.walk_wait = 0;
        self.squeeze = false;
        self.attached_conductor = None;
        self.entered_view = None;
        self.do_process_entity = false;
        self.car = placement.car;
        self.position = placement.position;
        self.location = placement.location;
        self.clothes = placement.clothes;
    }

    /// Persisted-field equality; animation handles are transient.
    pub fn persisted_eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.car == other.car
            && self.position == other.position
            && self.location == other.location
            && self.direction == other.direction
            && self.direction_switch == other.direction_switch
            && self.clothes == other.clothes
            && self.inventory_item == other.inventory_item
            && self.walk_step == other.walk_step
            && self.walk_wait == other.walk_wait
            && self.squeeze == other.squeeze
            && self.attached_conductor == other.attached_conductor
            && self.entered_view == other.entered_view
            && self.sequence_name == other.sequence_name
            && self.sequence_name2 == other.sequence_name2
            && self.current_frame == other.current_frame
            && self.frame_ticks == other.frame_ticks
            && self.progress == other.progress
            && self.latches == other.latches
            && self.calls == other.calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inert_until_a_frame_is_pushed() {
        let mut record = EntityRecord::new(CharacterId::ANNA, 750);
        assert_eq!(record.current_call(), 0);
        assert_eq!(record.current_state(), None);

        record.push_call(CallFrame::new(16, StateParams::Empty));
        record.push_call(CallFrame::new(9, StateParams::walk(Car::RedSleeping, 4070)));
        assert_eq!(record.current_call(), 2);
        assert_eq!(record.current_state(), Some(9));

        record.replace_top(CallFrame::new(3, StateParams::sequence("618Af")));
        assert_eq!(record.current_call(), 2);
        assert_eq!(record.pop_call().map(|frame| frame.state), Some(3));
    }

    #[test]
    #[should_panic(expected = "call stack overflow")]
    fn call_stack_depth_is_bounded() {
        let mut record = EntityRecord::new(CharacterId::AUGUST, 750);
        for state in 0..=MAX_CALL_DEPTH as u8 {
            record.push_call(CallFrame::new(state + 1, StateParams::Empty));
        }
    }

    #[test]
    fn chapter_reset_restores_placement() {
        let mut record = EntityRecord::new(CharacterId::ANNA, 750);
        record.push_call(CallFrame::new(16, StateParams::Empty));
        record.inventory_item = 0x80;
        record.sequence_name = "618Ca".to_string();
        record.set_latch(4, true);

        record.reset_to_chapter_defaults(1);

        assert!(!record.is_active());
        assert_eq!(record.inventory_item, 0);
        assert!(record.sequence_name.is_empty());
        assert!(!record.latch(4));
        assert_eq!(record.car, Car::GreenSleeping);
        assert_eq!(record.position, 8200);
        assert_eq!(record.location, Location::InsideCompartment);
    }
}
