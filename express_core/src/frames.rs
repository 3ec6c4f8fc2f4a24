//! Animation bookkeeping for characters: which sequence runs, which frame
//! is shown, and the messages frames hand back to the state machines.
//!
//! Only frame metadata is consulted. A character whose sequence cannot be
//! resolved still finishes in-place animations once its progress counter
//! passes `sequence_fallback_progress`, so scripts keep moving headless.

use std::rc::Rc;

use crate::savepoint::MessageParam;
use crate::sequence::{frame_flags, FrameInfo, Sequence};
use crate::types::{Action, CharacterId, Direction};
use crate::world::{SweepFlags, World};

/// Upper bound on re-processing passes within one callback sweep.
const MAX_SWEEP_PASSES: usize = 4 * CharacterId::COUNT;

impl World {
    /// Plays `name` once in place. `ExitCompartment` is delivered when it ends.
    pub fn start_seq(&mut self, who: CharacterId, name: &str) {
        self.begin_sequence(who, name, Direction::Right);
    }

    /// Loops `name` in place until something else replaces it.
    pub fn start_cyc(&mut self, who: CharacterId, name: &str) {
        self.begin_sequence(who, name, Direction::Left);
    }

    /// Cycles `name` once the running in-place animation has ended.
    pub fn queue_cyc(&mut self, who: CharacterId, name: &str) {
        let sequence = self.load_sequence(name);
        let record = self.record_mut(who);
        record.sequence_name2 = name.to_string();
        record.sequence2 = sequence;
        record.direction_switch = Direction::Left;
    }

    /// Stops drawing `who` and forgets every animation.
    pub fn end_graphics(&mut self, who: CharacterId) {
        self.release_entered_view(who);
        let record = self.record_mut(who);
        record.clear_graphics();
        record.do_process_entity = true;
    }

    pub(crate) fn begin_sequence(&mut self, who: CharacterId, name: &str, direction: Direction) {
        let sequence = self.load_sequence(name);
        let record = self.record_mut(who);
        record.sequence_name = name.to_string();
        record.sequence = sequence;
        record.sequence_name2.clear();
        record.sequence2 = None;
        record.direction = direction;
        record.direction_switch = Direction::None;
        record.current_frame = -1;
        record.frame_ticks = 0;
        record.progress = 0;
        record.do_process_entity = true;
        self.log_event(format!("{who}.seq {name} {}", direction.label()));
    }

    fn load_sequence(&self, name: &str) -> Option<Rc<Sequence>> {
        let sequence = self.sequences().load(name);
        if sequence.is_none() {
            log::warn!("sequence {name} unavailable");
        }
        sequence
    }

    /// Raised when the running sweep was re-entered, or a handler restarted
    /// `who`'s animation while one of its frames was being processed.
    fn interrupted(&self, who: CharacterId) -> bool {
        self.sweep.aborted || self.record(who).do_process_entity
    }

    fn release_entered_view(&mut self, who: CharacterId) {
        if let Some((car, slot)) = self.record_mut(who).entered_view.take() {
            self.release_view(who, car, slot);
        }
    }

    /// Frame the current frame index would show for `who`.
    pub fn compute_current_frame(&self, who: CharacterId) -> Option<FrameInfo> {
        let record = self.record(who);
        record
            .sequence()
            .and_then(|sequence| sequence.frame(record.current_frame))
            .copied()
    }

    /// Index of the frame nearest the record's position, used when a walking
    /// sequence is picked up mid-corridor. `-1` when nothing matches.
    pub fn initial_frame(&self, who: CharacterId) -> i16 {
        let record = self.record(who);
        record
            .sequence()
            .and_then(|sequence| sequence.nearest_frame(0, record.position, 250, true))
            .unwrap_or(-1)
    }

    /// Shows the current frame: moves the character, raises frame flags,
    /// blocks the frame's view slot and queues its sound. Flag actions go
    /// through the bus, which is drained right after each one.
    pub(crate) fn process_frame(&mut self, who: CharacterId) {
        let Some(frame) = self.compute_current_frame(who) else {
            return;
        };
        let walking = self.record(who).direction.is_walking();
        if frame.entity_position != 0 && !walking {
            self.record_mut(who).position = frame.entity_position;
        }

        if frame.has_flag(frame_flags::EXCUSE_ME_CATH) {
            self.send(CharacterId::CATH, who, Action::EXCUSE_ME_CATH, MessageParam::None);
        }
        if frame.has_flag(frame_flags::ACTION10) {
            self.send(CharacterId::CATH, who, Action::ACTION10, MessageParam::None);
            self.process();
            if self.interrupted(who) {
                return;
            }
        }
        if frame.has_flag(frame_flags::ACTION4) {
            self.send(CharacterId::CATH, who, Action::ACTION4, MessageParam::None);
            self.process();
            if self.interrupted(who) {
                return;
            }
        }

        self.release_entered_view(who);
        if frame.view_slot != 0 {
            let car = self.record(who).car;
            self.record_mut(who).entered_view = Some((car, frame.view_slot));
            self.block_view(who, car, frame.view_slot);
            if self.interrupted(who) {
                return;
            }
        }

        if frame.sound_action != 0 {
            self.sound().play_event(who, frame.sound_action, frame.sound_delay);
        }

        let record = self.record_mut(who);
        record.drawn_frame = Some(frame);
        record.frame_ticks = 0;
    }

    /// Advances `who`'s animation by one tick.
    pub fn process_entity(&mut self, who: CharacterId) {
        self.record_mut(who).do_process_entity = false;

        let record = self.record(who);
        let direction = record.direction;
        let drawn = record.car == self.record(CharacterId::CATH).car
            || matches!(direction, Direction::Right | Direction::Switch);
        if !drawn {
            self.release_entered_view(who);
            let record = self.record_mut(who);
            record.drawn_frame = None;
            if direction == Direction::Right {
                record.progress += 1;
            }
            self.check_fallback_end(who);
            return;
        }

        match direction {
            Direction::None => self.release_entered_view(who),
            Direction::Right | Direction::Switch => {
                self.record_mut(who).progress += 1;
                if self.record(who).sequence.is_none() {
                    self.check_fallback_end(who);
                } else {
                    self.advance_frame(who, false);
                }
            }
            Direction::Left | Direction::Up | Direction::Down => {
                if self.record(who).sequence.is_some() {
                    self.advance_frame(who, true);
                }
            }
        }
    }

    fn check_fallback_end(&mut self, who: CharacterId) {
        let record = self.record(who);
        if record.direction == Direction::Right
            && record.sequence.is_none()
            && record.progress > self.config().sequence_fallback_progress
        {
            self.finish_sequence(who);
        }
    }

    fn advance_frame(&mut self, who: CharacterId, looping: bool) {
        let record = self.record(who);
        let Some(sequence) = record.sequence.clone() else {
            return;
        };
        if record.current_frame == -1 {
            let start = if record.direction.is_walking() {
                self.initial_frame(who).max(0)
            } else {
                0
            };
            self.record_mut(who).current_frame = start;
            self.process_frame(who);
            return;
        }

        let duration = record
            .drawn_frame
            .map_or(1, |frame| u16::from(frame.duration.max(1)));
        let record = self.record_mut(who);
        record.frame_ticks += 1;
        if record.frame_ticks < duration {
            return;
        }

        record.current_frame += 1;
        if record.current_frame > sequence.last_index() {
            if looping {
                record.current_frame = 0;
            } else {
                self.finish_sequence(who);
                return;
            }
        }
        self.process_frame(who);
    }

    /// The in-place animation ran out: tell the character, then either
    /// switch to the queued sequence or stop drawing.
    fn finish_sequence(&mut self, who: CharacterId) {
        if self.record(who).direction == Direction::Right {
            self.send(CharacterId::CATH, who, Action::EXIT_COMPARTMENT, MessageParam::None);
            self.process();
            if self.interrupted(who) {
                return;
            }
        }
        if self.record(who).sequence_name2.is_empty() {
            self.drop_sequence(who);
        } else {
            self.next_sequence(who);
        }
    }

    fn next_sequence(&mut self, who: CharacterId) {
        let record = self.record_mut(who);
        record.sequence_name = std::mem::take(&mut record.sequence_name2);
        record.sequence = record.sequence2.take();
        if record.direction_switch != Direction::None {
            record.direction = record.direction_switch;
            record.direction_switch = Direction::None;
        }
        record.current_frame = -1;
        record.frame_ticks = 0;
        record.progress = 0;
        record.do_process_entity = true;
    }

    fn drop_sequence(&mut self, who: CharacterId) {
        self.release_entered_view(who);
        let record = self.record_mut(who);
        record.sequence = None;
        record.sequence_name.clear();
        record.drawn_frame = None;
        record.current_frame = -1;
        record.direction = std::mem::take(&mut record.direction_switch);
    }

    /// Resolves sequence handles that are named but not loaded, such as
    /// after a restore. The first pass promotes orphaned second sequences.
    pub fn update_sequences(&mut self) {
        let pending: Vec<CharacterId> = self
            .active_characters()
            .filter(|who| {
                let record = self.record(*who);
                record.sequence_name.is_empty() && !record.sequence_name2.is_empty()
            })
            .collect();
        for who in pending {
            self.next_sequence(who);
        }

        let library = self.sequences();
        for who in CharacterId::npcs() {
            let record = self.record(who);
            let first = (record.sequence.is_none() && !record.sequence_name.is_empty())
                .then(|| library.load(&record.sequence_name));
            let second = (record.sequence2.is_none() && !record.sequence_name2.is_empty())
                .then(|| library.load(&record.sequence_name2));
            let record = self.record_mut(who);
            if let Some(sequence) = first {
                record.sequence = sequence;
            }
            if let Some(sequence) = second {
                record.sequence2 = sequence;
            }
        }
    }

    /// Processes every active character once, then keeps re-processing the
    /// ones whose animation was restarted until none are left. A nested call
    /// aborts the running sweep.
    pub fn update_callbacks(&mut self) {
        if self.sweep.running {
            self.sweep.aborted = true;
            return;
        }
        self.sweep = SweepFlags {
            aborted: false,
            running: true,
        };

        for who in CharacterId::npcs() {
            if self.sweep.aborted {
                break;
            }
            if self.record(who).is_active() {
                self.process_entity(who);
            }
        }

        let mut passes = 0;
        while !self.sweep.aborted {
            let restarted: Vec<CharacterId> = self
                .active_characters()
                .filter(|who| self.record(*who).do_process_entity)
                .collect();
            if restarted.is_empty() {
                break;
            }
            passes += 1;
            if passes > MAX_SWEEP_PASSES {
                log::warn!("callback sweep still busy after {MAX_SWEEP_PASSES} passes");
                break;
            }
            for who in restarted {
                if self.sweep.aborted {
                    break;
                }
                if self.record(who).do_process_entity {
                    self.process_entity(who);
                }
            }
        }

        self.sweep.running = false;
    }
}
