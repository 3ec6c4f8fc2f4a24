//! The outer game loop, one tick at a time.

use serde::Serialize;

use crate::savepoint::MessageParam;
use crate::types::{Action, CharacterId};
use crate::world::World;

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub tick: u32,
    pub game_time: u32,
    pub fired_timers: Vec<u16>,
    /// Messages handed to a state handler during the tick.
    pub delivered: u64,
    pub events: Vec<String>,
}

impl World {
    /// Runs one tick: clocks, timers, dialogs, the per-tick `None` message
    /// to every active character, then animation processing.
    ///
    /// The bus is drained after the `None` round, after every frame action
    /// or sequence end inside the sweep, after each scene reload, and once
    /// more when the sweep is done.
    pub fn tick(&mut self) -> TickReport {
        let events_before = self.events().len();
        let delivered_before = self.bus.delivered();

        self.clock.game_time += self.config().time_step;
        self.clock.ticks += 1;

        let fired = self.timers.fire_due(self.clock.ticks);
        for id in &fired {
            self.log_event(format!("timer {id} fired"));
        }

        self.tick_dialogs();

        let active: Vec<CharacterId> = self.active_characters().collect();
        for who in active {
            self.fed_ex(CharacterId::CATH, who, Action::NONE, MessageParam::None);
        }
        self.process();

        self.update_sequences();
        self.update_callbacks();
        self.process();

        TickReport {
            tick: self.clock.ticks,
            game_time: self.clock.game_time,
            fired_timers: fired,
            delivered: self.bus.delivered() - delivered_before,
            events: self.events()[events_before..].to_vec(),
        }
    }

    /// Skips `ticks` ticks without running any script: walkers keep moving
    /// and animations keep counting, timers wait for the next real tick.
    pub fn fast_forward(&mut self, ticks: u32) {
        for _ in 0..ticks {
            self.clock.game_time += self.config().time_step;
            self.clock.ticks += 1;
            self.update_fields();
        }
        self.log_event(format!(
            "fast_forward {ticks} game_time={}",
            self.clock.game_time
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::CommonState;
    use crate::params::StateParams;
    use crate::types::{Car, Direction};

    #[test]
    fn tick_advances_clocks_and_fires_due_timers() {
        let mut world = World::default();
        world.setup_chapter(1);
        world.timers.add(2, 40);
        let start = world.clock.game_time;

        let first = world.tick();
        assert_eq!(first.tick, 1);
        assert_eq!(first.game_time, start + 5);
        assert!(first.fired_timers.is_empty());
        assert!(first.delivered >= world.active_characters().count() as u64);

        let second = world.tick();
        assert_eq!(second.fired_timers, vec![40]);
        assert!(second.events.iter().any(|entry| entry == "timer 40 fired"));
        assert!(world.timers.is_empty());
    }

    #[test]
    fn walking_script_reaches_its_target_through_ticks() {
        let mut world = World::default();
        world.setup_chapter(1);
        let august = CharacterId::AUGUST;
        world.force_jump(august, CommonState::Parked, StateParams::Empty);
        let record = world.record_mut(august);
        record.car = Car::GreenSleeping;
        record.position = 6470;
        world.call_state(august, 1, CommonState::DoWalk, StateParams::walk(Car::GreenSleeping, 8200));

        for _ in 0..3 {
            world.tick();
        }
        let record = world.record(august);
        assert_eq!(record.current_call(), 1);
        assert_eq!(record.position, 8200);
        assert_eq!(record.direction, Direction::None);
    }

    #[test]
    fn fast_forward_skips_scripts() {
        let mut world = World::default();
        world.setup_chapter(1);
        let before = world.bus.delivered();
        world.fast_forward(10);
        assert_eq!(world.clock.ticks, 10);
        assert_eq!(world.bus.delivered(), before);
    }
}
