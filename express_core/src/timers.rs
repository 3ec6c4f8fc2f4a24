/// A pending timer: `subroutine` fires once `deadline` (in real ticks) is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeEvent {
    pub deadline: u32,
    pub subroutine: u16,
}

/// Unsorted timer list; entries keep their insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerList {
    events: Vec<TimeEvent>,
}

impl TimerList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, deadline: u32, subroutine: u16) {
        log::debug!("timer {subroutine} armed for tick {deadline}");
        self.events.push(TimeEvent {
            deadline,
            subroutine,
        });
    }

    pub fn kill_all(&mut self) {
        self.events.clear();
    }

    pub fn contains(&self, subroutine: u16) -> bool {
        self.events.iter().any(|event| event.subroutine == subroutine)
    }

    /// Removes and returns every due subroutine id, in insertion order.
    pub fn fire_due(&mut self, now: u32) -> Vec<u16> {
        let mut fired = Vec::new();
        self.events.retain(|event| {
            if event.deadline <= now {
                fired.push(event.subroutine);
                false
            } else {
                true
            }
        });
        fired
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
