//! Sound and scene collaborators. The core fires these and never waits on
//! them.

use std::{cell::RefCell, rc::Rc};

use serde::Serialize;

use crate::types::{Car, CharacterId};

pub trait SoundHost {
    /// Plays a numbered sound cue on behalf of `who`.
    fn play_event(&self, who: CharacterId, code: u8, delay: u8);
    fn play_dialog(&self, who: CharacterId, name: &str);
    fn stop(&self, who: CharacterId);
    /// Plays `who`'s "excuse me" line addressed to `to`.
    fn excuse_me(&self, who: CharacterId, to: CharacterId);
}

pub trait SceneHost {
    fn load_scene_from_position(&self, car: Car, slot: u8);
}

/// Host that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

impl SoundHost for NullHost {
    fn play_event(&self, _who: CharacterId, _code: u8, _delay: u8) {}
    fn play_dialog(&self, _who: CharacterId, _name: &str) {}
    fn stop(&self, _who: CharacterId) {}
    fn excuse_me(&self, _who: CharacterId, _to: CharacterId) {}
}

impl SceneHost for NullHost {
    fn load_scene_from_position(&self, _car: Car, _slot: u8) {}
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostEvent {
    Sound {
        who: CharacterId,
        code: u8,
        delay: u8,
    },
    Dialog {
        who: CharacterId,
        name: String,
    },
    Stop {
        who: CharacterId,
    },
    ExcuseMe {
        who: CharacterId,
        to: CharacterId,
    },
    Scene {
        car: Car,
        slot: u8,
    },
}

/// Records every host call, shared between the world and its driver.
#[derive(Clone, Default)]
pub struct RecordingHost {
    events: Rc<RefCell<Vec<HostEvent>>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.events.borrow().clone()
    }

    pub fn dialogs(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                HostEvent::Dialog { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    fn record(&self, event: HostEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl SoundHost for RecordingHost {
    fn play_event(&self, who: CharacterId, code: u8, delay: u8) {
        self.record(HostEvent::Sound { who, code, delay });
    }

    fn play_dialog(&self, who: CharacterId, name: &str) {
        self.record(HostEvent::Dialog {
            who,
            name: name.to_string(),
        });
    }

    fn stop(&self, who: CharacterId) {
        self.record(HostEvent::Stop { who });
    }

    fn excuse_me(&self, who: CharacterId, to: CharacterId) {
        self.record(HostEvent::ExcuseMe { who, to });
    }
}

impl SceneHost for RecordingHost {
    fn load_scene_from_position(&self, car: Car, slot: u8) {
        self.record(HostEvent::Scene { car, slot });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_host_tracks_calls_in_order() {
        let host = RecordingHost::new();
        let shared: Rc<dyn SoundHost> = Rc::new(host.clone());
        shared.play_event(CharacterId::ANNA, 36, 30);
        shared.play_dialog(CharacterId::CATH, "CAT1127A");
        host.load_scene_from_position(Car::GreenSleeping, 1);

        let events = host.events();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            HostEvent::Sound {
                who: CharacterId::ANNA,
                code: 36,
                delay: 30
            }
        );
        assert_eq!(host.dialogs(), vec!["CAT1127A".to_string()]);

        let json = serde_json::to_value(&events[2]).expect("serialize event");
        assert_eq!(json["kind"], "scene");
        assert_eq!(json["car"], 3);
    }
}
