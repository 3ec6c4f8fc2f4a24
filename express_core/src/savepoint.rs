//! Message bus between character state machines.
//!
//! `push` queues, `process` drains in FIFO order, and `call` delivers to a
//! single recipient right away. A nested `process` while one is draining
//! returns immediately; the outer drain picks up whatever was queued.

use std::collections::VecDeque;
use std::fmt;

use crate::logic;
use crate::types::{Action, CharacterId};
use crate::world::World;

pub const MAX_AUTO_MESSAGES: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MessageParam {
    #[default]
    None,
    Int(i32),
    Name(String),
}

impl MessageParam {
    pub fn as_int(&self) -> i32 {
        match self {
            MessageParam::Int(value) => *value,
            _ => 0,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            MessageParam::Name(name) => Some(name),
            _ => None,
        }
    }
}

impl From<i32> for MessageParam {
    fn from(value: i32) -> Self {
        MessageParam::Int(value)
    }
}

impl From<&str> for MessageParam {
    fn from(value: &str) -> Self {
        MessageParam::Name(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavePoint {
    pub sender: CharacterId,
    pub recipient: CharacterId,
    pub action: Action,
    pub param: MessageParam,
}

impl SavePoint {
    pub fn new(
        sender: CharacterId,
        recipient: CharacterId,
        action: Action,
        param: MessageParam,
    ) -> Self {
        Self {
            sender,
            recipient,
            action,
            param,
        }
    }
}

impl fmt::Display for SavePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}: {}", self.sender, self.recipient, self.action)?;
        match &self.param {
            MessageParam::None => Ok(()),
            MessageParam::Int(value) => write!(f, " ({value})"),
            MessageParam::Name(name) => write!(f, " ({name})"),
        }
    }
}

/// A message a character waits for passively: matching queued messages are
/// swallowed and raise `latch` on the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoMessage {
    pub receiver: CharacterId,
    pub action: Action,
    pub latch: u8,
}

#[derive(Debug, Clone, Default)]
pub struct SavePointBus {
    queue: VecDeque<SavePoint>,
    auto_messages: Vec<AutoMessage>,
    processing: bool,
    delivered: u64,
}

impl SavePointBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        sender: CharacterId,
        recipient: CharacterId,
        action: Action,
        param: MessageParam,
    ) {
        self.queue
            .push_back(SavePoint::new(sender, recipient, action, param));
    }

    /// Queues `action` for every non-player character except the sender.
    pub fn push_all(&mut self, sender: CharacterId, action: Action, param: MessageParam) {
        for recipient in CharacterId::npcs().filter(|id| *id != sender) {
            self.push(sender, recipient, action, param.clone());
        }
    }

    pub fn pending(&self) -> impl Iterator<Item = &SavePoint> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// Messages dispatched to a handler since the bus was created.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    pub fn add_auto_message(&mut self, receiver: CharacterId, action: Action, latch: u8) -> bool {
        if self.auto_messages.len() >= MAX_AUTO_MESSAGES {
            log::warn!("auto-message table full, dropping {receiver} {action}");
            return false;
        }
        self.auto_messages.push(AutoMessage {
            receiver,
            action,
            latch,
        });
        true
    }

    pub fn auto_messages(&self) -> &[AutoMessage] {
        &self.auto_messages
    }

    fn auto_latch(&self, message: &SavePoint) -> Option<u8> {
        self.auto_messages
            .iter()
            .find(|auto| auto.receiver == message.recipient && auto.action == message.action)
            .map(|auto| auto.latch)
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.auto_messages.clear();
    }

    pub(crate) fn restore(&mut self, queue: Vec<SavePoint>, auto_messages: Vec<AutoMessage>) {
        self.queue = queue.into();
        self.auto_messages = auto_messages;
        self.processing = false;
    }
}

/// Drains the queue. Returns immediately when a drain is already running.
pub fn process(world: &mut World) {
    if world.bus.processing {
        return;
    }
    world.bus.processing = true;
    while let Some(message) = world.bus.queue.pop_front() {
        if let Some(latch) = world.bus.auto_latch(&message) {
            log::trace!("auto-message {message} raises latch {latch}");
            world.record_mut(message.recipient).set_latch(latch, true);
            continue;
        }
        deliver(world, &message);
    }
    world.bus.processing = false;
}

/// Delivers straight to `recipient`, bypassing the queue.
pub fn call(
    world: &mut World,
    sender: CharacterId,
    recipient: CharacterId,
    action: Action,
    param: MessageParam,
) {
    let message = SavePoint::new(sender, recipient, action, param);
    deliver(world, &message);
}

pub(crate) fn deliver(world: &mut World, message: &SavePoint) {
    if !world.record(message.recipient).is_active() {
        log::trace!("dropped {message}: recipient inert");
        return;
    }
    log::trace!("deliver {message}");
    world.bus.delivered += 1;
    logic::dispatch(world, message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_skips_player_and_sender() {
        let mut bus = SavePointBus::new();
        bus.push_all(CharacterId::KRONOS, Action(191070912), MessageParam::None);
        assert_eq!(bus.len(), CharacterId::COUNT - 2);
        assert!(bus
            .pending()
            .all(|message| message.recipient != CharacterId::CATH
                && message.recipient != CharacterId::KRONOS));
    }

    #[test]
    fn auto_message_table_is_bounded() {
        let mut bus = SavePointBus::new();
        for index in 0..MAX_AUTO_MESSAGES {
            assert!(bus.add_auto_message(CharacterId::COND1, Action(index as u32 + 100), 4));
        }
        assert!(!bus.add_auto_message(CharacterId::COND1, Action(1), 4));
        assert_eq!(bus.auto_messages().len(), MAX_AUTO_MESSAGES);
    }

    #[test]
    fn nested_drain_leaves_messages_for_the_outer_one() {
        let mut world = World::default();
        world.setup_chapter(1);
        let table = CharacterId::TABLE_B;
        let before = world.bus.delivered();

        world.send(CharacterId::ALEXEI, table, Action(136455232), MessageParam::None);
        world.bus.processing = true;
        world.send(CharacterId::ALEXEI, table, Action(103798704), "005E".into());
        process(&mut world);
        assert_eq!(world.bus.len(), 2);
        assert_eq!(world.bus.delivered(), before);

        world.bus.processing = false;
        process(&mut world);
        assert!(world.bus.is_empty());
        assert_eq!(world.bus.delivered(), before + 2);
        let vacates = world
            .events()
            .iter()
            .filter(|entry| entry.as_str() == "table_b.vacate 005E")
            .count();
        assert_eq!(vacates, 1);
    }

    #[test]
    fn message_display_includes_param() {
        let message = SavePoint::new(
            CharacterId::ALEXEI,
            CharacterId::TABLE_B,
            Action(136455232),
            MessageParam::from("BOGUS"),
        );
        assert_eq!(message.to_string(), "alexei -> table_b: #136455232 (BOGUS)");
    }
}
