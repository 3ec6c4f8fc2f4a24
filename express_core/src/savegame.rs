//! Save images.
//!
//! Layout, every multi-byte field big-endian:
//!
//! ```text
//! magic "LXSV" | version u16
//! entry header: kind u8, character u8, value u32, chapter u8, game_time u32
//! viewpoint: car u8, slot u8, facing u8
//! character count u16 (40), then one record per character in id order
//! positions 1000 x u32 | compartments 16 x u32 | soft compartments 16 x u32
//! timers: count u16, then (ticks-from-now u32, subroutine u16)
//! auto-messages: count u16, then (receiver u8, action u32, latch u8)
//! pending messages: count u32, then (sender u8, recipient u8, action u32, param)
//! ```
//!
//! Reading validates every enum, id and state against what this build can
//! run; a bad image never touches the world it was meant for.

use std::convert::TryFrom;
use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use thiserror::Error;

use crate::logic;
use crate::occupancy::{OccupancyMap, POSITION_SLOTS};
use crate::params::{StateParams, SCRATCH_SLOTS};
use crate::record::{CallFrame, EntityRecord, LATCH_COUNT, MAX_CALL_DEPTH};
use crate::savepoint::{AutoMessage, MessageParam, SavePoint, MAX_AUTO_MESSAGES};
use crate::types::{Action, Car, CharacterId, Compartment, Location, MAX_VIEW_SLOT};
use crate::world::{SaveRequest, Viewpoint, World};

pub const SAVE_MAGIC: [u8; 4] = *b"LXSV";
pub const SAVE_VERSION: u16 = 1;

const MAX_NAME_LEN: usize = 255;
const NO_CHARACTER: u8 = 0xFF;
/// Time and event saves this close to a tick-interval save replace it.
const REPLACE_WINDOW: u32 = 450;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum SaveKind {
    Index = 0,
    Time = 1,
    Event = 2,
    Event2 = 3,
    Auto = 4,
    TickInterval = 5,
}

impl TryFrom<u8> for SaveKind {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SaveKind::Index),
            1 => Ok(SaveKind::Time),
            2 => Ok(SaveKind::Event),
            3 => Ok(SaveKind::Event2),
            4 => Ok(SaveKind::Auto),
            5 => Ok(SaveKind::TickInterval),
            other => Err(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("save image I/O failed: {0}")]
    Io(#[source] io::Error),
    #[error("save image is truncated")]
    Truncated,
    #[error("save image magic mismatch")]
    BadMagic,
    #[error("save format version {0} is not supported")]
    UnsupportedVersion(u16),
    #[error("save image holds {found} characters, expected {expected}")]
    CountMismatch { expected: usize, found: usize },
    #[error("corrupt save image: {field} = {value}")]
    Corrupt { field: &'static str, value: u64 },
}

impl From<io::Error> for SaveError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            SaveError::Truncated
        } else {
            SaveError::Io(err)
        }
    }
}

fn corrupt(field: &'static str, value: impl Into<u64>) -> SaveError {
    SaveError::Corrupt {
        field,
        value: value.into(),
    }
}

/// Why and when an image was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SaveHeader {
    pub kind: SaveKind,
    pub character: CharacterId,
    pub value: u32,
    pub chapter: u8,
    pub game_time: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedTimer {
    /// Ticks left until the deadline when the image was taken.
    pub delta: u32,
    pub subroutine: u16,
}

/// A decoded save image, ready to be restored.
#[derive(Debug, Clone)]
pub struct SaveImage {
    pub header: SaveHeader,
    pub viewpoint: Viewpoint,
    pub records: Vec<EntityRecord>,
    pub occupancy: OccupancyMap,
    pub timers: Vec<SavedTimer>,
    pub auto_messages: Vec<AutoMessage>,
    pub pending: Vec<SavePoint>,
}

impl World {
    pub fn header_for(&self, kind: SaveKind, character: CharacterId, value: u32) -> SaveHeader {
        SaveHeader {
            kind,
            character,
            value,
            chapter: self.clock.chapter,
            game_time: self.clock.game_time,
        }
    }

    pub fn header_for_request(&self, request: &SaveRequest) -> SaveHeader {
        SaveHeader {
            game_time: request.game_time,
            ..self.header_for(request.kind, request.who, request.event)
        }
    }

    pub fn capture(&self, header: SaveHeader) -> SaveImage {
        let now = self.clock.ticks;
        SaveImage {
            header,
            viewpoint: self.viewpoint(),
            records: self.records().to_vec(),
            occupancy: self.occupancy.clone(),
            timers: self
                .timers
                .iter()
                .map(|event| SavedTimer {
                    delta: event.deadline.saturating_sub(now),
                    subroutine: event.subroutine,
                })
                .collect(),
            auto_messages: self.bus.auto_messages().to_vec(),
            pending: self.bus.pending().cloned().collect(),
        }
    }

    /// Replaces the whole simulation state with `image`. Timers are rebased
    /// on the current tick counter.
    pub fn restore(&mut self, image: &SaveImage) {
        let Viewpoint { car, slot, facing } = image.viewpoint;
        self.set_viewpoint(car, slot, facing);
        for record in &image.records {
            *self.record_mut(record.id) = record.clone();
        }
        self.occupancy = image.occupancy.clone();
        self.clock.chapter = image.header.chapter;
        self.clock.game_time = image.header.game_time;

        let now = self.clock.ticks;
        self.timers.kill_all();
        for timer in &image.timers {
            self.timers.add(now.saturating_add(timer.delta), timer.subroutine);
        }
        self.bus
            .restore(image.pending.clone(), image.auto_messages.clone());
        self.dialogs.clear();
        self.sweep = Default::default();
        self.update_sequences();
        self.log_event(format!(
            "restored chapter {} game_time={}",
            image.header.chapter, image.header.game_time
        ));
    }

    pub fn save_to<W: Write>(&self, header: SaveHeader, writer: W) -> Result<(), SaveError> {
        self.capture(header).write_to(writer)
    }

    /// Decodes an image and restores it; the world is untouched on error.
    pub fn load_from<R: Read>(&mut self, reader: R) -> Result<SaveHeader, SaveError> {
        let image = SaveImage::read_from(reader)?;
        self.restore(&image);
        Ok(image.header)
    }
}

impl SaveImage {
    pub fn to_bytes(&self) -> Result<Vec<u8>, SaveError> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }

    pub fn write_to<W: Write>(&self, mut w: W) -> Result<(), SaveError> {
        w.write_all(&SAVE_MAGIC)?;
        w.write_u16::<BigEndian>(SAVE_VERSION)?;
        let header = &self.header;
        w.write_u8(header.kind as u8)?;
        w.write_u8(header.character.raw())?;
        w.write_u32::<BigEndian>(header.value)?;
        w.write_u8(header.chapter)?;
        w.write_u32::<BigEndian>(header.game_time)?;

        w.write_u8(self.viewpoint.car as u8)?;
        w.write_u8(self.viewpoint.slot)?;
        w.write_u8(self.viewpoint.facing as u8)?;

        w.write_u16::<BigEndian>(self.records.len() as u16)?;
        for record in &self.records {
            write_record(&mut w, record)?;
        }

        for word in self.occupancy.positions() {
            w.write_u32::<BigEndian>(*word)?;
        }
        for word in self
            .occupancy
            .compartments()
            .iter()
            .chain(self.occupancy.soft_compartments())
        {
            w.write_u32::<BigEndian>(*word)?;
        }

        w.write_u16::<BigEndian>(self.timers.len() as u16)?;
        for timer in &self.timers {
            w.write_u32::<BigEndian>(timer.delta)?;
            w.write_u16::<BigEndian>(timer.subroutine)?;
        }

        w.write_u16::<BigEndian>(self.auto_messages.len() as u16)?;
        for auto in &self.auto_messages {
            w.write_u8(auto.receiver.raw())?;
            w.write_u32::<BigEndian>(auto.action.0)?;
            w.write_u8(auto.latch)?;
        }

        w.write_u32::<BigEndian>(self.pending.len() as u32)?;
        for message in &self.pending {
            w.write_u8(message.sender.raw())?;
            w.write_u8(message.recipient.raw())?;
            w.write_u32::<BigEndian>(message.action.0)?;
            write_message_param(&mut w, &message.param)?;
        }
        Ok(())
    }

    pub fn read_from<R: Read>(reader: R) -> Result<Self, SaveError> {
        let mut r = ImageReader { inner: reader };

        let mut magic = [0u8; 4];
        r.inner.read_exact(&mut magic)?;
        if magic != SAVE_MAGIC {
            return Err(SaveError::BadMagic);
        }
        let version = r.u16()?;
        if version != SAVE_VERSION {
            return Err(SaveError::UnsupportedVersion(version));
        }

        let kind = r.enumerated::<SaveKind>("save kind")?;
        let character = r.character("header character")?;
        let value = r.u32()?;
        let chapter = r.u8()?;
        if !(1..=5).contains(&chapter) {
            return Err(corrupt("chapter", chapter));
        }
        let game_time = r.u32()?;
        let header = SaveHeader {
            kind,
            character,
            value,
            chapter,
            game_time,
        };

        let viewpoint = Viewpoint {
            car: r.enumerated("viewpoint car")?,
            slot: r.view_slot()?,
            facing: r.enumerated("viewpoint facing")?,
        };

        let count = r.u16()? as usize;
        if count != CharacterId::COUNT {
            return Err(SaveError::CountMismatch {
                expected: CharacterId::COUNT,
                found: count,
            });
        }
        let records = CharacterId::all()
            .map(|id| read_record(&mut r, id))
            .collect::<Result<Vec<_>, _>>()?;

        let positions = (0..POSITION_SLOTS)
            .map(|_| r.u32())
            .collect::<Result<Vec<_>, _>>()?;
        let mut compartments = [0u32; Compartment::COUNT];
        for word in &mut compartments {
            *word = r.u32()?;
        }
        let mut soft_compartments = [0u32; Compartment::COUNT];
        for word in &mut soft_compartments {
            *word = r.u32()?;
        }
        let occupancy = OccupancyMap::from_raw(positions, compartments, soft_compartments)
            .ok_or_else(|| corrupt("positions", POSITION_SLOTS as u64))?;

        let timer_count = r.u16()?;
        let timers = (0..timer_count)
            .map(|_| {
                Ok(SavedTimer {
                    delta: r.u32()?,
                    subroutine: r.u16()?,
                })
            })
            .collect::<Result<Vec<_>, SaveError>>()?;

        let auto_count = r.u16()? as usize;
        if auto_count > MAX_AUTO_MESSAGES {
            return Err(corrupt("auto-message count", auto_count as u64));
        }
        let mut auto_messages = Vec::with_capacity(auto_count);
        for _ in 0..auto_count {
            let receiver = r.character("auto-message receiver")?;
            let action = Action(r.u32()?);
            let latch = r.u8()?;
            if latch >= LATCH_COUNT {
                return Err(corrupt("latch", latch));
            }
            auto_messages.push(AutoMessage {
                receiver,
                action,
                latch,
            });
        }

        let pending_count = r.u32()?;
        let mut pending = Vec::new();
        for _ in 0..pending_count {
            let sender = r.character("message sender")?;
            let recipient = r.character("message recipient")?;
            let action = Action(r.u32()?);
            let param = r.message_param()?;
            pending.push(SavePoint::new(sender, recipient, action, param));
        }

        Ok(SaveImage {
            header,
            viewpoint,
            records,
            occupancy,
            timers,
            auto_messages,
            pending,
        })
    }
}

fn write_name<W: Write>(w: &mut W, name: &str) -> Result<(), SaveError> {
    if name.len() > MAX_NAME_LEN {
        return Err(corrupt("name length", name.len() as u64));
    }
    w.write_u16::<BigEndian>(name.len() as u16)?;
    w.write_all(name.as_bytes())?;
    Ok(())
}

fn write_record<W: Write>(w: &mut W, record: &EntityRecord) -> Result<(), SaveError> {
    w.write_u8(record.id.raw())?;
    w.write_u8(record.car as u8)?;
    w.write_i32::<BigEndian>(record.position)?;
    w.write_u8(record.location as u8)?;
    w.write_u8(record.direction as u8)?;
    w.write_u8(record.direction_switch as u8)?;
    w.write_u8(record.clothes as u8)?;
    w.write_u8(record.inventory_item)?;
    w.write_i32::<BigEndian>(record.walk_step)?;
    w.write_u8(record.walk_wait)?;
    w.write_u8(record.squeeze as u8)?;
    w.write_u8(record.attached_conductor.map_or(NO_CHARACTER, CharacterId::raw))?;
    match record.entered_view {
        Some((car, slot)) => {
            w.write_u8(1)?;
            w.write_u8(car as u8)?;
            w.write_u8(slot)?;
        }
        None => w.write_u8(0)?,
    }
    write_name(w, &record.sequence_name)?;
    write_name(w, &record.sequence_name2)?;
    w.write_i16::<BigEndian>(record.current_frame)?;
    w.write_u16::<BigEndian>(record.frame_ticks)?;
    w.write_i32::<BigEndian>(record.progress)?;
    w.write_u32::<BigEndian>(record.latches())?;

    w.write_u8(record.calls().len() as u8)?;
    for frame in record.calls() {
        w.write_u8(frame.state)?;
        w.write_u8(frame.resume)?;
        write_params(w, &frame.params)?;
    }
    Ok(())
}

fn write_params<W: Write>(w: &mut W, params: &StateParams) -> Result<(), SaveError> {
    w.write_u8(params.tag())?;
    match params {
        StateParams::Empty => {}
        StateParams::Walk { car, position } => {
            w.write_u8(*car as u8)?;
            w.write_i32::<BigEndian>(*position)?;
        }
        StateParams::Sequence { name } | StateParams::Dialog { name } => write_name(w, name)?,
        StateParams::BlockSequence { name, car, slot } => {
            write_name(w, name)?;
            w.write_u8(*car as u8)?;
            w.write_u8(*slot)?;
        }
        StateParams::DoorSequence { name, compartment } => {
            write_name(w, name)?;
            w.write_u8(compartment.index() as u8)?;
        }
        StateParams::JoinedSequence {
            name,
            recipient,
            action,
            note,
            sent,
        } => {
            write_name(w, name)?;
            w.write_u8(recipient.raw())?;
            w.write_u32::<BigEndian>(action.0)?;
            write_name(w, note)?;
            w.write_u8(*sent as u8)?;
        }
        StateParams::Wait { duration, deadline } => {
            w.write_u32::<BigEndian>(*duration)?;
            w.write_u32::<BigEndian>(*deadline)?;
        }
        StateParams::SaveGame { kind, event } => {
            w.write_u8(*kind as u8)?;
            w.write_u32::<BigEndian>(*event)?;
        }
        StateParams::CompartmentWait { until, name } => {
            w.write_u32::<BigEndian>(*until)?;
            write_name(w, name)?;
        }
        StateParams::Scratch(slots) => {
            for value in slots {
                w.write_i32::<BigEndian>(*value)?;
            }
        }
    }
    Ok(())
}

fn write_message_param<W: Write>(w: &mut W, param: &MessageParam) -> Result<(), SaveError> {
    match param {
        MessageParam::None => w.write_u8(0)?,
        MessageParam::Int(value) => {
            w.write_u8(1)?;
            w.write_i32::<BigEndian>(*value)?;
        }
        MessageParam::Name(name) => {
            w.write_u8(2)?;
            write_name(w, name)?;
        }
    }
    Ok(())
}

struct ImageReader<R> {
    inner: R,
}

impl<R: Read> ImageReader<R> {
    fn u8(&mut self) -> Result<u8, SaveError> {
        Ok(self.inner.read_u8()?)
    }

    fn u16(&mut self) -> Result<u16, SaveError> {
        Ok(self.inner.read_u16::<BigEndian>()?)
    }

    fn u32(&mut self) -> Result<u32, SaveError> {
        Ok(self.inner.read_u32::<BigEndian>()?)
    }

    fn i16(&mut self) -> Result<i16, SaveError> {
        Ok(self.inner.read_i16::<BigEndian>()?)
    }

    fn i32(&mut self) -> Result<i32, SaveError> {
        Ok(self.inner.read_i32::<BigEndian>()?)
    }

    fn flag(&mut self, field: &'static str) -> Result<bool, SaveError> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(corrupt(field, other)),
        }
    }

    fn enumerated<T: TryFrom<u8>>(&mut self, field: &'static str) -> Result<T, SaveError> {
        let raw = self.u8()?;
        T::try_from(raw).map_err(|_| corrupt(field, raw))
    }

    fn character(&mut self, field: &'static str) -> Result<CharacterId, SaveError> {
        let raw = self.u8()?;
        CharacterId::new(raw).ok_or_else(|| corrupt(field, raw))
    }

    fn view_slot(&mut self) -> Result<u8, SaveError> {
        let slot = self.u8()?;
        if slot > MAX_VIEW_SLOT {
            return Err(corrupt("view slot", slot));
        }
        Ok(slot)
    }

    fn compartment(&mut self) -> Result<Compartment, SaveError> {
        let raw = self.u8()?;
        Compartment::new(raw).ok_or_else(|| corrupt("compartment", raw))
    }

    fn name(&mut self) -> Result<String, SaveError> {
        let len = self.u16()? as usize;
        if len > MAX_NAME_LEN {
            return Err(corrupt("name length", len as u64));
        }
        let mut bytes = vec![0u8; len];
        self.inner.read_exact(&mut bytes)?;
        String::from_utf8(bytes).map_err(|_| corrupt("name encoding", len as u64))
    }

    fn message_param(&mut self) -> Result<MessageParam, SaveError> {
        match self.u8()? {
            0 => Ok(MessageParam::None),
            1 => Ok(MessageParam::Int(self.i32()?)),
            2 => Ok(MessageParam::Name(self.name()?)),
            other => Err(corrupt("message param", other)),
        }
    }

    fn params(&mut self) -> Result<StateParams, SaveError> {
        let params = match self.u8()? {
            0 => StateParams::Empty,
            1 => StateParams::Walk {
                car: self.enumerated("walk car")?,
                position: self.i32()?,
            },
            2 => StateParams::Sequence { name: self.name()? },
            3 => StateParams::BlockSequence {
                name: self.name()?,
                car: self.enumerated("block car")?,
                slot: self.view_slot()?,
            },
            4 => StateParams::DoorSequence {
                name: self.name()?,
                compartment: self.compartment()?,
            },
            5 => StateParams::Dialog { name: self.name()? },
            6 => StateParams::Wait {
                duration: self.u32()?,
                deadline: self.u32()?,
            },
            7 => StateParams::SaveGame {
                kind: self.enumerated("save kind")?,
                event: self.u32()?,
            },
            8 => {
                let mut slots = [0i32; SCRATCH_SLOTS];
                for slot in &mut slots {
                    *slot = self.i32()?;
                }
                StateParams::Scratch(slots)
            }
            9 => StateParams::JoinedSequence {
                name: self.name()?,
                recipient: self.character("joined recipient")?,
                action: Action(self.u32()?),
                note: self.name()?,
                sent: self.flag("joined sent")?,
            },
            10 => StateParams::CompartmentWait {
                until: self.u32()?,
                name: self.name()?,
            },
            other => return Err(corrupt("params tag", other)),
        };
        Ok(params)
    }
}

fn read_record<R: Read>(r: &mut ImageReader<R>, expected: CharacterId) -> Result<EntityRecord, SaveError> {
    let id = r.character("record id")?;
    if id != expected {
        return Err(corrupt("record id", id.raw()));
    }
    let car: Car = r.enumerated("car")?;
    let position = r.i32()?;
    if !(0..=10_000).contains(&position) {
        return Err(corrupt("position", position as u32));
    }
    let location: Location = r.enumerated("location")?;
    let direction = r.enumerated("direction")?;
    let direction_switch = r.enumerated("direction switch")?;
    let clothes = r.enumerated("clothes")?;
    let inventory_item = r.u8()?;
    let walk_step = r.i32()?;
    let walk_wait = r.u8()?;
    let squeeze = r.flag("squeeze")?;
    let attached_conductor = match r.u8()? {
        NO_CHARACTER => None,
        raw => Some(CharacterId::new(raw).ok_or_else(|| corrupt("attached conductor", raw))?),
    };
    let entered_view = if r.flag("entered view")? {
        Some((r.enumerated("entered view car")?, r.view_slot()?))
    } else {
        None
    };
    let sequence_name = r.name()?;
    let sequence_name2 = r.name()?;
    let current_frame = r.i16()?;
    let frame_ticks = r.u16()?;
    let progress = r.i32()?;
    let latches = r.u32()?;

    let depth = r.u8()? as usize;
    if depth > MAX_CALL_DEPTH {
        return Err(corrupt("call depth", depth as u64));
    }
    let mut calls = Vec::with_capacity(depth);
    for _ in 0..depth {
        let state = r.u8()?;
        if !logic::is_known_state(id, state) {
            return Err(corrupt("state", state));
        }
        let resume = r.u8()?;
        let params = r.params()?;
        calls.push(CallFrame {
            state,
            resume,
            params,
        });
    }

    let mut record = EntityRecord::new(id, walk_step);
    record.car = car;
    record.position = position;
    record.location = location;
    record.direction = direction;
    record.direction_switch = direction_switch;
    record.clothes = clothes;
    record.inventory_item = inventory_item;
    record.walk_wait = walk_wait;
    record.squeeze = squeeze;
    record.attached_conductor = attached_conductor;
    record.entered_view = entered_view;
    record.sequence_name = sequence_name;
    record.sequence_name2 = sequence_name2;
    record.current_frame = current_frame;
    record.frame_ticks = frame_ticks;
    record.progress = progress;
    record.set_latches(latches);
    record.set_calls(calls);
    Ok(record)
}

/// Outcome of offering a save to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerDecision {
    Skip,
    Append,
    Replace,
}

/// The list of entries in a save file and the rules for adding one.
#[derive(Debug, Clone, Default)]
pub struct SaveLedger {
    entries: Vec<SaveHeader>,
}

impl SaveLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[SaveHeader] {
        &self.entries
    }

    /// What adding `header` would do.
    ///
    /// A save earlier than the last entry is skipped, as is a tick-interval
    /// save at the same time. A time or event save shortly after a
    /// tick-interval save replaces it, and anything after an `Event2` or
    /// `Auto` entry overwrites that entry.
    pub fn decide(&self, header: &SaveHeader) -> LedgerDecision {
        let Some(last) = self.entries.last() else {
            return LedgerDecision::Append;
        };
        if header.game_time < last.game_time
            || (header.kind == SaveKind::TickInterval && header.game_time == last.game_time)
        {
            return LedgerDecision::Skip;
        }
        let supersedes_interval = matches!(header.kind, SaveKind::Time | SaveKind::Event)
            && last.kind == SaveKind::TickInterval
            && header.game_time - last.game_time < REPLACE_WINDOW;
        if supersedes_interval || matches!(last.kind, SaveKind::Event2 | SaveKind::Auto) {
            LedgerDecision::Replace
        } else {
            LedgerDecision::Append
        }
    }

    pub fn commit(&mut self, header: SaveHeader) -> LedgerDecision {
        let decision = self.decide(&header);
        match decision {
            LedgerDecision::Skip => {}
            LedgerDecision::Append => self.entries.push(header),
            LedgerDecision::Replace => {
                if let Some(last) = self.entries.last_mut() {
                    *last = header;
                }
            }
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::occupancy::SlotKey;
    use crate::types::Facing;

    fn busy_world() -> World {
        let mut world = World::default();
        world.setup_chapter(1);
        world.set_viewpoint(Car::RedSleeping, 14, Facing::Up);
        world.block_view(CharacterId::MAX, Car::Restaurant, 67);
        world.block_at_door(CharacterId::MAHMUD, Compartment::RED_F);
        world.timers.add(1000, 7);
        world.timers.add(5000, 3);
        for _ in 0..3 {
            world.tick();
        }
        world.bus.add_auto_message(CharacterId::COND1, Action(225358684), 4);
        world.send(CharacterId::ALEXEI, CharacterId::TABLE_B, Action(136455232), "005E".into());
        world.send(CharacterId::KRONOS, CharacterId::ANNA, Action(191070912), MessageParam::Int(12));
        world
    }

    fn header(world: &World) -> SaveHeader {
        world.header_for(SaveKind::Event, CharacterId::AUGUST, 4)
    }

    #[test]
    fn image_round_trips_every_persisted_field() -> Result<(), SaveError> {
        let world = busy_world();
        let mut bytes = Vec::new();
        world.save_to(header(&world), &mut bytes)?;

        let mut restored = World::default();
        restored.clock.ticks = world.clock.ticks;
        let loaded = restored.load_from(bytes.as_slice())?;

        assert_eq!(loaded, header(&world));
        assert_eq!(restored.clock.game_time, world.clock.game_time);
        assert_eq!(restored.viewpoint(), world.viewpoint());
        for (left, right) in world.records().iter().zip(restored.records()) {
            assert!(left.persisted_eq(right), "{} differs after restore", left.id);
        }
        assert_eq!(restored.occupancy.positions(), world.occupancy.positions());
        assert_eq!(restored.occupancy.compartments(), world.occupancy.compartments());
        assert_eq!(restored.timers, world.timers);
        assert_eq!(restored.bus.auto_messages(), world.bus.auto_messages());
        assert!(restored.bus.pending().eq(world.bus.pending()));
        Ok(())
    }

    #[test]
    fn timers_are_rebased_on_the_loading_clock() -> Result<(), SaveError> {
        let mut world = World::default();
        world.setup_chapter(1);
        world.clock.ticks = 100;
        world.timers.add(400, 2);
        let image = SaveImage::read_from(world.capture(header(&world)).to_bytes()?.as_slice())?;
        assert_eq!(
            image.timers,
            vec![SavedTimer {
                delta: 300,
                subroutine: 2
            }]
        );

        let mut later = World::default();
        later.clock.ticks = 1000;
        later.restore(&image);
        let deadlines: Vec<_> = later.timers.iter().map(|event| event.deadline).collect();
        assert_eq!(deadlines, vec![1300]);
        Ok(())
    }

    #[test]
    fn rejects_foreign_and_future_images() {
        let world = busy_world();
        let bytes = world.capture(header(&world)).to_bytes().expect("in-memory image");

        let mut foreign = bytes.clone();
        foreign[0] = b'X';
        assert!(matches!(
            SaveImage::read_from(foreign.as_slice()),
            Err(SaveError::BadMagic)
        ));

        let mut future = bytes;
        future[4..6].copy_from_slice(&2u16.to_be_bytes());
        assert!(matches!(
            SaveImage::read_from(future.as_slice()),
            Err(SaveError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn truncated_image_fails_without_touching_the_world() {
        let world = busy_world();
        let bytes = world.capture(header(&world)).to_bytes().expect("in-memory image");

        let mut target = World::default();
        target.setup_chapter(3);
        let before = target.record(CharacterId::ANNA).clone();
        let result = target.load_from(&bytes[..bytes.len() / 2]);

        assert!(matches!(result, Err(SaveError::Truncated)));
        assert!(target.record(CharacterId::ANNA).persisted_eq(&before));
        assert_eq!(target.clock.chapter, 3);
    }

    #[test]
    fn overlong_queued_names_fail_the_save() {
        let mut world = World::default();
        world.setup_chapter(1);
        let name = "X".repeat(MAX_NAME_LEN + 1);
        world.send(
            CharacterId::ALEXEI,
            CharacterId::TABLE_B,
            Action(103798704),
            MessageParam::Name(name),
        );

        let result = world.capture(header(&world)).to_bytes();
        assert!(matches!(
            result,
            Err(SaveError::Corrupt { field: "name length", value: 256 })
        ));
        let mut sink = Vec::new();
        assert!(world.save_to(header(&world), &mut sink).is_err());
    }

    #[test]
    fn unknown_states_are_corrupt() {
        let world = busy_world();
        let mut image = world.capture(header(&world));
        let august = &mut image.records[CharacterId::AUGUST.index()];
        august.set_calls(vec![CallFrame::new(200, StateParams::Empty)]);

        let result = SaveImage::read_from(image.to_bytes().expect("in-memory image").as_slice());
        match result {
            Err(SaveError::Corrupt { field, value }) => {
                assert_eq!(field, "state");
                assert_eq!(value, 200);
            }
            other => panic!("expected corrupt state, got {other:?}"),
        }
    }

    #[test]
    fn restored_occupancy_keeps_blockers() -> Result<(), SaveError> {
        let world = busy_world();
        let image = SaveImage::read_from(world.capture(header(&world)).to_bytes()?.as_slice())?;
        assert_eq!(
            image.occupancy.compartment_blocker(Compartment::RED_F),
            Some(CharacterId::MAHMUD)
        );
        assert!(image
            .occupancy
            .is_occupied_by(SlotKey::view(Car::Restaurant, 67), CharacterId::MAX));
        assert_eq!(
            image.records[CharacterId::KRONOS.index()].current_state(),
            world.record(CharacterId::KRONOS).current_state()
        );
        assert_eq!(image.pending.len(), 2);
        assert_eq!(image.pending[1].param, MessageParam::Int(12));
        Ok(())
    }

    #[test]
    fn ledger_applies_skip_and_replace_rules() {
        let entry = |kind, game_time| SaveHeader {
            kind,
            character: CharacterId::CATH,
            value: 0,
            chapter: 1,
            game_time,
        };
        let mut ledger = SaveLedger::new();

        assert_eq!(ledger.commit(entry(SaveKind::TickInterval, 1000)), LedgerDecision::Append);
        assert_eq!(ledger.commit(entry(SaveKind::TickInterval, 1000)), LedgerDecision::Skip);
        assert_eq!(ledger.commit(entry(SaveKind::Event, 900)), LedgerDecision::Skip);
        assert_eq!(ledger.commit(entry(SaveKind::Event, 1200)), LedgerDecision::Replace);
        assert_eq!(ledger.entries().len(), 1);
        assert_eq!(ledger.entries()[0].kind, SaveKind::Event);

        assert_eq!(ledger.commit(entry(SaveKind::Auto, 1300)), LedgerDecision::Append);
        assert_eq!(ledger.commit(entry(SaveKind::Time, 1400)), LedgerDecision::Replace);
        assert_eq!(ledger.entries().len(), 2);
        assert_eq!(ledger.commit(entry(SaveKind::Time, 2000)), LedgerDecision::Append);
    }
}
