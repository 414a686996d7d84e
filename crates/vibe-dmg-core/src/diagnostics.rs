use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Bus region named in diagnostic events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Region {
    Rom,
    CartRam,
    EchoRam,
    Oam,
    Unusable,
    Io,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Region::Rom => "ROM",
            Region::CartRam => "cartridge RAM",
            Region::EchoRam => "echo RAM",
            Region::Oam => "OAM",
            Region::Unusable => "unusable",
            Region::Io => "I/O",
        };
        f.write_str(name)
    }
}

/// Something the machine tolerated silently but a host may want to see.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagnosticEvent {
    IgnoredWrite { addr: u16, value: u8, region: Region },
    BlockedRead { addr: u16, region: Region },
    SerialByte(u8),
    IllegalOpcode { opcode: u8, pc: u16 },
}

impl fmt::Display for DiagnosticEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            DiagnosticEvent::IgnoredWrite {
                addr,
                value,
                region,
            } => write!(f, "ignored write {value:02X} -> {addr:04X} ({region})"),
            DiagnosticEvent::BlockedRead { addr, region } => {
                write!(f, "blocked read {addr:04X} ({region})")
            }
            DiagnosticEvent::SerialByte(b) => write!(f, "serial byte {b:02X}"),
            DiagnosticEvent::IllegalOpcode { opcode, pc } => {
                write!(f, "illegal opcode {opcode:02X} at {pc:04X}")
            }
        }
    }
}

/// Receiver for [`DiagnosticEvent`]s, owned by one machine.
pub trait DiagnosticsSink: Send {
    fn record(&mut self, event: DiagnosticEvent);
}

/// Keeps the most recent `capacity` events; older ones fall off the front.
#[derive(Debug)]
pub struct RingBufferSink {
    events: VecDeque<DiagnosticEvent>,
    capacity: usize,
}

impl RingBufferSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn events(&self) -> impl Iterator<Item = &DiagnosticEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl DiagnosticsSink for RingBufferSink {
    fn record(&mut self, event: DiagnosticEvent) {
        if self.capacity == 0 {
            return;
        }
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Ring buffer the host can read while the machine holds the sink.
#[derive(Clone, Debug)]
pub struct SharedRingBuffer(Arc<Mutex<RingBufferSink>>);

impl SharedRingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self(Arc::new(Mutex::new(RingBufferSink::new(capacity))))
    }

    /// Copy of the buffered events, oldest first.
    pub fn snapshot(&self) -> Vec<DiagnosticEvent> {
        match self.0.lock() {
            Ok(sink) => sink.events().copied().collect(),
            Err(poisoned) => poisoned.into_inner().events().copied().collect(),
        }
    }

    pub fn clear(&self) {
        match self.0.lock() {
            Ok(mut sink) => sink.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl DiagnosticsSink for SharedRingBuffer {
    fn record(&mut self, event: DiagnosticEvent) {
        match self.0.lock() {
            Ok(mut sink) => sink.record(event),
            Err(poisoned) => poisoned.into_inner().record(event),
        }
    }
}

/// Forward an event to the `log` facade and, if present, the sink.
pub(crate) fn emit(sink: &mut Option<Box<dyn DiagnosticsSink>>, event: DiagnosticEvent) {
    match event {
        DiagnosticEvent::IllegalOpcode { .. } => log::warn!(target: "vibe_dmg_core::cpu", "{event}"),
        DiagnosticEvent::SerialByte(_) => log::debug!(target: "vibe_dmg_core::serial", "{event}"),
        _ => log::trace!(target: "vibe_dmg_core::bus", "{event}"),
    }
    if let Some(sink) = sink.as_mut() {
        sink.record(event);
    }
}
