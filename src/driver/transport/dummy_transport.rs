//! 测试用 transport
//! used when no hardware is attached (`mode=dummy`) and by the tests
//! - every call is recorded, the last EVENT_CAPACITY events are kept
//! - failures can be injected through the handle

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use crate::common::error::DriverError;
use crate::driver::dmx::channel_buffer::ChannelSnapshot;
use crate::driver::dmx::frame_encoder::LineSettings;
use crate::driver::dmx::prelude::*;
use crate::driver::dmx::traits::DmxTransport;
use crate::trace;

const LOG_TAG: &str = "dummy_transport.rs | dummy dmx port";

const EVENT_CAPACITY: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Configured(LineSettings),
    Written { at: Instant, data: Vec<u8> },
    Flushed,
    Purged,
    Break(Duration),
}

#[derive(Default)]
struct DummyState {
    events: Mutex<VecDeque<TransportEvent>>,
    fail_writes: AtomicUsize,
    fail_configures: AtomicUsize,
}

/// inspection side of a dummy transport, stays valid after the transport moved into the worker
#[derive(Clone)]
pub struct DummyHandle {
    state: Arc<DummyState>,
}

impl DummyHandle {
    pub fn events(&self) -> Vec<TransportEvent> {
        let events = self.state.events.lock().unwrap_or_else(PoisonError::into_inner);
        events.iter().cloned().collect()
    }

    /// full dmx frames written so far, start code included
    pub fn frames(&self) -> Vec<(Instant, Vec<u8>)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                TransportEvent::Written { at, data } if data.len() == DMX_FRAME_LEN => Some((at, data)),
                _ => None,
            })
            .collect()
    }

    pub fn fail_next_writes(&self, count: usize) {
        self.state.fail_writes.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_configures(&self, count: usize) {
        self.state.fail_configures.store(count, Ordering::SeqCst);
    }
}

pub struct DummyTransport {
    name: String,
    native_break: bool,
    state: Arc<DummyState>,
}

impl DummyTransport {
    pub fn new(name: &str) -> Self {
        DummyTransport {
            name: name.to_string(),
            native_break: false,
            state: Arc::new(DummyState::default()),
        }
    }

    /// accept `send_break` calls like hardware with a break primitive
    pub fn with_native_break(mut self) -> Self {
        self.native_break = true;
        self
    }

    pub fn handle(&self) -> DummyHandle {
        DummyHandle {
            state: self.state.clone(),
        }
    }

    fn record(&self, event: TransportEvent) {
        let mut events = self.state.events.lock().unwrap_or_else(PoisonError::into_inner);
        if events.len() == EVENT_CAPACITY {
            events.pop_front();
        }
        events.push_back(event);
    }

    // consume one injected failure if any is pending
    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl DmxTransport for DummyTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn configure(&mut self, line: &LineSettings) -> Result<(), DriverError> {
        if Self::take_failure(&self.state.fail_configures) {
            return Err(DriverError::Configuration(format!(
                "dummy transport {} rejected line settings {:?}",
                self.name, line
            )));
        }
        self.record(TransportEvent::Configured(*line));
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, DriverError> {
        if Self::take_failure(&self.state.fail_writes) {
            return Err(DriverError::TransientIo(format!("dummy transport {} write failed", self.name)));
        }
        if data.len() == DMX_FRAME_LEN {
            let mut channels = [0; DMX_CHANNEL_LEN];
            channels.copy_from_slice(&data[1..]);
            trace!(LOG_TAG, "dmx data sent: start code {}, channels {:?}", data[0], ChannelSnapshot::from_values(channels));
        }
        self.record(TransportEvent::Written {
            at: Instant::now(),
            data: data.to_vec(),
        });
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), DriverError> {
        self.record(TransportEvent::Flushed);
        Ok(())
    }

    fn purge(&mut self) -> Result<(), DriverError> {
        self.record(TransportEvent::Purged);
        Ok(())
    }

    fn send_break(&mut self, duration: Duration) -> Result<(), DriverError> {
        if !self.native_break {
            return Err(DriverError::Configuration(format!(
                "transport {} has no native break support",
                self.name
            )));
        }
        self.record(TransportEvent::Break(duration));
        Ok(())
    }
}
