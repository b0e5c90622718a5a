//! shared dmx channel state
//! - 512 cells, zero filled at creation, never resized
//! - cloned handles point at the same cells
//! - set writes one cell under the lock, snapshot copies all cells under the lock

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use crate::common::error::DriverError;
use super::prelude::*;

/// check a raw update and turn it into (address, value)
pub fn validate(channel: i64, value: i64) -> Result<(DmxAddress, DmxValue), DriverError> {
    let channel_ok = (DMX_MIN_CHANNEL as i64..=DMX_MAX_CHANNEL as i64).contains(&channel);
    let value_ok = (0..=DmxValue::MAX as i64).contains(&value);
    if !channel_ok || !value_ok {
        return Err(DriverError::OutOfRange { channel, value });
    }
    Ok((channel as DmxAddress, value as DmxValue))
}

#[derive(Clone)]
pub struct ChannelBuffer {
    cells: Arc<Mutex<[DmxValue; DMX_CHANNEL_LEN]>>,
}

impl ChannelBuffer {
    pub fn new() -> Self {
        Self {
            cells: Arc::new(Mutex::new([0; DMX_CHANNEL_LEN])),
        }
    }

    // a panic while holding the lock cannot leave a cell half written
    fn lock(&self) -> MutexGuard<'_, [DmxValue; DMX_CHANNEL_LEN]> {
        self.cells.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// replace a single channel
    pub fn set(&self, channel: i64, value: i64) -> Result<(), DriverError> {
        let (address, value) = validate(channel, value)?;
        self.lock()[address as usize - 1] = value;
        Ok(())
    }

    pub fn get(&self, channel: DmxAddress) -> Option<DmxValue> {
        if !(DMX_MIN_CHANNEL..=DMX_MAX_CHANNEL).contains(&channel) {
            return None;
        }
        Some(self.lock()[channel as usize - 1])
    }

    pub fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot(*self.lock())
    }
}

impl Default for ChannelBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChannelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ChannelBuffer").field(&self.snapshot()).finish()
    }
}

/// copy of all channels at one instant
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ChannelSnapshot([DmxValue; DMX_CHANNEL_LEN]);

impl ChannelSnapshot {
    pub fn from_values(values: [DmxValue; DMX_CHANNEL_LEN]) -> Self {
        ChannelSnapshot(values)
    }

    /// value of channel 1..=512
    pub fn channel(&self, channel: DmxAddress) -> Option<DmxValue> {
        if !(DMX_MIN_CHANNEL..=DMX_MAX_CHANNEL).contains(&channel) {
            return None;
        }
        Some(self.0[channel as usize - 1])
    }

    /// channel values in ascending order, channel 1 first
    pub fn as_slice(&self) -> &[DmxValue] {
        &self.0
    }
}

impl Default for ChannelSnapshot {
    fn default() -> Self {
        ChannelSnapshot([0; DMX_CHANNEL_LEN])
    }
}

// only non zero channels, 512 zeros are not useful in a log line
impl fmt::Debug for ChannelSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.0
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| **v != 0)
                    .map(|(i, v)| (i + 1, *v)),
            )
            .finish()
    }
}
