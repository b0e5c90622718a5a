use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use crate::common::error::DriverError;
use crate::debug;
use super::channel_buffer::ChannelBuffer;
use super::traits::DmxCaller;

const LOG_TAG: &str = "dmx_channel_setter.rs | channel setter";

/// validating entry point into the channel buffer
/// handed to the network listener, cloned freely
#[derive(Debug, Clone)]
pub struct DmxChannelSetter {
    buffer: ChannelBuffer,
    // cleared by the bus on shutdown
    accepting: Arc<AtomicBool>,
}

impl DmxCaller for DmxChannelSetter {
    fn set_channel(&self, channel: i64, value: i64) -> Result<(), DriverError> {
        if !self.is_accepting() {
            return Err(DriverError::Closed);
        }
        self.buffer.set(channel, value)?;
        debug!(LOG_TAG, "channel set, channel: {}, value: {}", channel, value);
        Ok(())
    }
}

impl DmxChannelSetter {
    pub fn new(buffer: ChannelBuffer, accepting: Arc<AtomicBool>) -> Self {
        DmxChannelSetter { buffer, accepting }
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }
}
