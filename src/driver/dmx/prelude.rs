// dmx channel value type
pub type DmxValue = u8;
// dmx address type, channels are 1 based
pub type DmxAddress = u16;
// dmx channel length
pub const DMX_CHANNEL_LEN: usize = 512;
// start code + 512 channels
pub const DMX_FRAME_LEN: usize = DMX_CHANNEL_LEN + 1;

pub const DMX_MIN_CHANNEL: DmxAddress = 1;
pub const DMX_MAX_CHANNEL: DmxAddress = DMX_CHANNEL_LEN as DmxAddress;

/// null start code, slot 0 of a dimmer frame
pub const DMX_NULL_START: u8 = 0x00;

pub const DMX_BAUD: u32 = 250_000;
/// slow line speed used to stretch one zero byte into a break
pub const BREAK_BAUD: u32 = 9600;

// protocol minimums
pub const MIN_BREAK_MICROS: u64 = 88;
pub const MIN_MAB_MICROS: u64 = 8;

pub const DEFAULT_MAB_MICROS: u64 = 100;
pub const DEFAULT_NATIVE_BREAK_MICROS: u64 = 176;
pub const DEFAULT_REFRESH_MILLIS: u64 = 25;

// refresh period bounds: 44 Hz .. 1 Hz
pub const MIN_REFRESH_MICROS: u64 = 22_728;
pub const MAX_REFRESH_MICROS: u64 = 1_000_000;
