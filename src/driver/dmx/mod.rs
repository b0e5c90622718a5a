//! dmx512 transmitter
//!
//! The listener side writes channels through [`DmxChannelSetter`], the worker
//! started by [`DmxBus`] snapshots the shared [`ChannelBuffer`] every refresh
//! period and writes the encoded frame to its transport.

pub mod prelude;
pub mod entity;
pub mod traits;
pub mod channel_buffer;
pub mod frame_encoder;
pub mod dmx_channel_setter;
pub mod dmx_thread;
pub mod dmx_bus;

pub use channel_buffer::{ChannelBuffer, ChannelSnapshot};
pub use dmx_bus::DmxBus;
pub use dmx_channel_setter::DmxChannelSetter;
pub use frame_encoder::{BreakMode, Frame, FrameTiming, LineSettings};
pub use traits::{DmxCaller, DmxTransport};
