pub mod dmx;
pub mod transport;
