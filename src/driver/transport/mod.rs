pub mod serial_transport;
pub mod dummy_transport;

pub use dummy_transport::{DummyHandle, DummyTransport, TransportEvent};
pub use serial_transport::SerialTransport;
