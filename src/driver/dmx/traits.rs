use std::time::Duration;
use crate::common::error::DriverError;
use super::frame_encoder::LineSettings;

/// 表示一个可以操作 dmx 设备的特征
/// the entry point used by the network listener, one channel per call
pub trait DmxCaller {
    fn set_channel(&self, channel: i64, value: i64) -> Result<(), DriverError>;
}

/// physical link driven by the dmx worker
/// - configure errors are `Configuration`, everything else is `TransientIo`
pub trait DmxTransport: Send {
    fn name(&self) -> &str;

    fn configure(&mut self, line: &LineSettings) -> Result<(), DriverError>;

    /// returns the number of bytes accepted by the link
    fn write(&mut self, data: &[u8]) -> Result<usize, DriverError>;

    /// block until written bytes have left the link
    fn flush(&mut self) -> Result<(), DriverError>;

    /// drop output that has not been sent yet
    fn purge(&mut self) -> Result<(), DriverError>;

    fn send_break(&mut self, _duration: Duration) -> Result<(), DriverError> {
        Err(DriverError::Configuration(format!(
            "transport {} has no native break support",
            self.name()
        )))
    }
}

impl<T: DmxTransport + ?Sized> DmxTransport for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn configure(&mut self, line: &LineSettings) -> Result<(), DriverError> {
        (**self).configure(line)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, DriverError> {
        (**self).write(data)
    }

    fn flush(&mut self) -> Result<(), DriverError> {
        (**self).flush()
    }

    fn purge(&mut self) -> Result<(), DriverError> {
        (**self).purge()
    }

    fn send_break(&mut self, duration: Duration) -> Result<(), DriverError> {
        (**self).send_break(duration)
    }
}
