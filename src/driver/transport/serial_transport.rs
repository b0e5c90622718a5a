//! serial port transport
//! works for a plain uart node (/dev/ttyS0) and for usb-serial adapters such as
//! the FTDI FT232 (/dev/ttyUSB0), both are opened through serialport

use std::io::Write;
use std::thread;
use std::time::Duration;
use tokio_serial::{ClearBuffer, FlowControl, SerialPort};
use crate::common::error::DriverError;
use crate::driver::dmx::frame_encoder::LineSettings;
use crate::driver::dmx::traits::DmxTransport;
use crate::{debug, info};

const LOG_TAG: &str = "serial_transport.rs | dmx serial port";

const WRITE_TIMEOUT_MILLIS: u64 = 100;

pub struct SerialTransport {
    serial_port: String,
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// open the port with dmx data framing
    pub fn open(serial_port: &str) -> Result<Self, DriverError> {
        let line = LineSettings::dmx_data();
        let port = tokio_serial::new(serial_port, line.baud_rate)
            .data_bits(line.data_bits)
            .stop_bits(line.stop_bits)
            .parity(line.parity)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(WRITE_TIMEOUT_MILLIS))
            .open()
            .map_err(|e| {
                DriverError::Configuration(format!("cannot open port, port: {}, err: {}", serial_port, e))
            })?;
        info!(LOG_TAG, "serial port opened, port: {}, line: {:?}", serial_port, line);
        Ok(Self {
            serial_port: serial_port.to_string(),
            port,
        })
    }
}

impl DmxTransport for SerialTransport {
    fn name(&self) -> &str {
        &self.serial_port
    }

    fn configure(&mut self, line: &LineSettings) -> Result<(), DriverError> {
        let err = |e: tokio_serial::Error| {
            DriverError::Configuration(format!(
                "cannot apply line settings, port: {}, line: {:?}, err: {}",
                self.serial_port, line, e
            ))
        };
        self.port.set_baud_rate(line.baud_rate).map_err(err)?;
        self.port.set_data_bits(line.data_bits).map_err(err)?;
        self.port.set_stop_bits(line.stop_bits).map_err(err)?;
        self.port.set_parity(line.parity).map_err(err)?;
        debug!(LOG_TAG, "line settings applied: {:?}", line);
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, DriverError> {
        self.port.write_all(data).map_err(|e| {
            DriverError::TransientIo(format!("cannot write to port, port: {}, err: {}", self.serial_port, e))
        })?;
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), DriverError> {
        self.port.flush().map_err(|e| {
            DriverError::TransientIo(format!("cannot drain port, port: {}, err: {}", self.serial_port, e))
        })
    }

    fn purge(&mut self) -> Result<(), DriverError> {
        self.port.clear(ClearBuffer::Output).map_err(|e| {
            DriverError::TransientIo(format!("cannot purge port, port: {}, err: {}", self.serial_port, e))
        })
    }

    fn send_break(&mut self, duration: Duration) -> Result<(), DriverError> {
        self.port.set_break().map_err(|e| {
            DriverError::Configuration(format!("cannot set break, port: {}, err: {}", self.serial_port, e))
        })?;
        thread::sleep(duration);
        self.port.clear_break().map_err(|e| {
            DriverError::Configuration(format!("cannot clear break, port: {}, err: {}", self.serial_port, e))
        })
    }
}
