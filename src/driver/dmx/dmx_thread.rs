use super::channel_buffer::ChannelBuffer;
use super::entity::*;
use super::frame_encoder::{encode, BreakSegment, Frame, FrameTiming};
use super::traits::DmxTransport;
use crate::common::error::DriverError;
use crate::{debug, error, info, trace, warn};
use crossbeam::channel::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::{thread, time::Instant};

const LOG_TAG: &str = "dmx_thread.rs | dmx worker";

/// dmx worker loop
/// - snapshot the buffer, encode, send, wait for the rest of the refresh period
/// - the wait returns early on a stop command
/// - io errors drop the current frame only, configuration errors end the loop
/// - the transport is dropped when the loop returns
pub fn run_loop<T: DmxTransport>(
    mut transport: T,
    buffer: ChannelBuffer,
    timing: FrameTiming,
    command_rx: Receiver<DmxThreadCommandEnum>,
    stats: Arc<DmxBusStats>,
) -> Result<(), DriverError> {
    info!(
        LOG_TAG,
        "dmx worker thread started, transmitting, port: {}, timing: {:?}",
        transport.name(),
        timing
    );

    loop {
        let cycle_start = Instant::now();
        let frame = encode(&buffer.snapshot(), &timing);

        match send_frame(&mut transport, &frame) {
            Ok(()) => {
                stats.record_sent();
                trace!(LOG_TAG, "frame sent: {:?}", frame);
            }
            Err(DriverError::TransientIo(msg)) => {
                stats.record_failed();
                warn!(LOG_TAG, "frame abandoned, port: {}, err: {}", transport.name(), msg);
            }
            Err(e) => {
                error!(LOG_TAG, "dmx worker stopping on fatal transport error, port: {}, err: {}", transport.name(), e);
                return Err(e);
            }
        }

        let elapsed = cycle_start.elapsed();
        if elapsed > timing.refresh_interval {
            debug!(LOG_TAG, "cycle overran refresh interval: {:?} > {:?}", elapsed, timing.refresh_interval);
        }

        match command_rx.recv_timeout(timing.refresh_interval.saturating_sub(elapsed)) {
            Ok(DmxThreadCommandEnum::Stop) => {
                info!(LOG_TAG, "stop on STOP command");
                break;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                warn!(LOG_TAG, "command channel closed, dmx bus dropped, quitting");
                break;
            }
        }
    }

    info!(LOG_TAG, "dmx worker thread exiting, releasing port: {}", transport.name());
    Ok(())
}

/// purge, break, mark after break, data, drain
pub fn send_frame<T: DmxTransport + ?Sized>(transport: &mut T, frame: &Frame) -> Result<(), DriverError> {
    transport.purge()?;

    match frame.break_segment {
        BreakSegment::Low { line, byte } => {
            transport.configure(&line)?;
            write_all(transport, &[byte])?;
            // the break byte must be on the wire before the baud rate changes
            transport.flush()?;
        }
        BreakSegment::Native { duration } => {
            transport.configure(&frame.data_line)?;
            transport.send_break(duration)?;
        }
    }

    thread::sleep(frame.mark_after_break);

    transport.configure(&frame.data_line)?;
    write_all(transport, frame.data())?;
    // the next purge must not discard the tail of this frame
    transport.flush()?;
    Ok(())
}

fn write_all<T: DmxTransport + ?Sized>(transport: &mut T, data: &[u8]) -> Result<(), DriverError> {
    let written = transport.write(data)?;
    if written != data.len() {
        return Err(DriverError::TransientIo(format!(
            "short write, port: {}, written: {}, expected: {}",
            transport.name(),
            written,
            data.len()
        )));
    }
    Ok(())
}
