//! dmx512 frame encoder
//!
//! A frame is sent as three segments, always in this order:
//! 1. break: one `0x00` byte at a slow baud rate, so start bit + data bits hold
//!    the line low for at least 88 µs. Hardware with a break primitive can
//!    assert the break directly instead ([`BreakMode::Native`]).
//! 2. mark after break: idle gap, at least 8 µs.
//! 3. data: start code followed by channel 1..=512 at 250000 baud, 8N2.
//!
//! DMX512 has no escaping and no checksum, data bytes go out verbatim.

use std::time::Duration;
use tokio_serial::{DataBits, Parity, StopBits};
use crate::common::error::DriverError;
use super::channel_buffer::ChannelSnapshot;
use super::prelude::*;

/// line framing applied to the transport before a segment is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSettings {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub parity: Parity,
}

impl LineSettings {
    /// 250000 baud, 8 data bits, 2 stop bits, no parity
    pub fn dmx_data() -> Self {
        Self::dmx_break(DMX_BAUD)
    }

    /// same framing as data, only the line speed changes
    pub fn dmx_break(baud_rate: u32) -> Self {
        LineSettings {
            baud_rate,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::Two,
            parity: Parity::None,
        }
    }

    fn data_bit_count(&self) -> u64 {
        match self.data_bits {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }

    fn bits_to_duration(&self, bits: u64) -> Duration {
        if self.baud_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(bits * 1_000_000_000 / self.baud_rate as u64)
    }

    /// low time produced by sending a single zero byte: start bit plus data bits
    pub fn zero_byte_low_time(&self) -> Duration {
        self.bits_to_duration(1 + self.data_bit_count())
    }

    /// time one byte occupies on the wire, start bit to last stop bit
    pub fn byte_time(&self) -> Duration {
        let parity = match self.parity {
            Parity::None => 0,
            Parity::Odd | Parity::Even => 1,
        };
        let stop = match self.stop_bits {
            StopBits::One => 1,
            StopBits::Two => 2,
        };
        self.bits_to_duration(1 + self.data_bit_count() + parity + stop)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakMode {
    /// write one zero byte at `baud_rate`
    BaudSwitch { baud_rate: u32 },
    /// assert the line break for `duration`, needs transport support
    Native { duration: Duration },
}

impl BreakMode {
    pub fn low_time(&self) -> Duration {
        match self {
            BreakMode::BaudSwitch { baud_rate } => LineSettings::dmx_break(*baud_rate).zero_byte_low_time(),
            BreakMode::Native { duration } => *duration,
        }
    }

    /// line time taken by the break segment, stop bits of the break byte included
    pub fn wire_time(&self) -> Duration {
        match self {
            BreakMode::BaudSwitch { baud_rate } => LineSettings::dmx_break(*baud_rate).byte_time(),
            BreakMode::Native { duration } => *duration,
        }
    }
}

/// timing plan shared by every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTiming {
    pub break_mode: BreakMode,
    pub mark_after_break: Duration,
    /// period of a whole cycle, break to break
    pub refresh_interval: Duration,
    pub start_code: u8,
}

impl Default for FrameTiming {
    fn default() -> Self {
        FrameTiming {
            break_mode: BreakMode::BaudSwitch { baud_rate: BREAK_BAUD },
            mark_after_break: Duration::from_micros(DEFAULT_MAB_MICROS),
            refresh_interval: Duration::from_millis(DEFAULT_REFRESH_MILLIS),
            start_code: DMX_NULL_START,
        }
    }
}

impl FrameTiming {
    /// check the protocol bounds: break >= 88 µs, mark after break >= 8 µs, 1..=44 Hz,
    /// and the refresh interval leaves room for a whole frame on the wire
    pub fn validate(&self) -> Result<(), DriverError> {
        let low_time = self.break_mode.low_time();
        if low_time < Duration::from_micros(MIN_BREAK_MICROS) {
            return Err(DriverError::Configuration(format!(
                "break too short, {:?} < {} µs, mode = {:?}",
                low_time, MIN_BREAK_MICROS, self.break_mode
            )));
        }
        if self.mark_after_break < Duration::from_micros(MIN_MAB_MICROS) {
            return Err(DriverError::Configuration(format!(
                "mark after break too short, {:?} < {} µs",
                self.mark_after_break, MIN_MAB_MICROS
            )));
        }
        let min_refresh = Duration::from_micros(MIN_REFRESH_MICROS);
        let max_refresh = Duration::from_micros(MAX_REFRESH_MICROS);
        if self.refresh_interval < min_refresh || self.refresh_interval > max_refresh {
            return Err(DriverError::Configuration(format!(
                "refresh interval {:?} outside {:?}..={:?}",
                self.refresh_interval, min_refresh, max_refresh
            )));
        }
        let wire_time = self.frame_wire_time();
        if self.refresh_interval < wire_time {
            return Err(DriverError::Configuration(format!(
                "refresh interval {:?} shorter than one frame on the wire, {:?}",
                self.refresh_interval, wire_time
            )));
        }
        Ok(())
    }

    /// break + mark after break + start code and 512 channels at the data rate
    pub fn frame_wire_time(&self) -> Duration {
        let data = LineSettings::dmx_data().byte_time() * DMX_FRAME_LEN as u32;
        self.break_mode.wire_time() + self.mark_after_break + data
    }

    /// line settings applied at least once per frame
    pub fn line_settings(&self) -> Vec<LineSettings> {
        match self.break_mode {
            BreakMode::BaudSwitch { baud_rate } => vec![LineSettings::dmx_break(baud_rate), LineSettings::dmx_data()],
            BreakMode::Native { .. } => vec![LineSettings::dmx_data()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakSegment {
    /// write `byte` with `line` applied
    Low { line: LineSettings, byte: u8 },
    Native { duration: Duration },
}

/// one encoded frame, ready for the transport
#[derive(Clone)]
pub struct Frame {
    pub break_segment: BreakSegment,
    pub mark_after_break: Duration,
    pub data_line: LineSettings,
    data: [u8; DMX_FRAME_LEN],
}

impl Frame {
    /// start code at index 0, channel n at index n
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut channels = [0; DMX_CHANNEL_LEN];
        channels.copy_from_slice(&self.data[1..]);
        f.debug_struct("Frame")
            .field("break_segment", &self.break_segment)
            .field("mark_after_break", &self.mark_after_break)
            .field("start_code", &self.data[0])
            .field("channels", &ChannelSnapshot::from_values(channels))
            .finish()
    }
}

pub fn encode(snapshot: &ChannelSnapshot, timing: &FrameTiming) -> Frame {
    let break_segment = match timing.break_mode {
        BreakMode::BaudSwitch { baud_rate } => BreakSegment::Low {
            line: LineSettings::dmx_break(baud_rate),
            byte: 0x00,
        },
        BreakMode::Native { duration } => BreakSegment::Native { duration },
    };

    let mut data = [0; DMX_FRAME_LEN];
    data[0] = timing.start_code;
    data[1..].copy_from_slice(snapshot.as_slice());

    Frame {
        break_segment,
        mark_after_break: timing.mark_after_break,
        data_line: LineSettings::dmx_data(),
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_all_zero() {
        let frame = encode(&ChannelSnapshot::default(), &FrameTiming::default());
        assert_eq!(
            frame.break_segment,
            BreakSegment::Low { line: LineSettings::dmx_break(9600), byte: 0 }
        );
        assert_eq!(frame.mark_after_break, Duration::from_micros(100));
        assert_eq!(frame.data_line.baud_rate, 250_000);
        assert_eq!(frame.data_line.data_bits, DataBits::Eight);
        assert_eq!(frame.data_line.stop_bits, StopBits::Two);
        assert_eq!(frame.data_line.parity, Parity::None);
        assert_eq!(frame.data().len(), DMX_FRAME_LEN);
        assert!(frame.data().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_encode_channel_one_full() {
        let mut values = [0; DMX_CHANNEL_LEN];
        values[0] = 255;
        let frame = encode(&ChannelSnapshot::from_values(values), &FrameTiming::default());
        assert_eq!(frame.data()[0], DMX_NULL_START);
        assert_eq!(frame.data()[1], 255);
        assert!(frame.data()[2..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_encode_ascending_order() {
        let mut values = [0; DMX_CHANNEL_LEN];
        for (i, v) in values.iter_mut().enumerate() {
            *v = (i % 251) as u8;
        }
        let frame = encode(&ChannelSnapshot::from_values(values), &FrameTiming::default());
        assert_eq!(&frame.data()[1..], &values[..]);
        assert_eq!(frame.data()[512], values[511]);
    }

    #[test]
    fn test_encode_custom_start_code() {
        let timing = FrameTiming { start_code: 0x17, ..FrameTiming::default() };
        let frame = encode(&ChannelSnapshot::default(), &timing);
        assert_eq!(frame.data()[0], 0x17);
    }

    #[test]
    fn test_encode_native_break() {
        let timing = FrameTiming {
            break_mode: BreakMode::Native { duration: Duration::from_micros(176) },
            ..FrameTiming::default()
        };
        let frame = encode(&ChannelSnapshot::default(), &timing);
        assert_eq!(frame.break_segment, BreakSegment::Native { duration: Duration::from_micros(176) });
        assert_eq!(timing.line_settings(), vec![LineSettings::dmx_data()]);
    }

    #[test]
    fn test_break_low_time() {
        // 9 bit times at 9600 baud
        assert_eq!(LineSettings::dmx_break(9600).zero_byte_low_time(), Duration::from_nanos(937_500));
        // 9 bit times at 250000 baud, far below a valid break
        assert_eq!(LineSettings::dmx_data().zero_byte_low_time(), Duration::from_micros(36));
    }

    #[test]
    fn test_byte_time() {
        // 11 bit times: start, 8 data, 2 stop
        assert_eq!(LineSettings::dmx_data().byte_time(), Duration::from_micros(44));
        assert_eq!(LineSettings::dmx_break(9600).byte_time(), Duration::from_nanos(1_145_833));
    }

    #[test]
    fn test_default_frame_wire_time() {
        let timing = FrameTiming::default();
        assert_eq!(timing.frame_wire_time(), Duration::from_nanos(23_817_833));
        assert!(timing.refresh_interval > timing.frame_wire_time());

        let timing = FrameTiming {
            break_mode: BreakMode::Native { duration: Duration::from_micros(176) },
            ..FrameTiming::default()
        };
        assert_eq!(timing.frame_wire_time(), Duration::from_micros(176 + 100 + 513 * 44));
    }

    /// 44 Hz is the protocol ceiling, but a full frame with a 9600 baud break does not fit in it
    #[test]
    fn test_validate_rejects_refresh_shorter_than_frame() {
        let timing = FrameTiming {
            refresh_interval: Duration::from_micros(MIN_REFRESH_MICROS),
            ..FrameTiming::default()
        };
        assert!(matches!(timing.validate(), Err(DriverError::Configuration(_))));

        let timing = FrameTiming { mark_after_break: Duration::from_millis(2), ..FrameTiming::default() };
        assert!(matches!(timing.validate(), Err(DriverError::Configuration(_))));

        // a shorter native break frees enough line time
        let timing = FrameTiming {
            break_mode: BreakMode::Native { duration: Duration::from_micros(100) },
            mark_after_break: Duration::from_micros(12),
            refresh_interval: Duration::from_micros(MIN_REFRESH_MICROS),
            ..FrameTiming::default()
        };
        timing.validate().unwrap();
    }

    #[test]
    fn test_default_timing_is_valid() {
        FrameTiming::default().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_short_break() {
        // 9 bits at 115200 baud is about 78 µs
        let timing = FrameTiming {
            break_mode: BreakMode::BaudSwitch { baud_rate: 115_200 },
            ..FrameTiming::default()
        };
        assert!(matches!(timing.validate(), Err(DriverError::Configuration(_))));

        let timing = FrameTiming {
            break_mode: BreakMode::Native { duration: Duration::from_micros(50) },
            ..FrameTiming::default()
        };
        assert!(matches!(timing.validate(), Err(DriverError::Configuration(_))));
    }

    #[test]
    fn test_validate_rejects_short_mab() {
        let timing = FrameTiming { mark_after_break: Duration::from_micros(5), ..FrameTiming::default() };
        assert!(matches!(timing.validate(), Err(DriverError::Configuration(_))));
    }

    #[test]
    fn test_validate_refresh_bounds() {
        for ms in [10, 23, 2000] {
            let timing = FrameTiming { refresh_interval: Duration::from_millis(ms), ..FrameTiming::default() };
            assert!(timing.validate().is_err(), "{} ms should be rejected", ms);
        }
        for ms in [24, 25, 1000] {
            let timing = FrameTiming { refresh_interval: Duration::from_millis(ms), ..FrameTiming::default() };
            assert!(timing.validate().is_ok(), "{} ms should be accepted", ms);
        }
    }
}
