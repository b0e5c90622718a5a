//! dmx 总线设备类
//!
//! 功能
//! - 保存当前通道数据 (shared ChannelBuffer)
//! - 创建独立的线程，不断发送数据
//! - DmxBus 是一个控制器，负责和数据发送线程通信
//! - dmx 仅支持写而不支持读，所以只有下行数据而无上行数据
//!
//! The transport is checked once on start: every line setting a frame needs is
//! applied before the worker is spawned, so an unusable port fails `start`
//! instead of failing inside the loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use crossbeam::channel::{self, Sender};
use crate::common::error::DriverError;
use crate::{error, info, warn};
use super::channel_buffer::{ChannelBuffer, ChannelSnapshot};
use super::dmx_channel_setter::DmxChannelSetter;
use super::dmx_thread::run_loop;
use super::entity::*;
use super::frame_encoder::FrameTiming;
use super::traits::DmxTransport;

const LOG_TAG: &str = "dmx_bus.rs | dmx bus";

pub struct DmxBus {
    device_id: String,
    // 当前数据数组 512 u8 长度
    buffer: ChannelBuffer,
    timing: FrameTiming,
    // setters check this before every update
    accepting: Arc<AtomicBool>,
    stats: Arc<DmxBusStats>,
    // thread 发送通道句柄，只有在线程创建以后才可使用
    thread_tx: Option<Sender<DmxThreadCommandEnum>>,
    thread_handle: Option<thread::JoinHandle<Result<(), DriverError>>>,
}

impl DmxBus {
    /// 创建一个新的 dmx 总线设备
    /// the buffer is private to the bus, updates go through [`DmxBus::setter`]
    pub fn new(device_id: &str, timing: FrameTiming) -> Self {
        Self {
            device_id: device_id.to_string(),
            buffer: ChannelBuffer::new(),
            timing,
            accepting: Arc::new(AtomicBool::new(true)),
            stats: Arc::new(DmxBusStats::default()),
            thread_tx: None,
            thread_handle: None,
        }
    }

    /// 获取当前正在发送的数据
    pub fn snapshot(&self) -> ChannelSnapshot {
        self.buffer.snapshot()
    }

    pub fn setter(&self) -> DmxChannelSetter {
        DmxChannelSetter::new(self.buffer.clone(), self.accepting.clone())
    }

    pub fn stats(&self) -> DmxBusStatsBo {
        self.stats.to_bo()
    }

    /// worker spawned and not yet finished
    pub fn is_running(&self) -> bool {
        self.thread_handle.as_ref().map_or(false, |h| !h.is_finished())
    }

    /// 新建线程并发送数据
    /// the transport must already be open, it is moved into the worker
    pub fn start<T: DmxTransport + 'static>(&mut self, mut transport: T) -> Result<(), DriverError> {
        if self.thread_handle.is_some() {
            return Err(DriverError::AlreadyRunning);
        }

        self.timing.validate()?;
        for line in self.timing.line_settings() {
            transport.configure(&line).map_err(|e| {
                error!(LOG_TAG, "dmx bus: transport rejected line settings, device: {}, err: {}", self.device_id, e);
                e
            })?;
        }

        // 创建通信通道
        let (tx, rx) = channel::bounded(1);
        let buffer = self.buffer.clone();
        let timing = self.timing;
        let stats = self.stats.clone();
        let port_name = transport.name().to_string();

        // 创建一个线程
        let handle = thread::Builder::new()
            .name(format!("dmx-bus-{}", self.device_id))
            .spawn(move || run_loop(transport, buffer, timing, rx, stats))
            .map_err(|e| DriverError::Thread(format!("cannot spawn dmx worker, err: {}", e)))?;

        self.thread_tx = Some(tx);
        self.thread_handle = Some(handle);
        self.accepting.store(true, Ordering::SeqCst);

        info!(
            LOG_TAG,
            "dmx bus: start dmx bus, device: {}, port: {}, data: {:?}",
            self.device_id, port_name, self.buffer.snapshot()
        );
        Ok(())
    }

    /// 向线程发送停止指令
    /// stops accepting updates, signals the worker and returns its result
    pub fn stop(&mut self) -> Result<(), DriverError> {
        self.accepting.store(false, Ordering::SeqCst);

        let handle = self.thread_handle.take().ok_or(DriverError::NotRunning)?;
        if let Some(tx) = self.thread_tx.take() {
            // worker may already be gone after a fatal error
            if tx.send(DmxThreadCommandEnum::Stop).is_err() {
                warn!(LOG_TAG, "dmx bus: worker already exited, device: {}", self.device_id);
            }
        }

        let res = handle
            .join()
            .map_err(|_| DriverError::Thread(format!("dmx worker panicked, device: {}", self.device_id)))?;

        info!(
            LOG_TAG,
            "dmx bus: stop dmx bus, device: {}, stats: {:?}",
            self.device_id, self.stats.to_bo()
        );
        res
    }
}

impl Drop for DmxBus {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            if let Err(e) = self.stop() {
                warn!(LOG_TAG, "dmx bus: error while stopping on drop, err: {}", e);
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::logger::init_logger;
    use crate::driver::dmx::frame_encoder::{BreakMode, LineSettings};
    use crate::driver::dmx::traits::DmxCaller;
    use crate::driver::transport::dummy_transport::{DummyTransport, TransportEvent};
    use std::time::{Duration, Instant};

    fn set_env() {
        let _ = init_logger();
    }

    fn wait_for<F: Fn() -> bool>(condition: F) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        false
    }

    /// set(5, 200) shows up in the next frame, every other channel stays zero
    #[test]
    fn test_set_reaches_wire() {
        set_env();
        let transport = DummyTransport::new("dummy");
        let handle = transport.handle();
        let mut dmx_bus = DmxBus::new("test_dmx_bus", FrameTiming::default());
        let setter = dmx_bus.setter();
        dmx_bus.start(transport).unwrap();
        assert!(dmx_bus.is_running());

        assert!(wait_for(|| !handle.frames().is_empty()));
        let set_at = Instant::now();
        setter.set_channel(5, 200).unwrap();
        assert!(wait_for(|| handle.frames().iter().any(|(_, f)| f[5] == 200)));
        dmx_bus.stop().unwrap();

        // the frame in flight during the set may still be stale, the one after it may not
        let after_set: Vec<_> = handle.frames().into_iter().filter(|(at, _)| *at >= set_at).collect();
        let position = after_set.iter().position(|(_, f)| f[5] == 200).unwrap();
        assert!(position <= 1, "update first seen in frame {} after the set", position);

        let (sent_at, frame) = &after_set[position];
        for (i, b) in frame.iter().enumerate() {
            if i != 5 {
                assert_eq!(*b, 0, "byte {} should be zero", i);
            }
        }
        assert!(*sent_at - set_at < FrameTiming::default().refresh_interval * 2);
        assert!(dmx_bus.stats().frames_sent >= 2);
    }

    #[test]
    fn test_start_configures_transport_first() {
        set_env();
        let transport = DummyTransport::new("dummy");
        let handle = transport.handle();
        let mut dmx_bus = DmxBus::new("test_dmx_bus", FrameTiming::default());
        dmx_bus.start(transport).unwrap();
        dmx_bus.stop().unwrap();

        let events = handle.events();
        assert_eq!(events[0], TransportEvent::Configured(LineSettings::dmx_break(9600)));
        assert_eq!(events[1], TransportEvent::Configured(LineSettings::dmx_data()));
        assert_eq!(events[2], TransportEvent::Purged);
    }

    #[test]
    fn test_start_fails_on_configuration_error() {
        set_env();
        let transport = DummyTransport::new("dummy");
        let handle = transport.handle();
        handle.fail_next_configures(1);

        let mut dmx_bus = DmxBus::new("test_dmx_bus", FrameTiming::default());
        let res = dmx_bus.start(transport);
        assert!(matches!(res, Err(DriverError::Configuration(_))));
        assert!(!dmx_bus.is_running());
        assert!(handle.frames().is_empty());
        assert!(matches!(dmx_bus.stop(), Err(DriverError::NotRunning)));
    }

    #[test]
    fn test_start_rejects_invalid_timing() {
        set_env();
        let timing = FrameTiming { mark_after_break: Duration::from_micros(1), ..FrameTiming::default() };
        let mut dmx_bus = DmxBus::new("test_dmx_bus", timing);
        assert!(matches!(dmx_bus.start(DummyTransport::new("dummy")), Err(DriverError::Configuration(_))));
        assert!(!dmx_bus.is_running());
    }

    #[test]
    fn test_native_break_needs_support() {
        set_env();
        let timing = FrameTiming {
            break_mode: BreakMode::Native { duration: Duration::from_micros(176) },
            ..FrameTiming::default()
        };

        // start succeeds, the first break ends the worker
        let mut dmx_bus = DmxBus::new("plain", timing);
        dmx_bus.start(DummyTransport::new("plain")).unwrap();
        assert!(wait_for(|| !dmx_bus.is_running()));
        assert!(matches!(dmx_bus.stop(), Err(DriverError::Configuration(_))));

        let transport = DummyTransport::new("native").with_native_break();
        let handle = transport.handle();
        let mut dmx_bus = DmxBus::new("native", timing);
        dmx_bus.start(transport).unwrap();
        assert!(wait_for(|| !handle.frames().is_empty()));
        dmx_bus.stop().unwrap();
    }

    #[test]
    fn test_start_twice() {
        set_env();
        let mut dmx_bus = DmxBus::new("test_dmx_bus", FrameTiming::default());
        dmx_bus.start(DummyTransport::new("first")).unwrap();
        assert!(matches!(dmx_bus.start(DummyTransport::new("second")), Err(DriverError::AlreadyRunning)));
        dmx_bus.stop().unwrap();
    }

    /// stop does not wait out the refresh interval
    #[test]
    fn test_stop_is_prompt() {
        set_env();
        let timing = FrameTiming { refresh_interval: Duration::from_secs(1), ..FrameTiming::default() };
        let transport = DummyTransport::new("dummy");
        let handle = transport.handle();
        let mut dmx_bus = DmxBus::new("test_dmx_bus", timing);
        dmx_bus.start(transport).unwrap();
        assert!(wait_for(|| !handle.frames().is_empty()));

        let stop_at = Instant::now();
        dmx_bus.stop().unwrap();
        assert!(stop_at.elapsed() < Duration::from_millis(500));
        assert!(!dmx_bus.is_running());
    }

    #[test]
    fn test_setter_closed_after_stop() {
        set_env();
        let mut dmx_bus = DmxBus::new("test_dmx_bus", FrameTiming::default());
        let setter = dmx_bus.setter();
        setter.set_channel(1, 1).unwrap();
        dmx_bus.start(DummyTransport::new("dummy")).unwrap();
        dmx_bus.stop().unwrap();
        assert!(matches!(setter.set_channel(1, 2), Err(DriverError::Closed)));
        assert_eq!(dmx_bus.snapshot().channel(1), Some(1));
    }

    #[test]
    fn test_drop_stops_worker() {
        set_env();
        let transport = DummyTransport::new("dummy");
        let handle = transport.handle();
        {
            let mut dmx_bus = DmxBus::new("test_dmx_bus", FrameTiming::default());
            dmx_bus.start(transport).unwrap();
            assert!(wait_for(|| !handle.frames().is_empty()));
        }
        let count = handle.frames().len();
        thread::sleep(Duration::from_millis(100));
        assert_eq!(handle.frames().len(), count);
    }
}
