use std::sync::atomic::{AtomicU64, Ordering};

// dmx 线程指令对象，用于给线程下达指令用
#[derive(Debug)]
pub enum DmxThreadCommandEnum {
    // 停止线程并关闭端口
    Stop,
}

/// frame counters updated by the worker
#[derive(Debug, Default)]
pub struct DmxBusStats {
    frames_sent: AtomicU64,
    frames_failed: AtomicU64,
}

impl DmxBusStats {
    pub fn record_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.frames_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn to_bo(&self) -> DmxBusStatsBo {
        DmxBusStatsBo {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_failed: self.frames_failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DmxBusStatsBo {
    pub frames_sent: u64,
    pub frames_failed: u64,
}
