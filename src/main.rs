use dmx_bridge_rs::common::logger::init_logger;
use dmx_bridge_rs::common::setting::Settings;
use dmx_bridge_rs::driver::dmx::{DmxBus, DmxCaller, DmxTransport};
use dmx_bridge_rs::driver::transport::{DummyTransport, SerialTransport};
use dmx_bridge_rs::{debug, error, info, warn};
use crossbeam::channel::{self, RecvTimeoutError};
use dotenv::dotenv;
use std::error::Error;
use std::time::Duration;

const LOG_TAG: &str = "main";

// how often main checks that the worker is still alive
const WATCH_INTERVAL_MILLIS: u64 = 500;

fn main() -> Result<(), Box<dyn Error>> {
    // 检查 env 文件
    dotenv().ok();

    // 加载 config
    let settings = Settings::get();

    // 设置 logger
    init_logger()?;
    info!(LOG_TAG, "配置已加载，环境: {:?}", settings.env.env);
    debug!(LOG_TAG, "配置: {:?}", settings);

    let mut dmx_bus = DmxBus::new("dmx_bus", settings.dmx.frame_timing());
    let setter = dmx_bus.setter();
    for preset in &settings.dmx.preset {
        if let Err(e) = setter.set_channel(preset.channel, preset.value) {
            warn!(LOG_TAG, "preset skipped: {}", e);
        }
    }

    let transport: Box<dyn DmxTransport> = if settings.dmx.use_dummy() {
        info!(LOG_TAG, "dummy mode, serial port will not be open");
        Box::new(DummyTransport::new("dummy"))
    } else {
        Box::new(SerialTransport::open(&settings.dmx.serial_port)?)
    };

    if let Err(e) = dmx_bus.start(transport) {
        error!(LOG_TAG, "cannot start dmx bus: {}", e);
        return Err(e.into());
    }

    // the network listener drives `setter` from here on
    let (shutdown_tx, shutdown_rx) = channel::bounded(1);
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.try_send(());
    })?;

    loop {
        match shutdown_rx.recv_timeout(Duration::from_millis(WATCH_INTERVAL_MILLIS)) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                info!(LOG_TAG, "shutdown signal received");
                break;
            }
            Err(RecvTimeoutError::Timeout) => {
                if !dmx_bus.is_running() {
                    error!(LOG_TAG, "dmx worker exited unexpectedly");
                    break;
                }
            }
        }
    }

    dmx_bus.stop()?;
    info!(LOG_TAG, "dmx bus stopped, bye");
    Ok(())
}
