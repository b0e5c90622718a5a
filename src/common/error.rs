use thiserror::Error;

/// dmx driver error
#[derive(Debug, Error)]
pub enum DriverError {
    /// channel not in 1..=512 or value not in 0..=255, rejected before touching the buffer
    #[error("channel update out of range, channel = {channel}, value = {value}")]
    OutOfRange { channel: i64, value: i64 },

    /// the transport refused a line setting, fatal for that transport
    #[error("transport configuration error: {0}")]
    Configuration(String),

    /// a write, flush or purge failed, only the current frame is lost
    #[error("transport io error: {0}")]
    TransientIo(String),

    /// the bus is shutting down and no longer accepts updates
    #[error("dmx bus closed, update rejected")]
    Closed,

    #[error("dmx bus is already running")]
    AlreadyRunning,

    #[error("dmx bus is not running")]
    NotRunning,

    /// worker thread could not be spawned or panicked
    #[error("dmx worker thread error: {0}")]
    Thread(String),
}

/// settings loading error
#[derive(Debug, Error)]
pub enum SettingError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config file format invalid: {0}")]
    Parse(#[from] toml::de::Error),
}
