//! setting config file
//! - `ENV` selects `config_{ENV}.toml`, default `dev`
//! - every key has a default, a missing file falls back to defaults

use std::{env, fs, path::Path, time::Duration};
use lazy_static::lazy_static;
use serde_derive::Deserialize;
use super::error::SettingError;
use crate::driver::dmx::frame_encoder::{BreakMode, FrameTiming};
use crate::driver::dmx::prelude::*;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Env {
    pub env: String,
    pub log_level: String,
}

impl Default for Env {
    fn default() -> Self {
        Env {
            env: String::from("dev"),
            log_level: String::from("info"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Serial,
    Dummy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakModeKind {
    BaudSwitch,
    Native,
}

/// channel value applied once before the first frame
#[derive(Debug, Clone, Deserialize)]
pub struct PresetChannel {
    pub channel: i64,
    pub value: i64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Dmx {
    pub transport: TransportKind,
    pub serial_port: String,
    pub refresh_interval_ms: u64,
    pub mark_after_break_us: u64,
    pub break_mode: BreakModeKind,
    pub break_baud: u32,
    pub native_break_us: u64,
    pub start_code: u8,
    pub preset: Vec<PresetChannel>,
}

impl Default for Dmx {
    fn default() -> Self {
        Dmx {
            transport: TransportKind::Serial,
            serial_port: String::from("/dev/ttyUSB0"),
            refresh_interval_ms: DEFAULT_REFRESH_MILLIS,
            mark_after_break_us: DEFAULT_MAB_MICROS,
            break_mode: BreakModeKind::BaudSwitch,
            break_baud: BREAK_BAUD,
            native_break_us: DEFAULT_NATIVE_BREAK_MICROS,
            start_code: DMX_NULL_START,
            preset: Vec::new(),
        }
    }
}

impl Dmx {
    pub fn frame_timing(&self) -> FrameTiming {
        let break_mode = match self.break_mode {
            BreakModeKind::BaudSwitch => BreakMode::BaudSwitch { baud_rate: self.break_baud },
            BreakModeKind::Native => BreakMode::Native {
                duration: Duration::from_micros(self.native_break_us),
            },
        };
        FrameTiming {
            break_mode,
            mark_after_break: Duration::from_micros(self.mark_after_break_us),
            refresh_interval: Duration::from_millis(self.refresh_interval_ms),
            start_code: self.start_code,
        }
    }

    /// `mode=dummy` in the environment overrides the configured transport
    pub fn use_dummy(&self) -> bool {
        let env_mode = env::var("mode").unwrap_or("real".to_string());
        self.transport == TransportKind::Dummy || env_mode == "dummy"
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub env: Env,
    pub dmx: Dmx,
}

impl Settings {
    pub fn parse(content: &str) -> Result<Self, SettingError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| SettingError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    /// load `config_{ENV}.toml` from the working directory
    pub fn from_env() -> Result<Self, SettingError> {
        let env = env::var("ENV").unwrap_or("dev".to_string());
        Self::load(format!("config_{}.toml", env))
    }

    pub fn get<'a>() -> &'a Self {
        // 给静态变量延迟赋值的宏
        lazy_static! {
            static ref CACHE: Settings = Settings::from_env().unwrap_or_else(|e| {
                eprintln!("{}, using default settings", e);
                Settings::default()
            });
        }
        &CACHE
    }
}
