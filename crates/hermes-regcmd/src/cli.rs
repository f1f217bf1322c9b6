use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use hermes_regbus::{num, DeviceError, DeviceProfile, DEFAULT_MEM_DEVICE};

use crate::server::{CommandServiceConfig, DEFAULT_COMMAND_PORT};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "hermes-regcmd",
    version,
    about = "Serve masked register reads and writes as line-delimited JSON commands."
)]
pub struct CommandArgs {
    /// Board whose register window is mapped (zcu102, wib).
    ///
    /// Environment variable: `HERMES_DEVICE`.
    #[arg(short, long, env = "HERMES_DEVICE")]
    pub device: Option<String>,

    /// Physical base address of the register window; overrides the board table.
    #[arg(long, env = "HERMES_BASE_ADDRESS", value_parser = parse_u64)]
    pub base_address: Option<u64>,

    /// Length of the register window in 32-bit words.
    #[arg(long, env = "HERMES_LENGTH_WORDS", value_parser = parse_usize)]
    pub length_words: Option<usize>,

    /// Memory device the register window is mapped through.
    #[arg(long, env = "HERMES_MEM_DEVICE", default_value = DEFAULT_MEM_DEVICE)]
    pub mem_device: PathBuf,

    /// Address the command listener binds to.
    ///
    /// Environment variable: `HERMES_REGCMD_BIND`.
    #[arg(short, long, env = "HERMES_REGCMD_BIND", default_value_t = SocketAddr::from(([0, 0, 0, 0], DEFAULT_COMMAND_PORT)))]
    pub bind: SocketAddr,

    /// Log filter (tracing-subscriber EnvFilter syntax). Defaults to `RUST_LOG`, then `info`.
    #[arg(long, env = "HERMES_LOG_LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CommandSettings {
    pub device: DeviceProfile,
    pub mem_device: PathBuf,
    pub log_filter: Option<String>,
    pub service: CommandServiceConfig,
}

impl CommandArgs {
    pub fn into_settings(self) -> Result<CommandSettings, DeviceError> {
        let device = DeviceProfile::resolve(
            self.device.as_deref(),
            self.base_address,
            self.length_words,
        )?;
        Ok(CommandSettings {
            device,
            mem_device: self.mem_device,
            log_filter: self.log_level,
            service: CommandServiceConfig {
                bind_addr: self.bind,
            },
        })
    }
}

fn parse_u64(s: &str) -> Result<u64, String> {
    num::parse_u64(s).ok_or_else(|| format!("invalid number {s:?}"))
}

fn parse_usize(s: &str) -> Result<usize, String> {
    parse_u64(s)?
        .try_into()
        .map_err(|_| format!("{s:?} does not fit in usize"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = CommandArgs::try_parse_from(["hermes-regcmd", "-d", "wib"])
            .unwrap()
            .into_settings()
            .unwrap();
        assert_eq!(settings.device.base_address, 0xA002_0000);
        assert_eq!(settings.service.bind_addr.port(), 5556);
    }

    #[test]
    fn device_is_required() {
        let err = CommandArgs::try_parse_from(["hermes-regcmd"])
            .unwrap()
            .into_settings()
            .unwrap_err();
        assert_eq!(err, DeviceError::Unspecified);
    }
}
