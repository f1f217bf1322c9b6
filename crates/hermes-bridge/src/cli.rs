use std::{net::SocketAddr, path::PathBuf, time::Duration};

use clap::Parser;
use hermes_regbus::{num, DeviceError, DeviceProfile, DEFAULT_MEM_DEVICE};

use crate::config::{
    BridgeConfig, PartialWordPolicy, ReplySocket, DEFAULT_MAX_DATAGRAM_BYTES, DEFAULT_UDP_PORT,
};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "hermes-udp-bridge",
    version,
    about = "Bridge register-access UDP packets to a memory-mapped bus transactor."
)]
pub struct BridgeArgs {
    /// Board whose register window is mapped (zcu102, wib).
    ///
    /// Environment variable: `HERMES_DEVICE`.
    #[arg(short, long, env = "HERMES_DEVICE")]
    pub device: Option<String>,

    /// Physical base address of the register window; overrides the board table.
    ///
    /// Environment variable: `HERMES_BASE_ADDRESS`.
    #[arg(long, env = "HERMES_BASE_ADDRESS", value_parser = parse_u64)]
    pub base_address: Option<u64>,

    /// Length of the register window in 32-bit words.
    ///
    /// Environment variable: `HERMES_LENGTH_WORDS`.
    #[arg(long, env = "HERMES_LENGTH_WORDS", value_parser = parse_usize)]
    pub length_words: Option<usize>,

    /// Memory device the register window is mapped through.
    #[arg(long, env = "HERMES_MEM_DEVICE", default_value = DEFAULT_MEM_DEVICE)]
    pub mem_device: PathBuf,

    /// Address the UDP listener binds to.
    ///
    /// Environment variable: `HERMES_BRIDGE_BIND`.
    #[arg(long, env = "HERMES_BRIDGE_BIND", default_value_t = SocketAddr::from(([0, 0, 0, 0], DEFAULT_UDP_PORT)))]
    pub bind: SocketAddr,

    /// Do not wait for the transactor's reply counter to change before reading the reply.
    #[arg(long, env = "HERMES_SKIP_REPLY_COUNT_CHECK")]
    pub skip_reply_count_check: bool,

    /// Time allowed for the transactor to post a reply.
    #[arg(long, env = "HERMES_REPLY_TIMEOUT_MS", default_value_t = 1000)]
    pub reply_timeout_ms: u64,

    /// Sleep between two status polls.
    #[arg(long, env = "HERMES_POLL_INTERVAL_US", default_value_t = 1000)]
    pub poll_interval_us: u64,

    /// Drop a trailing partial word instead of rejecting the datagram.
    #[arg(long, env = "HERMES_TRUNCATE_PARTIAL_WORDS")]
    pub truncate_partial_words: bool,

    /// Send replies from the listening socket instead of a fresh ephemeral one.
    #[arg(long, env = "HERMES_REPLY_FROM_LISTENER")]
    pub reply_from_listener: bool,

    /// Largest datagram accepted, in bytes; longer datagrams are rejected.
    #[arg(long, env = "HERMES_MAX_DATAGRAM_BYTES", default_value_t = DEFAULT_MAX_DATAGRAM_BYTES)]
    pub max_datagram_bytes: usize,

    /// Log filter (tracing-subscriber EnvFilter syntax). Defaults to `RUST_LOG`, then `info`.
    ///
    /// Environment variable: `HERMES_LOG_LEVEL`.
    #[arg(long, env = "HERMES_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Dump status blocks and packet words (same as `--log-level trace`).
    #[arg(short, long)]
    pub verbose: bool,
}

/// Everything the bridge binary needs once arguments are validated.
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub device: DeviceProfile,
    pub mem_device: PathBuf,
    pub log_filter: Option<String>,
    pub bridge: BridgeConfig,
}

impl BridgeArgs {
    pub fn into_settings(self) -> Result<BridgeSettings, DeviceError> {
        let device = DeviceProfile::resolve(
            self.device.as_deref(),
            self.base_address,
            self.length_words,
        )?;

        let log_filter = if self.verbose {
            Some("trace".to_string())
        } else {
            self.log_level
        };

        let bridge = BridgeConfig {
            bind_addr: self.bind,
            poll_interval: Duration::from_micros(self.poll_interval_us),
            reply_timeout: Duration::from_millis(self.reply_timeout_ms),
            skip_reply_count_check: self.skip_reply_count_check,
            partial_word_policy: if self.truncate_partial_words {
                PartialWordPolicy::Truncate
            } else {
                PartialWordPolicy::Reject
            },
            max_datagram_bytes: self.max_datagram_bytes,
            reply_socket: if self.reply_from_listener {
                ReplySocket::Listener
            } else {
                ReplySocket::Ephemeral
            },
        };

        Ok(BridgeSettings {
            device,
            mem_device: self.mem_device,
            log_filter,
            bridge,
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
    fn defaults_match_the_transactor_contract() {
        let settings = BridgeArgs::try_parse_from(["hermes-udp-bridge", "--device", "zcu102"])
            .unwrap()
            .into_settings()
            .unwrap();

        assert_eq!(settings.device.base_address, 0x8000_0000);
        assert_eq!(settings.mem_device, PathBuf::from("/dev/mem"));
        assert_eq!(settings.bridge.bind_addr.port(), 50001);
        assert_eq!(settings.bridge.poll_interval, Duration::from_millis(1));
        assert_eq!(settings.bridge.reply_timeout, Duration::from_secs(1));
        assert!(!settings.bridge.skip_reply_count_check);
        assert_eq!(settings.bridge.partial_word_policy, PartialWordPolicy::Reject);
        assert_eq!(settings.bridge.reply_socket, ReplySocket::Ephemeral);
        assert_eq!(settings.log_filter, None);
    }

    #[test]
    fn hex_base_address_and_flags() {
        let settings = BridgeArgs::try_parse_from([
            "hermes-udp-bridge",
            "--base-address",
            "0xA002_0000",
            "--length-words",
            "0x400",
            "--skip-reply-count-check",
            "--truncate-partial-words",
            "--reply-from-listener",
            "-v",
        ])
        .unwrap()
        .into_settings()
        .unwrap();

        assert_eq!(settings.device.base_address, 0xA002_0000);
        assert_eq!(settings.device.length_words, 0x400);
        assert!(settings.bridge.skip_reply_count_check);
        assert_eq!(settings.bridge.partial_word_policy, PartialWordPolicy::Truncate);
        assert_eq!(settings.bridge.reply_socket, ReplySocket::Listener);
        assert_eq!(settings.log_filter.as_deref(), Some("trace"));
    }

    #[test]
    fn unknown_device_is_rejected() {
        let err = BridgeArgs::try_parse_from(["hermes-udp-bridge", "-d", "vc709"])
            .unwrap()
            .into_settings()
            .unwrap_err();
        assert!(matches!(err, DeviceError::Unknown { .. }));
    }

    #[test]
    fn bad_number_is_a_parse_error() {
        assert!(BridgeArgs::try_parse_from(["hermes-udp-bridge", "--base-address", "0xzz"]).is_err());
    }
}
