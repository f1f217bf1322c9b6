use hermes_regbus::{RegisterBus, RegisterWindow};
use tokio::time::Instant;

use crate::config::BridgeConfig;
use crate::error::{BridgeError, FrameError};
use crate::frame;
use crate::status::StatusSnapshot;
use crate::transport::Transport;

/// Counters kept across the lifetime of a [`Bridge`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BridgeStats {
    /// Datagrams received.
    pub requests: u64,
    /// Replies handed to the transport.
    pub replies: u64,
    /// Transactions that never saw the reply counter move.
    pub timeouts: u64,
    /// Datagrams skipped because they could not be framed.
    pub rejected: u64,
    pub receive_errors: u64,
    pub send_errors: u64,
}

/// Drives request/reply transactions between a [`Transport`] and the transactor page buffer.
///
/// Transactions run strictly one at a time: a datagram is placed, answered and replied to before
/// the next one is received.
pub struct Bridge<W, T> {
    bus: RegisterBus<W>,
    transport: T,
    config: BridgeConfig,
    stats: BridgeStats,
}

impl<W, T> Bridge<W, T>
where
    W: RegisterWindow,
    T: Transport,
{
    pub fn new(bus: RegisterBus<W>, transport: T, config: BridgeConfig) -> Self {
        Self {
            bus,
            transport,
            config,
            stats: BridgeStats::default(),
        }
    }

    pub fn stats(&self) -> BridgeStats {
        self.stats
    }

    /// Reads the current status block.
    pub fn status(&self) -> Result<StatusSnapshot, BridgeError> {
        Ok(StatusSnapshot::read(&self.bus)?)
    }

    /// Serves datagrams until a fatal error occurs, and returns that error.
    ///
    /// Receive, framing and send failures only cost the datagram they happened on.
    pub async fn run(&mut self) -> BridgeError {
        // One spare byte so an oversized datagram is seen instead of silently truncated.
        let mut buf = vec![0u8; self.config.max_datagram_bytes.saturating_add(1)];
        loop {
            match self.serve_one(&mut buf).await {
                Ok(()) => {}
                Err(err) if err.is_fatal() => {
                    tracing::error!(stats = ?self.stats, "bridge loop terminated: {err}");
                    return err;
                }
                Err(err) => tracing::warn!("{err}"),
            }
        }
    }

    /// Receives one datagram, runs its transaction and sends the reply back to the sender.
    pub async fn serve_one(&mut self, buf: &mut [u8]) -> Result<(), BridgeError> {
        let (len, peer) = match self.transport.recv_from(buf).await {
            Ok(received) => received,
            Err(err) => {
                self.stats.receive_errors += 1;
                return Err(BridgeError::ReceiveFailure(err));
            }
        };
        self.stats.requests += 1;
        tracing::debug!(%peer, len, "received datagram");

        let reply = match self.transact(&buf[..len]).await {
            Ok(reply) => reply,
            Err(err) => {
                match &err {
                    BridgeError::Frame(_) => self.stats.rejected += 1,
                    BridgeError::ReplyTimeout { .. } => self.stats.timeouts += 1,
                    _ => {}
                }
                return Err(err);
            }
        };

        if let Err(source) = self.transport.send_to(&reply, peer).await {
            self.stats.send_errors += 1;
            return Err(BridgeError::SendFailure { peer, source });
        }
        self.stats.replies += 1;
        tracing::debug!(%peer, len = reply.len(), "sent reply");
        Ok(())
    }

    /// Places `datagram` in the next request page, waits for the transactor and returns the
    /// reply bytes.
    pub async fn transact(&mut self, datagram: &[u8]) -> Result<Vec<u8>, BridgeError> {
        let max = self.config.max_datagram_bytes;
        if datagram.len() > max {
            return Err(FrameError::DatagramTooLong {
                len: datagram.len(),
                max,
            }
            .into());
        }
        let packet = frame::datagram_to_words(datagram, self.config.partial_word_policy)?;
        let request = frame::encode_request(&packet)?;
        trace_words("request", &packet);

        let status = StatusSnapshot::read(&self.bus)?;
        tracing::trace!(%status, "status before request");
        let request_base = status.request_base();
        let baseline = status.reply_counter;

        self.bus.write_word(request_base, request.header)?;
        self.bus.write_block(request_base + 1, request.payload)?;

        self.await_reply(baseline).await?;

        let reply_base = frame::reply_base(request_base);
        let reply_header = self.bus.read_word(reply_base)?;
        let reply_len = frame::decode_reply_length(reply_header);
        let reply = self.bus.read_block(reply_base + 1, reply_len)?;
        trace_words("reply", &reply);

        Ok(frame::words_to_bytes(&reply))
    }

    /// Polls the status block until the reply counter moves away from `baseline`.
    async fn await_reply(&self, baseline: u32) -> Result<StatusSnapshot, BridgeError> {
        let start = Instant::now();
        let mut polls = 0u64;
        loop {
            let status = StatusSnapshot::read(&self.bus)?;
            polls += 1;
            tracing::trace!(%status, polls, "polled status");

            if self.config.skip_reply_count_check || status.reply_counter != baseline {
                return Ok(status);
            }

            let elapsed = start.elapsed();
            if elapsed > self.config.reply_timeout {
                return Err(BridgeError::ReplyTimeout {
                    elapsed,
                    baseline,
                    polls,
                });
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}

fn trace_words(what: &str, words: &[u32]) {
    if tracing::enabled!(tracing::Level::TRACE) {
        for (i, word) in words.iter().enumerate() {
            tracing::trace!("{what}[{i}] = 0x{word:08x}");
        }
    }
}

