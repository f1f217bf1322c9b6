#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use hermes_bridge::Transport;
use hermes_regbus::MemoryWindow;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

pub const CLIENT: SocketAddr = SocketAddr::new(
    std::net::IpAddr::V4(std::net::Ipv4Addr::new(192, 0, 2, 10)),
    50002,
);

/// Builds a simulated page buffer whose status block reads
/// `{buffer_count, words_per_page, next_request_page, reply_counter}`.
pub fn hardware(
    buffer_count: u32,
    words_per_page: u32,
    next_request_page: u32,
    reply_counter: u32,
) -> MemoryWindow {
    let hw = MemoryWindow::new((buffer_count * words_per_page) as usize);
    hw.write_words(
        0,
        &[buffer_count, words_per_page, next_request_page, reply_counter],
    )
    .unwrap();
    hw
}

pub fn to_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_ne_bytes()).collect()
}

type Inbound = io::Result<(Vec<u8>, SocketAddr)>;

/// In-memory [`Transport`]: the test pushes datagrams (or receive errors) in and collects
/// replies. Once every sender is dropped, `recv_from` blocks forever.
pub struct ChannelTransport {
    inbound: Mutex<mpsc::UnboundedReceiver<Inbound>>,
    outbound: mpsc::UnboundedSender<(Vec<u8>, SocketAddr)>,
}

pub struct ClientEnd {
    pub inbound: mpsc::UnboundedSender<Inbound>,
    pub replies: mpsc::UnboundedReceiver<(Vec<u8>, SocketAddr)>,
}

impl ClientEnd {
    pub fn send(&self, datagram: Vec<u8>) {
        self.inbound.send(Ok((datagram, CLIENT))).unwrap();
    }

    pub fn fail_receive(&self, kind: io::ErrorKind) {
        self.inbound.send(Err(kind.into())).unwrap();
    }
}

pub fn channel_transport() -> (ChannelTransport, ClientEnd) {
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    (
        ChannelTransport {
            inbound: Mutex::new(in_rx),
            outbound: out_tx,
        },
        ClientEnd {
            inbound: in_tx,
            replies: out_rx,
        },
    )
}

impl Transport for ChannelTransport {
    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        let next = self.inbound.lock().await.recv().await;
        match next {
            Some(Ok((datagram, peer))) => {
                let len = datagram.len().min(buf.len());
                buf[..len].copy_from_slice(&datagram[..len]);
                Ok((len, peer))
            }
            Some(Err(err)) => Err(err),
            None => std::future::pending().await,
        }
    }

    async fn send_to(&self, bytes: &[u8], peer: SocketAddr) -> io::Result<usize> {
        self.outbound
            .send((bytes.to_vec(), peer))
            .map_err(|_| io::Error::from(io::ErrorKind::BrokenPipe))?;
        Ok(bytes.len())
    }
}

/// A request observed by the simulated transactor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenRequest {
    pub base: usize,
    pub header: u32,
    pub packet: Vec<u32>,
}

/// Plays the transactor: waits for a request header in the announced page, answers it
/// `latency` later, then advances the page index and bumps the reply counter.
///
/// Page 0 shares its first words with the status block in this simulation, so the page ring
/// wraps back to page 1.
pub fn spawn_transactor<F>(
    hw: MemoryWindow,
    latency: Duration,
    respond: F,
) -> (JoinHandle<()>, mpsc::UnboundedReceiver<SeenRequest>)
where
    F: Fn(&[u32]) -> Vec<u32> + Send + 'static,
{
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_millis(1)).await;

            let status = hw.read_words(0, 4).unwrap();
            let (buffer_count, words_per_page, page, replies) =
                (status[0], status[1], status[2], status[3]);
            let base = (words_per_page * page) as usize;

            let header = hw.read_word(base).unwrap();
            if header == 0 {
                continue;
            }
            let len = (header & 0xFFFF) as usize + 1;
            let packet = hw.read_words(base + 1, len).unwrap();
            let _ = seen_tx.send(SeenRequest {
                base,
                header,
                packet: packet.clone(),
            });

            tokio::time::sleep(latency).await;

            let reply = respond(&packet);
            let reply_header = match reply.len() {
                0 => 0,
                n => (1 << 16) | (n as u32 - 1),
            };
            hw.write_word(base + 4, reply_header).unwrap();
            hw.write_words(base + 5, &reply).unwrap();
            hw.write_word(base, 0).unwrap();
            let next_page = if page + 1 >= buffer_count { 1 } else { page + 1 };
            hw.write_word(2, next_page).unwrap();
            hw.write_word(3, replies.wrapping_add(1)).unwrap();
        }
    });
    (task, seen_rx)
}
