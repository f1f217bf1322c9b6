use std::net::SocketAddr;
use std::time::Duration;

use hermes_regbus::{MemoryWindow, RegisterBus};
use hermes_regcmd::{start_server, CommandServiceConfig, ServerHandle};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

struct Client {
    lines: tokio::io::Lines<BufReader<OwnedReadHalf>>,
    write: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read, write) = stream.into_split();
        Self {
            lines: BufReader::new(read).lines(),
            write,
        }
    }

    async fn request(&mut self, line: &str) -> String {
        self.write.write_all(line.as_bytes()).await.unwrap();
        self.write.write_all(b"\n").await.unwrap();
        tokio::time::timeout(Duration::from_secs(2), self.lines.next_line())
            .await
            .expect("reply within 2s")
            .unwrap()
            .expect("connection open")
    }
}

async fn start(hw: &MemoryWindow) -> ServerHandle {
    let cfg = CommandServiceConfig {
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
    };
    start_server(cfg, RegisterBus::new(hw.clone())).await.unwrap()
}

#[tokio::test]
async fn masked_read_and_write_over_tcp() {
    let hw = MemoryWindow::new(16);
    hw.write_word(3, 0xDEAD_BEEF).unwrap();
    let server = start(&hw).await;
    let mut client = Client::connect(server.local_addr()).await;

    assert_eq!(
        client
            .request(r#"{"cmd":"read","addr":"0x3","mask":"0xffff0000"}"#)
            .await,
        r#"{"read_val":"0xdead"}"#
    );
    assert_eq!(
        client
            .request(r#"{"cmd":"write","addr":3,"mask":"0xff","val":"0x12"}"#)
            .await,
        r#"{"write_done":true}"#
    );
    assert_eq!(hw.read_word(3).unwrap(), 0xDEAD_BE12);

    server.shutdown().await;
}

#[tokio::test]
async fn errors_keep_the_connection_open() {
    let hw = MemoryWindow::new(4);
    let server = start(&hw).await;
    let mut client = Client::connect(server.local_addr()).await;

    assert_eq!(client.request("{oops").await, r#"{"err":"InvalidJSONFormat"}"#);
    assert_eq!(
        client.request(r#"{"cmd":"peek","addr":0,"mask":1}"#).await,
        r#"{"err":"InvalidCommand"}"#
    );
    let out_of_range = client
        .request(r#"{"cmd":"read","addr":9,"mask":"0xffffffff"}"#)
        .await;
    assert!(out_of_range.starts_with(r#"{"err":"BusError","#), "{out_of_range}");

    hw.write_word(0, 7).unwrap();
    assert_eq!(
        client
            .request(r#"{"cmd":"read","addr":0,"mask":"0xffffffff"}"#)
            .await,
        r#"{"read_val":"0x7"}"#
    );

    server.shutdown().await;
}

#[tokio::test]
async fn connections_share_one_bus() {
    let hw = MemoryWindow::new(4);
    let server = start(&hw).await;
    let mut writer = Client::connect(server.local_addr()).await;
    let mut reader = Client::connect(server.local_addr()).await;

    writer
        .request(r#"{"cmd":"write","addr":1,"mask":"0xf0","val":5}"#)
        .await;
    assert_eq!(
        reader.request(r#"{"cmd":"read","addr":1,"mask":"0xf0"}"#).await,
        r#"{"read_val":"0x5"}"#
    );

    server.shutdown().await;
}

#[tokio::test]
async fn shutdown_closes_open_connections() {
    let hw = MemoryWindow::new(4);
    let server = start(&hw).await;
    let mut client = Client::connect(server.local_addr()).await;
    assert_eq!(
        client.request(r#"{"cmd":"read","addr":0,"mask":1}"#).await,
        r#"{"read_val":"0x0"}"#
    );

    server.shutdown().await;

    let closed = tokio::time::timeout(Duration::from_secs(2), client.lines.next_line())
        .await
        .expect("connection closed within 2s");
    assert!(matches!(closed, Ok(None) | Err(_)), "{closed:?}");
}
