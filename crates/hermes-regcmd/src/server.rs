use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use hermes_regbus::{RegisterBus, RegisterWindow};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};

use crate::command::{execute, parse_request, Reply};

/// Default TCP port of the command service.
pub const DEFAULT_COMMAND_PORT: u16 = 5556;

#[derive(Debug, Clone)]
pub struct CommandServiceConfig {
    pub bind_addr: SocketAddr,
}

impl Default for CommandServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_COMMAND_PORT)),
        }
    }
}

/// Shares one [`RegisterBus`] between connections; each command holds the lock for exactly one
/// masked access.
pub struct CommandService<W> {
    bus: Arc<Mutex<RegisterBus<W>>>,
}

impl<W> Clone for CommandService<W> {
    fn clone(&self) -> Self {
        Self {
            bus: Arc::clone(&self.bus),
        }
    }
}

impl<W: RegisterWindow> CommandService<W> {
    pub fn new(bus: RegisterBus<W>) -> Self {
        Self {
            bus: Arc::new(Mutex::new(bus)),
        }
    }

    /// Handles one request line and returns the reply.
    pub fn handle_line(&self, line: &str) -> Reply {
        let command = match parse_request(line) {
            Ok(command) => command,
            Err(err) => {
                tracing::warn!(request = line, "rejected command: {err}");
                return err.into();
            }
        };

        let mut bus = self.bus.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match execute(&mut *bus, command) {
            Ok(reply) => reply,
            Err(err) => {
                tracing::error!(?command, "command failed: {err}");
                err.into()
            }
        }
    }
}

/// Running command listener.
///
/// [`ServerHandle::shutdown`] stops accepting and closes every open connection. Dropping the
/// handle aborts the listener task, which also aborts its connections.
pub struct ServerHandle {
    addr: SocketAddr,
    stop: Option<oneshot::Sender<()>>,
    listener: JoinHandle<()>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let _ = (&mut self.listener).await;
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

/// Binds the command listener and serves newline-delimited JSON requests until shut down.
pub async fn start_server<W>(
    cfg: CommandServiceConfig,
    bus: RegisterBus<W>,
) -> std::io::Result<ServerHandle>
where
    W: RegisterWindow + Send + 'static,
{
    let listener = TcpListener::bind(cfg.bind_addr).await?;
    let addr = listener.local_addr()?;
    let service = CommandService::new(bus);
    let (stop, stop_rx) = oneshot::channel::<()>();

    let listener = tokio::spawn(accept_loop(listener, service, stop_rx));

    Ok(ServerHandle {
        addr,
        stop: Some(stop),
        listener,
    })
}

async fn accept_loop<W>(
    listener: TcpListener,
    service: CommandService<W>,
    mut stop: oneshot::Receiver<()>,
) where
    W: RegisterWindow + Send + 'static,
{
    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            _ = &mut stop => break,
            Some(finished) = connections.join_next(), if !connections.is_empty() => {
                if let Err(err) = finished {
                    tracing::warn!("command connection task failed: {err}");
                }
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tracing::debug!(%peer, "command connection opened");
                    let service = service.clone();
                    connections.spawn(async move {
                        if let Err(err) = serve_connection(stream, service).await {
                            tracing::debug!(%peer, "command connection ended: {err}");
                        }
                    });
                }
                Err(err) => tracing::warn!("accept failed: {err}"),
            },
        }
    }

    tracing::info!(open = connections.len(), "command listener stopped; closing connections");
    connections.shutdown().await;
}

async fn serve_connection<W: RegisterWindow>(
    stream: TcpStream,
    service: CommandService<W>,
) -> std::io::Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut reply = service.handle_line(line).to_json();
        reply.push('\n');
        write.write_all(reply.as_bytes()).await?;
    }
    Ok(())
}
