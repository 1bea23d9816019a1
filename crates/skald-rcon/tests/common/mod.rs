//! In-process fake console server for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use skald_core::RconSettings;
use skald_rcon::{PacketType, RconCodec, RconEvent, RconPacket};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;

/// How the fake server answers a command.
pub enum Reply {
    /// One response packet per body, all with the command's id.
    Packets(Vec<String>),
    /// Never answer again on this connection.
    Silent,
    /// Drop the connection.
    Close,
}

type Handler = Arc<dyn Fn(&str) -> Reply + Send + Sync>;

pub struct FakeServer {
    pub addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl FakeServer {
    pub async fn spawn(
        password: &str,
        handler: impl Fn(&str) -> Reply + Send + Sync + 'static,
    ) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let handler: Handler = Arc::new(handler);
        let password = password.to_string();

        let counter = Arc::clone(&connections);
        let task = tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    return;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve(socket, password.clone(), Arc::clone(&handler)));
            }
        });

        Self {
            addr,
            connections,
            task,
        }
    }

    /// Echoes every command back as `echo <command>`.
    pub async fn echo(password: &str) -> Self {
        Self::spawn(password, |command| {
            Reply::Packets(vec![format!("echo {command}")])
        })
        .await
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn settings(&self, password: &str) -> RconSettings {
        RconSettings {
            enabled: true,
            host: self.addr.ip().to_string(),
            port: self.addr.port(),
            password: password.to_string(),
            auto_reconnect: true,
            reconnect_delay_ms: 50,
            poll_interval_ms: 0,
            timeout_ms: 2_000,
        }
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(socket: TcpStream, password: String, handler: Handler) {
    let mut framed = Framed::new(socket, RconCodec::server());
    let mut silent = false;

    while let Some(Ok(packet)) = framed.next().await {
        if silent {
            continue;
        }
        match packet.kind {
            PacketType::Auth => {
                // Source-style servers send an empty response value first
                let _ = framed.feed(RconPacket::response(packet.id, "")).await;
                let id = if packet.body == password { packet.id } else { -1 };
                if framed.send(RconPacket::auth_response(id)).await.is_err() {
                    return;
                }
            }
            PacketType::ExecCommand if packet.body.is_empty() => {
                if framed.send(RconPacket::response(packet.id, "")).await.is_err() {
                    return;
                }
            }
            PacketType::ExecCommand => match handler(&packet.body) {
                Reply::Packets(bodies) => {
                    for body in bodies {
                        let _ = framed.feed(RconPacket::response(packet.id, &body)).await;
                    }
                    if framed.flush().await.is_err() {
                        return;
                    }
                }
                Reply::Silent => silent = true,
                Reply::Close => return,
            },
            _ => {}
        }
    }
}

pub async fn next_event(events: &mut broadcast::Receiver<RconEvent>) -> RconEvent {
    tokio::time::timeout(Duration::from_secs(3), events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}
