//! Scripted fake MPD daemon shared by client and watcher tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

/// What the fake daemon does with one command line.
pub enum Reply {
    /// Write this text (must include the `OK`/`ACK` terminator).
    Text(String),
    /// Close the connection without answering.
    Hangup,
    /// Never answer (like `idle` with nothing changing).
    Silence,
    /// Write `head`, wait, then write `tail`.
    Stalled {
        head: String,
        pause: Duration,
        tail: String,
    },
}

impl Reply {
    pub fn ok(body: &str) -> Self {
        Self::Text(format!("{}OK\n", body))
    }
}

/// Handle to a running fake daemon.
pub struct FakeMpd {
    pub addr: String,
    /// Every command line received, across all connections.
    pub commands: Arc<Mutex<Vec<String>>>,
    /// Number of accepted connections.
    pub connections: Arc<AtomicUsize>,
}

impl FakeMpd {
    pub fn received(&self) -> Vec<String> {
        self.commands.lock().clone()
    }
}

/// Spawns a fake daemon that greets every connection and answers each
/// command line with `respond(line)`.
pub async fn spawn_fake_mpd<F>(respond: F) -> FakeMpd
where
    F: Fn(&str) -> Reply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake mpd");
    let addr = listener.local_addr().expect("local addr").to_string();
    let commands = Arc::new(Mutex::new(Vec::new()));
    let connections = Arc::new(AtomicUsize::new(0));
    let respond = Arc::new(respond);

    let commands_task = Arc::clone(&commands);
    let connections_task = Arc::clone(&connections);
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            connections_task.fetch_add(1, Ordering::SeqCst);
            let commands = Arc::clone(&commands_task);
            let respond = Arc::clone(&respond);
            tokio::spawn(async move {
                let (read, mut write) = socket.into_split();
                let mut reader = BufReader::new(read);
                if write.write_all(b"OK MPD 0.23.5\n").await.is_err() {
                    return;
                }
                let mut line = String::new();
                loop {
                    line.clear();
                    match reader.read_line(&mut line).await {
                        Ok(0) | Err(_) => return,
                        Ok(_) => {}
                    }
                    let command = line.trim_end().to_string();
                    commands.lock().push(command.clone());
                    match respond(&command) {
                        Reply::Text(text) => {
                            if write.write_all(text.as_bytes()).await.is_err() {
                                return;
                            }
                        }
                        Reply::Hangup => return,
                        Reply::Silence => std::future::pending::<()>().await,
                        Reply::Stalled { head, pause, tail } => {
                            if write.write_all(head.as_bytes()).await.is_err() {
                                return;
                            }
                            tokio::time::sleep(pause).await;
                            if write.write_all(tail.as_bytes()).await.is_err() {
                                return;
                            }
                        }
                    }
                }
            });
        }
    });

    FakeMpd {
        addr,
        commands,
        connections,
    }
}
