//! Shared helpers for the integration tests
//!
//! [`FakeNymClient`] speaks enough of the nym-client websocket protocol to
//! exercise the real connection code: it answers `selfAddress` requests,
//! reports every request it receives and pushes frames or closes the socket
//! on command. Connections are served one after another, so a client that
//! reconnects after a close is served again.

#![allow(dead_code)]

use serde_json::{Value, json};
use std::io;
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc::{self, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};
use tungstenite::{Message, WebSocket};

/// How long tests wait for something to happen before failing
pub const WAIT: Duration = Duration::from_secs(5);

enum Command {
    Send(Value),
    Close,
}

/// In-process stand-in for a `nym-client` websocket server
pub struct FakeNymClient {
    url: String,
    requests: mpsc::Receiver<Value>,
    commands: mpsc::Sender<Command>,
}

impl FakeNymClient {
    /// Listen on a free local port, reporting `address` as our self address
    pub fn start(address: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let (request_tx, request_rx) = mpsc::channel();
        let (command_tx, command_rx) = mpsc::channel();
        let address = address.to_string();

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else {
                    return;
                };
                if !serve(stream, &address, &request_tx, &command_rx) {
                    return;
                }
            }
        });

        Self {
            url,
            requests: request_rx,
            commands: command_tx,
        }
    }

    /// `ws://` URL to configure as the pseudonym server
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Next request frame from the client
    pub fn next_request(&self) -> Value {
        self.requests
            .recv_timeout(WAIT)
            .expect("no request from the client")
    }

    /// Next request frame, if one arrives within `timeout`
    pub fn try_next_request(&self, timeout: Duration) -> Option<Value> {
        self.requests.recv_timeout(timeout).ok()
    }

    /// Deliver a `received` frame to the client
    pub fn push_received(&self, message: &str, sender_tag: Option<&str>) {
        let mut frame = json!({ "type": "received", "message": message });
        if let Some(tag) = sender_tag {
            frame["senderTag"] = json!(tag);
        }
        self.push(frame);
    }

    /// Deliver an arbitrary frame to the client
    pub fn push(&self, frame: Value) {
        self.commands.send(Command::Send(frame)).unwrap();
    }

    /// Close the current connection from the server side
    pub fn close_connection(&self) {
        self.commands.send(Command::Close).unwrap();
    }
}

/// Serve one connection. Returns `false` once the test dropped the server.
fn serve(
    stream: TcpStream,
    address: &str,
    requests: &mpsc::Sender<Value>,
    commands: &mpsc::Receiver<Command>,
) -> bool {
    let Ok(mut ws) = tungstenite::accept(stream) else {
        return true;
    };
    ws.get_ref()
        .set_read_timeout(Some(Duration::from_millis(20)))
        .unwrap();

    loop {
        loop {
            match commands.try_recv() {
                Ok(Command::Send(frame)) => {
                    if ws.send(Message::Text(frame.to_string())).is_err() {
                        return true;
                    }
                }
                Ok(Command::Close) => {
                    close(&mut ws);
                    return true;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return false,
            }
        }

        match ws.read() {
            Ok(Message::Text(text)) => {
                let request: Value = serde_json::from_str(&text).unwrap();
                if request["type"] == "selfAddress" {
                    let reply = json!({ "type": "selfAddress", "address": address });
                    if ws.send(Message::Text(reply.to_string())).is_err() {
                        return true;
                    }
                }
                if requests.send(request).is_err() {
                    return false;
                }
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(e))
                if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
            Err(_) => return true,
        }
    }
}

fn close(ws: &mut WebSocket<TcpStream>) {
    let _ = ws.close(None);
    let _ = ws.flush();
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        match ws.read() {
            Err(tungstenite::Error::Io(e))
                if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
            Err(_) => return,
            Ok(_) => {}
        }
    }
}

/// Server that completes the websocket handshake and then drops the socket
pub fn start_dropping_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else {
                return;
            };
            drop(tungstenite::accept(stream));
        }
    });
    url
}

/// Server that accepts TCP connections but never answers the handshake
pub fn start_silent_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming() {
            let Ok(stream) = stream else {
                return;
            };
            held.push(stream);
        }
    });
    url
}

/// Poll `condition` until it holds or [`WAIT`] elapses
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    condition()
}
