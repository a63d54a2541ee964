//! Websocket connection to a `nym-client` process
//!
//! Uses the blocking `tungstenite` API. A single socket is shared between the
//! listener thread and writers: the listener reads with a short timeout and
//! hands the lock over fairly after every read, so `send`/`reply` never wait
//! longer than one read poll.
//!
//! Connection state (`socket`, `online`, `listening`) only changes while the
//! socket lock is held. Dialling connects and handshakes without the lock and
//! only takes it to install the socket. Each successful dial, close or failed
//! listen bumps a generation counter; a listener whose generation is stale
//! exits without firing the close callback, and a dial that started before a
//! `close()` is discarded.

use crate::config::UserPreferences;
use crate::entity::Pseudonym;
use crate::error::{NymgraphError, Result, StringError};
use crate::nym::protocol::{ChatEnvelope, ClientRequest, ServerResponse};
use crate::nym::{CloseCallback, ConnectionEvent, ConnectionFactory, MixnetConnection};
use parking_lot::{Mutex, MutexGuard};
use std::io;
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};
use tungstenite::{Message, WebSocket};
use url::Url;

/// Port `nym-client` listens on unless configured otherwise
pub const DEFAULT_CLIENT_PORT: u16 = 1977;

type Socket = WebSocket<TcpStream>;

/// Tunables for [`NymClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NymClientOptions {
    /// TCP connect and handshake timeout
    pub connect_timeout: Duration,
    /// How long the listener blocks in one read before releasing the socket
    pub read_poll: Duration,
    /// Reply SURBs attached to each anonymous message
    pub reply_surbs: u32,
}

impl Default for NymClientOptions {
    fn default() -> Self {
        Self::from(&UserPreferences::default())
    }
}

impl From<&UserPreferences> for NymClientOptions {
    fn from(prefs: &UserPreferences) -> Self {
        Self {
            connect_timeout: prefs.connect_timeout(),
            read_poll: Duration::from_millis(100),
            reply_surbs: prefs.reply_surbs,
        }
    }
}

struct Shared {
    pseudonym: Pseudonym,
    options: NymClientOptions,
    socket: Mutex<Option<Socket>>,
    online: AtomicBool,
    listening: AtomicBool,
    generation: AtomicU64,
    self_address: Mutex<Option<String>>,
    on_close: Mutex<Option<CloseCallback>>,
    events: mpsc::SyncSender<ConnectionEvent>,
}

/// Connection to the mixnet client configured for one pseudonym
pub struct NymClient {
    shared: Arc<Shared>,
}

impl NymClient {
    /// Create an offline client; events from the listener go to `events`
    pub fn new(
        pseudonym: Pseudonym,
        options: NymClientOptions,
        events: mpsc::SyncSender<ConnectionEvent>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                pseudonym,
                options,
                socket: Mutex::new(None),
                online: AtomicBool::new(false),
                listening: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                self_address: Mutex::new(None),
                on_close: Mutex::new(None),
                events,
            }),
        }
    }

    fn server(&self) -> &str {
        &self.shared.pseudonym.server
    }

    fn connect(&self) -> Result<Socket> {
        let options = &self.shared.options;
        let url = Url::parse(self.server())
            .map_err(|e| NymgraphError::ConnectionFailed(Box::new(e)))?;
        let addrs = url
            .socket_addrs(|| Some(DEFAULT_CLIENT_PORT))
            .map_err(|e| NymgraphError::ConnectionFailed(Box::new(e)))?;

        let stream = connect_any(&addrs, options.connect_timeout)?;
        stream.set_read_timeout(Some(options.connect_timeout))?;
        stream.set_write_timeout(Some(options.connect_timeout))?;
        stream.set_nodelay(true)?;

        let (ws, _response) = tungstenite::client(url.as_str(), stream).map_err(|e| {
            NymgraphError::ConnectionFailed(StringError::new(format!(
                "websocket handshake with {url} failed: {e}"
            )))
        })?;
        ws.get_ref().set_read_timeout(Some(options.read_poll))?;
        Ok(ws)
    }

    fn write(&self, request: &ClientRequest) -> Result<()> {
        let json = request.to_json()?;
        let mut guard = self.shared.socket.lock();
        let Some(ws) = guard.as_mut() else {
            return Err(NymgraphError::NotConnected(self.server().to_string()));
        };
        ws.send(Message::Text(json))
            .map_err(|e| NymgraphError::ConnectionFailed(Box::new(e)))
    }
}

impl MixnetConnection for NymClient {
    fn is_online(&self) -> bool {
        self.shared.online.load(Ordering::SeqCst)
    }

    fn dial(&self) -> Result<()> {
        let generation = {
            let guard = self.shared.socket.lock();
            if guard.is_some() && self.is_online() {
                return Ok(());
            }
            self.shared.generation.load(Ordering::SeqCst)
        };

        // Connect and handshake without the socket lock so writers fail fast
        let ws = self.connect()?;

        let mut guard = self.shared.socket.lock();
        if guard.is_some() && self.is_online() {
            debug!("Concurrent dial to {} won, dropping ours", self.server());
            return Ok(());
        }
        if self.shared.generation.load(Ordering::SeqCst) != generation {
            return Err(NymgraphError::ConnectionFailed(StringError::new(format!(
                "connection to {} closed while dialling",
                self.server()
            ))));
        }
        *guard = Some(ws);
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.online.store(true, Ordering::SeqCst);
        self.shared.listening.store(false, Ordering::SeqCst);
        drop(guard);

        info!(
            "Pseudonym '{}' connected to {}",
            self.shared.pseudonym.name,
            self.server()
        );
        Ok(())
    }

    fn listen_and_serve(&self) -> Result<()> {
        if !self.is_online() {
            return Err(NymgraphError::NotConnected(self.server().to_string()));
        }
        if self.shared.listening.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        if let Err(e) = self.write(&ClientRequest::SelfAddress) {
            self.shared.disconnect();
            return Err(e);
        }

        let shared = Arc::clone(&self.shared);
        let generation = shared.generation.load(Ordering::SeqCst);
        let spawned = thread::Builder::new()
            .name(format!("nym-listener-{}", self.shared.pseudonym.name))
            .spawn(move || shared.listen(generation));

        if let Err(e) = spawned {
            self.shared.disconnect();
            return Err(e.into());
        }
        Ok(())
    }

    fn self_address(&self) -> Option<String> {
        self.shared.self_address.lock().clone()
    }

    fn send(&self, recipient: &str, text: &str) -> Result<()> {
        let request = ClientRequest::SendAnonymous {
            message: ChatEnvelope::new(text).encode()?,
            recipient: recipient.to_string(),
            reply_surbs: self.shared.options.reply_surbs,
        };
        self.write(&request)
    }

    fn reply(&self, sender_tag: &str, text: &str) -> Result<()> {
        let request = ClientRequest::Reply {
            message: ChatEnvelope::new(text).encode()?,
            sender_tag: sender_tag.to_string(),
        };
        self.write(&request)
    }

    fn set_on_close(&self, callback: CloseCallback) {
        *self.shared.on_close.lock() = Some(callback);
    }

    fn close(&self) {
        let mut guard = self.shared.socket.lock();
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(mut ws) = guard.take() {
            if let Err(e) = ws.close(None).and_then(|()| ws.flush()) {
                debug!("Error closing websocket to {}: {}", self.server(), e);
            }
        }
        self.shared.online.store(false, Ordering::SeqCst);
        self.shared.listening.store(false, Ordering::SeqCst);
        drop(guard);

        debug!("Closed connection for pseudonym '{}'", self.shared.pseudonym.name);
    }
}

impl Shared {
    /// Drop the socket and go offline so the next dial starts over
    fn disconnect(&self) {
        let mut guard = self.socket.lock();
        self.generation.fetch_add(1, Ordering::SeqCst);
        guard.take();
        self.online.store(false, Ordering::SeqCst);
        self.listening.store(false, Ordering::SeqCst);
        drop(guard);

        debug!("Dropped connection to {} after a failed listen", self.pseudonym.server);
    }

    fn listen(&self, generation: u64) {
        debug!("Listener started for pseudonym '{}'", self.pseudonym.name);

        loop {
            let mut guard = self.socket.lock();
            if self.generation.load(Ordering::SeqCst) != generation {
                debug!("Listener for '{}' superseded", self.pseudonym.name);
                return;
            }
            let Some(ws) = guard.as_mut() else {
                break;
            };
            let result = ws.read();
            MutexGuard::unlock_fair(guard);

            match result {
                Ok(Message::Text(text)) => self.handle_frame(&text),
                Ok(Message::Close(frame)) => {
                    debug!("Mixnet client sent close frame: {:?}", frame);
                    break;
                }
                Ok(_) => {}
                Err(tungstenite::Error::Io(e))
                    if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    break;
                }
                Err(e) => {
                    warn!(
                        "Websocket error for pseudonym '{}': {}",
                        self.pseudonym.name, e
                    );
                    break;
                }
            }
        }

        {
            let mut guard = self.socket.lock();
            if self.generation.load(Ordering::SeqCst) != generation {
                return;
            }
            *guard = None;
            self.online.store(false, Ordering::SeqCst);
            self.listening.store(false, Ordering::SeqCst);
        }

        info!(
            "Connection to {} closed for pseudonym '{}'",
            self.pseudonym.server, self.pseudonym.name
        );
        if let Some(callback) = self.on_close.lock().as_ref() {
            callback();
        }
    }

    fn handle_frame(&self, text: &str) {
        match ServerResponse::from_json(text) {
            Ok(ServerResponse::SelfAddress { address }) => {
                debug!("Self address for '{}': {}", self.pseudonym.name, address);
                *self.self_address.lock() = Some(address.clone());
                self.emit(ConnectionEvent::SelfAddress {
                    pseudonym_id: self.pseudonym.id,
                    address,
                });
            }
            Ok(ServerResponse::Received {
                message,
                sender_tag,
            }) => {
                self.emit(ConnectionEvent::Received {
                    pseudonym_id: self.pseudonym.id,
                    text: ChatEnvelope::decode_text(&message),
                    sender_tag,
                });
            }
            Ok(ServerResponse::Error { message }) => {
                warn!(
                    "Mixnet client error for pseudonym '{}': {}",
                    self.pseudonym.name, message
                );
                self.emit(ConnectionEvent::Error {
                    pseudonym_id: self.pseudonym.id,
                    message,
                });
            }
            Ok(ServerResponse::Unknown) => {
                debug!("Ignoring unsupported frame: {}", text);
            }
            Err(e) => {
                warn!("Ignoring malformed frame from mixnet client: {}", e);
            }
        }
    }

    fn emit(&self, event: ConnectionEvent) {
        if let Err(e) = self.events.send(event) {
            debug!("Connection event dropped, receiver gone: {:?}", e.0);
        }
    }
}

fn connect_any(addrs: &[SocketAddr], timeout: Duration) -> Result<TcpStream> {
    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect_timeout(addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!("Connect to {} failed: {}", addr, e);
                last_error = Some(e);
            }
        }
    }

    let source: Box<dyn std::error::Error + Send + Sync> = match last_error {
        Some(e) => Box::new(e),
        None => StringError::new("server address did not resolve"),
    };
    Err(NymgraphError::ConnectionFailed(source))
}

/// Creates [`NymClient`]s sharing one event channel
pub struct NymClientFactory {
    options: NymClientOptions,
    events: mpsc::SyncSender<ConnectionEvent>,
}

impl NymClientFactory {
    /// Factory whose clients report to `events`
    pub fn new(options: NymClientOptions, events: mpsc::SyncSender<ConnectionEvent>) -> Self {
        Self { options, events }
    }
}

impl ConnectionFactory for NymClientFactory {
    fn create(&self, pseudonym: &Pseudonym) -> Arc<dyn MixnetConnection> {
        Arc::new(NymClient::new(
            pseudonym.clone(),
            self.options.clone(),
            self.events.clone(),
        ))
    }
}
