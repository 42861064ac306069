// crates/toolhub-gateway/src/session.rs
// ============================================================================
// Module: Session Table
// Description: Streaming session registry with drop-guarded lifetimes.
// Purpose: Map session ids to their event channel and captured partition.
// Dependencies: toolhub-core, rand, tokio, tokio-stream
// ============================================================================

//! ## Overview
//! Opening a stream registers a session and returns a [`SessionStream`]. The
//! stream owns a guard: when the transport drops the stream (disconnect or
//! shutdown) the session is removed synchronously, so later messages for the
//! id get "session not found". The table is a `RwLock<HashMap>`; every insert,
//! lookup, and removal is one lock acquisition.
//!
//! Each session also owns an inbox. Posted messages are queued on it and a
//! single worker drains it, so messages on one session are dispatched in
//! arrival order and their replies reach the stream in that order.
//!
//! Session ids combine a boot-scoped random prefix, a monotonic counter, and a
//! per-session random nonce; they are unique for the process lifetime and
//! never reused.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::task::Context;
use std::task::Poll;

use rand::RngCore;
use rand::rngs::OsRng;
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tokio_stream::wrappers::ReceiverStream;
use toolhub_core::PartitionId;

use crate::jsonrpc::CallMetadata;
use crate::jsonrpc::JsonRpcRequest;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header carrying a session id on message posts.
pub const SESSION_HEADER: &str = "mcp-session-id";
/// Query parameter carrying a session id on message posts.
pub const SESSION_QUERY_PARAM: &str = "sessionId";
/// Path clients post session messages to.
pub const MESSAGE_PATH: &str = "/messages";
/// Buffered frames per session before senders wait.
pub const SESSION_CHANNEL_CAPACITY: usize = 64;
/// Queued messages per session before posters wait.
pub const SESSION_INBOX_CAPACITY: usize = 64;

// ============================================================================
// SECTION: Identifiers
// ============================================================================

/// Opaque streaming session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Boot-scoped session id generator.
///
/// # Invariants
/// - Issued identifiers are unique within the process lifetime.
#[derive(Debug)]
pub struct SessionIdGenerator {
    /// Boot-scoped random identifier.
    boot_id: u64,
    /// Monotonic counter for ids issued in this process.
    counter: AtomicU64,
}

impl SessionIdGenerator {
    /// Creates a new generator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            boot_id: OsRng.next_u64(),
            counter: AtomicU64::new(1),
        }
    }

    /// Issues a new session id.
    #[must_use]
    pub fn issue(&self) -> SessionId {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        let nonce = OsRng.next_u64();
        SessionId(format!("{:016x}{seq:016x}{nonce:016x}", self.boot_id))
    }
}

impl Default for SessionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SECTION: Frames
// ============================================================================

/// One server-sent event destined for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFrame {
    /// SSE event name.
    pub event: &'static str,
    /// SSE data payload.
    pub data: String,
}

impl SessionFrame {
    /// Builds the `endpoint` frame announcing the message URL.
    #[must_use]
    pub fn endpoint(id: &SessionId) -> Self {
        Self {
            event: "endpoint",
            data: format!("{MESSAGE_PATH}?{SESSION_QUERY_PARAM}={id}"),
        }
    }

    /// Builds a `message` frame carrying a JSON-RPC payload.
    #[must_use]
    pub const fn message(data: String) -> Self {
        Self {
            event: "message",
            data,
        }
    }
}

// ============================================================================
// SECTION: Inbox
// ============================================================================

/// One posted message awaiting dispatch on its session.
#[derive(Debug)]
pub struct SessionMessage {
    /// Parsed request.
    pub request: JsonRpcRequest,
    /// Caller identity and effective scope.
    pub meta: CallMetadata,
}

/// Receiving side of a session inbox, drained by one worker.
pub struct SessionInbox {
    /// Owning session id.
    id: SessionId,
    /// Queued messages in arrival order.
    receiver: mpsc::Receiver<SessionMessage>,
    /// Frame channel replies are written to.
    frames: mpsc::Sender<SessionFrame>,
}

impl SessionInbox {
    /// Returns the owning session id.
    #[must_use]
    pub const fn id(&self) -> &SessionId {
        &self.id
    }

    /// Waits for the next queued message; `None` once the session is gone.
    pub async fn recv(&mut self) -> Option<SessionMessage> {
        self.receiver.recv().await
    }

    /// Writes a frame to the stream; returns false when the stream is closed.
    pub async fn reply(&self, frame: SessionFrame) -> bool {
        self.frames.send(frame).await.is_ok()
    }
}

// ============================================================================
// SECTION: Table
// ============================================================================

/// Registered session state.
struct SessionEntry {
    /// Sender half of the session channel.
    sender: mpsc::Sender<SessionFrame>,
    /// Sender half of the session inbox.
    inbox: mpsc::Sender<SessionMessage>,
    /// Partition captured when the stream opened.
    partition: Option<PartitionId>,
}

/// Snapshot of a session used to dispatch one message.
#[derive(Clone)]
pub struct SessionHandle {
    /// Session id.
    pub id: SessionId,
    /// Sender half of the session channel.
    pub sender: mpsc::Sender<SessionFrame>,
    /// Sender half of the session inbox.
    pub inbox: mpsc::Sender<SessionMessage>,
    /// Partition captured when the stream opened.
    pub partition: Option<PartitionId>,
}

/// Concurrency-safe session registry.
pub struct SessionTable {
    /// Live sessions keyed by id.
    sessions: RwLock<HashMap<SessionId, SessionEntry>>,
    /// Id generator.
    generator: SessionIdGenerator,
}

impl SessionTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            generator: SessionIdGenerator::new(),
        }
    }

    /// Opens a session with the captured partition.
    ///
    /// The returned stream yields the `endpoint` frame first. The inbox ends
    /// once the session is removed and every outstanding handle is dropped.
    #[must_use]
    pub fn open(
        self: &Arc<Self>,
        partition: Option<PartitionId>,
    ) -> (SessionId, SessionStream, SessionInbox) {
        let id = self.generator.issue();
        let (sender, receiver) = mpsc::channel(SESSION_CHANNEL_CAPACITY);
        let _ = sender.try_send(SessionFrame::endpoint(&id));
        let (inbox_sender, inbox_receiver) = mpsc::channel(SESSION_INBOX_CAPACITY);
        let inbox = SessionInbox {
            id: id.clone(),
            receiver: inbox_receiver,
            frames: sender.clone(),
        };
        self.sessions.write().unwrap_or_else(PoisonError::into_inner).insert(
            id.clone(),
            SessionEntry {
                sender,
                inbox: inbox_sender,
                partition,
            },
        );
        let guard = SessionGuard {
            table: Arc::clone(self),
            id: id.clone(),
        };
        let stream = SessionStream {
            inner: ReceiverStream::new(receiver),
            _guard: guard,
        };
        (id, stream, inbox)
    }

    /// Looks up a live session.
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<SessionHandle> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        let id = SessionId(id.to_string());
        sessions.get(&id).map(|entry| SessionHandle {
            id: id.clone(),
            sender: entry.sender.clone(),
            inbox: entry.inbox.clone(),
            partition: entry.partition.clone(),
        })
    }

    /// Removes a session; returns true when it was present.
    pub fn close(&self, id: &SessionId) -> bool {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner).remove(id).is_some()
    }

    /// Returns true when the session is registered.
    #[must_use]
    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).contains_key(id)
    }

    /// Returns the number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true when no sessions are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionTable {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SECTION: Stream
// ============================================================================

/// Removes its session from the table when dropped.
struct SessionGuard {
    /// Owning table.
    table: Arc<SessionTable>,
    /// Guarded session id.
    id: SessionId,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.table.close(&self.id);
    }
}

/// Frame stream for one session; closing it removes the session.
pub struct SessionStream {
    /// Receiver half of the session channel.
    inner: ReceiverStream<SessionFrame>,
    /// Removal guard, dropped with the stream.
    _guard: SessionGuard,
}

impl Stream for SessionStream {
    type Item = SessionFrame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
