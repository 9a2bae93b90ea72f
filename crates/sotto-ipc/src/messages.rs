//! Request and reply routing types.
//!
//! A connection handler turns each inbound line into a [`Request`] and
//! pushes it onto the controller's queue. Replies travel the other way
//! through the per-connection outbound channel carried by [`Origin`].

use tokio::sync::mpsc;

use sotto_core::Command;

/// Opaque per-connection identity.
pub type ClientId = u64;

/// One unit on a connection's outbound channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A reply or notification line
    Line(String),
    /// Close this connection after flushing
    Close,
}

/// Reply-routing handle for one connection.
///
/// Cloneable and compared by id; one origin may appear several times in a
/// single processing cycle.
#[derive(Debug, Clone)]
pub struct Origin {
    id: ClientId,
    tx: mpsc::UnboundedSender<Outbound>,
}

impl Origin {
    /// Create an origin and the outbound receiver its connection drains.
    #[must_use]
    pub fn channel(id: ClientId) -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { id, tx }, rx)
    }

    /// This connection's id.
    #[must_use]
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Queue one line for delivery. Returns false when the connection is
    /// gone, which callers treat as connection death.
    pub fn send_line(&self, line: impl Into<String>) -> bool {
        self.tx.send(Outbound::Line(line.into())).is_ok()
    }

    /// Ask the connection to close once queued replies are flushed.
    pub fn close(&self) -> bool {
        self.tx.send(Outbound::Close).is_ok()
    }
}

impl PartialEq for Origin {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Origin {}

/// One parsed inbound line, queued for the controller.
#[derive(Debug, Clone)]
pub struct Request {
    /// The issuing connection
    pub origin: Origin,
    /// The parsed command
    pub command: Command,
    /// The raw line, kept for parse-error replies
    pub raw: String,
}
