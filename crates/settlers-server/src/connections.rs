//! Live WebSocket connections and who is behind them.

use dashmap::DashMap;
use settlers_core::UserId;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::protocol::ServerMessage;

struct Connection {
    user: Option<UserId>,
    sender: mpsc::UnboundedSender<ServerMessage>,
}

/// All open connections
#[derive(Default)]
pub struct Connections {
    by_id: DashMap<Uuid, Connection>,
}

impl Connections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new, anonymous connection
    pub fn register(&self, id: Uuid, sender: mpsc::UnboundedSender<ServerMessage>) {
        self.by_id.insert(id, Connection { user: None, sender });
    }

    pub fn remove(&self, id: Uuid) {
        self.by_id.remove(&id);
    }

    /// Tie a connection to a user
    pub fn authenticate(&self, id: Uuid, user: UserId) {
        if let Some(mut conn) = self.by_id.get_mut(&id) {
            conn.user = Some(user);
        }
    }

    /// The user behind a connection, `None` if anonymous
    pub fn user_of(&self, id: Uuid) -> Option<UserId> {
        self.by_id.get(&id).and_then(|c| c.user)
    }

    /// Send a message to one connection
    pub fn send(&self, id: Uuid, msg: ServerMessage) {
        if let Some(conn) = self.by_id.get(&id) {
            let _ = conn.sender.send(msg);
        }
    }

    /// Send to every connection of a user, returning how many got it
    pub fn send_to_user(&self, user: UserId, msg: &ServerMessage) -> usize {
        self.by_id
            .iter()
            .filter(|c| c.user == Some(user))
            .filter(|c| c.sender.send(msg.clone()).is_ok())
            .count()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }
}
