//! Player notifications.
//!
//! After a turn or a trade offer every other player in the game is told
//! about it. Delivery is best effort: a failure is reported back to the
//! player who acted but never undoes what they did.

use chrono::{DateTime, Utc};
use settlers_core::UserId;
use std::sync::Arc;
use thiserror::Error;

use crate::connections::Connections;
use crate::protocol::ServerMessage;
use crate::store::GameId;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("{0} is not connected")]
    Offline(String),
}

/// Notification templates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    /// A turn was played
    Turn,
    /// A trade was offered
    Trade,
}

impl Template {
    pub fn name(&self) -> &'static str {
        match self {
            Template::Turn => "turn",
            Template::Trade => "trade",
        }
    }
}

/// Who receives a notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
}

/// Extra fields available to templates
#[derive(Debug, Clone, Default)]
pub struct TemplateFields {
    pub game_id: GameId,
    /// Whose turn it is now
    pub next_player: Option<String>,
    /// When the open trade expires
    pub expires: Option<DateTime<Utc>>,
}

/// A rendered message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub subject: String,
    pub body: String,
}

/// Fill in a template for one recipient. `player_name` is whoever acted.
pub fn render(
    template: Template,
    recipient: &Recipient,
    player_name: &str,
    fields: &TemplateFields,
) -> Rendered {
    let subject = format!("Settlers game #{} update", fields.game_id);
    let mut body = format!("Hi {},\n\n", recipient.name);

    match template {
        Template::Turn => {
            body.push_str(&format!(
                "{} has played a turn in game #{}.",
                player_name, fields.game_id
            ));
            if let Some(next) = &fields.next_player {
                if *next == recipient.name {
                    body.push_str(" It's your turn!");
                } else {
                    body.push_str(&format!(" It's now {}'s turn.", next));
                }
            }
        }
        Template::Trade => {
            body.push_str(&format!(
                "{} would like to trade in game #{}.",
                player_name, fields.game_id
            ));
            if let Some(expires) = fields.expires {
                body.push_str(&format!(
                    " The offer is open until {}.",
                    expires.format("%Y-%m-%d %H:%M UTC")
                ));
            }
        }
    }
    body.push('\n');

    Rendered { subject, body }
}

/// Something that can deliver notifications
pub trait Notifier: Send + Sync {
    fn notify(
        &self,
        recipient: &Recipient,
        player_name: &str,
        template: Template,
        fields: &TemplateFields,
    ) -> Result<(), NotifyError>;
}

/// Pushes notifications to the recipient's open connections
pub struct ConnectionNotifier {
    connections: Arc<Connections>,
    from: String,
}

impl ConnectionNotifier {
    pub fn new(connections: Arc<Connections>, from: impl Into<String>) -> Self {
        Self {
            connections,
            from: from.into(),
        }
    }
}

impl Notifier for ConnectionNotifier {
    fn notify(
        &self,
        recipient: &Recipient,
        player_name: &str,
        template: Template,
        fields: &TemplateFields,
    ) -> Result<(), NotifyError> {
        let rendered = render(template, recipient, player_name, fields);
        let msg = ServerMessage::Notification {
            game_id: fields.game_id,
            subject: rendered.subject,
            from: self.from.clone(),
            to: recipient.email.clone(),
            body: rendered.body,
        };

        match self.connections.send_to_user(recipient.user_id, &msg) {
            0 => Err(NotifyError::Offline(recipient.name.clone())),
            _ => Ok(()),
        }
    }
}
