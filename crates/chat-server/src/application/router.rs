//! Dispatch of decrypted chat lines against the registry.
//!
//! The grammar itself lives in `chat_core::protocol::command`; this module is
//! the side-effectful half: given a classified line and its sender, decide
//! who hears what. Replies to the sender go through the sender's own outbound
//! queue like any other delivery, so they are encrypted under the sender's
//! key by its writer task.

use chat_core::protocol::command::{self, Command};
use tracing::debug;

use crate::application::registry::Registry;

/// Routes one decrypted line from `sender`.
///
/// Precedence: roster request, then private message, then room broadcast.
pub async fn dispatch(registry: &Registry, sender: &str, line: &str) {
    match Command::parse(line) {
        Command::ListClients => {
            // Roster goes to the sender only, one tab-prefixed line per
            // nickname (the sender included).
            for nickname in registry.nicknames().await {
                registry
                    .send_to(sender, &command::client_list_entry(&nickname))
                    .await;
            }
        }

        Command::Private { to, text } => {
            let delivered = registry
                .send_to(&to, &command::private_message(sender, &text))
                .await;
            if !delivered {
                debug!("{sender} addressed unknown nickname {to}");
                registry.send_to(sender, command::WRONG_NICKNAME).await;
            }
        }

        Command::Broadcast(text) => {
            registry
                .broadcast_from(sender, &command::room_message(sender, &text))
                .await;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::registry::ClientHandle;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    async fn room_with(
        registry: &Registry,
        nicknames: &[&str],
    ) -> Vec<mpsc::Receiver<String>> {
        let mut receivers = Vec::new();
        for nickname in nicknames {
            let (tx, rx) = mpsc::channel(16);
            registry
                .try_register(
                    nickname,
                    ClientHandle {
                        conn_id: Uuid::new_v4(),
                        outbound: tx,
                    },
                )
                .await
                .expect("register");
            receivers.push(rx);
        }
        receivers
    }

    fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line);
        }
        lines
    }

    #[tokio::test]
    async fn test_plain_line_broadcasts_to_everyone_else() {
        let registry = Registry::new();
        let mut rxs = room_with(&registry, &["alice", "bob", "carol"]).await;

        dispatch(&registry, "alice", "hi all").await;

        assert!(drain(&mut rxs[0]).is_empty(), "sender hears nothing");
        assert_eq!(drain(&mut rxs[1]), vec!["alice: hi all"]);
        assert_eq!(drain(&mut rxs[2]), vec!["alice: hi all"]);
    }

    #[tokio::test]
    async fn test_clients_command_lists_roster_to_sender_only() {
        let registry = Registry::new();
        let mut rxs = room_with(&registry, &["alice", "bob"]).await;

        dispatch(&registry, "alice", ":clients").await;

        let mut roster = drain(&mut rxs[0]);
        roster.sort();
        assert_eq!(roster, vec!["\talice", "\tbob"]);
        assert!(drain(&mut rxs[1]).is_empty());
    }

    #[tokio::test]
    async fn test_private_message_reaches_only_the_recipient() {
        let registry = Registry::new();
        let mut rxs = room_with(&registry, &["alice", "bob", "carol"]).await;

        dispatch(&registry, "alice", "@bob secret").await;

        assert!(drain(&mut rxs[0]).is_empty());
        assert_eq!(drain(&mut rxs[1]), vec!["PRIVATE alice: secret"]);
        assert!(drain(&mut rxs[2]).is_empty());
    }

    #[tokio::test]
    async fn test_private_to_unknown_nickname_bounces_to_sender() {
        let registry = Registry::new();
        let mut rxs = room_with(&registry, &["alice", "bob"]).await;

        dispatch(&registry, "alice", "@carol anyone home").await;

        assert_eq!(drain(&mut rxs[0]), vec!["SERVER: WRONG NICKNAME"]);
        assert!(drain(&mut rxs[1]).is_empty());
    }

    #[tokio::test]
    async fn test_at_line_that_fails_the_grammar_is_broadcast() {
        let registry = Registry::new();
        let mut rxs = room_with(&registry, &["alice", "bob"]).await;

        // No space separator, so this is chat text, not an address.
        dispatch(&registry, "alice", "@bob").await;

        assert_eq!(drain(&mut rxs[1]), vec!["alice: @bob"]);
    }
}
