//! The plaintext command grammar and the payload vocabulary.
//!
//! Every decrypted line a client sends is classified into exactly one of
//! three commands, in this precedence order:
//!
//! 1. the exact string `:clients` — ask for the room roster;
//! 2. `@<nickname> <text>` — a private message (`nickname` is one or more
//!    word characters, a single space, then the rest of the line);
//! 3. anything else — a broadcast to the room.
//!
//! The formatters below are the single source of every application payload
//! the server emits, so the wire strings live in one place.

/// The roster command, matched exactly.
pub const LIST_CLIENTS: &str = ":clients";

/// Reply to a successful login attempt.
pub const LOGIN_ACCEPTED: &str = "LOGIN ACCEPTED";

/// Reply to any failed login attempt. Grammar failures, duplicate nicknames,
/// and rejected credentials all collapse into this one string so the reply
/// leaks nothing about which check failed.
pub const WRONG_LOGIN: &str = "WRONG LOGIN";

/// Reply to a private message addressed to an unknown nickname.
pub const WRONG_NICKNAME: &str = "SERVER: WRONG NICKNAME";

/// One decrypted client line, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `:clients` — list every registered nickname back to the sender.
    ListClients,
    /// `@<to> <text>` — deliver to one recipient.
    Private { to: String, text: String },
    /// Everything else — fan out to the room.
    Broadcast(String),
}

impl Command {
    /// Classifies one plaintext line. Never fails: unmatched input is a
    /// broadcast.
    pub fn parse(line: &str) -> Command {
        if line == LIST_CLIENTS {
            return Command::ListClients;
        }
        if let Some(rest) = line.strip_prefix('@') {
            // `@<nickname> <text>`: the space is required, the text may be empty.
            if let Some((nickname, text)) = rest.split_once(' ') {
                if is_valid_nickname(nickname) {
                    return Command::Private {
                        to: nickname.to_string(),
                        text: text.to_string(),
                    };
                }
            }
        }
        Command::Broadcast(line.to_string())
    }
}

/// A nickname is a non-empty run of word characters (`[A-Za-z0-9_]`).
pub fn is_valid_nickname(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ── Payload formatters ────────────────────────────────────────────────────────

/// `"<sender>: <text>"` — a room broadcast.
pub fn room_message(sender: &str, text: &str) -> String {
    format!("{sender}: {text}")
}

/// `"PRIVATE <sender>: <text>"` — delivered to one recipient only.
pub fn private_message(sender: &str, text: &str) -> String {
    format!("PRIVATE {sender}: {text}")
}

/// Announcement broadcast when a user completes login.
pub fn join_notice(username: &str) -> String {
    format!("{username} has joined this chatting room")
}

/// Announcement broadcast when a user's connection closes.
pub fn leave_notice(username: &str) -> String {
    format!("{username} has disconnected this chatting room")
}

/// One roster line in the `:clients` reply.
pub fn client_list_entry(nickname: &str) -> String {
    format!("\t{nickname}")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exact_clients_command() {
        assert_eq!(Command::parse(":clients"), Command::ListClients);
    }

    #[test]
    fn test_parse_clients_with_trailing_text_is_broadcast() {
        // The roster command matches exactly; anything longer is chat text.
        assert_eq!(
            Command::parse(":clients please"),
            Command::Broadcast(":clients please".to_string())
        );
    }

    #[test]
    fn test_parse_private_message() {
        assert_eq!(
            Command::parse("@bob hello there"),
            Command::Private {
                to: "bob".to_string(),
                text: "hello there".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_private_message_with_empty_text() {
        // `@bob ` (with the separating space) carries an empty message.
        assert_eq!(
            Command::parse("@bob "),
            Command::Private {
                to: "bob".to_string(),
                text: String::new(),
            }
        );
    }

    #[test]
    fn test_parse_at_without_space_is_broadcast() {
        assert_eq!(
            Command::parse("@bob"),
            Command::Broadcast("@bob".to_string())
        );
    }

    #[test]
    fn test_parse_at_with_invalid_nickname_is_broadcast() {
        // A dash is not a word character, so the private grammar does not match.
        assert_eq!(
            Command::parse("@bo-b hi"),
            Command::Broadcast("@bo-b hi".to_string())
        );
    }

    #[test]
    fn test_parse_bare_at_is_broadcast() {
        assert_eq!(Command::parse("@ hi"), Command::Broadcast("@ hi".to_string()));
    }

    #[test]
    fn test_parse_plain_text_is_broadcast() {
        assert_eq!(
            Command::parse("good morning"),
            Command::Broadcast("good morning".to_string())
        );
    }

    #[test]
    fn test_nickname_grammar_accepts_word_characters() {
        for nick in ["alice", "Bob_2", "_", "x0"] {
            assert!(is_valid_nickname(nick), "{nick} should be valid");
        }
    }

    #[test]
    fn test_nickname_grammar_rejects_invalid_input() {
        for nick in ["", "with space", "dash-ed", "émile", "a.b", "@alice"] {
            assert!(!is_valid_nickname(nick), "{nick:?} should be invalid");
        }
    }

    #[test]
    fn test_payload_formatters() {
        assert_eq!(room_message("alice", "hi"), "alice: hi");
        assert_eq!(private_message("alice", "psst"), "PRIVATE alice: psst");
        assert_eq!(join_notice("bob"), "bob has joined this chatting room");
        assert_eq!(
            leave_notice("bob"),
            "bob has disconnected this chatting room"
        );
        assert_eq!(client_list_entry("alice"), "\talice");
    }
}
