//! Session and WS-ticket management.
//!
//! ARCHITECTURE
//! ============
//! HTTP auth uses long-lived session tokens, while websocket upgrades use
//! one-time short-lived tickets to avoid sending cookies over WS query params.
//!
//! The store never holds raw tokens: sessions are keyed by the SHA-256 of the
//! token, and that key is what the websocket layer tracks per connection.
//! Ticket consumption removes the ticket, so each ticket works once.

use std::collections::HashMap;
use std::fmt::Write;
use std::time::{Duration, Instant};

use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::roles::AppMode;
use crate::services::checklist::SessionChecklists;
use crate::services::shift::CheckInFlow;

/// Expiry cap for TTLs too large to add to the monotonic clock.
const FAR_FUTURE: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

fn deadline(ttl: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(ttl).or_else(|| now.checked_add(FAR_FUTURE)).unwrap_or(now)
}

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// Generate a short-lived 16-byte hex WS ticket.
#[must_use]
pub(crate) fn generate_ws_ticket() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// Store key for a session token.
#[must_use]
pub fn hash_token(token: &str) -> String {
    bytes_to_hex(&Sha256::digest(token.as_bytes()))
}

// =============================================================================
// TYPES
// =============================================================================

/// Staff profile as returned by the auth API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
    pub staff_id: String,
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub current_zone_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub staff: StaffMember,
    pub mode: AppMode,
    pub on_shift: bool,
    pub check_in: CheckInFlow,
    pub checklists: SessionChecklists,
    pub created_at: i64,
    #[serde(skip)]
    expires_at: Instant,
}

impl Session {
    /// Switch dashboards. Checklists follow the new mode's daily list.
    pub fn set_mode(&mut self, mode: AppMode) {
        if self.mode != mode {
            self.mode = mode;
            self.checklists = SessionChecklists::for_mode(mode);
        }
    }
}

struct WsTicket {
    session_key: String,
    expires_at: Instant,
}

// =============================================================================
// STORE
// =============================================================================

pub struct SessionStore {
    sessions: HashMap<String, Session>,
    tickets: HashMap<String, WsTicket>,
    ttl: Duration,
    ticket_ttl: Duration,
}

impl SessionStore {
    #[must_use]
    pub fn new(ttl: Duration, ticket_ttl: Duration) -> Self {
        Self { sessions: HashMap::new(), tickets: HashMap::new(), ttl, ticket_ttl }
    }

    /// Create a session for the given staff member, returning the raw token.
    pub fn create(&mut self, staff: StaffMember, mode: AppMode) -> String {
        let token = generate_token();
        let session = Session {
            staff,
            mode,
            on_shift: false,
            check_in: CheckInFlow::default(),
            checklists: SessionChecklists::for_mode(mode),
            created_at: crate::frame::now_ms(),
            expires_at: deadline(self.ttl),
        };
        self.sessions.insert(hash_token(&token), session);
        token
    }

    /// Validate a raw token. Returns the session key and session.
    #[must_use]
    pub fn validate(&self, token: &str) -> Option<(String, &Session)> {
        let key = hash_token(token);
        let session = self.sessions.get(&key)?;
        if Instant::now() >= session.expires_at {
            return None;
        }
        Some((key, session))
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Session> {
        self.sessions.get(key).filter(|s| Instant::now() < s.expires_at)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Session> {
        self.sessions.get_mut(key).filter(|s| Instant::now() < s.expires_at)
    }

    /// Delete a session by key. Outstanding tickets for it die too.
    pub fn remove(&mut self, key: &str) -> Option<Session> {
        self.tickets.retain(|_, t| t.session_key != key);
        self.sessions.remove(key)
    }

    /// Keys of every live session belonging to `staff_id`.
    #[must_use]
    pub fn keys_for_staff(&self, staff_id: &str) -> Vec<String> {
        self.sessions
            .iter()
            .filter(|(_, s)| s.staff.staff_id == staff_id)
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Create a short-lived WS ticket for the given session.
    pub fn create_ws_ticket(&mut self, session_key: &str) -> String {
        let ticket = generate_ws_ticket();
        self.tickets.insert(
            ticket.clone(),
            WsTicket { session_key: session_key.to_owned(), expires_at: deadline(self.ticket_ttl) },
        );
        ticket
    }

    /// Consume a WS ticket, returning the session key if valid.
    pub fn consume_ws_ticket(&mut self, ticket: &str) -> Option<String> {
        let entry = self.tickets.remove(ticket)?;
        if Instant::now() >= entry.expires_at {
            return None;
        }
        self.get(&entry.session_key)?;
        Some(entry.session_key)
    }

    /// Drop expired sessions and tickets. Returns the removed session keys.
    pub fn purge_expired(&mut self) -> Vec<String> {
        let now = Instant::now();
        self.tickets.retain(|_, t| now < t.expires_at);
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|(_, s)| now >= s.expires_at)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            self.sessions.remove(key);
        }
        expired
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
