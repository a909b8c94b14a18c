//! Game sessions, their seats, and the collaborators the dispatcher relies on:
//! a session store and an authenticator, with in-memory implementations.

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::info;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::coretypes::Color;
use crate::error::{self, ErrorKind};
use crate::game::Game;
use crate::protocol::GameId;

/// How a concluded game ended.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Checkmate { winner: Color },
    Stalemate,
    Resignation { winner: Color },
}

impl Outcome {
    /// Winning color, None for a draw.
    pub const fn winner(&self) -> Option<Color> {
        match self {
            Outcome::Checkmate { winner } | Outcome::Resignation { winner } => Some(*winner),
            Outcome::Stalemate => None,
        }
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Outcome::Checkmate { winner } => write!(f, "{winner} wins by checkmate"),
            Outcome::Stalemate => f.write_str("draw by stalemate"),
            Outcome::Resignation { winner } => write!(f, "{winner} wins by resignation"),
        }
    }
}

/// Part a participant plays in a session.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Role {
    White,
    Black,
    Observer,
}

impl Role {
    /// Seat color, None for observers.
    pub const fn color(&self) -> Option<Color> {
        match self {
            Role::White => Some(Color::White),
            Role::Black => Some(Color::Black),
            Role::Observer => None,
        }
    }
}

impl From<Color> for Role {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Role::White,
            Color::Black => Role::Black,
        }
    }
}

/// # Example
/// `WHITE`, `BLACK` or `an observer`.
impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.color() {
            Some(color) => write!(f, "{color}"),
            None => f.write_str("an observer"),
        }
    }
}

/// A game session: its seats and current game.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(rename = "gameID")]
    pub id: GameId,
    #[serde(rename = "gameName")]
    pub name: String,
    #[serde(rename = "whiteUsername")]
    pub white: Option<String>,
    #[serde(rename = "blackUsername")]
    pub black: Option<String>,
    pub game: Game,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

impl Session {
    pub fn new(id: GameId, name: &str, game: Game) -> Self {
        Self {
            id,
            name: name.to_string(),
            white: None,
            black: None,
            game,
            outcome: None,
        }
    }

    /// Username seated at `color`, if any.
    pub fn seat(&self, color: Color) -> Option<&str> {
        match color {
            Color::White => self.white.as_deref(),
            Color::Black => self.black.as_deref(),
        }
    }

    fn seat_mut(&mut self, color: Color) -> &mut Option<String> {
        match color {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        }
    }

    /// Role of `username`, by comparing against the seats. Black is checked first,
    /// so a user holding both seats plays Black.
    pub fn role_of(&self, username: &str) -> Role {
        [Color::Black, Color::White]
            .into_iter()
            .find(|&color| self.seat(color) == Some(username))
            .map_or(Role::Observer, Role::from)
    }

    /// True once the session has an outcome.
    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }
}

/// Persistence of sessions, as seen by the dispatcher.
pub trait SessionStore: Send + Sync {
    /// Fetch a snapshot of a session. Fails with `NotFound` for unknown ids.
    fn session(&self, id: GameId) -> error::Result<Session>;

    /// Replace the game of a session. A move that ends the game passes its
    /// outcome, and both are stored in one write.
    fn update_game(
        &self,
        id: GameId,
        game: Game,
        outcome: Option<Outcome>,
    ) -> error::Result<()>;

    /// Empty the seat of `color`.
    fn vacate_seat(&self, id: GameId, color: Color) -> error::Result<()>;

    /// Record the outcome of a finished game.
    fn conclude(&self, id: GameId, outcome: Outcome) -> error::Result<()>;
}

/// Resolution of auth tokens to usernames.
pub trait Authenticator: Send + Sync {
    /// Fails with `Unauthorized` for unknown tokens.
    fn resolve_identity(&self, token: &str) -> error::Result<String>;
}

fn not_found(id: GameId) -> error::Error {
    (ErrorKind::NotFound, format!("game {id} not found")).into()
}

/// Session store held in process memory. Ids start at 1.
#[derive(Debug)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<GameId, Session>>,
    next_id: AtomicI64,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<GameId, Session>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<GameId, Session>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn modify<F>(&self, id: GameId, f: F) -> error::Result<()>
    where
        F: FnOnce(&mut Session) -> error::Result<()>,
    {
        let mut sessions = self.write();
        let session = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;
        f(session)
    }

    /// Create a session in the standard start position. Returns its id.
    pub fn create(&self, name: &str) -> GameId {
        self.create_with_game(name, Game::start_position())
    }

    /// Create a session around an existing game. Returns its id.
    pub fn create_with_game(&self, name: &str, game: Game) -> GameId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.write().insert(id, Session::new(id, name, game));
        info!("created game {id} \"{name}\"");
        id
    }

    /// Seat `username` at `color`. Fails with `SeatTaken` if someone else holds it.
    pub fn claim_seat(&self, id: GameId, color: Color, username: &str) -> error::Result<()> {
        self.modify(id, |session| {
            let seat = session.seat_mut(color);
            if seat.as_deref().map_or(false, |holder| holder != username) {
                return Err((
                    ErrorKind::SeatTaken,
                    format!("someone else is already the {color} player"),
                )
                    .into());
            }
            *seat = Some(username.to_string());
            Ok(())
        })
    }

    /// Snapshots of all sessions, ordered by id.
    pub fn list(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self.read().values().cloned().collect();
        sessions.sort_by_key(|session| session.id);
        sessions
    }

    /// Remove a session. Returns true if it existed.
    pub fn delete(&self, id: GameId) -> bool {
        self.write().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemorySessionStore {
    fn session(&self, id: GameId) -> error::Result<Session> {
        self.read().get(&id).cloned().ok_or_else(|| not_found(id))
    }

    fn update_game(
        &self,
        id: GameId,
        game: Game,
        outcome: Option<Outcome>,
    ) -> error::Result<()> {
        self.modify(id, |session| {
            session.game = game;
            if outcome.is_some() {
                session.outcome = outcome;
            }
            Ok(())
        })
    }

    fn vacate_seat(&self, id: GameId, color: Color) -> error::Result<()> {
        self.modify(id, |session| {
            session.seat_mut(color).take();
            Ok(())
        })
    }

    fn conclude(&self, id: GameId, outcome: Outcome) -> error::Result<()> {
        self.modify(id, |session| {
            session.outcome = Some(outcome);
            Ok(())
        })
    }
}

/// Length of tokens created by [`MemoryAuth::issue`].
pub const TOKEN_LEN: usize = 32;

/// Token to username table held in process memory.
#[derive(Debug, Default)]
pub struct MemoryAuth {
    tokens: RwLock<HashMap<String, String>>,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a random alphanumeric token for `username` and return it.
    pub fn issue(&self, username: &str) -> String {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect();
        self.insert(&token, username);
        token
    }

    /// Register a fixed token for `username`, replacing any previous owner of that token.
    pub fn insert(&self, token: &str, username: &str) {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.to_string(), username.to_string());
    }

    /// Forget a token. Returns true if it was known.
    pub fn revoke(&self, token: &str) -> bool {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token)
            .is_some()
    }
}

impl Authenticator for MemoryAuth {
    fn resolve_identity(&self, token: &str) -> error::Result<String> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .cloned()
            .ok_or_else(|| ErrorKind::Unauthorized.into())
    }
}
