//! Realtime command dispatcher.
//!
//! Turns one inbound text message into state changes and outbound messages.
//! Every failure is caught here and reported as a single `ERROR` to the
//! connection the message came from, it is never broadcast.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error, info, warn};

use crate::coretypes::{Color, Move};
use crate::error::{self, ErrorKind};
use crate::game::GameState;
use crate::protocol::{Command, GameId, ServerMessage, UserGameCommand};
use crate::registry::{Handle, Registry};
use crate::session::{Authenticator, Outcome, Session, SessionStore};

/// One mutex per session id, so commands on a session run one at a time.
#[derive(Debug, Default)]
struct SessionLocks {
    locks: Mutex<HashMap<GameId, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    fn map(&self) -> MutexGuard<'_, HashMap<GameId, Arc<Mutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_for(&self, id: GameId) -> Arc<Mutex<()>> {
        Arc::clone(self.map().entry(id).or_default())
    }

    /// Give back a lock taken with `lock_for`. The entry is dropped once no
    /// command holds it.
    fn release(&self, id: GameId, lock: Arc<Mutex<()>>) {
        let mut locks = self.map();
        drop(lock);
        if locks.get(&id).map_or(false, |entry| Arc::strong_count(entry) == 1) {
            locks.remove(&id);
        }
    }

    fn len(&self) -> usize {
        self.map().len()
    }
}

/// Dispatches inbound commands against a session store, using an
/// authenticator for identities and a registry for delivery.
pub struct Dispatcher {
    store: Arc<dyn SessionStore>,
    auth: Arc<dyn Authenticator>,
    registry: Arc<Registry>,
    locks: SessionLocks,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn SessionStore>, auth: Arc<dyn Authenticator>) -> Self {
        Self::with_registry(store, auth, Arc::new(Registry::new()))
    }

    pub fn with_registry(
        store: Arc<dyn SessionStore>,
        auth: Arc<dyn Authenticator>,
        registry: Arc<Registry>,
    ) -> Self {
        Self {
            store,
            auth,
            registry,
            locks: SessionLocks::default(),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Handle one inbound message from the connection `origin`.
    /// Any failure is sent back to `origin` as an `ERROR` message.
    pub fn handle(&self, origin: &Handle, input: &str) {
        if let Err(err) = self.try_handle(origin, input) {
            match err.kind() {
                ErrorKind::Internal => error!("command failed: {err}"),
                _ => warn!("command rejected: {err}"),
            }
            let reply = ServerMessage::from_error(&err);
            if let Err(io_err) = origin.send(&reply.to_string()) {
                debug!("could not deliver error reply: {io_err}");
            }
        }
    }

    fn try_handle(&self, origin: &Handle, input: &str) -> error::Result<()> {
        let envelope = UserGameCommand::parse_command(input)?;
        let username = self.auth.resolve_identity(&envelope.auth_token)?;
        let command = envelope.command()?;
        let id = envelope.game_id;
        debug!("{username} sent {:?} for game {id}", envelope.command_type);

        let lock = self.locks.lock_for(id);
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.run_locked(origin, &username, id, command)
        };
        self.locks.release(id, lock);
        result
    }

    /// Run a command while holding the lock of session `id`.
    fn run_locked(
        &self,
        origin: &Handle,
        username: &str,
        id: GameId,
        command: Command,
    ) -> error::Result<()> {
        let session = self.store.session(id)?;
        self.registry.add(username, id, Arc::clone(origin));

        match command {
            Command::Connect => self.connect(username, &session),
            Command::MakeMove(move_) => self.make_move(username, session, move_),
            Command::Leave => self.leave(username, &session),
            Command::Resign => self.resign(username, &session),
        }
    }

    fn connect(&self, username: &str, session: &Session) -> error::Result<()> {
        let role = session.role_of(username);
        info!("{username} joined game {} as {role}", session.id);

        let load = ServerMessage::new_load_game(session.game.clone());
        self.registry.send_to(username, &load);

        let notice = ServerMessage::new_notification(format!("{username} joined as {role}"));
        self.registry.broadcast(session.id, &notice, Some(username));
        Ok(())
    }

    fn make_move(&self, username: &str, mut session: Session, move_: Move) -> error::Result<()> {
        if session.is_over() {
            return Err((ErrorKind::InvalidMove, "game is over").into());
        }
        let color = session
            .role_of(username)
            .color()
            .ok_or((ErrorKind::InvalidMove, "observers cannot make moves"))?;

        if let Some(piece) = session.game.board()[*move_.start()] {
            if *piece.color() != color {
                return Err((ErrorKind::InvalidMove, "can only move your own pieces").into());
            }
        }

        let move_info = session.game.apply_move(move_)?;
        let state = session.game.status();
        let outcome = match state {
            GameState::Checkmate => Some(Outcome::Checkmate { winner: color }),
            GameState::Stalemate => Some(Outcome::Stalemate),
            GameState::Check | GameState::InProgress => None,
        };

        // The move and the result it produces are stored together.
        self.store.update_game(session.id, session.game.clone(), outcome)?;
        debug!("game {}: {username} played {move_}", session.id);
        if let Some(outcome) = outcome {
            info!("game {} over: {outcome}", session.id);
        }

        let opponent = !color;

        let load = ServerMessage::new_load_game(session.game);
        self.registry.broadcast(session.id, &load, None);

        let moved = ServerMessage::new_notification(format!("{username} moved {move_info}"));
        self.registry.broadcast(session.id, &moved, Some(username));

        let status_text = match state {
            GameState::Checkmate => Some(format!("{opponent} is in checkmate - GAME OVER")),
            GameState::Stalemate => Some(format!("{opponent} is in stalemate - GAME OVER")),
            GameState::Check => Some(format!("{opponent} is in check")),
            GameState::InProgress => None,
        };
        if let Some(text) = status_text {
            self.registry
                .broadcast(session.id, &ServerMessage::new_notification(text), None);
        }
        Ok(())
    }

    fn leave(&self, username: &str, session: &Session) -> error::Result<()> {
        if let Some(color) = session.role_of(username).color() {
            self.store.vacate_seat(session.id, color)?;
        }
        self.registry.remove(username);
        info!("{username} left game {}", session.id);

        let notice = ServerMessage::new_notification(format!("{username} has left the game"));
        self.registry.broadcast(session.id, &notice, None);
        Ok(())
    }

    fn resign(&self, username: &str, session: &Session) -> error::Result<()> {
        if session.is_over() {
            return Err((ErrorKind::InvalidMove, "game is over").into());
        }
        let color: Color = session
            .role_of(username)
            .color()
            .ok_or((ErrorKind::InvalidMove, "observers cannot resign"))?;

        let winner = !color;
        let outcome = Outcome::Resignation { winner };
        self.store.conclude(session.id, outcome)?;
        info!("game {} over: {outcome}", session.id);

        let text = format!("{username} resigned - {winner} wins - GAME OVER");
        self.registry
            .broadcast(session.id, &ServerMessage::new_notification(text), None);
        Ok(())
    }
}
