pub mod board;
pub mod coretypes;
pub mod dispatch;
pub mod error;
pub mod fen;
pub mod game;
pub mod movegen;
pub mod perft;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod threads;

pub use board::Board;
pub use coretypes::{Color, Move, MoveInfo, Piece, PieceKind, Position};
pub use dispatch::Dispatcher;
pub use game::{Game, GameState};
pub use protocol::{GameId, ServerMessage, UserGameCommand};
pub use registry::{ChannelTransport, Handle, Registry, Transport};
pub use session::{
    Authenticator, MemoryAuth, MemorySessionStore, Outcome, Role, Session, SessionStore,
};
