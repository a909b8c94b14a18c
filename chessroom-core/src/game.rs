//! Game structure, the rules engine.
//!
//! A Game owns one Board and the color whose turn it is. All legality
//! questions are answered by probing copies of the board, the live board only
//! changes through [`Game::apply_move`].

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::coretypes::{Color, Move, MoveInfo, Piece, Position};
use crate::error::{self, ErrorKind};
use crate::fen::{self, Fen, ParseFenError};
use crate::movegen::{self as mg, PieceMoves};

/// Check state of the side to move.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum GameState {
    InProgress,
    Check,
    Checkmate,
    Stalemate,
}

impl GameState {
    /// True for states with no legal continuation.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, GameState::Checkmate | GameState::Stalemate)
    }
}

/// Game contains a board and the color of the player to move.
/// Serializes to the wire shape `{"board": [...], "turn": "WHITE"}`.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Game {
    board: Board,
    turn: Color,
}

impl Game {
    /// Create a new game in the standard chess start position, White to move.
    pub fn new() -> Self {
        Self::start_position()
    }

    /// Create a new game in the standard chess start position, White to move.
    pub fn start_position() -> Self {
        Self::from_parts(Board::start_position(), Color::White)
    }

    /// Create a game from an arbitrary board and side to move.
    pub fn from_parts(board: Board, turn: Color) -> Self {
        Self { board, turn }
    }

    /// Parse a game from FEN. Only placement and side to move are read.
    pub fn from_fen(s: &str) -> error::Result<Self> {
        Ok(Self::parse_fen(s)?)
    }

    /// Const getters.
    pub fn board(&self) -> &Board {
        &self.board
    }
    pub fn turn(&self) -> &Color {
        &self.turn
    }

    /// Legal moves for the piece on `position`, or an empty list if there is none.
    /// Each pseudo-legal candidate is tried on a copy of the board, and kept only
    /// if the mover's king is not in check afterwards.
    pub fn legal_moves(&self, position: Position) -> PieceMoves {
        let color = match self.board[position] {
            Some(piece) => piece.color,
            None => return PieceMoves::new(),
        };

        mg::piece_moves(&self.board, position)
            .into_iter()
            .filter(|&move_| {
                let mut probe = self.board.clone();
                probe.do_move(move_);
                !king_attacked(&probe, color)
            })
            .collect()
    }

    /// Union of legal moves of every piece of `color`.
    pub fn all_legal_moves(&self, color: Color) -> Vec<Move> {
        self.board
            .pieces_of(color)
            .flat_map(|(position, _)| self.legal_moves(position))
            .collect()
    }

    /// Returns true if `color` has at least one legal move.
    pub fn has_legal_moves(&self, color: Color) -> bool {
        self.board
            .pieces_of(color)
            .any(|(position, _)| !self.legal_moves(position).is_empty())
    }

    /// Returns true if any opposing piece has a pseudo-legal move onto `color`'s king.
    /// A board without a king of `color` is never in check.
    pub fn is_in_check(&self, color: Color) -> bool {
        king_attacked(&self.board, color)
    }

    /// In check and without any legal move.
    pub fn is_in_checkmate(&self, color: Color) -> bool {
        self.is_in_check(color) && !self.has_legal_moves(color)
    }

    /// Not in check and without any legal move.
    pub fn is_in_stalemate(&self, color: Color) -> bool {
        !self.is_in_check(color) && !self.has_legal_moves(color)
    }

    /// Check state of the side to move.
    pub fn status(&self) -> GameState {
        let in_check = self.is_in_check(self.turn);
        match (in_check, self.has_legal_moves(self.turn)) {
            (true, false) => GameState::Checkmate,
            (false, false) => GameState::Stalemate,
            (true, true) => GameState::Check,
            (false, true) => GameState::InProgress,
        }
    }

    /// Apply a move for the side to move.
    /// The move is rejected with `InvalidMove` if there is no piece on its start,
    /// the piece does not belong to the side to move, or it is not legal.
    /// A rejected move leaves the game untouched.
    pub fn apply_move(&mut self, move_: Move) -> error::Result<MoveInfo> {
        let piece = self.board[move_.start]
            .ok_or_else(|| (ErrorKind::InvalidMove, format!("no piece at {}", move_.start)))?;

        if piece.color != self.turn {
            return Err((ErrorKind::InvalidMove, format!("not {}'s turn", piece.color)).into());
        }
        if !self.legal_moves(move_.start).contains(&move_) {
            return Err((ErrorKind::InvalidMove, format!("{move_} is not legal")).into());
        }

        let captured = self.play_unchecked(move_);
        Ok(MoveInfo::new(move_, piece, captured))
    }

    /// Apply a move known to be legal and flip the turn.
    /// Returns the captured piece, if any.
    pub(crate) fn play_unchecked(&mut self, move_: Move) -> Option<Piece> {
        let captured = self.board.do_move(move_);
        self.turn = !self.turn;
        captured
    }
}

fn king_attacked(board: &Board, color: Color) -> bool {
    board
        .find_king(color)
        .map_or(false, |king| mg::is_attacked(board, king, !color))
}

/// Default value is that of a standard starting chess position.
impl Default for Game {
    fn default() -> Self {
        Self::start_position()
    }
}

impl Fen for Game {
    fn parse_fen(s: &str) -> Result<Self, ParseFenError> {
        let mut fields = s.split_whitespace();
        let board = fen::parse_placement(fields.next().ok_or(ParseFenError::IllFormed)?)?;
        let turn = fen::parse_side_to_move(fields.next())?;
        Ok(Self::from_parts(board, turn))
    }

    fn to_fen(&self) -> String {
        format!("{} {} - - 0 1", fen::placement(&self.board), self.turn.to_char())
    }
}

impl Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{} to move", self.board, self.turn)
    }
}
