//! A [mailbox](https://www.chessprogramming.org/Mailbox) is a square-centric
//! representation of a chess board.
//!
//! The Board is an array of size Files x Ranks where each index may contain a
//! chess piece or be empty.

use std::fmt::{self, Display};
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::coretypes::{
    Color, Move, Piece, PieceKind, Position, NUM_FILES, NUM_RANKS, NUM_SQUARES,
};
use crate::error::{self, ErrorKind};

/// Classic 8x8 square board representation of Chess board.
/// Index starts at a1.
/// a1 = idx 0
/// b1 = idx 1
/// a2 = idx 8
/// h8 = idx 63
///
/// Boards are plain values, a clone is a full deep copy.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "BoardRows", into = "BoardRows")]
pub struct Board {
    squares: [Option<Piece>; NUM_SQUARES],
}

/// Wire representation of a Board: 8 rows, row 1 first, each with 8 cells, column 1 first.
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
struct BoardRows(Vec<Vec<Option<Piece>>>);

impl Board {
    pub const FILES: usize = NUM_FILES;
    pub const RANKS: usize = NUM_RANKS;
    pub const SIZE: usize = NUM_SQUARES;

    /// Creates an empty Board, where all squares are None.
    pub fn new() -> Self {
        Board {
            squares: [None; Board::SIZE],
        }
    }

    /// Create Board with pieces arranged in starting chess position.
    pub fn start_position() -> Self {
        let mut board = Self::new();
        board.reset();
        board
    }

    /// Clears the board, then places White on rows 1-2 and Black on rows 7-8.
    pub fn reset(&mut self) {
        use Color::*;
        use PieceKind::*;
        const BACK_ROW: [PieceKind; 8] = [Rook, Knight, Bishop, Queen, King, Bishop, Knight, Rook];

        self.squares = [None; Board::SIZE];
        for (col, piece_kind) in (1..=8).zip(BACK_ROW) {
            self[Position::new(1, col)] = Some(Piece::new(White, piece_kind));
            self[Position::new(2, col)] = Some(Piece::new(White, Pawn));
            self[Position::new(7, col)] = Some(Piece::new(Black, Pawn));
            self[Position::new(8, col)] = Some(Piece::new(Black, piece_kind));
        }
    }

    /// Returns the piece on a position, if any.
    pub fn get(&self, position: Position) -> Option<Piece> {
        self.squares[position.idx()]
    }

    /// Puts a piece on a position, replacing whatever stood there.
    pub fn place(&mut self, position: Position, piece: Piece) {
        self.squares[position.idx()] = Some(piece);
    }

    /// Empties a position, returning the piece that stood there.
    pub fn clear(&mut self, position: Position) -> Option<Piece> {
        self.squares[position.idx()].take()
    }

    /// Iterator over every occupied position and its piece, starting from a1.
    pub fn pieces(&self) -> impl Iterator<Item = (Position, Piece)> + '_ {
        self.squares
            .iter()
            .enumerate()
            .filter_map(|(idx, square)| square.map(|piece| (Position::from_idx(idx), piece)))
    }

    /// Iterator over every position holding a piece of `color`.
    pub fn pieces_of(&self, color: Color) -> impl Iterator<Item = (Position, Piece)> + '_ {
        self.pieces().filter(move |(_, piece)| piece.color == color)
    }

    /// Position of the first king of `color`, scanning from a1.
    pub fn find_king(&self, color: Color) -> Option<Position> {
        let king = Piece::new(color, PieceKind::King);
        self.pieces()
            .find(|(_, piece)| *piece == king)
            .map(|(position, _)| position)
    }

    /// Apply a move to self, in place.
    /// `do_move` does not check if the move is legal or not,
    /// it simply executes it while assuming legality.
    /// Does nothing if there is no piece on the start square.
    /// Returns the piece that was on the end square.
    pub fn do_move(&mut self, move_: Move) -> Option<Piece> {
        let moving = self.clear(move_.start)?;
        let placed = match move_.promotion {
            Some(piece_kind) => Piece::new(moving.color, piece_kind),
            None => moving,
        };
        self.squares[move_.end.idx()].replace(placed)
    }

    /// Returns pretty-printed chess board representation of Self.
    /// The chess board has borders and file/rank indicators.
    pub fn pretty(&self) -> String {
        const RANK_SEP: &str = "+---+---+---+---+---+---+---+---+\n";
        let mut pretty = String::with_capacity(626);

        pretty.push_str(RANK_SEP);
        for row in (1..=Self::RANKS as u8).rev() {
            pretty.push_str("| ");

            for col in 1..=Self::FILES as u8 {
                pretty.push(match self[Position::new(row, col)] {
                    Some(piece) => char::from(piece),
                    None => ' ',
                });
                pretty.push_str(" | ");
            }
            pretty.push_str(&row.to_string());
            pretty.push('\n');
            pretty.push_str(RANK_SEP);
        }
        pretty.push_str("  a   b   c   d   e   f   g   h\n");

        pretty
    }
}

impl Index<Position> for Board {
    type Output = Option<Piece>;
    fn index(&self, position: Position) -> &Self::Output {
        &self.squares[position.idx()]
    }
}

impl IndexMut<Position> for Board {
    fn index_mut(&mut self, position: Position) -> &mut Self::Output {
        &mut self.squares[position.idx()]
    }
}

impl From<Board> for BoardRows {
    fn from(board: Board) -> Self {
        BoardRows(
            board
                .squares
                .chunks(Board::FILES)
                .map(|row| row.to_vec())
                .collect(),
        )
    }
}

impl TryFrom<BoardRows> for Board {
    type Error = error::Error;
    fn try_from(BoardRows(rows): BoardRows) -> error::Result<Self> {
        if rows.len() != Board::RANKS || rows.iter().any(|row| row.len() != Board::FILES) {
            return Err((ErrorKind::MalformedCommand, "board must be 8 rows of 8 squares").into());
        }
        let mut board = Board::new();
        for (idx, square) in rows.into_iter().flatten().enumerate() {
            board.squares[idx] = square;
        }
        Ok(board)
    }
}

/// Default value is that of a standard starting chess position.
impl Default for Board {
    fn default() -> Self {
        Board::start_position()
    }
}

impl Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.pretty())
    }
}
