//! The fundamental and simple types of `chessroom_core`.

use std::convert::TryFrom;
use std::fmt::{self, Display, Write};
use std::ops::Not;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{self, ErrorKind};

///////////////
// Constants //
///////////////
pub const NUM_FILES: usize = 8; // Columns 1-8, a-h.
pub const NUM_RANKS: usize = 8; // Rows 1-8.
pub const NUM_SQUARES: usize = NUM_FILES * NUM_RANKS;

// A queen in the center of an empty board reaches 27 squares.
// A pawn reaching the back rank has at most 3 destinations * 4 promotions.
pub const MAX_PIECE_MOVES: usize = 27;

/////////////////////////
// Data and Structures //
/////////////////////////

/// Color can represent the color of a piece, or a player.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Color {
    White,
    Black,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PieceKind {
    King,
    Queen,
    Bishop,
    Knight,
    Rook,
    Pawn,
}

/// A chess piece. Pieces have no identity, two pieces of the same color and
/// kind are interchangeable.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Piece {
    #[serde(rename = "pieceColor")]
    pub(crate) color: Color,
    #[serde(rename = "type")]
    pub(crate) piece_kind: PieceKind,
}

/// A square of the board addressed by 1-based row and column.
/// Row 1 is White's home rank, column 1 is the a-file.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPosition")]
pub struct Position {
    row: u8,
    col: u8,
}

/// Unvalidated position as received over the wire.
#[derive(Deserialize)]
struct RawPosition {
    row: i64,
    col: i64,
}

/// A single ply: the piece on `start` moves to `end`, optionally promoting.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub(crate) start: Position,
    pub(crate) end: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) promotion: Option<PieceKind>,
}

/// MoveInfo contains extra properties of a move in context of the board it was applied to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MoveInfo {
    pub(crate) move_: Move,
    /// Piece that stood on the start square.
    pub(crate) piece: Piece,
    /// Piece that was removed from the end square, if any.
    pub(crate) captured: Option<Piece>,
}

//////////////////////
/// Implementations //
//////////////////////

impl Color {
    pub const ALL: [Color; 2] = [Color::White, Color::Black];

    /// FEN compliant conversion.
    pub const fn to_char(&self) -> char {
        match self {
            Color::White => 'w',
            Color::Black => 'b',
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Color::White => "WHITE",
            Color::Black => "BLACK",
        }
    }

    /// Row offset of a forward pawn step.
    pub const fn forward(&self) -> i8 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }

    /// Row where this color's pawns start and may double step from.
    pub const fn pawn_row(&self) -> u8 {
        match self {
            Color::White => 2,
            Color::Black => 7,
        }
    }

    /// Row where this color's pawns promote.
    pub const fn promotion_row(&self) -> u8 {
        match self {
            Color::White => 8,
            Color::Black => 1,
        }
    }
}

impl Not for Color {
    type Output = Self;
    fn not(self) -> Self::Output {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

impl Not for &Color {
    type Output = Color;
    fn not(self) -> Self::Output {
        Color::not(*self)
    }
}

impl TryFrom<char> for Color {
    type Error = error::Error;
    fn try_from(ch: char) -> error::Result<Self> {
        match ch {
            'w' => Ok(Color::White),
            'b' => Ok(Color::Black),
            _ => Err((ErrorKind::ParsePieceMalformed, "color char is not w|b").into()),
        }
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PieceKind {
    /// Kinds a pawn may promote to, in generation order.
    pub const PROMOTIONS: [PieceKind; 4] = [
        PieceKind::Rook,
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Queen,
    ];

    /// FEN compliant conversion, defaults as white pieces.
    pub const fn to_char(&self) -> char {
        match self {
            PieceKind::Pawn => 'P',
            PieceKind::Rook => 'R',
            PieceKind::Knight => 'N',
            PieceKind::Bishop => 'B',
            PieceKind::Queen => 'Q',
            PieceKind::King => 'K',
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            PieceKind::Pawn => "PAWN",
            PieceKind::Rook => "ROOK",
            PieceKind::Knight => "KNIGHT",
            PieceKind::Bishop => "BISHOP",
            PieceKind::Queen => "QUEEN",
            PieceKind::King => "KING",
        }
    }

    /// Returns true if PieceKind can slide, false otherwise.
    /// Sliding piece_kinds are Rooks, Bishops, and Queens.
    pub const fn is_sliding(&self) -> bool {
        matches!(self, PieceKind::Rook | PieceKind::Bishop | PieceKind::Queen)
    }
}

impl Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Piece {
    pub const fn new(color: Color, piece_kind: PieceKind) -> Self {
        Piece { color, piece_kind }
    }
    /// Immutable Getters.
    pub const fn color(&self) -> &Color {
        &self.color
    }
    pub const fn piece_kind(&self) -> &PieceKind {
        &self.piece_kind
    }

    /// FEN character, uppercase for White and lowercase for Black.
    pub const fn to_char(&self) -> char {
        match self.color {
            Color::White => self.piece_kind.to_char(),
            Color::Black => self.piece_kind.to_char().to_ascii_lowercase(),
        }
    }
}

impl From<Piece> for char {
    fn from(piece: Piece) -> Self {
        piece.to_char()
    }
}

impl TryFrom<char> for Piece {
    type Error = error::Error;
    fn try_from(value: char) -> error::Result<Self> {
        let color = match value.is_ascii_uppercase() {
            true => Color::White,
            false => Color::Black,
        };
        let piece_kind = match value.to_ascii_uppercase() {
            'P' => PieceKind::Pawn,
            'R' => PieceKind::Rook,
            'N' => PieceKind::Knight,
            'B' => PieceKind::Bishop,
            'Q' => PieceKind::Queen,
            'K' => PieceKind::King,
            _ => {
                return Err((
                    ErrorKind::ParsePieceMalformed,
                    "char is not in PRNBQKprnbqk",
                )
                    .into())
            }
        };
        Ok(Piece { color, piece_kind })
    }
}

/// # Example
/// `WHITE QUEEN`
impl Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.color, self.piece_kind)
    }
}

impl Position {
    /// Create a position from 1-based coordinates.
    /// Panics if either coordinate is outside of 1..=8, addressing a square off
    /// the board is a programming error.
    pub const fn new(row: u8, col: u8) -> Self {
        assert!(row >= 1 && row <= 8, "row out of range");
        assert!(col >= 1 && col <= 8, "col out of range");
        Self { row, col }
    }

    /// Create a position from possibly out of range coordinates.
    pub fn checked(row: i64, col: i64) -> Option<Self> {
        let valid = 1..=NUM_RANKS as i64;
        (valid.contains(&row) && valid.contains(&col)).then(|| Self {
            row: row as u8,
            col: col as u8,
        })
    }

    pub const fn row(&self) -> u8 {
        self.row
    }

    pub const fn col(&self) -> u8 {
        self.col
    }

    /// Index of this position into a row-major array of 64 squares, a1 = 0, h8 = 63.
    pub const fn idx(&self) -> usize {
        (self.row as usize - 1) * NUM_FILES + (self.col as usize - 1)
    }

    /// Inverse of `idx`. Panics if idx is not in 0..64.
    pub const fn from_idx(idx: usize) -> Self {
        assert!(idx < NUM_SQUARES, "square index out of range");
        Self {
            row: (idx / NUM_FILES) as u8 + 1,
            col: (idx % NUM_FILES) as u8 + 1,
        }
    }

    /// Returns the position shifted by the given row and column deltas,
    /// or None if that leaves the board.
    pub fn offset(&self, d_row: i8, d_col: i8) -> Option<Self> {
        Self::checked(
            self.row as i64 + d_row as i64,
            self.col as i64 + d_col as i64,
        )
    }

    /// Iterator over all 64 positions, row by row starting at a1.
    pub fn iter() -> impl Iterator<Item = Position> {
        (0..NUM_SQUARES).map(Position::from_idx)
    }

    /// Lowercase file letter of this position's column.
    pub const fn file_char(&self) -> char {
        (b'a' + self.col - 1) as char
    }
}

impl TryFrom<RawPosition> for Position {
    type Error = error::Error;
    fn try_from(raw: RawPosition) -> error::Result<Self> {
        Position::checked(raw.row, raw.col).ok_or_else(|| {
            (
                ErrorKind::ParsePositionOutOfRange,
                format!("({}, {}) is not on the board", raw.row, raw.col),
            )
                .into()
        })
    }
}

/// Position ::= <fileLetter><rankNumber>, for example `e2`.
impl FromStr for Position {
    type Err = error::Error;
    fn from_str(s: &str) -> error::Result<Self> {
        let mut chars = s.chars();
        let file = chars.next().ok_or(ErrorKind::ParsePositionMalformed)?;
        let rank = chars.next().ok_or(ErrorKind::ParsePositionMalformed)?;
        if chars.next().is_some() {
            return Err((ErrorKind::ParsePositionMalformed, "trailing characters").into());
        }
        let col = match file {
            'a'..='h' => file as i64 - 'a' as i64 + 1,
            _ => return Err((ErrorKind::ParsePositionMalformed, "file not of abcdefgh").into()),
        };
        let row = rank
            .to_digit(10)
            .ok_or((ErrorKind::ParsePositionMalformed, "rank not a digit"))?;
        Position::checked(row as i64, col).ok_or_else(|| {
            (ErrorKind::ParsePositionOutOfRange, "rank not of 12345678").into()
        })
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_char(self.file_char())?;
        write!(f, "{}", self.row)
    }
}

impl Move {
    pub const fn new(start: Position, end: Position, promotion: Option<PieceKind>) -> Self {
        Self {
            start,
            end,
            promotion,
        }
    }

    // Immutable Getters
    pub const fn start(&self) -> &Position {
        &self.start
    }
    pub const fn end(&self) -> &Position {
        &self.end
    }
    pub const fn promotion(&self) -> &Option<PieceKind> {
        &self.promotion
    }
}

/// Parses `Pure Algebraic Coordinate Notation`, such as `e2e4` or `a7a8q`.
impl FromStr for Move {
    type Err = error::Error;
    fn from_str(s: &str) -> error::Result<Self> {
        let s = s.trim();
        if !(4..=5).contains(&s.len()) || !s.is_ascii() {
            return Err((ErrorKind::ParseMoveMalformed, s).into());
        }
        let start: Position = s[0..2].parse()?;
        let end: Position = s[2..4].parse()?;

        let promotion = match s.chars().nth(4) {
            Some('q') => Some(PieceKind::Queen),
            Some('r') => Some(PieceKind::Rook),
            Some('b') => Some(PieceKind::Bishop),
            Some('n') => Some(PieceKind::Knight),
            Some(_) => return Err((ErrorKind::ParseMoveMalformed, "bad promotion").into()),
            None => None,
        };

        Ok(Self {
            start,
            end,
            promotion,
        })
    }
}

/// # Example
/// Move { start: a7, end: b8, promotion: Some(Queen) } -> `a7b8q`.
impl Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.start, self.end)?;
        if let Some(piece_kind) = self.promotion {
            f.write_char(piece_kind.to_char().to_ascii_lowercase())?;
        }
        Ok(())
    }
}

impl MoveInfo {
    pub const fn new(move_: Move, piece: Piece, captured: Option<Piece>) -> Self {
        Self {
            move_,
            piece,
            captured,
        }
    }

    // Immutable Getters
    pub const fn move_(&self) -> &Move {
        &self.move_
    }
    pub const fn piece(&self) -> &Piece {
        &self.piece
    }
    pub const fn captured(&self) -> &Option<Piece> {
        &self.captured
    }

    /// Returns true if this MoveInfo came from a capturing move.
    pub fn is_capture(&self) -> bool {
        self.captured.is_some()
    }
}

/// Human readable description, for example
/// `WHITE PAWN from e7 to f8 capturing BLACK ROOK promoting to QUEEN`.
impl Display for MoveInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} from {} to {}",
            self.piece, self.move_.start, self.move_.end
        )?;
        if let Some(captured) = self.captured {
            write!(f, " capturing {captured}")?;
        }
        if let Some(promotion) = self.move_.promotion {
            write!(f, " promoting to {promotion}")?;
        }
        Ok(())
    }
}
