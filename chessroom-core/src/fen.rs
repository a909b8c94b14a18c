//! Forsyth–Edwards Notation, a standard notation for describing a chess position.
//!
//! Only the piece placement and side to move fields carry meaning here.
//! Castling, en passant and the move clocks are accepted so that standard
//! FEN strings parse, but they are ignored, and written out as `- - 0 1`.
//!
//! # Example
//! Starting position: `rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1`

use std::convert::TryFrom;
use std::error;
use std::fmt::{self, Display};

use crate::board::Board;
use crate::coretypes::{Color, Piece, Position};

/// Error kinds produced while parsing a FEN string.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ParseFenError {
    /// String has no placement field.
    IllFormed,
    /// Placement field does not describe exactly 8 rows of 8 squares.
    Placement,
    /// Side to move field is not `w` or `b`.
    SideToMove,
}

impl Display for ParseFenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            ParseFenError::IllFormed => "fen ill formed",
            ParseFenError::Placement => "fen piece placement malformed",
            ParseFenError::SideToMove => "fen side to move malformed",
        })
    }
}

impl error::Error for ParseFenError {}

/// Types that can be read from and written to FEN.
pub trait Fen: Sized {
    /// Attempt to parse a Fen string into implementing type.
    fn parse_fen(s: &str) -> Result<Self, ParseFenError>;

    /// Returns string representation of implementing type in Fen format.
    fn to_fen(&self) -> String;
}

/// Parse the piece placement field alone, e.g. `8/8/8/4k3/8/8/8/4K3`.
pub fn parse_placement(placement: &str) -> Result<Board, ParseFenError> {
    let rows: Vec<&str> = placement.split('/').collect();
    if rows.len() != Board::RANKS {
        return Err(ParseFenError::Placement);
    }

    let mut board = Board::new();
    // The first FEN row is row 8.
    for (row_str, row) in rows.into_iter().zip((1..=8u8).rev()) {
        let mut col = 1u8;
        for ch in row_str.chars() {
            if let Some(empty) = ch.to_digit(10) {
                if !(1..=8).contains(&empty) {
                    return Err(ParseFenError::Placement);
                }
                col += empty as u8;
            } else {
                let piece = Piece::try_from(ch).map_err(|_| ParseFenError::Placement)?;
                let position =
                    Position::checked(row as i64, col as i64).ok_or(ParseFenError::Placement)?;
                board.place(position, piece);
                col += 1;
            }
            if col > 9 {
                return Err(ParseFenError::Placement);
            }
        }
        if col != 9 {
            return Err(ParseFenError::Placement);
        }
    }
    Ok(board)
}

/// Write the piece placement field of a board.
pub fn placement(board: &Board) -> String {
    let mut placement = String::with_capacity(72);

    for row in (1..=8u8).rev() {
        let mut empty = 0;
        for col in 1..=8u8 {
            match board[Position::new(row, col)] {
                Some(piece) => {
                    if empty > 0 {
                        placement.push_str(&empty.to_string());
                        empty = 0;
                    }
                    placement.push(char::from(piece));
                }
                None => empty += 1,
            }
        }
        if empty > 0 {
            placement.push_str(&empty.to_string());
        }
        if row > 1 {
            placement.push('/');
        }
    }
    placement
}

/// Parse the optional side to move field, defaulting to White when absent.
pub(crate) fn parse_side_to_move(field: Option<&str>) -> Result<Color, ParseFenError> {
    match field {
        None | Some("w") => Ok(Color::White),
        Some("b") => Ok(Color::Black),
        Some(_) => Err(ParseFenError::SideToMove),
    }
}

impl Fen for Board {
    fn parse_fen(s: &str) -> Result<Self, ParseFenError> {
        let placement_field = s.split_whitespace().next().ok_or(ParseFenError::IllFormed)?;
        parse_placement(placement_field)
    }

    fn to_fen(&self) -> String {
        placement(self)
    }
}
