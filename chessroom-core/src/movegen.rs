//! Functions and constants used to help with generating moves for a position.
//!
//! Moves produced here are pseudo-legal: they follow each piece's movement
//! pattern and respect blockers, but may leave the mover's own king in check.
//! Filtering for king safety is done by [`Game`](crate::game::Game).

use arrayvec::ArrayVec;

use crate::board::Board;
use crate::coretypes::{Color, Move, PieceKind, Position, MAX_PIECE_MOVES};

/// Pseudo-legal moves of a single piece. No piece can have more than
/// `MAX_PIECE_MOVES` destinations, so these never allocate.
pub type PieceMoves = ArrayVec<Move, MAX_PIECE_MOVES>;

//////////////////////
// Movement Offsets //
//////////////////////

// (row, col) deltas.
pub const ORTHOGONAL: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
pub const DIAGONAL: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
pub const ADJACENT: [(i8, i8); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];
pub const KNIGHT_JUMPS: [(i8, i8); 8] = [
    (2, 1),
    (2, -1),
    (-2, 1),
    (-2, -1),
    (1, 2),
    (1, -2),
    (-1, 2),
    (-1, -2),
];

///////////////////////////////////////
// Runtime Move Generation Functions //
///////////////////////////////////////

/// Generate pseudo-legal moves for the piece on `from`.
/// Returns an empty list if `from` is empty.
pub fn piece_moves(board: &Board, from: Position) -> PieceMoves {
    let mut moves = PieceMoves::new();
    let piece = match board[from] {
        Some(piece) => piece,
        None => return moves,
    };
    let color = piece.color;

    match piece.piece_kind {
        PieceKind::Rook => slide_moves(board, from, color, &ORTHOGONAL, &mut moves),
        PieceKind::Bishop => slide_moves(board, from, color, &DIAGONAL, &mut moves),
        PieceKind::Queen => {
            slide_moves(board, from, color, &ORTHOGONAL, &mut moves);
            slide_moves(board, from, color, &DIAGONAL, &mut moves);
        }
        PieceKind::King => step_moves(board, from, color, &ADJACENT, &mut moves),
        PieceKind::Knight => step_moves(board, from, color, &KNIGHT_JUMPS, &mut moves),
        PieceKind::Pawn => pawn_moves(board, from, color, &mut moves),
    }
    moves
}

/// Returns true if any piece of color `attacker` has a pseudo-legal move ending on `target`.
pub fn is_attacked(board: &Board, target: Position, attacker: Color) -> bool {
    board
        .pieces_of(attacker)
        .any(|(from, _)| piece_moves(board, from).iter().any(|m| m.end == target))
}

/// Rays along each direction until the board edge, stopping before a friendly
/// piece or on an enemy piece.
fn slide_moves(
    board: &Board,
    from: Position,
    color: Color,
    directions: &[(i8, i8)],
    moves: &mut PieceMoves,
) {
    for &(d_row, d_col) in directions {
        let mut current = from;
        while let Some(to) = current.offset(d_row, d_col) {
            match board[to] {
                None => moves.push(Move::new(from, to, None)),
                Some(blocker) => {
                    if blocker.color != color {
                        moves.push(Move::new(from, to, None));
                    }
                    break;
                }
            }
            current = to;
        }
    }
}

/// Single steps to each offset that is on the board and not friendly occupied.
fn step_moves(
    board: &Board,
    from: Position,
    color: Color,
    offsets: &[(i8, i8)],
    moves: &mut PieceMoves,
) {
    let reachable = offsets
        .iter()
        .filter_map(|&(d_row, d_col)| from.offset(d_row, d_col))
        .filter(|&to| board[to].map_or(true, |piece| piece.color != color));

    for to in reachable {
        moves.push(Move::new(from, to, None));
    }
}

/// Forward pushes onto empty squares, a double push from the starting row if
/// both squares are empty, and diagonal captures of enemy pieces.
/// Any destination on the promotion row is expanded into one move per promotion kind.
fn pawn_moves(board: &Board, from: Position, color: Color, moves: &mut PieceMoves) {
    let forward = color.forward();
    let mut push_pawn = |to: Position| {
        if to.row() == color.promotion_row() {
            for kind in PieceKind::PROMOTIONS {
                moves.push(Move::new(from, to, Some(kind)));
            }
        } else {
            moves.push(Move::new(from, to, None));
        }
    };

    if let Some(single) = from.offset(forward, 0).filter(|&to| board[to].is_none()) {
        push_pawn(single);

        if from.row() == color.pawn_row() {
            if let Some(double) = single.offset(forward, 0).filter(|&to| board[to].is_none()) {
                push_pawn(double);
            }
        }
    }

    for d_col in [-1, 1] {
        let capture = from
            .offset(forward, d_col)
            .filter(|&to| board[to].map_or(false, |piece| piece.color != color));
        if let Some(to) = capture {
            push_pawn(to);
        }
    }
}
