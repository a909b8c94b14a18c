//! Performance Test
//!
//! [Perft](https://www.chessprogramming.org/Perft)
//!
//! A simple debugging and testing function used to count
//! the number of nodes at a specific depth.
//!
//! Castling and en passant are not part of these rules, so only positions
//! and depths where neither can occur match published perft tables.

use std::ops::{Add, AddAssign};
use std::sync::{Mutex, PoisonError};
use std::thread;

use crate::coretypes::Move;
use crate::game::Game;

/// Debugging information about results of perft test.
/// nodes: Number of nodes at lowest depth of perft.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PerftInfo {
    pub nodes: u64,
}

impl PerftInfo {
    fn new(nodes: u64) -> Self {
        PerftInfo { nodes }
    }
}

impl Add for PerftInfo {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        PerftInfo {
            nodes: self.nodes + rhs.nodes,
        }
    }
}

impl AddAssign for PerftInfo {
    fn add_assign(&mut self, rhs: Self) {
        self.nodes += rhs.nodes;
    }
}

/// Count the number of nodes at a certain depth.
/// This ignores higher terminal nodes.
/// In other words, it counts the number of paths to the given depth.
/// Root moves are shared between `threads` workers, which steal one move at a time.
pub fn perft(game: Game, ply: u8, threads: usize) -> PerftInfo {
    // Guard easy to calculate inputs.
    if ply == 0 {
        return PerftInfo::new(1);
    } else if ply <= 2 || threads <= 1 {
        return perft_recurse(&game, ply);
    }

    let legal_moves = game.all_legal_moves(*game.turn());
    if legal_moves.is_empty() {
        return PerftInfo::new(0);
    }

    let legal_moves = Mutex::new(legal_moves);
    let total = Mutex::new(PerftInfo::default());

    // Create threads to process partitioned moves.
    thread::scope(|scope| {
        for _ in 0..threads {
            scope.spawn(|| perft_executor(&game, ply, &legal_moves, &total));
        }
    });

    total.into_inner().unwrap_or_else(PoisonError::into_inner)
}

/// perft_executor works by stealing one move at a time from the shared root moves and running perft on it.
/// When there are no moves left to steal, it adds what it has counted to the total and returns.
fn perft_executor(game: &Game, ply: u8, moves: &Mutex<Vec<Move>>, total: &Mutex<PerftInfo>) {
    debug_assert!(ply > 1);
    let steal = || moves.lock().unwrap_or_else(PoisonError::into_inner).pop();
    let mut perft_info = PerftInfo::default();

    while let Some(move_) = steal() {
        let mut child = game.clone();
        child.play_unchecked(move_);
        perft_info += perft_recurse(&child, ply - 1);
    }

    *total.lock().unwrap_or_else(PoisonError::into_inner) += perft_info;
}

/// Ply must be non-zero.
fn perft_recurse(game: &Game, ply: u8) -> PerftInfo {
    debug_assert_ne!(ply, 0);
    let legal_moves = game.all_legal_moves(*game.turn());
    if ply == 1 {
        // If we reach the depth before the end,
        // return the count of legal moves.
        return PerftInfo::new(legal_moves.len() as u64);
    }

    let mut perft_info = PerftInfo::default();
    for legal_move in legal_moves {
        let mut child = game.clone();
        child.play_unchecked(legal_move);
        perft_info += perft_recurse(&child, ply - 1);
    }
    perft_info
}
