use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::piece::Color;

/// Number of ordinary (non-bar, non-off) points on the board.
pub const NUM_POINTS: usize = 24;
const CHECKERS_PER_SIDE: u8 = 15;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GammonError {
    #[error("{0:?} is not a member of the current legal move set")]
    IllegalMove(Move),
    #[error("winner() called on a position that has not yet ended")]
    NotTerminal,
}

/// A single decision offered to whichever side is to move.
///
/// `DiceRoll` is nature's move (see [`Position::is_nature_turn`]); `Checker`
/// is one constituent pip of a checker turn, src/dst using the bar and
/// bearing-off sentinels from [`Color::bar_point`] / [`Color::bearing_off_point`]
/// where relevant. `Forfeit` is returned alone when no pip of the current
/// dice can legally be played.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Move {
    DiceRoll { i: u8, j: u8 },
    Checker { src: i32, dst: i32, pips: u8 },
    Forfeit,
}

/// Canonical backgammon position: board, bar, borne-off counts, whose turn
/// it is, whether it's nature's turn to roll, and the dice remaining to be
/// played this turn.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Position {
    board: [[u8; NUM_POINTS]; 2],
    bar: [u8; 2],
    borne_off: [u8; 2],
    turn: Color,
    nature_turn: bool,
    has_started: bool,
    dice: Vec<u8>,
}

impl Position {
    /// The canonical backgammon starting layout, before the opening roll.
    pub fn new() -> Self {
        let mut board = [[0u8; NUM_POINTS]; 2];
        board[Color::White.index()][23] = 2;
        board[Color::White.index()][12] = 5;
        board[Color::White.index()][7] = 3;
        board[Color::White.index()][5] = 5;
        board[Color::Black.index()][0] = 2;
        board[Color::Black.index()][11] = 5;
        board[Color::Black.index()][16] = 3;
        board[Color::Black.index()][18] = 5;
        Position {
            board,
            bar: [0, 0],
            borne_off: [0, 0],
            turn: Color::White,
            nature_turn: true,
            has_started: false,
            dice: Vec::new(),
        }
    }

    pub fn board(&self) -> &[[u8; NUM_POINTS]; 2] {
        &self.board
    }

    pub fn bar(&self) -> [u8; 2] {
        self.bar
    }

    pub fn borne_off(&self) -> [u8; 2] {
        self.borne_off
    }

    pub fn turn(&self) -> Color {
        self.turn
    }

    pub fn is_nature_turn(&self) -> bool {
        self.nature_turn
    }

    pub fn has_game_started(&self) -> bool {
        self.has_started
    }

    pub fn dice(&self) -> &[u8] {
        &self.dice
    }

    pub fn game_ended(&self) -> bool {
        self.borne_off[0] == CHECKERS_PER_SIDE || self.borne_off[1] == CHECKERS_PER_SIDE
    }

    pub fn winner(&self) -> Result<Color, GammonError> {
        if self.borne_off[Color::White.index()] == CHECKERS_PER_SIDE {
            Ok(Color::White)
        } else if self.borne_off[Color::Black.index()] == CHECKERS_PER_SIDE {
            Ok(Color::Black)
        } else {
            Err(GammonError::NotTerminal)
        }
    }

    /// 26-element feature vector: per-point White-minus-Black checker
    /// counts (indices 0-23), bar difference (24), borne-off difference (25).
    pub fn features(&self) -> [i32; 26] {
        let mut f = [0i32; 26];
        for p in 0..NUM_POINTS {
            f[p] = self.board[Color::White.index()][p] as i32
                - self.board[Color::Black.index()][p] as i32;
        }
        f[24] = self.bar[Color::White.index()] as i32 - self.bar[Color::Black.index()] as i32;
        f[25] =
            self.borne_off[Color::White.index()] as i32 - self.borne_off[Color::Black.index()] as i32;
        f
    }

    /// Overwrites board/bar/borne-off with a custom fixture and rewinds the
    /// turn/dice state back to "not started", so the next legal move is the
    /// pre-game dice roll. Intended for tests.
    pub fn debug_reset(&mut self, board: [[u8; NUM_POINTS]; 2], bar: [u8; 2], borne_off: [u8; 2]) {
        self.board = board;
        self.bar = bar;
        self.borne_off = borne_off;
        self.turn = Color::White;
        self.nature_turn = true;
        self.has_started = false;
        self.dice = Vec::new();
    }

    /// All legal moves from this position: the 36 dice pairs if it's
    /// nature's turn to roll, otherwise the filtered set of legal checker
    /// submoves (or a single `Forfeit` if none exist).
    pub fn legal_moves(&self) -> Vec<Move> {
        if self.nature_turn {
            let mut moves = Vec::with_capacity(36);
            for i in 1..=6u8 {
                for j in 1..=6u8 {
                    moves.push(Move::DiceRoll { i, j });
                }
            }
            moves
        } else {
            self.legal_checker_moves()
        }
    }

    /// Applies `mv`, which must be a member of [`Position::legal_moves`].
    pub fn apply(&mut self, mv: &Move) -> Result<(), GammonError> {
        if !self.legal_moves().contains(mv) {
            return Err(GammonError::IllegalMove(*mv));
        }
        match *mv {
            Move::DiceRoll { i, j } => {
                if !self.has_started {
                    if i != j {
                        self.has_started = true;
                        self.turn = if i > j { Color::White } else { Color::Black };
                        self.dice = vec![i, j];
                        self.nature_turn = false;
                    }
                    // i == j: discard, nature rolls again.
                } else {
                    self.dice = if i == j { vec![i; 4] } else { vec![i, j] };
                    self.nature_turn = false;
                }
            }
            Move::Checker { src, dst, pips } => {
                self.apply_checker_submove(src, dst, pips);
                if self.dice.is_empty() || self.max_further_submoves() == 0 {
                    self.dice.clear();
                    self.nature_turn = true;
                    self.turn = self.turn.opposite();
                }
            }
            Move::Forfeit => {
                self.dice.clear();
                self.nature_turn = true;
                self.turn = self.turn.opposite();
            }
        }
        Ok(())
    }

    fn can_bear_off(&self, side: Color) -> bool {
        if self.bar[side.index()] > 0 {
            return false;
        }
        let home = side.home_range();
        for p in 0..NUM_POINTS as i32 {
            if !home.contains(&p) && self.board[side.index()][p as usize] > 0 {
                return false;
            }
        }
        true
    }

    /// Whether a White/Black checker still occupies a point farther from
    /// the bear-off edge than `src`, within the home board.
    fn farther_from_edge_occupied(&self, side: Color, src: i32) -> bool {
        match side {
            Color::White => ((src + 1)..=5).any(|p| self.board[Color::White.index()][p as usize] > 0),
            Color::Black => (18..=(src - 1)).any(|p| self.board[Color::Black.index()][p as usize] > 0),
        }
    }

    fn candidate_submoves_for_pip(&self, pip: u8) -> Vec<Move> {
        let side = self.turn;
        let opp = side.opposite();
        let mut moves = Vec::new();

        let sources: Vec<i32> = if self.bar[side.index()] > 0 {
            vec![side.bar_point()]
        } else {
            (0..NUM_POINTS as i32)
                .filter(|&p| self.board[side.index()][p as usize] > 0)
                .collect()
        };

        for src in sources {
            let dst_raw = src + side.direction() * pip as i32;
            if dst_raw < 0 || dst_raw > NUM_POINTS as i32 - 1 {
                if !self.can_bear_off(side) {
                    continue;
                }
                let required = match side {
                    Color::White => src + 1,
                    Color::Black => NUM_POINTS as i32 - src,
                };
                let pip_i = pip as i32;
                if pip_i == required || (pip_i > required && !self.farther_from_edge_occupied(side, src)) {
                    moves.push(Move::Checker {
                        src,
                        dst: side.bearing_off_point(),
                        pips: pip,
                    });
                }
            } else {
                let opp_count = self.board[opp.index()][dst_raw as usize];
                if opp_count >= 2 {
                    continue;
                }
                moves.push(Move::Checker {
                    src,
                    dst: dst_raw,
                    pips: pip,
                });
            }
        }
        moves
    }

    fn apply_checker_submove(&mut self, src: i32, dst: i32, pips: u8) {
        let side = self.turn;
        let opp = side.opposite();

        if src == side.bar_point() {
            self.bar[side.index()] -= 1;
        } else {
            self.board[side.index()][src as usize] -= 1;
        }

        if dst == side.bearing_off_point() {
            self.borne_off[side.index()] += 1;
        } else {
            if self.board[opp.index()][dst as usize] == 1 {
                self.board[opp.index()][dst as usize] = 0;
                self.bar[opp.index()] += 1;
            }
            self.board[side.index()][dst as usize] += 1;
        }

        if let Some(i) = self.dice.iter().position(|&p| p == pips) {
            self.dice.remove(i);
        }
    }

    fn distinct_dice(&self) -> Vec<u8> {
        let mut v = self.dice.clone();
        v.sort_unstable();
        v.dedup();
        v
    }

    /// Maximum number of further submoves playable from this exact position
    /// and remaining dice, by exhaustive lookahead.
    fn max_further_submoves(&self) -> u32 {
        let mut best = 0;
        for pip in self.distinct_dice() {
            for mv in self.candidate_submoves_for_pip(pip) {
                if let Move::Checker { src, dst, pips } = mv {
                    let mut next = self.clone();
                    next.apply_checker_submove(src, dst, pips);
                    let depth = 1 + next.max_further_submoves();
                    if depth > best {
                        best = depth;
                    }
                }
            }
        }
        best
    }

    fn legal_checker_moves(&self) -> Vec<Move> {
        let distinct_pips = self.distinct_dice();
        let mut scored: Vec<(Move, u32)> = Vec::new();
        for pip in &distinct_pips {
            for mv in self.candidate_submoves_for_pip(*pip) {
                if let Move::Checker { src, dst, pips } = mv {
                    let mut next = self.clone();
                    next.apply_checker_submove(src, dst, pips);
                    let depth = 1 + next.max_further_submoves();
                    scored.push((mv, depth));
                }
            }
        }

        if scored.is_empty() {
            return vec![Move::Forfeit];
        }

        let max_depth = scored.iter().map(|(_, d)| *d).max().unwrap();
        let mut kept: Vec<Move> = scored
            .into_iter()
            .filter(|(_, d)| *d == max_depth)
            .map(|(mv, _)| mv)
            .collect();

        if max_depth == 1 && distinct_pips.len() == 2 {
            let max_pip = *distinct_pips.iter().max().unwrap();
            kept.retain(|mv| matches!(mv, Move::Checker { pips, .. } if *pips == max_pip));
        }

        let mut seen = HashSet::new();
        kept.retain(|mv| seen.insert(*mv));
        kept
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::new()
    }
}
