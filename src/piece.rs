use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// The two sides of a backgammon game.
///
/// WHITE travels from point 23 toward point 0 and bears off past −1;
/// BLACK travels from point 0 toward point 23 and bears off past 24.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opposite(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Index into a `[T; 2]` per-side array.
    pub fn index(self) -> usize {
        match self {
            Color::White => 0,
            Color::Black => 1,
        }
    }

    /// Per-pip displacement applied to a point index when this side moves.
    pub fn direction(self) -> i32 {
        match self {
            Color::White => -1,
            Color::Black => 1,
        }
    }

    /// Sentinel `src` used by a `Move::Checker` entering from the bar.
    pub fn bar_point(self) -> i32 {
        match self {
            Color::White => 24,
            Color::Black => -1,
        }
    }

    /// Sentinel `dst` used by a `Move::Checker` bearing a checker off.
    pub fn bearing_off_point(self) -> i32 {
        match self {
            Color::White => -1,
            Color::Black => 24,
        }
    }

    /// The inclusive range of points making up this side's home board.
    pub fn home_range(self) -> RangeInclusive<i32> {
        match self {
            Color::White => 0..=5,
            Color::Black => 18..=23,
        }
    }
}
