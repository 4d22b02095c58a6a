use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::piece::Color;
use crate::position::Position;

/// A linear approximation of White's win probability from a position's
/// feature vector, trained outside this crate (see `Position::features`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LinearValueModel {
    pub weights: [f64; 26],
    pub bias: f64,
}

impl LinearValueModel {
    /// Evaluates the raw linear score and clamps it into `[0, 1]`. The
    /// weights are trained offline with ordinary linear regression against
    /// game outcomes, so there's no logit link to undo here.
    pub fn evaluate(&self, position: &Position) -> f64 {
        let features = position.features();
        let mut score = self.bias;
        for (w, f) in self.weights.iter().zip(features.iter()) {
            score += w * (*f as f64);
        }
        score.clamp(0.0, 1.0)
    }
}

/// The policy used to estimate a value for a position reached at the edge
/// of the tree, in place of continuing search.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum DefaultPolicy {
    /// Play uniformly-random legal moves all the way to a terminal position.
    Uniform,
    /// Play uniformly-random legal moves for `depth` plies, then fall back
    /// to a linear value model instead of continuing to a terminal state.
    LinearApproximator { depth: u32, model: LinearValueModel },
}

impl DefaultPolicy {
    /// Estimates White's win probability for `position` by rolling out a
    /// clone according to this policy. Always returns a value in `[0, 1]`.
    pub fn rollout_value(&self, position: &Position, rng: &mut impl Rng) -> f64 {
        match self {
            DefaultPolicy::Uniform => uniform_rollout(position.clone(), rng),
            DefaultPolicy::LinearApproximator { depth, model } => {
                truncated_rollout(position.clone(), *depth, model, rng)
            }
        }
    }
}

fn play_random_move(pos: &mut Position, rng: &mut impl Rng) {
    let moves = pos.legal_moves();
    let mv = moves[rng.gen_range(0..moves.len())];
    pos.apply(&mv).expect("legal_moves() only returns legal moves");
}

fn terminal_value(pos: &Position) -> f64 {
    match pos.winner().expect("game_ended() implies winner() is Ok") {
        Color::White => 1.0,
        Color::Black => 0.0,
    }
}

fn uniform_rollout(mut pos: Position, rng: &mut impl Rng) -> f64 {
    while !pos.game_ended() {
        play_random_move(&mut pos, rng);
    }
    terminal_value(&pos)
}

fn truncated_rollout(mut pos: Position, depth: u32, model: &LinearValueModel, rng: &mut impl Rng) -> f64 {
    let mut plies = 0;
    while !pos.game_ended() && plies < depth {
        play_random_move(&mut pos, rng);
        plies += 1;
    }
    if pos.game_ended() {
        terminal_value(&pos)
    } else {
        model.evaluate(&pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn uniform_rollout_returns_zero_or_one() {
        let pos = Position::new();
        let mut rng = StdRng::seed_from_u64(7);
        let v = DefaultPolicy::Uniform.rollout_value(&pos, &mut rng);
        assert!(v == 0.0 || v == 1.0);
    }

    #[test]
    fn linear_model_evaluates_opening_position_near_one_half() {
        let model = LinearValueModel { weights: [0.0; 26], bias: 0.5 };
        let pos = Position::new();
        assert_eq!(model.evaluate(&pos), 0.5);
    }

    #[test]
    fn linear_model_clamps_out_of_range_scores() {
        let model = LinearValueModel { weights: [0.0; 26], bias: 4.0 };
        let pos = Position::new();
        assert_eq!(model.evaluate(&pos), 1.0);

        let model = LinearValueModel { weights: [0.0; 26], bias: -4.0 };
        assert_eq!(model.evaluate(&pos), 0.0);
    }

    #[test]
    fn truncated_rollout_falls_back_to_model_when_not_terminal() {
        let model = LinearValueModel { weights: [0.0; 26], bias: 10.0 };
        let pos = Position::new();
        let mut rng = StdRng::seed_from_u64(3);
        let policy = DefaultPolicy::LinearApproximator { depth: 0, model };
        let v = policy.rollout_value(&pos, &mut rng);
        assert!(v > 0.99);
    }
}
