mod policy;
mod tree;

pub use policy::{DefaultPolicy, LinearValueModel};

use std::time::{Duration, Instant};

use rand::Rng;

use crate::piece::Color;
use crate::position::{Move, Position};
use tree::Tree;

/// Tunable knobs for [`choose_move`], mirroring the exploration constant,
/// default policy and stopping budget a Monte Carlo search is driven by.
#[derive(Clone, Debug)]
pub struct SearchConfig {
    /// UCB1 exploration constant `c`.
    pub exploration_c: f64,
    /// Policy used to estimate a value at the edge of the tree.
    pub default_policy: DefaultPolicy,
    /// Wall-clock budget for one call to [`choose_move`].
    pub time_budget: Duration,
    /// Optional cap on the number of rollouts, independent of wall clock.
    pub max_rollouts: Option<u32>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            exploration_c: 1.4,
            default_policy: DefaultPolicy::Uniform,
            time_budget: Duration::from_secs_f64(1.0),
            max_rollouts: None,
        }
    }
}

/// The outcome of a single [`choose_move`] call: the move to play, the
/// tree's value estimate for the root (White's win probability) and how
/// many rollouts were actually run.
#[derive(Clone, Debug)]
pub struct PickResult {
    pub mv: Move,
    pub value: f64,
    pub rollouts: u32,
}

/// Runs MCTS from `position` under `config`'s budget and returns the move
/// with the most visits at the root, alongside the tree's value estimate.
///
/// Never raises from a legal input position. If `position` is already
/// terminal there is no move to choose, so `mv` is the sentinel
/// [`Move::Forfeit`] and `value` is 1.0/0.0 according to who won. If exactly
/// one legal move exists, it's returned without building a tree. If the
/// budget expires before a single iteration completes, an arbitrary legal
/// move is returned (enumeration order) alongside a raw default-policy value
/// on the root, rather than panicking on an empty root-children list.
pub fn choose_move(
    position: &Position,
    config: &SearchConfig,
    rng: &mut impl Rng,
) -> Result<PickResult, crate::position::GammonError> {
    if position.game_ended() {
        let value = match position.winner() {
            Ok(Color::White) => 1.0,
            Ok(Color::Black) => 0.0,
            Err(_) => unreachable!("game_ended() implies winner() is Ok"),
        };
        return Ok(PickResult { mv: Move::Forfeit, value, rollouts: 0 });
    }

    let legal = position.legal_moves();
    if legal.len() == 1 {
        let value = config.default_policy.rollout_value(position, rng);
        return Ok(PickResult { mv: legal[0], value, rollouts: 1 });
    }

    let mut tree = Tree::new(position.clone(), config.exploration_c);
    let deadline = Instant::now() + config.time_budget;
    let mut rollouts = 0u32;

    loop {
        if Instant::now() >= deadline {
            break;
        }
        if let Some(max) = config.max_rollouts {
            if rollouts >= max {
                break;
            }
        }
        tree.run_iteration(&config.default_policy, rng);
        rollouts += 1;
    }

    let children = tree.root_children();
    if children.is_empty() {
        let value = config.default_policy.rollout_value(position, rng);
        return Ok(PickResult { mv: legal[0], value, rollouts });
    }

    let white_to_move = position.turn() == Color::White;
    let &(best_mv, _, _) = children
        .iter()
        .max_by(|a, b| {
            let side_value = |v: f64| if white_to_move { v } else { 1.0 - v };
            a.1.cmp(&b.1).then(side_value(a.2).partial_cmp(&side_value(b.2)).unwrap())
        })
        .expect("children is non-empty");

    Ok(PickResult { mv: best_mv, value: tree.root_value(), rollouts })
}
