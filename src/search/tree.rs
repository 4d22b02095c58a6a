use rand::Rng;

use crate::piece::Color;
use crate::position::{Move, Position};

use super::policy::DefaultPolicy;

/// One node of the search tree. Nodes are stored in a flat arena ([`Tree::nodes`])
/// and reference each other by index rather than by owned pointer, so the
/// tree can grow without any `Rc`/`RefCell` bookkeeping. A node is a
/// "chance" node when its position is nature's turn to roll dice, and a
/// "decision" node otherwise; both share the same representation, since the
/// only real difference is how a child is selected (see [`Tree::select_child`]).
struct Node {
    position: Position,
    parent: Option<usize>,
    children: Vec<(Move, usize)>,
    untried: Vec<Move>,
    visits: u32,
    value_sum: f64,
}

impl Node {
    fn new(position: Position, parent: Option<usize>) -> Self {
        let untried = position.legal_moves();
        Node { position, parent, children: Vec::new(), untried, visits: 0, value_sum: 0.0 }
    }

    fn is_chance(&self) -> bool {
        self.position.is_nature_turn()
    }

    fn mean_value(&self) -> f64 {
        if self.visits == 0 {
            0.5
        } else {
            self.value_sum / self.visits as f64
        }
    }
}

/// Arena-backed MCTS tree rooted at a single position.
pub struct Tree {
    nodes: Vec<Node>,
    exploration_c: f64,
}

impl Tree {
    pub fn new(root: Position, exploration_c: f64) -> Self {
        Tree { nodes: vec![Node::new(root, None)], exploration_c }
    }

    pub fn root_position(&self) -> &Position {
        &self.nodes[0].position
    }

    pub fn root_visits(&self) -> u32 {
        self.nodes[0].visits
    }

    pub fn root_value(&self) -> f64 {
        self.nodes[0].mean_value()
    }

    /// Visit counts for each of the root's expanded children, used to pick
    /// the move to actually play once the search budget is spent.
    pub fn root_children(&self) -> Vec<(Move, u32, f64)> {
        self.nodes[0]
            .children
            .iter()
            .map(|&(mv, idx)| (mv, self.nodes[idx].visits, self.nodes[idx].mean_value()))
            .collect()
    }

    /// Runs a single select/expand/simulate/backpropagate iteration.
    ///
    /// Decision nodes follow ordinary UCB1 tree policy: expand an untried
    /// move if one remains, otherwise descend via [`Tree::select_child`].
    /// Chance nodes instead sample one of the 36 dice rolls uniformly *with
    /// replacement* on every visit, creating that roll's child lazily the
    /// first time it's drawn — this is i.i.d. sampling from nature's
    /// distribution, not enumeration of all 36 rolls before any reuse.
    pub fn run_iteration(&mut self, default_policy: &DefaultPolicy, rng: &mut impl Rng) {
        let mut path = vec![0usize];
        let mut current = 0usize;

        loop {
            if self.nodes[current].position.game_ended() {
                let value = terminal_value(&self.nodes[current].position);
                self.backpropagate(&path, value);
                return;
            }

            if self.nodes[current].is_chance() {
                let (child, freshly_created) = self.sample_chance_child(current, rng);
                current = child;
                path.push(current);
                if freshly_created {
                    let value = default_policy.rollout_value(&self.nodes[current].position, rng);
                    self.backpropagate(&path, value);
                    return;
                }
                continue;
            }

            if !self.nodes[current].untried.is_empty() {
                let expanded = self.expand(current, rng);
                path.push(expanded);
                let value = default_policy.rollout_value(&self.nodes[expanded].position, rng);
                self.backpropagate(&path, value);
                return;
            }

            if self.nodes[current].children.is_empty() {
                let value = default_policy.rollout_value(&self.nodes[current].position, rng);
                self.backpropagate(&path, value);
                return;
            }

            current = self.select_child(current);
            path.push(current);
        }
    }

    fn select_child(&self, index: usize) -> usize {
        let node = &self.nodes[index];
        let parent_visits = node.visits.max(1) as f64;
        let white_to_move = node.position.turn() == Color::White;
        node.children
            .iter()
            .map(|&(_, idx)| {
                let child = &self.nodes[idx];
                let exploitation = if white_to_move { child.mean_value() } else { 1.0 - child.mean_value() };
                let exploration =
                    self.exploration_c * ((parent_visits.ln()) / (child.visits.max(1) as f64)).sqrt();
                (idx, exploitation + exploration)
            })
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
            .map(|(idx, _)| idx)
            .expect("decision node with no untried moves has at least one child")
    }

    /// Draws one of the 36 equally-likely dice rolls and returns its child
    /// index, creating the child the first time that exact roll is drawn.
    fn sample_chance_child(&mut self, index: usize, rng: &mut impl Rng) -> (usize, bool) {
        let mv = Move::DiceRoll { i: rng.gen_range(1..=6), j: rng.gen_range(1..=6) };
        if let Some(&(_, idx)) = self.nodes[index].children.iter().find(|&&(m, _)| m == mv) {
            return (idx, false);
        }
        let mut child_position = self.nodes[index].position.clone();
        child_position.apply(&mv).expect("every dice roll is legal on nature's turn");
        let child_index = self.nodes.len();
        self.nodes.push(Node::new(child_position, Some(index)));
        self.nodes[index].children.push((mv, child_index));
        self.nodes[index].untried.retain(|&m| m != mv);
        (child_index, true)
    }

    fn expand(&mut self, index: usize, rng: &mut impl Rng) -> usize {
        let i = rng.gen_range(0..self.nodes[index].untried.len());
        let mv = self.nodes[index].untried.remove(i);
        let mut child_position = self.nodes[index].position.clone();
        child_position.apply(&mv).expect("untried moves come from legal_moves()");
        let child_index = self.nodes.len();
        self.nodes.push(Node::new(child_position, Some(index)));
        self.nodes[index].children.push((mv, child_index));
        child_index
    }

    fn backpropagate(&mut self, path: &[usize], value: f64) {
        for &idx in path {
            self.nodes[idx].visits += 1;
            self.nodes[idx].value_sum += value;
        }
    }
}

fn terminal_value(pos: &Position) -> f64 {
    match pos.winner().expect("game_ended() implies winner() is Ok") {
        Color::White => 1.0,
        Color::Black => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn single_iteration_expands_root_and_backpropagates() {
        let mut pos = Position::new();
        pos.apply(&Move::DiceRoll { i: 6, j: 3 }).unwrap();
        let mut tree = Tree::new(pos, 1.4);
        let mut rng = StdRng::seed_from_u64(1);
        tree.run_iteration(&DefaultPolicy::Uniform, &mut rng);
        assert_eq!(tree.root_visits(), 1);
        assert_eq!(tree.nodes[0].children.len(), 1);
    }

    #[test]
    fn many_iterations_visit_multiple_children() {
        let mut pos = Position::new();
        pos.apply(&Move::DiceRoll { i: 6, j: 3 }).unwrap();
        let mut tree = Tree::new(pos, 1.4);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            tree.run_iteration(&DefaultPolicy::Uniform, &mut rng);
        }
        assert_eq!(tree.root_visits() as usize, 200);
        assert!(tree.nodes[0].children.len() > 1);
    }

    #[test]
    fn chance_node_resamples_rolls_with_replacement() {
        // The root itself is a chance node (pre-game roll, 36 possible
        // dice pairs). Run more iterations than there are distinct rolls:
        // by pigeonhole at least one roll must be drawn twice, so the
        // number of distinct children stays capped at 36 while visits
        // keeps climbing past it — the signature of sampling with
        // replacement rather than enumerating all 36 before any reuse.
        let pos = Position::new();
        let mut tree = Tree::new(pos, 1.4);
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..40 {
            tree.run_iteration(&DefaultPolicy::Uniform, &mut rng);
        }
        assert_eq!(tree.root_visits(), 40);
        assert!(tree.nodes[0].children.len() <= 36);
    }
}
