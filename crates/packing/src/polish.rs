//! Polish-notation packer.
//!
//! A [`PolishGenome`] is a postfix expression over the instance's entries:
//! a leaf pushes one entry, [`PolishToken::Up`] pops two sub-packings and
//! stacks the second on top of the first, [`PolishToken::Right`] puts it
//! to the right. The single composite left at the end is the packing.
//!
//! Every genome is built from a *skeleton* (which token positions are
//! leaves and which are operators) and a leaf order. The genetic operators
//! only ever recombine leaf orders over an existing skeleton, flip operator
//! kinds, or move an operator one step where the expression stays valid,
//! so offspring never need repairing.

use rand::seq::SliceRandom;
use rand::Rng;
use rectpack_core::{Entry, Individual, Instance, MergeDirection, Packer, SearchContext, SearchableEntry};

/// One token of a polish expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolishToken {
    /// The entry at `index` in the instance, in the given orientation.
    Leaf {
        /// Entry position in the instance.
        index: usize,
        /// Orientation; ignored for instances that forbid rotation.
        rotated: bool,
    },
    /// Stack the top sub-packing on the one below it.
    Up,
    /// Put the top sub-packing right of the one below it.
    Right,
}

impl PolishToken {
    fn is_leaf(&self) -> bool {
        matches!(self, PolishToken::Leaf { .. })
    }

    fn direction(&self) -> Option<MergeDirection> {
        match self {
            PolishToken::Up => Some(MergeDirection::Up),
            PolishToken::Right => Some(MergeDirection::Right),
            PolishToken::Leaf { .. } => None,
        }
    }
}

/// A valid postfix expression over entries `0..n`, usable as a GA
/// individual.
#[derive(Debug, Clone, PartialEq)]
pub struct PolishGenome {
    tokens: Vec<PolishToken>,
    rotatable: bool,
    fitness: f64,
}

impl PolishGenome {
    /// All entries in one row, in index order, none rotated. `rotatable`
    /// allows later mutations to rotate leaves.
    pub fn row(size: usize, rotatable: bool) -> Self {
        let mut tokens = Vec::with_capacity(size * 2);
        for index in 0..size {
            tokens.push(PolishToken::Leaf {
                index,
                rotated: false,
            });
            if index > 0 {
                tokens.push(PolishToken::Right);
            }
        }
        Self {
            tokens,
            rotatable,
            fitness: 0.0,
        }
    }

    /// A random expression: shuffled leaves, random orientations (when
    /// `rotatable`), operators inserted at random points.
    pub fn random<R: Rng>(size: usize, rotatable: bool, rng: &mut R) -> Self {
        let mut order: Vec<usize> = (0..size).collect();
        order.shuffle(rng);

        let mut tokens = Vec::with_capacity(size * 2);
        let mut depth = 0usize;
        for index in order {
            tokens.push(PolishToken::Leaf {
                index,
                rotated: rotatable && rng.gen_bool(0.5),
            });
            depth += 1;
            while depth >= 2 && rng.gen_bool(0.5) {
                tokens.push(random_operator(rng));
                depth -= 1;
            }
        }
        while depth >= 2 {
            tokens.push(random_operator(rng));
            depth -= 1;
        }
        Self {
            tokens,
            rotatable,
            fitness: 0.0,
        }
    }

    /// Wraps a token sequence; `None` unless it is a valid expression over
    /// entries `0..n` for some `n`.
    pub fn from_tokens(tokens: Vec<PolishToken>, rotatable: bool) -> Option<Self> {
        let genome = Self {
            tokens,
            rotatable,
            fitness: 0.0,
        };
        genome.is_valid().then_some(genome)
    }

    /// Tokens in postfix order.
    pub fn tokens(&self) -> &[PolishToken] {
        &self.tokens
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.tokens.iter().filter(|t| t.is_leaf()).count()
    }

    /// Sets the cached fitness.
    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
    }

    /// Returns true if every leaf index `0..n` occurs once and every
    /// operator finds two operands.
    pub fn is_valid(&self) -> bool {
        let leaves = self.leaf_count();
        let mut seen = vec![false; leaves];
        let mut depth = 0usize;
        for token in &self.tokens {
            match token {
                PolishToken::Leaf { index, .. } => {
                    match seen.get_mut(*index) {
                        Some(slot) if !*slot => *slot = true,
                        _ => return false,
                    }
                    depth += 1;
                }
                _ => {
                    if depth < 2 {
                        return false;
                    }
                    depth -= 1;
                }
            }
        }
        depth == 1 || (leaves == 0 && depth == 0)
    }

    fn leaves(&self) -> Vec<PolishToken> {
        self.tokens.iter().copied().filter(PolishToken::is_leaf).collect()
    }

    fn with_leaves(&self, leaves: Vec<PolishToken>) -> Self {
        let mut next = leaves.into_iter();
        let tokens = self
            .tokens
            .iter()
            .map(|token| {
                if token.is_leaf() {
                    next.next().unwrap_or(*token)
                } else {
                    *token
                }
            })
            .collect();
        Self {
            tokens,
            rotatable: self.rotatable,
            fitness: 0.0,
        }
    }

    /// Order crossover on the leaf sequence; the child keeps this genome's
    /// skeleton and operators.
    pub fn leaf_crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
        let mine = self.leaves();
        let theirs = other.leaves();
        let n = mine.len();
        if n < 2 || theirs.len() != n {
            return self.clone();
        }
        let (mut start, mut end) = (rng.gen_range(0..n), rng.gen_range(0..n));
        if start > end {
            std::mem::swap(&mut start, &mut end);
        }

        let leaf_index = |token: &PolishToken| match token {
            PolishToken::Leaf { index, .. } => *index,
            _ => usize::MAX,
        };
        let mut taken = vec![false; n];
        let mut child: Vec<Option<PolishToken>> = vec![None; n];
        for i in start..=end {
            child[i] = Some(mine[i]);
            if let Some(slot) = taken.get_mut(leaf_index(&mine[i])) {
                *slot = true;
            }
        }
        let mut donor = theirs
            .iter()
            .filter(|t| !taken.get(leaf_index(*t)).copied().unwrap_or(true));
        for slot in child.iter_mut().filter(|s| s.is_none()) {
            *slot = donor.next().copied();
        }

        let leaves: Vec<PolishToken> = child
            .into_iter()
            .zip(mine.iter())
            .map(|(token, fallback)| token.unwrap_or(*fallback))
            .collect();
        self.with_leaves(leaves)
    }

    /// Moves the operator next to position `index` one step, if the
    /// expression stays valid.
    fn shift_operator(&mut self, index: usize) {
        if index + 1 >= self.tokens.len() {
            return;
        }
        let (a, b) = (self.tokens[index], self.tokens[index + 1]);
        if a.is_leaf() == b.is_leaf() {
            return;
        }
        self.tokens.swap(index, index + 1);
        if !self.is_valid() {
            self.tokens.swap(index, index + 1);
        }
    }

    /// Applies the expression to `instance`: returns the placed copy and
    /// its extent, with every merge resolved into positions.
    pub fn evaluate(&self, instance: &Instance) -> Option<(Instance, u32, u32)> {
        if instance.is_empty() {
            return Some((instance.clone(), 0, 0));
        }
        if self.leaf_count() != instance.size() {
            return None;
        }
        let mut next_id = instance.next_id();
        let mut stack: Vec<Entry> = Vec::with_capacity(instance.size());
        for token in &self.tokens {
            match (token, token.direction()) {
                (PolishToken::Leaf { index, rotated }, _) => {
                    let mut entry = instance.entries().get(*index)?.clone();
                    if instance.allows_rotation() {
                        entry.set_rotated(*rotated);
                    }
                    stack.push(entry);
                }
                (_, Some(direction)) => {
                    let second = stack.pop()?;
                    let first = stack.pop()?;
                    stack.push(Entry::merge(next_id, first, second, direction));
                    next_id += 1;
                }
                (_, None) => return None,
            }
        }
        let mut root = stack.pop()?;
        if !stack.is_empty() {
            return None;
        }

        let (width, height) = root.size();
        root.set_position(0, 0);
        let mut placed = instance.clone();
        for leaf in root.into_leaves() {
            let index = placed.index_of(leaf.id())?;
            let (x, y) = leaf.position()?;
            if placed.allows_rotation() {
                placed.set_rotation(index, leaf.rotated());
            }
            placed.set_position(index, x, y);
        }
        Some((placed, width, height))
    }
}

fn random_operator<R: Rng>(rng: &mut R) -> PolishToken {
    if rng.gen_bool(0.5) {
        PolishToken::Up
    } else {
        PolishToken::Right
    }
}

impl Individual for PolishGenome {
    fn fitness(&self) -> f64 {
        self.fitness
    }

    fn crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
        self.leaf_crossover(other, rng)
    }

    fn mutate<R: Rng>(&mut self, rate: f64, rng: &mut R) {
        let n = self.tokens.len();
        for i in 0..n {
            if rng.gen::<f64>() >= rate {
                continue;
            }
            match self.tokens[i] {
                PolishToken::Leaf { index, rotated } => {
                    if self.rotatable && rng.gen_bool(0.5) {
                        self.tokens[i] = PolishToken::Leaf {
                            index,
                            rotated: !rotated,
                        };
                    } else {
                        let others: Vec<usize> = (0..n)
                            .filter(|&j| j != i && self.tokens[j].is_leaf())
                            .collect();
                        if let Some(&j) = others.choose(rng) {
                            self.tokens.swap(i, j);
                        }
                    }
                }
                PolishToken::Up | PolishToken::Right => {
                    if rng.gen_bool(0.5) {
                        self.tokens[i] = match self.tokens[i] {
                            PolishToken::Up => PolishToken::Right,
                            _ => PolishToken::Up,
                        };
                    } else if i > 0 {
                        self.shift_operator(i - 1);
                    }
                }
            }
        }
    }
}

/// Packs an instance by evaluating a polish expression.
///
/// Without a genome the entries go into one row, in instance order. A box
/// side of zero is unconstrained; otherwise the packing fails when the
/// expression's extent exceeds the box. On success the box is set to the
/// extent.
#[derive(Debug, Clone, Default)]
pub struct PolishPacker {
    genome: Option<PolishGenome>,
}

impl PolishPacker {
    /// Creates a packer that lays entries out in a row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a packer evaluating `genome`.
    pub fn with_genome(genome: PolishGenome) -> Self {
        Self {
            genome: Some(genome),
        }
    }
}

impl Packer for PolishPacker {
    fn name(&self) -> &'static str {
        "polish"
    }

    fn pack(&mut self, instance: &mut Instance, ctx: &SearchContext) -> Option<Instance> {
        ctx.record_pack();
        if ctx.tick() {
            return None;
        }
        let row;
        let genome = match &self.genome {
            Some(genome) => genome,
            None => {
                row = PolishGenome::row(instance.size(), false);
                &row
            }
        };
        let (mut placed, width, height) = genome.evaluate(instance)?;
        let fits = |limit: u32, extent: u32| limit == 0 || extent <= limit;
        if !fits(instance.width(), width) || !fits(instance.height(), height) {
            return None;
        }
        placed.set_box(width, height);
        Some(placed)
    }
}
