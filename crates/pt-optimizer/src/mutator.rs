//! Candidate mutation: grow the optimum with random passes, or shrink it.
//!
//! Both operations are pure functions of the optimum, the configuration and
//! the random source they are handed. Nothing here touches global state, so a
//! seeded RNG reproduces the exact same mutation sequence.

use pt_types::{Candidate, Token};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::PassCatalog;
use crate::config::RemovePolicy;

/// The two phase types of the search loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    Add,
    Remove,
}

impl PhaseKind {
    pub fn next(self) -> Self {
        match self {
            Self::Add => Self::Remove,
            Self::Remove => Self::Add,
        }
    }
}

impl std::fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Add => f.write_str("add"),
            Self::Remove => f.write_str("remove"),
        }
    }
}

/// A proposed candidate and the passes that differ from the optimum it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub candidate: Candidate,
    /// Appended passes for ADD, dropped passes for REMOVE.
    pub changed: Vec<Token>,
}

impl Mutation {
    /// A mutation that leaves the optimum as it was; evaluating it would only
    /// re-measure the known optimum.
    pub fn is_noop(&self) -> bool {
        self.changed.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mutator {
    max_added_passes: usize,
    remove_policy: RemovePolicy,
}

impl Mutator {
    /// `max_added_passes` is clamped to at least one.
    pub fn new(max_added_passes: usize, remove_policy: RemovePolicy) -> Self {
        Self {
            max_added_passes: max_added_passes.max(1),
            remove_policy,
        }
    }

    pub fn mutate<R: Rng + ?Sized>(
        &self,
        kind: PhaseKind,
        optimum: &Candidate,
        catalog: &PassCatalog,
        rng: &mut R,
    ) -> Mutation {
        match kind {
            PhaseKind::Add => self.add(optimum, catalog, rng),
            PhaseKind::Remove => self.remove(optimum, rng),
        }
    }

    /// Append between 1 and K passes drawn uniformly, with replacement.
    pub fn add<R: Rng + ?Sized>(
        &self,
        optimum: &Candidate,
        catalog: &PassCatalog,
        rng: &mut R,
    ) -> Mutation {
        let count = rng.gen_range(1..=self.max_added_passes);
        let added: Vec<Token> = (0..count).map(|_| catalog.sample(rng)).collect();
        Mutation {
            candidate: optimum.appended(added.iter().cloned()),
            changed: added,
        }
    }

    /// Drop passes according to the configured policy.
    ///
    /// An empty optimum has nothing to drop and always yields a no-op.
    pub fn remove<R: Rng + ?Sized>(&self, optimum: &Candidate, rng: &mut R) -> Mutation {
        let positions: Vec<usize> = if optimum.is_empty() {
            Vec::new()
        } else {
            match self.remove_policy {
                RemovePolicy::DropOne => vec![rng.gen_range(0..optimum.len())],
                RemovePolicy::Bernoulli => {
                    let p = self.drop_probability(optimum.len());
                    (0..optimum.len()).filter(|_| rng.gen_bool(p)).collect()
                }
            }
        };

        let removed = positions
            .iter()
            .map(|&pos| optimum.tokens()[pos].clone())
            .collect();
        Mutation {
            candidate: optimum.without_positions(&positions),
            changed: removed,
        }
    }

    /// Per-pass drop probability for [`RemovePolicy::Bernoulli`].
    pub fn drop_probability(&self, len: usize) -> f64 {
        1.0 / (len.div_ceil(self.max_added_passes) as f64 + 1.0)
    }
}
