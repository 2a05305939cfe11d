//! Advisory branch-outcome predictor.
//!
//! A direct-mapped table of resolved branches keyed by the low PC bits. No
//! tag is checked, so aliasing branches overwrite each other. Control flow
//! never depends on the prediction; the engine only reports outcomes here.

/// Number of entries in the prediction table.
pub const PREDICTOR_TABLE_SIZE: usize = 1024;

/// One table slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PredictorEntry {
    /// PC of the branch that last wrote this slot.
    pub pc: u16,
    /// Target of that branch.
    pub target: u16,
    /// One-bit taken history.
    pub history: u8,
}

/// Prediction for a branch at a given PC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Prediction {
    /// Whether the branch is predicted taken.
    pub taken: bool,
    /// Cached target of the last branch seen in this slot.
    pub target: u16,
}

/// Direct-mapped 1-bit history predictor with accuracy counters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BranchPredictor {
    table: Box<[PredictorEntry]>,
    hits: u64,
    misses: u64,
}

impl Default for BranchPredictor {
    fn default() -> Self {
        Self::new()
    }
}

impl BranchPredictor {
    /// Creates an empty predictor; every slot predicts not-taken.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: vec![PredictorEntry::default(); PREDICTOR_TABLE_SIZE].into_boxed_slice(),
            hits: 0,
            misses: 0,
        }
    }

    const fn index(pc: u16) -> usize {
        (pc as usize >> 1) % PREDICTOR_TABLE_SIZE
    }

    /// Records a resolved branch at `pc` that went to `target` when taken.
    pub fn inform(&mut self, taken: bool, pc: u16, target: u16) {
        let entry = &mut self.table[Self::index(pc)];
        if (entry.history & 1 != 0) == taken {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        *entry = PredictorEntry {
            pc,
            target,
            history: ((entry.history << 1) | u8::from(taken)) & 1,
        };
    }

    /// Predicts the branch at `pc` from its slot's history.
    #[must_use]
    pub fn check(&self, pc: u16) -> Prediction {
        let entry = self.table[Self::index(pc)];
        Prediction {
            taken: entry.history & 1 != 0,
            target: entry.target,
        }
    }

    /// Returns the raw slot for `pc`.
    #[must_use]
    pub fn entry(&self, pc: u16) -> PredictorEntry {
        self.table[Self::index(pc)]
    }

    /// Correct predictions so far.
    #[must_use]
    pub const fn hits(&self) -> u64 {
        self.hits
    }

    /// Incorrect predictions so far.
    #[must_use]
    pub const fn misses(&self) -> u64 {
        self.misses
    }

    /// Fraction of correct predictions, `0.0` before any branch resolves.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn accuracy(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
