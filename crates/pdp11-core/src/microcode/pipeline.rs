use super::uop::MicroOp;
use crate::CoreError;

/// Maximum number of micro-ops one instruction may expand to.
pub const PIPELINE_CAPACITY: usize = 32;

/// Ordered micro-op queue for exactly one instruction or trap entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pipeline {
    ops: Vec<MicroOp>,
}

impl Pipeline {
    /// Creates an empty queue with room for [`PIPELINE_CAPACITY`] entries.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ops: Vec::with_capacity(PIPELINE_CAPACITY),
        }
    }

    /// Appends a micro-op.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::PipelineOverflow`] when the queue is full.
    pub fn push(&mut self, op: MicroOp) -> Result<(), CoreError> {
        if self.ops.len() >= PIPELINE_CAPACITY {
            return Err(CoreError::PipelineOverflow {
                attempted: self.ops.len() + 1,
                capacity: PIPELINE_CAPACITY,
            });
        }
        self.ops.push(op);
        Ok(())
    }

    /// Number of queued micro-ops.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns `true` when nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Queued micro-ops in execution order.
    #[must_use]
    pub fn as_slice(&self) -> &[MicroOp] {
        &self.ops
    }

    /// Drops every entry from `index` on.
    pub fn truncate(&mut self, index: usize) {
        self.ops.truncate(index);
    }
}

#[cfg(test)]
mod tests {
    use super::{Pipeline, PIPELINE_CAPACITY};
    use crate::microcode::MicroOp;
    use crate::CoreError;

    #[test]
    fn push_past_capacity_is_an_error() {
        let mut pipeline = Pipeline::new();
        for _ in 0..PIPELINE_CAPACITY {
            assert_eq!(pipeline.push(MicroOp::Nop), Ok(()));
        }
        assert_eq!(
            pipeline.push(MicroOp::Nop),
            Err(CoreError::PipelineOverflow {
                attempted: PIPELINE_CAPACITY + 1,
                capacity: PIPELINE_CAPACITY,
            })
        );
        assert_eq!(pipeline.len(), PIPELINE_CAPACITY);
    }

    #[test]
    fn truncate_drops_the_tail() {
        let mut pipeline = Pipeline::new();
        pipeline.push(MicroOp::Nop).unwrap();
        pipeline.push(MicroOp::Halt).unwrap();
        pipeline.truncate(1);
        assert_eq!(pipeline.as_slice(), &[MicroOp::Nop]);
        assert!(!pipeline.is_empty());
    }
}
