use std::collections::HashMap;
use std::sync::Arc;

use model_types::Sketch;
use uuid::Uuid;

use crate::types::Feature;

/// Handle for a constraint solve that may run off the engine's thread.
///
/// Carries the sketch as it was at dispatch; the worker solves that copy and
/// hands the result back through `Engine::apply_solve`.
#[derive(Debug, Clone)]
pub struct SolveTicket {
    pub sketch_id: Uuid,
    pub serial: u64,
    basis: Arc<Feature>,
}

impl SolveTicket {
    pub(crate) fn new(sketch_id: Uuid, serial: u64, basis: Arc<Feature>) -> Self {
        Self {
            sketch_id,
            serial,
            basis,
        }
    }

    /// The sketch to solve.
    pub fn sketch(&self) -> Option<&Sketch> {
        self.basis.sketch()
    }

    /// True if `current` is the same feature state this ticket was issued for.
    pub(crate) fn matches(&self, current: &Arc<Feature>) -> bool {
        Arc::ptr_eq(&self.basis, current) || self.basis.operation == current.operation
    }
}

/// Latest issued ticket per sketch; older tickets are superseded.
#[derive(Debug, Default)]
pub(crate) struct PendingSolves {
    next_serial: u64,
    latest: HashMap<Uuid, u64>,
}

impl PendingSolves {
    pub(crate) fn issue(&mut self, sketch_id: Uuid) -> u64 {
        self.next_serial += 1;
        self.latest.insert(sketch_id, self.next_serial);
        self.next_serial
    }

    pub(crate) fn is_current(&self, sketch_id: Uuid, serial: u64) -> bool {
        self.latest.get(&sketch_id) == Some(&serial)
    }

    pub(crate) fn complete(&mut self, sketch_id: Uuid) {
        self.latest.remove(&sketch_id);
    }

    /// Forget every outstanding ticket. Serials keep increasing.
    pub(crate) fn clear(&mut self) {
        self.latest.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_ticket_supersedes_older() {
        let mut pending = PendingSolves::default();
        let sketch = Uuid::new_v4();
        let first = pending.issue(sketch);
        let second = pending.issue(sketch);
        assert!(!pending.is_current(sketch, first));
        assert!(pending.is_current(sketch, second));
        pending.complete(sketch);
        assert!(!pending.is_current(sketch, second));
    }

    #[test]
    fn cleared_tickets_are_never_current_again() {
        let mut pending = PendingSolves::default();
        let sketch = Uuid::new_v4();
        let serial = pending.issue(sketch);
        pending.clear();
        assert!(!pending.is_current(sketch, serial));
        assert!(pending.issue(sketch) > serial);
    }
}
