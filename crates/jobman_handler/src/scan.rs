/// Outcome of Phase A's reverse (root-toward-leaf) lock-acquisition scan.
///
/// `todo` is already in leaf-to-root order (the order Phase C must execute
/// in), even though the scan itself walks the chain root-first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    pub pending: Option<String>,
    pub todo: Vec<String>,
}

impl ScanOutcome {
    pub fn is_fully_satisfied(&self) -> bool {
        self.pending.is_none()
    }

    pub fn has_work(&self) -> bool {
        !self.todo.is_empty()
    }
}
