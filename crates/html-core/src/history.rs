use crate::dom::Dom;
use crate::selection::Selection;

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub dom: Dom,
    pub selection: Option<Selection>,
}

/// Bounded undo/redo stacks of whole-document snapshots.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
    max_undo: usize,
}

impl History {
    pub fn new(max_undo: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_undo: max_undo.max(1),
        }
    }

    /// Records the state before an edit; redo is invalidated.
    pub fn record(&mut self, before: Snapshot) {
        self.undo_stack.push(before);
        self.redo_stack.clear();
        if self.undo_stack.len() > self.max_undo {
            let overflow = self.undo_stack.len() - self.max_undo;
            self.undo_stack.drain(0..overflow);
        }
    }

    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let previous = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        Some(previous)
    }

    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Visits every stored snapshot, undo side first.
    pub fn for_each_snapshot_mut(&mut self, mut f: impl FnMut(&mut Snapshot)) {
        self.undo_stack.iter_mut().chain(self.redo_stack.iter_mut()).for_each(|s| f(s));
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
