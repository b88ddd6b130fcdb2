//! Reference-resolution worklist: the ordered, deduplicating registry of
//! named types awaiting emission.
//!
//! The registry is append-only and drained through an index cursor, never a
//! queue mutated during iteration: rendering a drained type's body may
//! register further types, which simply land behind the cursor and come out
//! of the next drain.

use std::collections::HashSet;

use crate::tree::EntryId;

#[derive(Debug, Default)]
pub struct PendingTypeSet
{
    order: Vec<(String, EntryId)>,
    seen: HashSet<String>,
    /// Names whose definition was rendered outside the drain loop; drained
    /// batches exclude them even when they were queued earlier.
    rendered: HashSet<String>,
    cursor: usize,
}

impl PendingTypeSet
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Register a named type for one-time emission. The first registration
    /// under a given display name wins; later ones are no-ops. Returns
    /// whether the registration was new.
    pub fn register(&mut self, name: &str, entry: EntryId) -> bool
    {
        if !self.seen.insert(name.to_string()) {
            return false;
        }
        self.order.push((name.to_string(), entry));
        true
    }

    /// Record a display name as already emitted without queuing it, so a
    /// definition expanded elsewhere is not produced a second time.
    pub fn mark_rendered(&mut self, name: &str)
    {
        self.seen.insert(name.to_string());
        self.rendered.insert(name.to_string());
    }

    /// Entries registered since the previous drain, each returned exactly
    /// once. The cursor only moves forward; once the registry is exhausted,
    /// further drains keep returning an empty batch.
    pub fn drain_newly_registered(&mut self) -> Vec<(String, EntryId)>
    {
        let batch = self.order[self.cursor..]
            .iter()
            .filter(|(name, _)| !self.rendered.contains(name))
            .cloned()
            .collect();
        self.cursor = self.order.len();
        batch
    }

    pub fn is_exhausted(&self) -> bool
    {
        self.cursor == self.order.len()
    }
}
