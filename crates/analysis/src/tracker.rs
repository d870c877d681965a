//! Dirty-line bookkeeping and the per-line occurrence cache.
//!
//! After every processed change the cache holds exactly one slot per document
//! line, and every occurrence that was not rescanned still carries its
//! correct (shifted) line number.

use std::collections::{BTreeSet, HashSet};
use tracing::trace;

use crate::errors::TrackerError;
use crate::types::{ChangeEvent, ContentChange, Occurrence};

/// Zero-based slots of scanned occurrences. `None` means never scanned.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LineCache {
    slots: Vec<Option<Vec<Occurrence>>>,
}

impl LineCache {
    pub fn with_line_count(line_count: usize) -> Self {
        Self {
            slots: vec![None; line_count],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&[Occurrence]> {
        self.slots.get(index).and_then(|slot| slot.as_deref())
    }

    pub fn set(&mut self, index: usize, occurrences: Vec<Occurrence>) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = Some(occurrences);
        }
    }

    pub fn reset(&mut self, line_count: usize) {
        self.slots = vec![None; line_count];
    }

    pub fn occurrences(&self) -> impl Iterator<Item = &Occurrence> {
        self.slots.iter().flatten().flatten()
    }

    /// Every name currently cached across the whole document.
    pub fn names(&self) -> HashSet<String> {
        self.occurrences().map(|o| o.name.clone()).collect()
    }

    fn insert_empty(&mut self, at: usize, count: usize) {
        self.slots
            .splice(at..at, std::iter::repeat_n(None, count));
    }

    fn remove(&mut self, at: usize, count: usize) {
        self.slots.drain(at..at + count);
    }

    fn shift_lines(&mut self, from: usize, delta: i32) {
        for occurrence in self.slots.iter_mut().skip(from).flatten().flatten() {
            occurrence.line = occurrence.line.saturating_add_signed(delta);
        }
    }
}

impl From<Vec<Option<Vec<Occurrence>>>> for LineCache {
    fn from(slots: Vec<Option<Vec<Occurrence>>>) -> Self {
        Self { slots }
    }
}

#[derive(Debug, Default)]
pub struct DirtyTracker {
    dirty: BTreeSet<usize>,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies every change of `event` to `cache` in order.
    pub fn process_change_event(
        &mut self,
        event: &ChangeEvent,
        cache: &mut LineCache,
    ) -> Result<(), TrackerError> {
        for change in &event.changes {
            self.process_change(change, cache)?;
        }
        Ok(())
    }

    fn process_change(
        &mut self,
        change: &ContentChange,
        cache: &mut LineCache,
    ) -> Result<(), TrackerError> {
        let start_line = change.range.start_line;
        let end_line = change.range.end_line;
        if start_line == 0 || end_line < start_line {
            return Err(TrackerError::InvalidRange {
                start_line,
                end_line,
            });
        }

        let start = (start_line - 1) as usize;
        let end = (end_line - 1) as usize;
        if end >= cache.len() {
            return Err(TrackerError::OutOfBounds {
                start_line,
                end_line,
                cache_len: cache.len(),
            });
        }

        let new_line_count = change.text.split('\n').count();
        let old_line_count = end - start + 1;
        let delta = new_line_count as i32 - old_line_count as i32;

        if delta > 0 {
            cache.insert_empty(start + 1, delta as usize);
            cache.shift_lines(start + 1 + delta as usize, delta);
        } else if delta < 0 {
            cache.remove(start + 1, delta.unsigned_abs() as usize);
            cache.shift_lines(start + 1, delta);
        }

        self.dirty.extend(start..start + new_line_count);
        trace!(
            "Change {}..={} replaced {} lines with {} (cache now {} lines)",
            start_line,
            end_line,
            old_line_count,
            new_line_count,
            cache.len()
        );
        Ok(())
    }

    pub fn dirty_lines(&self) -> &BTreeSet<usize> {
        &self.dirty
    }

    pub fn clear_dirty_lines(&mut self) {
        self.dirty.clear();
    }

    /// Empties the dirty set and returns what it held.
    pub fn take_dirty_lines(&mut self) -> BTreeSet<usize> {
        std::mem::take(&mut self.dirty)
    }

    pub fn mark_all_dirty(&mut self, line_count: usize) {
        self.dirty = (0..line_count).collect();
    }
}
