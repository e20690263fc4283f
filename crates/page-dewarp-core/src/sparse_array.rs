//! Growable array with holes, used as the bucket store of the bin sort.
//!
//! Slots are addressed by index and may be empty. Inserting into an occupied
//! slot shifts items towards higher indices according to a [`ShiftPolicy`].

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub(crate) enum SparseArrayError {
    #[error("insert index {index} is past the end (next free index {next})")]
    IndexOutOfRange { index: usize, next: usize },
}

/// How to make room when inserting into an occupied slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ShiftPolicy {
    /// `MinDownshift` when at least 10% of the used range is holes,
    /// otherwise `FullDownshift`.
    Auto,
    /// Shift only up to the next hole.
    MinDownshift,
    /// Shift every item at or after the index.
    FullDownshift,
}

const AUTO_HOLE_FRACTION: f64 = 0.1;

#[derive(Clone, Debug)]
pub(crate) struct SparseArray<T> {
    slots: Vec<Option<T>>,
    count: usize,
    /// Highest occupied index.
    last: Option<usize>,
}

impl<T> Default for SparseArray<T> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<T> SparseArray<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots,
            count: 0,
            last: None,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub(crate) fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    /// One past the highest occupied index.
    pub(crate) fn next_index(&self) -> usize {
        self.last.map_or(0, |l| l + 1)
    }

    /// Grow the slot vector so `index` is addressable, doubling capacity.
    fn ensure_slot(&mut self, index: usize) {
        if index < self.slots.len() {
            return;
        }
        let mut new_len = self.slots.len().max(1);
        while new_len <= index {
            new_len *= 2;
        }
        self.slots.resize_with(new_len, || None);
    }

    /// Append after the highest occupied index.
    pub(crate) fn push(&mut self, item: T) {
        let index = self.next_index();
        self.ensure_slot(index);
        self.slots[index] = Some(item);
        self.count += 1;
        self.last = Some(index);
    }

    /// Place `item` at `index`. An empty slot is filled directly; an occupied
    /// one is vacated by shifting items down according to `policy`.
    ///
    /// Indices beyond both the next free position and the allocated capacity
    /// are rejected.
    pub(crate) fn insert(
        &mut self,
        index: usize,
        item: T,
        policy: ShiftPolicy,
    ) -> Result<(), SparseArrayError> {
        let next = self.next_index();
        if index > next && index >= self.slots.len() {
            return Err(SparseArrayError::IndexOutOfRange { index, next });
        }
        if index >= next || self.slots[index].is_none() {
            self.ensure_slot(index);
            self.slots[index] = Some(item);
            self.count += 1;
            self.last = Some(self.last.map_or(index, |l| l.max(index)));
            return Ok(());
        }

        let policy = match policy {
            ShiftPolicy::Auto => {
                let used = next as f64;
                let holes = (next - self.count) as f64;
                if holes / used >= AUTO_HOLE_FRACTION {
                    ShiftPolicy::MinDownshift
                } else {
                    ShiftPolicy::FullDownshift
                }
            }
            other => other,
        };

        let end = match policy {
            ShiftPolicy::MinDownshift => (index + 1..next)
                .find(|&i| self.slots[i].is_none())
                .unwrap_or(next),
            _ => next,
        };
        self.ensure_slot(end);
        // slots[end] is empty: rotate the run [index, end] by one.
        self.slots[index..=end].rotate_right(1);
        self.slots[index] = Some(item);
        self.count += 1;
        if end == next {
            self.last = Some(next);
        }
        Ok(())
    }

    /// Take the item at `index`, leaving a hole.
    pub(crate) fn remove(&mut self, index: usize) -> Option<T> {
        let next = self.next_index();
        let item = self.slots.get_mut(index)?.take()?;
        self.count -= 1;
        self.last = self.slots[..next].iter().rposition(Option::is_some);
        Some(item)
    }

    /// Take the item at the highest occupied index.
    pub(crate) fn remove_last(&mut self) -> Option<T> {
        let last = self.last?;
        self.remove(last)
    }

    /// Close every hole below the highest occupied index, keeping item order.
    pub(crate) fn compact(&mut self) {
        let next = self.next_index();
        let mut write = 0;
        for read in 0..next {
            if self.slots[read].is_some() {
                self.slots.swap(write, read);
                write += 1;
            }
        }
        self.last = write.checked_sub(1);
    }
}
