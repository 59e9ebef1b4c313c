use tracing::trace;

/// Receives the row operations a bound dataset produces.
pub trait RowSink<T> {
    fn row_added(&mut self, index: usize, item: &T);
    fn row_removed(&mut self, index: usize);
    fn row_updated(&mut self, index: usize, item: &T);
}

/// A dataset bound to a grid. Every mutation goes through this type and is
/// forwarded to the sink as one operation per affected row.
///
/// Indices past the end are clamped for inserts and ignored for removals.
pub struct ReactiveData<T, S: RowSink<T>> {
    items: Vec<T>,
    sink: Option<S>,
}

impl<T, S: RowSink<T>> ReactiveData<T, S> {
    pub fn new(items: Vec<T>, sink: S) -> Self {
        Self {
            items,
            sink: Some(sink),
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn sink(&self) -> Option<&S> {
        self.sink.as_ref()
    }

    pub fn is_attached(&self) -> bool {
        self.sink.is_some()
    }

    pub fn push(&mut self, item: T) {
        let index = self.items.len();
        self.insert(index, item);
    }

    pub fn prepend(&mut self, item: T) {
        self.insert(0, item);
    }

    pub fn pop(&mut self) -> Option<T> {
        let last = self.items.len().checked_sub(1)?;
        self.remove_at(last)
    }

    pub fn shift(&mut self) -> Option<T> {
        self.remove_at(0)
    }

    pub fn insert(&mut self, index: usize, item: T) {
        let index = index.min(self.items.len());
        self.items.insert(index, item);
        if let Some(sink) = self.sink.as_mut() {
            sink.row_added(index, &self.items[index]);
        }
    }

    pub fn remove_at(&mut self, index: usize) -> Option<T> {
        if index >= self.items.len() {
            return None;
        }
        let removed = self.items.remove(index);
        if let Some(sink) = self.sink.as_mut() {
            sink.row_removed(index);
        }
        Some(removed)
    }

    /// Swaps the item at `index`, returning the old one.
    pub fn replace(&mut self, index: usize, item: T) -> Option<T> {
        let slot = self.items.get_mut(index)?;
        let old = std::mem::replace(slot, item);
        if let Some(sink) = self.sink.as_mut() {
            sink.row_updated(index, &self.items[index]);
        }
        Some(old)
    }

    /// Removes `delete` items from `start` and inserts `insert` there.
    /// Removals are reported back to front, then insertions front to back.
    pub fn splice<I>(&mut self, start: usize, delete: usize, insert: I) -> Vec<T>
    where
        I: IntoIterator<Item = T>,
    {
        let start = start.min(self.items.len());
        let end = start.saturating_add(delete).min(self.items.len());
        let incoming: Vec<T> = insert.into_iter().collect();
        let added = incoming.len();
        let removed: Vec<T> = self.items.splice(start..end, incoming).collect();

        if let Some(sink) = self.sink.as_mut() {
            for index in (start..end).rev() {
                sink.row_removed(index);
            }
            for index in start..start + added {
                sink.row_added(index, &self.items[index]);
            }
        }
        removed
    }

    /// Applies a write that came from the grid itself. The sink already
    /// shows it, so nothing is forwarded.
    pub fn apply_grid_edit(&mut self, index: usize, item: T) -> Option<T> {
        let slot = self.items.get_mut(index)?;
        trace!(index, "grid edit applied to bound data");
        Some(std::mem::replace(slot, item))
    }

    /// Unbinds the sink. Later mutations only change the data.
    pub fn detach(&mut self) -> Option<S> {
        self.sink.take()
    }
}
