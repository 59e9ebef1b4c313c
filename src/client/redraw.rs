use std::cell::Cell;

use tracing::trace;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Whatever re-renders the table when its frame changes size.
pub trait Redraw {
    fn redraw(&self, size: Size);
}

/// Turns observed frame sizes into redraws.
///
/// A redraw happens only when the observed size differs from the last one.
/// While a [`RedrawBatch`] is open, redraws are held back and replayed once
/// when the outermost batch is dropped.
pub struct RedrawController<R: Redraw> {
    target: R,
    last: Cell<Option<Size>>,
    depth: Cell<u32>,
    deferred: Cell<bool>,
    connected: Cell<bool>,
}

impl<R: Redraw> RedrawController<R> {
    pub fn new(target: R) -> Self {
        Self {
            target,
            last: Cell::new(None),
            depth: Cell::new(0),
            deferred: Cell::new(false),
            connected: Cell::new(true),
        }
    }

    pub fn target(&self) -> &R {
        &self.target
    }

    pub fn last_size(&self) -> Option<Size> {
        self.last.get()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.get()
    }

    pub fn in_batch(&self) -> bool {
        self.depth.get() > 0
    }

    /// Feeds one size observation. Returns whether a redraw ran now.
    pub fn observe(&self, size: Size) -> bool {
        if !self.connected.get() || self.last.get() == Some(size) {
            return false;
        }
        self.last.set(Some(size));
        self.request_redraw()
    }

    /// Redraws at the last known size, or defers it if a batch is open.
    pub fn request_redraw(&self) -> bool {
        if !self.connected.get() {
            return false;
        }
        if self.in_batch() {
            trace!("redraw deferred until batch ends");
            self.deferred.set(true);
            return false;
        }
        match self.last.get() {
            Some(size) => {
                self.target.redraw(size);
                true
            }
            None => false,
        }
    }

    pub fn begin_batch(&self) -> RedrawBatch<'_, R> {
        self.depth.set(self.depth.get() + 1);
        RedrawBatch { controller: self }
    }

    /// Stops observing. Pending and future redraws are dropped.
    pub fn disconnect(&self) {
        self.connected.set(false);
        self.deferred.set(false);
    }

    fn end_batch(&self) {
        let depth = self.depth.get().saturating_sub(1);
        self.depth.set(depth);
        if depth == 0 && self.deferred.replace(false) {
            self.request_redraw();
        }
    }
}

/// Scope during which redraws are suppressed.
#[must_use = "the batch ends as soon as the guard is dropped"]
pub struct RedrawBatch<'a, R: Redraw> {
    controller: &'a RedrawController<R>,
}

impl<R: Redraw> Drop for RedrawBatch<'_, R> {
    fn drop(&mut self) {
        self.controller.end_batch();
    }
}
