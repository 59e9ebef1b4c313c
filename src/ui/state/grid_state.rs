use std::collections::{BTreeMap, BTreeSet};

use dioxus::prelude::*;

use crate::client::redraw::{Redraw, Size};
use crate::client::responsive::TableFrame;
use crate::client::session::GridSession;

/// Re-renders the grid by bumping a signal the view reads.
#[derive(Clone, Copy)]
pub struct SignalRedraw {
    pub epoch: Signal<u64>,
}

impl Redraw for SignalRedraw {
    fn redraw(&self, _size: Size) {
        let mut epoch = self.epoch;
        *epoch.write() += 1;
    }
}

/// The rendered table as seen by a detail toggle.
pub struct SignalFrame {
    pub height: f64,
    pub min_height: Signal<Option<f64>>,
    pub open_details: Signal<BTreeSet<String>>,
}

impl TableFrame for SignalFrame {
    fn rendered_height(&self) -> f64 {
        self.height
    }

    fn set_min_height(&mut self, height: Option<f64>) {
        self.min_height.set(height);
    }

    fn set_detail_visible(&mut self, row: &str, visible: bool) {
        if visible {
            self.open_details.write().insert(row.to_string());
        } else {
            self.open_details.write().remove(row);
        }
    }
}

pub type ViewSession = GridSession<SignalRedraw>;

#[derive(Clone, Copy)]
pub struct GridViewState {
    pub session: Signal<Option<ViewSession>>,
    pub epoch: Signal<u64>,
    pub status: Signal<String>,
    pub frame_height: Signal<f64>,
    pub min_height: Signal<Option<f64>>,
    pub open_details: Signal<BTreeSet<String>>,
    pub filter_inputs: Signal<BTreeMap<String, String>>,
}

impl GridViewState {
    pub fn new() -> Self {
        Self {
            session: use_signal(|| None::<ViewSession>),
            epoch: use_signal(|| 0_u64),
            status: use_signal(|| "ready".to_string()),
            frame_height: use_signal(|| 0.0_f64),
            min_height: use_signal(|| None::<f64>),
            open_details: use_signal(BTreeSet::<String>::new),
            filter_inputs: use_signal(BTreeMap::<String, String>::new),
        }
    }

    pub fn frame(&self) -> SignalFrame {
        SignalFrame {
            height: *self.frame_height.read(),
            min_height: self.min_height,
            open_details: self.open_details,
        }
    }
}
