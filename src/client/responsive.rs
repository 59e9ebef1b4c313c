use std::collections::BTreeSet;

use tracing::debug;

use crate::client::frozen::RowId;
use crate::client::redraw::{Redraw, RedrawController};
use crate::domain::entities::column::{ColumnSet, ResolvedColumn};
use crate::domain::entities::grid::{GridOptions, LayoutMode, ResponsiveMode};
use crate::domain::entities::page::{row_value, value_text, RowData};

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnLayout {
    pub field: String,
    pub width: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    pub visible: Vec<ColumnLayout>,
    /// Fields hidden for lack of space, in column order.
    pub hidden: Vec<String>,
    pub table_width: f64,
}

/// Hides low-priority columns until the rest fit in `available`, then
/// spreads widths according to `mode`.
///
/// The column with the highest `responsive` number goes first; on ties the
/// rightmost one. Priority `0` columns are never hidden. Without a
/// responsive mode nothing is hidden.
pub fn compute_layout(
    columns: &ColumnSet,
    mode: LayoutMode,
    responsive: Option<ResponsiveMode>,
    available: f64,
) -> Layout {
    let mut visible: Vec<&ResolvedColumn> = columns.iter().collect();
    let natural = |cols: &[&ResolvedColumn]| -> f64 {
        cols.iter().map(|col| f64::from(col.spec.width)).sum()
    };

    if responsive.is_some() {
        while natural(&visible) > available {
            let victim = visible
                .iter()
                .enumerate()
                .filter(|(_, col)| col.spec.responsive > 0)
                .max_by_key(|(pos, col)| (col.spec.responsive, *pos))
                .map(|(pos, _)| pos);
            match victim {
                Some(pos) => {
                    visible.remove(pos);
                }
                None => break,
            }
        }
    }

    let total = natural(&visible);
    let mut widths: Vec<f64> = visible.iter().map(|col| f64::from(col.spec.width)).collect();
    match mode {
        LayoutMode::FitData | LayoutMode::FitDataTable => {}
        LayoutMode::FitColumns => {
            if total > 0.0 && available > 0.0 && available.is_finite() {
                let scale = available / total;
                for width in &mut widths {
                    *width *= scale;
                }
            }
        }
        LayoutMode::FitDataFill | LayoutMode::FitDataStretch => {
            let spare = (available - total).max(0.0);
            if let Some(last) = widths.last_mut().filter(|_| spare.is_finite()) {
                *last += spare;
            }
        }
    }

    let hidden = columns
        .iter()
        .filter(|col| !visible.iter().any(|shown| shown.spec.field == col.spec.field))
        .map(|col| col.spec.field.clone())
        .collect();

    Layout {
        table_width: widths.iter().sum(),
        visible: visible
            .iter()
            .zip(widths)
            .map(|(col, width)| ColumnLayout {
                field: col.spec.field.clone(),
                width,
            })
            .collect(),
        hidden,
    }
}

/// The table surface a detail toggle mutates.
pub trait TableFrame {
    fn rendered_height(&self) -> f64;
    fn set_min_height(&mut self, height: Option<f64>);
    fn set_detail_visible(&mut self, row: &str, visible: bool);
}

/// Responsive column state for one grid: current layout plus which rows
/// have their collapsed-column panel open.
#[derive(Debug)]
pub struct ResponsiveColumns {
    columns: ColumnSet,
    mode: LayoutMode,
    responsive: Option<ResponsiveMode>,
    layout: Layout,
    expanded: BTreeSet<RowId>,
    pinned: Option<f64>,
}

impl ResponsiveColumns {
    pub fn new(columns: ColumnSet, options: &GridOptions) -> Self {
        let layout = compute_layout(&columns, LayoutMode::FitData, None, 0.0);
        Self {
            columns,
            mode: options.layout,
            responsive: options.responsive_layout,
            layout,
            expanded: BTreeSet::new(),
            pinned: None,
        }
    }

    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn relayout(&mut self, available: f64) -> &Layout {
        let layout = compute_layout(&self.columns, self.mode, self.responsive, available);
        if layout.hidden != self.layout.hidden {
            debug!(hidden = ?layout.hidden, available, "responsive columns changed");
        }
        if layout.hidden.is_empty() {
            self.expanded.clear();
        }
        self.layout = layout;
        &self.layout
    }

    /// True when hidden columns are shown in a per-row panel.
    pub fn collapse_active(&self) -> bool {
        self.responsive == Some(ResponsiveMode::Collapse) && !self.layout.hidden.is_empty()
    }

    pub fn is_expanded(&self, row: &str) -> bool {
        self.expanded.contains(row)
    }

    /// Title and text of each collapsed column for one row.
    pub fn detail(&self, row: &RowData) -> Vec<(String, String)> {
        if !self.collapse_active() {
            return Vec::new();
        }
        self.layout
            .hidden
            .iter()
            .filter_map(|field| self.columns.get(field))
            .map(|col| {
                let text = row_value(row, &col.path).map(value_text).unwrap_or_default();
                (col.spec.title.clone(), text)
            })
            .collect()
    }

    /// Minimum height held on the frame since the last detail toggle.
    pub fn pinned_height(&self) -> Option<f64> {
        self.pinned
    }

    /// Opens or closes a row's detail panel inside one redraw batch, so the
    /// toggle causes at most one redraw. The frame's minimum height stays
    /// pinned at its pre-toggle height until [`Self::settle`] runs.
    pub fn toggle_detail<F, R>(
        &mut self,
        row: &str,
        frame: &mut F,
        redraw: &RedrawController<R>,
    ) -> bool
    where
        F: TableFrame,
        R: Redraw,
    {
        if !self.collapse_active() {
            debug!(%row, "no collapsed columns to show");
            return false;
        }

        let _batch = redraw.begin_batch();
        if self.pinned.is_none() {
            let height = frame.rendered_height();
            frame.set_min_height(Some(height));
            self.pinned = Some(height);
        }

        let open = if self.expanded.remove(row) {
            false
        } else {
            self.expanded.insert(row.to_string());
            true
        };
        frame.set_detail_visible(row, open);
        redraw.request_redraw();
        open
    }

    /// Releases the height pinned by a detail toggle once the new layout
    /// has been observed. Returns whether a pin was held.
    pub fn settle<F: TableFrame>(&mut self, frame: &mut F) -> bool {
        match self.pinned.take() {
            Some(height) => {
                debug!(height, "releasing pinned table height");
                frame.set_min_height(None);
                true
            }
            None => false,
        }
    }
}
