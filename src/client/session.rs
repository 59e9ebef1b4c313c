use std::sync::Arc;

use tracing::{debug, info};

use crate::client::frozen::{FrozenRows, FrozenRule, FrozenSplit};
use crate::client::reactive::{ReactiveData, RowSink};
use crate::client::redraw::{Redraw, RedrawController, Size};
use crate::client::request_builder::{Completion, GridRequestBuilder, PendingRequest, RequestToken};
use crate::client::responsive::{ResponsiveColumns, TableFrame};
use crate::client::transport::{GridTransport, TransportError};
use crate::domain::entities::column::ColumnSet;
use crate::domain::entities::grid::GridDefinition;
use crate::domain::entities::page::{ResultPage, RowData};
use crate::domain::error::GridError;

/// One live grid on the client: request state plus the local behaviours
/// layered over it.
pub struct GridSession<R: Redraw> {
    definition: GridDefinition,
    transport: Arc<dyn GridTransport>,
    builder: GridRequestBuilder,
    frozen: FrozenRows,
    responsive: ResponsiveColumns,
    redraw: RedrawController<R>,
    destroyed: bool,
}

impl<R: Redraw> GridSession<R> {
    pub fn new(
        definition: GridDefinition,
        transport: Arc<dyn GridTransport>,
        target: R,
    ) -> Result<Self, GridError> {
        let columns = ColumnSet::new(definition.columns.clone())?;
        let options = &definition.options;
        let frozen = FrozenRows::new(
            options.index.clone(),
            FrozenRule::from_setting(&options.frozen_rows),
        );
        let responsive = ResponsiveColumns::new(columns, options);
        let builder = GridRequestBuilder::new(options.page_size);

        Ok(Self {
            definition,
            transport,
            builder,
            frozen,
            responsive,
            redraw: RedrawController::new(target),
            destroyed: false,
        })
    }

    pub fn definition(&self) -> &GridDefinition {
        &self.definition
    }

    pub fn transport(&self) -> Arc<dyn GridTransport> {
        Arc::clone(&self.transport)
    }

    pub fn builder(&self) -> &GridRequestBuilder {
        &self.builder
    }

    pub fn builder_mut(&mut self) -> &mut GridRequestBuilder {
        &mut self.builder
    }

    pub fn frozen(&self) -> &FrozenRows {
        &self.frozen
    }

    pub fn frozen_mut(&mut self) -> &mut FrozenRows {
        &mut self.frozen
    }

    pub fn responsive(&self) -> &ResponsiveColumns {
        &self.responsive
    }

    pub fn redraw(&self) -> &RedrawController<R> {
        &self.redraw
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Sends a request and applies its result synchronously.
    pub fn dispatch(&mut self, pending: PendingRequest) -> Completion {
        if self.destroyed {
            return Completion::Stale;
        }
        let result = self.transport.fetch(&pending.query);
        self.complete(pending.token, result)
    }

    /// Applies a result fetched elsewhere, e.g. on a worker thread.
    pub fn complete(
        &mut self,
        token: RequestToken,
        result: Result<ResultPage, TransportError>,
    ) -> Completion {
        if self.destroyed {
            debug!(grid = %self.definition.name, "result arrived after destroy");
            return Completion::Stale;
        }
        let loaded = result.is_ok();
        let completion = self.builder.complete(token, result);
        if completion == Completion::Applied && loaded {
            self.frozen.apply_rule(self.builder.rows());
            self.redraw.request_redraw();
        }
        completion
    }

    pub fn load(&mut self) -> Completion {
        let pending = self.builder.refresh();
        self.dispatch(pending)
    }

    /// Drops every local setting, explicit freezes included, and returns
    /// the request for the first page.
    pub fn reset(&mut self) -> PendingRequest {
        self.frozen.reset();
        self.builder.reload()
    }

    pub fn reload(&mut self) -> Completion {
        let pending = self.reset();
        self.dispatch(pending)
    }

    /// Rows split into the pinned region and the body.
    pub fn split_rows(&self) -> FrozenSplit {
        self.frozen.split(self.builder.rows())
    }

    /// Feeds a frame size observation. Returns whether a redraw ran.
    ///
    /// An observation means the layout after a detail toggle has settled,
    /// so any height pinned by the toggle is released on `frame`.
    pub fn observe_size<F: TableFrame>(&mut self, size: Size, frame: &mut F) -> bool {
        if self.destroyed {
            return false;
        }
        self.settle_layout(frame);
        if !self.definition.options.auto_resize {
            return false;
        }
        if self.redraw.last_size().map(|last| last.width) != Some(size.width) {
            self.responsive.relayout(size.width);
        }
        self.redraw.observe(size)
    }

    /// Releases a detail-toggle height pin. Returns whether one was held.
    pub fn settle_layout<F: TableFrame>(&mut self, frame: &mut F) -> bool {
        if self.redraw.in_batch() {
            return false;
        }
        self.responsive.settle(frame)
    }

    /// Binds the loaded rows as reactive data for the duration of `change`.
    /// Every row operation the binding produces is applied to the rows this
    /// session renders; afterwards the frozen rule is re-run and one redraw
    /// requested. `None` unless the grid has `reactive_data` enabled.
    pub fn mutate_rows<T>(
        &mut self,
        change: impl FnOnce(&mut ReactiveData<RowData, LoadedRows<'_>>) -> T,
    ) -> Option<T> {
        if self.destroyed || !self.definition.options.reactive_data {
            return None;
        }
        let items = self.builder.rows().to_vec();
        let result = {
            let mut bound = ReactiveData::new(
                items,
                LoadedRows {
                    rows: self.builder.rows_mut(),
                },
            );
            change(&mut bound)
        };
        self.frozen.apply_rule(self.builder.rows());
        self.redraw.request_redraw();
        Some(result)
    }

    pub fn toggle_detail<F: TableFrame>(&mut self, row: &str, frame: &mut F) -> bool {
        if self.destroyed {
            return false;
        }
        self.responsive.toggle_detail(row, frame, &self.redraw)
    }

    /// Releases the size observer and abandons any in-flight request.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.redraw.disconnect();
        self.builder.cancel();
        self.destroyed = true;
        info!(grid = %self.definition.name, "grid session destroyed");
    }
}

/// The session's loaded rows as the sink of a reactive binding.
pub struct LoadedRows<'a> {
    rows: &'a mut Vec<RowData>,
}

impl RowSink<RowData> for LoadedRows<'_> {
    fn row_added(&mut self, index: usize, item: &RowData) {
        let index = index.min(self.rows.len());
        self.rows.insert(index, item.clone());
    }

    fn row_removed(&mut self, index: usize) {
        if index < self.rows.len() {
            self.rows.remove(index);
        }
    }

    fn row_updated(&mut self, index: usize, item: &RowData) {
        if let Some(slot) = self.rows.get_mut(index) {
            *slot = item.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    use serde_json::{json, Value};

    use super::*;
    use crate::domain::entities::column::ColumnSpec;
    use crate::domain::entities::grid::{FrozenRowsSetting, GridOptions, ResponsiveMode};
    use crate::domain::entities::query::QueryRequest;

    #[derive(Default)]
    struct Counter {
        redraws: Cell<usize>,
    }

    impl Redraw for Counter {
        fn redraw(&self, _size: Size) {
            self.redraws.set(self.redraws.get() + 1);
        }
    }

    #[derive(Default)]
    struct Frame {
        height: f64,
        min_height: Option<f64>,
        open: BTreeSet<String>,
    }

    impl TableFrame for Frame {
        fn rendered_height(&self) -> f64 {
            self.height
        }

        fn set_min_height(&mut self, height: Option<f64>) {
            self.min_height = height;
        }

        fn set_detail_visible(&mut self, row: &str, visible: bool) {
            if visible {
                self.open.insert(row.to_string());
            } else {
                self.open.remove(row);
            }
        }
    }

    fn row(id: i64) -> RowData {
        match json!({"id": id, "Title": format!("book {id}")}) {
            Value::Object(row) => row,
            _ => unreachable!(),
        }
    }

    /// Serves `ids` sliced by the requested page.
    struct StubTransport {
        ids: Vec<i64>,
        seen: Mutex<Vec<QueryRequest>>,
    }

    impl GridTransport for StubTransport {
        fn fetch(&self, query: &QueryRequest) -> Result<ResultPage, TransportError> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(query.clone());
            }
            let size = usize::try_from(query.page_size.max(1)).unwrap_or(1);
            let skip = usize::try_from(query.page.max(1) - 1).unwrap_or(0) * size;
            let rows = self
                .ids
                .iter()
                .skip(skip)
                .take(size)
                .map(|id| row(*id))
                .collect();
            let total = self.ids.len() as u64;
            Ok(ResultPage {
                rows,
                total_rows: total,
                total_pages: total.div_ceil(size as u64),
            })
        }
    }

    fn session(options: GridOptions) -> (GridSession<Counter>, Arc<StubTransport>) {
        let transport = Arc::new(StubTransport {
            ids: (1..=7).collect(),
            seen: Mutex::new(Vec::new()),
        });
        let definition = GridDefinition {
            name: "books".into(),
            columns: vec![
                ColumnSpec::new("id").width(50).responsive(0),
                ColumnSpec::new("Title").width(200).responsive(1),
            ],
            options,
        };
        let session = GridSession::new(definition, transport.clone(), Counter::default())
            .expect("session should build");
        (session, transport)
    }

    fn ids(rows: &[RowData]) -> Vec<i64> {
        rows.iter().filter_map(|row| row["id"].as_i64()).collect()
    }

    #[test]
    fn dispatch_loads_pages_and_applies_frozen_rule() {
        let (mut session, _) = session(GridOptions {
            page_size: 3,
            frozen_rows: FrozenRowsSetting::Count(1),
            ..GridOptions::default()
        });

        assert_eq!(session.load(), Completion::Applied);
        let split = session.split_rows();
        assert_eq!(ids(&split.frozen), vec![1]);
        assert_eq!(ids(&split.body), vec![2, 3]);

        let pending = session.builder_mut().set_page(3);
        session.dispatch(pending);
        assert_eq!(ids(session.builder().rows()), vec![7]);
        assert_eq!(session.builder().last_page(), 3);
    }

    #[test]
    fn reload_clears_explicit_freezes() {
        let (mut session, transport) = session(GridOptions {
            page_size: 3,
            ..GridOptions::default()
        });
        session.load();
        session.frozen_mut().freeze("2");
        assert_eq!(ids(&session.split_rows().frozen), vec![2]);

        session.reload();

        assert!(session.split_rows().frozen.is_empty());
        let seen = transport.seen.lock().expect("lock should not be poisoned");
        assert_eq!(seen.last(), Some(&QueryRequest::page(1, 3)));
    }

    #[test]
    fn reset_hands_back_the_first_page_request_for_later_completion() {
        let (mut session, transport) = session(GridOptions {
            page_size: 3,
            ..GridOptions::default()
        });
        session.load();
        let pending = session.builder_mut().set_page(2);
        session.dispatch(pending);
        session.frozen_mut().freeze("5");
        assert_eq!(ids(&session.split_rows().frozen), vec![5]);

        let pending = session.reset();
        assert_eq!(pending.query, QueryRequest::page(1, 3));
        assert!(session.builder().is_loading());
        assert!(session.split_rows().frozen.is_empty());

        let result = transport.fetch(&pending.query);
        assert_eq!(session.complete(pending.token, result), Completion::Applied);
        assert_eq!(ids(session.builder().rows()), vec![1, 2, 3]);
    }

    #[test]
    fn narrow_frame_collapses_columns() {
        let (mut session, _) = session(GridOptions {
            responsive_layout: Some(ResponsiveMode::Collapse),
            ..GridOptions::default()
        });

        let mut frame = Frame::default();

        assert!(session.observe_size(Size::new(120.0, 400.0), &mut frame));
        assert_eq!(session.responsive().layout().hidden, vec!["Title".to_string()]);
        assert!(session.responsive().collapse_active());

        assert!(!session.observe_size(Size::new(120.0, 400.0), &mut frame));
        assert_eq!(session.redraw().target().redraws.get(), 1);
    }

    #[test]
    fn destroy_stops_observation_and_drops_late_results() {
        let (mut session, _) = session(GridOptions::default());
        let mut frame = Frame::default();
        session.observe_size(Size::new(800.0, 600.0), &mut frame);
        let pending = session.builder_mut().refresh();

        session.destroy();

        assert!(session.is_destroyed());
        assert!(!session.redraw().is_connected());
        assert!(!session.observe_size(Size::new(300.0, 600.0), &mut frame));
        assert_eq!(
            session.complete(pending.token, Ok(ResultPage::empty())),
            Completion::Stale
        );
    }

    #[test]
    fn reactive_mutations_reach_the_rendered_rows() {
        let (mut session, _) = session(GridOptions {
            page_size: 3,
            reactive_data: true,
            frozen_rows: FrozenRowsSetting::Count(1),
            ..GridOptions::default()
        });
        session.observe_size(Size::new(800.0, 600.0), &mut Frame::default());
        session.load();
        let redraws = session.redraw().target().redraws.get();

        let len = session.mutate_rows(|rows| {
            rows.push(row(9));
            rows.len()
        });

        assert_eq!(len, Some(4));
        let split = session.split_rows();
        assert_eq!(ids(&split.frozen), vec![1]);
        assert_eq!(ids(&split.body), vec![2, 3, 9]);
        assert_eq!(session.redraw().target().redraws.get(), redraws + 1);

        session.mutate_rows(|rows| {
            rows.prepend(row(0));
            rows.remove_at(2);
            rows.replace(1, row(10));
        });
        let split = session.split_rows();
        assert_eq!(ids(&split.frozen), vec![0]);
        assert_eq!(ids(&split.body), vec![10, 3, 9]);
    }

    #[test]
    fn rows_stay_unbound_without_reactive_data() {
        let (mut session, _) = session(GridOptions::default());
        session.load();

        assert!(session.mutate_rows(|rows| rows.push(row(9))).is_none());
        assert_eq!(session.builder().rows().len(), 7);
    }

    #[test]
    fn detail_pin_holds_until_the_next_size_observation() {
        let (mut session, _) = session(GridOptions {
            responsive_layout: Some(ResponsiveMode::Collapse),
            ..GridOptions::default()
        });
        let mut frame = Frame {
            height: 400.0,
            ..Frame::default()
        };
        session.observe_size(Size::new(120.0, 400.0), &mut frame);

        assert!(session.toggle_detail("1", &mut frame));
        assert!(frame.open.contains("1"));
        assert_eq!(frame.min_height, Some(400.0));
        assert_eq!(session.responsive().pinned_height(), Some(400.0));

        frame.height = 460.0;
        session.observe_size(Size::new(120.0, 460.0), &mut frame);

        assert_eq!(frame.min_height, None);
        assert_eq!(session.responsive().pinned_height(), None);
    }

    #[test]
    fn auto_resize_off_ignores_sizes() {
        let (mut session, _) = session(GridOptions {
            auto_resize: false,
            ..GridOptions::default()
        });

        assert!(!session.observe_size(Size::new(800.0, 600.0), &mut Frame::default()));
        assert_eq!(session.redraw().target().redraws.get(), 0);
    }
}
