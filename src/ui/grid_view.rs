use std::sync::Arc;

use dioxus::prelude::*;

use crate::client::frozen::row_id;
use crate::client::redraw::Size;
use crate::client::request_builder::{GridRequestBuilder, LoadState, PendingRequest};
use crate::client::transport::GridTransport;
use crate::domain::entities::column::ResolvedColumn;
use crate::domain::entities::grid::GridDefinition;
use crate::domain::entities::page::{row_value, value_text, RowData};
use crate::domain::entities::query::{FilterOperator, SortDirection};
use crate::platform::desktop::blocking::run_detached;
use crate::ui::state::grid_state::{GridViewState, SignalRedraw, ViewSession};

/// What the window shows: one grid and the way to reach its data.
#[derive(Clone)]
pub struct ViewerContext {
    pub definition: GridDefinition,
    pub transport: Arc<dyn GridTransport>,
}

const CELL_STYLE: &str = "border: 1px solid #ccc; padding: 4px 8px; white-space: nowrap; overflow: hidden; text-overflow: ellipsis;";
const HEADER_STYLE: &str = "border: 1px solid #999; padding: 4px 8px; background: #f0f0f0; cursor: pointer; user-select: none;";
const FROZEN_ROW_STYLE: &str = "background: #fff8dc;";

fn build_session(context: &ViewerContext, epoch: Signal<u64>) -> Result<ViewSession, String> {
    ViewSession::new(
        context.definition.clone(),
        Arc::clone(&context.transport),
        SignalRedraw { epoch },
    )
    .map_err(|err| err.to_string())
}

fn status_text(builder: &GridRequestBuilder) -> String {
    match builder.state() {
        LoadState::Idle => format!(
            "{} rows, page {} of {}",
            builder.total_rows(),
            builder.page(),
            builder.last_page().max(1)
        ),
        LoadState::Loading => "loading...".to_string(),
        LoadState::Error(message) => format!("request failed: {message}"),
    }
}

/// Issues one request built by `change`. The view renders the loading
/// state while a worker fetches; the result is applied when it lands.
fn dispatch<F>(state: GridViewState, change: F)
where
    F: FnOnce(&mut ViewSession) -> PendingRequest,
{
    let mut session = state.session;
    let mut status = state.status;

    let issued = session
        .write()
        .as_mut()
        .map(|active| (change(active), active.transport()));
    let Some((PendingRequest { token, query }, transport)) = issued else {
        return;
    };
    status.set("loading...".to_string());

    spawn(async move {
        let result = run_detached(move || transport.fetch(&query))
            .await
            .and_then(|result| result);
        let Ok(mut guard) = session.try_write() else {
            return;
        };
        if let Some(active) = guard.as_mut() {
            active.complete(token, result);
            status.set(status_text(active.builder()));
        }
    });
}

fn sort_mark(direction: Option<SortDirection>) -> &'static str {
    match direction {
        Some(SortDirection::Asc) => " ▲",
        Some(SortDirection::Desc) => " ▼",
        None => "",
    }
}

struct ColumnView {
    column: ResolvedColumn,
    width: f64,
}

struct RowView {
    id: Option<String>,
    cells: Vec<String>,
    detail: Vec<(String, String)>,
    frozen: bool,
}

fn row_view(row: &RowData, session: &ViewSession, columns: &[ColumnView], frozen: bool) -> RowView {
    RowView {
        id: row_id(row, &session.definition().options.index),
        cells: columns
            .iter()
            .map(|view| row_value(row, &view.column.path).map(value_text).unwrap_or_default())
            .collect(),
        detail: session.responsive().detail(row),
        frozen,
    }
}

#[component]
pub fn GridApp() -> Element {
    let context = use_context::<ViewerContext>();
    let state = GridViewState::new();
    let GridViewState {
        mut session,
        epoch,
        status,
        mut frame_height,
        min_height,
        open_details,
        mut filter_inputs,
    } = state;

    let init_context = context.clone();
    use_hook(move || match build_session(&init_context, epoch) {
        Ok(built) => session.set(Some(built)),
        Err(err) => {
            let mut status = status;
            status.set(format!(
                "cannot open grid `{}`: {err}",
                init_context.definition.name
            ));
        }
    });

    use_effect(move || {
        dispatch(state, |active| active.builder_mut().refresh());
    });

    // A detail toggle pins the table height for one render.
    use_effect(move || {
        if min_height().is_none() {
            return;
        }
        let mut frame = state.frame();
        if let Ok(mut guard) = session.try_write() {
            if let Some(active) = guard.as_mut() {
                active.settle_layout(&mut frame);
            }
        }
    });

    use_drop(move || {
        if let Ok(mut guard) = session.try_write() {
            if let Some(active) = guard.as_mut() {
                active.destroy();
            }
        }
    });

    // Subscribe to redraw requests.
    let _ = epoch();

    let guard = session.read();
    let Some(active) = guard.as_ref() else {
        return rsx! {
            div { style: "padding: 16px;", "{status}" }
        };
    };

    let builder = active.builder();
    let layout = active.responsive().layout().clone();
    let columns: Vec<ColumnView> = layout
        .visible
        .iter()
        .filter_map(|visible| {
            active
                .responsive()
                .columns()
                .get(&visible.field)
                .map(|column| ColumnView {
                    column: column.clone(),
                    width: visible.width,
                })
        })
        .collect();
    let collapse = active.responsive().collapse_active();
    let split = active.split_rows();
    let rows: Vec<RowView> = split
        .frozen
        .iter()
        .map(|row| row_view(row, active, &columns, true))
        .chain(split.body.iter().map(|row| row_view(row, active, &columns, false)))
        .collect();
    let page = builder.page();
    let last_page = i64::try_from(builder.last_page()).unwrap_or(i64::MAX);
    let loading = builder.is_loading();
    let failed = matches!(builder.state(), LoadState::Error(_));
    let sort_marks: Vec<&'static str> = columns
        .iter()
        .map(|view| sort_mark(builder.sort_direction(&view.column.spec.field)))
        .collect();
    let grid_name = active.definition().name.clone();
    let table_width = layout.table_width;
    drop(guard);

    let min_height_style = min_height()
        .map(|height| format!("min-height: {height}px;"))
        .unwrap_or_default();
    let status_style = if failed {
        "color: #b00020; margin-top: 8px;"
    } else {
        "color: #555; margin-top: 8px;"
    };

    rsx! {
        div { style: "padding: 12px; font-family: sans-serif; font-size: 13px;",
            div { style: "margin-bottom: 8px; display: flex; gap: 8px; align-items: center;",
                strong { "{grid_name}" }
                button {
                    disabled: loading,
                    onclick: move |_| dispatch(state, |active| active.builder_mut().refresh()),
                    "Refresh"
                }
                button {
                    disabled: loading,
                    onclick: move |_| {
                        filter_inputs.write().clear();
                        dispatch(state, |active| active.reset());
                    },
                    "Reset"
                }
            }
            div {
                style: "overflow: auto; {min_height_style}",
                onresize: move |event| {
                    if let Ok(size) = event.data().get_border_box_size() {
                        frame_height.set(size.height);
                        let mut frame = state.frame();
                        if let Some(active) = session.write().as_mut() {
                            active.observe_size(Size::new(size.width, size.height), &mut frame);
                        }
                    }
                },
                table { style: "border-collapse: collapse; table-layout: fixed; width: {table_width}px;",
                    thead {
                        tr {
                            if collapse {
                                th { style: "{HEADER_STYLE} width: 24px;" }
                            }
                            {columns.iter().zip(sort_marks).map(|(view, mark)| {
                                let field = view.column.spec.field.clone();
                                let sortable = view.column.spec.sortable;
                                let width = view.width;
                                let title = view.column.spec.title.clone();
                                rsx!(
                                    th {
                                        key: "{field}",
                                        style: "{HEADER_STYLE} width: {width}px;",
                                        onclick: move |_| {
                                            if sortable {
                                                let field = field.clone();
                                                dispatch(state, move |active| active.builder_mut().toggle_sort(&field));
                                            }
                                        },
                                        "{title}{mark}"
                                    }
                                )
                            })}
                        }
                        tr {
                            if collapse {
                                th { style: "{CELL_STYLE}" }
                            }
                            {columns.iter().map(|view| {
                                let field = view.column.spec.field.clone();
                                let field_for_input = field.clone();
                                let filterable = view.column.spec.filterable;
                                let current = filter_inputs().get(&field).cloned().unwrap_or_default();
                                rsx!(
                                    th { key: "filter-{field}", style: "{CELL_STYLE}",
                                        if filterable {
                                            input {
                                                style: "width: 100%; box-sizing: border-box;",
                                                placeholder: "filter",
                                                value: "{current}",
                                                oninput: move |event| {
                                                    filter_inputs.write().insert(field_for_input.clone(), event.value());
                                                },
                                                onchange: move |event| {
                                                    let field = field.clone();
                                                    let text = event.value().trim().to_string();
                                                    dispatch(state, move |active| {
                                                        let builder = active.builder_mut();
                                                        if text.is_empty() {
                                                            builder.clear_filter(&field)
                                                        } else {
                                                            builder.set_filter(&field, FilterOperator::Like, text.as_str().into())
                                                        }
                                                    });
                                                },
                                            }
                                        }
                                    }
                                )
                            })}
                        }
                    }
                    tbody {
                        {rows.into_iter().enumerate().map(|(position, row)| {
                            let expanded = row
                                .id
                                .as_ref()
                                .is_some_and(|id| open_details().contains(id));
                            let toggle_id = row.id.clone();
                            let row_style = if row.frozen { FROZEN_ROW_STYLE } else { "" };
                            let detail_span = row.cells.len() + 1;
                            let key = row.id.clone().unwrap_or_else(|| format!("row-{position}"));
                            rsx!(
                                tr { key: "{key}", style: "{row_style}",
                                    if collapse {
                                        td {
                                            style: "{CELL_STYLE} cursor: pointer; text-align: center;",
                                            onclick: move |_| {
                                                if let Some(id) = toggle_id.as_deref() {
                                                    let mut frame = state.frame();
                                                    if let Some(active) = session.write().as_mut() {
                                                        active.toggle_detail(id, &mut frame);
                                                    }
                                                }
                                            },
                                            if expanded { "−" } else { "+" }
                                        }
                                    }
                                    for cell in row.cells.iter() {
                                        td { style: "{CELL_STYLE}", "{cell}" }
                                    }
                                }
                                if collapse && expanded {
                                    tr { key: "{key}-detail",
                                        td { colspan: "{detail_span}", style: "{CELL_STYLE} background: #fafafa;",
                                            for (title, value) in row.detail.iter() {
                                                div { strong { "{title}: " } "{value}" }
                                            }
                                        }
                                    }
                                }
                            )
                        })}
                    }
                }
            }
            div { style: "margin-top: 8px; display: flex; gap: 8px; align-items: center;",
                button {
                    disabled: loading || page <= 1,
                    onclick: move |_| dispatch(state, move |active| active.builder_mut().set_page(page - 1)),
                    "Prev"
                }
                span { "page {page} of {last_page.max(1)}" }
                button {
                    disabled: loading || page >= last_page,
                    onclick: move |_| dispatch(state, move |active| active.builder_mut().set_page(page + 1)),
                    "Next"
                }
            }
            div { style: "{status_style}", "{status}" }
        }
    }
}
