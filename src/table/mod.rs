//! Client-side table engine: filter → sort → paginate over an in-memory row set.
//!
//! The view is a plain [`ViewState`] value. [`derive_visible_rows`] is a pure
//! function of `(rows, view)`, so the same final view always yields the same
//! page no matter which sequence of actions produced it. [`TableEngine`]
//! wraps the pair and exposes the user actions.

pub mod holdings;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::num::NonZeroUsize;

pub const DEFAULT_PAGE_SIZE: NonZeroUsize = NonZeroUsize::new(10).unwrap();

// ── Rows & cells ──────────────────────────────────────────────────────────────

/// A single cell as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellValue<'a> {
    Text(&'a str),
    Number(f64),
    Missing,
}

impl<'a> CellValue<'a> {
    /// NaN is not orderable; treat it as no value.
    pub fn number(n: f64) -> Self {
        if n.is_nan() {
            CellValue::Missing
        } else {
            CellValue::Number(n)
        }
    }
}

impl fmt::Display for CellValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Missing => Ok(()),
        }
    }
}

/// Row types the engine can display.
pub trait Tabular {
    type Field: Copy + Eq + fmt::Debug;

    fn cell(&self, field: Self::Field) -> CellValue<'_>;
}

// ── View state ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flip(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey<F> {
    pub field: F,
    pub direction: SortDirection,
}

/// Everything that decides what the table shows, independent of the rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState<F> {
    pub sort: Option<SortKey<F>>,
    /// Field the filter text is matched against.
    pub filter_field: F,
    pub filter_text: String,
    /// Display order of the columns, each with its visibility flag.
    pub columns: Vec<(F, bool)>,
    pub page_index: usize,
    pub page_size: NonZeroUsize,
}

impl<F: Copy + Eq> ViewState<F> {
    /// All `columns` visible, no sort, no filter, first page.
    pub fn new(
        columns: impl IntoIterator<Item = F>,
        filter_field: F,
        page_size: NonZeroUsize,
    ) -> Self {
        Self {
            sort: None,
            filter_field,
            filter_text: String::new(),
            columns: columns.into_iter().map(|c| (c, true)).collect(),
            page_index: 0,
            page_size,
        }
    }

    /// New filter text. Going back to the first page only when the text changed.
    pub fn with_filter(mut self, text: impl Into<String>) -> Self {
        let text: String = text.into();
        if text != self.filter_text {
            self.filter_text = text;
            self.page_index = 0;
        }
        self
    }

    /// Match the filter text against another field.
    pub fn with_filter_field(mut self, field: F) -> Self {
        if field != self.filter_field {
            self.filter_field = field;
            self.page_index = 0;
        }
        self
    }

    pub fn with_sort(mut self, field: F, direction: SortDirection) -> Self {
        self.sort = Some(SortKey { field, direction });
        self
    }

    /// Same field flips direction; a new field starts ascending.
    pub fn toggled_sort(mut self, field: F) -> Self {
        let direction = match self.sort {
            Some(key) if key.field == field => key.direction.flip(),
            _ => SortDirection::Ascending,
        };
        self.sort = Some(SortKey { field, direction });
        self
    }

    pub fn without_sort(mut self) -> Self {
        self.sort = None;
        self
    }

    pub fn with_column_visibility(mut self, field: F, visible: bool) -> Self {
        match self.columns.iter_mut().find(|(f, _)| *f == field) {
            Some(col) => col.1 = visible,
            None => self.columns.push((field, visible)),
        }
        self
    }

    pub fn with_page_size(mut self, page_size: NonZeroUsize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn visible_columns(&self) -> impl Iterator<Item = F> + '_ {
        self.columns.iter().filter(|(_, v)| *v).map(|(f, _)| *f)
    }

    pub fn is_visible(&self, field: F) -> bool {
        self.columns.iter().any(|(f, v)| *f == field && *v)
    }

    /// Highest valid page index for `filtered_count` rows.
    pub fn last_page(&self, filtered_count: usize) -> usize {
        page_count(filtered_count, self.page_size).saturating_sub(1)
    }

    /// Page index forced into `[0, last_page]`.
    pub fn clamped(mut self, filtered_count: usize) -> Self {
        self.page_index = self.page_index.min(self.last_page(filtered_count));
        self
    }

    pub fn next_page(mut self, filtered_count: usize) -> Self {
        if self.page_index < self.last_page(filtered_count) {
            self.page_index += 1;
        }
        self.clamped(filtered_count)
    }

    pub fn previous_page(mut self) -> Self {
        self.page_index = self.page_index.saturating_sub(1);
        self
    }

    pub fn at_page(mut self, index: usize, filtered_count: usize) -> Self {
        self.page_index = index;
        self.clamped(filtered_count)
    }
}

pub fn page_count(filtered_count: usize, page_size: NonZeroUsize) -> usize {
    filtered_count.div_ceil(page_size.get())
}

// ── Derivation ────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct VisibleRow<'a, R: Tabular> {
    pub record: &'a R,
    /// One cell per visible column, in column order.
    pub cells: Vec<CellValue<'a>>,
}

#[derive(Debug)]
pub struct VisiblePage<'a, R: Tabular> {
    pub rows: Vec<VisibleRow<'a, R>>,
    pub columns: Vec<R::Field>,
    pub total_count: usize,
    pub filtered_count: usize,
    pub page_index: usize,
    pub page_count: usize,
}

impl<R: Tabular> VisiblePage<'_, R> {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Case-insensitive substring match of `needle` (already lowercased) on `field`.
fn matches_filter<R: Tabular>(row: &R, field: R::Field, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    match row.cell(field) {
        CellValue::Text(s) => s.to_lowercase().contains(needle),
        CellValue::Number(n) => n.to_string().contains(needle),
        CellValue::Missing => false,
    }
}

/// Missing values go last whichever the direction.
fn compare_cells(a: CellValue<'_>, b: CellValue<'_>, direction: SortDirection) -> Ordering {
    let ord = match (a, b) {
        (CellValue::Missing, CellValue::Missing) => return Ordering::Equal,
        (CellValue::Missing, _) => return Ordering::Greater,
        (_, CellValue::Missing) => return Ordering::Less,
        (CellValue::Number(x), CellValue::Number(y)) => {
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (CellValue::Text(x), CellValue::Text(y)) => x.cmp(y),
        (CellValue::Number(_), CellValue::Text(_)) => Ordering::Less,
        (CellValue::Text(_), CellValue::Number(_)) => Ordering::Greater,
    };
    match direction {
        SortDirection::Ascending => ord,
        SortDirection::Descending => ord.reverse(),
    }
}

/// Rows passing the filter, sorted, in input order when unsorted or tied.
pub fn filtered_sorted<'a, R: Tabular>(rows: &'a [R], view: &ViewState<R::Field>) -> Vec<&'a R> {
    let needle = view.filter_text.to_lowercase();
    let mut out: Vec<&R> = rows
        .iter()
        .filter(|r| matches_filter(*r, view.filter_field, &needle))
        .collect();

    if let Some(key) = view.sort {
        // stable
        out.sort_by(|a, b| compare_cells(a.cell(key.field), b.cell(key.field), key.direction));
    }
    out
}

pub fn filtered_count<R: Tabular>(rows: &[R], view: &ViewState<R::Field>) -> usize {
    let needle = view.filter_text.to_lowercase();
    rows.iter()
        .filter(|r| matches_filter(*r, view.filter_field, &needle))
        .count()
}

/// The page `view` selects from `rows`: filter, then sort, then paginate.
pub fn derive_visible_rows<'a, R: Tabular>(
    rows: &'a [R],
    view: &ViewState<R::Field>,
) -> VisiblePage<'a, R> {
    let matched = filtered_sorted(rows, view);
    let filtered = matched.len();
    let pages = page_count(filtered, view.page_size);
    let page_index = view.page_index.min(pages.saturating_sub(1));
    let columns: Vec<R::Field> = view.visible_columns().collect();

    let rows_on_page = matched
        .into_iter()
        .skip(page_index * view.page_size.get())
        .take(view.page_size.get())
        .map(|record| VisibleRow {
            record,
            cells: columns.iter().map(|&c| record.cell(c)).collect(),
        })
        .collect();

    VisiblePage {
        rows: rows_on_page,
        columns,
        total_count: rows.len(),
        filtered_count: filtered,
        page_index,
        page_count: pages,
    }
}

// ── Engine ────────────────────────────────────────────────────────────────────

/// Rows plus the current view; every action is a view transition.
#[derive(Debug, Clone)]
pub struct TableEngine<R: Tabular> {
    rows: Vec<R>,
    view: ViewState<R::Field>,
}

impl<R: Tabular> TableEngine<R> {
    pub fn new(rows: Vec<R>, view: ViewState<R::Field>) -> Self {
        let count = filtered_count(&rows, &view);
        let view = view.clamped(count);
        Self { rows, view }
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn view(&self) -> &ViewState<R::Field> {
        &self.view
    }

    fn update(&mut self, f: impl FnOnce(ViewState<R::Field>, usize) -> ViewState<R::Field>) {
        let count = filtered_count(&self.rows, &self.view);
        let view = f(self.view.clone(), count);
        // the filter may have changed the row count
        let count = filtered_count(&self.rows, &view);
        self.view = view.clamped(count);
    }

    pub fn set_filter(&mut self, text: impl Into<String>) {
        let text: String = text.into();
        self.update(|v, _| v.with_filter(text));
    }

    pub fn set_filter_field(&mut self, field: R::Field) {
        self.update(|v, _| v.with_filter_field(field));
    }

    pub fn set_sort(&mut self, field: R::Field, direction: SortDirection) {
        self.update(|v, _| v.with_sort(field, direction));
    }

    pub fn toggle_sort(&mut self, field: R::Field) {
        self.update(|v, _| v.toggled_sort(field));
    }

    pub fn clear_sort(&mut self) {
        self.update(|v, _| v.without_sort());
    }

    pub fn set_column_visibility(&mut self, field: R::Field, visible: bool) {
        self.update(|v, _| v.with_column_visibility(field, visible));
    }

    pub fn set_page_size(&mut self, page_size: NonZeroUsize) {
        self.update(|v, _| v.with_page_size(page_size));
    }

    pub fn next_page(&mut self) {
        self.update(|v, count| v.next_page(count));
    }

    pub fn previous_page(&mut self) {
        self.update(|v, _| v.previous_page());
    }

    pub fn go_to_page(&mut self, index: usize) {
        self.update(|v, count| v.at_page(index, count));
    }

    /// Swap in freshly fetched rows; the view survives, the page is clamped.
    pub fn replace_rows(&mut self, rows: Vec<R>) {
        self.rows = rows;
        self.update(|v, _| v);
    }

    pub fn visible_rows(&self) -> VisiblePage<'_, R> {
        derive_visible_rows(&self.rows, &self.view)
    }

    /// Every matching row in display order, ignoring pagination.
    pub fn all_matching(&self) -> Vec<&R> {
        filtered_sorted(&self.rows, &self.view)
    }
}
