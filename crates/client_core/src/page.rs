use std::{collections::BTreeMap, fmt};

use shared::protocol::{ListResponse, PageEnvelope};

pub const DEFAULT_PAGE_SIZE: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a list view currently asks the service for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page_index: u64,
    pub page_size: u64,
    pub sort_field: String,
    pub sort_direction: SortDirection,
    pub search_text: Option<String>,
    pub filters: BTreeMap<String, String>,
}

impl ListQuery {
    pub fn new(sort_field: impl Into<String>) -> Self {
        Self {
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
            sort_field: sort_field.into(),
            sort_direction: SortDirection::Asc,
            search_text: None,
            filters: BTreeMap::new(),
        }
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort_field = field.into();
        self.sort_direction = direction;
        self
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_filter(key, value);
        self
    }

    pub fn with_search(mut self, text: impl Into<String>) -> Self {
        self.set_search(text);
        self
    }

    /// An empty value removes the filter.
    pub fn set_filter(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if value.trim().is_empty() || value.eq_ignore_ascii_case("all") {
            self.filters.remove(&key);
        } else {
            self.filters.insert(key, value);
        }
    }

    pub fn set_search(&mut self, text: impl Into<String>) {
        let text = text.into();
        let text = text.trim();
        self.search_text = (!text.is_empty()).then(|| text.to_owned());
    }

    /// Direction a header click on `field` should request: the active
    /// column flips, any other column starts ascending.
    pub fn next_sort_direction(&self, field: &str) -> SortDirection {
        if self.sort_field == field {
            self.sort_direction.toggled()
        } else {
            SortDirection::Asc
        }
    }

    pub fn filter(&self, key: &str) -> Option<&str> {
        self.filters.get(key).map(String::as_str)
    }

    pub fn search(&self) -> Option<&str> {
        self.search_text.as_deref()
    }
}

/// The one paging contract every view renders from.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_items: u64,
    pub total_pages: u64,
    pub page_index: u64,
    pub page_size: u64,
    pub is_first: bool,
    pub is_last: bool,
}

impl<T> Page<T> {
    /// Builds a page whose counters are derived from `total_items` and
    /// `page_size`, so the paging invariants always hold.
    pub fn new(items: Vec<T>, total_items: u64, page_index: u64, page_size: u64) -> Self {
        let page_size = page_size.max(1);
        let total_pages = total_items.div_ceil(page_size);
        Self {
            items,
            total_items,
            total_pages,
            page_index,
            page_size,
            is_first: page_index == 0,
            is_last: total_pages == 0 || page_index >= total_pages - 1,
        }
    }

    pub fn from_envelope(envelope: PageEnvelope<T>, query: &ListQuery) -> Self {
        let page_size = if envelope.size > 0 {
            envelope.size
        } else {
            query.page_size
        };
        let total_items = envelope
            .total_elements
            .max(envelope.content.len() as u64);
        Self::new(envelope.content, total_items, envelope.number, page_size)
    }

    /// Cuts the window `query` asks for out of a complete result set; the
    /// totals come from the full set.
    pub fn from_complete(all: Vec<T>, query: &ListQuery) -> Self {
        let total_items = all.len() as u64;
        let page_size = query.page_size.max(1);
        let start = query.page_index.saturating_mul(page_size);
        let items = all
            .into_iter()
            .skip(usize::try_from(start).unwrap_or(usize::MAX))
            .take(usize::try_from(page_size).unwrap_or(usize::MAX))
            .collect();
        Self::new(items, total_items, query.page_index, page_size)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether `index` addresses an existing page.
    pub fn contains_page(&self, index: u64) -> bool {
        index < self.total_pages
    }

    /// "Showing X of Y" / "Page i of n" as the list footer prints it.
    pub fn summary(&self) -> PageSummary {
        PageSummary {
            shown: self.items.len() as u64,
            total_items: self.total_items,
            page_number: self.page_index + 1,
            total_pages: self.total_pages.max(1),
        }
    }
}

/// A list response before the filters its endpoint ignored are applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Listing<T> {
    /// Bare array: every matching row, unwindowed.
    Complete(Vec<T>),
    /// Envelope: one server-side window.
    Window(Page<T>),
}

impl<T> Listing<T> {
    pub fn from_response(response: ListResponse<T>, query: &ListQuery) -> Self {
        match response {
            ListResponse::Items(all) => Listing::Complete(all),
            ListResponse::Envelope(envelope) => {
                Listing::Window(Page::from_envelope(envelope, query))
            }
        }
    }

    /// Transforms the rows, keeping the window counters of a server page.
    pub fn map_items<U>(self, f: impl FnOnce(Vec<T>) -> Vec<U>) -> Listing<U> {
        match self {
            Listing::Complete(all) => Listing::Complete(f(all)),
            Listing::Window(page) => Listing::Window(Page::new(
                f(page.items),
                page.total_items,
                page.page_index,
                page.page_size,
            )),
        }
    }

    pub fn into_items(self) -> Vec<T> {
        match self {
            Listing::Complete(all) => all,
            Listing::Window(page) => page.items,
        }
    }

    /// The page `query` asks for, with `filters` applied client-side.
    ///
    /// A complete set is filtered before it is windowed, so totals count
    /// every match. A server window can only be filtered in place.
    pub fn into_page(self, query: &ListQuery, filters: &[(&str, &str)]) -> Page<T>
    where
        T: Filterable,
    {
        match self {
            Listing::Complete(mut all) => {
                all.retain(|item| matches_all(item, filters));
                Page::from_complete(all, query)
            }
            Listing::Window(page) => post_filter(page, filters),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSummary {
    pub shown: u64,
    pub total_items: u64,
    pub page_number: u64,
    pub total_pages: u64,
}

impl fmt::Display for PageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Showing {} of {} · Page {} of {}",
            self.shown, self.total_items, self.page_number, self.total_pages
        )
    }
}

/// Client-side predicate for filter keys an endpoint cannot apply itself.
///
/// Unknown keys match everything.
pub trait Filterable {
    fn matches_filter(&self, key: &str, value: &str) -> bool;
}

/// Applies the filters the source could not handle to an already fetched
/// page. The counters are recomputed from what survives, which is only the
/// current slice; a known approximation for envelope responses.
pub fn post_filter<T: Filterable>(page: Page<T>, filters: &[(&str, &str)]) -> Page<T> {
    if filters.is_empty() {
        return page;
    }
    let Page {
        items,
        page_index,
        page_size,
        ..
    } = page;
    let items: Vec<T> = items
        .into_iter()
        .filter(|item| matches_all(item, filters))
        .collect();
    let total_items = items.len() as u64;
    Page::new(items, total_items, page_index, page_size)
}

fn matches_all<T: Filterable>(item: &T, filters: &[(&str, &str)]) -> bool {
    filters
        .iter()
        .all(|(key, value)| item.matches_filter(key, value))
}

/// Shared `status=active|inactive` matcher used by the entity filters.
pub(crate) fn matches_status(is_active: bool, value: &str) -> bool {
    match value.to_ascii_lowercase().as_str() {
        "active" => is_active,
        "inactive" => !is_active,
        _ => true,
    }
}

#[cfg(test)]
#[path = "tests/page_tests.rs"]
mod tests;
