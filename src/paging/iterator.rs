//! Pull-based iteration over server-paged collections
//!
//! Pages are fetched lazily by following `@odata.nextLink`. The per-item
//! callback decides whether iteration continues; returning `false` pauses the
//! iterator right after that item, and a later [`PageIterator::resume`] picks
//! up with the next one.

use futures::stream::{self, Stream};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{GraphError, Result};
use crate::http::adapter::{ErrorMappings, RequestAdapter};
use crate::http::request::{HttpMethod, RequestHeaders, RequestInformation, RequestOption};
use crate::models::PageResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationState {
    Iterating,
    Paused,
    Exhausted,
}

pub struct PageIterator<T> {
    adapter: Arc<dyn RequestAdapter>,
    current_page: PageResult<T>,
    pause_index: usize,
    state: IterationState,
    headers: RequestHeaders,
    options: Vec<RequestOption>,
    error_mappings: ErrorMappings,
}

impl<T> PageIterator<T>
where
    T: DeserializeOwned + Send,
{
    /// Build an iterator from the raw first response of a collection request.
    ///
    /// Fails when the payload has no `value` collection or carries a
    /// malformed next link.
    pub fn new(initial_response: Value, adapter: Arc<dyn RequestAdapter>) -> Result<Self> {
        let page = PageResult::from_json(initial_response)?;
        Ok(Self::from_page(page, adapter))
    }

    pub fn from_page(page: PageResult<T>, adapter: Arc<dyn RequestAdapter>) -> Self {
        Self {
            adapter,
            current_page: page,
            pause_index: 0,
            state: IterationState::Iterating,
            headers: RequestHeaders::new(),
            options: Vec::new(),
            error_mappings: ErrorMappings::odata(),
        }
    }

    pub fn state(&self) -> IterationState {
        self.state
    }

    /// False once the collection has been fully consumed.
    pub fn has_next(&self) -> bool {
        self.state != IterationState::Exhausted
    }

    pub fn current_page(&self) -> &PageResult<T> {
        &self.current_page
    }

    pub fn pause_index(&self) -> usize {
        self.pause_index
    }

    /// Move the resume position within the current page.
    pub fn set_pause_index(&mut self, index: usize) -> Result<()> {
        if index > self.current_page.value.len() {
            return Err(GraphError::invalid_argument(format!(
                "pause index {} is outside a page of {} items",
                index,
                self.current_page.value.len()
            )));
        }
        self.pause_index = index;
        Ok(())
    }

    /// Delta link of the last page, for the next incremental sync.
    pub fn delta_link(&self) -> Option<&str> {
        self.current_page.delta_link.as_deref()
    }

    /// Headers sent with every subsequent page request.
    pub fn set_headers(&mut self, headers: RequestHeaders) {
        self.headers.extend(&headers);
    }

    /// Options applied to every subsequent page request.
    pub fn set_request_options(&mut self, options: &[RequestOption]) {
        self.options.extend_from_slice(options);
    }

    pub fn set_error_mappings(&mut self, mappings: ErrorMappings) {
        self.error_mappings.merge(&mappings);
    }

    /// Feed the rest of the current page to `callback`.
    ///
    /// Returns `true` when the page was consumed and the next one may be
    /// fetched, `false` when the callback paused or the page was empty.
    pub fn enumerate<F>(&mut self, callback: &mut F) -> bool
    where
        F: FnMut(&T) -> bool,
    {
        if self.current_page.value.is_empty() {
            self.state = IterationState::Exhausted;
            return false;
        }

        while self.pause_index < self.current_page.value.len() {
            let item = &self.current_page.value[self.pause_index];
            self.pause_index += 1;
            if !callback(item) {
                self.state = IterationState::Paused;
                debug!("Iteration paused at index {}", self.pause_index);
                return false;
            }
        }
        true
    }

    /// Fetch the page behind the current next link, if there is one.
    pub async fn next(&mut self) -> Result<Option<PageResult<T>>> {
        let next_link = match self.current_page.validated_next_link() {
            Some(link) => link.to_string(),
            None => return Ok(None),
        };

        let mut request = RequestInformation::new(HttpMethod::Get, next_link);
        request.headers.insert("Accept", "application/json");
        request.headers.extend(&self.headers);
        request.options = self.options.clone();

        debug!("Fetching next page from {}", request.url);
        let response = self
            .adapter
            .send_checked(request, Some(&self.error_mappings))
            .await?;
        let value: Value = response.json()?;
        PageResult::from_json(value).map(Some)
    }

    /// Walk the collection until the callback pauses or the last page is done.
    pub async fn iterate<F>(&mut self, mut callback: F) -> Result<()>
    where
        F: FnMut(&T) -> bool + Send,
    {
        if self.state == IterationState::Exhausted {
            return Ok(());
        }
        self.state = IterationState::Iterating;

        loop {
            if !self.enumerate(&mut callback) {
                return Ok(());
            }

            match self.next().await? {
                Some(page) => {
                    self.current_page = page;
                    self.pause_index = 0;
                }
                None => {
                    self.state = IterationState::Exhausted;
                    info!("Page iteration complete");
                    return Ok(());
                }
            }
        }
    }

    /// Continue after a pause from the item following the one that paused.
    pub async fn resume<F>(&mut self, callback: F) -> Result<()>
    where
        F: FnMut(&T) -> bool + Send,
    {
        self.iterate(callback).await
    }

    /// Consume the iterator as a stream of the remaining items.
    ///
    /// The stream ends after the first error.
    pub fn into_stream(mut self) -> impl Stream<Item = Result<T>> {
        let mut pending = VecDeque::new();
        if self.state != IterationState::Exhausted {
            let items = std::mem::take(&mut self.current_page.value);
            if items.is_empty() {
                self.state = IterationState::Exhausted;
            }
            pending.extend(items.into_iter().skip(self.pause_index));
        }

        stream::try_unfold((self, pending), |(mut iter, mut pending)| async move {
            loop {
                if let Some(item) = pending.pop_front() {
                    return Ok::<_, GraphError>(Some((item, (iter, pending))));
                }
                if iter.state == IterationState::Exhausted {
                    return Ok(None);
                }

                match iter.next().await? {
                    Some(mut page) => {
                        pending.extend(std::mem::take(&mut page.value));
                        if pending.is_empty() {
                            iter.state = IterationState::Exhausted;
                        }
                        iter.current_page = page;
                    }
                    None => return Ok(None),
                }
            }
        })
    }
}
