//! Shared test doubles

#![allow(dead_code)]

use async_trait::async_trait;
use msgraph_core::{RawResponse, RequestAdapter, RequestInformation, Result};
use std::collections::VecDeque;
use std::sync::Mutex;

type Handler = Box<dyn Fn(&RequestInformation) -> Result<RawResponse> + Send + Sync>;

/// Adapter that answers from a closure or a script and records every request.
pub struct MockRequestAdapter {
    handler: Handler,
    requests: Mutex<Vec<RequestInformation>>,
}

impl MockRequestAdapter {
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&RequestInformation) -> Result<RawResponse> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer requests with `responses` in order; extra requests get a 500.
    pub fn scripted(responses: Vec<RawResponse>) -> Self {
        let queue = Mutex::new(VecDeque::from(responses));
        Self::with_handler(move |_request| {
            Ok(queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| RawResponse::new(500)))
        })
    }

    pub fn requests(&self) -> Vec<RequestInformation> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl RequestAdapter for MockRequestAdapter {
    async fn send(&self, request: RequestInformation) -> Result<RawResponse> {
        let response = (self.handler)(&request);
        self.requests.lock().unwrap().push(request);
        response
    }
}

/// Install a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
