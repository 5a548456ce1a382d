//! Test doubles shared by unit tests across the crate.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::{ApiError, ApiRequest, ApiTransport, RawResponse};

/// Transport that records every request and replays queued responses in
/// FIFO order. Running out of responses fails the call, which keeps tests
/// honest about how many round-trips an operation performs.
#[derive(Debug, Default)]
pub struct StubTransport {
    requests: Mutex<Vec<ApiRequest>>,
    responses: Mutex<VecDeque<Result<RawResponse, ApiError>>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_json(&self, status: u16, body: serde_json::Value) {
        self.push_response(Ok(RawResponse {
            status,
            body: body.to_string().into_bytes(),
        }));
    }

    pub fn push_raw(&self, status: u16, body: &[u8]) {
        self.push_response(Ok(RawResponse {
            status,
            body: body.to_vec(),
        }));
    }

    pub fn push_error(&self, error: ApiError) {
        self.push_response(Err(error));
    }

    fn push_response(&self, response: Result<RawResponse, ApiError>) {
        self.responses
            .lock()
            .expect("stub response lock")
            .push_back(response);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().expect("stub request lock").clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("stub request lock").len()
    }
}

#[async_trait]
impl ApiTransport for StubTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, ApiError> {
        self.requests
            .lock()
            .expect("stub request lock")
            .push(request);
        match self
            .responses
            .lock()
            .expect("stub response lock")
            .pop_front()
        {
            Some(response) => response,
            None => Err(ApiError::Network(
                "stub transport has no more queued responses".to_string(),
            )),
        }
    }
}
