//! Scripted in-memory transport shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use d360_client::transport::{ApiRequest, ApiResponse, HttpTransport, TransportFailure};
use d360_client::{ClientConfig, Dialog360Client};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

type Step = Result<ApiResponse, TransportFailure>;

/// Replays canned outcomes in order and records every request it sees.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, TransportFailure> {
        self.requests.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportFailure::Network("script exhausted".into())))
    }
}

pub fn ok_json(body: serde_json::Value) -> Step {
    Ok(ApiResponse::new(200, body.to_string()))
}

pub fn status(code: u16, body: &str) -> Step {
    Ok(ApiResponse::new(code, body.to_string()))
}

pub fn network(msg: &str) -> Step {
    Err(TransportFailure::Network(msg.to_string()))
}

pub fn test_config() -> ClientConfig {
    ClientConfig::new("test-api-key", "4930609859535")
}

pub fn client_with(steps: Vec<Step>) -> (Dialog360Client, Arc<ScriptedTransport>) {
    client_with_config(test_config(), steps)
}

pub fn client_with_config(
    config: ClientConfig,
    steps: Vec<Step>,
) -> (Dialog360Client, Arc<ScriptedTransport>) {
    let transport = ScriptedTransport::new(steps);
    let client = Dialog360Client::with_transport(config, transport.clone()).unwrap();
    (client, transport)
}
