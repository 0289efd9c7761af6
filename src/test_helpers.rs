use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::GatewayError;
use crate::services::bitrix_client::{check_batch_size, BatchCommands, BatchResults, BitrixTransport};

/// Scripted backend: canned pages per method, canned batch sub-results per key.
#[derive(Default)]
pub struct FakeBitrix {
    pages: Mutex<HashMap<String, VecDeque<Value>>>,
    batch_results: HashMap<String, Value>,
    calls: Mutex<Vec<(String, Value)>>,
    batches: Mutex<Vec<BatchCommands>>,
}

impl FakeBitrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one response for `method`; an exhausted queue answers `None`.
    pub fn with_call_page(self, method: &str, page: Value) -> Self {
        self.pages
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(page);
        self
    }

    pub fn with_batch_result(mut self, key: &str, value: Value) -> Self {
        self.batch_results.insert(key.to_string(), value);
        self
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn batches(&self) -> Vec<BatchCommands> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl BitrixTransport for FakeBitrix {
    async fn call(&self, method: &str, params: Value) -> Result<Option<Value>, GatewayError> {
        self.calls.lock().unwrap().push((method.to_string(), params));
        let page = self
            .pages
            .lock()
            .unwrap()
            .get_mut(method)
            .and_then(|queue| queue.pop_front());
        Ok(page)
    }

    async fn batch(&self, commands: &BatchCommands) -> Result<BatchResults, GatewayError> {
        check_batch_size(commands)?;
        self.batches.lock().unwrap().push(commands.clone());
        Ok(commands
            .keys()
            .filter_map(|key| self.batch_results.get(key).map(|v| (key.clone(), v.clone())))
            .collect())
    }
}
