#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use weekly_review::error::GatewayError;
use weekly_review::services::bitrix_client::{check_batch_size, BatchCommands, BatchResults, BitrixTransport};

/// In-memory backend answering every call to a method with the same value.
#[derive(Default)]
pub struct ScriptedBackend {
    calls: HashMap<String, Value>,
    batch: HashMap<String, Value>,
    pub batches_seen: Mutex<Vec<BatchCommands>>,
    pub calls_seen: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_call(mut self, method: &str, result: Value) -> Self {
        self.calls.insert(method.to_string(), result);
        self
    }

    pub fn on_batch_key(mut self, key: &str, result: Value) -> Self {
        self.batch.insert(key.to_string(), result);
        self
    }

    pub fn batch_count(&self) -> usize {
        self.batches_seen.lock().unwrap().len()
    }
}

#[async_trait]
impl BitrixTransport for ScriptedBackend {
    async fn call(&self, method: &str, _params: Value) -> Result<Option<Value>, GatewayError> {
        self.calls_seen.lock().unwrap().push(method.to_string());
        Ok(self.calls.get(method).cloned())
    }

    async fn batch(&self, commands: &BatchCommands) -> Result<BatchResults, GatewayError> {
        check_batch_size(commands)?;
        self.batches_seen.lock().unwrap().push(commands.clone());
        Ok(commands
            .keys()
            .filter_map(|k| self.batch.get(k).map(|v| (k.clone(), v.clone())))
            .collect())
    }
}
