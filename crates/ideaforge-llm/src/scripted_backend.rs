//! In-process backend that answers from a responder function
//!
//! Used for `--dry-run` and throughout the test suites. It records every
//! invocation so callers can assert on what was sent and how often.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

use crate::LlmError;
use crate::types::{LlmBackend, LlmInvocation, LlmResult};

type Responder = dyn Fn(&LlmInvocation) -> Result<String, LlmError> + Send + Sync;

pub struct ScriptedBackend {
    name: String,
    responder: Box<Responder>,
    delay: Option<Duration>,
    calls: Mutex<Vec<LlmInvocation>>,
}

impl ScriptedBackend {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&LlmInvocation) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        Self {
            name: "scripted".to_string(),
            responder: Box::new(responder),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always reply with the same text
    pub fn constant(reply: impl Into<String>) -> Self {
        let reply = reply.into();
        Self::new(move |_| Ok(reply.clone()))
    }

    /// Sleep before answering; used to hold a call in flight
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn call_count(&self) -> usize {
        self.recorded().len()
    }

    /// `purpose` of every call so far, in order
    pub fn purposes(&self) -> Vec<String> {
        self.recorded().iter().map(|c| c.purpose.clone()).collect()
    }

    pub fn calls(&self) -> Vec<LlmInvocation> {
        self.recorded().clone()
    }

    fn recorded(&self) -> std::sync::MutexGuard<'_, Vec<LlmInvocation>> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        self.recorded().push(inv.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let text = (self.responder)(&inv)?;
        let model = if inv.model.is_empty() {
            "scripted".to_string()
        } else {
            inv.model.clone()
        };
        Ok(LlmResult::new(text, self.name.clone(), model))
    }
}
