//! In-memory [`ContainerEngine`] for lifecycle tests.
//!
//! The fake container "runs" until [`FakeEngine::exit`] is called or a `stop`
//! arrives; a stop exits it with code 143.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bollard::models::ContainerCreateBody;
use futures::stream;
use tokio::sync::watch;

use super::{ContainerEngine, OutputStream};
use crate::error::EngineError;

pub(crate) const STOPPED_CODE: i64 = 143;

pub(crate) struct FakeEngine {
    calls: Mutex<Vec<&'static str>>,
    created: Mutex<Option<ContainerCreateBody>>,
    stops: AtomicUsize,
    fail_on: Option<&'static str>,
    exit: watch::Sender<Option<i64>>,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            created: Mutex::new(None),
            stops: AtomicUsize::new(0),
            fail_on: None,
            exit: watch::Sender::new(None),
        }
    }
}

impl FakeEngine {
    /// Makes the named operation fail.
    pub(crate) fn failing_on(mut self, op: &'static str) -> Self {
        self.fail_on = Some(op);
        self
    }

    pub(crate) fn failing_stop(self) -> Self {
        self.failing_on("stop")
    }

    /// Lets the container exit on its own.
    pub(crate) fn exit(&self, code: i64) {
        self.exit.send_replace(Some(code));
    }

    pub(crate) fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn created(&self) -> Option<ContainerCreateBody> {
        self.created.lock().unwrap().clone()
    }

    fn record(&self, op: &'static str) -> Result<(), EngineError> {
        self.calls.lock().unwrap().push(op);
        if self.fail_on == Some(op) {
            return Err(EngineError::call(op, "fake", "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    async fn pull(&self, _image: &str) -> Result<(), EngineError> {
        self.record("pull")
    }

    async fn create(
        &self,
        _name: Option<&str>,
        body: ContainerCreateBody,
    ) -> Result<String, EngineError> {
        self.record("create")?;
        *self.created.lock().unwrap() = Some(body);
        Ok("fake-container".to_string())
    }

    async fn attach(&self, _id: &str) -> Result<OutputStream, EngineError> {
        self.record("attach")?;
        Ok(Box::pin(stream::iter(vec![Ok(b"listening\n".to_vec())])))
    }

    async fn start(&self, _id: &str) -> Result<(), EngineError> {
        self.record("start")
    }

    async fn stop(&self, _id: &str) -> Result<(), EngineError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.record("stop")?;
        self.exit.send_if_modified(|code| {
            if code.is_none() {
                *code = Some(STOPPED_CODE);
                true
            } else {
                false
            }
        });
        Ok(())
    }

    async fn wait(&self, _id: &str) -> Result<Option<i64>, EngineError> {
        self.record("wait")?;
        let mut rx = self.exit.subscribe();
        let code = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|e| EngineError::call("wait", "fake", e))?;
        Ok(*code)
    }
}
