//! Test doubles for the storage and device seams

use crate::coordinate::Coordinate;
use crate::device::{Position, PositionErrorCode, PositionRequest, PositionSource};
use crate::storage::{EngineConnector, KeyValueStore, LocationEngine, SqliteEngine};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Connector over an in-memory SQLite engine that counts connects.
pub struct CountingConnector {
    attempts: AtomicUsize,
    connections: AtomicUsize,
    fail_first: usize,
    delay: Duration,
    failing_engine: bool,
    failing_writes: Arc<AtomicBool>,
    engine: Mutex<Option<Arc<CountingEngine>>>,
}

impl CountingConnector {
    pub fn in_memory() -> Self {
        Self {
            attempts: AtomicUsize::new(0),
            connections: AtomicUsize::new(0),
            fail_first: 0,
            delay: Duration::ZERO,
            failing_engine: false,
            failing_writes: Arc::new(AtomicBool::new(false)),
            engine: Mutex::new(None),
        }
    }

    /// Connects fine, but every engine read and write errors.
    pub fn failing_engine() -> Self {
        Self {
            failing_engine: true,
            ..Self::in_memory()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_first(mut self, n: usize) -> Self {
        self.fail_first = n;
        self
    }

    /// Toggle write failures on current and future engines; reads keep working.
    pub fn fail_writes(&self, on: bool) {
        self.failing_writes.store(on, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Number of successful engine writes across all connections.
    pub fn writes(&self) -> usize {
        self.engine
            .lock()
            .unwrap()
            .as_ref()
            .map(|engine| engine.writes.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Every coordinate written, in order.
    pub fn written(&self) -> Vec<Coordinate> {
        self.engine
            .lock()
            .unwrap()
            .as_ref()
            .map(|engine| engine.written.lock().unwrap().clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EngineConnector for CountingConnector {
    async fn connect(&self) -> Result<Arc<dyn LocationEngine>> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if attempt < self.fail_first {
            return Err(Error::StorageUnavailable("scripted open failure".to_string()));
        }

        self.connections.fetch_add(1, Ordering::SeqCst);
        let engine = Arc::new(CountingEngine {
            inner: SqliteEngine::open_in_memory()?,
            failing: self.failing_engine,
            failing_writes: Arc::clone(&self.failing_writes),
            writes: AtomicUsize::new(0),
            written: Mutex::new(Vec::new()),
        });
        *self.engine.lock().unwrap() = Some(engine.clone());
        Ok(engine as Arc<dyn LocationEngine>)
    }
}

pub struct CountingEngine {
    inner: SqliteEngine,
    failing: bool,
    failing_writes: Arc<AtomicBool>,
    writes: AtomicUsize,
    written: Mutex<Vec<Coordinate>>,
}

#[async_trait]
impl LocationEngine for CountingEngine {
    async fn get(&self, key: &str) -> Result<Option<Coordinate>> {
        if self.failing {
            return Err(Error::StorageUnavailable("scripted read failure".to_string()));
        }
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, coordinate: Coordinate) -> Result<()> {
        if self.failing || self.failing_writes.load(Ordering::SeqCst) {
            return Err(Error::StorageUnavailable("scripted write failure".to_string()));
        }
        self.inner.put(key, coordinate).await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.written.lock().unwrap().push(coordinate);
        Ok(())
    }
}

/// Primary engine that is never available.
pub struct FailingConnector;

#[async_trait]
impl EngineConnector for FailingConnector {
    async fn connect(&self) -> Result<Arc<dyn LocationEngine>> {
        Err(Error::StorageUnavailable("engine absent".to_string()))
    }
}

/// Fallback store whose every call fails.
pub struct FailingKeyValueStore;

#[async_trait]
impl KeyValueStore for FailingKeyValueStore {
    async fn get_item(&self, _key: &str) -> Result<Option<String>> {
        Err(std::io::Error::other("fallback read failure").into())
    }

    async fn set_item(&self, _key: &str, _value: &str) -> Result<()> {
        Err(std::io::Error::other("fallback write failure").into())
    }
}

/// What a [`ScriptedSource`] does when asked for a fix.
#[derive(Debug, Clone, Copy)]
pub enum Script {
    Fix(Coordinate),
    Fail(PositionErrorCode),
    /// Never completes.
    Hang,
    Panic,
}

/// Position source that follows a script and records each request.
pub struct ScriptedSource {
    supported: bool,
    script: Script,
    delay: Duration,
    requests: Mutex<Vec<PositionRequest>>,
}

impl ScriptedSource {
    pub fn new(script: Script) -> Self {
        Self {
            supported: true,
            script,
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new(Script::Hang)
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<PositionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PositionSource for ScriptedSource {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn current_position(
        &self,
        request: PositionRequest,
    ) -> std::result::Result<Position, PositionErrorCode> {
        self.requests.lock().unwrap().push(request);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.script {
            Script::Fix(coordinate) => Ok(Position::new(coordinate, 5.0)),
            Script::Fail(code) => Err(code),
            Script::Hang => std::future::pending().await,
            Script::Panic => panic!("scripted position source panic"),
        }
    }
}

/// Poll `check` until it holds or `limit` elapses.
pub async fn eventually<F, Fut>(limit: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
