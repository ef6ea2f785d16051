#![allow(dead_code)]

use daokit_core::{
    InfraError, InfraResult, LineSource, LineSourceFactory, PreparedWork, Release,
    ResourceFactory, StatementStrategy,
};
use rusqlite::ffi;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};

pub fn load(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

pub fn duplicate_key_error() -> InfraError {
    InfraError::Sqlite(rusqlite::Error::SqliteFailure(
        ffi::Error::new(ffi::SQLITE_CONSTRAINT_UNIQUE),
        Some("UNIQUE constraint failed: users.id".to_string()),
    ))
}

pub fn io_error() -> InfraError {
    InfraError::Io(std::io::Error::other("broken pipe"))
}

#[derive(Debug, Default)]
pub struct Counters {
    pub acquired: AtomicUsize,
    pub resource_closes: AtomicUsize,
    pub statements: AtomicUsize,
    pub statement_closes: AtomicUsize,
    pub updates: AtomicUsize,
    pub release_order: Mutex<Vec<&'static str>>,
}

impl Counters {
    pub fn release_order(&self) -> Vec<&'static str> {
        self.release_order.lock().expect("release order lock").clone()
    }

    fn record_release(&self, what: &'static str) {
        self.release_order
            .lock()
            .expect("release order lock")
            .push(what);
    }
}

/// Resource factory that counts acquisitions and releases.
pub struct CountingFactory {
    pub counters: Arc<Counters>,
    fail_acquire: bool,
    fail_release: bool,
}

impl CountingFactory {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            fail_acquire: false,
            fail_release: false,
        }
    }

    pub fn refusing_connections() -> Self {
        Self {
            fail_acquire: true,
            ..Self::new()
        }
    }

    /// Every close on handed-out handles reports an error after releasing.
    pub fn failing_release() -> Self {
        Self {
            fail_release: true,
            ..Self::new()
        }
    }
}

impl ResourceFactory for CountingFactory {
    type Resource = CountingResource;

    fn new_resource(&self) -> InfraResult<CountingResource> {
        if self.fail_acquire {
            return Err(InfraError::Unavailable("connection refused".to_string()));
        }
        let id = self.counters.acquired.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(CountingResource {
            id,
            counters: Arc::clone(&self.counters),
            closed: false,
            fail_release: self.fail_release,
        })
    }
}

pub struct CountingResource {
    id: usize,
    counters: Arc<Counters>,
    closed: bool,
    fail_release: bool,
}

impl CountingResource {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Release for CountingResource {
    fn close(&mut self) -> InfraResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.counters.resource_closes.fetch_add(1, Ordering::SeqCst);
        self.counters.record_release("resource");
        if self.fail_release {
            return Err(InfraError::Unavailable("resource close failed".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Script {
    Succeed,
    FailPrepare(fn() -> InfraError),
    FailUpdate(fn() -> InfraError),
    PanicOnUpdate,
}

/// Strategy that follows a script and records which resources it saw.
pub struct ScriptedStrategy {
    script: Script,
    seen: Mutex<Vec<usize>>,
    rendezvous: Option<Barrier>,
}

impl ScriptedStrategy {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            seen: Mutex::new(Vec::new()),
            rendezvous: None,
        }
    }

    /// Blocks inside `make_statement` until `parties` calls hold a resource.
    pub fn rendezvous(script: Script, parties: usize) -> Self {
        Self {
            rendezvous: Some(Barrier::new(parties)),
            ..Self::new(script)
        }
    }

    pub fn seen(&self) -> Vec<usize> {
        self.seen.lock().expect("seen lock").clone()
    }
}

impl StatementStrategy<CountingResource> for ScriptedStrategy {
    fn make_statement<'r>(
        &self,
        resource: &'r CountingResource,
    ) -> InfraResult<Box<dyn PreparedWork + 'r>> {
        assert!(!resource.is_closed(), "strategy received a released resource");
        self.seen.lock().expect("seen lock").push(resource.id());
        if let Some(barrier) = &self.rendezvous {
            barrier.wait();
        }
        if let Script::FailPrepare(make_error) = self.script {
            return Err(make_error());
        }
        resource.counters.statements.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingStatement {
            resource,
            script: self.script,
            closed: false,
        }))
    }
}

pub struct CountingStatement<'r> {
    resource: &'r CountingResource,
    script: Script,
    closed: bool,
}

impl PreparedWork for CountingStatement<'_> {
    fn run_update(&mut self) -> InfraResult<usize> {
        self.resource.counters.updates.fetch_add(1, Ordering::SeqCst);
        match self.script {
            Script::FailUpdate(make_error) => Err(make_error()),
            Script::PanicOnUpdate => panic!("statement exploded"),
            Script::Succeed | Script::FailPrepare(_) => Ok(1),
        }
    }
}

impl Release for CountingStatement<'_> {
    fn close(&mut self) -> InfraResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let counters = &self.resource.counters;
        counters.statement_closes.fetch_add(1, Ordering::SeqCst);
        counters.record_release("statement");
        if self.resource.fail_release {
            return Err(InfraError::Unavailable("statement close failed".to_string()));
        }
        Ok(())
    }
}

/// Line source factory that counts reads and closes.
pub struct CountingLineFactory {
    lines: Vec<String>,
    fail_read_at: Option<usize>,
    fail_close: bool,
    pub reads: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
}

impl CountingLineFactory {
    pub fn new<I, L>(lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            fail_read_at: None,
            fail_close: false,
            reads: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The `read_number`-th (1-based) read fails with an I/O error.
    pub fn failing_read_at(mut self, read_number: usize) -> Self {
        self.fail_read_at = Some(read_number);
        self
    }

    /// Every source reports an error from its first `close`.
    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }
}

impl LineSourceFactory for CountingLineFactory {
    type Source = CountingLineSource;

    fn new_line_source(&self, _locator: &str) -> InfraResult<CountingLineSource> {
        Ok(CountingLineSource {
            lines: self.lines.clone().into_iter(),
            fail_read_at: self.fail_read_at,
            fail_close: self.fail_close,
            reads: Arc::clone(&self.reads),
            closes: Arc::clone(&self.closes),
            closed: false,
        })
    }
}

pub struct CountingLineSource {
    lines: std::vec::IntoIter<String>,
    fail_read_at: Option<usize>,
    fail_close: bool,
    reads: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    closed: bool,
}

impl LineSource for CountingLineSource {
    fn next_line(&mut self) -> InfraResult<Option<String>> {
        assert!(!self.closed, "read from a released line source");
        let read_number = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_read_at == Some(read_number) {
            return Err(io_error());
        }
        Ok(self.lines.next())
    }
}

impl Release for CountingLineSource {
    fn close(&mut self) -> InfraResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(InfraError::Unavailable("line source close failed".to_string()));
        }
        Ok(())
    }
}
