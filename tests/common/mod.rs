//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use apireg::model::{ApiContract, Endpoint, NormalizedOperation};
use apireg::storage::SqliteStorage;
use apireg::sync::{FixedClock, ImportCoordinator, SpecSource};
use apireg::{Error, Result};
use tempfile::TempDir;

/// What the stub source answers for one URL.
#[derive(Debug, Clone)]
pub enum Response {
    Operations(Vec<NormalizedOperation>),
    FetchError(String),
    ParseError(String),
    /// Never resolves; only a timeout gets the caller out.
    Hang,
}

/// In-memory `SpecSource` keyed by URL.
#[derive(Debug, Clone, Default)]
pub struct StubSource {
    responses: Arc<Mutex<HashMap<String, Response>>>,
    calls: Arc<AtomicUsize>,
}

impl StubSource {
    pub fn respond(&self, url: &str, response: Response) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    pub fn serve(&self, url: &str, operations: Vec<NormalizedOperation>) {
        self.respond(url, Response::Operations(operations));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SpecSource for StubSource {
    async fn fetch(&self, url: &str) -> Result<Vec<NormalizedOperation>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = self.responses.lock().unwrap().get(url).cloned();

        match response {
            Some(Response::Operations(ops)) => Ok(ops),
            Some(Response::FetchError(message)) => Err(Error::Fetch {
                url: url.to_string(),
                message,
            }),
            Some(Response::ParseError(message)) => Err(Error::Parse(message)),
            Some(Response::Hang) => std::future::pending().await,
            None => Err(Error::Fetch {
                url: url.to_string(),
                message: "server responded with 404 Not Found".to_string(),
            }),
        }
    }
}

pub type StubCoordinator = ImportCoordinator<StubSource, Arc<FixedClock>>;

/// A temp database with a coordinator over a stub source and fixed clock.
pub struct Harness {
    _dir: TempDir,
    pub db: PathBuf,
    pub source: StubSource,
    pub clock: Arc<FixedClock>,
    pub coordinator: StubCoordinator,
}

impl Harness {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("registry.db");
        SqliteStorage::open(&db).unwrap();

        let source = StubSource::default();
        let clock = Arc::new(FixedClock::new(4_000_000_000_000));
        let coordinator = ImportCoordinator::new(&db, source.clone())
            .with_clock(Arc::clone(&clock))
            .with_actor("tester");

        Self {
            _dir: dir,
            db,
            source,
            clock,
            coordinator,
        }
    }

    pub fn storage(&self) -> SqliteStorage {
        SqliteStorage::open(&self.db).unwrap()
    }

    /// Register a contract, optionally with an OpenAPI URL.
    pub fn add_contract(&self, name: &str, spec_url: Option<&str>) -> String {
        let mut contract = ApiContract::new(
            name.to_string(),
            format!("https://{}.internal", name.to_lowercase()),
            "1.0.0".to_string(),
            "platform".to_string(),
        );
        contract.open_api_url = spec_url.map(String::from);
        self.storage().create_contract(&contract, "tester").unwrap();
        contract.id
    }

    /// Store endpoints directly, bypassing the importer.
    pub fn seed(&self, contract_id: &str, operations: &[NormalizedOperation]) {
        let mut storage = self.storage();
        for op in operations {
            storage.add_endpoint(contract_id, op, "tester").unwrap();
        }
    }

    pub fn endpoints(&self, contract_id: &str) -> Vec<Endpoint> {
        self.storage().list_endpoints(contract_id).unwrap()
    }

    /// Endpoints as (method, path, description, deprecated) for easy comparison.
    pub fn endpoint_rows(&self, contract_id: &str) -> Vec<(String, String, Option<String>, bool)> {
        self.endpoints(contract_id)
            .into_iter()
            .map(|e| (e.method.to_string(), e.path, e.description, e.deprecated))
            .collect()
    }
}
