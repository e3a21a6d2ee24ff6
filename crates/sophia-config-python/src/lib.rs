//! Python bindings for the Sophia AI configuration engine via PyO3

use std::path::PathBuf;
use std::sync::Arc;

use pyo3::exceptions::{PyKeyError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use sophia_config_core::{
    ConfigurationEntry, Engine as CoreEngine, EngineError, EngineSettings, PersistMode,
    RepairAction as CoreRepairAction, SCHEMA,
};

// ============================================================================
// Value types
// ============================================================================

#[pyclass]
#[derive(Clone)]
pub struct ConfigEntry {
    #[pyo3(get)]
    pub key: String,
    #[pyo3(get)]
    pub value: String,
    #[pyo3(get)]
    pub source: String,
    #[pyo3(get)]
    pub source_detail: String,
    #[pyo3(get)]
    pub required: bool,
    #[pyo3(get)]
    pub sensitive: bool,
    masked: String,
}

#[pymethods]
impl ConfigEntry {
    /// Value safe for display (masked when sensitive)
    #[getter]
    pub fn display_value(&self) -> String {
        self.masked.clone()
    }

    fn __repr__(&self) -> String {
        format!(
            "ConfigEntry(key='{}', value='{}', source='{}')",
            self.key, self.masked, self.source
        )
    }
}

impl From<ConfigurationEntry> for ConfigEntry {
    fn from(entry: ConfigurationEntry) -> Self {
        Self {
            masked: entry.display_value(),
            source: entry.source.as_str().to_string(),
            key: entry.key,
            value: entry.value,
            source_detail: entry.source_detail,
            required: entry.required,
            sensitive: entry.sensitive,
        }
    }
}

#[pyclass]
#[derive(Clone)]
pub struct RepairAction {
    #[pyo3(get)]
    pub name: String,
    #[pyo3(get)]
    pub attempted: bool,
    #[pyo3(get)]
    pub succeeded: bool,
    #[pyo3(get)]
    pub detail: String,
}

#[pymethods]
impl RepairAction {
    fn __repr__(&self) -> String {
        format!(
            "RepairAction(name='{}', attempted={}, succeeded={})",
            self.name, self.attempted, self.succeeded
        )
    }
}

impl From<CoreRepairAction> for RepairAction {
    fn from(action: CoreRepairAction) -> Self {
        Self {
            name: action.name,
            attempted: action.attempted,
            succeeded: action.succeeded,
            detail: action.detail,
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

fn runtime_err(e: impl std::fmt::Display) -> PyErr {
    PyRuntimeError::new_err(e.to_string())
}

/// Configuration engine
///
/// ```python
/// import sophia_config
/// engine = sophia_config.Engine(project_root=".")
/// report = engine.startup()   # JSON string
/// key = engine.require("openai_api_key")
/// ```
#[pyclass]
pub struct Engine {
    inner: Arc<CoreEngine>,
    runtime: tokio::runtime::Runtime,
}

#[pymethods]
impl Engine {
    #[new]
    #[pyo3(signature = (project_root=None, settings_path=None, keychain=None))]
    pub fn new(
        project_root: Option<PathBuf>,
        settings_path: Option<PathBuf>,
        keychain: Option<String>,
    ) -> PyResult<Self> {
        let mut settings = match settings_path {
            Some(path) => EngineSettings::load_from(path),
            None => EngineSettings::load(),
        }
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
        if let Some(root) = project_root {
            settings = settings.with_project_root(root);
        }
        if let Some(service) = keychain {
            settings = settings.with_keychain(service);
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .map_err(runtime_err)?;

        Ok(Self {
            inner: Arc::new(CoreEngine::new(settings)),
            runtime,
        })
    }

    /// Detect, resolve, validate, repair when degraded; returns the report as JSON
    pub fn startup(&self, py: Python<'_>) -> PyResult<String> {
        let report = py.allow_threads(|| self.runtime.block_on(self.inner.startup()));
        report.to_json().map_err(runtime_err)
    }

    /// Detected environment short name (`prod`, `staging`, `dev`)
    pub fn detect(&self, py: Python<'_>) -> String {
        let detected = py.allow_threads(|| self.runtime.block_on(self.inner.detect()));
        detected.environment.as_str().to_string()
    }

    /// Resolve all keys; returns how many resolved
    pub fn resolve(&self, py: Python<'_>) -> usize {
        py.allow_threads(|| self.runtime.block_on(self.inner.resolve())).len()
    }

    /// Run the health checks; returns whether all passed
    pub fn validate(&self, py: Python<'_>) -> bool {
        py.allow_threads(|| self.runtime.block_on(self.inner.validate()))
            .is_healthy()
    }

    pub fn repair(&self, py: Python<'_>) -> Vec<RepairAction> {
        py.allow_threads(|| self.runtime.block_on(self.inner.repair()))
            .into_iter()
            .map(RepairAction::from)
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    /// Like `get`, but raises `KeyError` when the key has no value
    pub fn require(&self, key: &str) -> PyResult<String> {
        self.inner.require(key).map_err(|e| match e {
            EngineError::MissingRequiredKey(key) => PyKeyError::new_err(key),
            other => runtime_err(other),
        })
    }

    pub fn entry(&self, key: &str) -> Option<ConfigEntry> {
        self.inner.entry(key).map(ConfigEntry::from)
    }

    pub fn entries(&self) -> Vec<ConfigEntry> {
        self.inner.entries().into_values().map(ConfigEntry::from).collect()
    }

    /// Current report as JSON
    pub fn report(&self) -> PyResult<String> {
        self.inner.report().to_json().map_err(runtime_err)
    }

    /// `healthy`, `degraded` or `critical`
    pub fn health_level(&self) -> String {
        self.inner.report().health_level.as_str().to_string()
    }

    /// Write the detected identity to shell profiles; returns lines written
    #[pyo3(signature = (replace=false))]
    pub fn persist(&self, py: Python<'_>, replace: bool) -> usize {
        if self.inner.detected().is_none() {
            py.allow_threads(|| self.runtime.block_on(self.inner.detect()));
        }
        let mode = if replace {
            PersistMode::ReplaceByKey
        } else {
            self.inner.settings().persist_mode
        };
        self.inner.persist_with_mode(mode).lines_written
    }

    fn __repr__(&self) -> String {
        match self.inner.detected() {
            Some(detected) => format!("Engine(environment='{}')", detected.environment),
            None => "Engine(environment=None)".to_string(),
        }
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Keys the engine resolves, in schema order
#[pyfunction]
fn schema_keys() -> Vec<String> {
    SCHEMA.iter().map(|e| e.key.to_string()).collect()
}

/// Keys that must resolve for a non-critical report
#[pyfunction]
fn required_keys() -> Vec<String> {
    sophia_config_core::schema::required_keys()
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Module Definition
// ============================================================================

#[pymodule]
fn sophia_config(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Engine>()?;
    m.add_class::<ConfigEntry>()?;
    m.add_class::<RepairAction>()?;

    m.add_function(wrap_pyfunction!(schema_keys, m)?)?;
    m.add_function(wrap_pyfunction!(required_keys, m)?)?;

    Ok(())
}
