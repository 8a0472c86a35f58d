use std::collections::HashMap;
use std::sync::Mutex;

use super::{GateError, GateOptions, MutexGate};

/// Source of named gates.
///
/// Repeated calls with the same name must return handles to the same gate;
/// different names never interact.
pub trait GateManager: Send + Sync {
    /// Get (or create) the gate for the given name.
    fn get_gate(&self, name: &str) -> Result<MutexGate, GateError>;
}

/// In-memory gate manager backed by a `HashMap<String, MutexGate>`.
///
/// Gates are created lazily with the manager's default options, or up front
/// with [`register`](InMemoryGateManager::register) when a resource needs a
/// different timeout.
pub struct InMemoryGateManager {
    defaults: GateOptions,
    gates: Mutex<HashMap<String, MutexGate>>,
}

impl InMemoryGateManager {
    pub fn new() -> Self {
        Self::with_defaults(GateOptions::default())
    }

    pub fn with_defaults(defaults: GateOptions) -> Self {
        InMemoryGateManager {
            defaults,
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Create a gate with explicit options. Fails if the name is taken.
    pub fn register(&self, name: &str, options: GateOptions) -> Result<MutexGate, GateError> {
        let mut gates = self.gates()?;
        if gates.contains_key(name) {
            return Err(GateError::InvalidOptions(format!(
                "gate '{}' already registered",
                name
            )));
        }
        let gate = MutexGate::new(name, options)?;
        gates.insert(name.to_string(), gate.clone());
        Ok(gate)
    }

    pub fn names(&self) -> Result<Vec<String>, GateError> {
        let mut names: Vec<String> = self.gates()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn gates(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, MutexGate>>, GateError> {
        self.gates
            .lock()
            .map_err(|_| GateError::Poisoned("gate manager map poisoned".into()))
    }
}

impl Default for InMemoryGateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl GateManager for InMemoryGateManager {
    fn get_gate(&self, name: &str) -> Result<MutexGate, GateError> {
        let mut gates = self.gates()?;
        if let Some(gate) = gates.get(name) {
            return Ok(gate.clone());
        }
        let gate = MutexGate::new(name, self.defaults)?;
        gates.insert(name.to_string(), gate.clone());
        Ok(gate)
    }
}
