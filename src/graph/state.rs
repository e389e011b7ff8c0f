// Graph State
// Variable map threaded through a prompt chain

use std::collections::HashMap;

/// Variables of one chain run plus bookkeeping for the runtime.
///
/// Every node output is written with [`ChainState::set_output`], which also
/// marks it as the current result; the answer of a run is whatever output
/// was written last.
#[derive(Debug, Clone, Default)]
pub struct ChainState {
    variables: HashMap<String, String>,
    trace: Vec<String>,
    result_key: Option<String>,
}

impl ChainState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    pub fn set_output(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.variables.insert(key.clone(), value.into());
        self.result_key = Some(key);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(String::as_str)
    }

    pub fn variables(&self) -> &HashMap<String, String> {
        &self.variables
    }

    pub fn result_key(&self) -> Option<&str> {
        self.result_key.as_deref()
    }

    pub fn result(&self) -> Option<&str> {
        self.result_key.as_deref().and_then(|key| self.get(key))
    }

    pub fn trace(&self) -> &[String] {
        &self.trace
    }

    pub(crate) fn record_step(&mut self, node_id: &str) {
        self.trace.push(node_id.to_string());
    }
}
