//! Agent registry: populated once at system construction, read-only during
//! request processing.

use crate::agents::types::Agent;
use crate::error::RegistryError;
use std::collections::HashMap;

pub struct AgentRegistry {
    /// Registration order is the iteration order
    agents: Vec<Agent>,
    index: HashMap<String, usize>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self { agents: Vec::new(), index: HashMap::new() }
    }

    /// The default Forge roster.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for agent in [
            Agent::new("scene-builder", "scene-builder"),
            Agent::new("script-writer", "script-writer"),
            Agent::new("asset-generator", "asset-generator"),
            Agent::new("playtester", "playtester"),
        ] {
            registry
                .register(agent)
                .expect("default roster has distinct names");
        }
        registry
    }

    pub fn register(&mut self, agent: Agent) -> Result<(), RegistryError> {
        if self.index.contains_key(&agent.name) {
            return Err(RegistryError::DuplicateAgent(agent.name));
        }
        log::debug!("[AGENTS] Registered '{}' ({})", agent.name, agent.role);
        self.index.insert(agent.name.clone(), self.agents.len());
        self.agents.push(agent);
        Ok(())
    }

    /// All agents in registration order. Stable across calls.
    pub fn all(&self) -> &[Agent] {
        &self.agents
    }

    pub fn get(&self, name: &str) -> Option<&Agent> {
        self.index.get(name).map(|&i| &self.agents[i])
    }

    /// Zero or more agents carrying the given role tag, in registration
    /// order. Used by planning to pick candidates for a sub-task.
    pub fn find_by_role(&self, role: &str) -> Vec<&Agent> {
        self.agents.iter().filter(|a| a.role == role).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
