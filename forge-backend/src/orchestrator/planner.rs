//! Planning: turn one user request into agent sub-tasks.
//!
//! The planning prompt lists the registered roster and demands a strict
//! JSON plan; the parser tolerates markdown fences and resolves each
//! planned task to an agent by name first, then by role.

use crate::agents::{Agent, AgentRegistry, SubTask};
use crate::ai::strip_code_fences;
use serde::Deserialize;

/// One planned sub-task as produced by the LLM collaborator.
#[derive(Debug, Deserialize)]
pub struct PlannedTask {
    /// Agent name; preferred over `role` when both are present
    #[serde(default)]
    pub agent: Option<String>,
    /// Role tag, resolved through the registry
    #[serde(default)]
    pub role: Option<String>,
    pub objective: String,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default)]
    pub tools: Vec<String>,
    /// Image attachments (data URLs or URLs) forwarded to the agent's LLM
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Plan {
    tasks: Vec<PlannedTask>,
}

/// Build the planning prompt for a user request.
pub fn build_planning_prompt(request: &str, agents: &[Agent]) -> String {
    let mut prompt = String::new();
    prompt.push_str("You are the planner of a game-building assistant.\n\n");
    prompt.push_str(&format!("## Request\n\n{}\n\n", request));

    prompt.push_str("## Available agents\n\n");
    for agent in agents {
        prompt.push_str(&format!("- {} (role: {})\n", agent.name, agent.role));
    }

    prompt.push_str(
        r#"
## Plan format

Respond with a single JSON object containing a "tasks" array. Each task:

    {
      "agent": "scene-builder",
      "objective": "Create the main game scene",
      "constraints": ["platformer layout"],
      "depends_on": [],
      "requires_approval": false,
      "tools": ["create_scene"]
    }

Assign each task to one of the agents listed above, by name or role. Mark
"requires_approval": true for anything destructive. Do not include any text
outside the JSON object.
"#,
    );

    prompt
}

/// Parse a plan reply into dispatchable sub-tasks. Fails on malformed JSON,
/// an empty task list, or a task that resolves to no registered agent.
pub fn parse_plan(reply: &str, registry: &AgentRegistry) -> Result<Vec<SubTask>, String> {
    let stripped = strip_code_fences(reply);
    let plan: Plan =
        serde_json::from_str(stripped).map_err(|e| format!("malformed plan JSON: {}", e))?;

    if plan.tasks.is_empty() {
        return Err("plan contains no tasks".to_string());
    }

    let mut sub_tasks = Vec::with_capacity(plan.tasks.len());
    for planned in plan.tasks {
        let agent = resolve_agent(&planned, registry)?;

        let mut task = SubTask::new(agent.clone(), planned.objective)
            .with_constraints(planned.constraints)
            .with_planned_tools(planned.tools);
        task.prior_artifacts = planned.depends_on;
        task.requires_approval = planned.requires_approval;
        task.images = planned.images;
        sub_tasks.push(task);
    }

    Ok(sub_tasks)
}

fn resolve_agent<'a>(
    planned: &PlannedTask,
    registry: &'a AgentRegistry,
) -> Result<&'a Agent, String> {
    if let Some(name) = &planned.agent {
        if let Some(agent) = registry.get(name) {
            return Ok(agent);
        }
        // A "name" that is actually a role tag still routes
        if let Some(agent) = registry.find_by_role(name).first().copied() {
            return Ok(agent);
        }
        return Err(format!("plan references unknown agent '{}'", name));
    }
    if let Some(role) = &planned.role {
        if let Some(agent) = registry.find_by_role(role).first().copied() {
            return Ok(agent);
        }
        return Err(format!("no agent registered for role '{}'", role));
    }
    Err(format!(
        "planned task '{}' names neither an agent nor a role",
        planned.objective
    ))
}
