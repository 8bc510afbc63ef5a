pub mod dispatcher;
pub mod executor;
pub mod registry;
pub mod types;

pub use dispatcher::Dispatcher;
pub use executor::{AgentExecutor, Directive, parse_directive};
pub use registry::AgentRegistry;
pub use types::{Agent, SubTask, SubTaskOutcome, SubTaskResult, ToolRequest};
