//! Turn execution engine: agent black box, prompt builder, and the
//! state-machine driver that ties lock manager, repository, and journal
//! together for one SBI turn at a time.

mod agent;
mod prompt;
mod turn;

pub use agent::{Agent, AgentInvocation, ScriptedAgent};
pub use prompt::{LabelPromptBuilder, PromptBuilder, PromptResult};
pub use turn::{TurnEngine, MAX_ATTEMPTS, RUN_LOCK_TTL};
