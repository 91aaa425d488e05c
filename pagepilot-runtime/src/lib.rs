//! PagePilot runtime
//!
//! Drives a model through a tool-calling conversation against one shared
//! browser page: pruning, retrying, dispatching and recording every turn.

pub mod adapters;
pub mod anthropic;
pub mod config;
pub mod conversation;
pub mod conversation_loop;
pub mod interfaces;
pub mod metrics;
pub mod model_client;
pub mod prompt;
pub mod pruner;
pub mod tool_output;
pub mod types;

pub use anthropic::{AnthropicBackend, AnthropicConfig};
pub use config::{load_config, PagePilotConfig};
pub use conversation::Conversation;
pub use conversation_loop::{ConversationLoop, LoopOutcome, RenderFn};
pub use interfaces::{
    ModelBackend, ModelRequest, ModelTurn, ResourceHandle, RuntimeError, ToolExecutor,
};
pub use model_client::{ModelClient, RetryPolicy};
pub use prompt::{system_prompt, system_prompt_for_today};
pub use pruner::ContextPruner;
pub use tool_output::process_tool_output;
pub use types::{ContentBlock, ResultContent, Role, Transcript, Turn};
