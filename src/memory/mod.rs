//! 记忆层：对话轮次（有界 FIFO）与会话状态（跨轮次保留）

pub mod conversation;
pub mod session;

pub use conversation::{ConversationMemory, ConversationTurn, Role, CONTEXT_TURNS, DEFAULT_MAX_TURNS};
pub use session::{SessionState, StateUpdate};
