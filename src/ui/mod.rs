//! 交互层：控制台抽象（console）与会话主循环（app）

pub mod app;
pub mod console;

pub use app::{ensure_available, run_once, run_session, SessionCommand};
pub use console::{Console, ScriptedConsole, TerminalConsole, Tone};
