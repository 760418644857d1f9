//! 动作提供者实现（编排核心之外，通过 ActionRegistry 注册）

pub mod builtin;
pub mod command;

pub use builtin::{HelpProvider, ListProjectsProvider};
pub use command::CommandProvider;
