//! 命令行接口模块
//!
//! 提供CLI参数解析和命令处理功能

pub mod args;
pub mod commands;
pub mod signals;

// 重新导出主要类型
pub use args::{Args, Commands, OutputFormat};
pub use commands::{
    build_log_config, execute_command, load_config, CheckCommand, Command, RunCommand,
    ShouldRestartCommand, ValidateCommand,
};
