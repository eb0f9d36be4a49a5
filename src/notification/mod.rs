//! 通知模块
//!
//! 提供连续失败告警接口、webhook发送器和消息模板

pub mod sender;
pub mod template;
pub mod webhook;

// 重新导出主要类型
pub use sender::Notifier;
pub use template::{AlertTemplate, TemplateContext};
pub use webhook::WebhookNotifier;
