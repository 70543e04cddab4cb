//! # CARLA Control
//!
//! 交互式 CARLA 客户端。
//!
//! 提供：
//! - 菜单解析与会话循环
//! - 退出时统一清理已生成的 actor
//! - load-xodr / list-blueprints / catalog 工具命令

pub mod cli;
pub mod commands;
pub mod error;
pub mod menu;
pub mod session;

pub use error::{Result, SessionError};
pub use menu::{MenuCommand, VehicleChoice};
pub use session::{Session, SessionOptions, SessionReport};
