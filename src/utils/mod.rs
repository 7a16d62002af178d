//! 工具模块

pub mod config;
pub mod jwt;
pub mod logging;

pub use config::AppConfig;
pub use jwt::{Claims, JwtManager};
