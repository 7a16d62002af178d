//! 对外服务层

pub mod http;
