//! 日志初始化
//!
//! 基于 env_logger, 默认级别来自配置, 可被 `RUST_LOG` 覆盖。
//! 配置了日志文件时, 每条记录同时写入 stderr 和文件。

use env_logger::{Builder, Env, Target};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use super::config::LoggingConfig;

/// 同时写 stderr 与日志文件
pub struct TeeWriter {
    file: Option<File>,
}

impl TeeWriter {
    pub fn new(file: Option<File>) -> Self {
        Self { file }
    }

    /// 以追加模式打开日志文件 (自动创建父目录)
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(Some(file)))
    }
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        if let Some(file) = self.file.as_mut() {
            file.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

/// 初始化全局 logger (只能调用一次)
pub fn init_logging(config: &LoggingConfig) -> Result<(), String> {
    let writer = match config.file.as_deref().filter(|p| !p.as_os_str().is_empty()) {
        Some(path) => TeeWriter::open(path)
            .map_err(|e| format!("Failed to open log file {}: {}", path.display(), e))?,
        None => TeeWriter::new(None),
    };

    Builder::from_env(Env::default().default_filter_or(config.level.as_str()))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {} - {}",
                buf.timestamp_millis(),
                record.target(),
                record.level(),
                record.args()
            )
        })
        .target(Target::Pipe(Box::new(writer)))
        .try_init()
        .map_err(|e| format!("Failed to initialise logger: {}", e))
}
