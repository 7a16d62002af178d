//! 远程数据集归档下载
//!
//! 数据目录不存在时, 从配置的 URL 下载 `.tar.zst` 归档并解包到该目录。
//! 下载在加载线程上同步执行 (阻塞客户端), 进度按 10% 步长记录日志。

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Result, StoreError};

const CHUNK_SIZE: usize = 64 * 1024;

/// 归档下载器
#[derive(Debug, Clone)]
pub struct ArchiveFetcher {
    url: String,
    timeout: Duration,
}

impl ArchiveFetcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(600),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 下载并解包到 `directory`, 返回解包出的文件数
    pub fn fetch_into(&self, directory: &Path) -> Result<usize> {
        log::info!(
            "Data directory {} missing, downloading archive from {}",
            directory.display(),
            self.url
        );

        let bytes = self.download()?;
        let unpacked = unpack_archive(&bytes, directory)?;

        log::info!(
            "Unpacked {} files into {}",
            unpacked.len(),
            directory.display()
        );
        Ok(unpacked.len())
    }

    fn download(&self) -> Result<Vec<u8>> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| StoreError::Fetch(format!("Failed to build HTTP client: {}", e)))?;

        let mut response = client
            .get(&self.url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| StoreError::Fetch(format!("Download of {} failed: {}", self.url, e)))?;

        let total = response.content_length();
        let mut progress = DownloadProgress::new(total);
        let mut body = Vec::with_capacity(total.unwrap_or(0) as usize);
        let mut chunk = vec![0u8; CHUNK_SIZE];

        loop {
            let n = response
                .read(&mut chunk)
                .map_err(|e| StoreError::Fetch(format!("Download of {} interrupted: {}", self.url, e)))?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);

            if let Some(percent) = progress.advance(body.len() as u64) {
                log::info!(
                    "Downloading dataset: {}% ({} / {} bytes)",
                    percent,
                    body.len(),
                    total.unwrap_or(0)
                );
            }
        }

        log::info!("Downloaded {} bytes from {}", body.len(), self.url);
        Ok(body)
    }
}

/// 下载进度 (按 10% 步长上报)
#[derive(Debug)]
pub struct DownloadProgress {
    total: Option<u64>,
    next_step: u64,
}

impl DownloadProgress {
    pub fn new(total: Option<u64>) -> Self {
        Self {
            total: total.filter(|t| *t > 0),
            next_step: 10,
        }
    }

    /// 记录已接收字节数, 跨过下一个 10% 刻度时返回当前百分比
    pub fn advance(&mut self, received: u64) -> Option<u64> {
        let total = self.total?;
        let percent = (received.min(total) * 100) / total;
        if percent < self.next_step {
            return None;
        }
        self.next_step = (percent / 10 + 1) * 10;
        Some(percent)
    }
}

/// 解包 `.tar.zst` 归档, 返回解包出的文件路径
pub fn unpack_archive(data: &[u8], directory: &Path) -> Result<Vec<PathBuf>> {
    let tar_bytes = zstd::decode_all(Cursor::new(data))
        .map_err(|e| StoreError::Fetch(format!("Archive is not valid zstd: {}", e)))?;

    std::fs::create_dir_all(directory)?;

    let mut archive = tar::Archive::new(Cursor::new(tar_bytes));
    let mut unpacked = Vec::new();

    let entries = archive
        .entries()
        .map_err(|e| StoreError::Fetch(format!("Archive is not a valid tar: {}", e)))?;
    for entry in entries {
        let mut entry = entry?;
        let is_file = entry.header().entry_type().is_file();
        let path = entry.path()?.into_owned();

        // unpack_in 拒绝跳出目标目录的条目
        if entry.unpack_in(directory)? && is_file {
            unpacked.push(directory.join(path));
        }
    }

    Ok(unpacked)
}
