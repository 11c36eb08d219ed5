use std::path::PathBuf;

use mdfview_engine::errors::EngineError;
use mdfview_io::SourceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("未配置图纸来源，请设置 source.directory 或 source.base_url")]
    NoSourceConfigured,
    #[error("HTTP 来源未启用，请使用 `--features http` 编译")]
    HttpFeatureDisabled,
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("加载图纸 {id} 失败: {message}")]
    LoadFailed {
        id: String,
        message: String,
        retryable: bool,
    },
    #[error("视图命令执行失败: {0}")]
    Command(String),
    #[error("写入 {path:?} 失败: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("序列化检查报告失败: {0}")]
    Serialize(#[from] serde_json::Error),
}
