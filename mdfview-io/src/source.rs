use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid drawing identifier {0:?}")]
    InvalidId(String),
    #[error("drawing {id:?} not found")]
    NotFound { id: String },
    #[error("failed to read drawing {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("transport failure for {url}: {message}")]
    Transport { url: String, message: String },
    #[error("server answered {status} for {url}")]
    Status { url: String, status: u16 },
}

impl SourceError {
    /// 是否值得用户重新发起加载。
    pub fn is_retryable(&self) -> bool {
        match self {
            SourceError::InvalidId(_) | SourceError::NotFound { .. } => false,
            SourceError::Read { .. } | SourceError::Transport { .. } => true,
            SourceError::Status { status, .. } => *status >= 500 || *status == 429,
        }
    }
}

/// 按图纸标识获取原始 DXF 字节，不关心具体的地址规则。
pub trait DrawingSource {
    fn fetch(&self, id: &str) -> Result<Vec<u8>, SourceError>;

    /// 用于日志的来源描述。
    fn describe(&self) -> String;
}

/// 标识只能是单个文件名片段。
fn validate_id(id: &str) -> Result<(), SourceError> {
    let trimmed = id.trim();
    if trimmed.is_empty()
        || trimmed != id
        || id.contains(['/', '\\'])
        || id == "."
        || id == ".."
    {
        return Err(SourceError::InvalidId(id.to_string()));
    }
    Ok(())
}

/// 从本地目录读取 `<root>/<id>`，标识没有扩展名时补全 `.dxf`。
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, id: &str) -> Result<PathBuf, SourceError> {
        validate_id(id)?;
        let file_name = if Path::new(id).extension().is_some() {
            id.to_string()
        } else {
            format!("{id}.dxf")
        };
        Ok(self.root.join(file_name))
    }
}

impl DrawingSource for DirectorySource {
    fn fetch(&self, id: &str) -> Result<Vec<u8>, SourceError> {
        let path = self.path_for(id)?;
        debug!(path = %path.display(), "读取本地图纸");
        fs::read(&path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                SourceError::NotFound { id: id.to_string() }
            } else {
                SourceError::Read { path, source }
            }
        })
    }

    fn describe(&self) -> String {
        format!("目录 {}", self.root.display())
    }
}

/// 通过 HTTP `GET <base_url>/<id>` 获取图纸字节。
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpSource {
    base_url: String,
    client: reqwest::blocking::Client,
}

#[cfg(feature = "http")]
impl HttpSource {
    pub fn new(base_url: impl Into<String>, timeout: std::time::Duration) -> Result<Self, SourceError> {
        let base_url = base_url.into();
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| SourceError::Transport {
                url: base_url.clone(),
                message: err.to_string(),
            })?;
        Ok(Self { base_url, client })
    }

    pub fn url_for(&self, id: &str) -> Result<String, SourceError> {
        validate_id(id)?;
        Ok(format!("{}/{}", self.base_url.trim_end_matches('/'), id))
    }
}

#[cfg(feature = "http")]
impl DrawingSource for HttpSource {
    fn fetch(&self, id: &str) -> Result<Vec<u8>, SourceError> {
        let url = self.url_for(id)?;
        debug!(%url, "请求远程图纸");
        let transport = |err: reqwest::Error| SourceError::Transport {
            url: url.clone(),
            message: err.to_string(),
        };
        let response = self.client.get(&url).send().map_err(transport)?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound { id: id.to_string() });
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                url,
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().map_err(transport)?;
        Ok(bytes.to_vec())
    }

    fn describe(&self) -> String {
        format!("HTTP {}", self.base_url)
    }
}
