use mdfview_config::{AppConfig, SourceConfig};
use mdfview_engine::session::{ViewState, ViewerSession, ViewerSettings};
use mdfview_engine::view::ZoomLimits;
use mdfview_io::{DirectorySource, DrawingSource};
use tracing::{info, warn};

use crate::errors::FrontendError;

/// 根据配置选择图纸来源：本地目录优先，其次为 HTTP 后端。
pub fn build_source(config: &SourceConfig) -> Result<Box<dyn DrawingSource>, FrontendError> {
    if let Some(directory) = &config.directory {
        return Ok(Box::new(DirectorySource::new(directory.clone())));
    }
    match &config.base_url {
        Some(base_url) => http_source(base_url, config.timeout_secs),
        None => Err(FrontendError::NoSourceConfigured),
    }
}

#[cfg(feature = "http")]
fn http_source(base_url: &str, timeout_secs: u64) -> Result<Box<dyn DrawingSource>, FrontendError> {
    let source = mdfview_io::HttpSource::new(
        base_url,
        std::time::Duration::from_secs(timeout_secs),
    )?;
    Ok(Box::new(source))
}

#[cfg(not(feature = "http"))]
fn http_source(
    _base_url: &str,
    _timeout_secs: u64,
) -> Result<Box<dyn DrawingSource>, FrontendError> {
    Err(FrontendError::HttpFeatureDisabled)
}

pub fn viewer_settings(config: &AppConfig) -> ViewerSettings {
    let viewer = &config.viewer;
    ViewerSettings {
        width: viewer.width,
        height: viewer.height,
        margin_factor: viewer.margin_factor,
        zoom: ZoomLimits {
            min: viewer.min_zoom,
            max: viewer.max_zoom,
            step: viewer.zoom_step,
        },
        min_waste_area: config.analysis.min_waste_area,
    }
}

/// 加载一张图纸。获取或解码失败时会话进入失败状态，仍然返回会话以便展示提示。
pub fn load_session(
    config: &AppConfig,
    settings: ViewerSettings,
    id: &str,
) -> Result<ViewerSession, FrontendError> {
    let source = build_source(&config.source)?;
    let mut session = ViewerSession::new(settings);
    session.load_from(source.as_ref(), id);
    match session.state() {
        ViewState::Ready => info!(id, source = %source.describe(), "图纸加载成功"),
        ViewState::Empty => warn!(id, "图纸中没有可显示的几何"),
        ViewState::Failed { message, retryable } => {
            warn!(id, %message, retryable, "图纸加载失败")
        }
        _ => {}
    }
    Ok(session)
}

/// 把失败状态转换为错误，其余状态视为成功。
pub fn ensure_loaded(session: &ViewerSession, id: &str) -> Result<(), FrontendError> {
    match session.state() {
        ViewState::Failed { message, retryable } => Err(FrontendError::LoadFailed {
            id: id.to_string(),
            message: message.clone(),
            retryable: *retryable,
        }),
        _ => Ok(()),
    }
}
