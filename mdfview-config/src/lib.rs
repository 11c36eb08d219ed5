use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub viewer: ViewerConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl AppConfig {
    /// 从显式路径加载配置，并校验取值范围。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 自动发现配置文件：优先读取环境变量 `MDFVIEW_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os("MDFVIEW_CONFIG") {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let viewer = &self.viewer;
        if viewer.width == 0 || viewer.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "视口尺寸必须为正数（当前 {}x{}）",
                viewer.width, viewer.height
            )));
        }
        if !(viewer.margin_factor > 0.0 && viewer.margin_factor <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "margin_factor 必须位于 (0, 1]（当前 {}）",
                viewer.margin_factor
            )));
        }
        if !(viewer.zoom_step > 1.0 && viewer.zoom_step.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "zoom_step 必须大于 1（当前 {}）",
                viewer.zoom_step
            )));
        }
        if !(viewer.min_zoom > 0.0 && viewer.min_zoom <= 1.0 && viewer.max_zoom >= 1.0)
            || !viewer.max_zoom.is_finite()
        {
            return Err(ConfigError::Invalid(format!(
                "缩放范围 [{}, {}] 必须包含 1.0",
                viewer.min_zoom, viewer.max_zoom
            )));
        }
        let min_waste_area = self.analysis.min_waste_area;
        if !(min_waste_area >= 0.0 && min_waste_area.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "min_waste_area 必须为非负数（当前 {min_waste_area}）"
            )));
        }
        Ok(())
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 视口与交互参数。
#[derive(Debug, Clone, Deserialize)]
pub struct ViewerConfig {
    #[serde(default = "ViewerConfig::default_width")]
    pub width: u32,
    #[serde(default = "ViewerConfig::default_height")]
    pub height: u32,
    #[serde(default = "ViewerConfig::default_margin_factor")]
    pub margin_factor: f64,
    #[serde(default = "ViewerConfig::default_zoom_step")]
    pub zoom_step: f64,
    #[serde(default = "ViewerConfig::default_min_zoom")]
    pub min_zoom: f64,
    #[serde(default = "ViewerConfig::default_max_zoom")]
    pub max_zoom: f64,
}

impl ViewerConfig {
    fn default_width() -> u32 {
        800
    }

    fn default_height() -> u32 {
        600
    }

    fn default_margin_factor() -> f64 {
        0.8
    }

    fn default_zoom_step() -> f64 {
        1.1
    }

    fn default_min_zoom() -> f64 {
        0.1
    }

    fn default_max_zoom() -> f64 {
        5.0
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            width: Self::default_width(),
            height: Self::default_height(),
            margin_factor: Self::default_margin_factor(),
            zoom_step: Self::default_zoom_step(),
            min_zoom: Self::default_min_zoom(),
            max_zoom: Self::default_max_zoom(),
        }
    }
}

/// 图纸来源：本地目录或后端地址，二者都可缺省。
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "SourceConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl SourceConfig {
    fn default_timeout_secs() -> u64 {
        30
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            directory: None,
            base_url: None,
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "OutputConfig::default_directory")]
    pub directory: PathBuf,
}

impl OutputConfig {
    fn default_directory() -> PathBuf {
        PathBuf::from(".")
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: Self::default_directory(),
        }
    }
}

/// 余料分析参数。
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// 余料面积超过该值才视为可再利用。
    #[serde(default = "AnalysisConfig::default_min_waste_area")]
    pub min_waste_area: f64,
}

impl AnalysisConfig {
    fn default_min_waste_area() -> f64 {
        100.0
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_waste_area: Self::default_min_waste_area(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("配置无效: {0}")]
    Invalid(String),
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}
