use std::path::{Path, PathBuf};

use mdfview_core::drawing::{DEFAULT_MIN_WASTE_AREA, DrawingStatistics};
use mdfview_io::{
    CollectingDiagnostics, Diagnostic, DiagnosticsSink, DrawingSource, DxfExtractor, Extraction,
    SourceError, TracingDiagnostics, save_download,
};
use tracing::{debug, info, warn};

use crate::errors::EngineError;
use crate::projector::{SvgDocument, SvgProjector, placeholder_markup};
use crate::view::{DisplayTransform, ZoomLimits};

pub const NO_GEOMETRY_MESSAGE: &str = "no displayable geometry";

/// 查看器的固定参数。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewerSettings {
    pub width: u32,
    pub height: u32,
    pub margin_factor: f64,
    pub zoom: ZoomLimits,
    /// 余料可再利用的面积下限。
    pub min_waste_area: f64,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            margin_factor: crate::projector::DEFAULT_MARGIN_FACTOR,
            zoom: ZoomLimits::default(),
            min_waste_area: DEFAULT_MIN_WASTE_AREA,
        }
    }
}

/// 每次加载请求的序号，用于丢弃过期的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTicket(u64);

impl LoadTicket {
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    Stale,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    Idle,
    Loading { id: String },
    Ready,
    /// 解析成功但没有可绘制的路径。
    Empty,
    Failed { message: String, retryable: bool },
}

/// 一次成功解析得到的全部数据，下一次加载开始时整体替换。
#[derive(Debug, Clone)]
pub struct LoadedView {
    pub id: String,
    pub raw: Vec<u8>,
    pub extraction: Extraction,
    pub document: SvgDocument,
    pub statistics: DrawingStatistics,
    pub diagnostics: Vec<Diagnostic>,
}

/// 管理当前图纸、显示变换与加载状态。加载以最后一次请求为准。
#[derive(Debug)]
pub struct ViewerSession {
    settings: ViewerSettings,
    projector: SvgProjector,
    extractor: DxfExtractor,
    generation: u64,
    pending: Option<(LoadTicket, String)>,
    last_requested: Option<String>,
    state: ViewState,
    current: Option<LoadedView>,
    display: DisplayTransform,
}

impl Default for ViewerSession {
    fn default() -> Self {
        Self::new(ViewerSettings::default())
    }
}

impl ViewerSession {
    pub fn new(settings: ViewerSettings) -> Self {
        Self {
            settings,
            projector: SvgProjector::with_margin_factor(settings.margin_factor),
            extractor: DxfExtractor::new(),
            generation: 0,
            pending: None,
            last_requested: None,
            state: ViewState::Idle,
            current: None,
            display: DisplayTransform::new(settings.zoom),
        }
    }

    #[inline]
    pub fn settings(&self) -> ViewerSettings {
        self.settings
    }

    #[inline]
    pub fn state(&self) -> &ViewState {
        &self.state
    }

    #[inline]
    pub fn current(&self) -> Option<&LoadedView> {
        self.current.as_ref()
    }

    #[inline]
    pub fn display(&self) -> &DisplayTransform {
        &self.display
    }

    #[inline]
    pub fn display_mut(&mut self) -> &mut DisplayTransform {
        &mut self.display
    }

    /// 开始新的加载周期，之前未完成的请求随之作废。
    pub fn begin_load(&mut self, id: impl Into<String>) -> LoadTicket {
        let id = id.into();
        self.generation += 1;
        let ticket = LoadTicket(self.generation);
        if let Some((previous, previous_id)) = self.pending.replace((ticket, id.clone())) {
            debug!(ticket = previous.get(), id = %previous_id, "上一次加载请求已被取代");
        }
        self.last_requested = Some(id.clone());
        self.state = ViewState::Loading { id };
        ticket
    }

    /// 交付获取结果；票据过期时丢弃，不改变当前状态。
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        fetched: Result<Vec<u8>, SourceError>,
    ) -> LoadOutcome {
        let id = match self.pending.take() {
            Some((expected, id)) if expected == ticket => id,
            other => {
                self.pending = other;
                debug!(ticket = ticket.get(), "丢弃过期的加载结果");
                return LoadOutcome::Stale;
            }
        };

        self.current = None;
        self.display.reset();
        match fetched {
            Ok(bytes) => self.apply_bytes(id, bytes),
            Err(err) => {
                warn!(id = %id, error = %err, "获取图纸失败");
                self.state = ViewState::Failed {
                    message: err.to_string(),
                    retryable: err.is_retryable(),
                };
            }
        }
        LoadOutcome::Applied
    }

    /// 同步执行一次完整加载。
    pub fn load_from(&mut self, source: &dyn DrawingSource, id: &str) -> LoadOutcome {
        let ticket = self.begin_load(id);
        debug!(id, source = %source.describe(), "开始加载图纸");
        let fetched = source.fetch(id);
        self.complete_load(ticket, fetched)
    }

    /// 失败状态下重新加载最后一次请求的图纸。
    pub fn retry(&mut self, source: &dyn DrawingSource) -> Option<LoadOutcome> {
        if !matches!(self.state, ViewState::Failed { .. }) {
            return None;
        }
        let id = self.last_requested.clone()?;
        Some(self.load_from(source, &id))
    }

    fn apply_bytes(&mut self, id: String, bytes: Vec<u8>) {
        let mut diagnostics = CollectingDiagnostics::new();
        let extraction = match self.extractor.extract(&bytes, &mut diagnostics) {
            Ok(extraction) => extraction,
            Err(err) => {
                warn!(id = %id, error = %err, "图纸无法解码");
                self.state = ViewState::Failed {
                    message: err.to_string(),
                    retryable: false,
                };
                return;
            }
        };
        let mut log = TracingDiagnostics;
        for entry in diagnostics.entries() {
            log.record(entry.clone());
        }

        let document = self.projector.project_document(
            &extraction.drawing,
            self.settings.width,
            self.settings.height,
        );
        let statistics = extraction.drawing.statistics(self.settings.min_waste_area);
        info!(
            id = %id,
            entities = extraction.drawing.len(),
            paths = document.path_count(),
            skipped = extraction.skipped_entities,
            discarded = extraction.discarded_entities,
            "图纸解析完成"
        );

        self.state = if document.path_count() == 0 {
            ViewState::Empty
        } else {
            ViewState::Ready
        };
        self.current = Some(LoadedView {
            id,
            raw: bytes,
            extraction,
            document,
            statistics,
            diagnostics: diagnostics.into_inner(),
        });
    }

    /// 当前应显示的内容：图纸、空结果提示或错误提示。
    pub fn markup(&self) -> String {
        let (width, height) = (self.settings.width, self.settings.height);
        match (&self.state, &self.current) {
            (ViewState::Ready, Some(view)) => view.document.markup_with(&self.display),
            (ViewState::Empty, _) => placeholder_markup(width, height, NO_GEOMETRY_MESSAGE),
            (ViewState::Failed { message, .. }, _) => placeholder_markup(width, height, message),
            (ViewState::Loading { id }, _) => {
                placeholder_markup(width, height, &format!("loading {id}"))
            }
            _ => placeholder_markup(width, height, "no drawing loaded"),
        }
    }

    /// 把当前图纸的原始字节另存为文件。
    pub fn download(&self, directory: &Path, filename: &str) -> Result<PathBuf, EngineError> {
        let view = self.current.as_ref().ok_or(EngineError::NoDrawingLoaded)?;
        Ok(save_download(&view.raw, directory, filename)?)
    }
}
