use std::fs;
use std::path::{Path, PathBuf};

use mdfview_config::AppConfig;
use mdfview_core::drawing::{DrawingStatistics, Entity, EntityKind, LayerRole};
use mdfview_core::geometry::{Bounds2D, Point2};
use mdfview_engine::command::{CommandBus, CommandContext, CommandRequest};
use mdfview_engine::session::{ViewState, ViewerSession};
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::FrontendError;
use crate::loader::{ensure_loaded, load_session, viewer_settings};

/// `render` 子命令的参数。
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub id: String,
    pub out: Option<PathBuf>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub view_commands: Vec<String>,
}

/// 渲染图纸并写出 SVG。加载失败时仍写出带提示的占位画面，然后返回错误。
pub fn render(config: &AppConfig, options: &RenderOptions) -> Result<PathBuf, FrontendError> {
    let mut settings = viewer_settings(config);
    if let Some(width) = options.width {
        settings.width = width;
    }
    if let Some(height) = options.height {
        settings.height = height;
    }

    let mut session = load_session(config, settings, &options.id)?;
    apply_view_commands(&mut session, &options.view_commands)?;

    let out = options
        .out
        .clone()
        .unwrap_or_else(|| config.output.directory.join(format!("{}.svg", options.id)));
    write_file(&out, session.markup().as_bytes())?;
    info!(path = %out.display(), "已写出 SVG");

    print_state_line(&session, &options.id);
    if let Some(view) = session.current() {
        println!(
            "路径数={}, 实体数={}, 跳过={}, 丢弃={}",
            view.document.path_count(),
            view.extraction.drawing.len(),
            view.extraction.skipped_entities,
            view.extraction.discarded_entities
        );
    }
    println!("SVG 已写入：{}", out.display());

    ensure_loaded(&session, &options.id)?;
    Ok(out)
}

/// 依次执行视图命令，遇到失败立即停止。
pub fn apply_view_commands(
    session: &mut ViewerSession,
    commands: &[String],
) -> Result<(), FrontendError> {
    if commands.is_empty() {
        return Ok(());
    }
    let bus = CommandBus::new();
    let mut context = CommandContext { session };
    for line in commands {
        let Some(request) = CommandRequest::parse(line) else {
            continue;
        };
        let response = bus.dispatch(&request, &mut context);
        let message = response.message.unwrap_or_default();
        if !response.success {
            let mut names: Vec<&str> = bus.available_commands().copied().collect();
            names.sort_unstable();
            warn!(command = %line, "视图命令执行失败，支持的命令: {}", names.join(", "));
            return Err(FrontendError::Command(message));
        }
        info!(command = %line, "{message}");
    }
    Ok(())
}

/// 单个实体的明细。
#[derive(Debug, Serialize)]
pub struct EntityReport {
    pub kind: EntityKind,
    pub layer: String,
    pub role: LayerRole,
    pub vertices: Vec<Point2>,
    pub declared_vertex_count: Option<u32>,
    pub area: f64,
    /// 没有顶点时为空。
    pub bounds: Option<Bounds2D>,
}

impl From<&Entity> for EntityReport {
    fn from(entity: &Entity) -> Self {
        Self {
            kind: entity.kind,
            layer: entity.layer.clone(),
            role: entity.role(),
            vertices: entity.vertices.clone(),
            declared_vertex_count: entity.declared_vertex_count,
            area: entity.area(),
            bounds: entity.bounds(),
        }
    }
}

/// `inspect` 子命令输出的内容，也可序列化为 JSON。
#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub id: String,
    pub state: String,
    pub entities: Vec<EntityReport>,
    pub vertex_count: usize,
    pub statistics: Option<DrawingStatistics>,
    pub skipped_entities: usize,
    pub discarded_entities: usize,
    pub diagnostics: Vec<String>,
}

impl InspectReport {
    pub fn from_session(session: &ViewerSession, id: &str) -> Self {
        let state = state_label(session.state());
        match session.current() {
            Some(view) => Self {
                id: id.to_string(),
                state,
                entities: view
                    .extraction
                    .drawing
                    .entities()
                    .iter()
                    .map(EntityReport::from)
                    .collect(),
                vertex_count: view.extraction.drawing.vertex_count(),
                statistics: Some(view.statistics),
                skipped_entities: view.extraction.skipped_entities,
                discarded_entities: view.extraction.discarded_entities,
                diagnostics: view.diagnostics.iter().map(ToString::to_string).collect(),
            },
            None => Self {
                id: id.to_string(),
                state,
                entities: Vec::new(),
                vertex_count: 0,
                statistics: None,
                skipped_entities: 0,
                discarded_entities: 0,
                diagnostics: Vec::new(),
            },
        }
    }
}

pub fn inspect(config: &AppConfig, id: &str, json: bool) -> Result<InspectReport, FrontendError> {
    let session = load_session(config, viewer_settings(config), id)?;
    let report = InspectReport::from_session(&session, id);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_inspect(&report);
    }

    ensure_loaded(&session, id)?;
    Ok(report)
}

fn print_inspect(report: &InspectReport) {
    println!("图纸 {}：{}", report.id, report.state);
    println!("实体列表（共 {} 个顶点）：", report.vertex_count);
    for (index, entity) in report.entities.iter().enumerate() {
        let coords: Vec<String> = entity
            .vertices
            .iter()
            .map(|vertex| format!("({:.2}, {:.2})", vertex.x(), vertex.y()))
            .collect();
        let declared = entity
            .declared_vertex_count
            .map(|count| count.to_string())
            .unwrap_or_else(|| "-".to_string());
        let bounds = entity
            .bounds
            .map(|b| {
                format!(
                    "[({:.2}, {:.2}) - ({:.2}, {:.2})]",
                    b.min().x(),
                    b.min().y(),
                    b.max().x(),
                    b.max().y()
                )
            })
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  - #{index} {}, Layer={} ({}), 顶点={}（声明 {declared}）, 面积={:.2}, 范围={bounds}: {}",
            entity.kind.as_str(),
            entity.layer,
            entity.role.label(),
            entity.vertices.len(),
            entity.area,
            coords.join(" -> ")
        );
    }

    if let Some(stats) = &report.statistics {
        println!("统计：");
        println!("  - 总面积: {:.2}", stats.total_area);
        println!("  - 板材轮廓数: {}", stats.sheet_count);
        println!("  - 零件数: {}", stats.piece_count);
        println!("  - 零件面积: {:.2}", stats.pieces_area);
        println!("  - 平均零件面积: {:.2}", stats.average_piece_area);
        println!("  - 废料面积: {:.2}", stats.waste_area);
        println!("  - 废料比例: {:.2}%", stats.waste_percentage);
        println!(
            "  - 余料可再利用: {}",
            if stats.is_utilizable { "是" } else { "否" }
        );
    }

    println!(
        "跳过 {} 个损坏实体，丢弃 {} 个非白名单实体",
        report.skipped_entities, report.discarded_entities
    );
    if !report.diagnostics.is_empty() {
        println!("诊断信息：");
        for entry in &report.diagnostics {
            println!("  - {entry}");
        }
    }
}

/// 将原始 DXF 字节另存，文件名缺省为 `<id>.dxf`。
pub fn download(
    config: &AppConfig,
    id: &str,
    to: Option<&Path>,
    filename: Option<&str>,
) -> Result<PathBuf, FrontendError> {
    let session = load_session(config, viewer_settings(config), id)?;
    ensure_loaded(&session, id)?;

    let directory = to.unwrap_or(config.output.directory.as_path());
    let filename = match filename {
        Some(name) => name.to_string(),
        None if Path::new(id).extension().is_some() => id.to_string(),
        None => format!("{id}.dxf"),
    };
    let path = session.download(directory, &filename)?;
    println!("DXF 已保存：{}", path.display());
    Ok(path)
}

fn state_label(state: &ViewState) -> String {
    match state {
        ViewState::Idle => "idle".to_string(),
        ViewState::Loading { id } => format!("loading {id}"),
        ViewState::Ready => "ready".to_string(),
        ViewState::Empty => mdfview_engine::session::NO_GEOMETRY_MESSAGE.to_string(),
        ViewState::Failed { message, retryable } => {
            if *retryable {
                format!("failed (retryable): {message}")
            } else {
                format!("failed: {message}")
            }
        }
    }
}

fn print_state_line(session: &ViewerSession, id: &str) {
    println!("图纸 {id}：{}", state_label(session.state()));
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), FrontendError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| FrontendError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, contents).map_err(|source| FrontendError::Write {
        path: path.to_path_buf(),
        source,
    })
}
