use std::fmt::Write;

use mdfview_core::drawing::{Drawing, Entity, LayerRole};
use mdfview_core::geometry::{Bounds2D, Point2};

use crate::view::DisplayTransform;

/// 为视口边缘保留的比例。
pub const DEFAULT_MARGIN_FACTOR: f64 = 0.8;

/// 包围盒某一轴宽度为 0（单点、纯水平或纯竖直图形）时使用的替代宽度。
pub const DEGENERATE_EXTENT: f64 = 1e-6;

const SVG_NS: &str = "http://www.w3.org/2000/svg";

/// 将图纸坐标映射到视口：以包围盒中心对齐视口中心并统一缩放。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub scale: f64,
    pub center: Point2,
}

impl ViewTransform {
    pub fn fit(bounds: &Bounds2D, width: u32, height: u32, margin_factor: f64) -> Self {
        let dx = non_degenerate(bounds.width());
        let dy = non_degenerate(bounds.height());
        let scale = (f64::from(width) / dx).min(f64::from(height) / dy) * margin_factor;
        Self {
            scale: positive_finite(scale),
            center: bounds.center(),
        }
    }

    /// 图纸坐标到视口像素坐标。
    pub fn apply(&self, point: Point2, width: u32, height: u32) -> Point2 {
        Point2::new(
            f64::from(width) / 2.0 + (point.x() - self.center.x()) * self.scale,
            f64::from(height) / 2.0 + (point.y() - self.center.y()) * self.scale,
        )
    }
}

/// 极小（含 0 与次正规数）的宽度按 `DEGENERATE_EXTENT` 处理，溢出为无穷的宽度按 `f64::MAX` 处理。
fn non_degenerate(extent: f64) -> f64 {
    if !extent.is_finite() {
        f64::MAX
    } else if extent < DEGENERATE_EXTENT {
        DEGENERATE_EXTENT
    } else {
        extent
    }
}

fn positive_finite(scale: f64) -> f64 {
    if scale.is_nan() {
        1.0
    } else {
        scale.clamp(f64::MIN_POSITIVE, f64::MAX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: &'static str,
    pub width: f64,
}

/// 板材轮廓。
pub const BOUNDARY_STYLE: StrokeStyle = StrokeStyle {
    color: "#e03131",
    width: 2.0,
};
/// 切割零件。
pub const DETAIL_STYLE: StrokeStyle = StrokeStyle {
    color: "#1971c2",
    width: 1.0,
};
pub const DEFAULT_STYLE: StrokeStyle = StrokeStyle {
    color: "#000000",
    width: 0.5,
};

impl StrokeStyle {
    pub fn for_role(role: LayerRole) -> Self {
        match role {
            LayerRole::Boundary => BOUNDARY_STYLE,
            LayerRole::Detail => DETAIL_STYLE,
            LayerRole::Other => DEFAULT_STYLE,
        }
    }

    #[inline]
    pub fn for_layer(layer: &str) -> Self {
        Self::for_role(LayerRole::of(layer))
    }
}

/// 投影结果。`body` 为带投影变换的分组，外层平移/缩放在输出时再组合。
#[derive(Debug, Clone, PartialEq)]
pub struct SvgDocument {
    width: u32,
    height: u32,
    transform: Option<ViewTransform>,
    body: String,
    path_count: usize,
}

impl SvgDocument {
    fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            transform: None,
            body: String::new(),
            path_count: 0,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// 没有任何顶点时为 `None`。
    #[inline]
    pub fn transform(&self) -> Option<ViewTransform> {
        self.transform
    }

    #[inline]
    pub fn path_count(&self) -> usize {
        self.path_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.transform.is_none()
    }

    pub fn markup(&self) -> String {
        let mut out = svg_open(self.width, self.height);
        out.push_str(&self.body);
        out.push_str("</svg>\n");
        out
    }

    /// 在投影结果外层叠加交互变换，不重新计算包围盒。
    pub fn markup_with(&self, display: &DisplayTransform) -> String {
        if display.is_identity() || self.body.is_empty() {
            return self.markup();
        }
        let mut out = svg_open(self.width, self.height);
        let _ = writeln!(
            out,
            "<g transform=\"{}\">",
            display.svg_transform(self.width, self.height)
        );
        out.push_str(&self.body);
        out.push_str("</g>\n</svg>\n");
        out
    }
}

fn svg_open(width: u32, height: u32) -> String {
    format!(
        "<svg xmlns=\"{SVG_NS}\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">\n"
    )
}

/// 只显示一行文字的占位画面，用于空结果或错误状态。
pub fn placeholder_markup(width: u32, height: u32, message: &str) -> String {
    let mut out = svg_open(width, height);
    let _ = writeln!(
        out,
        "<text x=\"{}\" y=\"{}\" text-anchor=\"middle\" fill=\"#868e96\">{}</text>",
        fmt_num(f64::from(width) / 2.0),
        fmt_num(f64::from(height) / 2.0),
        escape_xml(message)
    );
    out.push_str("</svg>\n");
    out
}

#[derive(Debug, Clone, Copy)]
pub struct SvgProjector {
    margin_factor: f64,
}

impl Default for SvgProjector {
    fn default() -> Self {
        Self::new()
    }
}

impl SvgProjector {
    pub fn new() -> Self {
        Self {
            margin_factor: DEFAULT_MARGIN_FACTOR,
        }
    }

    pub fn with_margin_factor(margin_factor: f64) -> Self {
        Self { margin_factor }
    }

    #[inline]
    pub fn margin_factor(&self) -> f64 {
        self.margin_factor
    }

    pub fn project(&self, drawing: &Drawing, width: u32, height: u32) -> String {
        self.project_document(drawing, width, height).markup()
    }

    pub fn project_document(&self, drawing: &Drawing, width: u32, height: u32) -> SvgDocument {
        let Some(bounds) = drawing.bounds() else {
            return SvgDocument::empty(width, height);
        };
        let transform = ViewTransform::fit(&bounds, width, height, self.margin_factor);

        let mut body = String::new();
        let _ = writeln!(
            body,
            "<g transform=\"translate({} {}) scale({}) translate({} {})\">",
            fmt_num(f64::from(width) / 2.0),
            fmt_num(f64::from(height) / 2.0),
            fmt_scale(transform.scale),
            fmt_num(-transform.center.x()),
            fmt_num(-transform.center.y()),
        );
        let mut path_count = 0;
        for entity in drawing.entities().iter().filter(|e| e.is_renderable()) {
            write_path(&mut body, entity);
            path_count += 1;
        }
        body.push_str("</g>\n");

        SvgDocument {
            width,
            height,
            transform: Some(transform),
            body,
            path_count,
        }
    }
}

fn write_path(out: &mut String, entity: &Entity) {
    let style = StrokeStyle::for_layer(&entity.layer);
    let mut d = String::new();
    for (index, vertex) in entity.vertices.iter().enumerate() {
        if index > 0 {
            d.push(' ');
        }
        let command = if index == 0 { 'M' } else { 'L' };
        let _ = write!(d, "{command}{} {}", fmt_num(vertex.x()), fmt_num(vertex.y()));
    }
    let _ = writeln!(
        out,
        "<path d=\"{d}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\" vector-effect=\"non-scaling-stroke\" data-layer=\"{}\"/>",
        style.color,
        fmt_num(style.width),
        escape_xml(&entity.layer),
    );
}

/// 固定六位小数后去掉多余的零，保证输出稳定。
pub(crate) fn fmt_num(value: f64) -> String {
    let mut text = format!("{value:.6}");
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    if text == "-0" {
        text = "0".to_string();
    }
    text
}

/// 比例必须保持为正：六位小数下会舍入为 0 的值改用科学计数法输出。
fn fmt_scale(value: f64) -> String {
    let text = fmt_num(value);
    if text == "0" && value != 0.0 {
        format!("{value:e}")
    } else {
        text
    }
}

fn escape_xml(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}
