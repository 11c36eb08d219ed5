use mdfview_core::geometry::{Point2, Vector2};

use crate::projector::fmt_num;

pub const DEFAULT_ZOOM: f64 = 1.0;
pub const DEFAULT_ZOOM_STEP: f64 = 1.1;
pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 5.0;

/// 缩放范围与每次缩放的倍率。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLimits {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min: MIN_ZOOM,
            max: MAX_ZOOM,
            step: DEFAULT_ZOOM_STEP,
        }
    }
}

impl ZoomLimits {
    #[inline]
    fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// 叠加在投影结果之上的显示变换（缩放 + 平移），只由交互修改。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayTransform {
    zoom: f64,
    pan: Vector2,
    limits: ZoomLimits,
    drag_anchor: Option<Point2>,
}

impl Default for DisplayTransform {
    fn default() -> Self {
        Self::new(ZoomLimits::default())
    }
}

impl DisplayTransform {
    pub fn new(limits: ZoomLimits) -> Self {
        Self {
            zoom: limits.clamp(DEFAULT_ZOOM),
            pan: Vector2::ZERO,
            limits,
            drag_anchor: None,
        }
    }

    #[inline]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    #[inline]
    pub fn pan(&self) -> Vector2 {
        self.pan
    }

    #[inline]
    pub fn limits(&self) -> ZoomLimits {
        self.limits
    }

    #[inline]
    pub fn is_dragging(&self) -> bool {
        self.drag_anchor.is_some()
    }

    pub fn is_identity(&self) -> bool {
        self.zoom == DEFAULT_ZOOM && self.pan == Vector2::ZERO
    }

    /// 按乘法因子调整缩放，结果限制在合法范围内。
    pub fn scale_zoom(&mut self, factor: f64) {
        if factor.is_finite() && factor > 0.0 {
            self.zoom = self.limits.clamp(self.zoom * factor);
        }
    }

    pub fn zoom_in(&mut self) {
        self.scale_zoom(self.limits.step);
    }

    pub fn zoom_out(&mut self) {
        self.scale_zoom(1.0 / self.limits.step);
    }

    /// 滚轮：向上（负值）放大，向下缩小，每次事件一步。
    pub fn wheel(&mut self, delta_y: f64) {
        if delta_y < 0.0 {
            self.zoom_in();
        } else if delta_y > 0.0 {
            self.zoom_out();
        }
    }

    pub fn begin_drag(&mut self, pointer: Point2) {
        self.drag_anchor = Some(pointer);
    }

    /// 拖拽中按指针位移平移；未处于拖拽状态时忽略。
    pub fn drag_to(&mut self, pointer: Point2) {
        if let Some(anchor) = self.drag_anchor {
            self.pan = self.pan + anchor.vector_to(pointer);
            self.drag_anchor = Some(pointer);
        }
    }

    pub fn end_drag(&mut self) {
        self.drag_anchor = None;
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.limits);
    }

    /// 以视口中心为缩放原点的 SVG 变换串。
    pub fn svg_transform(&self, width: u32, height: u32) -> String {
        let cx = f64::from(width) / 2.0;
        let cy = f64::from(height) / 2.0;
        format!(
            "translate({} {}) scale({}) translate({} {})",
            fmt_num(cx + self.pan.x()),
            fmt_num(cy + self.pan.y()),
            fmt_num(self.zoom),
            fmt_num(-cx),
            fmt_num(-cy),
        )
    }
}
