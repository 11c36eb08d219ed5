use std::fmt;

use tracing::{debug, warn};

/// 解析过程中产生的非致命事件。解析器本身不写日志，事件交给调用方注入的收集器。
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// 组码行无法解析为整数，读取器向后错位一行重新同步。
    UnreadableGroupCode { line: usize, raw: String },
    /// 组码 90 / 10 / 20 后的数值无法解析，所在实体会被丢弃。
    MalformedValue {
        line: usize,
        code: i32,
        value: String,
    },
    /// 组码 20 之前没有待配对的组码 10。
    OrphanY { line: usize },
    /// 新的组码 10 覆盖了尚未配对的 X。
    UnpairedX { line: usize },
    /// 实体结束时仍有未配对的 X。
    DanglingX { line: usize },
    /// 实体被丢弃：因数值损坏而跳过。
    SkippedEntity { line: usize },
    /// 实体被丢弃：图层不在白名单内或缺失。
    DiscardedLayer { line: usize, layer: Option<String> },
    /// 组码 90 声明的顶点数与实际收集数量不一致。
    VertexCountMismatch {
        line: usize,
        layer: String,
        declared: u32,
        collected: usize,
    },
    /// 保留了一个没有任何顶点的实体。
    EmptyEntity { line: usize, layer: String },
}

impl Diagnostic {
    /// 会导致实体丢失几何信息的事件。
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Diagnostic::MalformedValue { .. }
                | Diagnostic::SkippedEntity { .. }
                | Diagnostic::VertexCountMismatch { .. }
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnreadableGroupCode { line, raw } => {
                write!(f, "第 {line} 行的组码 \"{raw}\" 无法解析为整数")
            }
            Diagnostic::MalformedValue { line, code, value } => {
                write!(f, "第 {line} 行组码 {code} 的值 \"{value}\" 不是合法数值")
            }
            Diagnostic::OrphanY { line } => {
                write!(f, "第 {line} 行的 Y（组码 20）缺少对应的 X，已忽略")
            }
            Diagnostic::UnpairedX { line } => {
                write!(f, "第 {line} 行的 X（组码 10）覆盖了未配对的 X")
            }
            Diagnostic::DanglingX { line } => {
                write!(f, "第 {line} 行起的 LWPOLYLINE 结束时仍有未配对的 X，已忽略")
            }
            Diagnostic::SkippedEntity { line } => {
                write!(f, "第 {line} 行起的 LWPOLYLINE 含有损坏数值，已跳过")
            }
            Diagnostic::DiscardedLayer { line, layer } => match layer {
                Some(layer) => write!(f, "第 {line} 行起的 LWPOLYLINE 位于图层 {layer}，已丢弃"),
                None => write!(f, "第 {line} 行起的 LWPOLYLINE 未声明图层，已丢弃"),
            },
            Diagnostic::VertexCountMismatch {
                line,
                layer,
                declared,
                collected,
            } => write!(
                f,
                "第 {line} 行起的 LWPOLYLINE（图层 {layer}）声明 {declared} 个顶点，实际收集 {collected} 个"
            ),
            Diagnostic::EmptyEntity { line, layer } => {
                write!(f, "第 {line} 行起的 LWPOLYLINE（图层 {layer}）没有顶点")
            }
        }
    }
}

pub trait DiagnosticsSink {
    fn record(&mut self, diagnostic: Diagnostic);
}

/// 将事件保存在内存中，便于测试与界面展示。
#[derive(Debug, Default, Clone)]
pub struct CollectingDiagnostics {
    entries: Vec<Diagnostic>,
}

impl CollectingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> + '_ {
        self.entries.iter().filter(|entry| entry.is_warning())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn into_inner(self) -> Vec<Diagnostic> {
        self.entries
    }
}

impl DiagnosticsSink for CollectingDiagnostics {
    fn record(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }
}

/// 直接转发到 `tracing`。
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticsSink for TracingDiagnostics {
    fn record(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_warning() {
            warn!(target: "mdfview_io::dxf", "{diagnostic}");
        } else {
            debug!(target: "mdfview_io::dxf", "{diagnostic}");
        }
    }
}
