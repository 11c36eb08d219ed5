use mdfview_core::drawing::{Drawing, Entity, is_allowed_layer};
use mdfview_core::geometry::Point2;
use thiserror::Error;

use crate::diagnostics::{Diagnostic, DiagnosticsSink};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("cannot decode file: invalid UTF-8 at byte {valid_up_to}")]
    Undecodable { valid_up_to: usize },
}

/// 一次解析的结果。`drawing` 只包含白名单图层上的 LWPOLYLINE。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub drawing: Drawing,
    /// 因数值损坏被跳过的实体数量。
    pub skipped_entities: usize,
    /// 因图层不符被丢弃的实体数量。
    pub discarded_entities: usize,
    pub found_entities_section: bool,
}

impl Extraction {
    /// 没有可保留的实体，对应“无可显示几何”。
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.drawing.is_empty()
    }
}

/// LWPOLYLINE 提取器：单次线性扫描，容忍无法理解的内容。
#[derive(Debug, Default, Clone, Copy)]
pub struct DxfExtractor;

impl DxfExtractor {
    pub fn new() -> Self {
        Self
    }

    /// 解析原始字节。只有无法按 UTF-8 解码时才返回错误。
    pub fn extract(
        &self,
        bytes: &[u8],
        diagnostics: &mut dyn DiagnosticsSink,
    ) -> Result<Extraction, ExtractError> {
        let text = std::str::from_utf8(bytes).map_err(|err| ExtractError::Undecodable {
            valid_up_to: err.valid_up_to(),
        })?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        Ok(self.extract_str(text, diagnostics))
    }

    pub fn extract_str(&self, source: &str, diagnostics: &mut dyn DiagnosticsSink) -> Extraction {
        let mut reader = DxfReader::new(source);
        let mut extraction = Extraction::default();
        let mut in_entities = false;
        let mut current: Option<PendingPolyline> = None;

        while let Some(record) = reader.next_record() {
            let (code, value, line) = match record {
                Record::Pair { code, value, line } => (code, value, line),
                Record::Unreadable { line, raw } => {
                    diagnostics.record(Diagnostic::UnreadableGroupCode {
                        line,
                        raw: raw.to_string(),
                    });
                    continue;
                }
            };

            if !in_entities {
                if code == 2 && value == "ENTITIES" {
                    in_entities = true;
                    extraction.found_entities_section = true;
                }
                continue;
            }

            if code == 0 {
                if let Some(pending) = current.take() {
                    finalize(pending, &mut extraction, diagnostics);
                }
                match value {
                    "LWPOLYLINE" => current = Some(PendingPolyline::new(line)),
                    "ENDSEC" => in_entities = false,
                    _ => {}
                }
                continue;
            }

            if let Some(pending) = current.as_mut() {
                pending.apply(code, value, line, diagnostics);
            }
        }

        if let Some(pending) = current.take() {
            finalize(pending, &mut extraction, diagnostics);
        }
        extraction
    }
}

struct PendingPolyline {
    start_line: usize,
    layer: Option<String>,
    declared_vertex_count: Option<u32>,
    vertices: Vec<Point2>,
    pending_x: Option<f64>,
    malformed: bool,
}

impl PendingPolyline {
    fn new(start_line: usize) -> Self {
        Self {
            start_line,
            layer: None,
            declared_vertex_count: None,
            vertices: Vec::new(),
            pending_x: None,
            malformed: false,
        }
    }

    fn apply(&mut self, code: i32, value: &str, line: usize, diagnostics: &mut dyn DiagnosticsSink) {
        match code {
            8 => self.layer = Some(value.to_string()),
            90 | 10 | 20 if self.malformed => {}
            90 => match value.parse::<u32>() {
                Ok(count) => self.declared_vertex_count = Some(count),
                Err(_) => self.mark_malformed(code, value, line, diagnostics),
            },
            10 => match parse_coordinate(value) {
                Some(x) => {
                    if self.pending_x.replace(x).is_some() {
                        diagnostics.record(Diagnostic::UnpairedX { line });
                    }
                }
                None => self.mark_malformed(code, value, line, diagnostics),
            },
            20 => match parse_coordinate(value) {
                Some(y) => match self.pending_x.take() {
                    Some(x) => self.vertices.push(Point2::new(x, y)),
                    None => diagnostics.record(Diagnostic::OrphanY { line }),
                },
                None => self.mark_malformed(code, value, line, diagnostics),
            },
            _ => {}
        }
    }

    fn mark_malformed(
        &mut self,
        code: i32,
        value: &str,
        line: usize,
        diagnostics: &mut dyn DiagnosticsSink,
    ) {
        self.malformed = true;
        diagnostics.record(Diagnostic::MalformedValue {
            line,
            code,
            value: value.to_string(),
        });
    }
}

fn finalize(
    pending: PendingPolyline,
    extraction: &mut Extraction,
    diagnostics: &mut dyn DiagnosticsSink,
) {
    let line = pending.start_line;
    if pending.malformed {
        extraction.skipped_entities += 1;
        diagnostics.record(Diagnostic::SkippedEntity { line });
        return;
    }

    if pending.pending_x.is_some() {
        diagnostics.record(Diagnostic::DanglingX { line });
    }

    let layer = match pending.layer {
        Some(layer) if is_allowed_layer(&layer) => layer,
        other => {
            extraction.discarded_entities += 1;
            diagnostics.record(Diagnostic::DiscardedLayer { line, layer: other });
            return;
        }
    };

    if let Some(declared) = pending.declared_vertex_count {
        if declared as usize != pending.vertices.len() {
            diagnostics.record(Diagnostic::VertexCountMismatch {
                line,
                layer: layer.clone(),
                declared,
                collected: pending.vertices.len(),
            });
        }
    }
    if pending.vertices.is_empty() {
        diagnostics.record(Diagnostic::EmptyEntity {
            line,
            layer: layer.clone(),
        });
    }

    let mut entity = Entity::polyline(layer, pending.vertices);
    entity.declared_vertex_count = pending.declared_vertex_count;
    extraction.drawing.push(entity);
}

/// 只接受有限数值；`NaN`/`inf` 视为损坏数据。
fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|value| value.is_finite())
}

enum Record<'a> {
    Pair {
        code: i32,
        value: &'a str,
        line: usize,
    },
    Unreadable {
        line: usize,
        raw: &'a str,
    },
}

/// 按“组码行 / 值行”成对读取。组码行损坏时只消耗这一行，以便重新对齐。
struct DxfReader<'a> {
    lines: std::str::Lines<'a>,
    line_number: usize,
}

impl<'a> DxfReader<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines(),
            line_number: 0,
        }
    }

    fn next_record(&mut self) -> Option<Record<'a>> {
        let code_line = self.lines.next()?;
        self.line_number += 1;
        let code_line = code_line.trim();

        let Ok(code) = code_line.parse::<i32>() else {
            return Some(Record::Unreadable {
                line: self.line_number,
                raw: code_line,
            });
        };

        // 末尾缺少值行的组码直接忽略
        let value_line = self.lines.next()?;
        self.line_number += 1;
        Some(Record::Pair {
            code,
            value: value_line.trim(),
            line: self.line_number - 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingDiagnostics;

    fn extract(source: &str) -> (Extraction, CollectingDiagnostics) {
        let mut sink = CollectingDiagnostics::new();
        let extraction = DxfExtractor::new().extract_str(source, &mut sink);
        (extraction, sink)
    }

    #[test]
    fn reader_pairs_codes_with_values() {
        let mut reader = DxfReader::new("  0\r\nSECTION\r\n  2\r\nENTITIES\r\n");
        match reader.next_record() {
            Some(Record::Pair { code, value, line }) => {
                assert_eq!(code, 0);
                assert_eq!(value, "SECTION");
                assert_eq!(line, 1);
            }
            _ => panic!("expected first pair"),
        }
        match reader.next_record() {
            Some(Record::Pair { code, value, line }) => {
                assert_eq!(code, 2);
                assert_eq!(value, "ENTITIES");
                assert_eq!(line, 3);
            }
            _ => panic!("expected second pair"),
        }
        assert!(reader.next_record().is_none());
    }

    #[test]
    fn reader_resynchronizes_after_unreadable_code() {
        let mut reader = DxfReader::new("garbage\n0\nLWPOLYLINE\n8");
        assert!(matches!(
            reader.next_record(),
            Some(Record::Unreadable { line: 1, raw: "garbage" })
        ));
        assert!(matches!(
            reader.next_record(),
            Some(Record::Pair { code: 0, value: "LWPOLYLINE", line: 2 })
        ));
        assert!(reader.next_record().is_none());
    }

    #[test]
    fn content_before_entities_marker_is_ignored() {
        let source = "0\nLWPOLYLINE\n8\n0\n10\n1\n20\n2\n10\n3\n20\n4\n";
        let (extraction, _) = extract(source);
        assert!(extraction.is_empty());
        assert!(!extraction.found_entities_section);
    }

    #[test]
    fn other_entity_types_do_not_leak_coordinates() {
        let source = "\
0\nSECTION\n2\nENTITIES\n\
0\nLWPOLYLINE\n8\ndetails\n10\n0\n20\n0\n10\n5\n20\n0\n\
0\nLINE\n8\ndetails\n10\n100\n20\n100\n11\n200\n21\n200\n\
0\nENDSEC\n0\nEOF\n";
        let (extraction, _) = extract(source);
        assert_eq!(extraction.drawing.len(), 1);
        assert_eq!(
            extraction.drawing.entities()[0].vertices,
            vec![Point2::new(0.0, 0.0), Point2::new(5.0, 0.0)]
        );
    }

    #[test]
    fn unpaired_x_is_replaced_by_the_latest_one() {
        let source = "2\nENTITIES\n0\nLWPOLYLINE\n8\n0\n10\n1\n10\n2\n20\n3\n";
        let (extraction, sink) = extract(source);
        assert_eq!(
            extraction.drawing.entities()[0].vertices,
            vec![Point2::new(2.0, 3.0)]
        );
        assert!(
            sink.entries()
                .iter()
                .any(|entry| matches!(entry, Diagnostic::UnpairedX { line: 9 }))
        );
    }

    #[test]
    fn trailing_x_without_y_is_reported() {
        let source = "2\nENTITIES\n0\nLWPOLYLINE\n8\n0\n10\n1\n20\n2\n10\n3\n0\nENDSEC\n";
        let (extraction, sink) = extract(source);
        assert_eq!(
            extraction.drawing.entities()[0].vertices,
            vec![Point2::new(1.0, 2.0)]
        );
        assert!(
            sink.entries()
                .iter()
                .any(|entry| matches!(entry, Diagnostic::DanglingX { line: 3 }))
        );
    }

    #[test]
    fn non_finite_coordinates_mark_entity_malformed() {
        let source = "2\nENTITIES\n0\nLWPOLYLINE\n8\n0\n10\nNaN\n20\n1\n";
        let (extraction, _) = extract(source);
        assert!(extraction.is_empty());
        assert_eq!(extraction.skipped_entities, 1);
    }
}
