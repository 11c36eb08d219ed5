use std::fs;
use std::path::PathBuf;

use mdfview_core::drawing::LayerRole;
use mdfview_core::geometry::Point2;
use mdfview_io::{CollectingDiagnostics, Diagnostic, DxfExtractor, ExtractError};

fn fixture(name: &str) -> Vec<u8> {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/data");
    path.push(name);
    fs::read(&path).unwrap_or_else(|err| panic!("读取测试数据 {} 失败: {err}", path.display()))
}

fn points(raw: &[(f64, f64)]) -> Vec<Point2> {
    raw.iter().map(|&(x, y)| Point2::new(x, y)).collect()
}

#[test]
fn two_pieces_are_extracted_in_order() {
    let mut sink = CollectingDiagnostics::new();
    let extraction = DxfExtractor::new()
        .extract(&fixture("cut_map_two_pieces.dxf"), &mut sink)
        .expect("解析 DXF 失败");

    assert!(extraction.found_entities_section);
    assert_eq!(extraction.skipped_entities, 0);
    assert_eq!(extraction.discarded_entities, 0);
    assert!(sink.is_empty(), "unexpected diagnostics: {:?}", sink.entries());

    let entities = extraction.drawing.entities();
    assert_eq!(entities.len(), 2);

    assert_eq!(entities[0].layer, "0");
    assert_eq!(entities[0].role(), LayerRole::Boundary);
    assert_eq!(entities[0].declared_vertex_count, Some(4));
    assert_eq!(
        entities[0].vertices,
        points(&[(0.0, 0.0), (100.0, 0.0), (100.0, 50.0), (0.0, 50.0)])
    );

    assert_eq!(entities[1].layer, "details");
    assert_eq!(entities[1].role(), LayerRole::Detail);
    assert_eq!(entities[1].declared_vertex_count, Some(3));
    assert_eq!(
        entities[1].vertices,
        points(&[(10.0, 10.0), (40.0, 10.0), (40.0, 30.0)])
    );
}

#[test]
fn layer_outside_allow_list_is_discarded() {
    let mut sink = CollectingDiagnostics::new();
    let extraction = DxfExtractor::new()
        .extract(&fixture("scrap_layer.dxf"), &mut sink)
        .expect("解析 DXF 失败");

    assert!(extraction.is_empty());
    assert_eq!(extraction.discarded_entities, 1);
    assert_eq!(
        sink.entries(),
        &[Diagnostic::DiscardedLayer {
            line: 5,
            layer: Some("scrap".to_string()),
        }]
    );
}

#[test]
fn malformed_pieces_are_skipped_and_scanning_continues() {
    let mut sink = CollectingDiagnostics::new();
    let extraction = DxfExtractor::new()
        .extract(&fixture("malformed_piece.dxf"), &mut sink)
        .expect("解析 DXF 失败");

    assert_eq!(extraction.skipped_entities, 2);
    let entities = extraction.drawing.entities();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].layer, "details");
    // 开头的孤立 Y 不产生顶点
    assert_eq!(entities[0].vertices, points(&[(1.0, 2.0), (3.0, 4.0)]));

    let entries = sink.entries();
    assert!(entries.contains(&Diagnostic::MalformedValue {
        line: 11,
        code: 10,
        value: "abc".to_string(),
    }));
    assert!(entries.contains(&Diagnostic::SkippedEntity { line: 5 }));
    assert!(
        entries
            .iter()
            .any(|entry| matches!(entry, Diagnostic::MalformedValue { code: 90, value, .. } if value == "five"))
    );
    assert!(
        entries
            .iter()
            .any(|entry| matches!(entry, Diagnostic::OrphanY { .. }))
    );
    assert!(entries.iter().any(|entry| matches!(
        entry,
        Diagnostic::VertexCountMismatch {
            declared: 3,
            collected: 2,
            ..
        }
    )));
}

#[test]
fn missing_entities_section_yields_empty_result() {
    let source = "  0\nSECTION\n  2\nHEADER\n  0\nENDSEC\n  0\nEOF\n";
    let mut sink = CollectingDiagnostics::new();
    let extraction = DxfExtractor::new()
        .extract(source.as_bytes(), &mut sink)
        .expect("空结果不应视为错误");
    assert!(extraction.is_empty());
    assert!(!extraction.found_entities_section);
}

#[test]
fn entity_without_layer_is_discarded() {
    let source = "2\nENTITIES\n0\nLWPOLYLINE\n10\n1\n20\n1\n10\n2\n20\n2\n";
    let mut sink = CollectingDiagnostics::new();
    let extraction = DxfExtractor::new()
        .extract(source.as_bytes(), &mut sink)
        .expect("解析 DXF 失败");
    assert!(extraction.is_empty());
    assert_eq!(extraction.discarded_entities, 1);
    assert_eq!(
        sink.entries(),
        &[Diagnostic::DiscardedLayer {
            line: 3,
            layer: None
        }]
    );
}

#[test]
fn entity_with_zero_vertices_is_retained() {
    let source = "2\nENTITIES\n0\nLWPOLYLINE\n8\nwork_area\n90\n0\n0\nENDSEC\n";
    let mut sink = CollectingDiagnostics::new();
    let extraction = DxfExtractor::new()
        .extract(source.as_bytes(), &mut sink)
        .expect("解析 DXF 失败");
    assert_eq!(extraction.drawing.len(), 1);
    assert!(extraction.drawing.entities()[0].vertices.is_empty());
    assert!(
        sink.entries()
            .iter()
            .any(|entry| matches!(entry, Diagnostic::EmptyEntity { .. }))
    );
}

#[test]
fn byte_order_mark_and_crlf_are_accepted() {
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(b"  2\r\nENTITIES\r\n  0\r\nLWPOLYLINE\r\n  8\r\ndetails\r\n 10\r\n1.5\r\n 20\r\n-2.5\r\n");
    let mut sink = CollectingDiagnostics::new();
    let extraction = DxfExtractor::new()
        .extract(&bytes, &mut sink)
        .expect("解析 DXF 失败");
    assert_eq!(
        extraction.drawing.entities()[0].vertices,
        points(&[(1.5, -2.5)])
    );
}

#[test]
fn invalid_utf8_is_fatal() {
    let bytes = b"  0\nSECTION\n\xff\xfe\n";
    let mut sink = CollectingDiagnostics::new();
    let err = DxfExtractor::new().extract(bytes, &mut sink).unwrap_err();
    assert!(matches!(err, ExtractError::Undecodable { valid_up_to: 12 }));
    assert!(err.to_string().starts_with("cannot decode file"));
}

#[test]
fn repeated_extraction_is_deterministic() {
    let bytes = fixture("cut_map_two_pieces.dxf");
    let extractor = DxfExtractor::new();
    let first = extractor
        .extract(&bytes, &mut CollectingDiagnostics::new())
        .expect("first pass");
    let second = extractor
        .extract(&bytes, &mut CollectingDiagnostics::new())
        .expect("second pass");
    assert_eq!(first, second);
}
