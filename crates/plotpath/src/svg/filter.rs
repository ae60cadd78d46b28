use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use super::SvgError;

/// A stroke is background when every channel is strictly above this.
pub const NEAR_WHITE_THRESHOLD: u8 = 240;

/// Outcome of filtering one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterReport {
    pub removed: usize,
    pub kept: usize,
}

/// Removes `<path>` elements stroked in a near-white colour.
///
/// Everything else is re-emitted as parsed. Paths without a readable
/// stroke colour are kept.
pub fn filter_background_paths(document: &str) -> Result<(String, FilterReport), SvgError> {
    let mut reader = Reader::from_str(document);
    let mut writer = Writer::new(Vec::with_capacity(document.len()));
    let mut report = FilterReport {
        removed: 0,
        kept: 0,
    };
    // Nesting depth inside a dropped `<path>...</path>`.
    let mut skip_depth = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| SvgError::Parse {
            position: reader.buffer_position() as u64,
            message: e.to_string(),
        })?;

        match event {
            Event::Eof => break,
            _ if skip_depth > 0 => match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                _ => {}
            },
            Event::Empty(ref e) if is_path(e) && is_background(e) => report.removed += 1,
            Event::Start(ref e) if is_path(e) && is_background(e) => {
                report.removed += 1;
                skip_depth = 1;
            }
            other => {
                if let Event::Empty(ref e) | Event::Start(ref e) = other {
                    if is_path(e) {
                        report.kept += 1;
                    }
                }
                writer
                    .write_event(other)
                    .map_err(|e| SvgError::Write(e.to_string()))?;
            }
        }
    }

    let filtered =
        String::from_utf8(writer.into_inner()).map_err(|e| SvgError::Write(e.to_string()))?;
    Ok((filtered, report))
}

/// Filters the document at `path` in place.
pub async fn filter_background_file(path: &Path) -> Result<FilterReport, SvgError> {
    let io_err = |source| SvgError::Io {
        path: path.to_path_buf(),
        source,
    };
    let document = tokio::fs::read_to_string(path).await.map_err(io_err)?;
    let (filtered, report) = filter_background_paths(&document)?;
    tokio::fs::write(path, filtered).await.map_err(io_err)?;
    Ok(report)
}

fn is_path(element: &BytesStart<'_>) -> bool {
    element.local_name().as_ref() == b"path"
}

fn is_background(element: &BytesStart<'_>) -> bool {
    stroke_color(element).is_some_and(|[r, g, b]| {
        r > NEAR_WHITE_THRESHOLD && g > NEAR_WHITE_THRESHOLD && b > NEAR_WHITE_THRESHOLD
    })
}

/// Stroke colour from the `style` declaration, falling back to the
/// `stroke` presentation attribute. A style declaration wins even when it
/// is not a colour we can read.
fn stroke_color(element: &BytesStart<'_>) -> Option<[u8; 3]> {
    let mut style_stroke = None;
    let mut attr_stroke = None;

    for attr in element.attributes().flatten() {
        let Ok(value) = std::str::from_utf8(&attr.value) else {
            continue;
        };
        match attr.key.as_ref() {
            b"style" => style_stroke = style_declaration(value, "stroke").map(str::to_string),
            b"stroke" => attr_stroke = Some(value.to_string()),
            _ => {}
        }
    }

    style_stroke.or(attr_stroke).and_then(|c| parse_hex_color(&c))
}

fn style_declaration<'a>(style: &'a str, property: &str) -> Option<&'a str> {
    style.split(';').find_map(|decl| {
        let (name, value) = decl.split_once(':')?;
        (name.trim() == property).then(|| value.trim())
    })
}

/// Parses `#rrggbb` or `#rgb`.
fn parse_hex_color(value: &str) -> Option<[u8; 3]> {
    let hex = value.trim().strip_prefix('#')?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        6 => Some([channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?]),
        3 => {
            let short = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
            Some([short(0)?, short(1)?, short(2)?])
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(paths: &str) -> String {
        format!(
            r#"<?xml version="1.0" standalone="yes"?>
<svg width="832" height="832">
{paths}
</svg>"#
        )
    }

    fn stroked(color: &str) -> String {
        format!(r#"<path style="stroke:{color}; fill:none;" d="M1 1L2 2"/>"#)
    }

    fn survives(color: &str) -> bool {
        let (out, _) = filter_background_paths(&doc(&stroked(color))).unwrap();
        out.contains("<path")
    }

    #[test]
    fn test_removes_near_white_strokes() {
        assert!(!survives("#fefefe"));
        assert!(!survives("#f5f5f5"));
        assert!(!survives("#FFFFFF"));
        assert!(!survives("#fff"));
    }

    #[test]
    fn test_keeps_dark_and_tinted_strokes() {
        assert!(survives("#000000"));
        assert!(survives("#f0e0e0"));
        assert!(survives("#ff0000"));
    }

    #[test]
    fn test_threshold_boundary() {
        // 240 is 0xf0, 241 is 0xf1.
        assert!(survives("#f0f0f0"));
        assert!(survives("#f1f1f0"));
        assert!(!survives("#f1f1f1"));
    }

    #[test]
    fn test_unreadable_strokes_are_kept() {
        assert!(survives("white"));
        assert!(survives("none"));
        assert!(survives("#ffff"));
        assert!(survives("url(#grad)"));
        let (out, report) =
            filter_background_paths(&doc(r##"<path fill="#ffffff" d="M0 0"/>"##)).unwrap();
        assert!(out.contains("<path"));
        assert_eq!(report.kept, 1);
    }

    #[test]
    fn test_presentation_attribute_is_used_without_style() {
        let (out, report) =
            filter_background_paths(&doc(r##"<path stroke="#fafafa" d="M0 0"/>"##)).unwrap();
        assert!(!out.contains("<path"));
        assert_eq!(report.removed, 1);
    }

    #[test]
    fn test_style_wins_over_attribute() {
        let (out, _) = filter_background_paths(&doc(
            r##"<path stroke="#ffffff" style="stroke:#000000" d="M0 0"/>"##,
        ))
        .unwrap();
        assert!(out.contains("<path"));
    }

    #[test]
    fn test_mixed_document_keeps_only_line_art() {
        let input = doc(&format!("{}\n{}", stroked("#fefefe"), stroked("#000000")));
        let (out, report) = filter_background_paths(&input).unwrap();

        assert_eq!(report, FilterReport { removed: 1, kept: 1 });
        assert!(out.contains("stroke:#000000"));
        assert!(!out.contains("#fefefe"));
        assert!(out.contains(r#"<svg width="832" height="832">"#));
        assert!(out.starts_with("<?xml"));
    }

    #[test]
    fn test_removes_path_with_children() {
        let input = doc(
            r#"<path style="stroke:#ffffff"><title>bg</title></path><path style="stroke:#000"/>"#,
        );
        let (out, report) = filter_background_paths(&input).unwrap();
        assert_eq!(report.removed, 1);
        assert!(!out.contains("<title>"));
        assert!(out.contains("stroke:#000"));
        assert!(out.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        let result = filter_background_paths("<svg><path></svg>");
        assert!(matches!(result, Err(SvgError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_filter_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.svg");
        std::fs::write(&path, doc(&stroked("#fefefe"))).unwrap();

        let report = filter_background_file(&path).await.unwrap();
        assert_eq!(report.removed, 1);
        assert!(!std::fs::read_to_string(&path).unwrap().contains("<path"));
    }

    #[tokio::test]
    async fn test_filter_file_malformed_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.svg");
        std::fs::write(&path, "<svg><path></svg>").unwrap();

        assert!(filter_background_file(&path).await.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<svg><path></svg>");
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#0a0B0c"), Some([10, 11, 12]));
        assert_eq!(parse_hex_color(" #abc "), Some([0xaa, 0xbb, 0xcc]));
        assert_eq!(parse_hex_color("0a0b0c"), None);
        assert_eq!(parse_hex_color("#gg0000"), None);
    }
}
