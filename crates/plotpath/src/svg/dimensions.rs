use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Used for any side whose declared size is missing or unusable.
pub const DEFAULT_DIMENSION: f64 = 100.0;

/// Declared pixel size of a vector document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            width: DEFAULT_DIMENSION,
            height: DEFAULT_DIMENSION,
        }
    }
}

/// Reads `width`/`height` from the root `<svg>` element.
///
/// Never fails: unreadable documents and missing, unparsable or
/// non-positive attributes fall back to [`DEFAULT_DIMENSION`].
pub fn extract_dimensions(document: &str) -> Dimensions {
    let mut reader = Reader::from_str(document);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() != b"svg" {
                    return Dimensions::default();
                }
                return Dimensions {
                    width: attribute_length(&e, b"width").unwrap_or(DEFAULT_DIMENSION),
                    height: attribute_length(&e, b"height").unwrap_or(DEFAULT_DIMENSION),
                };
            }
            Ok(Event::Eof) | Err(_) => return Dimensions::default(),
            Ok(_) => {}
        }
    }
}

/// [`extract_dimensions`] over a file; an unreadable file gives the defaults.
pub async fn read_dimensions(path: &Path) -> Dimensions {
    match tokio::fs::read_to_string(path).await {
        Ok(document) => extract_dimensions(&document),
        Err(e) => {
            tracing::warn!("Could not read {} for dimensions: {}", path.display(), e);
            Dimensions::default()
        }
    }
}

fn attribute_length(element: &BytesStart<'_>, name: &[u8]) -> Option<f64> {
    let attr = element
        .attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)?;
    let value = std::str::from_utf8(&attr.value).ok()?;
    leading_number(value)
}

/// Parses the numeric prefix of a length, so `"832"` and `"832px"` both
/// give 832. Zero and negative lengths are rejected.
fn leading_number(value: &str) -> Option<f64> {
    let value = value.trim();
    let end = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(value.len());
    value[..end]
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_declared_size() {
        let svg = r#"<?xml version="1.0"?><svg width="832" height="640" xmlns="http://www.w3.org/2000/svg"></svg>"#;
        assert_eq!(
            extract_dimensions(svg),
            Dimensions {
                width: 832.0,
                height: 640.0
            }
        );
    }

    #[test]
    fn test_fractional_and_unit_suffixed_values() {
        let svg = r#"<svg width="10.5px" height="20.25"/>"#;
        assert_eq!(
            extract_dimensions(svg),
            Dimensions {
                width: 10.5,
                height: 20.25
            }
        );
    }

    #[test]
    fn test_missing_height_defaults() {
        let svg = r#"<svg width="300"><path d="M0 0"/></svg>"#;
        let dims = extract_dimensions(svg);
        assert_eq!(dims.width, 300.0);
        assert_eq!(dims.height, DEFAULT_DIMENSION);
    }

    #[test]
    fn test_unparsable_and_zero_values_default() {
        let svg = r#"<svg width="wide" height="0"></svg>"#;
        assert_eq!(extract_dimensions(svg), Dimensions::default());
    }

    #[test]
    fn test_non_svg_root_and_garbage_default() {
        assert_eq!(
            extract_dimensions(r#"<html width="5" height="5"></html>"#),
            Dimensions::default()
        );
        assert_eq!(extract_dimensions("not xml at all"), Dimensions::default());
        assert_eq!(extract_dimensions(""), Dimensions::default());
    }

    #[test]
    fn test_ignores_dimensions_of_child_elements() {
        let svg = r#"<svg height="50"><rect width="999" height="999"/></svg>"#;
        let dims = extract_dimensions(svg);
        assert_eq!(dims.width, DEFAULT_DIMENSION);
        assert_eq!(dims.height, 50.0);
    }

    #[tokio::test]
    async fn test_read_dimensions_missing_file() {
        assert_eq!(
            read_dimensions(Path::new("/nonexistent/output.svg")).await,
            Dimensions::default()
        );
    }

    #[tokio::test]
    async fn test_read_dimensions_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.svg");
        std::fs::write(&path, r#"<svg width="832px" height="416"/>"#).unwrap();

        let dims = read_dimensions(&path).await;
        assert_eq!(dims.width, 832.0);
        assert_eq!(dims.height, 416.0);
    }
}
