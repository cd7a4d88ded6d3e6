//! Best-effort structured parsing of model output.
//!
//! Models are asked for a bare JSON object but routinely wrap it in prose or
//! code fences. The parse finds the first balanced `{...}` in the text; when
//! that fails the fixed fallback result is returned, treated as a successful
//! low-confidence analysis.

use tracing::warn;

use dealcoach_core::AnalysisResult;

/// Slice out the first balanced JSON object in `text`, aware of strings and
/// escape sequences so braces inside quoted values don't confuse the scan.
pub fn extract_first_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse a model response into an [`AnalysisResult`], falling back to the
/// fixed default when no well-formed JSON object is present.
pub fn parse_analysis(response_text: &str) -> AnalysisResult {
    if let Some(json) = extract_first_json(response_text) {
        match serde_json::from_str::<AnalysisResult>(json) {
            Ok(result) => return result,
            Err(e) => {
                warn!(error = %e, "Model JSON did not match expected shape, using fallback");
            }
        }
    } else {
        warn!("No JSON object found in model response, using fallback");
    }
    AnalysisResult::fallback()
}
