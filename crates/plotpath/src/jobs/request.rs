use crate::cache::DEFAULT_PROMPT;

pub const DEFAULT_MAX_WIDTH_MM: f64 = 200.0;
pub const DEFAULT_MAX_HEIGHT_MM: f64 = 200.0;
pub const DEFAULT_TOOL_ON: &str = "S4 M0";
pub const DEFAULT_TOOL_OFF: &str = "S4 M100";

/// Normalized submission parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    pub max_width: f64,
    pub max_height: f64,
    pub tool_on: String,
    pub tool_off: String,
    pub use_ai: bool,
    pub prompt: String,
}

impl Default for JobRequest {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH_MM,
            max_height: DEFAULT_MAX_HEIGHT_MM,
            tool_on: DEFAULT_TOOL_ON.to_string(),
            tool_off: DEFAULT_TOOL_OFF.to_string(),
            use_ai: false,
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }
}

/// Submission parameters exactly as received.
#[derive(Debug, Clone, Default)]
pub struct RawJobRequest {
    pub max_width: Option<String>,
    pub max_height: Option<String>,
    pub tool_on: Option<String>,
    pub tool_off: Option<String>,
    pub use_ai: Option<String>,
    pub prompt: Option<String>,
}

impl From<RawJobRequest> for JobRequest {
    fn from(raw: RawJobRequest) -> Self {
        let defaults = JobRequest::default();
        Self {
            max_width: dimension_or(raw.max_width.as_deref(), defaults.max_width),
            max_height: dimension_or(raw.max_height.as_deref(), defaults.max_height),
            tool_on: text_or(raw.tool_on, defaults.tool_on),
            tool_off: text_or(raw.tool_off, defaults.tool_off),
            use_ai: matches!(raw.use_ai.as_deref().map(str::trim), Some("on" | "true")),
            prompt: text_or(raw.prompt, defaults.prompt),
        }
    }
}

fn dimension_or(value: Option<&str>, default: f64) -> f64 {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
        .unwrap_or(default)
}

fn text_or(value: Option<String>, default: String) -> String {
    value.filter(|v| !v.trim().is_empty()).unwrap_or(default)
}
