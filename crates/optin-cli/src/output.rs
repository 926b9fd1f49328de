//! Human and JSON output for CLI commands

use serde_json::{json, Value};

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }

    pub fn is_json(self) -> bool {
        self == OutputFormat::Json
    }

    /// Formatter writing in this format
    pub fn formatter(self) -> Box<dyn OutputFormatter> {
        match self {
            OutputFormat::Human => Box::new(HumanFormatter),
            OutputFormat::Json => Box::new(JsonFormatter),
        }
    }
}

/// Trait for formatting CLI output
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn info(&self, message: &str);
    /// One table row; columns are padded to the given widths
    fn row(&self, columns: &[(&str, usize)]);
    fn print_json(&self, value: &Value);
}

/// Human-readable output with check marks and aligned tables
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {}", message);
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {}", message);
    }
    fn info(&self, message: &str) {
        println!("  {}", message);
    }
    fn row(&self, columns: &[(&str, usize)]) {
        println!("  {}", format_row(columns));
    }
    fn print_json(&self, _value: &Value) {}
}

/// Machine-readable output; only `print_json` and errors are emitted
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!("{}", json!({ "success": true, "message": message }));
    }
    fn error(&self, message: &str) {
        eprintln!("{}", json!({ "success": false, "error": message }));
    }
    fn info(&self, _message: &str) {}
    fn row(&self, _columns: &[(&str, usize)]) {}
    fn print_json(&self, value: &Value) {
        println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
    }
}

/// Pads each column to its width; the last column is never padded
pub fn format_row(columns: &[(&str, usize)]) -> String {
    let mut line = String::new();
    for (i, (text, width)) in columns.iter().enumerate() {
        if i + 1 == columns.len() {
            line.push_str(text);
        } else {
            line.push_str(&format!("{:<width$} ", truncate(text, *width), width = width));
        }
    }
    line
}

/// Shortens `s` to at most `max` characters, marking the cut with "..."
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flag() {
        assert_eq!(OutputFormat::from_json_flag(true), OutputFormat::Json);
        assert!(!OutputFormat::from_json_flag(false).is_json());
    }

    #[test]
    fn test_format_row_pads_all_but_last() {
        assert_eq!(format_row(&[("ab", 4), ("c", 3), ("tail", 2)]), "ab   c   tail");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("this is a very long string", 15), "this is a ve...");
        assert_eq!(truncate("caf\u{e9} au lait", 6), "caf...");
    }
}
