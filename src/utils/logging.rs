// Logging utilities
// Structured logging with JSON and human-readable formats

use log::Level;
use serde_json::json;

/// Mask an identifier (ID number, member id) for logs: first and last 2 chars survive.
pub fn mask_sensitive(input: &str) -> String {
    let chars: Vec<char> = input.trim().chars().collect();
    if chars.len() <= 6 {
        return "***".to_string();
    }
    let start: String = chars[..2].iter().collect();
    let end: String = chars[chars.len() - 2..].iter().collect();
    format!("{}...{}", start, end)
}

/// Describe a field value without revealing it: `<empty>`, `<data-url 12345 chars>`, `<8 chars>`.
pub fn describe_value(value: &str) -> String {
    let v = value.trim();
    if v.is_empty() {
        "<empty>".to_string()
    } else if v.starts_with("data:") {
        format!("<data-url {} chars>", v.len())
    } else {
        format!("<{} chars>", v.chars().count())
    }
}

/// Parse phase and step from log message
/// Extracts [PHASE: ...] and [STEP: ...] patterns
pub fn parse_log_metadata(message: &str) -> (Option<String>, Option<String>, String) {
    let (phase, rest) = extract_tag(message, "[PHASE:");
    let (step, rest) = extract_tag(&rest, "[STEP:");
    (phase, step, rest)
}

fn extract_tag(message: &str, open: &str) -> (Option<String>, String) {
    let Some(start) = message.find(open) else {
        return (None, message.to_string());
    };
    let Some(len) = message[start..].find(']') else {
        return (None, message.to_string());
    };
    let value = message[start + open.len()..start + len].trim().to_string();
    let cleaned = format!("{} {}", &message[..start], &message[start + len + 1..])
        .trim()
        .to_string();
    (Some(value), cleaned)
}

/// Format log entry as JSON for structured logging
pub fn format_json_log(
    timestamp: &str,
    level: Level,
    target: &str,
    message: &str,
    phase: Option<&str>,
    step: Option<&str>,
) -> String {
    let mut log_entry = json!({
        "timestamp": timestamp,
        "level": level.as_str(),
        "target": target,
        "message": message,
    });

    if let Some(phase) = phase {
        log_entry["phase"] = json!(phase);
    }

    if let Some(step) = step {
        log_entry["step"] = json!(step);
    }

    serde_json::to_string(&log_entry).unwrap_or_else(|_| "{}".to_string())
}

/// Format log entry as human-readable text
pub fn format_human_readable_log(
    timestamp: &str,
    level: Level,
    target: &str,
    message: &str,
    phase: Option<&str>,
    step: Option<&str>,
) -> String {
    let mut log_line = format!("[{}] [{}]", timestamp, level.as_str());

    if let Some(phase) = phase {
        log_line.push_str(&format!(" [PHASE: {}]", phase));
    }

    if let Some(step) = step {
        log_line.push_str(&format!(" [STEP: {}]", step));
    }

    log_line.push_str(&format!(" [{}] {}", target, message));
    log_line
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Masking (no field values in logs)
    // -------------------------------------------------------------------------

    #[test]
    fn mask_sensitive_hides_middle_of_id_numbers() {
        let masked = mask_sensitive("67-657432D45");
        assert_eq!(masked, "67...45");
        assert!(!masked.contains("657432"), "ID digits leaked: {}", masked);
    }

    #[test]
    fn mask_sensitive_short_values_fully_masked() {
        assert_eq!(mask_sensitive("abc"), "***");
        assert_eq!(mask_sensitive("TM-4K9"), "***");
    }

    #[test]
    fn mask_sensitive_is_char_boundary_safe() {
        let masked = mask_sensitive("Zvinoitwa-ŵŵŵŵ");
        assert!(masked.ends_with("ŵŵ"), "got {}", masked);
    }

    #[test]
    fn describe_value_never_echoes_content() {
        assert_eq!(describe_value("  "), "<empty>");
        assert_eq!(describe_value("Tendai"), "<6 chars>");
        assert!(describe_value("data:application/pdf;base64,AAAA").starts_with("<data-url"));
    }

    // -------------------------------------------------------------------------
    // Metadata parsing and formatting
    // -------------------------------------------------------------------------

    #[test]
    fn parse_extracts_phase_and_step() {
        let (phase, step, msg) =
            parse_log_metadata("[PHASE: wizard] [STEP: submit] entity=miner generation=2");
        assert_eq!(phase.as_deref(), Some("wizard"));
        assert_eq!(step.as_deref(), Some("submit"));
        assert_eq!(msg, "entity=miner generation=2");
    }

    #[test]
    fn parse_without_tags_keeps_message() {
        let (phase, step, msg) = parse_log_metadata("plain message");
        assert!(phase.is_none());
        assert!(step.is_none());
        assert_eq!(msg, "plain message");
    }

    #[test]
    fn parse_tolerates_unclosed_tag() {
        let (phase, _, msg) = parse_log_metadata("[PHASE: wizard oops");
        assert!(phase.is_none());
        assert_eq!(msg, "[PHASE: wizard oops");
    }

    #[test]
    fn json_log_is_one_parseable_line() {
        let line = format_json_log(
            "2025-01-01T00:00:00Z",
            Level::Info,
            "mineops_wizard::wizard",
            "confirmed",
            Some("wizard"),
            Some("complete"),
        );
        let v: serde_json::Value = serde_json::from_str(&line).expect("json");
        assert_eq!(v["phase"], "wizard");
        assert_eq!(v["level"], "INFO");
        assert!(!line.contains('\n'));
    }

    #[test]
    fn human_log_reinserts_tags() {
        let line = format_human_readable_log("t", Level::Warn, "x", "msg", Some("host"), None);
        assert_eq!(line, "[t] [WARN] [PHASE: host] [x] msg");
    }
}
