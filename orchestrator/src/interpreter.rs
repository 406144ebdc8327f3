//! Result interpretation
//!
//! Tool results come back from the engine as a string that usually holds a
//! JSON document, which in turn may hold another JSON document as a string.
//! Everything about that nesting is handled here, once. The interpreter is
//! total: malformed input degrades to opaque text and never fails.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Severity of a single finding
///
/// Known values are matched case-sensitively; anything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    Minor,
    Moderate,
    Severe,
    Other(String),
}

impl Severity {
    pub fn as_str(&self) -> &str {
        match self {
            Severity::Minor => "Minor",
            Severity::Moderate => "Moderate",
            Severity::Severe => "Severe",
            Severity::Other(s) => s,
        }
    }

    /// Whether this is one of the three recognised levels
    pub fn is_known(&self) -> bool {
        !matches!(self, Severity::Other(_))
    }
}

impl From<String> for Severity {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Minor" => Severity::Minor,
            "Moderate" => Severity::Moderate,
            "Severe" => Severity::Severe,
            _ => Severity::Other(s),
        }
    }
}

impl From<&str> for Severity {
    fn from(s: &str) -> Self {
        Severity::from(s.to_string())
    }
}

impl From<Severity> for String {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected defect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub label: String,
    pub severity: Severity,
    /// Fraction in `[0, 1]`
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Normalized outcome of a completed step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizedResult {
    /// Raw or unstructured text
    Opaque { text: String },
    /// Structured damage assessment
    DamageAnalysis {
        findings: Vec<Finding>,
        annotated_image_urls: Vec<String>,
    },
}

impl NormalizedResult {
    pub fn opaque(text: impl Into<String>) -> Self {
        NormalizedResult::Opaque { text: text.into() }
    }

    pub fn findings(&self) -> &[Finding] {
        match self {
            NormalizedResult::DamageAnalysis { findings, .. } => findings,
            NormalizedResult::Opaque { .. } => &[],
        }
    }

    pub fn annotated_image_urls(&self) -> &[String] {
        match self {
            NormalizedResult::DamageAnalysis {
                annotated_image_urls,
                ..
            } => annotated_image_urls,
            NormalizedResult::Opaque { .. } => &[],
        }
    }
}

const UNKNOWN: &str = "unknown";

/// Turns raw engine payloads into [`NormalizedResult`]s
#[derive(Debug, Clone)]
pub struct ResultInterpreter {
    artifact_base_url: String,
}

impl ResultInterpreter {
    /// Create an interpreter that resolves annotated images against `artifact_base_url`
    pub fn new(artifact_base_url: impl Into<String>) -> Self {
        let base: String = artifact_base_url.into();
        Self {
            artifact_base_url: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn artifact_base_url(&self) -> &str {
        &self.artifact_base_url
    }

    /// Interpret the raw payload of one step
    ///
    /// Returns `None` when there is nothing to attach.
    pub fn interpret(&self, raw: Option<&str>) -> Option<NormalizedResult> {
        let raw = raw?;
        if raw.trim().is_empty() {
            return None;
        }

        let document = match decode_document(raw) {
            Some(document) => document,
            None => {
                tracing::debug!("Tool result is not JSON, keeping it as text");
                return Some(NormalizedResult::opaque(raw));
            }
        };

        Some(self.interpret_document(&document))
    }

    fn interpret_document(&self, document: &Value) -> NormalizedResult {
        let result = match document.get("result") {
            None | Some(Value::Null) => return NormalizedResult::opaque(document.to_string()),
            Some(Value::String(s)) if s.is_empty() || s == "null" => {
                return NormalizedResult::opaque(document.to_string())
            }
            Some(Value::Object(map)) if map.is_empty() => {
                return NormalizedResult::opaque(document.to_string())
            }
            Some(Value::Array(items)) if items.is_empty() => {
                return NormalizedResult::opaque(document.to_string())
            }
            Some(result) => result,
        };

        if let Some(entries) = analysis_entries(result) {
            return self.damage_analysis(&entries);
        }

        match result {
            Value::String(text) => NormalizedResult::opaque(text.clone()),
            other => NormalizedResult::opaque(other.to_string()),
        }
    }

    fn damage_analysis(&self, entries: &[Value]) -> NormalizedResult {
        let mut findings = Vec::new();
        let mut annotated_image_urls = Vec::new();

        for entry in entries {
            let entry_notes = non_empty_str(entry.get("notes"));

            if let Some(damages) = entry.get("damages").and_then(Value::as_array) {
                findings.extend(
                    damages
                        .iter()
                        .map(|damage| finding_from(damage, entry_notes.as_deref())),
                );
            }

            if let Some(path) = non_empty_str(entry.get("annotated_output")) {
                annotated_image_urls.push(self.artifact_url(&path));
            }
        }

        NormalizedResult::DamageAnalysis {
            findings,
            annotated_image_urls,
        }
    }

    /// Absolute URL for an artifact path reported by a tool
    pub fn artifact_url(&self, path: &str) -> String {
        let path = path.replace('\\', "/");
        if path.starts_with("http://") || path.starts_with("https://") {
            return path;
        }
        format!(
            "{}/{}",
            self.artifact_base_url,
            path.trim_start_matches('/')
        )
    }
}

/// Decode a payload, unwrapping one extra layer of string encoding if present
fn decode_document(raw: &str) -> Option<Value> {
    let document: Value = serde_json::from_str(raw).ok()?;
    if let Value::String(inner) = &document {
        if let Ok(nested @ Value::Object(_)) = serde_json::from_str::<Value>(inner) {
            return Some(nested);
        }
    }
    Some(document)
}

/// The `analysis` sequence of a result, whether inline or string-encoded
fn analysis_entries(result: &Value) -> Option<Vec<Value>> {
    match result {
        Value::Object(map) => map.get("analysis").and_then(Value::as_array).cloned(),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => map.get("analysis").and_then(Value::as_array).cloned(),
            _ => None,
        },
        _ => None,
    }
}

fn finding_from(damage: &Value, entry_notes: Option<&str>) -> Finding {
    let label = non_empty_str(damage.get("label")).unwrap_or_else(|| UNKNOWN.to_string());
    let severity = match damage.get("severity") {
        Some(Value::String(s)) => Severity::from(s.as_str()),
        Some(Value::Null) | None => Severity::Other(UNKNOWN.to_string()),
        Some(other) => Severity::Other(other.to_string()),
    };
    let notes = non_empty_str(damage.get("notes")).or_else(|| entry_notes.map(str::to_string));

    Finding {
        label,
        severity,
        confidence: confidence_from(damage.get("confidence")),
        notes,
    }
}

fn confidence_from(value: Option<&Value>) -> f64 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match raw {
        Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
        _ => 0.0,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn interpreter() -> ResultInterpreter {
        ResultInterpreter::new("http://files.local:8000/")
    }

    fn damage_payload() -> String {
        json!({
            "result": {
                "session_id": "s-1",
                "analysis": [
                    {
                        "image": "images\\front.jpg",
                        "annotated_output": "a\\b\\c.png",
                        "damages": [
                            {"label": "dent", "severity": "Severe", "confidence": 0.92}
                        ],
                        "notes": "front bumper"
                    },
                    {
                        "image": "images/side.jpg",
                        "annotated_output": "outputs/side.jpg",
                        "damages": [
                            {"label": "scratch", "severity": "Minor", "confidence": 0.41}
                        ]
                    }
                ]
            }
        })
        .to_string()
    }

    #[test]
    fn test_absent_or_blank_payload() {
        let interpreter = interpreter();
        assert_eq!(interpreter.interpret(None), None);
        assert_eq!(interpreter.interpret(Some("")), None);
        assert_eq!(interpreter.interpret(Some("  \n\t")), None);
    }

    #[test]
    fn test_malformed_payload_is_opaque_verbatim() {
        let interpreter = interpreter();
        for raw in ["not json", "{\"result\": ", "<html>502</html>", "{'single': 'quotes'}"] {
            assert_eq!(
                interpreter.interpret(Some(raw)),
                Some(NormalizedResult::opaque(raw))
            );
        }
    }

    #[test]
    fn test_damage_analysis() {
        let result = interpreter().interpret(Some(&damage_payload())).unwrap();

        let findings = result.findings();
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].label, "dent");
        assert_eq!(findings[0].severity, Severity::Severe);
        assert_eq!(findings[0].confidence, 0.92);
        assert_eq!(findings[0].notes.as_deref(), Some("front bumper"));
        assert_eq!(findings[1].severity, Severity::Minor);
        assert_eq!(findings[1].notes, None);

        assert_eq!(
            result.annotated_image_urls(),
            &[
                "http://files.local:8000/a/b/c.png".to_string(),
                "http://files.local:8000/outputs/side.jpg".to_string(),
            ]
        );
    }

    #[test]
    fn test_double_encoded_payload() {
        let inner = damage_payload();
        let outer = serde_json::to_string(&inner).unwrap();

        let result = interpreter().interpret(Some(&outer)).unwrap();
        assert_eq!(result.findings().len(), 2);
    }

    #[test]
    fn test_string_encoded_result_field() {
        let analysis = json!({"analysis": [{"damages": [{"label": "crack", "severity": "Moderate", "confidence": 0.5}]}]});
        let payload = json!({"result": analysis.to_string()}).to_string();

        let result = interpreter().interpret(Some(&payload)).unwrap();
        assert_eq!(result.findings()[0].label, "crack");
        assert!(result.annotated_image_urls().is_empty());
    }

    #[test]
    fn test_null_marker_result_keeps_document() {
        let payload = r#"{"result": "null", "status": "done"}"#;
        let result = interpreter().interpret(Some(payload)).unwrap();

        match result {
            NormalizedResult::Opaque { text } => {
                let reparsed: Value = serde_json::from_str(&text).unwrap();
                assert_eq!(reparsed, json!({"result": "null", "status": "done"}));
            }
            other => panic!("expected opaque, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_result_keeps_document() {
        let interpreter = interpreter();

        for payload in [
            json!({"result": {}, "status": "done"}),
            json!({"result": [], "status": "done"}),
            json!({"result": "", "status": "done"}),
        ] {
            let result = interpreter.interpret(Some(&payload.to_string())).unwrap();
            match result {
                NormalizedResult::Opaque { text } => {
                    let reparsed: Value = serde_json::from_str(&text).unwrap();
                    assert_eq!(reparsed, payload);
                }
                other => panic!("expected opaque, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_missing_result_keeps_document() {
        let payload = r#"{"user_id": "U001", "status": "PENDING"}"#;
        let result = interpreter().interpret(Some(payload)).unwrap();

        match result {
            NormalizedResult::Opaque { text } => {
                let reparsed: Value = serde_json::from_str(&text).unwrap();
                assert_eq!(reparsed["status"], "PENDING");
            }
            other => panic!("expected opaque, got {:?}", other),
        }
    }

    #[test]
    fn test_textual_and_structural_results() {
        let interpreter = interpreter();

        let text = interpreter.interpret(Some(r#"{"result": "ticket created"}"#));
        assert_eq!(text, Some(NormalizedResult::opaque("ticket created")));

        let structural = interpreter
            .interpret(Some(r#"{"result": {"ticket_id": "TKT-1"}}"#))
            .unwrap();
        assert_eq!(
            structural,
            NormalizedResult::opaque(r#"{"ticket_id":"TKT-1"}"#)
        );
    }

    #[test]
    fn test_unknown_severity_passes_through() {
        let payload = json!({"result": {"analysis": [{"damages": [
            {"label": "dent", "severity": "severe", "confidence": 0.7},
            {"label": "rust", "severity": "Catastrophic", "confidence": 0.3}
        ]}]}})
        .to_string();

        let result = interpreter().interpret(Some(&payload)).unwrap();
        let findings = result.findings();
        assert_eq!(findings[0].severity, Severity::Other("severe".to_string()));
        assert!(!findings[0].severity.is_known());
        assert_eq!(findings[1].severity.as_str(), "Catastrophic");
    }

    #[test]
    fn test_confidence_is_a_fraction() {
        let payload = json!({"result": {"analysis": [{"damages": [
            {"label": "a", "severity": "Minor", "confidence": 1.7},
            {"label": "b", "severity": "Minor", "confidence": -0.2},
            {"label": "c", "severity": "Minor", "confidence": "0.25"},
            {"label": "d", "severity": "Minor"}
        ]}]}})
        .to_string();

        let result = interpreter().interpret(Some(&payload)).unwrap();
        let confidences: Vec<f64> = result.findings().iter().map(|f| f.confidence).collect();
        assert_eq!(confidences, vec![1.0, 0.0, 0.25, 0.0]);
    }

    #[test]
    fn test_entry_without_damages_or_output() {
        let payload = json!({"result": {"analysis": [
            {"image": "missing.jpg", "error": "file not found"}
        ]}})
        .to_string();

        let result = interpreter().interpret(Some(&payload)).unwrap();
        assert_eq!(
            result,
            NormalizedResult::DamageAnalysis {
                findings: vec![],
                annotated_image_urls: vec![],
            }
        );
    }

    #[test]
    fn test_artifact_url() {
        let interpreter = ResultInterpreter::new("http://localhost:8000");
        assert_eq!(
            interpreter.artifact_url("outputs\\car.jpg"),
            "http://localhost:8000/outputs/car.jpg"
        );
        assert_eq!(
            interpreter.artifact_url("/outputs/car.jpg"),
            "http://localhost:8000/outputs/car.jpg"
        );
        assert_eq!(
            interpreter.artifact_url("https://cdn.example.com/x.png"),
            "https://cdn.example.com/x.png"
        );
    }

    #[test]
    fn test_severity_serializes_as_raw_string() {
        let finding = Finding {
            label: "dent".to_string(),
            severity: Severity::Other("Extreme".to_string()),
            confidence: 0.5,
            notes: None,
        };
        let value = serde_json::to_value(&finding).unwrap();
        assert_eq!(value["severity"], "Extreme");

        let back: Finding = serde_json::from_value(json!({
            "label": "dent", "severity": "Moderate", "confidence": 0.5
        }))
        .unwrap();
        assert_eq!(back.severity, Severity::Moderate);
    }
}
