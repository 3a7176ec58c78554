use serde::Deserialize;

/// Query parameters attached to a frame submission. `ignore_person` is always
/// sent; the rest only when set.
#[derive(Debug, Clone, Default)]
pub struct FrameQuery {
    pub label: Option<String>,
    pub save: Option<bool>,
    pub force_save: Option<bool>,
    pub cooldown_ms: Option<u64>,
    pub ignore_person: bool,
}

impl FrameQuery {
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(label) = &self.label {
            pairs.push(("label", label.clone()));
        }
        if let Some(save) = self.save {
            pairs.push(("save", save.to_string()));
        }
        if let Some(force_save) = self.force_save {
            pairs.push(("force_save", force_save.to_string()));
        }
        if let Some(cooldown_ms) = self.cooldown_ms {
            pairs.push(("cooldown_ms", cooldown_ms.to_string()));
        }
        pairs.push(("ignore_person", self.ignore_person.to_string()));
        pairs
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LearnDebug {
    #[serde(rename = "box", default)]
    pub bbox: Option<[f64; 4]>,
}

/// Response body of `POST /learn/frame`. All fields are defaulted so a
/// raw-text fallback body (`{"raw": ...}`) still deserializes.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LearnResponse {
    pub saved: bool,
    pub reason: Option<String>,
    #[serde(rename = "box")]
    pub bbox: Option<[f64; 4]>,
    pub debug: Option<LearnDebug>,
    pub raw: Option<String>,
}

impl LearnResponse {
    /// The server reports the detection box either at the top level or under
    /// `debug`; prefer the debug one when both are present.
    pub fn detection_box(&self) -> Option<[f64; 4]> {
        self.debug.as_ref().and_then(|d| d.bbox).or(self.bbox)
    }
}

/// Response body of `POST /vision/frame`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RecognizeResponse {
    pub recognized: bool,
    pub label: Option<String>,
    pub score: Option<f64>,
    #[serde(rename = "box")]
    pub bbox: Option<[f64; 4]>,
    pub reason: Option<String>,
    pub raw: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServiceStats {
    pub total_events: u64,
    pub total_labels: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelCount {
    pub label: String,
    pub count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectionRow {
    pub id: i64,
    pub label: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub camera_id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DetectionPage {
    pub items: Vec<DetectionRow>,
    pub total: u64,
}

/// `GET /learned/summary`: `last` rows arrive as `[label, ts]` pairs.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LearnedSummary {
    pub top: Vec<LabelCount>,
    pub last: Vec<(String, String)>,
}

/// Query state for the paginated detection ledger.
#[derive(Debug, Clone, Default)]
pub struct DetectionFilter {
    pub page: u32,
    pub page_size: u32,
    pub label: Option<String>,
    pub last_minutes: u32,
}

impl DetectionFilter {
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("page_size", self.page_size.to_string()),
        ];
        if let Some(label) = self.label.as_deref().filter(|l| !l.is_empty()) {
            pairs.push(("label", label.to_string()));
        }
        if self.last_minutes > 0 {
            pairs.push(("last_minutes", self.last_minutes.to_string()));
        }
        pairs
    }

    /// Pairs for `GET /export.csv`, which takes only the filter portion.
    pub fn to_export_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(label) = self.label.as_deref().filter(|l| !l.is_empty()) {
            pairs.push(("label", label.to_string()));
        }
        if self.last_minutes > 0 {
            pairs.push(("last_minutes", self.last_minutes.to_string()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_query_always_carries_ignore_person() {
        let query = FrameQuery { ignore_person: true, ..Default::default() };
        let pairs = query.to_pairs();
        assert_eq!(pairs, vec![("ignore_person", "true".to_string())]);

        let query = FrameQuery {
            label: Some("mouse".to_string()),
            cooldown_ms: Some(1200),
            ignore_person: false,
            ..Default::default()
        };
        let pairs = query.to_pairs();
        assert!(pairs.contains(&("label", "mouse".to_string())));
        assert!(pairs.contains(&("cooldown_ms", "1200".to_string())));
        assert!(pairs.contains(&("ignore_person", "false".to_string())));
    }

    #[test]
    fn learn_response_prefers_debug_box() {
        let resp: LearnResponse = serde_json::from_str(
            r#"{"saved": true, "box": [1.0, 2.0, 3.0, 4.0], "debug": {"box": [5.0, 6.0, 7.0, 8.0]}}"#,
        )
        .unwrap();
        assert_eq!(resp.detection_box(), Some([5.0, 6.0, 7.0, 8.0]));

        let resp: LearnResponse =
            serde_json::from_str(r#"{"saved": false, "box": [1.0, 2.0, 3.0, 4.0]}"#).unwrap();
        assert_eq!(resp.detection_box(), Some([1.0, 2.0, 3.0, 4.0]));
    }

    #[test]
    fn raw_fallback_body_deserializes() {
        let resp: RecognizeResponse = serde_json::from_str(r#"{"raw": "<html>oops</html>"}"#).unwrap();
        assert!(!resp.recognized);
        assert_eq!(resp.raw.as_deref(), Some("<html>oops</html>"));
    }

    #[test]
    fn detection_filter_omits_empty_parts() {
        let filter = DetectionFilter { page: 2, page_size: 25, label: Some(String::new()), last_minutes: 0 };
        let pairs = filter.to_pairs();
        assert_eq!(pairs.len(), 2);
        assert!(filter.to_export_pairs().is_empty());
    }

    #[test]
    fn learned_summary_last_rows_are_pairs() {
        let summary: LearnedSummary = serde_json::from_str(
            r#"{"top": [{"label": "mouse", "count": 3}], "last": [["mouse", "2026-08-30T10:00:00"]]}"#,
        )
        .unwrap();
        assert_eq!(summary.top[0].count, 3);
        assert_eq!(summary.last[0].0, "mouse");
    }
}
