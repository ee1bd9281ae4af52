use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Serialize, Deserialize, PartialEq, Debug, Default)]
pub struct RawSourceMap {
    pub version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<Value>,
    pub sources: Option<Vec<Option<String>>>,
    #[serde(rename = "sourceRoot", skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
    #[serde(rename = "sourcesContent", skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<Option<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub names: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mappings: Option<String>,
}

/// Just enough of a document to tell whether something is a source map.
#[derive(Deserialize)]
pub struct MinimalRawSourceMap {
    pub version: Option<u32>,
    pub sources: Option<IgnoredAny>,
    pub names: Option<IgnoredAny>,
    pub mappings: Option<IgnoredAny>,
}

#[test]
fn test_missing_content_marker_survives_roundtrip() {
    let raw: RawSourceMap = serde_json::from_str(
        r#"{"version":3,"sources":["a.js","b.js"],"sourcesContent":[null,""],"mappings":""}"#,
    )
    .unwrap();
    assert_eq!(
        raw.sources_content,
        Some(vec![None, Some("".to_string())])
    );
    let out = serde_json::to_string(&raw).unwrap();
    assert!(out.contains(r#""sourcesContent":[null,""]"#));
}
