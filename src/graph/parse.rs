use std::fs;
use std::path::Path;

use clap::ValueEnum;

use super::dot::parse_dot;
use super::model::GraphPayload;
use crate::error::Result;

/// Source format for a graph payload file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum PayloadFormat {
    /// Pick by file extension (`.dot`/`.gv` are DOT, everything else JSON).
    #[default]
    Auto,
    Json,
    Dot,
}

impl PayloadFormat {
    fn resolve(self, path: &Path) -> Self {
        match self {
            Self::Auto => match path.extension().and_then(|ext| ext.to_str()) {
                Some("dot" | "gv") => Self::Dot,
                _ => Self::Json,
            },
            explicit => explicit,
        }
    }
}

pub fn parse_payload(raw: &str) -> Result<GraphPayload> {
    Ok(serde_json::from_str(raw)?)
}

pub fn load_payload(path: &Path, format: PayloadFormat) -> Result<GraphPayload> {
    let raw = fs::read_to_string(path)?;
    let payload = match format.resolve(path) {
        PayloadFormat::Dot => parse_dot(&raw)?,
        _ => parse_payload(&raw)?,
    };

    tracing::debug!(
        path = %path.display(),
        nodes = payload.node_count(),
        links = payload.edge_count(),
        "read graph payload"
    );
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;
    use crate::graph::model::NodeKind;

    #[test]
    fn parses_plain_payload() {
        let payload = parse_payload(
            r#"{"nodes":[{"id":"a.drv"},{"id":"b.sh"}],"links":[{"source":"a.drv","target":"b.sh"}]}"#,
        )
        .unwrap();
        assert_eq!(payload.nodes.len(), 2);
        assert_eq!(payload.nodes[0].kind, NodeKind::Derivation);
        assert_eq!(payload.nodes[1].kind, NodeKind::Script);
        assert_eq!(payload.links[0].source, "a.drv");
        assert_eq!(payload.links[0].target, "b.sh");
    }

    #[test]
    fn accepts_object_endpoints_and_extra_fields() {
        let payload = parse_payload(
            r#"{
                "nodes": [{"id": "a", "x": 1.5, "index": 0}, {"id": "b"}],
                "links": [{"source": {"id": "a", "x": 3}, "target": "b", "index": 0}]
            }"#,
        )
        .unwrap();
        assert_eq!(payload.links[0].source, "a");
        assert_eq!(payload.links[0].target, "b");
    }

    #[test]
    fn missing_collections_default_to_empty() {
        let payload = parse_payload("{}").unwrap();
        assert!(payload.is_empty());
        assert_eq!(payload.edge_count(), 0);
    }

    #[test]
    fn wrong_field_types_are_rejected() {
        let error = parse_payload(r#"{"nodes":[{"id":42}],"links":[]}"#).unwrap_err();
        assert!(matches!(error, GraphError::MalformedPayload(_)));
    }

    #[test]
    fn auto_format_uses_extension() {
        assert_eq!(
            PayloadFormat::Auto.resolve(Path::new("graph.dot")),
            PayloadFormat::Dot
        );
        assert_eq!(
            PayloadFormat::Auto.resolve(Path::new("graph.json")),
            PayloadFormat::Json
        );
        assert_eq!(
            PayloadFormat::Json.resolve(Path::new("graph.dot")),
            PayloadFormat::Json
        );
    }
}
