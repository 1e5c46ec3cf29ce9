//! JSON output formatting

use std::io;

use serde::Serialize;

use crate::entry::EntryKind;
use crate::index::{FilteredProjection, NodeId};

use super::config::OutputConfig;

/// Serializable view of a projected node.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JsonNode {
    File {
        name: String,
        path: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        size_bytes: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        size_human: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        modified: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        kind: Option<EntryKind>,
        #[serde(skip_serializing_if = "Option::is_none")]
        key: Option<String>,
        #[serde(skip_serializing_if = "String::is_empty")]
        type_label: String,
    },
    Dir {
        name: String,
        path: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        size_bytes: Option<u64>,
        children: Vec<JsonNode>,
    },
}

impl JsonNode {
    /// The visible tree below and including `id`, honouring depth and
    /// dirs-only settings.
    pub fn build(projection: &FilteredProjection<'_>, id: NodeId, config: &OutputConfig) -> Self {
        Self::build_at(projection, id, config, 0)
    }

    fn build_at(
        projection: &FilteredProjection<'_>,
        id: NodeId,
        config: &OutputConfig,
        depth: usize,
    ) -> Self {
        let index = projection.index();
        let node = index.node(id);
        let name = node.display_name().to_string();
        let path = node.path().to_string();

        if node.is_dir() {
            let children = if config.shows_depth(depth + 1) {
                projection
                    .children(id)
                    .into_iter()
                    .filter(|&child| !config.dirs_only || projection.node(child).is_dir())
                    .map(|child| Self::build_at(projection, child, config, depth + 1))
                    .collect()
            } else {
                Vec::new()
            };
            return JsonNode::Dir {
                name,
                path,
                size_bytes: index.total_size(id),
                children,
            };
        }

        let entry = node.entry();
        JsonNode::File {
            name,
            path,
            size_bytes: index.total_size(id),
            size_human: entry.map(|_| index.size_label(id).to_string()),
            modified: entry.map(|_| index.date_label(id).to_string()),
            kind: entry.map(|e| e.kind()),
            key: node.secondary_key().map(str::to_string),
            type_label: node.type_label().to_string(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            JsonNode::File { name, .. } => name,
            JsonNode::Dir { name, .. } => name,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, JsonNode::Dir { .. })
    }
}

/// Print any serializable value as pretty-printed JSON to stdout.
pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{BatchItem, PathTreeIndex, TreeFilter, SortSpec};
    use crate::test_utils::{index_of, record_entry};

    #[test]
    fn test_json_structure() {
        let index = index_of(&["a/b.txt", "a/c.txt", "d.txt"]);
        let projection =
            FilteredProjection::new(&index, TreeFilter::substring("b"), SortSpec::default());
        let tree = JsonNode::build(&projection, NodeId::ROOT, &OutputConfig::default());
        let value = serde_json::to_value(&tree).unwrap();

        assert_eq!(value["type"], "dir");
        assert_eq!(value["name"], ".");
        let a = &value["children"][0];
        assert_eq!(a["type"], "dir");
        assert_eq!(a["path"], "a");
        assert_eq!(a["children"].as_array().unwrap().len(), 1);
        assert_eq!(a["children"][0]["type"], "file");
        assert_eq!(a["children"][0]["type_label"], ".txt");
        assert_eq!(a["children"][0]["size_bytes"], 10);
    }

    #[test]
    fn test_record_fields() {
        let mut index = PathTreeIndex::new();
        index
            .insert_batch(
                "ships",
                vec![BatchItem::new(0, record_entry("ships/aurora", "g-1", "Ship"))],
            )
            .unwrap();
        let projection = FilteredProjection::unfiltered(&index);
        let tree = JsonNode::build(&projection, NodeId::ROOT, &OutputConfig::default());
        let json = serde_json::to_string(&tree).unwrap();
        assert!(json.contains(r#""kind":"record""#));
        assert!(json.contains(r#""key":"g-1""#));
        assert!(json.contains(r#""type_label":"Ship""#));
    }

    #[test]
    fn test_depth_limit() {
        let index = index_of(&["a/b/c.txt"]);
        let projection = FilteredProjection::unfiltered(&index);
        let config = OutputConfig {
            max_depth: Some(1),
            ..OutputConfig::default()
        };
        let value = serde_json::to_value(JsonNode::build(&projection, NodeId::ROOT, &config)).unwrap();
        assert_eq!(value["children"][0]["name"], "a");
        assert!(value["children"][0]["children"].as_array().unwrap().is_empty());
    }
}
