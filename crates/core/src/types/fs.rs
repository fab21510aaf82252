use serde::{Deserialize, Serialize};

/// Directory listing with subdirectories and files reported separately,
/// each in the order the server returned them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirListing {
    pub dirs: Vec<String>,
    pub files: Vec<String>,
}

/// Recursive text search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrepRequest {
    pub pattern: String,
    pub path: String,
    #[serde(default)]
    pub case_insensitive: bool,
    #[serde(default)]
    pub context_lines: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,
    #[serde(default)]
    pub exclude_dirs: Vec<String>,
    pub max_results: usize,
}

/// One grep match with surrounding context lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrepMatch {
    pub file: String,
    pub line: u64,
    pub text: String,
    #[serde(default)]
    pub context_before: Vec<String>,
    #[serde(default)]
    pub context_after: Vec<String>,
}

/// Entry type filter for find requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    File,
    Directory,
}

/// Recursive find-by-name request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindRequest {
    pub pattern: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_type: Option<EntryType>,
}

/// Kind of filesystem change reported by a watch subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FsEventKind {
    Created,
    Modified,
    Deleted,
}

/// One filesystem change event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FsEvent {
    pub kind: FsEventKind,
    pub path: String,
    /// File content at the time of the event, when the subscription asked
    /// for it. Never present for deletions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<u8>>,
}

/// Watch subscription request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchRequest {
    pub path: String,
    #[serde(default)]
    pub include_content: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_event_omits_absent_content() {
        let event = FsEvent {
            kind: FsEventKind::Deleted,
            path: "/app/old.txt".to_string(),
            content: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "deleted");
        assert!(json.get("content").is_none());
    }

    #[test]
    fn grep_request_roundtrip() {
        let req = GrepRequest {
            pattern: "TODO".to_string(),
            path: "/app".to_string(),
            case_insensitive: true,
            context_lines: 2,
            include: Some("*.rs".to_string()),
            exclude_dirs: vec!["target".to_string()],
            max_results: 50,
        };
        let json = serde_json::to_string(&req).unwrap();
        let back: GrepRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, req);
    }

    #[test]
    fn entry_type_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&EntryType::Directory).unwrap(),
            "\"directory\""
        );
    }
}
