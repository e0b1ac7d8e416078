use std::fs;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    #[serde(alias = "OPEN", alias = "Open")]
    Open,
    #[serde(alias = "CLOSED", alias = "Closed")]
    Closed,
}

impl IssueState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }

    pub fn is_closed(self) -> bool {
        self == Self::Closed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "LabelRepr")]
pub struct Label {
    pub name: String,
}

impl Label {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Snapshot files may list labels either as bare names or as `{ name: ... }` objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum LabelRepr {
    Name(String),
    Object { name: String },
}

impl From<LabelRepr> for Label {
    fn from(repr: LabelRepr) -> Self {
        match repr {
            LabelRepr::Name(name) | LabelRepr::Object { name } => Self { name },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: u64,
    pub state: IssueState,
    #[serde(default)]
    pub labels: Vec<Label>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IssueSnapshot {
    pub milestone: String,
    #[serde(default)]
    pub issues: Vec<Issue>,
}

/// Loads an offline issue list. YAML is a superset of JSON, so both formats parse here.
pub fn load_issue_snapshot(path: &Path) -> Result<IssueSnapshot> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read issue snapshot `{}`", path.display()))?;
    let snapshot = parse_issue_snapshot(&raw)
        .with_context(|| format!("failed to parse issue snapshot `{}`", path.display()))?;
    Ok(snapshot)
}

pub fn parse_issue_snapshot(raw: &str) -> Result<IssueSnapshot> {
    let mut snapshot = serde_yaml::from_str::<IssueSnapshot>(raw)?;
    snapshot.milestone = snapshot.milestone.trim().to_owned();
    ensure!(
        !snapshot.milestone.is_empty(),
        "snapshot milestone title cannot be empty"
    );
    for issue in &mut snapshot.issues {
        for label in &mut issue.labels {
            label.name = label.name.trim().to_owned();
        }
        issue.labels.retain(|label| !label.name.is_empty());
    }
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_yaml_snapshot_with_mixed_label_forms() {
        let raw = r#"
milestone: " v1.0 "
issues:
  - id: 1
    state: closed
    labels: [bug]
  - id: 2
    state: OPEN
    labels:
      - name: bug
      - docs
  - id: 3
    state: closed
"#;

        let snapshot = parse_issue_snapshot(raw).expect("snapshot should parse");

        assert_eq!(snapshot.milestone, "v1.0");
        assert_eq!(snapshot.issues.len(), 3);
        assert_eq!(snapshot.issues[1].state, IssueState::Open);
        assert_eq!(
            snapshot.issues[1].labels,
            vec![Label::new("bug"), Label::new("docs")]
        );
        assert!(snapshot.issues[2].labels.is_empty());
    }

    #[test]
    fn parses_json_snapshot() {
        let raw = r#"{
            "milestone": "beta",
            "issues": [{"id": 7, "state": "closed", "labels": [{"name": "ui"}]}]
        }"#;

        let snapshot = parse_issue_snapshot(raw).expect("json snapshot should parse");

        assert_eq!(snapshot.milestone, "beta");
        assert_eq!(snapshot.issues[0].id, 7);
        assert!(snapshot.issues[0].state.is_closed());
        assert_eq!(snapshot.issues[0].labels, vec![Label::new("ui")]);
    }

    #[test]
    fn drops_blank_label_names() {
        let raw = "milestone: m\nissues:\n  - id: 1\n    state: open\n    labels: [' ', ' bug ']\n";

        let snapshot = parse_issue_snapshot(raw).expect("snapshot should parse");

        assert_eq!(snapshot.issues[0].labels, vec![Label::new("bug")]);
    }

    #[test]
    fn rejects_blank_milestone_and_unknown_fields() {
        assert!(parse_issue_snapshot("milestone: '  '\n").is_err());
        assert!(parse_issue_snapshot("milestone: m\nextra: 1\n").is_err());
    }

    #[test]
    fn rejects_unknown_issue_state() {
        let raw = "milestone: m\nissues:\n  - id: 1\n    state: merged\n";
        assert!(parse_issue_snapshot(raw).is_err());
    }
}
