use std::collections::HashMap;

use serde::Serialize;

use crate::issues::Issue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct OverallStat {
    pub total_issues: u64,
    pub closed_issues: u64,
}

impl OverallStat {
    pub fn open_issues(&self) -> u64 {
        self.total_issues.saturating_sub(self.closed_issues)
    }

    /// Rounded completion percentage, or `None` when there is nothing to measure.
    pub fn percent_complete(&self) -> Option<u8> {
        if self.total_issues == 0 {
            return None;
        }
        let ratio = self.closed_issues as f64 / self.total_issues as f64;
        Some((ratio * 100.0).round().clamp(0.0, 100.0) as u8)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagStat {
    pub name: String,
    pub total: u64,
    pub closed: u64,
}

impl TagStat {
    pub fn open(&self) -> u64 {
        self.total.saturating_sub(self.closed)
    }

    /// Share of this tag's own issues that are closed, in `0.0..=1.0`.
    pub fn closed_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.closed as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Aggregation {
    pub overall: OverallStat,
    pub tags: Vec<TagStat>,
}

impl Aggregation {
    pub fn is_empty(&self) -> bool {
        self.overall.total_issues == 0
    }

    pub fn tag_names(&self) -> Vec<&str> {
        self.tags.iter().map(|tag| tag.name.as_str()).collect()
    }
}

/// Reduces an issue list into overall and per-tag counts.
///
/// Tags are emitted in order of first occurrence across the list. A label repeated
/// on the same issue counts once per occurrence.
pub fn aggregate(issues: &[Issue]) -> Aggregation {
    let mut overall = OverallStat::default();
    let mut tags: Vec<TagStat> = Vec::new();
    let mut index_by_name: HashMap<&str, usize> = HashMap::new();

    for issue in issues {
        let closed = issue.state.is_closed();
        overall.total_issues += 1;
        if closed {
            overall.closed_issues += 1;
        }

        for label in &issue.labels {
            let index = *index_by_name.entry(label.name.as_str()).or_insert_with(|| {
                tags.push(TagStat {
                    name: label.name.clone(),
                    total: 0,
                    closed: 0,
                });
                tags.len() - 1
            });
            let tag = &mut tags[index];
            tag.total += 1;
            if closed {
                tag.closed += 1;
            }
        }
    }

    Aggregation { overall, tags }
}

#[cfg(test)]
mod tests {
    use crate::issues::IssueState;
    use crate::test_support::issue;

    use super::*;

    fn fixture() -> Vec<Issue> {
        vec![
            issue(1, IssueState::Closed, &["bug"]),
            issue(2, IssueState::Open, &["bug", "docs"]),
            issue(3, IssueState::Closed, &["docs"]),
        ]
    }

    #[test]
    fn aggregates_overall_and_per_tag_counts() {
        let aggregation = aggregate(&fixture());

        assert_eq!(
            aggregation.overall,
            OverallStat {
                total_issues: 3,
                closed_issues: 2,
            }
        );
        assert_eq!(aggregation.overall.percent_complete(), Some(67));
        assert_eq!(
            aggregation.tags,
            vec![
                TagStat {
                    name: "bug".to_owned(),
                    total: 2,
                    closed: 1,
                },
                TagStat {
                    name: "docs".to_owned(),
                    total: 2,
                    closed: 1,
                },
            ]
        );
    }

    #[test]
    fn empty_issue_list_yields_no_data() {
        let aggregation = aggregate(&[]);

        assert!(aggregation.is_empty());
        assert_eq!(aggregation.overall, OverallStat::default());
        assert!(aggregation.tags.is_empty());
        assert_eq!(aggregation.overall.percent_complete(), None);
    }

    #[test]
    fn tag_order_follows_first_occurrence_not_alphabet() {
        let issues = vec![
            issue(1, IssueState::Open, &["zeta"]),
            issue(2, IssueState::Open, &["alpha", "zeta"]),
            issue(3, IssueState::Closed, &["mid"]),
        ];

        assert_eq!(aggregate(&issues).tag_names(), ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn duplicate_labels_count_per_occurrence() {
        let issues = vec![issue(1, IssueState::Closed, &["bug", "bug"])];

        let aggregation = aggregate(&issues);

        assert_eq!(aggregation.overall.total_issues, 1);
        assert_eq!(aggregation.tags.len(), 1);
        assert_eq!(aggregation.tags[0].total, 2);
        assert_eq!(aggregation.tags[0].closed, 2);
    }

    #[test]
    fn untagged_issues_count_toward_overall_only() {
        let issues = vec![
            issue(1, IssueState::Closed, &[]),
            issue(2, IssueState::Open, &[]),
        ];

        let aggregation = aggregate(&issues);

        assert_eq!(aggregation.overall.total_issues, 2);
        assert_eq!(aggregation.overall.closed_issues, 1);
        assert!(aggregation.tags.is_empty());
    }

    #[test]
    fn totals_do_not_depend_on_issue_order() {
        let mut reversed = fixture();
        reversed.reverse();

        let forward = aggregate(&fixture());
        let backward = aggregate(&reversed);

        assert_eq!(forward.overall, backward.overall);
        for tag in &forward.tags {
            let other = backward
                .tags
                .iter()
                .find(|candidate| candidate.name == tag.name)
                .expect("tag should exist in both orders");
            assert_eq!((tag.total, tag.closed), (other.total, other.closed));
        }
        assert_eq!(backward.tag_names(), ["docs", "bug"]);
    }

    #[test]
    fn closed_never_exceeds_total() {
        let issues = vec![
            issue(1, IssueState::Closed, &["a", "b", "a"]),
            issue(2, IssueState::Open, &["b"]),
            issue(3, IssueState::Closed, &[]),
            issue(4, IssueState::Open, &["c", "a"]),
        ];

        let aggregation = aggregate(&issues);

        assert!(aggregation.overall.closed_issues <= aggregation.overall.total_issues);
        for tag in &aggregation.tags {
            assert!(tag.total > 0);
            assert!(tag.closed <= tag.total, "{tag:?}");
        }
    }

    #[test]
    fn percent_complete_rounds_half_up() {
        let half = OverallStat {
            total_issues: 8,
            closed_issues: 1,
        };
        let all = OverallStat {
            total_issues: 4,
            closed_issues: 4,
        };

        assert_eq!(half.percent_complete(), Some(13));
        assert_eq!(all.percent_complete(), Some(100));
        assert_eq!(all.open_issues(), 0);
    }
}
