//! Fix sub-protocol: decide which files to repair and with what context.

use crate::skills::artifact_registry::{CrossFileIssue, FileArtifact, FileSet, Issue, WebsiteReview};

/// One file to repair.
#[derive(Debug, Clone, PartialEq)]
pub struct FixTarget {
    pub path: String,
    pub original: String,
    /// Issues reported against this file
    pub issues: Vec<Issue>,
    /// Cross-file issues that list this file
    pub cross_file_issues: Vec<CrossFileIssue>,
    /// Other files named by those issues, shown read-only
    pub related: Vec<FileArtifact>,
}

/// Build one target per flagged file, in review order. Flagged paths that
/// are not part of the file set are skipped.
pub fn plan_fixes(files: &FileSet, review: &WebsiteReview) -> Vec<FixTarget> {
    let mut targets = Vec::new();

    for path in &review.files_with_issues {
        let Some(original) = files.get(path) else {
            tracing::warn!(%path, "Flagged file not found in generated files");
            continue;
        };
        if targets.iter().any(|t: &FixTarget| &t.path == path) {
            continue;
        }

        let issues = review.file_issues.get(path).cloned().unwrap_or_default();
        let cross_file_issues: Vec<CrossFileIssue> = review
            .cross_file_issues
            .iter()
            .filter(|issue| issue.affected_files.contains(path))
            .cloned()
            .collect();

        let mut related: Vec<FileArtifact> = Vec::new();
        for other in cross_file_issues.iter().flat_map(|i| i.affected_files.iter()) {
            if other == path || related.iter().any(|r| &r.path == other) {
                continue;
            }
            if let Some(content) = files.get(other) {
                related.push(FileArtifact::new(other, content));
            }
        }

        targets.push(FixTarget {
            path: path.clone(),
            original: original.to_string(),
            issues,
            cross_file_issues,
            related,
        });
    }

    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(value: serde_json::Value) -> WebsiteReview {
        serde_json::from_value(value).unwrap()
    }

    fn files() -> FileSet {
        let mut files = FileSet::new();
        files.insert("a.jsx", "A");
        files.insert("b.jsx", "B");
        files.insert("c.jsx", "C");
        files
    }

    #[test]
    fn test_single_flagged_file() {
        let review = review(serde_json::json!({
            "fileIssues": {"a.jsx": [{"type": "bug", "severity": "high", "description": "x"}]},
            "crossFileIssues": [],
            "filesWithIssues": ["a.jsx"],
            "needsRevision": true,
            "overallQuality": "fair"
        }));

        let targets = plan_fixes(&files(), &review);

        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].path, "a.jsx");
        assert_eq!(targets[0].original, "A");
        assert_eq!(targets[0].issues.len(), 1);
        assert!(targets[0].related.is_empty());
    }

    #[test]
    fn test_cross_file_context() {
        let review = review(serde_json::json!({
            "fileIssues": {},
            "crossFileIssues": [
                {"type": "bug", "severity": "high", "description": "import", "affectedFiles": ["a.jsx", "b.jsx"]},
                {"type": "ux", "severity": "low", "description": "style", "affectedFiles": ["c.jsx"]}
            ],
            "filesWithIssues": ["a.jsx", "b.jsx"],
            "needsRevision": true,
            "overallQuality": "fair"
        }));

        let targets = plan_fixes(&files(), &review);

        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].cross_file_issues.len(), 1);
        let related: Vec<&str> = targets[0].related.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(related, vec!["b.jsx"]);
        let related: Vec<&str> = targets[1].related.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(related, vec!["a.jsx"]);
    }

    #[test]
    fn test_unknown_path_skipped() {
        let review = review(serde_json::json!({
            "fileIssues": {"ghost.jsx": [{"description": "x"}]},
            "crossFileIssues": [],
            "filesWithIssues": ["ghost.jsx"],
            "needsRevision": true,
            "overallQuality": "poor"
        }));
        assert!(plan_fixes(&files(), &review).is_empty());
    }
}
