use std::fmt;

use serde::Deserialize;

/// REST coordinate of an issue or pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl IssueRef {
    /// Build from a search hit's `repository_url`
    /// (`https://api.github.com/repos/{owner}/{repo}`) and its number.
    pub fn from_repository_url(url: &str, number: u64) -> Option<Self> {
        let mut segments = url.trim_end_matches('/').rsplit('/');
        let repo = segments.next().filter(|s| !s.is_empty())?;
        let owner = segments.next().filter(|s| !s.is_empty())?;
        Some(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            number,
        })
    }
}

impl fmt::Display for IssueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

/// One entry of `GET /search/issues`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub number: u64,
    pub title: String,
    pub repository_url: String,
    pub html_url: String,
}

impl SearchHit {
    pub fn issue_ref(&self) -> Option<IssueRef> {
        IssueRef::from_repository_url(&self.repository_url, self.number)
    }
}

/// Summary of content that was put on the board during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedItem {
    /// Board-scoped project item id
    pub item_id: String,
    pub title: String,
    pub url: String,
    /// False when the item landed on the board but the status update failed
    pub status_set: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_api_repository_url() {
        let r = IssueRef::from_repository_url("https://api.github.com/repos/acme/widgets", 42)
            .unwrap();
        assert_eq!(r.owner, "acme");
        assert_eq!(r.repo, "widgets");
        assert_eq!(r.number, 42);
        assert_eq!(r.to_string(), "acme/widgets#42");
    }

    #[test]
    fn tolerates_trailing_slash() {
        let r = IssueRef::from_repository_url("https://api.github.com/repos/acme/widgets/", 7)
            .unwrap();
        assert_eq!(r.to_string(), "acme/widgets#7");
    }

    #[test]
    fn rejects_urls_without_owner_and_repo() {
        assert!(IssueRef::from_repository_url("", 1).is_none());
        assert!(IssueRef::from_repository_url("widgets", 1).is_none());
        assert!(IssueRef::from_repository_url("https://api.github.com", 1).is_none());
    }

    #[test]
    fn search_hit_ignores_unknown_fields() {
        let json = r#"{
            "number": 42,
            "title": "Widgets explode",
            "state": "open",
            "repository_url": "https://api.github.com/repos/acme/widgets",
            "html_url": "https://github.com/acme/widgets/issues/42",
            "user": {"login": "octocat"}
        }"#;
        let hit: SearchHit = serde_json::from_str(json).unwrap();
        assert_eq!(hit.issue_ref().unwrap().to_string(), "acme/widgets#42");
    }
}
