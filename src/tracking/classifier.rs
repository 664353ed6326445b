/// Decides whether the active context (usually a domain) is a known distraction.
pub struct DistractionList {
    domains: Vec<String>,
}

impl DistractionList {
    pub fn new(domains: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            domains: domains
                .into_iter()
                .map(|v| v.into().to_lowercase())
                .filter(|v| !v.is_empty())
                .collect(),
        }
    }

    pub fn is_distraction(&self, context: &str) -> bool {
        let context = context.to_lowercase();
        self.domains.iter().any(|d| context.contains(d.as_str()))
    }

    /// Unknown context is counted as productive.
    pub fn is_productive(&self, context: Option<&str>) -> bool {
        !context.is_some_and(|v| self.is_distraction(v))
    }
}

#[cfg(test)]
mod tests {
    use super::DistractionList;

    #[test]
    fn test_matches_subdomains_and_case() {
        let list = DistractionList::new(["youtube.com", "reddit.com"]);
        assert!(list.is_distraction("www.YouTube.com"));
        assert!(list.is_distraction("old.reddit.com"));
        assert!(!list.is_distraction("docs.rs"));
    }

    #[test]
    fn test_unknown_context_is_productive() {
        let list = DistractionList::new(["youtube.com"]);
        assert!(list.is_productive(None));
        assert!(list.is_productive(Some("github.com")));
        assert!(!list.is_productive(Some("youtube.com")));
    }

    #[test]
    fn test_empty_entries_are_ignored() {
        let list = DistractionList::new([""]);
        assert!(!list.is_distraction("anything"));
    }
}
