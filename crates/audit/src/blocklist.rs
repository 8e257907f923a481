use std::collections::HashSet;

/// Disposable / suspicious email domains, stored lowercase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blocklist {
    domains: HashSet<String>,
}

impl Blocklist {
    /// An empty list. Nothing is ever flagged as disposable.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a newline-delimited list. Lines are trimmed and lowercased;
    /// blank lines are ignored.
    pub fn parse(text: &str) -> Self {
        let domains = text
            .lines()
            .map(|line| line.trim().to_lowercase())
            .filter(|line| !line.is_empty())
            .collect();
        Self { domains }
    }

    /// Case-insensitive membership test.
    pub fn contains(&self, domain: &str) -> bool {
        self.domains.contains(&domain.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for Blocklist {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let domains = iter
            .into_iter()
            .map(|d| d.as_ref().trim().to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { domains }
    }
}
