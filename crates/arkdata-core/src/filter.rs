use arkdata_schema::AbInfo;
use std::collections::HashSet;

/// What the syncer does with one entry of the new hot-update list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Matched an always pattern.
    Always,
    /// Matched a skip pattern.
    Skip,
    /// Same name and hash as in the old list.
    Unchanged,
    /// New or changed entry.
    Changed,
}

impl Decision {
    pub fn downloads(self) -> bool {
        matches!(self, Decision::Always | Decision::Changed)
    }
}

/// Substring patterns forcing or suppressing bundle downloads.
///
/// Evaluation order is fixed: always, then skip, then the old-list check.
/// Empty patterns never match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadFilter {
    always: Vec<String>,
    skip: Vec<String>,
}

fn split_patterns(list: &str) -> Vec<String> {
    list.split(';')
        .filter(|p| !p.is_empty())
        .map(str::to_owned)
        .collect()
}

impl DownloadFilter {
    pub fn new<A, S>(always: A, skip: S) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        Self {
            always: always
                .into_iter()
                .map(Into::<String>::into)
                .filter(|p| !p.is_empty())
                .collect(),
            skip: skip
                .into_iter()
                .map(Into::<String>::into)
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Build from `;`-separated pattern lists.
    pub fn parse(always: &str, skip: &str) -> Self {
        Self {
            always: split_patterns(always),
            skip: split_patterns(skip),
        }
    }

    pub fn has_always(&self) -> bool {
        !self.always.is_empty()
    }

    pub fn is_always(&self, name: &str) -> bool {
        self.always.iter().any(|p| name.contains(p.as_str()))
    }

    pub fn is_skipped(&self, name: &str) -> bool {
        self.skip.iter().any(|p| name.contains(p.as_str()))
    }

    /// Classify `entry` against the filter and the old list's `(name, hash)` set.
    pub fn decide(&self, entry: &AbInfo, old: &HashSet<(&str, &str)>) -> Decision {
        if self.is_always(&entry.name) {
            Decision::Always
        } else if self.is_skipped(&entry.name) {
            Decision::Skip
        } else if old.contains(&(entry.name.as_str(), entry.hash.as_str())) {
            Decision::Unchanged
        } else {
            Decision::Changed
        }
    }
}
