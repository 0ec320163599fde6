use std::fmt;

use serde::{Deserialize, Serialize};

/// Which registry index a search goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchKind {
    Skill,
    Location,
    WorkType,
    Niche,
}

impl SearchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchKind::Skill => "skill",
            SearchKind::Location => "location",
            SearchKind::WorkType => "work_type",
            SearchKind::Niche => "niche",
        }
    }

    /// View function that backs this search.
    pub fn function(&self) -> &'static str {
        match self {
            SearchKind::Skill => "search_by_skill",
            SearchKind::Location => "search_by_location",
            SearchKind::WorkType => "search_by_work_type",
            SearchKind::Niche => "search_by_niche",
        }
    }
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub kind: SearchKind,
    pub text: String,
    /// Only meaningful for [`SearchKind::Skill`].
    pub min_proficiency: u8,
}

impl SearchQuery {
    pub fn new(kind: SearchKind, text: &str) -> Self {
        Self {
            kind,
            text: text.to_string(),
            min_proficiency: 0,
        }
    }

    pub fn skill(text: &str, min_proficiency: u8) -> Self {
        Self {
            kind: SearchKind::Skill,
            text: text.to_string(),
            min_proficiency,
        }
    }

    /// Text as it is sent to the registry.
    pub fn remote_text(&self) -> &str {
        self.text.trim()
    }

    pub fn key(&self) -> SearchKey {
        SearchKey {
            kind: self.kind,
            text: self.remote_text().to_string(),
            min_proficiency: match self.kind {
                SearchKind::Skill => self.min_proficiency,
                _ => 0,
            },
        }
    }
}

/// Cache key for one search's result IDs.
///
/// Built from the same trimmed text the registry receives, so `"Rust "` and
/// `"Rust"` share an entry while `"Rust"` and `"rust"` do not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchKey {
    kind: SearchKind,
    text: String,
    min_proficiency: u8,
}

impl fmt::Display for SearchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.kind, self.text, self.min_proficiency)
    }
}

/// What [`super::CardCaches::clear`] removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheScope {
    All,
    Cards,
    Owners,
    Searches,
    Admins,
    /// Card count and platform stats.
    Singletons,
}
