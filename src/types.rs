use serde::{Deserialize, Serialize};

/// Variant tag of a list element. Decides rendering labels and how re-rating works.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Movie,
    Show,
    Book,
    Article,
    #[default]
    Generic,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Movie => "movie",
            ElementKind::Show => "show",
            ElementKind::Book => "book",
            ElementKind::Article => "article",
            ElementKind::Generic => "generic",
        }
    }

    /// Unknown tags fall back to `Generic` so old rows still load.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "movie" => ElementKind::Movie,
            "show" => ElementKind::Show,
            "book" => ElementKind::Book,
            "article" => ElementKind::Article,
            _ => ElementKind::Generic,
        }
    }

    /// Whether re-rating asks the element's source for a fresh rating.
    pub fn rerates_from_source(&self) -> bool {
        !matches!(self, ElementKind::Generic)
    }
}

/// Which status buckets `load_all` should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusFilter {
    pub include_viewed: bool,
    pub include_active: bool,
    pub include_removed: bool,
}

impl StatusFilter {
    pub const ACTIVE: StatusFilter = StatusFilter { include_viewed: false, include_active: true, include_removed: false };
    pub const VIEWED: StatusFilter = StatusFilter { include_viewed: true, include_active: false, include_removed: false };
    pub const REMOVED: StatusFilter = StatusFilter { include_viewed: false, include_active: false, include_removed: true };
    pub const ALL: StatusFilter = StatusFilter { include_viewed: true, include_active: true, include_removed: true };

    pub fn admits(&self, was_viewed: bool, was_removed: bool) -> bool {
        let active = !was_viewed && !was_removed;
        (self.include_active && active)
            || (self.include_viewed && was_viewed)
            || (self.include_removed && was_removed)
    }
}

/// A single persisted field change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field {
    WasViewed(bool),
    WasRemoved(bool),
    Rating(f64),
}

impl Field {
    pub fn column(&self) -> &'static str {
        match self {
            Field::WasViewed(_) => "was_viewed",
            Field::WasRemoved(_) => "was_removed",
            Field::Rating(_) => "rating",
        }
    }
}
