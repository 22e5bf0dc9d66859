use crate::config::DEFAULT_CATEGORY_KEYWORD;
use crate::model::Club;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClubFilter {
    /// Free text, stored trimmed and lower-cased.
    pub query: String,
    /// Only keep clubs mentioning the category keyword.
    pub category_only: bool,
}

impl ClubFilter {
    pub fn new(query: &str, category_only: bool) -> Self {
        Self {
            query: query.trim().to_lowercase(),
            category_only,
        }
    }
}

fn contains_ci(field: &Option<String>, needle_lower: &str) -> bool {
    field
        .as_deref()
        .is_some_and(|v| v.to_lowercase().contains(needle_lower))
}

/// Holds the fetched clubs and the subset currently visible under the filter.
///
/// `visible` is rebuilt on every change to the data or the filter, so reads never
/// see a stale list.
#[derive(Debug, Clone)]
pub struct ClubStore {
    all: Vec<Club>,
    visible: Vec<Club>,
    filter: ClubFilter,
    category_keyword: String,
}

impl Default for ClubStore {
    fn default() -> Self {
        Self::new(DEFAULT_CATEGORY_KEYWORD)
    }
}

impl ClubStore {
    pub fn new(category_keyword: &str) -> Self {
        Self {
            all: Vec::new(),
            visible: Vec::new(),
            filter: ClubFilter::default(),
            category_keyword: match category_keyword.trim() {
                "" => DEFAULT_CATEGORY_KEYWORD.to_string(),
                kw => kw.to_lowercase(),
            },
        }
    }

    /// Replaces the whole collection (no merge) and re-derives the visible list.
    pub fn set_data(&mut self, clubs: Vec<Club>) {
        self.all = clubs;
        self.recompute();
    }

    pub fn apply_filter(&mut self, query: &str, category_only: bool) {
        self.filter = ClubFilter::new(query, category_only);
        self.recompute();
    }

    pub fn matches(&self, club: &Club) -> bool {
        let q = &self.filter.query;
        let text_match = q.is_empty() || contains_ci(&club.name, q) || contains_ci(&club.slug, q);
        if !text_match {
            return false;
        }

        if self.filter.category_only {
            let kw = &self.category_keyword;
            return contains_ci(&club.slug, kw)
                || contains_ci(&club.name, kw)
                || contains_ci(&club.description, kw);
        }
        true
    }

    fn recompute(&mut self) {
        self.visible = self
            .all
            .iter()
            .filter(|c| self.matches(c))
            .cloned()
            .collect();
    }

    pub fn all(&self) -> &[Club] {
        &self.all
    }

    pub fn visible(&self) -> &[Club] {
        &self.visible
    }

    pub fn count(&self) -> usize {
        self.visible.len()
    }

    pub fn filter(&self) -> &ClubFilter {
        &self.filter
    }

    pub fn category_keyword(&self) -> &str {
        &self.category_keyword
    }

    pub fn get(&self, id: &str) -> Option<&Club> {
        self.all.iter().find(|c| c.id == id)
    }
}
