//! In-memory search, category filter and sort over an author's fetched articles.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Article;

pub const ALL_CATEGORIES: &str = "all";

/// Rows shown on the home view.
pub const RECENT_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    Title,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ArticleQuery {
    #[serde(default, rename = "q")]
    pub search: Option<String>,
    /// `all` (or absent) disables category filtering.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub sort: SortOrder,
}

impl ArticleQuery {
    fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    fn category_filter(&self) -> Option<&str> {
        self.category
            .as_deref()
            .filter(|c| !c.is_empty() && *c != ALL_CATEGORIES)
    }

    /// Derived view over `articles`; the input is left as fetched.
    pub fn apply(&self, articles: &[Article]) -> Vec<Article> {
        let term = self.search_term();
        let category = self.category_filter();
        let mut out: Vec<Article> = articles
            .iter()
            .filter(|a| match &term {
                Some(t) => a.title.to_lowercase().contains(t) || a.content.to_lowercase().contains(t),
                None => true,
            })
            .filter(|a| match category {
                Some(c) => a.category.as_deref() == Some(c),
                None => true,
            })
            .cloned()
            .collect();
        // sort_by is stable, equal keys keep their fetched order
        match self.sort {
            SortOrder::Newest => out.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortOrder::Oldest => out.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            SortOrder::Title => out.sort_by(|a, b| a.title.cmp(&b.title)),
        }
        out
    }
}

/// Options for the category control: `all` first, then each category in first-seen order.
pub fn categories(articles: &[Article]) -> Vec<String> {
    let mut out = vec![ALL_CATEGORIES.to_string()];
    for c in articles.iter().filter_map(|a| a.category.as_deref()) {
        if !c.is_empty() && !out.iter().any(|seen| seen == c) {
            out.push(c.to_string());
        }
    }
    out
}
