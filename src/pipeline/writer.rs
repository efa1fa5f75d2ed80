use std::collections::HashSet;

use crate::db::Repository;
use crate::models::NewArticle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Inserted(i64),
    Duplicate,
    Failed,
}

/// Serial writer for one cycle. Remembers the URLs it has already settled so
/// two entries with the same link in one cycle produce a single article.
pub struct ArticleWriter<'a> {
    repository: &'a Repository,
    seen: HashSet<String>,
}

impl<'a> ArticleWriter<'a> {
    pub fn new(repository: &'a Repository) -> Self {
        Self {
            repository,
            seen: HashSet::new(),
        }
    }

    pub async fn write(&mut self, article: NewArticle) -> WriteOutcome {
        if self.seen.contains(&article.url) {
            return WriteOutcome::Duplicate;
        }

        match self.repository.article_exists(&article.url).await {
            Ok(true) => {
                self.seen.insert(article.url);
                return WriteOutcome::Duplicate;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!("Existence check failed for {}: {}", article.url, e);
                return WriteOutcome::Failed;
            }
        }

        let url = article.url.clone();
        let title = article.title.clone();
        match self.repository.insert_article(article).await {
            Ok(id) => {
                self.seen.insert(url);
                WriteOutcome::Inserted(id)
            }
            Err(e) => {
                tracing::warn!("Error inserting article '{}': {}", title, e);
                WriteOutcome::Failed
            }
        }
    }
}
