use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::db::{ArticleStore, Result};
use crate::models::{ArticleChanges, ArticleRow, Id, NewArticle};

#[derive(Clone, Debug)]
struct StoredArticle {
    title: String,
    content: String,
    style: String,
    date_published: DateTime<Utc>,
    author_id: Option<Id>,
}

#[derive(Debug, Default)]
struct Tables {
    last_article_id: Id,
    articles: BTreeMap<Id, StoredArticle>,
    users: BTreeMap<Id, String>,
}

impl Tables {
    fn row(&self, id: Id, article: &StoredArticle) -> ArticleRow {
        ArticleRow {
            id,
            title: article.title.clone(),
            content: article.content.clone(),
            style: article.style.clone(),
            date_published: article.date_published,
            author_name: article
                .author_id
                .and_then(|author| self.users.get(&author).cloned()),
        }
    }
}

/// Process-local article table. Every operation holds the table lock for its
/// whole duration, so reads never see a partial update.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, id: Id, fullname: &str) {
        self.tables.lock().await.users.insert(id, fullname.to_string());
    }

    /// Stores a row as-is, bypassing any write-path policy. Later inserts get ids above `id`.
    pub async fn seed(&self, id: Id, article: NewArticle, date_published: DateTime<Utc>) {
        let mut tables = self.tables.lock().await;
        tables.last_article_id = tables.last_article_id.max(id);
        tables.articles.insert(
            id,
            StoredArticle {
                title: article.title,
                content: article.content,
                style: article.style,
                date_published,
                author_id: article.author_id,
            },
        );
    }
}

#[async_trait::async_trait]
impl ArticleStore for MemoryStore {
    async fn list(&self) -> Result<Vec<ArticleRow>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .articles
            .iter()
            .map(|(&id, article)| tables.row(id, article))
            .collect())
    }

    async fn get_by_id(&self, id: Id) -> Result<Option<ArticleRow>> {
        let tables = self.tables.lock().await;
        Ok(tables.articles.get(&id).map(|article| tables.row(id, article)))
    }

    async fn insert(&self, article: NewArticle) -> Result<ArticleRow> {
        let mut tables = self.tables.lock().await;
        tables.last_article_id += 1;
        let id = tables.last_article_id;

        let stored = StoredArticle {
            title: article.title,
            content: article.content,
            style: article.style,
            date_published: Utc::now(),
            author_id: article.author_id,
        };
        let row = tables.row(id, &stored);
        tables.articles.insert(id, stored);

        log::trace!("MemoryStore: inserted article {id}");
        Ok(row)
    }

    async fn update_by_id(&self, id: Id, changes: ArticleChanges) -> Result<u64> {
        let mut tables = self.tables.lock().await;
        let Some(article) = tables.articles.get_mut(&id) else {
            return Ok(0);
        };

        if let Some(title) = changes.title {
            article.title = title;
        }
        if let Some(content) = changes.content {
            article.content = content;
        }
        if let Some(style) = changes.style {
            article.style = style;
        }

        Ok(1)
    }

    async fn delete_by_id(&self, id: Id) -> Result<u64> {
        let mut tables = self.tables.lock().await;
        Ok(tables.articles.remove(&id).map_or(0, |_| 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_article(title: &str) -> NewArticle {
        NewArticle {
            title: title.to_string(),
            content: "content".to_string(),
            style: "Story".to_string(),
            author_id: Some(1),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids_after_seeded_rows() {
        let store = MemoryStore::new();
        store.seed(4, new_article("seeded"), Utc::now()).await;

        let first = store.insert(new_article("first")).await.unwrap();
        let second = store.insert(new_article("second")).await.unwrap();

        assert_eq!(first.id, 5);
        assert_eq!(second.id, 6);
    }

    #[tokio::test]
    async fn test_rows_join_author_name() {
        let store = MemoryStore::new();
        store.add_user(1, "Dunder Mifflin").await;

        let row = store.insert(new_article("joined")).await.unwrap();
        assert_eq!(row.author_name.as_deref(), Some("Dunder Mifflin"));

        let orphan = store
            .insert(NewArticle {
                author_id: None,
                ..new_article("orphan")
            })
            .await
            .unwrap();
        assert_eq!(orphan.author_name, None);
    }

    #[tokio::test]
    async fn test_update_only_touches_supplied_columns() {
        let store = MemoryStore::new();
        let row = store.insert(new_article("before")).await.unwrap();

        let affected = store
            .update_by_id(
                row.id,
                ArticleChanges {
                    title: Some("after".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(affected, 1);

        let updated = store.get_by_id(row.id).await.unwrap().unwrap();
        assert_eq!(updated.title, "after");
        assert_eq!(updated.content, row.content);
        assert_eq!(updated.style, row.style);
        assert_eq!(updated.date_published, row.date_published);
    }

    #[tokio::test]
    async fn test_missing_rows_affect_nothing() {
        let store = MemoryStore::new();

        assert_eq!(store.get_by_id(123456).await.unwrap(), None);
        assert_eq!(
            store
                .update_by_id(123456, ArticleChanges::default())
                .await
                .unwrap(),
            0
        );
        assert_eq!(store.delete_by_id(123456).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_removes_row_from_list() {
        let store = MemoryStore::new();
        let kept = store.insert(new_article("kept")).await.unwrap();
        let gone = store.insert(new_article("gone")).await.unwrap();

        assert_eq!(store.delete_by_id(gone.id).await.unwrap(), 1);

        let ids: Vec<Id> = store.list().await.unwrap().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![kept.id]);
    }
}
