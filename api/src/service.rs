use std::sync::Arc;

use chrono::{DateTime, Utc};

use blogful_shared::db::ArticleStore;
use blogful_shared::models::{self, ArticleRow, NewArticle};

use crate::error::{ArticleError, Result};
use crate::sanitize::sanitize;
use crate::validate::{validate_create, validate_update, CreateArticle, UpdateArticle};

/// Article as returned to clients
#[derive(serde::Serialize, serde::Deserialize, utoipa::ToSchema, Clone, Debug, PartialEq)]
pub struct Article {
    pub id: models::Id,
    /// Sanitized title
    pub title: String,
    /// Sanitized body
    pub content: String,
    #[schema(example = "Listicle")]
    pub style: String,
    /// Insertion time, never changed by updates
    pub date_published: DateTime<Utc>,
    /// Display name of the author, if any
    pub author: Option<String>,
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        Article {
            id: row.id,
            title: sanitize(&row.title),
            content: sanitize(&row.content),
            style: row.style,
            date_published: row.date_published,
            author: row.author_name,
        }
    }
}

/// Malformed and non-positive ids can never match a row, so they are
/// reported exactly like absent ones.
fn parse_id(raw: &str) -> Result<models::Id> {
    match raw.parse::<models::Id>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ArticleError::NotFound(raw.to_string())),
    }
}

/// Validation, sanitization and error mapping in front of an [`ArticleStore`].
///
/// Holds no per-request state; one instance is shared by all requests.
#[derive(Clone)]
pub struct ArticleService {
    store: Arc<dyn ArticleStore>,
}

impl ArticleService {
    pub fn new(store: Arc<dyn ArticleStore>) -> Self {
        Self { store }
    }

    pub async fn list_articles(&self) -> Result<Vec<Article>> {
        let rows = self.store.list().await?;
        tracing::debug!(count = rows.len(), "listed articles");
        Ok(rows.into_iter().map(Article::from).collect())
    }

    pub async fn get_article(&self, id: &str) -> Result<Article> {
        let id = parse_id(id)?;
        self.store
            .get_by_id(id)
            .await?
            .map(Article::from)
            .ok_or_else(|| ArticleError::NotFound(id.to_string()))
    }

    pub async fn create_article(&self, payload: CreateArticle) -> Result<Article> {
        let valid = validate_create(payload)?;

        let row = self
            .store
            .insert(NewArticle {
                title: valid.title,
                content: valid.content,
                style: valid.style,
                author_id: None,
            })
            .await?;

        tracing::info!(id = row.id, "created article");
        Ok(Article::from(row))
    }

    pub async fn update_article(&self, id: &str, payload: UpdateArticle) -> Result<()> {
        let id = parse_id(id)?;
        if self.store.get_by_id(id).await?.is_none() {
            return Err(ArticleError::NotFound(id.to_string()));
        }

        let changes = validate_update(payload)?;

        // The row may have been deleted since the existence check.
        if self.store.update_by_id(id, changes).await? == 0 {
            return Err(ArticleError::NotFound(id.to_string()));
        }

        tracing::info!(id, "updated article");
        Ok(())
    }

    pub async fn delete_article(&self, id: &str) -> Result<()> {
        let id = parse_id(id)?;
        if self.store.delete_by_id(id).await? == 0 {
            return Err(ArticleError::NotFound(id.to_string()));
        }

        tracing::info!(id, "deleted article");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use blogful_shared::db;
    use blogful_shared::memory::MemoryStore;
    use blogful_shared::models::ArticleChanges;

    fn create_payload() -> CreateArticle {
        CreateArticle {
            title: Some("Test new article".to_string()),
            content: Some("Test new article content ...".to_string()),
            style: Some("Listicle".to_string()),
        }
    }

    async fn service_with_store() -> (ArticleService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store.add_user(1, "Dunder Mifflin").await;
        (ArticleService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_list_empty_store() {
        let (service, _) = service_with_store().await;
        assert!(service.list_articles().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_returns_persisted_article() {
        let (service, _) = service_with_store().await;

        let before = Utc::now();
        let created = service.create_article(create_payload()).await.unwrap();
        let after = Utc::now();

        assert_eq!(created.title, "Test new article");
        assert_eq!(created.content, "Test new article content ...");
        assert_eq!(created.style, "Listicle");
        assert_eq!(created.author, None);
        assert!(before <= created.date_published && created.date_published <= after);

        let fetched = service.get_article(&created.id.to_string()).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_create_missing_field_persists_nothing() {
        let (service, store) = service_with_store().await;

        let payload = CreateArticle {
            style: None,
            ..create_payload()
        };
        assert!(matches!(
            service.create_article(payload).await,
            Err(ArticleError::MissingField("style"))
        ));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_never_stores_empty_text() {
        let (service, store) = service_with_store().await;

        let payload = CreateArticle {
            title: Some("<script>alert(1)</script>".to_string()),
            content: Some("<style>x</style>".to_string()),
            style: Some("How-to".to_string()),
        };
        assert!(matches!(
            service.create_article(payload).await,
            Err(ArticleError::MissingField("title"))
        ));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_never_stores_empty_text() {
        let (service, _) = service_with_store().await;
        let created = service.create_article(create_payload()).await.unwrap();
        let id = created.id.to_string();

        let payload = UpdateArticle {
            title: Some("<iframe></iframe>".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            service.update_article(&id, payload).await,
            Err(ArticleError::NoUpdatableFields)
        ));

        let payload = UpdateArticle {
            title: Some("<iframe></iframe>".to_string()),
            style: Some("Interview".to_string()),
            ..Default::default()
        };
        service.update_article(&id, payload).await.unwrap();

        let updated = service.get_article(&id).await.unwrap();
        assert_eq!(updated.title, created.title);
        assert_eq!(updated.style, "Interview");
    }

    #[tokio::test]
    async fn test_create_stores_sanitized_text_and_raw_style() {
        let (service, store) = service_with_store().await;

        let payload = CreateArticle {
            title: Some(r#"Naughty <script>alert("xss");</script>"#.to_string()),
            style: Some("<b>How-to</b>".to_string()),
            ..create_payload()
        };
        let created = service.create_article(payload).await.unwrap();
        assert_eq!(created.title, "Naughty ");
        assert_eq!(created.style, "<b>How-to</b>");

        let stored = store.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Naughty ");
    }

    #[tokio::test]
    async fn test_reads_sanitize_legacy_rows() {
        let (service, store) = service_with_store().await;
        store
            .seed(
                911,
                NewArticle {
                    title: r#"Naughty naughty very naughty <script>alert("xss");</script>"#
                        .to_string(),
                    content: r#"<img src="x.png" onerror="alert(document.cookie);">"#.to_string(),
                    style: "How-to".to_string(),
                    author_id: Some(1),
                },
                Utc::now(),
            )
            .await;

        let article = service.get_article("911").await.unwrap();
        assert_eq!(article.title, "Naughty naughty very naughty ");
        assert_eq!(article.content, r#"<img src="x.png">"#);
        assert_eq!(article.author.as_deref(), Some("Dunder Mifflin"));

        let listed = service.list_articles().await.unwrap();
        assert_eq!(listed, vec![article]);
    }

    #[tokio::test]
    async fn test_missing_and_malformed_ids_are_not_found() {
        let (service, _) = service_with_store().await;

        for id in ["123456", "abc", "0", "-3", ""] {
            assert!(matches!(
                service.get_article(id).await,
                Err(ArticleError::NotFound(_))
            ));
            assert!(matches!(
                service.update_article(id, UpdateArticle::default()).await,
                Err(ArticleError::NotFound(_))
            ));
            assert!(matches!(
                service.delete_article(id).await,
                Err(ArticleError::NotFound(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_update_changes_only_supplied_fields() {
        let (service, _) = service_with_store().await;
        let created = service.create_article(create_payload()).await.unwrap();
        let id = created.id.to_string();

        let payload: UpdateArticle = serde_json::from_str(
            r#"{"title": "updated article title", "fieldToIgnore": "should not be in GET response"}"#,
        )
        .unwrap();
        service.update_article(&id, payload).await.unwrap();

        let updated = service.get_article(&id).await.unwrap();
        assert_eq!(
            updated,
            Article {
                title: "updated article title".to_string(),
                ..created
            }
        );
    }

    #[tokio::test]
    async fn test_update_without_recognized_fields_fails() {
        let (service, _) = service_with_store().await;
        let created = service.create_article(create_payload()).await.unwrap();

        let payload: UpdateArticle = serde_json::from_str(r#"{"irrelevantField": "foo"}"#).unwrap();
        assert!(matches!(
            service.update_article(&created.id.to_string(), payload).await,
            Err(ArticleError::NoUpdatableFields)
        ));
    }

    #[tokio::test]
    async fn test_update_sanitizes_content() {
        let (service, _) = service_with_store().await;
        let created = service.create_article(create_payload()).await.unwrap();
        let id = created.id.to_string();

        let payload = UpdateArticle {
            content: Some("<p onclick=\"steal()\">hi</p><script>x()</script>".to_string()),
            ..Default::default()
        };
        service.update_article(&id, payload).await.unwrap();

        assert_eq!(service.get_article(&id).await.unwrap().content, "<p>hi</p>");
    }

    #[tokio::test]
    async fn test_delete_is_permanent() {
        let (service, _) = service_with_store().await;
        let first = service.create_article(create_payload()).await.unwrap();
        let second = service.create_article(create_payload()).await.unwrap();

        service.delete_article(&second.id.to_string()).await.unwrap();

        assert_eq!(service.list_articles().await.unwrap(), vec![first]);
        assert!(matches!(
            service.get_article(&second.id.to_string()).await,
            Err(ArticleError::NotFound(_))
        ));
        assert!(matches!(
            service.delete_article(&second.id.to_string()).await,
            Err(ArticleError::NotFound(_))
        ));
    }

    struct UnavailableStore;

    fn unavailable() -> db::Error {
        db::Error::Query(sqlx::Error::PoolTimedOut)
    }

    #[async_trait::async_trait]
    impl ArticleStore for UnavailableStore {
        async fn list(&self) -> db::Result<Vec<ArticleRow>> {
            Err(unavailable())
        }

        async fn get_by_id(&self, _: models::Id) -> db::Result<Option<ArticleRow>> {
            Err(unavailable())
        }

        async fn insert(&self, _: NewArticle) -> db::Result<ArticleRow> {
            Err(unavailable())
        }

        async fn update_by_id(&self, _: models::Id, _: ArticleChanges) -> db::Result<u64> {
            Err(unavailable())
        }

        async fn delete_by_id(&self, _: models::Id) -> db::Result<u64> {
            Err(unavailable())
        }
    }

    #[tokio::test]
    async fn test_store_failures_surface() {
        let service = ArticleService::new(Arc::new(UnavailableStore));

        assert!(matches!(
            service.list_articles().await,
            Err(ArticleError::Store(_))
        ));
        assert!(matches!(
            service.get_article("1").await,
            Err(ArticleError::Store(_))
        ));
        assert!(matches!(
            service.create_article(create_payload()).await,
            Err(ArticleError::Store(_))
        ));
        assert!(matches!(
            service.delete_article("1").await,
            Err(ArticleError::Store(_))
        ));
    }
}
