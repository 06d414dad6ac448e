use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::models::{self, ArticleChanges, ArticleRow, NewArticle};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("database connection error")]
    Connection(#[source] sqlx::Error),

    #[error("database query error")]
    Query(#[from] sqlx::Error),

    #[error("database migration error")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Row-level persistence for articles.
///
/// Implementations own id and `date_published` assignment. Reads must never
/// observe a half-applied update.
#[async_trait::async_trait]
pub trait ArticleStore: Send + Sync {
    async fn list(&self) -> Result<Vec<ArticleRow>>;

    async fn get_by_id(&self, id: models::Id) -> Result<Option<ArticleRow>>;

    async fn insert(&self, article: NewArticle) -> Result<ArticleRow>;

    /// Returns the number of affected rows.
    async fn update_by_id(&self, id: models::Id, changes: ArticleChanges) -> Result<u64>;

    /// Returns the number of affected rows.
    async fn delete_by_id(&self, id: models::Id) -> Result<u64>;
}

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

const SELECT_ARTICLES: &str = "\
    SELECT a.id, a.title, a.content, a.style, a.date_published, u.fullname AS author_name \
    FROM blogful_articles a \
    LEFT JOIN blogful_users u ON u.id = a.author";

pub struct PgArticleStore {
    pg: PgPool,
}

impl PgArticleStore {
    pub async fn connect(db_url: &str) -> Result<PgArticleStore> {
        let pg = PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
            .map_err(Error::Connection)?;

        Ok(PgArticleStore { pg })
    }

    pub async fn migrate(&self) -> Result<()> {
        log::info!("DB: running migrations");
        MIGRATOR.run(&self.pg).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ArticleStore for PgArticleStore {
    async fn list(&self) -> Result<Vec<ArticleRow>> {
        log::trace!("DB: listing articles");

        let sql = format!("{SELECT_ARTICLES} ORDER BY a.id");
        let rows = sqlx::query_as(&sql).fetch_all(&self.pg).await?;
        Ok(rows)
    }

    async fn get_by_id(&self, desired_id: models::Id) -> Result<Option<ArticleRow>> {
        log::trace!("DB: fetching article {desired_id}");

        let sql = format!("{SELECT_ARTICLES} WHERE a.id = $1");
        let row = sqlx::query_as(&sql)
            .bind(desired_id)
            .fetch_optional(&self.pg)
            .await?;
        Ok(row)
    }

    async fn insert(&self, article: NewArticle) -> Result<ArticleRow> {
        log::trace!("DB: inserting new article {:?}", article.title);

        sqlx::query_as(
            "WITH inserted AS ( \
                INSERT INTO blogful_articles (title, content, style, author) \
                VALUES ($1, $2, $3, $4) \
                RETURNING id, title, content, style, date_published, author \
            ) \
            SELECT i.id, i.title, i.content, i.style, i.date_published, u.fullname AS author_name \
            FROM inserted i \
            LEFT JOIN blogful_users u ON u.id = i.author",
        )
        .bind(&article.title)
        .bind(&article.content)
        .bind(&article.style)
        .bind(article.author_id)
        .fetch_one(&self.pg)
        .await
        .map_err(|e| e.into())
    }

    async fn update_by_id(&self, desired_id: models::Id, changes: ArticleChanges) -> Result<u64> {
        log::trace!("DB: updating article {desired_id}");

        let result = sqlx::query(
            "UPDATE blogful_articles SET \
                title = COALESCE($2, title), \
                content = COALESCE($3, content), \
                style = COALESCE($4, style) \
            WHERE id = $1",
        )
        .bind(desired_id)
        .bind(changes.title)
        .bind(changes.content)
        .bind(changes.style)
        .execute(&self.pg)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_by_id(&self, desired_id: models::Id) -> Result<u64> {
        log::trace!("DB: deleting article {desired_id}");

        let result = sqlx::query("DELETE FROM blogful_articles WHERE id = $1")
            .bind(desired_id)
            .execute(&self.pg)
            .await?;

        Ok(result.rows_affected())
    }
}
