use chrono::{DateTime, Utc};

pub type Id = i32;

/// An article as read back from the store, with the author's name joined in.
#[derive(PartialEq, Clone, Debug, sqlx::FromRow)]
pub struct ArticleRow {
    pub id: Id,
    pub title: String,
    pub content: String,
    pub style: String,
    pub date_published: DateTime<Utc>,
    pub author_name: Option<String>,
}

/// Values for a new article. `id` and `date_published` are assigned by the store.
#[derive(PartialEq, Clone, Debug)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    pub style: String,
    pub author_id: Option<Id>,
}

/// A partial update. `None` leaves the stored column untouched.
#[derive(PartialEq, Clone, Debug, Default)]
pub struct ArticleChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub style: Option<String>,
}

impl ArticleChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.style.is_none()
    }
}
