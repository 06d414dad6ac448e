use blogful_shared::models::ArticleChanges;

use crate::error::{ArticleError, Result};
use crate::sanitize::sanitize;

/// Body of `POST /articles`. Unknown keys, including `id`, `author` and
/// `date_published`, are ignored.
#[derive(serde::Deserialize, utoipa::ToSchema, Debug, Default, Clone)]
pub struct CreateArticle {
    #[schema(example = "Test new article")]
    pub title: Option<String>,
    #[schema(example = "Test new article content ...")]
    pub content: Option<String>,
    #[schema(example = "Listicle")]
    pub style: Option<String>,
}

/// Body of `PATCH /articles/{id}`. Unknown keys are ignored.
#[derive(serde::Deserialize, utoipa::ToSchema, Debug, Default, Clone)]
pub struct UpdateArticle {
    pub title: Option<String>,
    pub content: Option<String>,
    pub style: Option<String>,
}

/// Create payload with sanitized, non-empty `title` and `content`.
#[derive(PartialEq, Debug)]
pub struct ValidArticle {
    pub title: String,
    pub content: String,
    pub style: String,
}

fn present(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.is_empty())
}

/// Free text counts as present only if something survives sanitization.
fn present_text(field: Option<String>) -> Option<String> {
    present(field.map(|value| sanitize(&value)))
}

/// Fields are checked in the order title, content, style and the first
/// missing one is reported. `style` is a label and is kept verbatim.
pub fn validate_create(payload: CreateArticle) -> Result<ValidArticle> {
    let title = present_text(payload.title).ok_or(ArticleError::MissingField("title"))?;
    let content = present_text(payload.content).ok_or(ArticleError::MissingField("content"))?;
    let style = present(payload.style).ok_or(ArticleError::MissingField("style"))?;

    Ok(ValidArticle {
        title,
        content,
        style,
    })
}

pub fn validate_update(payload: UpdateArticle) -> Result<ArticleChanges> {
    let changes = ArticleChanges {
        title: present_text(payload.title),
        content: present_text(payload.content),
        style: present(payload.style),
    };

    if changes.is_empty() {
        return Err(ArticleError::NoUpdatableFields);
    }
    Ok(changes)
}
