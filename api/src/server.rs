use std::sync::Arc;

use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

use crate::service::ArticleService;

#[derive(utoipa::OpenApi)]
#[openapi(
        paths(
            articles::list,
            articles::get,
            articles::create,
            articles::update,
            articles::delete
        ),
        components(
            schemas(
                crate::service::Article,
                crate::validate::CreateArticle,
                crate::validate::UpdateArticle,
                crate::error::ErrorBody,
                crate::error::ErrorMessage
            )
        ),
        tags(
            (name = "articles", description = "Articles written by blogful users")
        )
    )]
struct ApiDoc;

/// `"api/"` becomes `"/api"`, `"/"` becomes `""`.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

pub fn router(service: ArticleService, api_prefix: &str) -> axum::Router {
    let api_prefix = normalize_prefix(api_prefix);

    let mut doc = ApiDoc::openapi();
    if !api_prefix.is_empty() {
        doc.servers = Some(vec![utoipa::openapi::server::Server::new(&api_prefix)]);
    }

    let state = articles::AppState {
        service,
        api_prefix: Arc::from(api_prefix.as_str()),
    };
    let articles = axum::Router::new()
        .route(
            "/articles",
            axum::routing::get(articles::list).post(articles::create),
        )
        .route(
            "/articles/:article_id",
            axum::routing::get(articles::get)
                .patch(articles::update)
                .delete(articles::delete),
        )
        .with_state(state);

    let app = if api_prefix.is_empty() {
        articles
    } else {
        axum::Router::new().nest(&api_prefix, articles)
    };

    app.merge(RapiDoc::with_openapi("/api-docs/openapi.json", doc).path("/docs"))
}

pub async fn run_server(app: axum::Router, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

mod articles {
    use std::sync::Arc;

    use axum::{
        extract::{rejection::JsonRejection, Path, State},
        http::{header, StatusCode},
        response::IntoResponse,
        Json,
    };

    use crate::error::{ArticleError, Result};
    use crate::service::{Article, ArticleService};
    use crate::validate::{CreateArticle, UpdateArticle};

    #[derive(Clone)]
    pub(super) struct AppState {
        pub(super) service: ArticleService,
        pub(super) api_prefix: Arc<str>,
    }

    /// A request without a JSON body counts as an empty payload.
    fn payload<T: Default>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
        match body {
            Ok(Json(payload)) => Ok(payload),
            Err(JsonRejection::MissingJsonContentType(_)) => Ok(T::default()),
            Err(rejection) => Err(ArticleError::InvalidBody(rejection.body_text())),
        }
    }

    #[utoipa::path(
        get,
        path = "/articles",
        tag = "articles",
        responses(
            (status = 200, description = "Every article", body = [Article])
        )
    )]
    pub(super) async fn list(State(state): State<AppState>) -> Result<Json<Vec<Article>>> {
        Ok(Json(state.service.list_articles().await?))
    }

    #[utoipa::path(
        get,
        path = "/articles/{article_id}",
        tag = "articles",
        params(
            ("article_id" = i32, Path, description = "Article id")
        ),
        responses(
            (status = 200, description = "The article", body = Article),
            (status = 404, description = "Article doesn't exist", body = crate::error::ErrorBody)
        )
    )]
    pub(super) async fn get(
        State(state): State<AppState>,
        Path(article_id): Path<String>,
    ) -> Result<Json<Article>> {
        Ok(Json(state.service.get_article(&article_id).await?))
    }

    #[utoipa::path(
        post,
        path = "/articles",
        tag = "articles",
        request_body = CreateArticle,
        responses(
            (status = 201, description = "Article created", body = Article,
                headers(("location" = String, description = "Path of the new article"))),
            (status = 400, description = "A required field is missing", body = crate::error::ErrorBody)
        )
    )]
    pub(super) async fn create(
        State(state): State<AppState>,
        body: std::result::Result<Json<CreateArticle>, JsonRejection>,
    ) -> Result<impl IntoResponse> {
        let article = state.service.create_article(payload(body)?).await?;
        let location = format!("{}/articles/{}", state.api_prefix, article.id);

        Ok((
            StatusCode::CREATED,
            [(header::LOCATION, location)],
            Json(article),
        ))
    }

    #[utoipa::path(
        patch,
        path = "/articles/{article_id}",
        tag = "articles",
        request_body = UpdateArticle,
        params(
            ("article_id" = i32, Path, description = "Article id")
        ),
        responses(
            (status = 204, description = "Article updated"),
            (status = 400, description = "No updatable field supplied", body = crate::error::ErrorBody),
            (status = 404, description = "Article doesn't exist", body = crate::error::ErrorBody)
        )
    )]
    pub(super) async fn update(
        State(state): State<AppState>,
        Path(article_id): Path<String>,
        body: std::result::Result<Json<UpdateArticle>, JsonRejection>,
    ) -> Result<StatusCode> {
        state
            .service
            .update_article(&article_id, payload(body)?)
            .await?;
        Ok(StatusCode::NO_CONTENT)
    }

    #[utoipa::path(
        delete,
        path = "/articles/{article_id}",
        tag = "articles",
        params(
            ("article_id" = i32, Path, description = "Article id")
        ),
        responses(
            (status = 204, description = "Article deleted"),
            (status = 404, description = "Article doesn't exist", body = crate::error::ErrorBody)
        )
    )]
    pub(super) async fn delete(
        State(state): State<AppState>,
        Path(article_id): Path<String>,
    ) -> Result<StatusCode> {
        state.service.delete_article(&article_id).await?;
        Ok(StatusCode::NO_CONTENT)
    }
}
