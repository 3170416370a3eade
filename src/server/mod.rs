mod api;
mod error;
mod state;
mod types;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware::map_response;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use tower_http::limit::RequestBodyLimitLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use self::error::AppError;
pub use self::state::*;
use crate::error::Error;
use crate::query::MAX_UPLOAD_SIZE;

#[derive(OpenApi)]
#[openapi(
    paths(api::text_search_handler, api::image_search_handler),
    components(schemas(
        types::ImageSearchForm,
        types::ErrorResponse,
        crate::query::TextSearchRequest,
        crate::query::TextSearchResponse,
        crate::query::ImageSearchResponse,
        crate::store::SearchResult,
    ))
)]
pub struct ApiDoc;

/// 构建API服务器
pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/search/text", post(api::text_search_handler))
        .route("/search/image", post(api::image_search_handler))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(api::not_found_handler)
        .layer(DefaultBodyLimit::disable())
        // 上传限制：图片 10M，额外预留表单的空间
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_SIZE + 1024 * 1024))
        .layer(map_response(payload_too_large))
        .with_state(state)
}

/// 请求体超出限制时同样返回 JSON 错误
async fn payload_too_large(resp: Response) -> Response {
    if resp.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError(Error::validation("Image file too large")).into_response();
    }
    resp
}
