use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum_typed_multipart::{TypedMultipart, TypedMultipartError};
use log::{debug, info};

use super::error::Result;
use super::state::AppState;
use super::types::*;
use crate::error::Error;
use crate::query::{ImageSearchResponse, ImageUpload, TextSearchRequest, TextSearchResponse};

/// 按文本检索商品
#[utoipa::path(
    post,
    path = "/search/text",
    request_body = TextSearchRequest,
    responses(
        (status = 200, body = TextSearchResponse),
        (status = 400, body = ErrorResponse),
        (status = 500, body = ErrorResponse),
    )
)]
pub async fn text_search_handler(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<TextSearchRequest>, JsonRejection>,
) -> Result<Json<TextSearchResponse>> {
    let Json(req) = body.map_err(|e| {
        debug!("无法解析请求体: {}", e);
        Error::validation("Invalid data")
    })?;
    let resp = state.searcher.text(req).await?;
    info!("文本检索完成，{} 条结果", resp.results.len());
    Ok(Json(resp))
}

/// 以图搜图
#[utoipa::path(
    post,
    path = "/search/image",
    request_body(content = ImageSearchForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, body = ImageSearchResponse),
        (status = 400, body = ErrorResponse),
        (status = 500, body = ErrorResponse),
    )
)]
pub async fn image_search_handler(
    State(state): State<Arc<AppState>>,
    data: std::result::Result<TypedMultipart<ImageSearchRequest>, TypedMultipartError>,
) -> Result<Json<ImageSearchResponse>> {
    let TypedMultipart(data) = data.map_err(|e| {
        debug!("无法解析上传表单: {}", e);
        match e {
            TypedMultipartError::FieldTooLarge { .. } => Error::validation("Image file too large"),
            TypedMultipartError::InvalidRequestBody { source }
                if source.status() == StatusCode::PAYLOAD_TOO_LARGE =>
            {
                Error::validation("Image file too large")
            }
            TypedMultipartError::WrongFieldType { .. } => Error::validation("Invalid data"),
            _ => Error::validation("Image file is required"),
        }
    })?;
    let Some(image) = data.image else {
        return Err(Error::validation("Image file is required").into());
    };

    info!("正在搜索上传图片 {:?}", image.metadata.file_name);
    let upload = ImageUpload {
        data: image.contents.to_vec(),
        content_type: image.metadata.content_type,
        limit: data.limit,
    };
    let resp = state.searcher.image(upload).await?;
    Ok(Json(resp))
}

/// 未匹配的路由
pub async fn not_found_handler() -> impl IntoResponse {
    let body = ErrorResponse {
        error: "Endpoint not found".to_owned(),
    };
    (StatusCode::NOT_FOUND, Json(body))
}
