use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::{error, warn};

use super::types::ErrorResponse;
use crate::error::Error;

/// API错误类型
///
/// 客户端错误返回具体原因，其余错误只返回笼统的信息，详细内容写入日志。
pub struct AppError(pub Error);

impl AppError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match &self.0 {
            Error::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Error::ImageDecode(_) | Error::ImageIo(_) => {
                (StatusCode::BAD_REQUEST, "Invalid image".to_owned())
            }
            Error::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "Request timed out".to_owned()),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_owned(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!("请求处理失败: {}", self.0);
        } else {
            warn!("请求无效: {}", self.0);
        }
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
