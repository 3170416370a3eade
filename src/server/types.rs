use axum::body::Bytes;
use axum_typed_multipart::{FieldData, TryFromMultipart};
use serde::Serialize;
use utoipa::ToSchema;

/// 以图搜图请求参数
#[derive(TryFromMultipart)]
pub struct ImageSearchRequest {
    #[form_data(limit = "10MiB")]
    pub image: Option<FieldData<Bytes>>,
    pub limit: Option<i64>,
}

/// 以图搜图表单（用于API文档）
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct ImageSearchForm {
    /// 上传的图片文件，MIME 类型必须为 image/*，不超过 10M
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub image: String,
    /// 返回结果数量，默认为 10
    pub limit: Option<i64>,
}

/// 错误响应
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}
