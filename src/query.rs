//! 文本检索与以图搜图

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;
use serde::{Deserialize, Serialize};
use tokio::task::spawn_blocking;
use utoipa::ToSchema;

use crate::config::QueryOptions;
use crate::error::{Error, Result};
use crate::metrics;
use crate::normalize::normalize_bytes;
use crate::store::{ImageQuery, SearchResult, TextQuery, VectorStore};

/// 上传图片的大小上限：10M
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// 文本检索请求
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct TextSearchRequest {
    /// 检索关键词
    pub query: Option<String>,
    /// 返回结果数量，默认为 10
    pub limit: Option<i64>,
}

/// 文本检索响应
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TextSearchResponse {
    pub results: Vec<SearchResult>,
}

/// 上传的待检索图片
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub data: Vec<u8>,
    /// MIME 类型
    pub content_type: Option<String>,
    pub limit: Option<i64>,
}

/// 以图搜图响应
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImageSearchResponse {
    pub success: bool,
    pub results: Vec<SearchResult>,
    /// 结果数量
    pub total: usize,
}

/// 检索器，不持有可变状态，可以被任意数量的请求并发使用
#[derive(Clone)]
pub struct Searcher {
    store: Arc<dyn VectorStore>,
    class: String,
    timeout: Duration,
    default_limit: usize,
}

impl Searcher {
    pub fn new(store: Arc<dyn VectorStore>, class: impl Into<String>, opts: &QueryOptions) -> Self {
        Self {
            store,
            class: class.into(),
            timeout: Duration::from_secs_f64(opts.query_timeout),
            default_limit: opts.default_limit,
        }
    }

    /// BM25 文本检索
    pub async fn text(&self, req: TextSearchRequest) -> Result<TextSearchResponse> {
        let query = self.text_query(req)?;
        let start = Instant::now();
        let results = self.with_timeout(self.store.query_text(&query)).await;
        metrics::observe_search("text", &results, start.elapsed());
        Ok(TextSearchResponse { results: results? })
    }

    /// 以图搜图
    ///
    /// 参数校验在访问向量数据库之前完成，非图片文件不会产生任何数据库请求。
    pub async fn image(&self, upload: ImageUpload) -> Result<ImageSearchResponse> {
        let limit = self.limit(upload.limit)?;
        match upload.content_type.as_deref() {
            Some(mime) if mime.starts_with("image/") => {}
            _ => return Err(Error::validation("Only image files are allowed")),
        }
        if upload.data.is_empty() {
            return Err(Error::validation("Image file is required"));
        }
        if upload.data.len() > MAX_UPLOAD_SIZE {
            return Err(Error::validation("Image file too large"));
        }

        let start = Instant::now();
        let data = upload.data;
        let image = spawn_blocking(move || normalize_bytes(&data))
            .await
            .map_err(|e| Error::Internal(format!("标准化任务异常退出: {e}")))??;
        debug!("查询图片 {} 字节，标准化耗时 {:?}", image.len(), start.elapsed());

        let query = ImageQuery {
            class: self.class.clone(),
            image: image.to_base64(),
            limit,
        };
        let results = self.with_timeout(self.store.query_image(&query)).await;
        metrics::observe_search("image", &results, start.elapsed());
        let results = results?;

        Ok(ImageSearchResponse {
            success: true,
            total: results.len(),
            results,
        })
    }

    fn text_query(&self, req: TextSearchRequest) -> Result<TextQuery> {
        let limit = self.limit(req.limit)?;
        match req.query {
            Some(query) if !query.trim().is_empty() => Ok(TextQuery {
                class: self.class.clone(),
                query,
                limit,
            }),
            _ => Err(Error::validation("Invalid data")),
        }
    }

    fn limit(&self, limit: Option<i64>) -> Result<usize> {
        match limit {
            None => Ok(self.default_limit),
            Some(n) if n > 0 => Ok(n as usize),
            Some(_) => Err(Error::validation("Invalid data")),
        }
    }

    async fn with_timeout<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| Error::Timeout(self.timeout))?
    }
}
