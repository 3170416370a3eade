use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use log::debug;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

use super::*;

/// Weaviate 的 HTTP 客户端
///
/// 需要显式创建并在使用前调用 [`VectorStore::ready`] 检查连接，之后可以在多个任务间共享。
#[derive(Debug, Clone)]
pub struct WeaviateClient {
    client: Client,
    base_url: String,
}

impl WeaviateClient {
    /// 创建客户端
    ///
    /// # Arguments
    ///
    /// * `base_url` - 形如 `http://localhost:8080` 的地址，缺少协议时默认使用 http
    /// * `timeout` - 单次请求的超时时间
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::store(format!("无法创建 HTTP 客户端: {e}")))?;
        Ok(Self {
            client,
            base_url: normalize_base_url(base_url),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1{}", self.base_url, path)
    }

    async fn graphql(&self, query: String, class: &str) -> Result<Vec<SearchResult>> {
        debug!("GraphQL: {}", truncate(&query, 200));
        let resp = self
            .client
            .post(self.url("/graphql"))
            .json(&json!({ "query": query }))
            .send()
            .await?;
        let body: GraphQLResponse = check(resp).await?.json().await?;
        body.into_results(class)
    }
}

fn normalize_base_url(url: &str) -> String {
    let url = url.trim_end_matches('/');
    if url.contains("://") {
        url.to_owned()
    } else {
        format!("http://{url}")
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// 非 2xx 响应转换为错误
async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let url = resp.url().path().to_owned();
    let body = resp.text().await.unwrap_or_default();
    Err(Error::store(format!("{} {}: {}", status, url, truncate(&body, 500))))
}

/// GraphQL 字符串字面量，转义规则与 JSON 相同
fn graphql_string(s: &str) -> String {
    Value::String(s.to_owned()).to_string()
}

/// 构建 BM25 检索语句
pub fn bm25_query(query: &TextQuery) -> String {
    format!(
        "{{ Get {{ {}(bm25: {{query: {}}}, limit: {}) {{ {} }} }} }}",
        query.class,
        graphql_string(&query.query),
        query.limit,
        RESULT_FIELDS.join(" ")
    )
}

/// 构建以图搜图检索语句
pub fn near_image_query(query: &ImageQuery) -> String {
    format!(
        "{{ Get {{ {}(nearImage: {{image: {}}}, limit: {}) {{ {} }} }} }}",
        query.class,
        graphql_string(&query.image),
        query.limit,
        RESULT_FIELDS.join(" ")
    )
}

/// 批量写入的请求体
pub fn batch_body(class: &str, objects: &[StoreObject]) -> Value {
    let objects = objects
        .iter()
        .map(|o| {
            let mut obj = json!({
                "class": class,
                "properties": { "title": o.title, "image": o.image },
            });
            if let Some(id) = &o.id {
                obj["id"] = json!(id);
            }
            obj
        })
        .collect::<Vec<_>>();
    json!({ "objects": objects })
}

#[derive(Debug, Deserialize)]
struct GraphQLError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GraphQLResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQLError>,
}

impl GraphQLResponse {
    fn into_results(self, class: &str) -> Result<Vec<SearchResult>> {
        if !self.errors.is_empty() {
            let messages = self
                .errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>();
            return Err(Error::store(format!("GraphQL 错误: {}", messages.join("; "))));
        }
        let results = self
            .data
            .and_then(|mut data| {
                data.get_mut("Get")
                    .and_then(|get| get.get_mut(class))
                    .map(Value::take)
            })
            .unwrap_or(Value::Null);
        match results {
            Value::Null => Ok(vec![]),
            results => serde_json::from_value(results)
                .map_err(|e| Error::store(format!("无法解析检索结果: {e}"))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct BatchErrors {
    #[serde(default)]
    error: Vec<GraphQLError>,
}

#[derive(Debug, Default, Deserialize)]
struct BatchResult {
    #[serde(default)]
    errors: Option<BatchErrors>,
}

#[derive(Debug, Deserialize)]
struct BatchObjectResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    result: BatchResult,
}

/// 检查批量写入的逐条结果，只要有一条出错就视为整批失败
fn check_batch(items: Vec<BatchObjectResponse>) -> Result<()> {
    let failed = items
        .iter()
        .filter_map(|item| {
            let errors = item.result.errors.as_ref()?;
            let first = errors.error.first()?;
            Some((item.id.as_deref().unwrap_or("-"), first.message.as_str()))
        })
        .collect::<Vec<_>>();
    match failed.first() {
        None => Ok(()),
        Some((id, message)) => Err(Error::store(format!(
            "批量写入中 {}/{} 条记录失败，首个错误 ({}): {}",
            failed.len(),
            items.len(),
            id,
            message
        ))),
    }
}

impl VectorStore for WeaviateClient {
    fn ready(&self) -> BoxFuture<'_, Result<()>> {
        async move {
            let resp = self.client.get(self.url("/meta")).send().await?;
            let meta: Value = check(resp).await?.json().await?;
            debug!("Weaviate 版本: {}", meta.get("version").unwrap_or(&Value::Null));
            Ok(())
        }
        .boxed()
    }

    fn get_schema<'a>(&'a self, class: &'a str) -> BoxFuture<'a, Result<Option<ClassSchema>>> {
        async move {
            let resp = self
                .client
                .get(self.url(&format!("/schema/{class}")))
                .send()
                .await?;
            if resp.status() == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            let schema = check(resp).await?.json().await?;
            Ok(Some(schema))
        }
        .boxed()
    }

    fn create_schema<'a>(&'a self, schema: &'a ClassSchema) -> BoxFuture<'a, Result<()>> {
        async move {
            let resp = self
                .client
                .post(self.url("/schema"))
                .json(schema)
                .send()
                .await?;
            check(resp).await?;
            Ok(())
        }
        .boxed()
    }

    fn batch_write<'a>(
        &'a self,
        class: &'a str,
        objects: &'a [StoreObject],
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let resp = self
                .client
                .post(self.url("/batch/objects"))
                .json(&batch_body(class, objects))
                .send()
                .await?;
            let items: Vec<BatchObjectResponse> = check(resp).await?.json().await?;
            check_batch(items)
        }
        .boxed()
    }

    fn query_text<'a>(&'a self, query: &'a TextQuery) -> BoxFuture<'a, Result<Vec<SearchResult>>> {
        self.graphql(bm25_query(query), &query.class).boxed()
    }

    fn query_image<'a>(
        &'a self,
        query: &'a ImageQuery,
    ) -> BoxFuture<'a, Result<Vec<SearchResult>>> {
        self.graphql(near_image_query(query), &query.class).boxed()
    }
}
