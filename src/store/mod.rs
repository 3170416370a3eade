//! 向量数据库接口
//!
//! 向量数据库负责生成向量并执行近邻/BM25 检索，这里只定义它需要提供的能力，
//! 具体实现见 [`WeaviateClient`] 与 [`MemoryStore`]。

mod memory;
mod schema;
mod weaviate;

use futures::future::BoxFuture;
use log::info;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

pub use self::memory::*;
pub use self::schema::*;
pub use self::weaviate::*;
use crate::error::{Error, Result};

/// 写入向量数据库的一条记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreObject {
    /// 对象 ID，为空时由数据库生成
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    /// base64 编码的 JPEG 图片
    pub image: String,
}

/// 检索结果，原样返回给调用方
///
/// 数据库中缺失或为 `null` 的属性按空字符串返回。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SearchResult {
    /// 商品名称
    #[serde(default, deserialize_with = "nullable_string")]
    pub title: String,
    /// base64 编码的 JPEG 图片
    #[serde(default, deserialize_with = "nullable_string")]
    pub image: String,
}

fn nullable_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// BM25 文本检索
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextQuery {
    pub class: String,
    pub query: String,
    pub limit: usize,
}

/// 以图搜图
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageQuery {
    pub class: String,
    /// base64 编码的查询图片
    pub image: String,
    pub limit: usize,
}

/// 检索时请求的字段
pub const RESULT_FIELDS: [&str; 2] = ["title", "image"];

/// 向量数据库需要提供的能力
pub trait VectorStore: Send + Sync {
    /// 检查数据库是否可用
    fn ready(&self) -> BoxFuture<'_, Result<()>>;

    /// 获取类定义，不存在时返回 `None`
    fn get_schema<'a>(&'a self, class: &'a str) -> BoxFuture<'a, Result<Option<ClassSchema>>>;

    /// 创建类定义
    fn create_schema<'a>(&'a self, schema: &'a ClassSchema) -> BoxFuture<'a, Result<()>>;

    /// 批量写入，任何一条失败都视为整批失败
    fn batch_write<'a>(
        &'a self,
        class: &'a str,
        objects: &'a [StoreObject],
    ) -> BoxFuture<'a, Result<()>>;

    fn query_text<'a>(&'a self, query: &'a TextQuery) -> BoxFuture<'a, Result<Vec<SearchResult>>>;

    fn query_image<'a>(&'a self, query: &'a ImageQuery) -> BoxFuture<'a, Result<Vec<SearchResult>>>;
}

/// schema 的创建结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaStatus {
    Created,
    Existing,
}

/// 确保类定义存在
///
/// 已存在且兼容时直接返回，不兼容时返回 [`Error::SchemaConflict`]。
pub async fn ensure_schema(store: &dyn VectorStore, schema: &ClassSchema) -> Result<SchemaStatus> {
    match store.get_schema(&schema.class).await? {
        Some(existing) => match schema.incompatibility(&existing) {
            None => {
                info!("类 {} 已存在", schema.class);
                Ok(SchemaStatus::Existing)
            }
            Some(reason) => {
                let reason = format!("类 {}: {}", schema.class, reason);
                Err(Error::SchemaConflict(reason))
            }
        },
        None => {
            info!("创建类 {}", schema.class);
            store.create_schema(schema).await?;
            Ok(SchemaStatus::Created)
        }
    }
}
