mod ingest;
mod search;
mod server;

pub use ingest::*;
pub use search::*;
pub use server::*;

use anyhow::Context;
use log::info;

use crate::config::{Opts, StoreOptions};
use crate::store::{VectorStore, WeaviateClient};

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}

/// 创建 Weaviate 客户端并确认可以连接
pub async fn connect(opts: &StoreOptions) -> anyhow::Result<WeaviateClient> {
    let client = WeaviateClient::new(&opts.weaviate_url, opts.timeout())?;
    client
        .ready()
        .await
        .with_context(|| format!("无法连接到 Weaviate: {}", client.base_url()))?;
    info!("已连接到 Weaviate: {}", client.base_url());
    Ok(client)
}
