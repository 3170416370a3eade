use std::sync::Arc;

use crate::query::Searcher;

/// 应用状态
pub struct AppState {
    /// 检索器，内部持有共享的向量数据库客户端
    pub searcher: Searcher,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(searcher: Searcher) -> Arc<Self> {
        Arc::new(AppState { searcher })
    }
}
