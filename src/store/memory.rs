use std::collections::HashSet;
use std::sync::Mutex;

use futures::FutureExt;
use futures::future::BoxFuture;

use super::*;

#[derive(Default)]
struct Inner {
    schema: Option<ClassSchema>,
    objects: Vec<StoreObject>,
    batch_sizes: Vec<usize>,
    queries: usize,
    fail_writes: HashSet<usize>,
    fail_queries: bool,
}

/// 内存中的向量数据库
///
/// 不计算向量：文本检索按标题子串匹配，以图搜图按写入顺序返回。
/// 会记录每次调用，并可以让指定的批量写入失败，主要用于测试与演练。
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(schema: ClassSchema) -> Self {
        let store = Self::new();
        store.lock().schema = Some(schema);
        store
    }

    /// 让第 `n` 次（从 0 开始）批量写入失败
    pub fn fail_write(self, n: usize) -> Self {
        self.lock().fail_writes.insert(n);
        self
    }

    /// 让所有检索失败
    pub fn fail_queries(self) -> Self {
        self.lock().fail_queries = true;
        self
    }

    /// 直接插入记录
    pub fn insert(&self, title: impl Into<String>, image: impl Into<String>) {
        self.lock().objects.push(StoreObject {
            id: None,
            title: title.into(),
            image: image.into(),
        });
    }

    /// 每次批量写入调用的记录数，包括失败的调用
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.lock().batch_sizes.clone()
    }

    pub fn write_calls(&self) -> usize {
        self.lock().batch_sizes.len()
    }

    pub fn query_calls(&self) -> usize {
        self.lock().queries
    }

    pub fn objects(&self) -> Vec<StoreObject> {
        self.lock().objects.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // 持锁期间不会 panic，中毒时沿用内部数据
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn search(
        &self,
        limit: usize,
        filter: impl Fn(&StoreObject) -> bool,
    ) -> Result<Vec<SearchResult>> {
        let mut inner = self.lock();
        inner.queries += 1;
        if inner.fail_queries {
            return Err(Error::store("memory store: query failure injected"));
        }
        Ok(inner
            .objects
            .iter()
            .filter(|o| filter(o))
            .take(limit)
            .map(|o| SearchResult {
                title: o.title.clone(),
                image: o.image.clone(),
            })
            .collect())
    }
}

impl VectorStore for MemoryStore {
    fn ready(&self) -> BoxFuture<'_, Result<()>> {
        async { Ok(()) }.boxed()
    }

    fn get_schema<'a>(&'a self, class: &'a str) -> BoxFuture<'a, Result<Option<ClassSchema>>> {
        async move { Ok(self.lock().schema.clone().filter(|s| s.class == class)) }
            .boxed()
    }

    fn create_schema<'a>(&'a self, schema: &'a ClassSchema) -> BoxFuture<'a, Result<()>> {
        async move {
            let mut inner = self.lock();
            if inner.schema.is_some() {
                return Err(Error::store(format!("class {} already exists", schema.class)));
            }
            inner.schema = Some(schema.clone());
            Ok(())
        }
        .boxed()
    }

    fn batch_write<'a>(
        &'a self,
        _class: &'a str,
        objects: &'a [StoreObject],
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let mut inner = self.lock();
            let call = inner.batch_sizes.len();
            inner.batch_sizes.push(objects.len());
            if inner.fail_writes.contains(&call) {
                return Err(Error::store(format!("memory store: write #{call} failure injected")));
            }
            for object in objects {
                let pos = object
                    .id
                    .as_ref()
                    .and_then(|id| inner.objects.iter().position(|o| o.id.as_ref() == Some(id)));
                match pos {
                    Some(i) => inner.objects[i] = object.clone(),
                    None => inner.objects.push(object.clone()),
                }
            }
            Ok(())
        }
        .boxed()
    }

    fn query_text<'a>(&'a self, query: &'a TextQuery) -> BoxFuture<'a, Result<Vec<SearchResult>>> {
        async move {
            let terms = query
                .query
                .split_whitespace()
                .map(str::to_lowercase)
                .collect::<Vec<_>>();
            self.search(query.limit, |o| {
                let title = o.title.to_lowercase();
                terms.iter().any(|t| title.contains(t.as_str()))
            })
        }
        .boxed()
    }

    fn query_image<'a>(
        &'a self,
        query: &'a ImageQuery,
    ) -> BoxFuture<'a, Result<Vec<SearchResult>>> {
        async move { self.search(query.limit, |_| true) }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(id: Option<&str>, title: &str) -> StoreObject {
        StoreObject {
            id: id.map(str::to_owned),
            title: title.to_owned(),
            image: "AA==".to_owned(),
        }
    }

    #[tokio::test]
    async fn keyed_objects_are_replaced() {
        let store = MemoryStore::new();
        let batch = [object(Some("a"), "Jeans"), object(None, "Shirt")];
        store.batch_write(IMAGE_CLASS, &batch).await.unwrap();
        store.batch_write(IMAGE_CLASS, &batch).await.unwrap();
        assert_eq!(store.objects().len(), 3);
        assert_eq!(store.batch_sizes(), vec![2, 2]);
    }

    #[tokio::test]
    async fn injected_write_failure() {
        let store = MemoryStore::new().fail_write(0);
        let batch = [object(None, "Jeans")];
        assert!(store.batch_write(IMAGE_CLASS, &batch).await.is_err());
        assert!(store.batch_write(IMAGE_CLASS, &batch).await.is_ok());
        assert_eq!(store.objects().len(), 1);
        assert_eq!(store.write_calls(), 2);
    }

    #[tokio::test]
    async fn text_query_matches_titles() {
        let store = MemoryStore::new();
        store.insert("Slim Fit Jeans", "AA==");
        store.insert("Cotton Shirt", "AA==");
        let query = TextQuery {
            class: IMAGE_CLASS.to_owned(),
            query: "JEANS".to_owned(),
            limit: 10,
        };
        let results = store.query_text(&query).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Slim Fit Jeans");
        assert_eq!(store.query_calls(), 1);
    }
}
