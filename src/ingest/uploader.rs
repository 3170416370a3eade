use crate::catalog::CatalogRecord;
use crate::error::{Error, Result};
use crate::normalize::NormalizedImage;
use crate::store::{StoreObject, VectorStore};
use crate::utils::object_id;

/// 标准化成功的目录记录
#[derive(Debug, Clone)]
pub struct IngestRecord {
    pub record: CatalogRecord,
    pub image: NormalizedImage,
}

impl IngestRecord {
    fn to_object(&self, keyed: bool) -> StoreObject {
        StoreObject {
            id: keyed.then(|| object_id(&self.record.image_ref)),
            title: self.record.title.clone(),
            image: self.image.to_base64(),
        }
    }
}

/// 批量上传：一批记录对应一次写入调用，不做重试
pub struct BatchUploader<'a> {
    store: &'a dyn VectorStore,
    class: &'a str,
    keyed: bool,
}

impl<'a> BatchUploader<'a> {
    /// # Arguments
    ///
    /// * `keyed` - 是否为每个对象附带确定性 ID
    pub fn new(store: &'a dyn VectorStore, class: &'a str, keyed: bool) -> Self {
        Self {
            store,
            class,
            keyed,
        }
    }

    /// 上传一批记录，任何错误都意味着整批失败
    pub async fn upload(&self, batch: &[IngestRecord]) -> Result<()> {
        if batch.is_empty() {
            return Err(Error::validation("批次不能为空"));
        }
        let objects = batch
            .iter()
            .map(|r| r.to_object(self.keyed))
            .collect::<Vec<_>>();
        self.store.batch_write(self.class, &objects).await
    }
}
