//! 目录导入：读取目录 → 标准化图片 → 分批写入向量数据库

mod uploader;

use std::panic::{UnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::Arc;

use indicatif::ProgressBar;
use log::{error, info, warn};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;
use tokio::task::spawn_blocking;

pub use self::uploader::*;
use crate::catalog::{CatalogReader, CatalogRecord};
use crate::config::IngestOptions;
use crate::error::{Error, Result};
use crate::metrics;
use crate::normalize::{NormalizedImage, normalize_file};
use crate::store::{ClassSchema, IMAGE_CLASS, VectorStore, ensure_schema};

/// 一次导入的统计信息
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestionStats {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl IngestionStats {
    pub fn is_consistent(&self) -> bool {
        self.processed == self.succeeded + self.failed
    }
}

/// 导入任务
///
/// 批次之间严格按目录顺序处理，同一时间只有一次写入在进行；
/// 批次内部的图片在独立的线程池中并行标准化。
pub struct Ingestor<'a> {
    store: &'a dyn VectorStore,
    schema: ClassSchema,
    opts: IngestOptions,
    pool: Arc<ThreadPool>,
    pb: ProgressBar,
}

impl<'a> Ingestor<'a> {
    pub fn new(store: &'a dyn VectorStore, opts: IngestOptions) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(opts.concurrency.max(1))
            .thread_name(|i| format!("normalize-{i}"))
            .build()
            .map_err(|e| Error::Internal(format!("无法创建线程池: {e}")))?;
        Ok(Self {
            store,
            schema: ClassSchema::image_class(IMAGE_CLASS),
            opts,
            pool: Arc::new(pool),
            pb: ProgressBar::hidden(),
        })
    }

    /// 使用自定义的类定义
    pub fn schema(mut self, schema: ClassSchema) -> Self {
        self.schema = schema;
        self
    }

    /// 使用进度条展示导入进度
    pub fn progress(mut self, pb: ProgressBar) -> Self {
        self.pb = pb;
        self
    }

    /// 执行导入
    ///
    /// # Arguments
    ///
    /// * `catalog` - 目录读取器
    /// * `dataset_root` - 图片所在的根目录，目录中的图片路径相对于此目录
    /// * `limit` - 只导入前 `limit` 条记录
    ///
    /// 只有 schema 准备失败或目录文件无法打开时才会返回错误，
    /// 单张图片或单个批次的失败只会计入统计信息。
    pub async fn run(
        &self,
        catalog: &CatalogReader,
        dataset_root: &Path,
        limit: Option<usize>,
    ) -> Result<IngestionStats> {
        ensure_schema(self.store, &self.schema).await?;

        let total = catalog.count()?;
        let total = limit.map_or(total, |limit| limit.min(total));
        let batch_size = self.opts.batch_size.max(1);
        let batches = total.div_ceil(batch_size);
        info!("共 {} 条记录，分为 {} 个批次", total, batches);
        self.pb.set_length(total as u64);

        let mut records = catalog.records()?.take(limit.unwrap_or(usize::MAX));
        let keyed = !self.opts.no_object_id;
        let uploader = BatchUploader::new(self.store, &self.schema.class, keyed);
        let mut stats = IngestionStats::default();

        for index in 1.. {
            let batch = records.by_ref().take(batch_size).collect::<Vec<_>>();
            if batch.is_empty() {
                break;
            }
            info!("正在处理批次 {}/{}", index, batches);

            let size = batch.len();
            let (ready, failed) = self.normalize_batch(batch, dataset_root).await;
            stats.processed += size;
            stats.failed += failed;
            metrics::inc_ingested("invalid", failed);

            if !ready.is_empty() {
                let count = ready.len();
                match self.upload(&uploader, &ready).await {
                    Ok(()) => {
                        stats.succeeded += count;
                        metrics::inc_batch_write("ok");
                        metrics::inc_ingested("ok", count);
                    }
                    Err(e) => {
                        error!("批次 {} 写入失败，{} 条记录计为失败: {}", index, count, e);
                        stats.failed += count;
                        metrics::inc_batch_write("error");
                        metrics::inc_ingested("error", count);
                    }
                }
            }

            self.pb.inc(size as u64);
            self.pb.set_message(format!("成功 {} 失败 {}", stats.succeeded, stats.failed));
        }

        debug_assert!(stats.is_consistent());
        info!(
            "导入完成：处理 {} 条，成功 {} 条，失败 {} 条",
            stats.processed, stats.succeeded, stats.failed
        );
        Ok(stats)
    }

    /// 并行标准化一个批次的图片，返回成功的记录与失败数量
    ///
    /// 单张图片解码时 panic 只会让这一条记录失败；
    /// 后台任务本身异常退出时整个批次计为失败。
    async fn normalize_batch(
        &self,
        batch: Vec<CatalogRecord>,
        dataset_root: &Path,
    ) -> (Vec<IngestRecord>, usize) {
        let size = batch.len();
        let pool = self.pool.clone();
        let root = dataset_root.to_path_buf();
        let task = spawn_blocking(move || {
            pool.install(|| {
                batch
                    .into_par_iter()
                    .map(|record| {
                        let path = root.join(&record.image_ref);
                        let image = guarded(|| load_image(&path));
                        (record, image)
                    })
                    .collect::<Vec<_>>()
            })
        });
        let results = match task.await {
            Ok(results) => results,
            Err(e) => {
                error!("标准化任务异常退出，{} 条记录计为失败: {}", size, e);
                return (vec![], size);
            }
        };

        let mut ready = Vec::with_capacity(results.len());
        let mut failed = 0;
        for (record, image) in results {
            match image {
                Ok(image) => ready.push(IngestRecord { record, image }),
                Err(e) => {
                    self.pb.suspend(|| warn!("跳过 {}: {}", record.image_ref, e));
                    failed += 1;
                }
            }
        }
        (ready, failed)
    }

    /// 写入一个批次，失败时按配置显式重试
    async fn upload(&self, uploader: &BatchUploader<'_>, batch: &[IngestRecord]) -> Result<()> {
        let mut attempt = 0;
        loop {
            match uploader.upload(batch).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.opts.retries => {
                    attempt += 1;
                    warn!("批次写入失败，第 {} 次重试: {}", attempt, e);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn load_image(path: &Path) -> Result<NormalizedImage> {
    if !path.is_file() {
        return Err(Error::ImageIo(path.to_path_buf()));
    }
    normalize_file(path)
}

/// 把 panic 转换为错误
fn guarded<T>(f: impl FnOnce() -> Result<T> + UnwindSafe) -> Result<T> {
    catch_unwind(f).unwrap_or_else(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_owned());
        Err(Error::Internal(format!("图片处理时发生 panic: {reason}")))
    })
}
