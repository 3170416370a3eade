//! 商品目录读取
//!
//! 目录文件为带表头的分隔文本，至少包含 `image` 与 `display name` 两列：
//!
//! ```csv
//! image,display name
//! 1163.jpg,Turtle Check Men Navy Blue Shirt
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use log::warn;

use crate::error::{Error, Result};

/// 图片路径所在列
pub const IMAGE_COLUMN: &str = "image";
/// 商品名称所在列
pub const TITLE_COLUMN: &str = "display name";

/// 目录中的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRecord {
    /// 相对于数据集根目录的图片路径
    pub image_ref: String,
    /// 商品名称，允许为空
    pub title: String,
}

/// 目录读取器
///
/// 每次调用 [`CatalogReader::records`] 都会重新打开文件，从头开始读取。
#[derive(Debug, Clone)]
pub struct CatalogReader {
    path: PathBuf,
    delimiter: u8,
}

impl CatalogReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
        }
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 打开目录文件，返回惰性的记录迭代器
    ///
    /// 只有文件本身无法打开时才会返回错误，缺少必要列的行会被直接跳过。
    pub fn records(&self) -> Result<CatalogRecords> {
        let file = File::open(&self.path).map_err(|e| Error::io(&self.path, e))?;
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(file);

        let columns = match reader.headers() {
            Ok(headers) => Columns::locate(headers),
            Err(e) => {
                warn!("无法读取目录表头 {}: {}", self.path.display(), e);
                None
            }
        };
        if columns.is_none() {
            warn!(
                "目录 {} 缺少 `{}` 或 `{}` 列，将不会产生任何记录",
                self.path.display(),
                IMAGE_COLUMN,
                TITLE_COLUMN
            );
        }

        Ok(CatalogRecords {
            rows: reader.into_records(),
            columns,
        })
    }

    /// 统计有效记录数量
    pub fn count(&self) -> Result<usize> {
        Ok(self.records()?.count())
    }
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    image: usize,
    title: usize,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Option<Self> {
        let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
        Some(Self {
            image: find(IMAGE_COLUMN)?,
            title: find(TITLE_COLUMN)?,
        })
    }

    fn extract(&self, row: &StringRecord) -> Option<CatalogRecord> {
        let image_ref = row.get(self.image)?;
        let title = row.get(self.title)?;
        if image_ref.is_empty() {
            return None;
        }
        Some(CatalogRecord {
            image_ref: image_ref.to_owned(),
            title: title.to_owned(),
        })
    }
}

/// 目录记录迭代器
pub struct CatalogRecords {
    rows: StringRecordsIntoIter<File>,
    columns: Option<Columns>,
}

impl Iterator for CatalogRecords {
    type Item = CatalogRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let columns = self.columns?;
        for row in self.rows.by_ref() {
            // 无法解析的行与缺列的行一样直接跳过
            let Ok(row) = row else { continue };
            if let Some(record) = columns.extract(&row) {
                return Some(record);
            }
        }
        None
    }
}
