use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// 图片目录检索过程中可能出现的错误
#[derive(Debug, Error)]
pub enum Error {
    /// 目录文件或图片文件无法读取
    #[error("无法读取 {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 图片路径不存在
    #[error("图片不存在: {}", .0.display())]
    ImageIo(PathBuf),

    /// 图片无法解码或编码
    #[error("图片解码失败: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// 请求格式不正确
    #[error("请求参数无效: {0}")]
    Validation(String),

    /// 向量数据库中已存在不兼容的 schema
    #[error("schema 冲突: {0}")]
    SchemaConflict(String),

    /// 向量数据库传输或索引错误
    #[error("向量数据库错误: {0}")]
    VectorStore(String),

    /// 线程池、后台任务等内部错误
    #[error("内部错误: {0}")]
    Internal(String),

    /// 查询超过调用方给定的时限
    #[error("请求超时（{0:?}）")]
    Timeout(Duration),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::VectorStore(msg.into())
    }

    /// 是否属于调用方的错误（对应 HTTP 4xx）
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::ImageDecode(_) | Self::ImageIo(_)
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::VectorStore(err.to_string())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
