use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use crate::cli::{SubCommandExtend, connect};
use crate::config::{Opts, QueryOptions};
use crate::query::{ImageUpload, Searcher, TextSearchRequest};
use crate::store::SearchResult;

#[derive(Parser, Debug, Clone)]
pub struct SearchCommand {
    #[command(flatten)]
    pub query: QueryOptions,
    /// 检索关键词
    #[arg(
        long,
        value_name = "QUERY",
        conflicts_with = "image",
        required_unless_present = "image"
    )]
    pub text: Option<String>,
    /// 被搜索的图片路径
    #[arg(long, value_name = "FILE")]
    pub image: Option<PathBuf>,
    /// 显示的结果数量
    #[arg(long, value_name = "COUNT")]
    pub count: Option<i64>,
    /// 输出格式
    #[arg(
        long,
        value_name = "FORMAT",
        value_enum,
        default_value_t = OutputFormat::Table
    )]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for SearchCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let client = connect(&opts.store).await?;
        let searcher = Searcher::new(Arc::new(client), &opts.store.class_name, &self.query);

        let results = match (&self.text, &self.image) {
            (Some(text), _) => {
                let req = TextSearchRequest {
                    query: Some(text.clone()),
                    limit: self.count,
                };
                searcher.text(req).await?.results
            }
            (None, Some(path)) => {
                let data = tokio::fs::read(path)
                    .await
                    .with_context(|| format!("无法读取图片 {}", path.display()))?;
                let upload = ImageUpload {
                    data,
                    content_type: Some(guess_mime(path)),
                    limit: self.count,
                };
                searcher.image(upload).await?.results
            }
            (None, None) => unreachable!("clap 保证至少提供一个检索条件"),
        };

        print_result(&results, self.output_format)
    }
}

/// 本地文件只用于确定是否为图片，具体格式由解码器判断
fn guess_mime(path: &std::path::Path) -> String {
    match image::ImageFormat::from_path(path) {
        Ok(format) => format.to_mime_type().to_owned(),
        Err(_) => "application/octet-stream".to_owned(),
    }
}

fn print_result(result: &[SearchResult], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result)?)
        }
        OutputFormat::Table => {
            for (i, r) in result.iter().enumerate() {
                println!("{}\t{}\t{} bytes", i + 1, r.title, r.image.len() * 3 / 4);
            }
        }
    }
    Ok(())
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Json,
    Table,
}
