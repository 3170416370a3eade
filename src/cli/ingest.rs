use std::path::PathBuf;

use anyhow::{Result, ensure};
use clap::Parser;
use indicatif::ProgressBar;
use log::info;

use crate::catalog::CatalogReader;
use crate::cli::{SubCommandExtend, connect};
use crate::config::{IngestOptions, Opts, parse_positive};
use crate::ingest::Ingestor;
use crate::store::ClassSchema;
use crate::utils::pb_style;

#[derive(Parser, Debug, Clone)]
pub struct IngestCommand {
    #[command(flatten)]
    pub ingest: IngestOptions,
    /// 商品目录文件，至少包含 `image` 与 `display name` 两列
    #[arg(long, value_name = "FILE", default_value = "dataset/data.csv")]
    pub catalog: PathBuf,
    /// 图片根目录，目录文件中的图片路径相对于此目录
    #[arg(long, value_name = "DIR", default_value = "dataset/data")]
    pub dataset: PathBuf,
    /// 只导入前 N 条记录，N 必须大于 0
    #[arg(short, long, value_name = "N", value_parser = parse_positive)]
    pub limit: Option<usize>,
    /// 目录文件的分隔符
    #[arg(long, value_name = "CHAR", default_value_t = ',')]
    pub delimiter: char,
}

impl SubCommandExtend for IngestCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        ensure!(self.delimiter.is_ascii(), "分隔符必须是 ASCII 字符");

        let client = connect(&opts.store).await?;
        let catalog = CatalogReader::new(&self.catalog).delimiter(self.delimiter as u8);

        let pb = ProgressBar::no_length().with_style(pb_style());
        let ingestor = Ingestor::new(&client, self.ingest.clone())?
            .schema(ClassSchema::image_class(&opts.store.class_name))
            .progress(pb.clone());

        info!("开始导入 {}", self.catalog.display());
        let stats = ingestor.run(&catalog, &self.dataset, self.limit).await?;
        pb.finish_with_message("导入完成");

        println!("{}", serde_json::to_string_pretty(&stats)?);
        Ok(())
    }
}
