use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::cli::*;
use crate::store::IMAGE_CLASS;

#[derive(Parser, Debug, Clone)]
pub struct StoreOptions {
    /// Weaviate 地址
    #[arg(
        long,
        global = true,
        value_name = "URL",
        env = "WEAVIATE_URL",
        default_value = "http://localhost:8080"
    )]
    pub weaviate_url: String,
    /// 单次请求 Weaviate 的超时时间，单位为秒
    #[arg(long, global = true, value_name = "SECS", default_value_t = 60)]
    pub store_timeout: u64,
    /// 存放商品图片的类名
    #[arg(long, global = true, value_name = "NAME", default_value = IMAGE_CLASS)]
    pub class_name: String,
}

impl StoreOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout)
    }
}

#[derive(Parser, Debug, Clone)]
pub struct IngestOptions {
    /// 每批写入的记录数量
    #[arg(
        short,
        long,
        value_name = "SIZE",
        default_value_t = 100,
        value_parser = parse_positive
    )]
    pub batch_size: usize,
    /// 并行标准化图片的线程数
    #[arg(
        short = 'j',
        long,
        value_name = "N",
        default_value_t = num_cpus::get(),
        value_parser = parse_positive
    )]
    pub concurrency: usize,
    /// 批次写入失败后的重试次数
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub retries: u32,
    /// 不为对象生成确定性 ID，重复导入会产生重复记录
    #[arg(long)]
    pub no_object_id: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            batch_size: 100,
            concurrency: num_cpus::get(),
            retries: 0,
            no_object_id: false,
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct QueryOptions {
    /// 检索超时时间，单位为秒
    #[arg(
        long,
        value_name = "SECS",
        default_value_t = 30.,
        value_parser = parse_timeout
    )]
    pub query_timeout: f64,
    /// 未指定时返回的结果数量
    #[arg(
        long,
        value_name = "COUNT",
        default_value_t = 10,
        value_parser = parse_positive
    )]
    pub default_limit: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            query_timeout: 30.,
            default_limit: 10,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "imcatalog", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    #[command(flatten)]
    pub store: StoreOptions,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 导入商品目录到向量数据库
    Ingest(IngestCommand),
    /// 按文本或图片检索商品
    Search(SearchCommand),
    /// 启动 HTTP 检索服务
    Server(ServerCommand),
}

pub(crate) fn parse_positive(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("必须大于 0".to_owned()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

/// 超时时间必须是有限的正数
fn parse_timeout(s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs > 0. => Ok(secs),
        Ok(_) => Err("必须是大于 0 的有限数值".to_owned()),
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn parses_ingest_defaults() {
        let args = ["imcatalog", "ingest", "--limit", "5"];
        let opts = Opts::try_parse_from(args).unwrap();
        let SubCommand::Ingest(cmd) = opts.subcmd else {
            panic!("not ingest")
        };
        assert_eq!(cmd.ingest.batch_size, 100);
        assert_eq!(cmd.limit, Some(5));
        assert_eq!(opts.store.class_name, "Image");
    }

    #[rstest]
    #[case(&["ingest", "--batch-size", "0"])]
    #[case(&["ingest", "--limit", "0"])]
    #[case(&["server", "--query-timeout", "0"])]
    #[case(&["server", "--query-timeout", "-1"])]
    #[case(&["server", "--query-timeout", "NaN"])]
    #[case(&["server", "--query-timeout", "inf"])]
    #[case(&["search", "--text", "jeans", "--query-timeout", "-0.5"])]
    fn rejects_invalid_values(#[case] args: &[&str]) {
        let args = std::iter::once("imcatalog").chain(args.iter().copied());
        assert!(Opts::try_parse_from(args).is_err());
    }

    #[test]
    fn accepts_fractional_timeout() {
        let args = ["imcatalog", "server", "--query-timeout", "0.5"];
        let opts = Opts::try_parse_from(args).unwrap();
        let SubCommand::Server(cmd) = opts.subcmd else {
            panic!("not server")
        };
        assert_eq!(cmd.query.query_timeout, 0.5);
    }
}
