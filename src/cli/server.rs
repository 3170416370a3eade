use std::sync::Arc;

use anyhow::anyhow;
use clap::Parser;
use log::{error, info};
use prometheus::{BasicAuthentication, labels};
use tokio::net::TcpListener;
use tokio::task::spawn_blocking;
use tokio::time::{Duration, sleep};

use crate::cli::{SubCommandExtend, connect};
use crate::config::{Opts, QueryOptions};
use crate::query::Searcher;
use crate::server;

#[derive(Parser, Debug, Clone)]
pub struct ServerCommand {
    #[command(flatten)]
    pub query: QueryOptions,
    /// 监听地址
    #[arg(long, env = "IMCATALOG_ADDR", default_value = "127.0.0.1:3001")]
    pub addr: String,
    /// prometheus 主动推送地址
    #[arg(long, value_name = "URL")]
    pub prometheus_push: Option<String>,
    /// 自定义 instance 标签值
    #[arg(long, value_name = "NAME")]
    pub prometheus_instance: Option<String>,
    /// prometheus 认证信息，格式为 username:password
    #[arg(long, value_name = "AUTH")]
    pub prometheus_auth: Option<String>,
}

impl ServerCommand {
    fn push_auth(&self) -> anyhow::Result<Option<(String, String)>> {
        self.prometheus_auth
            .as_deref()
            .map(|s| {
                s.split_once(':')
                    .map(|(username, password)| (username.to_string(), password.to_string()))
                    .ok_or_else(|| anyhow!("prometheus 认证信息格式应为 username:password"))
            })
            .transpose()
    }

    fn spawn_push_loop(&self, url: String) -> anyhow::Result<()> {
        let instance = self
            .prometheus_instance
            .clone()
            .unwrap_or_else(|| self.addr.clone());
        let auth = self.push_auth()?;
        tokio::spawn(async move {
            loop {
                let metric_families = prometheus::gather();
                let url = url.clone();
                let instance = instance.clone();
                let auth = auth.clone();
                let r = spawn_blocking(move || {
                    prometheus::push_metrics(
                        "imcatalog",
                        labels! {
                            "instance".to_string() => instance,
                        },
                        &url,
                        metric_families,
                        auth.map(|(username, password)| BasicAuthentication { username, password }),
                    )
                })
                .await;
                match r {
                    Ok(Err(e)) => error!("推送指标失败: {e}"),
                    Err(e) => error!("推送任务异常退出: {e}"),
                    Ok(Ok(())) => {}
                }
                sleep(Duration::from_secs(30)).await;
            }
        });
        Ok(())
    }
}

impl SubCommandExtend for ServerCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let client = connect(&opts.store).await?;
        let searcher = Searcher::new(Arc::new(client), &opts.store.class_name, &self.query);

        // 创建应用状态
        let state = server::AppState::new(searcher);

        // 创建应用
        let app = server::create_app(state);

        if let Some(url) = self.prometheus_push.clone() {
            self.spawn_push_loop(url)?;
        }

        // 启动服务器
        info!("服务器启动：http://{}", &self.addr);
        info!("API 文档：http://{}/docs", &self.addr);
        let listener = TcpListener::bind(&self.addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
