// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

use bytes::Bytes;
use clap::Parser;
use hyper::Request;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use net_monitor::config::Config;
use net_monitor::export::{to_metrics_text, to_shell_command, to_text, write_json_lines};
use net_monitor::query::{Category, Query, SortKey, SortOrder};
use net_monitor::record::{CustomEntry, LogLevel};
use net_monitor::transport::{HyperTransport, Transport};
use net_monitor::Monitor;

#[derive(Parser, Debug)]
#[command(name = "net-monitor")]
struct Args {
    /// Optional config TOML path
    #[arg(long)]
    config: Option<String>,

    /// Print a curl command for each request
    #[arg(long)]
    curl: bool,

    /// Print transaction metrics when available
    #[arg(long)]
    metrics: bool,

    /// Print records as JSON lines instead of text
    #[arg(long)]
    jsonl: bool,

    /// Only show records matching this text or status code
    #[arg(long)]
    search: Option<String>,

    /// URLs to fetch
    #[arg(required = true)]
    urls: Vec<String>,
}

async fn load_config(path: Option<&str>) -> Config {
    match path {
        Some(p) => Config::load_from_path(p).await.unwrap_or_else(|e| {
            warn!(%p, %e, "failed to load config, using defaults");
            Config::default()
        }),
        None => Config::default(),
    }
}

fn query_for(args: &Args) -> Query {
    let query = Query::default()
        .category(Category::All)
        .sorted(SortKey::CreatedAt, SortOrder::Ascending);
    match &args.search {
        Some(text) => query.search(text.clone()),
        None => query,
    }
}

/// Fetch every URL through an intercepted session, then write the view.
async fn run<W>(args: &Args, monitor: &Monitor, transport: Arc<dyn Transport>, out: &mut W) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    monitor.start_intercepting();
    monitor.record(
        CustomEntry::new(LogLevel::Debug, "net-monitor", "fetch started")
            .parameter("urls", args.urls.len().to_string()),
    );

    let session = monitor.session(transport).delegate("net-monitor").build();
    for url in &args.urls {
        let request = match Request::get(url.as_str()).body(Bytes::new()) {
            Ok(r) => r,
            Err(e) => {
                warn!(%url, %e, "skipping invalid url");
                continue;
            }
        };
        match session.fetch(request).await {
            Ok(resp) => info!(%url, status = %resp.status, bytes = resp.body.len(), "fetched"),
            Err(e) => warn!(%url, %e, "fetch failed"),
        }
    }
    monitor.stop_intercepting();

    let records = monitor.view(&query_for(args));
    if args.jsonl {
        write_json_lines(out, &records).await?;
        out.flush().await?;
        return Ok(());
    }

    for record in &records {
        let mut text = to_text(record);
        if args.curl {
            if let Some(cmd) = to_shell_command(record) {
                text.push('\n');
                text.push_str(&cmd);
                text.push('\n');
            }
        }
        if args.metrics {
            if let Some(metrics) = &record.metrics {
                text.push('\n');
                text.push_str(&to_metrics_text(metrics));
            }
        }
        text.push_str("\n\n");
        out.write_all(text.as_bytes()).await?;
    }
    out.flush().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let cfg = load_config(args.config.as_deref()).await;
    let monitor = Monitor::new(&cfg);
    let transport = Arc::new(HyperTransport::new()?);

    let mut stdout = tokio::io::stdout();
    run(&args, &monitor, transport, &mut stdout).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use net_monitor::registry::Registry;
    use tokio::fs;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn main_cli_config_loads_toml() -> anyhow::Result<()> {
        let tmp = std::env::temp_dir().join(format!("net-monitor_main_cfg_{}.toml", Uuid::new_v4()));
        fs::write(&tmp, "[general]\nmax_records = 3\n").await?;
        let args = Args::try_parse_from([
            "net-monitor",
            "--config",
            tmp.to_str().ok_or_else(|| anyhow::anyhow!("tmp path not utf8"))?,
            "http://a.test/",
        ])?;

        let cfg = load_config(args.config.as_deref()).await;
        assert_eq!(cfg.general.max_records, 3);
        fs::remove_file(&tmp).await?;
        Ok(())
    }

    #[tokio::test]
    async fn main_bad_config_uses_defaults() {
        let cfg = load_config(Some("/nonexistent/net-monitor.toml")).await;
        assert_eq!(cfg.general.channel_capacity, 64);
    }

    #[test]
    fn urls_are_required() {
        assert!(Args::try_parse_from(["net-monitor", "--curl"]).is_err());
    }

    #[tokio::test]
    async fn run_prints_filtered_records() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200).set_body_string("fine"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let ok = format!("{}/ok", server.uri());
        let missing = format!("{}/missing", server.uri());
        let args = Args::try_parse_from(["net-monitor", "--curl", "--search", "missing", &ok, &missing])?;
        let monitor = Monitor::with_registry(&Config::default(), Registry::new());
        let mut out: Vec<u8> = Vec::new();
        run(&args, &monitor, Arc::new(HyperTransport::new()?), &mut out).await?;

        let text = String::from_utf8(out)?;
        assert!(text.contains(&missing));
        assert!(!text.contains(&ok));
        assert!(text.contains("curl -v"));
        // log entry plus two requests
        assert_eq!(monitor.snapshot().len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn run_writes_json_lines() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let url = format!("{}/", server.uri());
        let args = Args::try_parse_from(["net-monitor", "--jsonl", &url])?;
        let monitor = Monitor::with_registry(&Config::default(), Registry::new());
        let mut out: Vec<u8> = Vec::new();
        run(&args, &monitor, Arc::new(HyperTransport::new()?), &mut out).await?;

        let text = String::from_utf8(out)?;
        assert_eq!(text.lines().count(), 2);
        Ok(())
    }
}
