//! Feeds a file of control requests and routing messages through the router
//! pipeline and prints one JSON line per result.
//!
//! Input is either a JSON array or JSON lines. Entries with an `action` field
//! are control requests (`subscribe`, `update`, `unsubscribe`, `list`,
//! `statistics`); all others are routing messages:
//!
//! ```json
//! {"action": "subscribe", "subscriptionId": "f1", "subscribeChannel": "orders",
//!  "priority": 10, "destinationUri": "queue:q1", "predicateName": "always"}
//! {"channel": "orders", "body": {"id": 1}, "headers": {"region": "eu"}}
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context as _};
use async_trait::async_trait;
use clap::Parser;
use dynrouter_core::{HeaderEquals, Message, SystemClock};
use dynrouter_server::service::middleware::build_operation_pipeline;
use dynrouter_server::service::{DispatchOptions, OperationResponse, RecipientMode};
use dynrouter_server::{
    build_router, EndpointDispatcher, FilterService, OperationService, PredicateRegistry,
    RouterConfig,
};
use serde_json::json;
use tower::{Service, ServiceExt};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "router-demo", about = "Run messages through the dynamic router")]
struct Args {
    /// JSON array or JSON-lines file of envelopes.
    #[arg(short, long, value_name = "FILE", env = "DYNROUTER_INPUT")]
    input: PathBuf,

    /// Deliver to every matching filter instead of the first one.
    #[arg(long, env = "DYNROUTER_ALL_MATCH")]
    all_match: bool,

    /// Log dropped messages at WARN instead of DEBUG.
    #[arg(long, env = "DYNROUTER_WARN_DROPPED")]
    warn_dropped: bool,

    /// Deliver to recipients concurrently.
    #[arg(long, env = "DYNROUTER_PARALLEL")]
    parallel: bool,

    /// Fail a routing operation on its first failed delivery.
    #[arg(long, env = "DYNROUTER_STOP_ON_EXCEPTION")]
    stop_on_exception: bool,

    #[arg(long, default_value_t = 30_000, env = "DYNROUTER_TIMEOUT_MS")]
    timeout_ms: u64,

    #[arg(long, default_value_t = 1000, env = "DYNROUTER_MAX_CONCURRENT")]
    max_concurrent: u32,

    /// Extra predicate `NAME=HEADER:VALUE` matching a string header.
    /// May be repeated.
    #[arg(long = "header-predicate", value_name = "NAME=HEADER:VALUE")]
    header_predicates: Vec<String>,

    /// Emit logs as JSON.
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    fn router_config(&self) -> RouterConfig {
        RouterConfig {
            recipient_mode: if self.all_match {
                RecipientMode::AllMatch
            } else {
                RecipientMode::FirstMatch
            },
            warn_dropped_message: self.warn_dropped,
            default_operation_timeout_ms: self.timeout_ms,
            max_concurrent_operations: self.max_concurrent,
            dispatch: DispatchOptions {
                parallel_processing: self.parallel,
                stop_on_exception: self.stop_on_exception,
            },
        }
    }
}

/// Logs every delivery instead of sending it anywhere.
struct LoggingDispatcher;

#[async_trait]
impl EndpointDispatcher for LoggingDispatcher {
    async fn deliver(&self, endpoint: &str, message: Message) -> anyhow::Result<()> {
        info!(endpoint, body = %message.body(), "delivered");
        Ok(())
    }
}

/// Parses `NAME=HEADER:VALUE`.
fn parse_header_predicate(spec: &str) -> anyhow::Result<(String, HeaderEquals)> {
    let Some((name, rest)) = spec.split_once('=') else {
        bail!("expected NAME=HEADER:VALUE, got {spec:?}");
    };
    let Some((header, value)) = rest.split_once(':') else {
        bail!("expected NAME=HEADER:VALUE, got {spec:?}");
    };
    if name.is_empty() || header.is_empty() {
        bail!("predicate name and header must not be empty in {spec:?}");
    }
    Ok((name.to_string(), HeaderEquals::new(header, value)))
}

/// Splits input text into JSON documents: a single array, or one per line.
fn parse_envelopes(text: &str) -> anyhow::Result<Vec<serde_json::Value>> {
    if text.trim_start().starts_with('[') {
        return serde_json::from_str(text).context("invalid JSON array");
    }
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).with_context(|| format!("invalid JSON on line {}", n + 1))
        })
        .collect()
}

fn load_envelopes(path: &Path) -> anyhow::Result<Vec<serde_json::Value>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    parse_envelopes(&text)
}

fn render(response: &OperationResponse) -> anyhow::Result<serde_json::Value> {
    Ok(match response {
        OperationResponse::Routed {
            call_id,
            channel,
            recipients,
            matched,
            deliveries,
            ..
        } => json!({
            "callId": call_id,
            "channel": channel,
            "recipients": recipients.join(","),
            "matched": matched,
            "deliveries": deliveries,
        }),
        OperationResponse::Control(reply) => serde_json::to_value(reply)?,
        OperationResponse::Empty => serde_json::Value::Null,
    })
}

fn init_tracing(json_logs: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let _ = if json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    let config = Arc::new(args.router_config());
    let predicates = PredicateRegistry::with_builtins();
    for spec in &args.header_predicates {
        let (name, predicate) = parse_header_predicate(spec)?;
        predicates.register(name, Arc::new(predicate));
    }

    let filters = Arc::new(FilterService::with_defaults());
    let router = build_router(
        Arc::clone(&filters),
        Arc::new(predicates),
        Arc::new(LoggingDispatcher),
        Arc::clone(&config),
    );
    let mut pipeline = build_operation_pipeline(router, &config);
    let classifier = OperationService::new(Arc::new(SystemClock), Arc::clone(&config));

    let envelopes = load_envelopes(&args.input)?;
    info!(count = envelopes.len(), input = %args.input.display(), "loaded envelopes");

    for envelope in envelopes {
        let line = match classifier.classify_json(envelope) {
            Err(err) => json!({ "error": err.to_string() }),
            Ok(op) => match ServiceExt::ready(&mut pipeline).await?.call(op).await {
                Ok(response) => render(&response)?,
                Err(err) => json!({ "error": err.to_string() }),
            },
        };
        println!("{line}");
    }

    for channel in filters.channels() {
        for stats in filters.get_statistics_for_channel(&channel)? {
            info!(channel = %channel, "{stats}");
        }
    }
    Ok(())
}
