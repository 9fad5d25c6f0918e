use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use vigil_core::client::PREBUILT_DOCUMENT_MODEL;
use vigil_core::config::load_settings;
use vigil_core::impls::{RecordingNotifier, ScriptedOperationApi};
use vigil_core::ports::KeyCredential;
use vigil_core::{
    AnalyzeOptions, BackoffPolicy, DocumentAnalysisClient, ErrorModel, Operation, Payload,
    PollPayload, Url,
};

#[derive(Debug, Parser)]
#[command(name = "vigil", version, about = "Submit and watch long-running analysis operations")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyze a document with the configured service (vigil.toml / VIGIL__*)
    Analyze {
        #[command(flatten)]
        source: DocumentSource,

        #[arg(long, default_value = PREBUILT_DOCUMENT_MODEL)]
        model: String,

        /// Return immediately and POST the result here when it is ready
        #[arg(long)]
        callback_url: Option<Url>,
    },

    /// Run the poller against a scripted in-process service
    Demo {
        /// Script a remote failure instead of a result
        #[arg(long)]
        fail: bool,

        #[arg(long)]
        callback_url: Option<Url>,
    },
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct DocumentSource {
    /// Let the service fetch the document from this URL
    #[arg(long)]
    url: Option<String>,

    /// Upload a local file
    #[arg(long)]
    file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    match cli.command {
        Command::Analyze {
            source,
            model,
            callback_url,
        } => analyze(source, &model, callback_url).await,
        Command::Demo { fail, callback_url } => demo(fail, callback_url).await,
    }
}

async fn analyze(
    source: DocumentSource,
    model: &str,
    callback_url: Option<Url>,
) -> anyhow::Result<()> {
    let settings = load_settings()?;
    let client = settings.client_builder()?.build()?;

    let payload = match (source.url, source.file) {
        (Some(url), _) => Payload::url_source(&url),
        (None, Some(path)) => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            Payload::from(bytes)
        }
        (None, None) => anyhow::bail!("either --url or --file is required"),
    };

    let options = AnalyzeOptions {
        callback_url,
        abort: Some(abort_on_ctrl_c()),
    };
    let operation = client.analyze(model, &payload, options).await?;
    print_operation(&operation)?;

    client.flush_deliveries().await;
    Ok(())
}

async fn demo(fail: bool, callback_url: Option<Url>) -> anyhow::Result<()> {
    // (A) 台本どおりに応答するサービスを用意（running → running → 終端）
    let last = if fail {
        PollPayload::failed(ErrorModel::new("bad file").with_code("InvalidContent"))
    } else {
        PollPayload::succeeded(json!({ "pages": 1 }))
    };
    let api = Arc::new(
        ScriptedOperationApi::new("abc123")
            .then(PollPayload::running())
            .then(PollPayload::running())
            .then(last),
    );
    let notifier = Arc::new(RecordingNotifier::new());

    // (B) クライアントを組み立てる（endpoint には接続しない）
    let client = DocumentAnalysisClient::builder(
        "http://localhost/",
        Arc::new(KeyCredential::new("demo")),
    )
    .transport(api.clone())
    .notifier(notifier.clone())
    .backoff(BackoffPolicy::new(Duration::from_millis(200)))
    .build()?;

    // (C) 投入して待つ（callback_url があれば即座にスナップショットが返る）
    let options = AnalyzeOptions {
        callback_url,
        abort: Some(abort_on_ctrl_c()),
    };
    let result = client
        .analyze_document_from_url("https://example.com/invoice.pdf", options)
        .await;

    // (D) delivery mode の送信完了を待ってから結果を表示
    client.flush_deliveries().await;
    info!(polls = api.poll_count(), "demo finished");

    match result {
        Ok(operation) => print_operation(&operation)?,
        Err(err) => eprintln!("analysis failed: {err}"),
    }
    for (url, operation) in notifier.deliveries() {
        println!("delivered to {url}:");
        print_operation(&operation)?;
    }
    Ok(())
}

/// Token that fires on the first Ctrl-C.
fn abort_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, aborting");
            trigger.cancel();
        }
    });
    token
}

fn print_operation(operation: &Operation) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(operation)?);
    Ok(())
}

/// Default log filter: the library plus this binary (its target is `vigil`).
const DEFAULT_LOG_FILTER: &str = "vigil_core=info,vigil=info";

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let format = fmt::format().with_target(true).compact();

    // RUST_LOG wins
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(format))
        .with(filter)
        .init();
}
