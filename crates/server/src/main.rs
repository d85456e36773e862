use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use sitesmith_core::gateway::{GroqGateway, LlmClient};
use sitesmith_core::swarm::{channel, CompletionPayload, Coordinator, PipelineEvent, PipelineRequest, RunKind};
use tokio::net::TcpListener;
use tokio_stream::{wrappers::UnboundedReceiverStream, StreamExt};
use tracing_subscriber::EnvFilter;

use sitesmith_server::config::{Args, CliCommand, Settings};
use sitesmith_server::{router, AppState, SharedState};

/// Grace period for in-flight requests after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("sitesmith=info,sitesmith_core=info,sitesmith_server=info,tower_http=info")
    });
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn build_coordinator(settings: &Settings) -> anyhow::Result<Coordinator> {
    let gateway = GroqGateway::new(settings.groq_config()?)?;
    let llm = LlmClient::new(Arc::new(gateway)).with_retry(settings.retry_policy());
    Ok(Coordinator::new(llm, settings.coordinator_config()))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("SIGINT received, shutting down gracefully"),
        _ = terminate => tracing::info!("SIGTERM received, shutting down gracefully"),
    }

    tokio::spawn(async {
        tokio::time::sleep(SHUTDOWN_GRACE).await;
        tracing::error!("Forced shutdown after {}s", SHUTDOWN_GRACE.as_secs());
        std::process::exit(1);
    });
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    let coordinator = build_coordinator(&settings)?;
    let state: SharedState = Arc::new(AppState::new(coordinator));

    let app = router(
        state,
        settings.frontend_url.as_deref(),
        settings.is_production(),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    tracing::info!("Sitesmith server running on port {}", settings.port);
    tracing::info!("Environment: {}", settings.environment);
    tracing::info!(
        "CORS origin: {}",
        settings
            .frontend_url
            .as_deref()
            .unwrap_or("not set (allowing all origins in development)")
    );
    tracing::info!("Model: {}", settings.model);
    tracing::info!("Groq API key: {}", settings.masked_api_key());
    tracing::info!("Endpoints: /health, /generate-simple, /generate-advanced, /generate-website, /openapi.json");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server closed");
    Ok(())
}

/// Generate a website without the HTTP layer and write it under `out`.
async fn run_local(settings: Settings, request: PipelineRequest, out: &Path) -> anyhow::Result<()> {
    let coordinator = Arc::new(build_coordinator(&settings)?);
    let (mut sink, events) = channel();

    let runner = Arc::clone(&coordinator);
    let task = tokio::spawn(async move { runner.execute(RunKind::Website, request, &mut sink).await });

    let mut events = UnboundedReceiverStream::new(events);
    let mut files = None;
    while let Some(event) = events.next().await {
        match event {
            PipelineEvent::StageProgress {
                stage,
                progress,
                message,
            } => println!("[{progress:>3}%] {stage}: {}", message.unwrap_or_default()),
            PipelineEvent::FileCompleted {
                stage, path, size, ..
            } => println!("       {stage} {path} ({size} chars)"),
            PipelineEvent::FileFailed { path, reason, .. } => {
                eprintln!("       failed {path}: {reason}")
            }
            PipelineEvent::Warning { message, .. } => eprintln!("warning: {message}"),
            PipelineEvent::Error { stage, message } => {
                anyhow::bail!("Generation failed at {stage}: {message}")
            }
            PipelineEvent::Complete(CompletionPayload::Files { files: set, .. }) => files = Some(set),
            _ => {}
        }
    }
    task.await??;

    let Some(files) = files else {
        anyhow::bail!("Generation finished without files");
    };
    for (path, content) in files.iter() {
        let relative = Path::new(path);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            tracing::warn!("Skipping file outside the output directory: {}", path);
            continue;
        }
        let target = out.join(relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, content).await?;
    }
    println!("Wrote {} files to {}", files.len(), out.display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.settings.json_logs);

    match args.command {
        Some(CliCommand::Run {
            prompt,
            template,
            no_qa,
            out,
        }) => {
            let mut request = PipelineRequest::new(prompt);
            request.template = template;
            request.enable_qa = !no_qa;
            run_local(args.settings, request, &out).await
        }
        Some(CliCommand::Serve) | None => serve(args.settings).await,
    }
}
