use clap::Parser;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use video_ingest_backend::config::AppConfig;
use video_ingest_backend::infrastructure::{database, storage};
use video_ingest_backend::services::classifier::MediaClassifier;
use video_ingest_backend::services::media::{FfmpegRemuxer, FfprobeProbe};
use video_ingest_backend::services::optimizer::StreamOptimizer;
use video_ingest_backend::services::pipeline::IngestPipeline;
use video_ingest_backend::services::publisher::Publisher;
use video_ingest_backend::services::record_store::{SeaOrmVideoStore, VideoRecordStore};
use video_ingest_backend::services::signer::UrlSigner;
use video_ingest_backend::services::stager::IngestStager;
use video_ingest_backend::services::storage::StorageService;
use video_ingest_backend::{AppState, create_app};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port for the API server
    #[arg(short, long, default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "video_ingest_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting Video Ingest Backend...");

    let config = AppConfig::from_env();
    info!(
        "🎬 Ingest Config: Max Size={}MB, Types={}, Bucket={}, URL TTL={}s",
        config.max_upload_size / 1024 / 1024,
        config.allowed_content_types.join(","),
        config.s3_bucket,
        config.presign_ttl_secs
    );

    let db = database::setup_database().await?;
    let storage: Arc<dyn StorageService> = storage::setup_storage(&config).await;
    let records: Arc<dyn VideoRecordStore> = Arc::new(SeaOrmVideoStore::new(db));

    let staging_dir = config.staging_dir();
    tokio::fs::create_dir_all(&staging_dir).await?;
    info!("🗂️  Staging directory: {}", staging_dir.display());

    let probe = Arc::new(FfprobeProbe::new(
        config.ffprobe_path.clone(),
        config.probe_timeout(),
    ));
    let remuxer = Arc::new(FfmpegRemuxer::new(
        config.ffmpeg_path.clone(),
        config.remux_timeout(),
    ));

    let pipeline = Arc::new(IngestPipeline::new(
        records.clone(),
        IngestStager::new(
            staging_dir.clone(),
            config.max_upload_size as u64,
            config.allowed_content_types.clone(),
        ),
        MediaClassifier::new(probe),
        StreamOptimizer::new(remuxer, staging_dir),
        Publisher::new(storage.clone(), records.clone(), config.s3_bucket.clone()),
    ));

    let state = AppState {
        records,
        storage: storage.clone(),
        pipeline,
        signer: Arc::new(UrlSigner::new(storage, config.presign_ttl())),
        config,
    };

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &axum::http::Request<_>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        })
        .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
            info!("📥 {} {}", request.method(), request.uri());
        })
        .on_response(
            |response: &axum::http::Response<_>,
             latency: std::time::Duration,
             _span: &tracing::Span| {
                info!(
                    "📤 Finished in {:?} with status {}",
                    latency,
                    response.status()
                );
            },
        );

    let app = create_app(state).layer(trace_layer);
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("✅ API Server listening on: http://0.0.0.0:{}", args.port);
    info!("📖 Swagger UI documentation: http://localhost:{}/swagger-ui", args.port);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Server runtime error: {}", e);
    }

    info!("👋 Backend exited cleanly.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, initiating graceful shutdown...");
        },
    }
}
