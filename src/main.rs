use actix_cors::Cors;
use actix_web::{web, App, HttpServer, HttpResponse, middleware, error, http::StatusCode};
use job_alerts::config::{LoggingSettings, Settings};
use job_alerts::core::{Matcher, Region, ShardRouter};
use job_alerts::models::ScoringWeights;
use job_alerts::pipeline::{
    run_kafka_consumer, EventProcessor, IngestionOptions, KafkaEventSource, KafkaSourceConfig, NotificationDispatcher,
};
use job_alerts::routes::{self, notifications::AppState};
use job_alerts::services::{
    spawn_push_worker, CachedSubscriptionGateway, PostgresClient, PushTransport, RedisPushTransport,
    SessionRegistry, SubscriptionClient, SubscriptionGateway,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// JSON error response for malformed query strings
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

fn init_tracing(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| logging.format.clone());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn startup_error(what: &str, e: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", what, e);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", what, e))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    init_tracing(&settings.logging);

    info!("Starting job alerts service...");

    let default_region: Region = settings.matching.default_region.parse().unwrap_or_else(|e| {
        warn!("{}, falling back to SOUTHEAST_ASIA", e);
        Region::SoutheastAsia
    });
    let router = ShardRouter::new(default_region);

    // Initialize PostgreSQL client
    let postgres = Arc::new(
        PostgresClient::from_settings(
            &settings.database.url,
            settings.database.max_connections,
            settings.database.min_connections,
            settings.database.acquire_timeout_secs,
            settings.database.idle_timeout_secs,
            router.clone(),
        )
        .await
        .map_err(|e| startup_error("Failed to connect to PostgreSQL", e))?,
    );

    info!("PostgreSQL client initialized");

    // Premium lookups go through an in-memory cache
    let subscription = SubscriptionClient::new(
        settings.subscription.endpoint.clone(),
        settings.subscription.api_key.clone(),
        Duration::from_secs(settings.subscription.timeout_secs.unwrap_or(5)),
    )
    .map_err(|e| startup_error("Failed to build subscription client", e))?;

    let cache_ttl = settings.subscription.cache_ttl_secs.unwrap_or(60);
    let cache_size = settings.subscription.cache_size.unwrap_or(10_000);
    let subscription_cache = Arc::new(CachedSubscriptionGateway::new(
        Arc::new(subscription),
        cache_size,
        cache_ttl,
    ));
    let gateway: Arc<dyn SubscriptionGateway> = subscription_cache.clone();

    info!("Subscription gateway initialized (cache: {} entries, TTL: {}s)", cache_size, cache_ttl);

    let transport: Arc<dyn PushTransport> = match &settings.push.redis_url {
        Some(url) => Arc::new(
            RedisPushTransport::new(url, settings.push.session_buffer)
                .await
                .map_err(|e| startup_error("Failed to connect to Redis", e))?,
        ),
        None => {
            warn!("No Redis URL configured, realtime push limited to in-process sessions");
            Arc::new(SessionRegistry::new(settings.push.session_buffer))
        }
    };
    let (push_queue, push_worker) = spawn_push_worker(transport, settings.push.queue_capacity);

    let weights = ScoringWeights {
        skills: settings.matching.weights.skills,
        title: settings.matching.weights.title,
        employment_type: settings.matching.weights.employment_type,
        salary: settings.matching.weights.salary,
        location: settings.matching.weights.location,
    };
    let matcher = Matcher::new(weights, router);

    info!("Matcher initialized with weights: {:?}", weights);

    let dispatcher = Arc::new(NotificationDispatcher::new(
        gateway.clone(),
        postgres.clone(),
        push_queue,
    ));

    let processor = Arc::new(EventProcessor::new(
        matcher,
        postgres.clone(),
        postgres.clone(),
        gateway,
        dispatcher,
        IngestionOptions {
            skip_inactive: settings.matching.skip_inactive,
            max_concurrency: settings.ingestion.max_concurrency,
        },
    ));

    // Start consumers
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let kafka_config = KafkaSourceConfig {
        brokers: settings.kafka.brokers.clone(),
        group_id: settings.kafka.group_id.clone(),
        topic: settings.kafka.topic.clone(),
        auto_offset_reset: settings.kafka.auto_offset_reset.clone(),
        session_timeout_ms: settings.kafka.session_timeout_ms,
    };
    let retry_backoff = Duration::from_millis(settings.ingestion.retry_backoff_ms);

    let mut consumers = Vec::with_capacity(settings.kafka.consumers);
    for _ in 0..settings.kafka.consumers.max(1) {
        let source = KafkaEventSource::new(&kafka_config)
            .map_err(|e| startup_error("Failed to create Kafka consumer", e))?;

        consumers.push(tokio::spawn(run_kafka_consumer(
            source,
            kafka_config.clone(),
            processor.clone(),
            shutdown_rx.clone(),
            retry_backoff,
        )));
    }
    // The consumer tasks own the pipeline from here on
    drop(processor);

    info!("Started {} consumer(s) on topic {}", consumers.len(), kafka_config.topic);

    // Configure HTTP server
    let app_state = AppState {
        notifications: postgres,
        subscription_cache: Some(subscription_cache.clone()),
    };
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    let server = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .disable_signals()
    .bind((host, port))?
    .run();

    let server_handle = server.handle();
    let drain_timeout = Duration::from_secs(settings.push.drain_timeout_secs);

    let shutdown = async move {
        shutdown_signal().await;
        info!("Shutdown signal received, stopping consumers");

        let _ = shutdown_tx.send(true);
        server_handle.stop(true).await;

        for consumer in consumers {
            match consumer.await {
                Ok(stats) => info!("Consumer finished: {:?}", stats),
                Err(e) => error!("Consumer task failed: {}", e),
            }
        }

        info!("Subscription cache: {:?}", subscription_cache.stats());

        match tokio::time::timeout(drain_timeout, push_worker.join()).await {
            Ok(stats) => info!("Push queue drained: {:?}", stats),
            Err(_) => warn!("Push queue did not drain within {:?}", drain_timeout),
        }
    };

    let (server_result, ()) = tokio::join!(server, shutdown);
    server_result?;

    info!("Job alerts service stopped");
    Ok(())
}
