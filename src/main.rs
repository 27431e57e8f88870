use actix_cors::Cors;
use actix_web::{web, App, HttpServer, HttpResponse, middleware, error, http::StatusCode};
use leadflow::config::{LoggingSettings, Settings};
use leadflow::core::PipelineComponents;
use leadflow::models::ProviderKind;
use leadflow::routes::{self, leads::AppState};
use leadflow::services::{
    ApolloClient, DirectoryProvider, LeadStore, LinkedInProbe, OpenAiReasoner, PdlClient,
    PostgresLeadStore, ProfileProbe,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, error, warn};

/// JSON error response for JSON payload errors
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

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
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

fn init_logging(logging: &LoggingSettings) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&logging.level))
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Logging is configured from settings, so a load failure goes to stderr
    let settings = Settings::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("Configuration error: {}", e))
    })?;

    init_logging(&settings.logging);

    info!(level = %settings.logging.level, format = %settings.logging.format, "Starting Leadflow lead pipeline service...");

    // Directory providers; one without an API key is left out
    let provider_timeout = Duration::from_secs(settings.providers.timeout_secs);
    let mut providers: HashMap<ProviderKind, Arc<dyn DirectoryProvider>> = HashMap::new();

    if settings.providers.apollo.is_configured() {
        providers.insert(
            ProviderKind::Apollo,
            Arc::new(ApolloClient::new(
                settings.providers.apollo.base_url.clone(),
                settings.providers.apollo.api_key.clone(),
                provider_timeout,
            )),
        );
    }
    if settings.providers.pdl.is_configured() {
        providers.insert(
            ProviderKind::Pdl,
            Arc::new(PdlClient::new(
                settings.providers.pdl.base_url.clone(),
                settings.providers.pdl.api_key.clone(),
                provider_timeout,
            )),
        );
    }

    if providers.is_empty() {
        warn!("No directory provider has an API key; lead searches will be rejected");
    } else if !providers.contains_key(&settings.providers.default) {
        warn!("Default provider {} is not configured", settings.providers.default);
    }

    info!("Providers initialized: {:?}", providers.keys().collect::<Vec<_>>());

    if settings.reasoning.api_key.trim().is_empty() {
        warn!("Reasoning API key is not set; every lead will use rule-based scoring");
    }

    let reasoner = Arc::new(OpenAiReasoner::new(
        settings.reasoning.api_key.clone(),
        settings.reasoning.base_url.clone(),
        settings.reasoning.model.clone(),
        settings.reasoning.temperature,
        Duration::from_secs(settings.reasoning.timeout_secs),
    ));

    let probe: Option<Arc<dyn ProfileProbe>> = if settings.verification.enabled {
        info!(
            "LinkedIn probe enabled (timeout: {}s, cache: {} entries)",
            settings.verification.timeout_secs, settings.verification.cache_size
        );
        Some(Arc::new(LinkedInProbe::new(
            Duration::from_secs(settings.verification.timeout_secs),
            settings.verification.cache_size,
            Duration::from_secs(settings.verification.cache_ttl_secs),
        )))
    } else {
        None
    };

    let store: Arc<dyn LeadStore> = Arc::new(
        PostgresLeadStore::from_settings(
            &settings.database.url,
            settings.database.max_connections,
            settings.database.min_connections,
            settings.database.acquire_timeout_secs,
            settings.database.idle_timeout_secs,
        )
        .await
        .map_err(|e| {
            error!("Failed to connect to PostgreSQL: {}", e);
            std::io::Error::new(std::io::ErrorKind::Other, format!("PostgreSQL connection error: {}", e))
        })?,
    );

    info!("PostgreSQL lead store initialized");

    let components = PipelineComponents {
        reasoner,
        probe,
        store: Some(store.clone()),
        settings: settings.pipeline_settings(),
    };

    let app_state = AppState {
        providers,
        default_provider: settings.providers.default,
        components,
        store,
        default_top_n: settings.limits.default_top_n,
    };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
