//! Tracer setup and management

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::{SimpleSpanProcessor, TracerProvider};
use rentcache_core::ObservabilityConfig;
use std::sync::{Arc, Mutex, OnceLock};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Global tracer provider holder
static TRACER_PROVIDER: OnceLock<Arc<TracerProvider>> = OnceLock::new();

/// Global span processor builders (registered before initialization)
type ProcessorBuilder = Box<dyn FnOnce() -> SimpleSpanProcessor + Send>;
static SPAN_PROCESSOR_BUILDERS: Mutex<Option<Vec<ProcessorBuilder>>> = Mutex::new(Some(Vec::new()));

/// Register a span processor builder to be used when telemetry is initialized.
///
/// Must be called BEFORE `init_telemetry()`; later registrations are logged and dropped.
pub fn register_span_processor(builder: ProcessorBuilder) {
    let mut builders = SPAN_PROCESSOR_BUILDERS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(ref mut vec) = *builders {
        vec.push(builder);
    } else {
        tracing::warn!("Attempted to register span processor after telemetry initialization");
    }
}

/// Initialize logging and OpenTelemetry tracing.
///
/// This sets up:
/// - A tracer provider with any registered span processors
/// - A fmt layer, JSON when `json_logs` is set
/// - An `EnvFilter` from `log_filter`, falling back to `RUST_LOG`
///
/// Returns false when a global subscriber was already installed (for
/// example by an earlier call); the existing one is kept.
///
/// # Example
///
/// ```rust,no_run
/// use rentcache_core::ObservabilityConfig;
/// use rentcache_telemetry::init_telemetry;
///
/// init_telemetry(&ObservabilityConfig::default());
/// ```
pub fn init_telemetry(config: &ObservabilityConfig) -> bool {
    // Take the span processor builders (can only initialize once)
    let builders = SPAN_PROCESSOR_BUILDERS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take()
        .unwrap_or_default();

    let mut provider_builder = TracerProvider::builder();
    for builder in builders {
        provider_builder = provider_builder.with_span_processor(builder());
    }
    let tracer_provider = provider_builder.build();

    let service_name = config
        .service_name
        .clone()
        .unwrap_or_else(|| crate::attributes::SYSTEM_NAME.to_string());
    let tracer = tracer_provider.tracer(service_name);

    let _ = TRACER_PROVIDER.set(Arc::new(tracer_provider));

    let telemetry_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    let filter = config
        .log_filter
        .as_deref()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(EnvFilter::from_default_env);

    let json_layer = config.json_logs.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_line_number(true)
    });
    let text_layer = (!config.json_logs).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_line_number(true)
    });

    tracing_subscriber::registry()
        .with(telemetry_layer)
        .with(json_layer)
        .with(text_layer)
        .with(filter)
        .try_init()
        .is_ok()
}

/// Get the global tracer provider if initialized
pub fn tracer_provider() -> Option<Arc<TracerProvider>> {
    TRACER_PROVIDER.get().cloned()
}
