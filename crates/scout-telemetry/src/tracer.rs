//! Tracer setup and management

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::{SimpleSpanProcessor, TracerProvider};
use std::sync::{Arc, Mutex, OnceLock};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Global tracer provider holder
static TRACER_PROVIDER: OnceLock<Arc<TracerProvider>> = OnceLock::new();

/// Global span processor builders (registered before initialization)
type ProcessorBuilder = Box<dyn FnOnce() -> SimpleSpanProcessor + Send>;
static SPAN_PROCESSOR_BUILDERS: Mutex<Option<Vec<ProcessorBuilder>>> = Mutex::new(Some(Vec::new()));

/// Output options for [`init_telemetry`]
#[derive(Debug, Clone, Default)]
pub struct TelemetryOptions {
    /// Emit newline-delimited JSON instead of human-readable lines
    pub json: bool,
    /// Filter directive used when `RUST_LOG` is not set (e.g. `"info,scout_web_tools=debug"`)
    pub default_filter: Option<String>,
}

/// Register a span processor builder used when telemetry is initialized.
///
/// Must be called before [`init_telemetry`]; later registrations are ignored with a warning.
pub fn register_span_processor(builder: ProcessorBuilder) {
    let Ok(mut builders) = SPAN_PROCESSOR_BUILDERS.lock() else {
        tracing::warn!("Span processor registry is poisoned, ignoring registration");
        return;
    };

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
/// - The OpenTelemetry layer on the tracing subscriber
/// - Structured log output (plain or JSON)
///
/// Calling it more than once is harmless; only the first call installs a subscriber.
///
/// # Example
///
/// ```rust,no_run
/// use scout_telemetry::{init_telemetry, TelemetryOptions};
///
/// init_telemetry(TelemetryOptions::default());
/// ```
pub fn init_telemetry(options: TelemetryOptions) {
    // Take the span processor builders (can only initialize once)
    let builders = SPAN_PROCESSOR_BUILDERS
        .lock()
        .map(|mut guard| guard.take().unwrap_or_default())
        .unwrap_or_default();

    let mut provider_builder = TracerProvider::builder();
    for builder in builders {
        provider_builder = provider_builder.with_span_processor(builder());
    }
    let tracer_provider = provider_builder.build();
    let tracer = tracer_provider.tracer(crate::attributes::SYSTEM_NAME);

    let _ = TRACER_PROVIDER.set(Arc::new(tracer_provider));

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(options.default_filter.as_deref().unwrap_or("info"))
    });

    let fmt_layer = if options.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_line_number(true)
            .boxed()
    };

    let result = tracing_subscriber::registry()
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .with(fmt_layer)
        .with(filter)
        .try_init();

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

/// Get the global tracer provider if initialized
pub fn tracer_provider() -> Option<Arc<TracerProvider>> {
    TRACER_PROVIDER.get().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_telemetry(TelemetryOptions::default());
        init_telemetry(TelemetryOptions {
            json: true,
            default_filter: Some("debug".to_string()),
        });
        assert!(tracer_provider().is_some());
    }
}
