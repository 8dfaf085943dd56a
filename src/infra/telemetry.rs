use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter,
    filter::Directive,
    fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install the global tracing subscriber and register tag cache metric descriptions.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    // Every reload issues queries; keep sqlx statement logs out of info output.
    let quiet_queries = "sqlx::query=warn"
        .parse::<Directive>()
        .map_err(|err| InfraError::telemetry(format!("invalid sqlx directive: {err}")))?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy()
        .add_directive(quiet_queries);

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "tagcache_load_total",
            Unit::Count,
            "Tag collection loads, labelled by collection and result (ok|partial|failed)."
        );
        describe_gauge!(
            "tagcache_collection_size",
            Unit::Count,
            "Number of tags in the most recently published collection."
        );
        describe_histogram!(
            "tagcache_load_ms",
            Unit::Milliseconds,
            "Tag collection load latency in milliseconds."
        );
    });
}
