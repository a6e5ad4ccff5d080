use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::{
    METRIC_BYPASS, METRIC_GENERATION_BUMP, METRIC_HIT, METRIC_INVALIDATION_FAILURE, METRIC_MISS,
};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

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

/// Register descriptions for the cache counters with the installed recorder.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_HIT,
            Unit::Count,
            "Cached queries answered from the cache store, by key template."
        );
        describe_counter!(
            METRIC_MISS,
            Unit::Count,
            "Cached queries recomputed because the value was absent, expired or undecodable."
        );
        describe_counter!(
            METRIC_BYPASS,
            Unit::Count,
            "Cached queries computed directly because the cache store was unavailable."
        );
        describe_counter!(
            METRIC_INVALIDATION_FAILURE,
            Unit::Count,
            "Invalidation steps that failed after a committed write, by entity."
        );
        describe_counter!(
            METRIC_GENERATION_BUMP,
            Unit::Count,
            "Namespace generation bumps, by namespace."
        );
    });
}
