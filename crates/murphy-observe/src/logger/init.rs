use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, fmt::time::OffsetTime, layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::logger::{
    CONTAINER_TARGET, config::LoggerConfig, error::LoggerError, format::LoggerFormat,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Install the global subscriber described by `cfg`.
pub fn logger_init(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    let filter = build_filter(cfg)?;
    let output = match cfg.format {
        LoggerFormat::Text => text_layer(cfg),
        LoggerFormat::Json => json_layer(cfg),
        LoggerFormat::Journald => journald_layer()?,
    };
    tracing_subscriber::registry()
        .with(output.with_filter(filter))
        .try_init()?;
    Ok(())
}

/// Global level plus the container output switch.
///
/// Container stdout is logged at debug under [`CONTAINER_TARGET`]; enabling it raises
/// that target alone so the rest of the run keeps the configured level.
pub(crate) fn build_filter(cfg: &LoggerConfig) -> Result<EnvFilter, LoggerError> {
    let mut directives = cfg.level.as_str().to_string();
    if cfg.container_output {
        directives.push_str(&format!(",{CONTAINER_TARGET}=debug"));
    }
    EnvFilter::try_new(&directives).map_err(|_| LoggerError::InvalidDirective(directives))
}

fn text_layer(cfg: &LoggerConfig) -> BoxedLayer {
    fmt::layer()
        .with_ansi(cfg.use_color)
        .with_target(cfg.with_targets)
        .with_timer(local_timer())
        .boxed()
}

fn json_layer(cfg: &LoggerConfig) -> BoxedLayer {
    fmt::layer()
        .json()
        .with_ansi(false)
        .with_target(cfg.with_targets)
        .with_timer(local_timer())
        .boxed()
}

fn local_timer() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn journald_layer() -> Result<BoxedLayer, LoggerError> {
    let layer = tracing_journald::layer()
        .map_err(LoggerError::Journald)?
        .with_syslog_identifier("murphy-master".to_string());
    Ok(layer.boxed())
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
fn journald_layer() -> Result<BoxedLayer, LoggerError> {
    Err(LoggerError::JournaldUnavailable)
}
