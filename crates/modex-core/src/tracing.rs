//! Tracing setup for modex hosts.
//!
//! The modex crates only emit `tracing` events; installing a subscriber is
//! left to the host application. A coupled run is usually two model
//! processes whose stdout may carry model output, so logs go to stderr by
//! default and can be emitted as flat JSON lines for merging afterwards.
//!
//! ```ignore
//! use modex_core::tracing::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::structured()).expect("failed to initialize tracing");
//! ```

use thiserror::Error;
use tracing::{Level, Subscriber};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, writer::BoxMakeWriter},
    prelude::*,
    registry::LookupSpan,
    util::TryInitError,
};

/// Crates whose events the default filter lets through.
pub const MODEX_TARGETS: [&str; 3] = ["modex_core", "modex_protocol", "modex_client"];

/// Errors that can occur during tracing initialization.
#[derive(Debug, Error)]
pub enum TracingError {
    /// The filter directive could not be parsed.
    #[error("invalid log filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),

    /// A global subscriber is already installed.
    #[error("failed to install subscriber: {0}")]
    Init(#[from] TryInitError),
}

/// Line format of log output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Multi-line, for reading one run by hand.
    Pretty,
    /// One line per event.
    #[default]
    Compact,
    /// One flat JSON object per event.
    Json,
}

/// Stream log lines are written to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogWriter {
    #[default]
    Stderr,
    Stdout,
}

impl LogWriter {
    fn make_writer(self) -> BoxMakeWriter {
        match self {
            Self::Stderr => BoxMakeWriter::new(std::io::stderr),
            Self::Stdout => BoxMakeWriter::new(std::io::stdout),
        }
    }
}

/// Subscriber settings.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level for modex events when no filter is given.
    pub level: Level,
    pub format: TracingOutputFormat,
    pub writer: LogWriter,
    /// Prefix events with a timestamp.
    pub include_timestamp: bool,
    /// Add source file and line.
    pub include_location: bool,
    /// Explicit filter directive; takes precedence over `RUST_LOG`.
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingOutputFormat::Compact,
            writer: LogWriter::Stderr,
            include_timestamp: true,
            include_location: false,
            env_filter: None,
        }
    }
}

impl TracingConfig {
    /// Verbose multi-line output with source locations.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            level: Level::DEBUG,
            format: TracingOutputFormat::Pretty,
            include_location: true,
            ..Self::default()
        }
    }

    /// Flat JSON lines, suited to merging logs of several processes.
    #[must_use]
    pub fn structured() -> Self {
        Self {
            format: TracingOutputFormat::Json,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_writer(mut self, writer: LogWriter) -> Self {
        self.writer = writer;
        self
    }

    #[must_use]
    pub fn without_timestamp(mut self) -> Self {
        self.include_timestamp = false;
        self
    }

    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// `modex_core=<level>,modex_protocol=<level>,modex_client=<level>`
    fn default_directive(&self) -> String {
        let level = self.level.as_str().to_ascii_lowercase();
        MODEX_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, level))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn filter(&self) -> Result<EnvFilter, TracingError> {
        match &self.env_filter {
            Some(directive) => Ok(EnvFilter::try_new(directive)?),
            None => match EnvFilter::try_from_default_env() {
                Ok(filter) => Ok(filter),
                Err(_) => Ok(EnvFilter::try_new(self.default_directive())?),
            },
        }
    }

    fn fmt_layer<S>(&self) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let base = fmt::layer()
            .with_writer(self.writer.make_writer())
            .with_file(self.include_location)
            .with_line_number(self.include_location);

        // Each format and timestamp choice is a distinct layer type.
        macro_rules! timed {
            ($layer:expr) => {
                if self.include_timestamp {
                    $layer.boxed()
                } else {
                    $layer.without_time().boxed()
                }
            };
        }

        match self.format {
            TracingOutputFormat::Pretty => timed!(base.pretty()),
            TracingOutputFormat::Compact => timed!(base.compact()),
            TracingOutputFormat::Json => timed!(
                base.json()
                    .flatten_event(true)
                    .with_current_span(false)
                    .with_span_list(false)
            ),
        }
    }
}

/// Builds the subscriber described by `config` without installing it.
pub fn build_subscriber(
    config: &TracingConfig,
) -> Result<impl Subscriber + Send + Sync + 'static, TracingError> {
    let filter = config.filter()?;
    Ok(tracing_subscriber::registry()
        .with(filter)
        .with(config.fmt_layer()))
}

/// Installs the subscriber described by `config` as the global default.
///
/// # Errors
///
/// Returns an error if the filter directive is invalid or a global
/// subscriber is already installed.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    build_subscriber(&config)?.try_init()?;
    Ok(())
}
