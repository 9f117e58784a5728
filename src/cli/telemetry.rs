//! Log output and optional OTLP trace export.
//!
//! Export is switched on by `OTEL_EXPORTER_OTLP_ENDPOINT` and speaks gRPC only.
//! `OTEL_EXPORTER_OTLP_HEADERS` (`k=v,k2=v2`) becomes request metadata; keys
//! ending in `-bin` carry base64 values.

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose, Engine};
use once_cell::sync::OnceCell;
use opentelemetry::{global, propagation::TextMapCompositePropagator, trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::{Compression, SpanExporter, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    propagation::{BaggagePropagator, TraceContextPropagator},
    trace::{SdkTracerProvider, Tracer},
    Resource,
};
use std::time::Duration;
use tonic::{
    metadata::{Ascii, Binary, MetadataKey, MetadataMap, MetadataValue},
    transport::ClientTlsConfig,
};
use tracing::{debug, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};
use ulid::Ulid;

use super::commands::logging::LogFormat;

const EXPORT_TIMEOUT: Duration = Duration::from_secs(3);

static PROVIDER: OnceCell<SdkTracerProvider> = OnceCell::new();

#[derive(Debug, Clone, PartialEq, Eq)]
struct OtlpSettings {
    endpoint: String,
    headers: Vec<(String, String)>,
    instance_id: String,
}

impl OtlpSettings {
    /// Read settings through `lookup`; `None` when no endpoint is configured.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let endpoint = lookup("OTEL_EXPORTER_OTLP_ENDPOINT")?;
        if let Some(protocol) = lookup("OTEL_EXPORTER_OTLP_PROTOCOL") {
            if protocol != "grpc" {
                debug!(%protocol, "ignoring OTLP protocol; only grpc is supported");
            }
        }
        Some(Self {
            endpoint: with_scheme(endpoint.trim()),
            headers: lookup("OTEL_EXPORTER_OTLP_HEADERS")
                .map(|raw| header_pairs(&raw))
                .unwrap_or_default(),
            instance_id: lookup("OTEL_SERVICE_INSTANCE_ID")
                .unwrap_or_else(|| Ulid::new().to_string()),
        })
    }

    /// Host to verify against when the endpoint is TLS.
    fn tls_domain(&self) -> Option<&str> {
        let rest = self.endpoint.strip_prefix("https://")?;
        let authority = rest.split('/').next()?;
        authority.split(':').next().filter(|host| !host.is_empty())
    }

    fn metadata(&self) -> Result<MetadataMap> {
        let mut metadata = MetadataMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let name = name.to_ascii_lowercase();
            if name.ends_with("-bin") {
                let key = MetadataKey::<Binary>::from_bytes(name.as_bytes())
                    .map_err(|err| anyhow!("invalid binary metadata key {name}: {err}"))?;
                let bytes = general_purpose::STANDARD
                    .decode(value.as_bytes())
                    .map_err(|err| anyhow!("metadata {name} is not base64: {err}"))?;
                metadata.insert_bin(key, MetadataValue::from_bytes(&bytes));
            } else {
                let key = MetadataKey::<Ascii>::from_bytes(name.as_bytes())
                    .map_err(|err| anyhow!("invalid metadata key {name}: {err}"))?;
                let value = value
                    .parse::<MetadataValue<Ascii>>()
                    .map_err(|err| anyhow!("invalid metadata value for {name}: {err}"))?;
                metadata.insert(key, value);
            }
        }
        Ok(metadata)
    }

    fn tracer(&self) -> Result<Tracer> {
        let mut exporter = SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&self.endpoint)
            .with_compression(Compression::Gzip)
            .with_timeout(EXPORT_TIMEOUT);
        if let Some(domain) = self.tls_domain() {
            exporter = exporter.with_tls_config(
                ClientTlsConfig::new()
                    .domain_name(domain.to_string())
                    .with_native_roots(),
            );
        }
        if !self.headers.is_empty() {
            exporter = exporter.with_metadata(self.metadata()?);
        }

        let resource = Resource::builder_empty()
            .with_attributes([
                KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
                KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                KeyValue::new("service.instance.id", self.instance_id.clone()),
            ])
            .build();
        let provider = SdkTracerProvider::builder()
            .with_batch_exporter(exporter.build().context("Failed to build OTLP exporter")?)
            .with_resource(resource)
            .build();

        let _ = PROVIDER.set(provider.clone());
        global::set_tracer_provider(provider.clone());
        global::set_text_map_propagator(TextMapCompositePropagator::new(vec![
            Box::new(TraceContextPropagator::new()),
            Box::new(BaggagePropagator::new()),
        ]));
        Ok(provider.tracer(env!("CARGO_PKG_NAME")))
    }
}

fn with_scheme(endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint.trim_end_matches('/'))
    }
}

fn header_pairs(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            (!name.is_empty()).then(|| (name.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Install the global subscriber. Without a level only errors are shown.
///
/// # Errors
///
/// Returns an error if the exporter or the subscriber cannot be installed
pub fn init(verbosity_level: Option<Level>, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(verbosity_level.unwrap_or(Level::ERROR).into())
        .from_env_lossy()
        .add_directive("hyper=error".parse()?)
        .add_directive("tokio=error".parse()?)
        .add_directive("sqlx=warn".parse()?)
        .add_directive("opentelemetry_sdk=warn".parse()?);

    let output = match format {
        LogFormat::Pretty => fmt::layer()
            .with_target(false)
            .with_file(false)
            .with_line_number(false)
            .pretty()
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
    };

    let otel = match OtlpSettings::from_lookup(|key| std::env::var(key).ok()) {
        Some(settings) => Some(tracing_opentelemetry::layer().with_tracer(settings.tracer()?)),
        None => None,
    };

    let subscriber = Registry::default().with(output).with(otel).with(filter);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Flush pending spans; does nothing when export was never enabled.
pub fn shutdown_tracer() {
    if let Some(provider) = PROVIDER.get() {
        debug!("flushing trace exporter");
        let _ = provider.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Option<OtlpSettings> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        OtlpSettings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn export_disabled_without_endpoint() {
        assert_eq!(settings(&[("OTEL_EXPORTER_OTLP_HEADERS", "a=b")]), None);
    }

    #[test]
    fn bare_endpoint_gets_https() {
        let otlp = settings(&[
            ("OTEL_EXPORTER_OTLP_ENDPOINT", "collector.example.com:4317/"),
            ("OTEL_SERVICE_INSTANCE_ID", "rollcall-1"),
        ]);
        assert_eq!(
            otlp,
            Some(OtlpSettings {
                endpoint: "https://collector.example.com:4317".to_string(),
                headers: Vec::new(),
                instance_id: "rollcall-1".to_string(),
            })
        );
        assert_eq!(
            otlp.as_ref().and_then(OtlpSettings::tls_domain),
            Some("collector.example.com")
        );
    }

    #[test]
    fn plain_http_endpoint_skips_tls() {
        let otlp = settings(&[("OTEL_EXPORTER_OTLP_ENDPOINT", "http://localhost:4317")]);
        assert_eq!(otlp.as_ref().and_then(OtlpSettings::tls_domain), None);
    }

    #[test]
    fn header_pairs_skip_malformed_entries() {
        assert_eq!(
            header_pairs(" api-key = secret ,broken,=empty,x-tenant=club"),
            vec![
                ("api-key".to_string(), "secret".to_string()),
                ("x-tenant".to_string(), "club".to_string()),
            ]
        );
        assert!(header_pairs("").is_empty());
    }

    #[test]
    fn metadata_accepts_ascii_and_binary() -> Result<()> {
        let otlp = settings(&[
            ("OTEL_EXPORTER_OTLP_ENDPOINT", "http://localhost:4317"),
            (
                "OTEL_EXPORTER_OTLP_HEADERS",
                "Authorization=Bearer abc,trace-bin=cm9sbGNhbGw=",
            ),
        ])
        .context("settings")?;
        assert_eq!(otlp.metadata()?.len(), 2);
        Ok(())
    }

    #[test]
    fn metadata_rejects_bad_base64() {
        let otlp = settings(&[
            ("OTEL_EXPORTER_OTLP_ENDPOINT", "http://localhost:4317"),
            ("OTEL_EXPORTER_OTLP_HEADERS", "trace-bin=***"),
        ]);
        let result = otlp.map(|otlp| otlp.metadata());
        assert!(matches!(result, Some(Err(_))));
    }

    #[test]
    fn shutdown_without_provider_is_noop() {
        shutdown_tracer();
    }
}
