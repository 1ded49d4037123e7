use std::future::Future;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig as _;

use ctms_cli::cli::{self, Cli, Command, ConfigCommand};
use ctms_client::{HalClient, Session};
use ctms_domain::config::{Config, ObservabilityConfig};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let (mut config, config_path) = cli::load_config()?;
    cli.global.apply(&mut config);
    let config = &config;

    let tracer_provider = init_tracing(&config.observability);

    // `Ok(false)`: the command ran but reported failed checks.
    let passed = match cli.command {
        Command::Config(ConfigCommand::Validate) => Ok(cli::config::validate(config, &config_path)),
        Command::Config(ConfigCommand::Show) => cli::config::show(config).map(|()| true),
        Command::Doctor => cli::doctor::run(config, &config_path).await,
        Command::Registry => {
            with_session(config, |c| async move { cli::lookup::list(&c, config).await }).await
        }
        Command::Resolve { resource, default } => {
            with_session(config, |c| async move {
                cli::lookup::resolve(&c, config, &resource, default).await
            })
            .await
        }
        Command::Search { expression } => {
            with_session(config, |c| async move {
                cli::search::search(&c, config, &expression).await
            })
            .await
        }
        Command::AdvancedSearch { file } => {
            with_session(config, |c| async move {
                cli::search::advanced(&c, config, &file).await
            })
            .await
        }
        Command::Tree { root, skip_errors } => {
            with_session(config, |c| async move {
                cli::tree::run(&c, config, root, skip_errors).await
            })
            .await
        }
        Command::Processes { expression } => {
            with_session(config, |c| async move {
                cli::search::processes(&c, config, &expression).await
            })
            .await
        }
    };

    shutdown_tracing(tracer_provider);
    Ok(if passed? {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Authorize, run `f`, and log out whatever `f` returns.
async fn with_session<F, Fut>(config: &Config, f: F) -> anyhow::Result<bool>
where
    F: FnOnce(HalClient) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    let credentials = cli::credentials::resolve(&config.auth)?;
    let session = Session::authorize(&config.platform, &config.session, &credentials).await?;
    session.scope(f).await?;
    Ok(true)
}

/// Initialize compact stderr tracing, plus an OTLP layer when
/// `otlp_endpoint` is configured.
///
/// Defaults to `warn` level so diagnostic output does not pollute stdout.
/// The returned [`SdkTracerProvider`] handle must be shut down on exit to
/// flush pending spans.
///
/// [`SdkTracerProvider`]: opentelemetry_sdk::trace::SdkTracerProvider
fn init_tracing(obs: &ObservabilityConfig) -> Option<opentelemetry_sdk::trace::SdkTracerProvider> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .compact();

    let endpoint = match obs.otlp_endpoint.as_deref() {
        Some(endpoint) if obs.export_enabled() => endpoint,
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .init();
            return None;
        }
    };

    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
    {
        Ok(e) => e,
        Err(e) => {
            eprintln!(
                "WARNING: failed to create OTLP exporter for {endpoint}: {e}; \
                 continuing without OpenTelemetry"
            );
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .init();
            return None;
        }
    };

    let resource = opentelemetry_sdk::Resource::builder()
        .with_service_name(obs.service_name.clone())
        .build();

    let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_sampler(opentelemetry_sdk::trace::Sampler::TraceIdRatioBased(
            obs.sample_rate,
        ))
        .with_resource(resource)
        .build();

    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer_provider.tracer("ctms"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .init();

    Some(tracer_provider)
}

fn shutdown_tracing(provider: Option<opentelemetry_sdk::trace::SdkTracerProvider>) {
    if let Some(provider) = provider {
        if let Err(e) = provider.shutdown() {
            tracing::warn!(error = ?e, "OpenTelemetry tracer provider shutdown failed");
        }
    }
}
