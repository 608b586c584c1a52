//! Main entry point for the RAS order manager service.
//!
//! This binary wires the lifecycle core together: it loads the
//! configuration, builds the cloud connector from the configured
//! plugin implementations, starts the background processors, and
//! serves the HTTP API until interrupted.

use clap::Parser;
use ras_clouds::get_all_implementations;
use ras_config::Config;
use ras_core::{CloudConnector, OrderController, OrderRegistry, PluginFactory, ProcessorSet, ResourcePlugin};
use ras_types::ResourceType;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

mod server;

/// Command-line arguments for the order manager service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};
	let env_filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(args.log_level.to_string()));
	fmt().with_env_filter(env_filter).with_target(true).init();

	tracing::info!("Started order manager");

	let config = Config::from_file(&args.config)?;
	tracing::info!(member_id = %config.member.id, "Loaded configuration");

	let connector = Arc::new(build_connector(&config)?);
	let registry = Arc::new(OrderRegistry::new());
	let controller = Arc::new(OrderController::new(registry.clone()));

	let processors = ProcessorSet::start(
		registry,
		connector,
		&config.member.id,
		&config.processors,
	);

	if let Some(api_config) = config.api.clone().filter(|api| api.enabled) {
		let state = server::AppState {
			controller,
			member_id: config.member.id.clone(),
			default_cloud: config.clouds.default_cloud.clone(),
		};
		tokio::select! {
			result = server::start_server(api_config, state) => {
				tracing::info!("API server finished");
				result?;
			}
			_ = tokio::signal::ctrl_c() => {}
		}
	} else {
		tracing::info!("API disabled; running processors only");
		tokio::signal::ctrl_c().await?;
	}

	processors.stop().await;
	tracing::info!("Stopped order manager");
	Ok(())
}

/// Builds the cloud connector from the configured plugin assignments.
///
/// Each resource kind named in `clouds.assignments` is bound to one
/// plugin implementation, constructed through its factory with the
/// implementation's own configuration table.
fn build_connector(config: &Config) -> Result<CloudConnector, Box<dyn std::error::Error>> {
	let factories: HashMap<&str, PluginFactory> = get_all_implementations().into_iter().collect();

	let mut plugins: HashMap<ResourceType, Box<dyn ResourcePlugin>> = HashMap::new();
	for (resource_type, implementation) in &config.clouds.assignments {
		let factory = factories.get(implementation.as_str()).ok_or_else(|| {
			format!("unknown cloud plugin implementation '{implementation}'")
		})?;
		let plugin_config = config
			.clouds
			.implementations
			.get(implementation)
			.ok_or_else(|| {
				format!("no configuration table for implementation '{implementation}'")
			})?;
		let plugin = factory(plugin_config).map_err(|e| {
			tracing::error!(
				component = "clouds",
				implementation = %implementation,
				error = %e,
				"Failed to create cloud plugin"
			);
			format!("failed to create cloud plugin '{implementation}': {e}")
		})?;
		plugins.insert(*resource_type, plugin);
		tracing::info!(
			component = "clouds",
			implementation = %implementation,
			resource_type = %resource_type,
			"Loaded"
		);
	}

	if plugins.is_empty() {
		tracing::warn!("No cloud plugins configured - local orders cannot be provisioned");
	}

	Ok(CloudConnector::new(plugins))
}
