use clap::Parser;
use log::{error, info};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use dockhand::broadcast::BroadcastHub;
use dockhand::command_execution::CommandExecutor;
use dockhand::configuration::Settings;
use dockhand::control::ControlPlane;
use dockhand::registry::{ServiceCatalog, ServiceDefinition};
use dockhand::runtime::DockerRuntime;
use dockhand::state_sync::{StateReconciler, SyncEngine};
use dockhand::web_interface::WebServer;

#[derive(Parser)]
#[command(name = "dockhand")]
#[command(version = "0.1.0")]
#[command(about = "Web dashboard for operating local Docker-managed services")]
struct Args {
    /// Optional TOML configuration file; defaults apply without one
    config_file: Option<String>,
}

#[tokio::main]
async fn main() {
    // Example how to log
    // https://docs.rs/env_logger/latest/env_logger/
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .init();

    let args = Args::parse();

    let settings = match &args.config_file {
        Some(path) => match Settings::from_file(Path::new(path)) {
            Ok(settings) => {
                info!("Configuration imported from {}", path);
                settings
            }
            Err(e) => {
                error!("Unable to import configuration from file: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            info!("No configuration file given, using defaults");
            Settings::default()
        }
    };

    let runtime = match DockerRuntime::connect(
        Duration::from_secs(settings.runtime_timeout_secs),
        Duration::from_secs(settings.stats_timeout_secs),
    ) {
        Ok(runtime) => Arc::new(runtime),
        Err(e) => {
            error!("Unable to connect to the Docker daemon: {}", e);
            std::process::exit(1);
        }
    };

    let mut catalog = ServiceCatalog::builtin();
    for service in settings.services.clone() {
        catalog.upsert(ServiceDefinition::from(service));
    }
    info!("Managing {} services", catalog.len());

    let hub = Arc::new(Mutex::new(BroadcastHub::new()));
    let reconciler = StateReconciler::new(runtime.clone(), catalog.clone());
    let (engine, sync) = SyncEngine::new(
        reconciler,
        Arc::clone(&hub),
        Duration::from_secs(settings.poll_interval_secs),
    );
    tokio::spawn(engine.run());

    let executor = Arc::new(CommandExecutor::new(
        settings.work_dir.clone(),
        Duration::from_secs(settings.command_timeout_secs),
    ));
    let control = Arc::new(ControlPlane::new(
        catalog,
        runtime,
        executor,
        sync.clone(),
        Arc::clone(&hub),
    ));

    let server = WebServer::new(control, sync, hub);
    if let Err(e) = server.start(&settings.bind_address, settings.web_port).await {
        error!("Web server failed: {}", e);
        std::process::exit(1);
    }
}
