mod cli;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use lifecycle_core::kernel::constants::{APP_NAME, APP_VERSION, DEFAULT_CONFIG_FILE, SHUTDOWN_STAGE, STARTUP_STAGE};
use lifecycle_core::stager::{DisposingStager, StageIdentity, Stager, wrap};
use lifecycle_core::{Error, Lifecycle, LifecycleConfig};
use log::{error, info, warn};
use service_stop::{Service, ServiceState, ServiceStopModule, TaskService};
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use crate::cli::{ReportingHandler, print_summary};

/// Lifecycle: staged startup and shutdown of application resources
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a configuration file and list its stages
    Check {
        /// Path to a .toml, .json, .yaml or .yml file
        config: PathBuf,
    },
    /// Start demo services, then stop them and stage every configured stage
    Run {
        /// Configuration file; defaults to ./lifecycle.toml when present
        #[arg(long)]
        config: Option<PathBuf>,
        /// Number of demo services to start
        #[arg(long, default_value_t = 3)]
        services: usize,
        /// Index of a service that refuses to stop
        #[arg(long)]
        fail_service: Option<usize>,
        /// Keep services running until Ctrl-C
        #[arg(long)]
        wait: bool,
        /// Tick period of the demo services, in milliseconds
        #[arg(long, default_value_t = 20)]
        tick_ms: u64,
    },
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    tracing_log::LogTracer::init()?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let result = match args.command {
        Commands::Check { config } => check(&config),
        Commands::Run {
            config,
            services,
            fail_service,
            wait,
            tick_ms,
        } => {
            run(RunOptions {
                config,
                services,
                fail_service,
                wait,
                tick: Duration::from_millis(tick_ms.max(1)),
            })
            .await
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn check(path: &Path) -> Result<ExitCode, Error> {
    let lifecycle = Lifecycle::from_path(path)?;
    println!("Configuration OK: {} stages", lifecycle.config().stages.len());
    for stage in &lifecycle.config().stages {
        println!("  {} ({})", stage.name, stage.order);
    }
    Ok(ExitCode::SUCCESS)
}

struct RunOptions {
    config: Option<PathBuf>,
    services: usize,
    fail_service: Option<usize>,
    wait: bool,
    tick: Duration,
}

fn load_lifecycle(config: Option<&Path>) -> Result<Lifecycle, Error> {
    match config {
        Some(path) => Lifecycle::from_path(path),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => Lifecycle::from_path(Path::new(DEFAULT_CONFIG_FILE)),
        None => {
            info!("No {} found, using default stages", DEFAULT_CONFIG_FILE);
            Lifecycle::new(LifecycleConfig::default())
        }
    }
}

async fn run(options: RunOptions) -> Result<ExitCode, Error> {
    println!("{} v{}", APP_NAME, APP_VERSION);
    let lifecycle = load_lifecycle(options.config.as_deref())?;
    let startup = lifecycle.stager(STARTUP_STAGE).ok();
    let shutdown = lifecycle.stager(SHUTDOWN_STAGE).ok();

    let module = ServiceStopModule::new()?.start_on_register()?;
    let registry = module.configure()?;

    let mut services = Vec::with_capacity(options.services);
    for i in 0..options.services {
        let mut service = TaskService::new(format!("service-{}", i), options.tick);
        if options.fail_service == Some(i) {
            service = service.refusing_stop();
        }
        let service = registry.register(Arc::new(service))?;

        if let Some(startup) = &startup {
            startup.register(Box::new(wrap(Arc::clone(&service), |s: &TaskService| {
                match s.state() {
                    ServiceState::Running => Ok(()),
                    state => Err(format!("{} is {} after start", s.name(), state)),
                }
            })))?;
        }
        if let Some(shutdown) = &shutdown {
            shutdown.register(Box::new(wrap(Arc::clone(&service), |s: &TaskService| {
                match s.state() {
                    ServiceState::Stopping | ServiceState::Terminated => Ok(()),
                    state => Err(format!("{} is still {}", s.name(), state)),
                }
            })))?;
        }
        services.push(service);
    }

    if let Some(shutdown) = &shutdown {
        let tick = options.tick;
        let heartbeat: JoinHandle<()> = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick * 5);
            loop {
                interval.tick().await;
                log::debug!("heartbeat");
            }
        });
        shutdown.register_disposable(Arc::new(heartbeat))?;
    }

    let handler = ReportingHandler::new();
    if let Some(startup) = &startup {
        println!("Staging '{}'", STARTUP_STAGE);
        print_summary(STARTUP_STAGE, &startup.stage_with(&handler));
    }

    if options.wait {
        println!("{} services running, press Ctrl-C to stop", services.len());
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
        }
    } else {
        tokio::time::sleep(options.tick * 3).await;
    }

    let stop = module.stager();
    println!("Staging '{}'", stop.identity().name());
    print_summary(stop.identity().name(), &stop.stage_with(&handler));

    for service in &services {
        if service.state() == ServiceState::Failed {
            warn!("Aborting '{}' after it refused to stop", service.name());
            service.abort();
        }
        match tokio::time::timeout(options.tick * 50, service.await_terminated()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => info!("{}", e),
            Err(_) => warn!("'{}' did not terminate in time", service.name()),
        }
    }

    for (stage, summary) in lifecycle.stage_all(&handler) {
        if stage == STARTUP_STAGE {
            continue;
        }
        println!("Staging '{}'", stage);
        print_summary(&stage, &summary);
    }

    if handler.failures() > 0 {
        println!("Finished with {} failures", handler.failures());
        return Ok(ExitCode::FAILURE);
    }
    println!("Finished cleanly");
    Ok(ExitCode::SUCCESS)
}
