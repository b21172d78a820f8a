//! lazysvc binary.
//!
//! Hosts demo services lazily in-process and drives clients against them,
//! or prints the effective configuration.

use std::any::Any;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use lazysvc::config::ConfigArgs;
use lazysvc::error::CallResult;
use lazysvc::lifecycle::ExitHandler;
use lazysvc::registry::RegistryProxy;
use lazysvc::scheduler::{SchedulerPolicyMap, SCHED_NORMAL};
use lazysvc::{
    InMemoryRegistry, LazyServiceRegistrar, LifecycleConfig, NotificationDispatcher,
    ResolveOptions, ResolverConfig, ServiceHandle, ServiceObject, ServiceResolver, TransportKind,
    BASE_DESCRIPTOR,
};
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

const DEMO_DESCRIPTOR: &str = "lazysvc.demo@1.0::IDemo";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    config: ConfigArgs,

    /// Default log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log filter directives (e.g. "lazysvc=trace")
    #[arg(long, env = "LAZYSVC_LOG")]
    log_filter: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Host services lazily and exit once every client has disconnected
    Demo {
        /// Instance names to host
        #[arg(long, value_delimiter = ',', default_value = "default")]
        services: Vec<String>,

        /// Number of client threads
        #[arg(long, default_value_t = 2)]
        clients: usize,

        /// How long each client holds its service
        #[arg(long, default_value_t = 200)]
        hold_ms: u64,
    },

    /// Print the effective configuration as JSON
    Config,
}

struct DemoService {
    name: String,
}

impl DemoService {
    fn greet(&self, client: usize) -> String {
        format!("{} greets client {}", self.name, client)
    }
}

impl ServiceObject for DemoService {
    fn interface_chain(&self) -> CallResult<Vec<String>> {
        Ok(vec![DEMO_DESCRIPTOR.to_owned(), BASE_DESCRIPTOR.to_owned()])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(cli.log_level.parse().unwrap_or(Level::INFO).into())
                .parse_lossy(cli.log_filter.as_deref().unwrap_or("lazysvc=debug")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let config = LifecycleConfig::load(&cli.config).context("failed to load configuration")?;

    match cli.command {
        Commands::Demo {
            services,
            clients,
            hold_ms,
        } => run_demo(&config, &services, clients, Duration::from_millis(hold_ms)),
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn run_demo(
    config: &LifecycleConfig,
    names: &[String],
    clients: usize,
    hold: Duration,
) -> anyhow::Result<()> {
    if names.is_empty() {
        bail!("at least one service name is required");
    }

    let dispatcher = NotificationDispatcher::configure(&config.threadpool)?;
    let policies = Arc::new(SchedulerPolicyMap::new());
    let registry = InMemoryRegistry::new(dispatcher.notifier(), Some(policies.clone()));

    // The exit handler signals main instead of terminating the process, so
    // the final state can be reported before returning.
    let (exit_tx, exit_rx) = mpsc::channel();
    let on_exit: ExitHandler = Arc::new(move || {
        let _ = exit_tx.send(());
    });
    let registrar = LazyServiceRegistrar::with_exit_handler(registry.clone(), on_exit);

    let mut hosted = Vec::with_capacity(names.len());
    for name in names {
        let service = ServiceHandle::new(DemoService { name: name.clone() });
        policies.set_min_scheduler_policy(&service, SCHED_NORMAL, 0)?;
        registry.declare(DEMO_DESCRIPTOR, name, TransportKind::Direct);
        registrar.register_service(&service, name)?;
        hosted.push(service);
    }
    info!("Hosting {} service(s)", hosted.len());

    let resolver = Arc::new(
        ServiceResolver::new(registry.clone(), ResolverConfig::from_settings(&config.resolver))
            .with_implementations(registry.clone()),
    );

    let workers: Vec<_> = (0..clients)
        .map(|client| {
            let resolver = resolver.clone();
            let name = names[client % names.len()].clone();
            thread::spawn(move || {
                let options = ResolveOptions::new(true, false).with_timeout(Duration::from_secs(5));
                let Some(handle) = resolver.resolve_with(DEMO_DESCRIPTOR, &name, options) else {
                    warn!("client {} could not resolve {}", client, name);
                    return;
                };
                let greeting = handle
                    .downcast_ref::<RegistryProxy>()
                    .and_then(|proxy| proxy.target().ok())
                    .and_then(|target| target.downcast_ref::<DemoService>())
                    .map(|service| service.greet(client));
                if let Some(greeting) = greeting {
                    info!("{}", greeting);
                }
                thread::sleep(hold);
            })
        })
        .collect();

    for worker in workers {
        if worker.join().is_err() {
            warn!("client thread panicked");
        }
    }

    let callback = registrar.client_callback();
    if clients > 0 && exit_rx.recv_timeout(Duration::from_secs(5)).is_err() {
        warn!(
            "process did not reach zero clients ({} services still in use)",
            callback.live_connections()
        );
    }

    println!("{}", serde_json::to_string_pretty(&registry.list_services())?);
    info!(
        "Demo finished: {} registered, {} in use, exited={}",
        callback.registered_services(),
        callback.live_connections(),
        callback.has_exited()
    );

    dispatcher.shutdown();
    Ok(())
}
