use clap::{Parser, Subcommand};
use softrouter::capture::AfPacketSocket;
use softrouter::config::{self, Config, InterfaceOverride, ValidationResult};
use softrouter::dataplane::{self, LpmTrie, Router};
use softrouter::protocol::MacAddr;
use softrouter::telemetry::{init_logging, MetricsRegistry};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "softrouter")]
#[command(about = "A software IPv4 router")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the forwarding engine
    Run {
        /// Route table file (prefix next_hop mask interface)
        rtable: PathBuf,

        /// Interfaces to bind; route table ids follow this order
        #[arg(required = true)]
        interfaces: Vec<String>,

        /// Path to config.toml
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the route selected for an address
    Lookup {
        /// Route table file
        rtable: PathBuf,

        /// Destination address
        address: Ipv4Addr,
    },
    /// Validate config.toml and a route table without binding interfaces
    Check {
        /// Path to config.toml
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Route table file
        rtable: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            rtable,
            interfaces,
            config,
        } => cmd_run(&rtable, &interfaces, config.as_deref()),
        Commands::Lookup { rtable, address } => cmd_lookup(&rtable, address),
        Commands::Check { config, rtable } => cmd_check(config.as_deref(), rtable.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("[ERROR] {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<Config, String> {
    match path {
        Some(path) => config::load(path)
            .map_err(|e| format!("Failed to load {}: {}", path.display(), e)),
        None => Ok(Config::default()),
    }
}

fn load_routes(path: &Path) -> Result<Vec<softrouter::dataplane::RouteEntry>, String> {
    config::load_routes(path).map_err(|e| format!("Failed to load {}: {}", path.display(), e))
}

fn check_diagnostics(validation: &ValidationResult, what: &str) -> Result<(), String> {
    validation.print_diagnostics();
    if validation.has_errors() {
        Err(format!("{} validation failed", what))
    } else {
        Ok(())
    }
}

fn cmd_run(rtable: &Path, interfaces: &[String], config_path: Option<&Path>) -> Result<(), String> {
    use tokio::runtime::Runtime;

    let cfg = load_config(config_path)?;
    init_logging(Some(&cfg.logging));
    check_diagnostics(&config::validate(&cfg), "Configuration")?;

    for entry in &cfg.interfaces {
        if !interfaces.contains(&entry.name) {
            warn!("Config overrides {} which is not being bound", entry.name);
        }
    }

    info!("Loading {}...", rtable.display());
    let routes = load_routes(rtable)?;
    check_diagnostics(
        &config::validate_routes(&routes, Some(interfaces.len())),
        "Route table",
    )?;

    let rt = Runtime::new().map_err(|e| format!("Failed to create runtime: {}", e))?;

    rt.block_on(async move {
        let metrics = Arc::new(MetricsRegistry::new());
        let mut router = Router::new(metrics);
        router.set_pending_policy(cfg.arp.pending_policy, cfg.arp.pending_capacity);

        let mut links = Vec::with_capacity(interfaces.len());
        for name in interfaces {
            info!("Binding to interface {}...", name);
            let socket = AfPacketSocket::bind(name, cfg.capture.promiscuous).map_err(|e| {
                format!(
                    "Failed to bind to {}: {}. Run with root privileges.",
                    name, e
                )
            })?;

            let (mac, ip) = interface_addresses(&socket, cfg.interface(name))?;
            let id = router.add_interface(name, mac, ip);
            info!("  {} configured: id={}, MAC={}, IP={}", name, id, mac, ip);
            links.push(Arc::new(socket));
        }

        router.add_routes(routes);
        info!(
            "Router started with {} routes, pending policy {}",
            router.routes().len(),
            cfg.arp.pending_policy
        );

        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Cannot listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        dataplane::run(router, links, cfg.capture.channel_capacity, shutdown)
            .await
            .map_err(|e| e.to_string())
    })
}

/// Link and IPv4 address of a bound interface; config overrides win over
/// what the kernel reports.
fn interface_addresses(
    socket: &AfPacketSocket,
    entry: Option<&InterfaceOverride>,
) -> Result<(MacAddr, Ipv4Addr), String> {
    let name = socket.name();

    let mac = match entry.and_then(|e| e.mac.as_deref()) {
        Some(mac) => mac.parse::<MacAddr>().map_err(|e| format!("{}: {}", name, e))?,
        None => socket
            .mac_address()
            .map_err(|e| format!("Failed to read MAC of {}: {}", name, e))?,
    };

    let ip = match entry.and_then(|e| e.address) {
        Some(ip) => ip,
        None => socket.ipv4_address().map_err(|e| {
            format!(
                "Failed to read IPv4 address of {}: {}. Set [[interfaces]] address in the config.",
                name, e
            )
        })?,
    };

    Ok((mac, ip))
}

fn cmd_lookup(rtable: &Path, address: Ipv4Addr) -> Result<(), String> {
    init_logging(None);

    let trie: LpmTrie = load_routes(rtable)?.into_iter().collect();
    match trie.lookup(address) {
        Some(route) => println!("{} -> {}", address, route),
        None => println!("{} -> no route", address),
    }
    Ok(())
}

fn cmd_check(config_path: Option<&Path>, rtable: Option<&Path>) -> Result<(), String> {
    let cfg = load_config(config_path)?;
    init_logging(Some(&cfg.logging));

    let mut validation = config::validate(&cfg);
    if let Some(path) = config_path {
        println!("[INFO] Validating {}...", path.display());
    }

    if let Some(path) = rtable {
        println!("[INFO] Validating {}...", path.display());
        let routes = load_routes(path)?;
        println!("[INFO] {} routes loaded", routes.len());
        validation.merge(config::validate_routes(&routes, None));
    }

    check_diagnostics(&validation, "Configuration")?;
    println!("[INFO] Configuration is valid");
    Ok(())
}
