use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use msgfee_execution::InterfaceRegistry;
use msgfee_node::{
    sync::{self, BlockStore, MemoryBlockStore},
    Config, ValidatedConfig,
};
use msgfee_types::genesis_header;
use std::sync::Arc;
use tracing::{error, info};

fn init_tracing(config: &ValidatedConfig) {
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_max_level(config.log_level)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(config.log_level)
            .init();
    }
}

fn print_dry_run_report(config: &ValidatedConfig) {
    println!("dry-run report");
    println!("  chain_id: {}", config.chain_id);
    println!("  listen: {}", config.listen);
    println!("  worker_threads: {}", config.worker_threads);
    println!("  log_level: {} json={}", config.log_level, config.json_logs);
    println!(
        "  fees: default_denom={} floor_gas_price={} usd_conversion_rate={}",
        config.fee_params.default_fee_denom,
        config.fee_params.floor_gas_price,
        config.fee_params.usd_conversion_rate
    );
    for fee in &config.msg_fees {
        println!("    {} -> {}", fee.msg_type_url, fee.additional_fee);
    }
}

async fn serve(config: ValidatedConfig, store: Arc<dyn BlockStore>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("Could not bind {}", config.listen))?;
    info!(address = %config.listen, "serving sync status");
    axum::serve(listener, sync::router(store).into_make_service())
        .await
        .context("sync status server failed")
}

fn main() {
    if let Err(err) = main_result() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn main_result() -> Result<()> {
    // Parse arguments
    let matches = Command::new("node")
        .about("Node for a msgfee chain.")
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Validate config and exit without starting the node")
                .action(ArgAction::SetTrue),
        )
        .arg(Arg::new("config").long("config").required(true))
        .get_matches();
    let dry_run = matches.get_flag("dry-run");

    // Load config
    let config_file = matches
        .get_one::<String>("config")
        .context("missing --config")?;
    let config_file = std::fs::read_to_string(config_file)
        .with_context(|| format!("Could not read config file {config_file}"))?;
    let config: Config =
        serde_yaml::from_str(&config_file).context("Could not parse config file")?;
    let config = config.validate().context("Invalid config")?;

    if dry_run {
        print_dry_run_report(&config);
        println!("config ok");
        return Ok(());
    }

    init_tracing(&config);
    info!(
        chain_id = %config.chain_id,
        msg_fees = config.msg_fees.len(),
        "loaded config file"
    );

    // Modules register their message types and services here.
    let router = config
        .build_router(InterfaceRegistry::new(), Vec::new())
        .context("Failed to register msg services")?;
    info!(routes = router.routes().count(), "msg service router ready");

    let store: Arc<dyn BlockStore> = Arc::new(MemoryBlockStore::starting_at(genesis_header()));

    // Start runtime
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .enable_all()
        .build()
        .context("Failed to build runtime")?;
    runtime.block_on(async move {
        let result = serve(config, store).await;
        if let Err(err) = &result {
            error!(?err, "node exited");
        }
        result
    })
}
