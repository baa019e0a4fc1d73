use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use multicall_provider::config::{
    DEFAULT_AGGREGATOR_ADDRESS, DEFAULT_MAX_BATCH_SIZE, DEFAULT_MAX_RECOVER_DEPTH,
};
use multicall_provider::reqwest::{reqwest, ReqwestClient};
use multicall_provider::{Address, BlockNumber, Bytes, MulticallConfig, MulticallProvider};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const PACKAGE: &str = env!("CARGO_PKG_NAME");

/// Executes eth_calls concurrently through a Multicall2 contract
#[derive(Parser, Debug)]
#[clap(
    version = VERSION,
    about = "Executes eth_calls concurrently, batching them through a Multicall2 contract"
)]
struct Args {
    /// The JSON-RPC URL of the Ethereum node
    #[arg(long = "rpc-url", short('u'), env = "MULTICALL_RPC_URL")]
    rpc_url: String,

    /// Time in seconds to wait for a response from the node
    #[arg(long, default_value = "60")]
    request_time_out_secs: u64,

    /// Block the calls are evaluated against (latest, pending, safe, finalized, earliest or a 0x number)
    #[arg(long, default_value = "latest")]
    block: BlockNumber,

    /// Maximum number of calls in one batch, 0 for no limit
    #[arg(long, default_value_t = DEFAULT_MAX_BATCH_SIZE)]
    max_batch_size: usize,

    /// Address of the Multicall2 contract
    #[arg(long, default_value_t = DEFAULT_AGGREGATOR_ADDRESS)]
    aggregator_address: Address,

    /// Re-execute failed calls without multicall to get the real error
    #[arg(long)]
    debug_error: bool,

    /// Split batches failing on timeouts or server errors and retry them
    #[arg(long)]
    recover_batch_error: bool,

    /// Maximum number of times a failing batch is split
    #[arg(long, default_value_t = DEFAULT_MAX_RECOVER_DEPTH)]
    max_recover_depth: u32,

    /// Log why calls were not batched and how batch errors were recovered
    #[arg(long)]
    verbose: bool,

    /// Log level (default: info, options: trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Calls to execute, formatted as `<to>:<data>`
    #[arg(required = true)]
    calls: Vec<String>,
}

impl Args {
    fn multicall_config(&self) -> MulticallConfig {
        MulticallConfig {
            verbose: self.verbose,
            max_batch_size: (self.max_batch_size > 0).then_some(self.max_batch_size),
            debug_error: self.debug_error,
            aggregator_address: self.aggregator_address,
            recover_batch_error: self.recover_batch_error,
            max_recover_depth: self.max_recover_depth,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logger
    init_logger(&args.log_level)?;

    let config = args.multicall_config();

    log::info!("{PACKAGE}");
    log::info!("----------------------");
    log::info!("- rpc-url: {}", args.rpc_url);
    log::info!("- request_time_out_secs: {}", args.request_time_out_secs);
    log::info!("- block: {}", args.block);
    log::info!("- config: {:?}", config);
    log::info!("----------------------");

    let calls = args
        .calls
        .iter()
        .map(|call| parse_call(call))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.request_time_out_secs))
        .build()?;
    let provider = MulticallProvider::with_config(
        ReqwestClient::new_with_client(args.rpc_url.clone(), http_client),
        config,
    )?;

    let results = futures::future::join_all(
        calls
            .into_iter()
            .map(|(to, data)| provider.eth_call(to, data, args.block)),
    )
    .await;

    for (call, result) in args.calls.iter().zip(results) {
        match result {
            Ok(data) => println!("{call} -> {data}"),
            Err(e) => println!("{call} -> error: {e}"),
        }
    }

    Ok(())
}

fn parse_call(call: &str) -> anyhow::Result<(Address, Bytes)> {
    let (to, data) = call
        .split_once(':')
        .with_context(|| format!("call {call} is not formatted as <to>:<data>"))?;

    Ok((
        to.parse().with_context(|| format!("invalid address {to}"))?,
        data.parse().with_context(|| format!("invalid call data {data}"))?,
    ))
}

fn init_logger(log_level: &str) -> anyhow::Result<()> {
    let level = log_level
        .parse::<log::LevelFilter>()
        .unwrap_or(log::LevelFilter::Info);

    env_logger::Builder::new().filter(None, level).try_init()?;

    Ok(())
}
