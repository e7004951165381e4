use clap::Parser;
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::path::PathBuf;

use relaysim::config::{self, CliOverrides};
use relaysim::scenario;

/// Topology generator and attachment simulator for multi-hop wireless relay
/// networks
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// RNG run index (for generating different deterministic drops)
    #[arg(long)]
    run: Option<u64>,

    /// Reliable link mode: acknowledged delivery if true
    #[arg(long)]
    am: Option<bool>,

    /// Number of relay nodes
    #[arg(long)]
    num_relay: Option<u32>,

    /// Link-layer transmit buffer size [MB]
    #[arg(long)]
    rlc_buf_size: Option<u32>,

    /// Downlink inter-packet interval [us]
    #[arg(long)]
    int_pck: Option<u64>,

    /// YAML file supplying configuration defaults; explicit flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory receiving the plot and registry files
    #[arg(long)]
    plot_dir: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            config_file: self.config.clone(),
            run: self.run,
            rlc_acknowledged: self.am,
            num_relays: self.num_relay,
            rlc_buffer_mb: self.rlc_buf_size,
            inter_packet_interval_us: self.int_pck,
            plot_dir: self.plot_dir.clone(),
        }
    }
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse command-line arguments
    let args = Args::parse();

    // Initialize logging with default filter level of "info"
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    // Resolve configuration: defaults, then the optional file, then flags
    let config = config::resolve(&args.overrides())?;
    info!("starting relaysim run {} with {} relays", config.run, config.num_relays);

    let report = scenario::run(&config)?;

    info!(
        "per-server packet counts: {:?} ({} dropped)",
        report.received_per_server, report.packets_dropped
    );
    println!(
        "Total number of packets received at server {}",
        report.first_server_received
    );

    Ok(())
}
