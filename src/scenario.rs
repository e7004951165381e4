//! Scenario orchestration.
//!
//! Coordinates one complete run: obstruction grid, placement, node creation,
//! plot export, subscriber addressing, attachment resolution, traffic, and
//! the event loop itself. Construction is synchronous; only the end-user
//! attachment pass and the traffic applications live on the scheduler.

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;

use crate::buildings;
use crate::config::ScenarioConfig;
use crate::engine::{Engine, EngineSettings, SimTime, TrafficTiming};
use crate::export;
use crate::topology::layout::{self, LayoutPolicy};
use crate::topology::nodes;
use crate::topology::types::AttachmentEdge;

/// Base destination port for the downlink servers, one port per end-user.
const DOWNLINK_BASE_PORT: u16 = 1234;

/// Outcome of a completed run.
#[derive(Debug)]
pub struct ScenarioReport {
    /// Packets counted by the first server application
    pub first_server_received: u64,
    /// Packets counted by every server, in installation order
    pub received_per_server: Vec<u64>,
    /// Packets dropped anywhere in the engine
    pub packets_dropped: u64,
    /// Resolved attachment edges
    pub edges: Vec<AttachmentEdge>,
    pub relay_count: u32,
    pub end_user_count: usize,
}

impl EngineSettings {
    /// Engine configuration derived from the scenario configuration.
    pub fn from_scenario(config: &ScenarioConfig) -> Self {
        EngineSettings {
            run_index: config.run,
            acknowledged_mode: config.rlc_acknowledged,
            buffer_bytes: config.rlc_buffer_mb as u64 * 1024 * 1024,
            ..EngineSettings::default()
        }
    }
}

/// Execute one scenario run from configuration to report.
///
/// Fatal errors (invalid configuration, device rejection, attachment over an
/// empty candidate set) surface immediately; export failures are logged by
/// the export passes and skipped.
pub fn run(config: &ScenarioConfig) -> Result<ScenarioReport> {
    config.validate().wrap_err("invalid scenario configuration")?;

    // Obstruction grid
    let obstructions = buildings::build_grid(&config.grid)
        .wrap_err("obstruction grid construction failed")?;

    let mut engine = Engine::new(EngineSettings::from_scenario(config));
    engine.register_obstructions(&obstructions);

    // Placement
    let policy = LayoutPolicy::for_relay_count(config.num_relays);
    let plan = layout::place(policy, &config.grid, config.rooftop_clearance);
    info!(
        "layout {:?}: base station {}, total area {:.0} m^2",
        policy,
        plan.base_station,
        config.grid.total_area()
    );

    // Node creation
    let node_set = nodes::build_nodes(&mut engine, &plan, config.num_relays)
        .wrap_err("node installation rejected by the engine")?;

    // Plot export; failures are logged and skipped inside each pass
    export::export_buildings(&config.plot_dir.join(export::BUILDINGS_FILE), &obstructions);
    export::export_cells(&config.plot_dir.join(export::CELLS_FILE), &engine.cell_labels());
    export::export_subscribers(
        &config.plot_dir.join(export::SUBSCRIBERS_FILE),
        &engine.subscriber_labels(),
    );

    // Subscriber addressing and default routes
    for user in &node_set.end_users {
        engine
            .configure_subscriber_network(user.device)
            .wrap_err("subscriber address assignment failed")?;
    }

    // Attachment: relays immediately, end-users after the configured delay.
    // Candidates are the base station plus every relay device.
    let relay_devices: Vec<_> = node_set.relays.iter().map(|n| n.device).collect();
    let user_devices: Vec<_> = node_set.end_users.iter().map(|n| n.device).collect();
    let mut candidates = vec![node_set.base_station.device];
    candidates.extend_from_slice(&relay_devices);
    info!(
        "{} relay devices, {} possible parent devices",
        relay_devices.len(),
        candidates.len()
    );

    if !relay_devices.is_empty() {
        engine
            .attach_to_closest(&relay_devices, &candidates)
            .wrap_err("relay attachment failed")?;
    }
    engine.attach_to_closest_delayed(
        &user_devices,
        &candidates,
        SimTime::from_micros(config.attachment_delay_us),
    );

    // Downlink traffic, one client/server pair per end-user
    for (index, user) in node_set.end_users.iter().enumerate() {
        engine.install_downlink(user.device, DOWNLINK_BASE_PORT + index as u16);
    }
    engine.start_traffic(TrafficTiming {
        server_start: SimTime::from_micros(config.server_start_us),
        client_start: SimTime::from_micros(config.client_start_us),
        client_stop: SimTime::from_micros(config.stop_us),
        interval: SimTime::from_micros(config.inter_packet_interval_us),
        packet_size: config.packet_size,
    });

    // Event loop
    engine
        .run_until(SimTime::from_micros(config.stop_us))
        .wrap_err("simulation run failed")?;

    // Registry export needs the resolved edges, so it runs after the loop
    let registry = export::TopologyRegistry {
        nodes: node_set.iter().collect(),
        edges: engine.attachment_edges(),
    };
    export::export_registry(&config.plot_dir.join(export::REGISTRY_FILE), &registry);

    let stats = engine.stats();
    info!(
        "run complete at {}: {} events processed, {} packets dropped",
        engine.now(),
        stats.events_processed,
        stats.packets_dropped
    );

    Ok(ScenarioReport {
        first_server_received: engine.first_server_received().unwrap_or(0),
        received_per_server: engine.apps().iter().map(|app| app.received).collect(),
        packets_dropped: stats.packets_dropped,
        edges: engine.attachment_edges().to_vec(),
        relay_count: config.num_relays,
        end_user_count: node_set.end_users.len(),
    })
}
