//! Network node creation.
//!
//! Turns a placement plan into node entities registered with the simulation
//! engine: exactly one base station, the configured number of relays, and
//! four end-users. This module owns no placement policy; it only binds
//! positions to devices. An engine rejection here is fatal, the topology is
//! foundational to everything after it.

use crate::engine::{Engine, EngineError};
use crate::topology::layout::PlacementPlan;
use crate::topology::types::{NetworkNode, NodeRole};

/// Number of end-user nodes in every scenario.
pub const END_USER_COUNT: usize = 4;

/// The complete node set of one scenario.
#[derive(Debug, Clone)]
pub struct NodeSet {
    pub base_station: NetworkNode,
    pub relays: Vec<NetworkNode>,
    pub end_users: Vec<NetworkNode>,
}

impl NodeSet {
    /// All nodes in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &NetworkNode> {
        std::iter::once(&self.base_station)
            .chain(self.relays.iter())
            .chain(self.end_users.iter())
    }
}

/// Create and register every node of the scenario.
///
/// Node ids are sequential across roles: 0 for the base station, then the
/// relays, then the end-users. Relays take the first `relay_count` slot
/// positions; when more relays are requested than the plan has slots, the
/// slot positions repeat, the way a cycling position allocator would hand
/// them out.
pub fn build_nodes(
    engine: &mut Engine,
    plan: &PlacementPlan,
    relay_count: u32,
) -> Result<NodeSet, EngineError> {
    let mut next_id = 0u32;
    let mut take_id = || {
        let id = next_id;
        next_id += 1;
        id
    };

    let base_id = take_id();
    let base_handles = engine.install_cells(&[(base_id, plan.base_station)], true)?;
    let base_station = NetworkNode {
        id: base_id,
        role: NodeRole::BaseStation,
        position: plan.base_station,
        device: base_handles[0],
    };

    let relay_nodes: Vec<(u32, _)> = (0..relay_count)
        .map(|slot| (take_id(), plan.relays[slot as usize % plan.relays.len()]))
        .collect();
    let relay_handles = engine.install_cells(&relay_nodes, false)?;
    let relays: Vec<NetworkNode> = relay_nodes
        .iter()
        .zip(relay_handles)
        .map(|(&(id, position), device)| NetworkNode { id, role: NodeRole::Relay, position, device })
        .collect();

    let user_nodes: Vec<(u32, _)> = plan
        .end_users
        .iter()
        .take(END_USER_COUNT)
        .map(|&position| (take_id(), position))
        .collect();
    let user_handles = engine.install_subscribers(&user_nodes)?;
    let end_users: Vec<NetworkNode> = user_nodes
        .iter()
        .zip(user_handles)
        .map(|(&(id, position), device)| NetworkNode { id, role: NodeRole::EndUser, position, device })
        .collect();

    log::info!(
        "created {} nodes: 1 base station, {} relays, {} end-users",
        1 + relays.len() + end_users.len(),
        relays.len(),
        end_users.len()
    );

    Ok(NodeSet { base_station, relays, end_users })
}
