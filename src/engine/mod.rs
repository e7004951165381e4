//! Link-level simulation engine.
//!
//! The engine owns everything behind the topology core's interface boundary:
//! the discrete-event scheduler, the device registry, obstruction
//! registration, attachment execution, subscriber addressing, and the
//! downlink traffic applications. The core hands it positions and device
//! sets; the engine hands back opaque handles and, after the run, packet
//! counters.
//!
//! Execution is single-threaded and cooperative. Topology construction is
//! synchronous during setup; everything that happens "later" is an explicit
//! event queued with a simulated-time key.

mod devices;
mod scheduler;
mod traffic;

pub use devices::{CellLabel, DeviceHandle, DeviceRegistry, InstallError, SubscriberLabel};
pub use scheduler::{EventQueue, SimTime};
pub use traffic::{AppId, DownlinkApp, TrafficTiming, UNACKNOWLEDGED_LOSS_PROBABILITY};

use std::collections::HashMap;
use std::net::Ipv4Addr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::buildings::Obstruction;
use crate::ip::{AddressError, SubscriberAddressPool};
use crate::topology::attachment::{self, AttachmentError, Candidate};
use crate::topology::types::{AttachmentEdge, Point3D};

/// Engine-wide configuration, fixed for the whole run.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// RNG run index; different runs give different deterministic drops
    pub run_index: u64,
    /// Acknowledged link mode delivers losslessly; unacknowledged mode
    /// applies a per-packet drop probability
    pub acknowledged_mode: bool,
    /// Link-layer transmit buffer bound, in bytes
    pub buffer_bytes: u64,
    /// One-way delay of the wired core link
    pub core_link_delay: SimTime,
    /// Per-hop delay on the wireless relay path
    pub wireless_hop_delay: SimTime,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            run_index: 0,
            acknowledged_mode: true,
            buffer_bytes: 1000 * 1024 * 1024,
            core_link_delay: SimTime::from_millis(10),
            wireless_hop_delay: SimTime::from_millis(1),
        }
    }
}

/// Counters accumulated over one run.
#[derive(Debug, Default, Clone, Copy)]
pub struct EngineStats {
    pub events_processed: u64,
    pub packets_dropped: u64,
}

/// Engine failures. All of them are fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Install(#[from] InstallError),
    #[error(transparent)]
    Attachment(#[from] AttachmentError),
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("unknown device {0:?}")]
    UnknownDevice(DeviceHandle),
}

enum EngineEvent {
    /// Deferred end-user attachment pass
    ResolveSubscribers { children: Vec<DeviceHandle>, candidates: Vec<DeviceHandle> },
    /// A client hands one packet to the link layer
    ClientSend { app: AppId },
    /// A packet reaches its server
    Deliver { app: AppId },
}

pub struct Engine {
    settings: EngineSettings,
    now: SimTime,
    queue: EventQueue<EngineEvent>,
    devices: DeviceRegistry,
    parents: HashMap<DeviceHandle, DeviceHandle>,
    edges: Vec<AttachmentEdge>,
    obstruction_count: usize,
    apps: Vec<DownlinkApp>,
    timing: Option<TrafficTiming>,
    addresses: SubscriberAddressPool,
    default_routes: Vec<(DeviceHandle, Ipv4Addr)>,
    rng: StdRng,
    stats: EngineStats,
}

impl Engine {
    pub fn new(settings: EngineSettings) -> Self {
        let rng = StdRng::seed_from_u64(settings.run_index);
        Engine {
            settings,
            now: SimTime::ZERO,
            queue: EventQueue::new(),
            devices: DeviceRegistry::new(),
            parents: HashMap::new(),
            edges: Vec::new(),
            obstruction_count: 0,
            apps: Vec::new(),
            timing: None,
            addresses: SubscriberAddressPool::new(),
            default_routes: Vec::new(),
            rng,
            stats: EngineStats::default(),
        }
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Make obstructions visible to the propagation side of the engine.
    pub fn register_obstructions(&mut self, obstructions: &[Obstruction]) {
        self.obstruction_count += obstructions.len();
        log::info!("registered {} obstructions with the propagation model", obstructions.len());
    }

    pub fn registered_obstruction_count(&self) -> usize {
        self.obstruction_count
    }

    /// Install cell devices (base station when `wired`, relays otherwise).
    pub fn install_cells(
        &mut self,
        nodes: &[(u32, Point3D)],
        wired: bool,
    ) -> Result<Vec<DeviceHandle>, EngineError> {
        Ok(self.devices.install_cells(nodes, wired)?)
    }

    /// Install end-user devices.
    pub fn install_subscribers(
        &mut self,
        nodes: &[(u32, Point3D)],
    ) -> Result<Vec<DeviceHandle>, EngineError> {
        Ok(self.devices.install_subscribers(nodes)?)
    }

    pub fn cell_labels(&self) -> Vec<CellLabel> {
        self.devices.cell_labels()
    }

    pub fn subscriber_labels(&self) -> Vec<SubscriberLabel> {
        self.devices.subscriber_labels()
    }

    fn candidate(&self, handle: DeviceHandle) -> Result<Candidate, EngineError> {
        self.devices
            .position(handle)
            .map(|position| Candidate { device: handle, position })
            .ok_or(EngineError::UnknownDevice(handle))
    }

    fn candidates(&self, handles: &[DeviceHandle]) -> Result<Vec<Candidate>, EngineError> {
        handles.iter().map(|&h| self.candidate(h)).collect()
    }

    /// Attach `children` to their closest wired candidate, immediately.
    ///
    /// Only candidates with a wired core connection seed the search; each
    /// attached child then becomes a candidate for the children after it,
    /// so relay chains can form.
    pub fn attach_to_closest(
        &mut self,
        children: &[DeviceHandle],
        candidates: &[DeviceHandle],
    ) -> Result<Vec<AttachmentEdge>, EngineError> {
        let child_set = self.candidates(children)?;
        let wired: Vec<Candidate> = self
            .candidates(candidates)?
            .into_iter()
            .filter(|c| self.devices.is_wired(c.device))
            .collect();

        let pairs = attachment::resolve_progressive(&child_set, &wired)?;
        Ok(self.record_edges(pairs))
    }

    /// Queue an attachment pass for `children` against the full candidate
    /// set, to fire `delay` after the current simulated time.
    pub fn attach_to_closest_delayed(
        &mut self,
        children: &[DeviceHandle],
        candidates: &[DeviceHandle],
        delay: SimTime,
    ) {
        let at = self.now.saturating_add(delay);
        log::info!("scheduling attachment of {} devices at {}", children.len(), at);
        self.queue.schedule(
            at,
            EngineEvent::ResolveSubscribers {
                children: children.to_vec(),
                candidates: candidates.to_vec(),
            },
        );
    }

    fn record_edges(&mut self, pairs: Vec<(DeviceHandle, DeviceHandle)>) -> Vec<AttachmentEdge> {
        let mut recorded = Vec::with_capacity(pairs.len());
        for (child, parent) in pairs {
            let edge = AttachmentEdge { child, parent, resolved_at: self.now };
            self.parents.insert(child, parent);
            self.edges.push(edge);
            recorded.push(edge);
        }
        recorded
    }

    pub fn attachment_edges(&self) -> &[AttachmentEdge] {
        &self.edges
    }

    pub fn parent_of(&self, device: DeviceHandle) -> Option<DeviceHandle> {
        self.parents.get(&device).copied()
    }

    /// Wireless hops from `device` up to the nearest wired cell, following
    /// resolved attachment edges.
    pub fn hops_to_wired(&self, device: DeviceHandle) -> Option<u32> {
        let mut current = device;
        let mut hops = 0u32;
        // Depth bound guards against a malformed parent cycle
        for _ in 0..=self.devices.len() {
            if self.devices.is_wired(current) {
                return Some(hops);
            }
            match self.parents.get(&current) {
                Some(&parent) => {
                    hops += 1;
                    current = parent;
                }
                None => return None,
            }
        }
        None
    }

    /// Assign a subscriber address and default route to an end-user device.
    pub fn configure_subscriber_network(
        &mut self,
        device: DeviceHandle,
    ) -> Result<Ipv4Addr, EngineError> {
        let address = self.addresses.assign(device)?;
        let gateway = self.addresses.gateway();
        self.default_routes.push((device, gateway));
        log::debug!("device {:?} gets {} via gateway {}", device, address, gateway);
        Ok(address)
    }

    pub fn subscriber_address(&self, device: DeviceHandle) -> Option<Ipv4Addr> {
        self.addresses.address_of(device)
    }

    /// Gateway recorded as the default route for `device`, if one was set.
    pub fn default_route(&self, device: DeviceHandle) -> Option<Ipv4Addr> {
        self.default_routes
            .iter()
            .find(|(d, _)| *d == device)
            .map(|&(_, gateway)| gateway)
    }

    /// Install a downlink client/server pair for an end-user device.
    pub fn install_downlink(&mut self, server_device: DeviceHandle, port: u16) -> AppId {
        let id = AppId(self.apps.len() as u32);
        self.apps.push(DownlinkApp::new(server_device, port));
        id
    }

    /// Arm all installed traffic applications with a common schedule.
    pub fn start_traffic(&mut self, timing: TrafficTiming) {
        for index in 0..self.apps.len() {
            self.queue.schedule(timing.client_start, EngineEvent::ClientSend { app: AppId(index as u32) });
        }
        self.timing = Some(timing);
    }

    pub fn app(&self, id: AppId) -> Option<&DownlinkApp> {
        self.apps.get(id.0 as usize)
    }

    pub fn apps(&self) -> &[DownlinkApp] {
        &self.apps
    }

    /// Packets counted by the first installed server, the scenario's
    /// headline diagnostic.
    pub fn first_server_received(&self) -> Option<u64> {
        self.apps.first().map(|app| app.received)
    }

    /// Drive the event loop until `stop`. Events scheduled past the stop
    /// time are discarded, matching a hard simulation stop.
    pub fn run_until(&mut self, stop: SimTime) -> Result<(), EngineError> {
        while let Some(at) = self.queue.peek_time() {
            if at > stop {
                break;
            }
            let Some((at, event)) = self.queue.pop() else { break };
            self.now = at;
            self.stats.events_processed += 1;
            self.handle_event(event)?;
        }
        if !self.queue.is_empty() {
            log::debug!("discarding {} events scheduled past {}", self.queue.len(), stop);
        }
        self.now = stop;
        Ok(())
    }

    fn handle_event(&mut self, event: EngineEvent) -> Result<(), EngineError> {
        match event {
            EngineEvent::ResolveSubscribers { children, candidates } => {
                let child_set = self.candidates(&children)?;
                let candidate_set = self.candidates(&candidates)?;
                let pairs = attachment::resolve_against(&child_set, &candidate_set)?;
                let edges = self.record_edges(pairs);
                log::info!("attached {} end-user devices at {}", edges.len(), self.now);
                Ok(())
            }
            EngineEvent::ClientSend { app } => {
                self.client_send(app);
                Ok(())
            }
            EngineEvent::Deliver { app } => {
                self.deliver(app);
                Ok(())
            }
        }
    }

    fn client_send(&mut self, id: AppId) {
        let timing = match self.timing {
            Some(t) => t,
            None => return,
        };
        if self.now >= timing.client_stop {
            return;
        }

        let (server_device, in_flight) = {
            let app = &self.apps[id.0 as usize];
            (app.server_device, app.in_flight)
        };

        let buffer_packets = (self.settings.buffer_bytes / timing.packet_size.max(1) as u64).max(1);
        let hops = self.hops_to_wired(server_device);
        let lost = !self.settings.acknowledged_mode
            && self.rng.gen_bool(UNACKNOWLEDGED_LOSS_PROBABILITY);

        let app = &mut self.apps[id.0 as usize];
        app.sent += 1;
        match hops {
            None => {
                // Destination not attached yet; nothing can carry the packet
                self.stats.packets_dropped += 1;
                log::warn!("dropping packet for unattached device {:?}", server_device);
            }
            Some(_) if in_flight >= buffer_packets => {
                self.stats.packets_dropped += 1;
                log::warn!("transmit buffer full for app {:?}, dropping packet", id);
            }
            Some(_) if lost => {
                self.stats.packets_dropped += 1;
            }
            Some(hops) => {
                app.in_flight += 1;
                let delay = self
                    .settings
                    .core_link_delay
                    .saturating_add(SimTime::from_micros(
                        hops as u64 * self.settings.wireless_hop_delay.as_micros(),
                    ));
                self.queue.schedule(self.now.saturating_add(delay), EngineEvent::Deliver { app: id });
            }
        }

        let next = self.now.saturating_add(timing.interval);
        if next < timing.client_stop {
            self.queue.schedule(next, EngineEvent::ClientSend { app: id });
        }
    }

    fn deliver(&mut self, id: AppId) {
        let timing = match self.timing {
            Some(t) => t,
            None => return,
        };
        let app = &mut self.apps[id.0 as usize];
        app.in_flight = app.in_flight.saturating_sub(1);
        if self.now >= timing.server_start {
            app.received += 1;
        } else {
            // Server not started yet; the packet is lost at the sink
            self.stats.packets_dropped += 1;
        }
    }
}
