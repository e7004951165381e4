//! Downlink traffic applications.
//!
//! One UDP-style server per end-user device and one client per end-user on
//! the remote host, sending fixed-size packets at a fixed interval. The
//! engine delivers each packet along the resolved attachment path and the
//! server counts what arrives while it is running.

use super::devices::DeviceHandle;
use super::scheduler::SimTime;

/// Per-packet drop probability applied when the link layer runs in
/// unacknowledged mode.
pub const UNACKNOWLEDGED_LOSS_PROBABILITY: f64 = 0.05;

/// Index of an installed client/server application pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AppId(pub u32);

/// Start/stop schedule shared by all traffic applications.
#[derive(Debug, Clone, Copy)]
pub struct TrafficTiming {
    /// Servers start counting at this time
    pub server_start: SimTime,
    /// Clients send their first packet at this time
    pub client_start: SimTime,
    /// Clients stop sending at this time
    pub client_stop: SimTime,
    /// Gap between consecutive packets of one client
    pub interval: SimTime,
    /// Payload size in bytes
    pub packet_size: u32,
}

/// One downlink client/server pair.
#[derive(Debug)]
pub struct DownlinkApp {
    /// End-user device the server runs on
    pub server_device: DeviceHandle,
    /// Destination port, unique per application
    pub port: u16,
    /// Packets handed to the client so far
    pub sent: u64,
    /// Packets counted by the server
    pub received: u64,
    /// Packets sent but not yet delivered or dropped
    pub in_flight: u64,
}

impl DownlinkApp {
    pub fn new(server_device: DeviceHandle, port: u16) -> Self {
        DownlinkApp { server_device, port, sent: 0, received: 0, in_flight: 0 }
    }
}
