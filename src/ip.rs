//! IPv4 assignment for end-user devices.
//!
//! End-user terminals draw addresses from a dedicated subscriber network and
//! route everything through a single gateway on the core side. Assignment is
//! sequential and conflict-free; handing the same device two addresses is an
//! error rather than a silent overwrite.

use std::collections::HashMap;
use std::net::Ipv4Addr;

use crate::engine::DeviceHandle;

/// Base of the subscriber address space (a /8, as the core network side
/// expects).
const SUBSCRIBER_NETWORK: u32 = 0x0700_0000; // 7.0.0.0
/// Host part reserved for the gateway.
const GATEWAY_HOST: u32 = 1;
/// Highest assignable host part within the /8.
const MAX_HOST: u32 = 0x00FF_FFFE;

/// Address assignment errors
#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("subscriber address space exhausted")]
    Exhausted,
    #[error("device {device:?} already holds address {address}")]
    AlreadyAssigned { device: DeviceHandle, address: Ipv4Addr },
}

/// Sequential allocator over the subscriber network.
pub struct SubscriberAddressPool {
    next_host: u32,
    assigned: HashMap<DeviceHandle, Ipv4Addr>,
}

impl Default for SubscriberAddressPool {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriberAddressPool {
    pub fn new() -> Self {
        // Host 1 belongs to the gateway, subscribers start at 2
        SubscriberAddressPool { next_host: GATEWAY_HOST + 1, assigned: HashMap::new() }
    }

    /// The default gateway every subscriber routes through.
    pub fn gateway(&self) -> Ipv4Addr {
        Ipv4Addr::from(SUBSCRIBER_NETWORK | GATEWAY_HOST)
    }

    /// Assign the next free address to `device`.
    pub fn assign(&mut self, device: DeviceHandle) -> Result<Ipv4Addr, AddressError> {
        if let Some(&address) = self.assigned.get(&device) {
            return Err(AddressError::AlreadyAssigned { device, address });
        }
        if self.next_host > MAX_HOST {
            return Err(AddressError::Exhausted);
        }
        let address = Ipv4Addr::from(SUBSCRIBER_NETWORK | self.next_host);
        self.next_host += 1;
        self.assigned.insert(device, address);
        log::debug!("assigned {} to device {:?}", address, device);
        Ok(address)
    }

    pub fn address_of(&self, device: DeviceHandle) -> Option<Ipv4Addr> {
        self.assigned.get(&device).copied()
    }

    pub fn assigned_count(&self) -> usize {
        self.assigned.len()
    }
}
