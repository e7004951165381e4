//! Device registry for the simulation engine.
//!
//! Installing a node hands back an opaque `DeviceHandle`; the registry keeps
//! the device's position and its external identity (a cell id for base
//! stations and relays, a subscriber id for end-users). Handles are assigned
//! in installation order, which also makes them the tie-break key for
//! attachment resolution.

use serde::Serialize;

use crate::topology::types::Point3D;

/// Opaque reference to an installed device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DeviceHandle(u32);

impl DeviceHandle {
    pub fn from_raw(raw: u32) -> Self {
        DeviceHandle(raw)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// External identity of a device, dispatched by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceIdentity {
    /// Base station or relay radio head. `wired` marks a connection to the
    /// core network; only the base station carries it.
    Cell { cell_id: u16, wired: bool },
    /// End-user terminal with an IMSI-style subscriber id.
    Subscriber { imsi: u64 },
}

#[derive(Debug, Clone)]
pub struct Device {
    pub handle: DeviceHandle,
    /// Node the device is installed on
    pub node_id: u32,
    pub position: Point3D,
    pub identity: DeviceIdentity,
}

/// Plot label for a base-station or relay device.
#[derive(Debug, Clone, Copy)]
pub struct CellLabel {
    pub cell_id: u16,
    pub wired: bool,
    pub position: Point3D,
}

/// Plot label for an end-user device.
#[derive(Debug, Clone, Copy)]
pub struct SubscriberLabel {
    pub imsi: u64,
    pub position: Point3D,
}

/// Device installation errors. Installation failures are fatal to the run;
/// the topology cannot be built around a rejected device.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("node {node} rejected: position is not finite")]
    NonFinitePosition { node: u32 },
    #[error("cell identifier space exhausted")]
    CellIdsExhausted,
}

/// Registry of every installed device, in installation order.
pub struct DeviceRegistry {
    devices: Vec<Device>,
    next_cell_id: u16,
    next_imsi: u64,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        DeviceRegistry { devices: Vec::new(), next_cell_id: 1, next_imsi: 1 }
    }

    fn next_handle(&self) -> DeviceHandle {
        DeviceHandle(self.devices.len() as u32)
    }

    /// Install one cell (base station or relay) device per entry.
    ///
    /// # Arguments
    /// * `nodes` - `(node id, position)` pairs, one device each
    /// * `wired` - whether these cells connect to the wired core
    ///
    /// # Returns
    /// The handles in input order, or the first installation error.
    pub fn install_cells(
        &mut self,
        nodes: &[(u32, Point3D)],
        wired: bool,
    ) -> Result<Vec<DeviceHandle>, InstallError> {
        let mut handles = Vec::with_capacity(nodes.len());
        for &(node_id, position) in nodes {
            if !position.is_finite() {
                return Err(InstallError::NonFinitePosition { node: node_id });
            }
            if self.next_cell_id == u16::MAX {
                return Err(InstallError::CellIdsExhausted);
            }
            let handle = self.next_handle();
            let cell_id = self.next_cell_id;
            self.next_cell_id += 1;
            self.devices.push(Device {
                handle,
                node_id,
                position,
                identity: DeviceIdentity::Cell { cell_id, wired },
            });
            handles.push(handle);
        }
        Ok(handles)
    }

    /// Install one subscriber device per entry.
    pub fn install_subscribers(
        &mut self,
        nodes: &[(u32, Point3D)],
    ) -> Result<Vec<DeviceHandle>, InstallError> {
        let mut handles = Vec::with_capacity(nodes.len());
        for &(node_id, position) in nodes {
            if !position.is_finite() {
                return Err(InstallError::NonFinitePosition { node: node_id });
            }
            let handle = self.next_handle();
            let imsi = self.next_imsi;
            self.next_imsi += 1;
            self.devices.push(Device {
                handle,
                node_id,
                position,
                identity: DeviceIdentity::Subscriber { imsi },
            });
            handles.push(handle);
        }
        Ok(handles)
    }

    pub fn get(&self, handle: DeviceHandle) -> Option<&Device> {
        self.devices.get(handle.index())
    }

    pub fn position(&self, handle: DeviceHandle) -> Option<Point3D> {
        self.get(handle).map(|d| d.position)
    }

    /// True for cells installed with a wired core connection.
    pub fn is_wired(&self, handle: DeviceHandle) -> bool {
        matches!(
            self.get(handle).map(|d| d.identity),
            Some(DeviceIdentity::Cell { wired: true, .. })
        )
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Cell labels in installation order.
    pub fn cell_labels(&self) -> Vec<CellLabel> {
        self.devices
            .iter()
            .filter_map(|d| match d.identity {
                DeviceIdentity::Cell { cell_id, wired } => {
                    Some(CellLabel { cell_id, wired, position: d.position })
                }
                DeviceIdentity::Subscriber { .. } => None,
            })
            .collect()
    }

    /// Subscriber labels in installation order.
    pub fn subscriber_labels(&self) -> Vec<SubscriberLabel> {
        self.devices
            .iter()
            .filter_map(|d| match d.identity {
                DeviceIdentity::Subscriber { imsi } => {
                    Some(SubscriberLabel { imsi, position: d.position })
                }
                DeviceIdentity::Cell { .. } => None,
            })
            .collect()
    }
}
