//! Topology export.
//!
//! Serializes the obstruction grid and the resolved node set to gnuplot
//! directive files, plus a JSON registry of nodes and attachment edges. All
//! of these are diagnostic artifacts: a pass that cannot open its target is
//! logged and skipped, and the run carries on. Each pass preserves the input
//! order of its records.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::buildings::Obstruction;
use crate::engine::{CellLabel, SubscriberLabel};
use crate::topology::types::{AttachmentEdge, NetworkNode};

/// Default file name for the obstruction plot.
pub const BUILDINGS_FILE: &str = "buildings.txt";
/// Default file name for the base-station/relay plot.
pub const CELLS_FILE: &str = "enbs.txt";
/// Default file name for the end-user plot.
pub const SUBSCRIBERS_FILE: &str = "ues.txt";
/// Default file name for the JSON topology registry.
pub const REGISTRY_FILE: &str = "topology.json";

/// Write one `set building object` rectangle per obstruction, with a
/// 1-based sequential index.
pub fn export_buildings(path: &Path, obstructions: &[Obstruction]) {
    let result = (|| -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        for (index, b) in obstructions.iter().enumerate() {
            writeln!(
                out,
                "set building object {} rect. from {},{} to {},{} front fs empty",
                index + 1,
                b.x_min,
                b.y_min,
                b.x_max,
                b.y_max
            )?;
        }
        out.flush()
    })();
    match result {
        Ok(()) => log::info!("wrote {} buildings to {}", obstructions.len(), path.display()),
        Err(e) => log::error!("can't write building plot {}: {}", path.display(), e),
    }
}

/// Write one label per base-station or relay device, colored blue for the
/// wired base station and red for relays.
pub fn export_cells(path: &Path, cells: &[CellLabel]) {
    let result = (|| -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        for cell in cells {
            let color = if cell.wired { "blue" } else { "red" };
            writeln!(
                out,
                "set label \"{}\" at {},{} left font \"Helvetica,8\" textcolor rgb \"{}\" front point pt 4 ps 0.3 lc rgb \"{}\" offset 0,0",
                cell.cell_id, cell.position.x, cell.position.y, color, color
            )?;
        }
        out.flush()
    })();
    match result {
        Ok(()) => log::info!("wrote {} cell labels to {}", cells.len(), path.display()),
        Err(e) => log::error!("can't write cell plot {}: {}", path.display(), e),
    }
}

/// Write one label per end-user device.
pub fn export_subscribers(path: &Path, subscribers: &[SubscriberLabel]) {
    let result = (|| -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        for subscriber in subscribers {
            writeln!(
                out,
                "set label \"{}\" at {},{} left font \"Helvetica,8\" textcolor rgb \"black\" front point pt 1 ps 0.3 lc rgb \"black\" offset 0,0",
                subscriber.imsi, subscriber.position.x, subscriber.position.y
            )?;
        }
        out.flush()
    })();
    match result {
        Ok(()) => log::info!("wrote {} subscriber labels to {}", subscribers.len(), path.display()),
        Err(e) => log::error!("can't write subscriber plot {}: {}", path.display(), e),
    }
}

/// Resolved topology as written to the JSON registry.
#[derive(Debug, Serialize)]
pub struct TopologyRegistry<'a> {
    pub nodes: Vec<&'a NetworkNode>,
    pub edges: &'a [AttachmentEdge],
}

/// Write the node/edge registry. Like the plot passes, failure here is
/// logged and skipped.
pub fn export_registry(path: &Path, registry: &TopologyRegistry<'_>) {
    let result = (|| -> io::Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), registry)
            .map_err(io::Error::from)
    })();
    match result {
        Ok(()) => log::info!(
            "wrote topology registry ({} nodes, {} edges) to {}",
            registry.nodes.len(),
            registry.edges.len(),
            path.display()
        ),
        Err(e) => log::error!("can't write topology registry {}: {}", path.display(), e),
    }
}
