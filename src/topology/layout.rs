//! Node placement policies.
//!
//! Computes the 3D positions of the base station, the four relay slots, and
//! the four end-user slots for a given obstruction grid. Placement is a pure
//! function of (layout policy, grid dimensions): identical inputs always
//! yield bit-identical plans, which is what makes runs reproducible drop for
//! drop.
//!
//! The baseline plan puts the base station at the area center, the relay
//! slots on the center cross, and the end-users at the four quadrant
//! midpoints:
//!
//! ```text
//!   ue2    relay4   ue4
//!
//!   relay2  base   relay3
//!
//!   ue1    relay1   ue3
//! ```
//!
//! The named policies override individual slots to form relay chains; slots
//! they do not touch keep their baseline values. Slots beyond the configured
//! relay count are dead values: they stay in the plan but no node is ever
//! created for them.

use crate::buildings::GridSpec;
use crate::topology::types::Point3D;

/// Fixed clearance of node antennas above the building rooftops, in meters.
pub const ROOFTOP_CLEARANCE: f64 = 10.0;

/// Placement policy, selected by exact relay count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutPolicy {
    /// No relays; end-users talk to the base station directly
    ZeroRelay,
    /// Two relays forming a linear two-hop chain below the base station
    TwoRelay,
    /// Three relays chaining from the far quadrant corner toward the
    /// opposite corner
    ThreeRelay,
    /// Any other relay count: baseline positions, no overrides
    Generic,
}

impl LayoutPolicy {
    /// Select the policy for a relay count. Counts without a dedicated
    /// layout map to `Generic`.
    pub fn for_relay_count(relay_count: u32) -> Self {
        match relay_count {
            0 => LayoutPolicy::ZeroRelay,
            2 => LayoutPolicy::TwoRelay,
            3 => LayoutPolicy::ThreeRelay,
            _ => LayoutPolicy::Generic,
        }
    }
}

/// Complete position assignment for one scenario.
///
/// Relay and end-user slots are fixed-size arrays; which relay slots become
/// nodes is decided by the node factory, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementPlan {
    pub base_station: Point3D,
    pub relays: [Point3D; 4],
    pub end_users: [Point3D; 4],
}

/// Quadrant anchor coordinates derived from the grid extents.
///
/// `quarter`, `center` and `three_quarter` are the 1/4, 1/2 and 3/4 marks of
/// the covered area, each pulled back by half a street so they land mid
/// street rather than inside a building.
struct Anchors {
    x_quarter: f64,
    x_center: f64,
    x_three_quarter: f64,
    y_quarter: f64,
    y_center: f64,
    y_three_quarter: f64,
    /// Common node height: rooftop level plus the fixed clearance
    z: f64,
}

impl Anchors {
    fn from_grid(spec: &GridSpec, clearance: f64) -> Self {
        let cell_x = spec.building_width_x + spec.street_width;
        let cell_y = spec.building_width_y + spec.street_width;
        let half_street = spec.street_width / 2.0;
        let columns = spec.columns as f64;
        let rows = spec.rows as f64;
        Anchors {
            x_quarter: columns * cell_x / 4.0 - half_street,
            x_center: columns * cell_x / 2.0 - half_street,
            x_three_quarter: 3.0 * columns * cell_x / 4.0 - half_street,
            y_quarter: rows * cell_y / 4.0 - half_street,
            y_center: rows * cell_y / 2.0 - half_street,
            y_three_quarter: 3.0 * rows * cell_y / 4.0 - half_street,
            z: spec.building_height + clearance,
        }
    }

    fn at(&self, x: f64, y: f64) -> Point3D {
        Point3D::new(x, y, self.z)
    }
}

fn baseline(a: &Anchors) -> PlacementPlan {
    PlacementPlan {
        base_station: a.at(a.x_center, a.y_center),
        relays: [
            a.at(a.x_center, a.y_quarter),
            a.at(a.x_quarter, a.y_center),
            a.at(a.x_three_quarter, a.y_center),
            a.at(a.x_center, a.y_three_quarter),
        ],
        end_users: [
            a.at(a.x_quarter, a.y_quarter),
            a.at(a.x_quarter, a.y_three_quarter),
            a.at(a.x_three_quarter, a.y_quarter),
            a.at(a.x_three_quarter, a.y_three_quarter),
        ],
    }
}

/// Compute the placement plan for `policy` over the given grid.
///
/// All node heights equal `building_height + clearance`, keeping every node
/// above the obstruction grid regardless of policy.
pub fn place(policy: LayoutPolicy, spec: &GridSpec, clearance: f64) -> PlacementPlan {
    let a = Anchors::from_grid(spec, clearance);
    let mut plan = baseline(&a);

    match policy {
        LayoutPolicy::ZeroRelay | LayoutPolicy::Generic => {}
        LayoutPolicy::TwoRelay => {
            // Base station moves to the upper quadrant boundary midpoint,
            // relay slot 0 takes its place at the center. Slot 3 mirrors
            // the chain downward; it is a dead value unless four relays
            // are requested.
            plan.base_station = a.at(a.x_center, a.y_three_quarter);
            plan.relays[0] = a.at(a.x_center, a.y_center);
            plan.relays[3] = a.at(a.x_center, a.y_quarter);
        }
        LayoutPolicy::ThreeRelay => {
            // Chain from the far quadrant corner toward the near corner:
            //
            //   relay3   base
            //
            //   relay2   relay1
            //
            //   ue4
            plan.base_station = a.at(a.x_three_quarter, a.y_three_quarter);
            plan.relays[0] = a.at(a.x_three_quarter, a.y_center);
            plan.relays[1] = a.at(a.x_center, a.y_center);
            plan.relays[2] = a.at(a.x_center, a.y_three_quarter);
            // The near corner was vacated by the chain; the fourth
            // end-user moves there to sit at the end of it.
            plan.end_users[3] = a.at(a.x_quarter, a.y_quarter);
        }
    }

    plan
}
