//! Nearest-candidate attachment resolution.
//!
//! Assigns every relay and end-user exactly one parent device. A child
//! attaches to the candidate at minimum Euclidean 3D distance; exact ties
//! break to the lowest candidate device id. Relays are wired in ascending
//! device order against a progressively growing candidate set (the base
//! station first, then every relay already wired), which is what lets
//! multi-hop chains form. End-users resolve against a fixed candidate set in
//! a single pass.
//!
//! Resolution over an empty candidate set is an error, never a silent skip:
//! the attachment graph is foundational to everything the engine does
//! afterwards.

use crate::engine::DeviceHandle;
use crate::topology::types::Point3D;

/// A device eligible to become an attachment parent.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub device: DeviceHandle,
    pub position: Point3D,
}

/// Attachment resolution errors
#[derive(Debug, thiserror::Error)]
pub enum AttachmentError {
    #[error("no attachment candidates available for device {child:?}")]
    NoCandidates { child: DeviceHandle },
}

/// Pick the closest candidate to `position`, ties broken by lowest device id.
///
/// # Returns
/// The winning candidate's device handle, or `NoCandidates` if the set is
/// empty.
pub fn closest_candidate(
    child: DeviceHandle,
    position: &Point3D,
    candidates: &[Candidate],
) -> Result<DeviceHandle, AttachmentError> {
    let mut best: Option<(f64, DeviceHandle)> = None;
    for candidate in candidates {
        let distance = position.distance_to(&candidate.position);
        let closer = match best {
            None => true,
            Some((best_distance, best_device)) => {
                distance < best_distance
                    || (distance == best_distance && candidate.device < best_device)
            }
        };
        if closer {
            best = Some((distance, candidate.device));
        }
    }
    best.map(|(_, device)| device)
        .ok_or(AttachmentError::NoCandidates { child })
}

/// Wire `children` one by one against a growing candidate set.
///
/// Children are processed in ascending device order. The set starts as
/// `wired` and each resolved child joins it, so later children may attach to
/// earlier ones and form chains.
///
/// # Returns
/// One `(child, parent)` pair per child, in resolution order.
pub fn resolve_progressive(
    children: &[Candidate],
    wired: &[Candidate],
) -> Result<Vec<(DeviceHandle, DeviceHandle)>, AttachmentError> {
    let mut ordered: Vec<Candidate> = children.to_vec();
    ordered.sort_by_key(|c| c.device);

    let mut candidates: Vec<Candidate> = wired.to_vec();
    let mut edges = Vec::with_capacity(ordered.len());
    for child in ordered {
        let parent = closest_candidate(child.device, &child.position, &candidates)?;
        if let Some(parent_position) =
            candidates.iter().find(|c| c.device == parent).map(|c| c.position)
        {
            log::debug!(
                "device {:?} attaches to {:?} at distance {:.1} m",
                child.device,
                parent,
                child.position.distance_to(&parent_position)
            );
        }
        edges.push((child.device, parent));
        candidates.push(child);
    }
    Ok(edges)
}

/// Resolve every child against the same fixed candidate set.
pub fn resolve_against(
    children: &[Candidate],
    candidates: &[Candidate],
) -> Result<Vec<(DeviceHandle, DeviceHandle)>, AttachmentError> {
    let mut ordered: Vec<Candidate> = children.to_vec();
    ordered.sort_by_key(|c| c.device);

    let mut edges = Vec::with_capacity(ordered.len());
    for child in &ordered {
        let parent = closest_candidate(child.device, &child.position, candidates)?;
        edges.push((child.device, parent));
    }
    Ok(edges)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: u32, x: f64, y: f64) -> Candidate {
        Candidate { device: DeviceHandle::from_raw(id), position: Point3D::new(x, y, 0.0) }
    }

    #[test]
    fn test_minimum_distance_wins() {
        let candidates = vec![candidate(1, 100.0, 0.0), candidate(2, 10.0, 0.0)];
        let parent = closest_candidate(
            DeviceHandle::from_raw(9),
            &Point3D::new(0.0, 0.0, 0.0),
            &candidates,
        )
        .unwrap();
        assert_eq!(parent, DeviceHandle::from_raw(2));
    }

    #[test]
    fn test_tie_breaks_to_lowest_device_id() {
        // Two candidates at exactly the same distance from the child
        let candidates = vec![candidate(5, 50.0, 0.0), candidate(3, -50.0, 0.0)];
        let parent = closest_candidate(
            DeviceHandle::from_raw(9),
            &Point3D::new(0.0, 0.0, 0.0),
            &candidates,
        )
        .unwrap();
        assert_eq!(parent, DeviceHandle::from_raw(3));
    }

    #[test]
    fn test_empty_candidate_set_is_an_error() {
        let result = closest_candidate(
            DeviceHandle::from_raw(4),
            &Point3D::new(0.0, 0.0, 0.0),
            &[],
        );
        assert!(matches!(result, Err(AttachmentError::NoCandidates { .. })));
    }

    #[test]
    fn test_progressive_wiring_forms_a_chain() {
        // Base station at the origin, relays strung out along X. Each relay
        // is closest to the one before it, so a chain must form.
        let base = candidate(0, 0.0, 0.0);
        let relays = vec![candidate(1, 10.0, 0.0), candidate(2, 20.0, 0.0), candidate(3, 30.0, 0.0)];

        let edges = resolve_progressive(&relays, &[base]).unwrap();
        assert_eq!(
            edges,
            vec![
                (DeviceHandle::from_raw(1), DeviceHandle::from_raw(0)),
                (DeviceHandle::from_raw(2), DeviceHandle::from_raw(1)),
                (DeviceHandle::from_raw(3), DeviceHandle::from_raw(2)),
            ]
        );
    }

    #[test]
    fn test_progressive_wiring_processes_children_in_device_order() {
        // Children supplied out of order still wire lowest-id first
        let base = candidate(0, 0.0, 0.0);
        let relays = vec![candidate(2, 20.0, 0.0), candidate(1, 10.0, 0.0)];

        let edges = resolve_progressive(&relays, &[base]).unwrap();
        assert_eq!(edges[0].0, DeviceHandle::from_raw(1));
        assert_eq!(edges[1], (DeviceHandle::from_raw(2), DeviceHandle::from_raw(1)));
    }

    #[test]
    fn test_fixed_set_resolution_assigns_exactly_one_parent_each() {
        let candidates = vec![candidate(0, 0.0, 0.0), candidate(1, 100.0, 0.0)];
        let children = vec![candidate(10, 10.0, 0.0), candidate(11, 90.0, 0.0), candidate(12, 50.0, 1.0)];

        let edges = resolve_against(&children, &candidates).unwrap();
        assert_eq!(edges.len(), 3);
        assert_eq!(edges[0].1, DeviceHandle::from_raw(0));
        assert_eq!(edges[1].1, DeviceHandle::from_raw(1));
        // Equidistant in X but nudged off axis; still exactly one parent
        assert_eq!(edges[2].0, DeviceHandle::from_raw(12));
    }
}
