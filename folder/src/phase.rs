//! Phase classification of sensor grids.
//!
//! Each grid is routed by its light path:
//!
//! | Light path | Bucket | Key |
//! |------------|--------|-----|
//! | empty, or no known group | two-phase | `__static_apertures__` |
//! | holds a matrix-bearing group | three-phase | first matrix-bearing group |
//! | only direct-only groups | two-phase | first known group |
//!
//! Five-phase reuses the three-phase buckets. When only two-phase is
//! requested every group is routed as direct-only.

use serde::Serialize;

use crate::catalog::DynamicGroup;
use crate::grid::GridRecord;

/// Light-path key of grids and scenes that only see static apertures.
pub const STATIC_APERTURES: &str = "__static_apertures__";

/// Requested simulation method. Each phase includes the lower ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    /// Two-phase only.
    Two,
    /// Two- and three-phase.
    Three,
    /// Two-, three- and five-phase.
    Five,
}

impl Phase {
    /// Maps `2`, `3` or `5` to a phase.
    pub fn from_number(phase: u8) -> Option<Self> {
        match phase {
            2 => Some(Self::Two),
            3 => Some(Self::Three),
            5 => Some(Self::Five),
            _ => None,
        }
    }

    /// Returns true if matrix-bearing groups get their own buckets.
    pub fn uses_matrices(self) -> bool {
        self >= Self::Three
    }

    /// Returns true if five-phase buckets are requested.
    pub fn uses_direct_matrices(self) -> bool {
        self == Self::Five
    }
}

/// Where a single grid is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment<'a> {
    /// Two-phase bucket with the given key.
    TwoPhase(&'a str),
    /// Three-phase (and five-phase) bucket with the given key.
    ThreePhase(&'a str),
}

/// Grids sharing one light-path key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridBucket {
    /// Light-path key: a group identifier or [`STATIC_APERTURES`].
    pub identifier: String,
    /// Grids routed to this key, in inventory order.
    #[serde(rename = "grid")]
    pub grids: Vec<GridRecord>,
}

/// Grid buckets per phase. Phases that were not requested are `None` and are
/// left out of the serialized mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridMapping {
    /// Two-phase buckets.
    pub two_phase: Vec<GridBucket>,
    /// Three-phase buckets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub three_phase: Option<Vec<GridBucket>>,
    /// Five-phase buckets, identical to the three-phase ones.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub five_phase: Option<Vec<GridBucket>>,
}

/// Routes one light path.
///
/// The outermost matrix-bearing group wins when a path holds several.
pub fn assign<'a>(light_path: &'a [String], groups: &[DynamicGroup], phase: Phase) -> Assignment<'a> {
    let find = |id: &str| groups.iter().find(|g| g.identifier == id);

    if phase.uses_matrices() {
        let matrix_group = light_path
            .iter()
            .find(|id| find(id.as_str()).is_some_and(DynamicGroup::is_matrix_bearing));
        if let Some(id) = matrix_group {
            return Assignment::ThreePhase(id);
        }
    }

    match light_path.iter().find(|id| find(id.as_str()).is_some()) {
        Some(id) => Assignment::TwoPhase(id),
        None => Assignment::TwoPhase(STATIC_APERTURES),
    }
}

/// Buckets grids by phase and light-path key.
///
/// Keys keep the order in which grids first reach them. With
/// `exclude_static` the static bucket is dropped even when grids map to it.
pub fn classify(
    grids: &[GridRecord],
    groups: &[DynamicGroup],
    phase: Phase,
    exclude_static: bool,
) -> GridMapping {
    let mut two_phase: Vec<GridBucket> = Vec::new();
    let mut three_phase: Vec<GridBucket> = Vec::new();

    for grid in grids {
        let (buckets, key) = match assign(&grid.light_path, groups, phase) {
            Assignment::TwoPhase(key) => {
                if exclude_static && key == STATIC_APERTURES {
                    continue;
                }
                (&mut two_phase, key)
            }
            Assignment::ThreePhase(key) => (&mut three_phase, key),
        };
        match buckets.iter_mut().find(|b| b.identifier == key) {
            Some(bucket) => bucket.grids.push(grid.clone()),
            None => buckets.push(GridBucket {
                identifier: key.to_string(),
                grids: vec![grid.clone()],
            }),
        }
    }

    GridMapping {
        two_phase,
        five_phase: phase.uses_direct_matrices().then(|| three_phase.clone()),
        three_phase: phase.uses_matrices().then_some(three_phase),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use crate::catalog::{GroupKind, State};

    pub(crate) fn group(id: &str, states: &[(&str, bool)]) -> DynamicGroup {
        DynamicGroup {
            identifier: id.to_string(),
            kind: GroupKind::Aperture,
            states: states
                .iter()
                .map(|(state, matrix)| State {
                    identifier: state.to_string(),
                    default_file: format!("{id}..default..{state}.rad"),
                    direct_file: format!("{id}..direct..{state}.rad"),
                    black_file: Some(format!("{id}..black.rad")),
                    transmittance_matrix_file: matrix.then(|| format!("{state}.xml")),
                    view_matrix_file: matrix.then(|| format!("{id}..mtx.rad")),
                    daylight_matrix_file: None,
                })
                .collect(),
        }
    }

    fn grid(id: &str, path: &[&str]) -> GridRecord {
        GridRecord::new(id, 10, path.iter().map(|s| s.to_string()).collect())
    }

    fn keys(buckets: &[GridBucket]) -> Vec<&str> {
        buckets.iter().map(|b| b.identifier.as_str()).collect()
    }

    fn catalog() -> Vec<DynamicGroup> {
        vec![
            group("south_window", &[("clear", true), ("diffuse", true)]),
            group("north_window", &[("open", false), ("closed", false)]),
            group("skylight", &[("clear", true)]),
        ]
    }

    fn inventory() -> Vec<GridRecord> {
        vec![
            grid("office", &["south_window"]),
            grid("hall", &["north_window"]),
            grid("core", &[]),
            grid("atrium", &["north_window", "skylight", "south_window"]),
            grid("lobby", &["__static_apertures__"]),
            grid("studio", &["south_window"]),
        ]
    }

    #[test]
    fn matrix_groups_route_to_three_phase() {
        let mapping = classify(&inventory(), &catalog(), Phase::Three, false);
        assert_eq!(keys(&mapping.two_phase), ["north_window", STATIC_APERTURES]);
        let three = mapping.three_phase.unwrap();
        assert_eq!(keys(&three), ["south_window", "skylight"]);
        let south: Vec<_> = three[0].grids.iter().map(|g| g.identifier.as_str()).collect();
        assert_eq!(south, ["office", "studio"]);
        assert!(mapping.five_phase.is_none());
    }

    #[test]
    fn first_matrix_group_on_path_wins() {
        let groups = catalog();
        let path: Vec<String> = ["north_window", "skylight", "south_window"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            assign(&path, &groups, Phase::Five),
            Assignment::ThreePhase("skylight")
        );
        assert_eq!(
            assign(&path, &groups, Phase::Two),
            Assignment::TwoPhase("north_window")
        );
    }

    #[test]
    fn two_phase_request_omits_matrix_buckets() {
        let mapping = classify(&inventory(), &catalog(), Phase::Two, false);
        assert!(mapping.three_phase.is_none());
        assert!(mapping.five_phase.is_none());
        assert_eq!(
            keys(&mapping.two_phase),
            ["south_window", "north_window", STATIC_APERTURES]
        );
        let json = serde_json::to_value(&mapping).unwrap();
        assert!(json.get("three_phase").is_none());
        assert!(json.get("five_phase").is_none());
    }

    #[test]
    fn five_phase_matches_three_phase() {
        let mapping = classify(&inventory(), &catalog(), Phase::Five, false);
        assert_eq!(mapping.three_phase, mapping.five_phase);
    }

    #[test]
    fn every_grid_lands_in_exactly_one_bucket() {
        let grids = inventory();
        let mapping = classify(&grids, &catalog(), Phase::Five, false);
        let three = mapping.three_phase.unwrap_or_default();
        for grid in &grids {
            let hits = mapping
                .two_phase
                .iter()
                .chain(three.iter())
                .filter(|b| b.grids.iter().any(|g| g.identifier == grid.identifier))
                .count();
            assert_eq!(hits, 1, "{} is in {hits} buckets", grid.identifier);
        }
    }

    #[test]
    fn static_bucket_can_be_excluded() {
        let mapping = classify(&inventory(), &catalog(), Phase::Three, true);
        assert_eq!(keys(&mapping.two_phase), ["north_window"]);
    }

    #[test]
    fn static_bucket_only_exists_when_used() {
        let grids = vec![grid("office", &["south_window"])];
        let mapping = classify(&grids, &catalog(), Phase::Three, false);
        assert!(mapping.two_phase.is_empty());
    }
}
