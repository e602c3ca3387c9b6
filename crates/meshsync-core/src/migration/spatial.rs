//! Zone assignment for migrated nodes.

use crate::decision::{DecisionProvider, Question};
use crate::error::{MeshError, Result};
use crate::geometry::GeoPoint;
use crate::store::Zone;
use tracing::{debug, warn};

/// Where a node ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneAssignment {
    Zone(i64),
    /// The node is not migrated.
    Discarded,
}

/// Assigns points to zones, asking the operator when zones overlap.
#[derive(Debug, Clone)]
pub struct SpatialLayerResolver {
    zones: Vec<Zone>,
    default_zone: Option<i64>,
}

enum ZoneAnswer {
    Zone(i64),
    UseDefault,
    Discard,
}

impl SpatialLayerResolver {
    pub fn new(zones: Vec<Zone>, default_zone: Option<i64>) -> Self {
        Self {
            zones,
            default_zone,
        }
    }

    /// Zones whose area contains `point`, in store order.
    pub fn candidates(&self, point: &GeoPoint) -> Vec<&Zone> {
        self.zones.iter().filter(|z| z.contains(point)).collect()
    }

    /// Resolve the zone of one node.
    ///
    /// `decisions` is consulted only when more than one zone contains the
    /// point. Closed operator input is [`MeshError::InputClosed`].
    pub fn resolve(
        &self,
        node_id: i64,
        node_name: &str,
        point: &GeoPoint,
        decisions: &mut dyn DecisionProvider,
    ) -> Result<ZoneAssignment> {
        let candidates = self.candidates(point);

        match candidates.as_slice() {
            [] => {
                debug!(node_id, "Node is outside every zone");
                Ok(self.use_default())
            }
            [zone] => Ok(ZoneAssignment::Zone(zone.id)),
            _ => {
                let question = Question::ChooseZone {
                    node_id,
                    node_name: node_name.to_string(),
                    candidates: candidates.iter().map(|z| (z.id, z.name.clone())).collect(),
                    default_zone: self.default_zone,
                };
                loop {
                    let answer = decisions.ask(&question).ok_or_else(|| {
                        MeshError::InputClosed {
                            question: question.subject(),
                        }
                    })?;
                    match parse_answer(&answer, &candidates) {
                        Some(ZoneAnswer::Zone(id)) => return Ok(ZoneAssignment::Zone(id)),
                        Some(ZoneAnswer::UseDefault) => return Ok(self.use_default()),
                        Some(ZoneAnswer::Discard) => return Ok(ZoneAssignment::Discarded),
                        None => warn!(node_id, answer = %answer, "Unrecognized zone answer"),
                    }
                }
            }
        }
    }

    fn use_default(&self) -> ZoneAssignment {
        self.default_zone
            .map(ZoneAssignment::Zone)
            .unwrap_or(ZoneAssignment::Discarded)
    }
}

fn parse_answer(answer: &str, candidates: &[&Zone]) -> Option<ZoneAnswer> {
    let answer = answer.trim().to_lowercase();
    match answer.as_str() {
        "" | "default" | "def" => Some(ZoneAnswer::UseDefault),
        "discard" | "dis" => Some(ZoneAnswer::Discard),
        other => other
            .parse::<i64>()
            .ok()
            .filter(|id| candidates.iter().any(|z| z.id == *id))
            .map(ZoneAnswer::Zone),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::ScriptedDecisions;
    use crate::geometry::Polygon;

    fn zone(id: i64, name: &str, area: Polygon) -> Zone {
        Zone {
            id,
            slug: name.to_lowercase(),
            name: name.to_string(),
            area: Some(area),
        }
    }

    fn overlapping() -> Vec<Zone> {
        vec![
            zone(1, "West", Polygon::from_bbox(0.0, 0.0, 2.0, 2.0)),
            zone(2, "East", Polygon::from_bbox(1.0, 0.0, 3.0, 2.0)),
        ]
    }

    #[test]
    fn test_single_zone_needs_no_decision() {
        let resolver = SpatialLayerResolver::new(overlapping(), None);
        let mut decisions = ScriptedDecisions::default();
        let point = GeoPoint::new(0.5, 1.0);
        let assignment = resolver.resolve(1, "n", &point, &mut decisions).unwrap();
        assert_eq!(assignment, ZoneAssignment::Zone(1));
        assert!(decisions.asked().is_empty());
    }

    #[test]
    fn test_no_zone_without_default_is_discarded() {
        let resolver = SpatialLayerResolver::new(overlapping(), None);
        let mut decisions = ScriptedDecisions::default();
        let point = GeoPoint::new(10.0, 10.0);
        let assignment = resolver.resolve(1, "n", &point, &mut decisions).unwrap();
        assert_eq!(assignment, ZoneAssignment::Discarded);
    }

    #[test]
    fn test_no_zone_with_default() {
        let resolver = SpatialLayerResolver::new(overlapping(), Some(2));
        let mut decisions = ScriptedDecisions::default();
        let point = GeoPoint::new(10.0, 10.0);
        let assignment = resolver.resolve(1, "n", &point, &mut decisions).unwrap();
        assert_eq!(assignment, ZoneAssignment::Zone(2));
        assert!(decisions.asked().is_empty());
    }

    #[test]
    fn test_overlap_reprompts_until_recognized() {
        let resolver = SpatialLayerResolver::new(overlapping(), None);
        let mut decisions = ScriptedDecisions::new(["maybe", "7", "2"]);
        let point = GeoPoint::new(1.5, 1.0);
        let assignment = resolver.resolve(1, "n", &point, &mut decisions).unwrap();
        assert_eq!(assignment, ZoneAssignment::Zone(2));
        assert_eq!(decisions.asked().len(), 3);
    }

    #[test]
    fn test_overlap_blank_means_default() {
        let resolver = SpatialLayerResolver::new(overlapping(), Some(1));
        let mut decisions = ScriptedDecisions::new([""]);
        let point = GeoPoint::new(1.5, 1.0);
        assert_eq!(
            resolver.resolve(1, "n", &point, &mut decisions).unwrap(),
            ZoneAssignment::Zone(1)
        );

        let resolver = SpatialLayerResolver::new(overlapping(), None);
        let mut decisions = ScriptedDecisions::new(["DEF"]);
        assert_eq!(
            resolver.resolve(1, "n", &point, &mut decisions).unwrap(),
            ZoneAssignment::Discarded
        );
    }

    #[test]
    fn test_overlap_discard() {
        let resolver = SpatialLayerResolver::new(overlapping(), Some(1));
        let mut decisions = ScriptedDecisions::new(["discard"]);
        let point = GeoPoint::new(1.5, 1.0);
        let assignment = resolver.resolve(1, "n", &point, &mut decisions).unwrap();
        assert_eq!(assignment, ZoneAssignment::Discarded);
    }

    #[test]
    fn test_overlap_with_closed_input_is_an_error() {
        let resolver = SpatialLayerResolver::new(overlapping(), Some(1));
        let mut decisions = ScriptedDecisions::new(["maybe"]).then_closed();
        let err = resolver
            .resolve(4, "n", &GeoPoint::new(1.5, 1.0), &mut decisions)
            .unwrap_err();
        assert!(matches!(
            err,
            MeshError::InputClosed { ref question } if question == "zone of node #4"
        ));
        assert_eq!(decisions.asked().len(), 2);
    }
}
