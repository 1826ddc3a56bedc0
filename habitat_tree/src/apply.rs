// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Resolving patches into per-cell writes.

use habitat_geometry::Coverage;
use habitat_patch::{
    Channel, HabitatDomainSource, Patch, PatchPriorityQueue, PatchSource, ResourceSource,
};
use tracing::{debug, trace, warn};

use crate::element::{MoistureInfo, ObstacleFlag, Resource};
use crate::error::TreeError;
use crate::report::ApplicationReport;
use crate::tree::TerrainTree;
use crate::types::{CellId, MoistureSourceId};

/// A patch payload resolved against the tree's registries.
enum Payload<'a> {
    Moisture(MoistureSourceId),
    Resource {
        slot: usize,
        source: &'a ResourceSource,
    },
    Obstacle(bool),
    Habitat(&'a HabitatDomainSource),
}

impl TerrainTree {
    /// Apply one patch from the root down.
    ///
    /// At each cell the patch's coverage of the cell's effective area decides:
    /// `Null` stops, a leaf with any other coverage is written, a branch with
    /// `Full` coverage pushes the payload to every leaf below, and a branch
    /// with `Over50Percent` or `Partial` coverage recurses. Every write obeys
    /// the priority rule, and branches are re-aggregated on the way back up.
    ///
    /// Moisture patches register their source even if no cell accepts it.
    /// Resource patches register their species on first use.
    pub fn apply_patch(&mut self, patch: &Patch) -> ApplicationReport {
        let payload = match patch.source() {
            PatchSource::Moisture(source) => {
                Payload::Moisture(self.register_moisture_source(source.clone()))
            }
            PatchSource::Resource(source) => Payload::Resource {
                slot: self.register_resource_species(source.resource_species),
                source,
            },
            PatchSource::Obstacle(source) => Payload::Obstacle(source.obstacle),
            PatchSource::HabitatDomain(source) => Payload::Habitat(source),
        };
        let mut report = ApplicationReport::new(patch.channel(), patch.priority());
        let root = self.root;
        self.apply_at(root, patch, &payload, &mut report);
        if report.refused > 0 {
            warn!(
                refused = report.refused,
                priority = patch.priority(),
                "resource writes refused on obstacle cells"
            );
        }
        debug!(
            channel = %patch.channel(),
            priority = patch.priority(),
            shape = patch.shape().description(),
            written = report.written.len(),
            reached = report.leaves_reached,
            "applied patch"
        );
        report
    }

    /// Apply an obstacle patch.
    pub fn apply_obstacle_patch(&mut self, patch: &Patch) -> Result<ApplicationReport, TreeError> {
        self.apply_channel(Channel::Obstacle, patch)
    }

    /// Apply a moisture patch.
    pub fn apply_moisture_patch(&mut self, patch: &Patch) -> Result<ApplicationReport, TreeError> {
        self.apply_channel(Channel::Moisture, patch)
    }

    /// Apply a resource patch.
    pub fn apply_resource_patch(&mut self, patch: &Patch) -> Result<ApplicationReport, TreeError> {
        self.apply_channel(Channel::Resource, patch)
    }

    /// Apply a habitat-domain patch.
    pub fn apply_habitat_domain_patch(
        &mut self,
        patch: &Patch,
    ) -> Result<ApplicationReport, TreeError> {
        self.apply_channel(Channel::HabitatDomain, patch)
    }

    /// Drain `queue` lowest priority first, applying each patch.
    pub fn apply_queue(&mut self, queue: PatchPriorityQueue) -> Vec<ApplicationReport> {
        queue
            .into_ascending()
            .iter()
            .map(|patch| self.apply_patch(patch))
            .collect()
    }

    fn apply_channel(
        &mut self,
        expected: Channel,
        patch: &Patch,
    ) -> Result<ApplicationReport, TreeError> {
        if patch.channel() != expected {
            return Err(TreeError::ChannelMismatch {
                expected,
                found: patch.channel(),
            });
        }
        Ok(self.apply_patch(patch))
    }

    fn apply_at(
        &mut self,
        id: CellId,
        patch: &Patch,
        payload: &Payload<'_>,
        report: &mut ApplicationReport,
    ) {
        let (coverage, children) = {
            let cell = self.node(id);
            (
                patch.check_coverage(cell.effective_area),
                cell.children().copied(),
            )
        };
        match (coverage, children) {
            (Coverage::Null, _) => {}
            (_, None) => self.write_leaf(id, patch, payload, true, report),
            (Coverage::Full, Some(_)) => self.push_down(id, patch, payload, report),
            (Coverage::Over50Percent | Coverage::Partial, Some(children)) => {
                for child in children {
                    self.apply_at(child, patch, payload, report);
                }
                self.refresh_branch(id, Some(patch.channel()));
            }
        }
    }

    fn push_down(
        &mut self,
        id: CellId,
        patch: &Patch,
        payload: &Payload<'_>,
        report: &mut ApplicationReport,
    ) {
        match self.node(id).children().copied() {
            None => self.write_leaf(id, patch, payload, false, report),
            Some(children) => {
                for child in children {
                    self.push_down(child, patch, payload, report);
                }
                self.refresh_branch(id, Some(patch.channel()));
            }
        }
    }

    fn write_leaf(
        &mut self,
        id: CellId,
        patch: &Patch,
        payload: &Payload<'_>,
        direct: bool,
        report: &mut ApplicationReport,
    ) {
        report.leaves_reached += 1;
        let priority = patch.priority();
        let layout = self.layout;
        let cell = self.node_mut(id);
        let coord = cell.coord;
        let written = match payload {
            Payload::Obstacle(obstacle) => cell
                .obstacle
                .try_apply(ObstacleFlag::leaf(*obstacle), priority),
            Payload::Moisture(source) => {
                let info = if direct {
                    MoistureInfo::Source(*source)
                } else {
                    MoistureInfo::Inherited(*source)
                };
                cell.moisture.try_apply(info, priority)
            }
            Payload::Habitat(source) => cell
                .habitat
                .try_update(priority, |status| status.replace_with(source)),
            Payload::Resource { slot, source } => {
                if cell.obstacle.value().obstacle {
                    report.refused += 1;
                    trace!(%coord, "resource write refused on obstacle");
                    false
                } else {
                    let size = layout.cell_size(coord.depth());
                    let intensity = patch.shape().intensity_at(layout.cell_center(&coord));
                    let resource = Resource::from_source(source, size * size, intensity);
                    cell.leaf_mut()
                        .and_then(|leaf| leaf.resources.get_mut(*slot))
                        .is_some_and(|element| element.try_apply(resource, priority))
                }
            }
        };
        if written {
            trace!(%coord, channel = %patch.channel(), priority, "wrote cell");
            report.written.push(coord);
            report.dirty_rects.push(cell.effective_area);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::{CellCoord, TreeLayout};
    use habitat_patch::{
        AnimalSpeciesId, CycleDynamics, HabitatDomainEntry, Instar, MoistureSource,
        ObstacleSource, PatchShape, ResourceSpeciesId, WorldFrame,
    };
    use kurbo::Point;

    fn grid(cells: u32, depth: u32) -> TerrainTree {
        let mut tree = TerrainTree::new(TreeLayout::new(cells, 1.0).expect("power of two"));
        tree.subdivide_to(depth).expect("valid depth");
        tree
    }

    fn cube(min: (f64, f64), max: (f64, f64), priority: usize, source: PatchSource) -> Patch {
        Patch::new(
            PatchShape::cubic(Point::new(min.0, min.1), Point::new(max.0, max.1)).expect("ordered"),
            priority,
            source,
        )
    }

    fn sphere(center: (f64, f64), radius: f64, priority: usize, source: PatchSource) -> Patch {
        Patch::new(
            PatchShape::spherical(Point::new(center.0, center.1), radius).expect("positive"),
            priority,
            source,
        )
    }

    fn obstacle(flag: bool) -> PatchSource {
        PatchSource::Obstacle(ObstacleSource { obstacle: flag })
    }

    fn food(density: f64) -> PatchSource {
        PatchSource::Resource(ResourceSource::new(ResourceSpeciesId(0), density))
    }

    fn leaf_capacity(tree: &TerrainTree, x: u32, y: u32) -> f64 {
        let id = tree.locate(CellCoord::new([x, y], 3)).expect("in map");
        tree.cell(id)
            .expect("alive")
            .resource(ResourceSpeciesId(0))
            .expect("registered")
            .capacity
    }

    #[test]
    fn cube_over_sphere_worked_example() {
        let high = cube((0.0, 0.0), (4.0, 4.0), 5, food(1.0));
        let low = sphere((4.0, 4.0), 2.0, 3, food(10.0));
        for order in [[&high, &low], [&low, &high]] {
            let mut tree = grid(8, 3);
            for patch in order {
                tree.apply_patch(patch);
            }
            // Inside the cube the higher priority wins wherever the sphere overlaps.
            assert_eq!(leaf_capacity(&tree, 3, 3), 1.0);
            assert_eq!(leaf_capacity(&tree, 0, 0), 1.0);
            // Sphere minus cube carries the sphere payload.
            assert_eq!(leaf_capacity(&tree, 4, 4), 10.0);
            assert_eq!(leaf_capacity(&tree, 5, 3), 10.0);
            // Untouched.
            assert_eq!(leaf_capacity(&tree, 7, 7), 0.0);
            assert_eq!(leaf_capacity(&tree, 0, 7), 0.0);
        }
    }

    #[test]
    fn obstacle_cube_and_sphere() {
        let mut tree = grid(8, 3);
        tree.apply_patch(&cube((0.0, 0.0), (4.0, 4.0), 5, obstacle(true)));
        let report = tree.apply_patch(&sphere((2.0, 2.0), 2.0, 3, obstacle(false)));
        // The sphere lies inside the cube, so nothing is overwritten.
        assert!(report.is_empty());
        assert!(report.leaves_reached > 0);
        for x in 0..8 {
            for y in 0..8 {
                let id = tree.locate(CellCoord::new([x, y], 3)).expect("in map");
                let cell = tree.cell(id).expect("alive");
                let inside = x < 4 && y < 4;
                assert_eq!(cell.is_obstacle(), inside, "cell ({x}, {y})");
                let priority = if inside { 5 } else { 0 };
                assert_eq!(cell.obstacle().patch_priority(), priority);
            }
        }
        let quadrant = tree.locate(CellCoord::new([0, 0], 1)).expect("in map");
        let quadrant = tree.cell(quadrant).expect("alive");
        assert!(quadrant.obstacle().value().full_obstacle);
        assert_eq!(quadrant.obstacle().patch_priority(), 5);
        let root = tree.cell(tree.root()).expect("alive");
        assert!(!root.is_obstacle());
        assert!(!root.obstacle().value().full_obstacle);
    }

    #[test]
    fn partial_coverage_writes_coarse_leaf() {
        let mut tree = grid(8, 1);
        let report = tree.apply_patch(&sphere((1.0, 1.0), 0.5, 2, obstacle(true)));
        assert_eq!(report.written, [CellCoord::new([0, 0], 1)]);
        assert_eq!(report.union_rect(), report.dirty_rects.first().copied());
    }

    #[test]
    fn homogeneous_moisture_is_pushed_down() {
        let mut tree = grid(4, 2);
        let source = MoistureSource {
            temperature: CycleDynamics::constant(20.0),
            relative_humidity: CycleDynamics::constant(0.5),
            max_resource_capacity_density: 3.0,
            in_enemy_free_space: false,
            in_competitor_free_space: false,
        };
        let frame = WorldFrame::new(4.0, 4.0);
        let patch = Patch::new(PatchShape::homogeneous(&frame), 1, PatchSource::Moisture(source));
        let report = tree.apply_moisture_patch(&patch).expect("moisture patch");
        assert_eq!(report.written.len(), 16);
        let leaf = tree.leaves().next().expect("has leaves");
        let info = *tree.cell(leaf).expect("alive").moisture().value();
        assert!(matches!(info, MoistureInfo::Inherited(_)));
        let root = *tree.cell(tree.root()).expect("alive").moisture().value();
        assert_eq!(root.source_id(), info.source_id());
    }

    #[test]
    fn direct_leaf_hit_is_a_source() {
        let mut tree = grid(4, 2);
        let source = MoistureSource {
            temperature: CycleDynamics::constant(10.0),
            relative_humidity: CycleDynamics::constant(0.1),
            max_resource_capacity_density: 1.0,
            in_enemy_free_space: true,
            in_competitor_free_space: false,
        };
        let patch = sphere((0.5, 0.5), 0.4, 1, PatchSource::Moisture(source));
        tree.apply_patch(&patch);
        let leaf = tree.locate(CellCoord::new([0, 0], 2)).expect("in map");
        let info = *tree.cell(leaf).expect("alive").moisture().value();
        assert!(matches!(info, MoistureInfo::Source(_)));
        let root = *tree.cell(tree.root()).expect("alive").moisture().value();
        assert_eq!(root, MoistureInfo::Mixed);
    }

    #[test]
    fn resource_refused_on_obstacles() {
        let mut tree = grid(4, 2);
        tree.apply_patch(&cube((0.0, 0.0), (2.0, 2.0), 9, obstacle(true)));
        let frame = WorldFrame::new(4.0, 4.0);
        let report = tree.apply_patch(&Patch::new(PatchShape::homogeneous(&frame), 1, food(2.0)));
        assert_eq!(report.refused, 4);
        assert_eq!(report.written.len(), 12);
        let root = tree.cell(tree.root()).expect("alive");
        let total = root.resource(ResourceSpeciesId(0)).expect("registered");
        assert_eq!(total.capacity, 24.0);
        assert_eq!(total.biomass, 24.0);
    }

    #[test]
    fn habitat_patch_edits_listed_instars() {
        let mut tree = grid(4, 1);
        let species = AnimalSpeciesId(1);
        tree.register_animal_species(species, vec![1, 1])
            .expect("valid depths");
        let source = HabitatDomainSource {
            entries: vec![HabitatDomainEntry {
                species,
                instars: vec![Instar(0)],
                inhabitable: false,
            }],
        };
        let patch = cube((0.0, 0.0), (4.0, 2.0), 2, PatchSource::HabitatDomain(source));
        tree.apply_habitat_domain_patch(&patch)
            .expect("habitat patch");
        let low = tree.locate(CellCoord::new([1, 0], 1)).expect("in map");
        let status = tree.cell(low).expect("alive").habitat_domain().value().clone();
        assert!(!status.is_inhabitable(species, Instar(0)));
        assert!(status.is_inhabitable(species, Instar(1)));
        let root = tree.cell(tree.root()).expect("alive");
        // Two habitable children out of four is not a majority.
        assert!(!root.habitat_domain().value().is_inhabitable(species, Instar(0)));
        assert!(root.habitat_domain().value().is_inhabitable(species, Instar(1)));
        assert_eq!(root.habitat_domain().patch_priority(), 2);
    }

    #[test]
    fn typed_entry_points_check_channel() {
        let mut tree = grid(4, 0);
        let patch = sphere((1.0, 1.0), 1.0, 1, obstacle(true));
        assert!(matches!(
            tree.apply_resource_patch(&patch),
            Err(TreeError::ChannelMismatch {
                expected: Channel::Resource,
                found: Channel::Obstacle
            })
        ));
        assert!(tree.apply_obstacle_patch(&patch).is_ok());
    }

    #[test]
    fn queue_applies_in_ascending_priority() {
        let mut tree = grid(4, 2);
        let queue: PatchPriorityQueue = [
            cube((0.0, 0.0), (4.0, 4.0), 7, obstacle(false)),
            cube((0.0, 0.0), (4.0, 4.0), 2, obstacle(true)),
        ]
        .into_iter()
        .collect();
        let reports = tree.apply_queue(queue);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].priority, 2);
        assert_eq!(reports[1].written.len(), 16);
        let root = tree.cell(tree.root()).expect("alive");
        assert!(!root.is_obstacle());
        assert_eq!(root.obstacle().patch_priority(), 7);
    }

    #[test]
    fn gaussian_scales_capacity() {
        let mut tree = grid(8, 3);
        let shape = PatchShape::gaussian(Point::new(4.0, 4.0), 1.0, 3.0).expect("valid");
        tree.apply_patch(&Patch::new(shape, 1, food(1.0)));
        let near = leaf_capacity(&tree, 4, 4);
        let far = leaf_capacity(&tree, 6, 4);
        assert!(near > far, "{near} should exceed {far}");
        assert!(near <= 1.0);
    }
}
