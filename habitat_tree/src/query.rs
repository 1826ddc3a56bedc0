// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Range queries: radius search for edibles, neighbour cells, animals per cell.

use hashbrown::HashSet;
use habitat_geometry::{
    Coverage, Ring, box_coverage_percent, make_sphere, sphere_coverage_of_box, within_sphere,
};
use habitat_patch::{AnimalSpeciesId, Instar, ResourceSpeciesId};
use kurbo::Point;
use smallvec::SmallVec;

use crate::coord::{CellCoord, DIMENSIONS};
use crate::error::TreeError;
use crate::tree::TerrainTree;
use crate::types::{AnimalId, AnimalKey, CellId, Genders, LifeStages};

/// Filter over animal classifications.
///
/// Each dimension left unset matches every value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchParams {
    life_stages: Option<LifeStages>,
    species: Option<SmallVec<[AnimalSpeciesId; 4]>>,
    instars: Option<SmallVec<[Instar; 4]>>,
    genders: Option<Genders>,
}

impl SearchParams {
    /// Matches every animal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to these life stages.
    pub fn with_life_stages(mut self, stages: LifeStages) -> Self {
        self.life_stages = Some(stages);
        self
    }

    /// Restrict to these species.
    pub fn with_species(mut self, species: impl IntoIterator<Item = AnimalSpeciesId>) -> Self {
        self.species = Some(species.into_iter().collect());
        self
    }

    /// Restrict to these instars.
    pub fn with_instars(mut self, instars: impl IntoIterator<Item = Instar>) -> Self {
        self.instars = Some(instars.into_iter().collect());
        self
    }

    /// Restrict to these genders.
    pub fn with_genders(mut self, genders: Genders) -> Self {
        self.genders = Some(genders);
        self
    }

    /// Check if a classification satisfies this filter.
    pub fn matches(&self, key: &AnimalKey) -> bool {
        self.life_stages
            .is_none_or(|stages| stages.contains(key.life_stage.flag()))
            && self
                .species
                .as_ref()
                .is_none_or(|species| species.contains(&key.species))
            && self
                .instars
                .as_ref()
                .is_none_or(|instars| instars.contains(&key.instar))
            && self
                .genders
                .is_none_or(|genders| genders.contains(key.gender.flag()))
    }
}

/// What a radius search should collect.
///
/// The default collects nothing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EdibleSearchParams {
    /// Animals to collect; `None` skips animals.
    pub animals: Option<SearchParams>,
    /// Resource species to collect.
    pub resources: SmallVec<[ResourceSpeciesId; 4]>,
}

impl EdibleSearchParams {
    /// Collect nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect animals matching `params`.
    pub fn with_animals(mut self, params: SearchParams) -> Self {
        self.animals = Some(params);
        self
    }

    /// Collect these resource species.
    pub fn with_resources(mut self, species: impl IntoIterator<Item = ResourceSpeciesId>) -> Self {
        self.resources.extend(species);
        self
    }
}

/// Resource biomass of one leaf inside the search circle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResourceHit {
    /// Leaf holding the biomass.
    pub cell: CellId,
    /// Species.
    pub species: ResourceSpeciesId,
    /// Share of the leaf inside the circle.
    pub coverage: f64,
    /// Leaf biomass scaled by `coverage`.
    pub biomass_in_range: f64,
    /// Edible biomass scaled by `coverage`.
    pub edible_in_range: f64,
}

/// Results of [`TerrainTree::get_edibles_on_radius`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EdibleSearchResult {
    /// Resource hits in depth-first leaf order.
    pub resources: Vec<ResourceHit>,
    /// Animals within the radius.
    pub animals: Vec<AnimalId>,
}

struct RadiusSearch<'a> {
    center: Point,
    radius: f64,
    sphere: Ring,
    slots: SmallVec<[(ResourceSpeciesId, usize); 4]>,
    params: &'a EdibleSearchParams,
}

impl TerrainTree {
    /// Animals and resource biomass within `radius` of `center`.
    ///
    /// Cells are classified exactly against the circle; obstacle leaves and
    /// branches made entirely of obstacles are skipped. Animals are filtered
    /// by exact distance. Resource biomass is scaled by the share of each
    /// partially covered leaf inside the circle polygon. A non-positive
    /// radius finds nothing.
    pub fn get_edibles_on_radius(
        &self,
        center: Point,
        radius: f64,
        params: &EdibleSearchParams,
    ) -> EdibleSearchResult {
        let mut out = EdibleSearchResult::default();
        if !(radius > 0.0 && radius.is_finite()) {
            return out;
        }
        let search = RadiusSearch {
            center,
            radius,
            sphere: make_sphere(center, radius),
            slots: params
                .resources
                .iter()
                .filter_map(|&species| Some((species, self.resource_slot(species)?)))
                .collect(),
            params,
        };
        self.collect_edibles(self.root, &search, Coverage::Partial, &mut out);
        out
    }

    fn collect_edibles(
        &self,
        id: CellId,
        search: &RadiusSearch<'_>,
        parent: Coverage,
        out: &mut EdibleSearchResult,
    ) {
        let cell = self.node(id);
        if cell.is_impassable() {
            return;
        }
        let bounds = self.nominal_box(id);
        let coverage = if parent == Coverage::Full {
            Coverage::Full
        } else {
            sphere_coverage_of_box(bounds, search.center, search.radius)
        };
        if coverage == Coverage::Null {
            return;
        }
        let Some(leaf) = cell.leaf() else {
            for &child in cell.children().into_iter().flatten() {
                self.collect_edibles(child, search, coverage, out);
            }
            return;
        };

        if let Some(animal_params) = &search.params.animals {
            out.animals.extend(
                leaf.occupancy
                    .matching(animal_params)
                    .map(|(_, animal)| animal)
                    .filter(|animal| {
                        self.animals.get(animal).is_some_and(|record| {
                            within_sphere(record.position, search.center, search.radius)
                        })
                    }),
            );
        }
        if search.slots.is_empty() {
            return;
        }
        let fraction = match coverage {
            Coverage::Full => 1.0,
            _ => box_coverage_percent(bounds, &search.sphere),
        };
        if fraction <= 0.0 {
            return;
        }
        for &(species, slot) in &search.slots {
            let Some(resource) = leaf.resources.get(slot).map(|r| r.value()) else {
                continue;
            };
            if resource.biomass() <= 0.0 {
                continue;
            }
            out.resources.push(ResourceHit {
                cell: id,
                species,
                coverage: fraction,
                biomass_in_range: resource.biomass() * fraction,
                edible_in_range: resource.edible_biomass() * fraction,
            });
        }
    }

    /// Cells within `distance` steps of `source` along every axis.
    ///
    /// Candidates are generated at the source's depth, clipped to the map,
    /// and resolved with [`TerrainTree::get_cell`]; where the tree is
    /// coarser several candidates resolve to one leaf, which is reported
    /// once. The source itself is never reported.
    pub fn get_manhattan_neighbours(
        &self,
        source: CellId,
        distance: u32,
    ) -> Result<Vec<CellId>, TreeError> {
        if distance == 0 {
            return Err(TreeError::InvalidSearchDistance);
        }
        let coord = self.checked(source)?.coord;
        let depth = coord.depth();
        let axis_size = i64::from(self.layout.axis_size(depth));
        let reach = i64::from(distance).min(axis_size);
        let span = 2 * reach + 1;
        let base = coord.axis().map(i64::from);

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let total = (0..DIMENSIONS).fold(1_i64, |acc, _| acc.saturating_mul(span));
        'candidates: for n in 0..total {
            let mut rest = n;
            let mut axis = [0_u32; DIMENSIONS];
            for (i, slot) in axis.iter_mut().enumerate() {
                let value = base[i] + rest % span - reach;
                rest /= span;
                if !(0..axis_size).contains(&value) {
                    continue 'candidates;
                }
                *slot = u32::try_from(value).unwrap_or(u32::MAX);
            }
            let target = CellCoord::new(axis, depth);
            if target == coord {
                continue;
            }
            let found = self.get_cell(source, target)?;
            if found != source && seen.insert(found) {
                out.push(found);
            }
        }
        Ok(out)
    }

    /// Animals filed in `cell` or below that match `params`.
    pub fn animals_in_cell(
        &self,
        cell: CellId,
        params: &SearchParams,
    ) -> Result<Vec<AnimalId>, TreeError> {
        self.checked(cell)?;
        Ok(self
            .leaves_under(cell)
            .into_iter()
            .filter_map(|leaf| self.node(leaf).leaf())
            .flat_map(|leaf| leaf.occupancy.matching(params).map(|(_, id)| id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animal::NewAnimal;
    use crate::coord::TreeLayout;
    use crate::types::{Gender, LifeStage};
    use habitat_patch::{
        ObstacleSource, Patch, PatchShape, PatchSource, ResourceSource, WorldFrame,
    };

    const BEETLE: AnimalSpeciesId = AnimalSpeciesId(0);
    const SPIDER: AnimalSpeciesId = AnimalSpeciesId(1);

    fn world() -> TerrainTree {
        let mut tree = TerrainTree::new(TreeLayout::new(8, 1.0).expect("power of two"));
        tree.subdivide_to(3).expect("valid depth");
        tree.register_animal_species(BEETLE, vec![3, 3])
            .expect("valid depths");
        tree.register_animal_species(SPIDER, vec![3])
            .expect("valid depths");
        tree
    }

    fn animal(tree: &mut TerrainTree, species: AnimalSpeciesId, x: f64, y: f64) -> AnimalId {
        tree.insert_animal(NewAnimal {
            key: AnimalKey::active(species, Instar(0), Gender::Female),
            position: Point::new(x, y),
        })
        .expect("inserted")
    }

    #[test]
    fn search_params_filter_each_dimension() {
        let key = AnimalKey::active(BEETLE, Instar(1), Gender::Male);
        assert!(SearchParams::new().matches(&key));
        assert!(SearchParams::new().with_species([BEETLE]).matches(&key));
        assert!(!SearchParams::new().with_species([SPIDER]).matches(&key));
        assert!(!SearchParams::new().with_instars([Instar(0)]).matches(&key));
        assert!(
            SearchParams::new()
                .with_life_stages(LifeStages::ACTIVE | LifeStages::PUPA)
                .matches(&key)
        );
        assert!(
            !SearchParams::new()
                .with_life_stages(LifeStage::Diapause.flag())
                .matches(&key)
        );
        assert!(!SearchParams::new().with_genders(Genders::FEMALE).matches(&key));
    }

    #[test]
    fn radius_finds_animals_by_exact_distance() {
        let mut tree = world();
        let near = animal(&mut tree, BEETLE, 4.5, 4.5);
        let edge = animal(&mut tree, BEETLE, 6.4, 4.0);
        let _far = animal(&mut tree, BEETLE, 7.5, 7.5);
        let spider = animal(&mut tree, SPIDER, 4.2, 3.8);
        let params = EdibleSearchParams::new().with_animals(SearchParams::new().with_species([BEETLE]));
        let found = tree.get_edibles_on_radius(Point::new(4.0, 4.0), 2.5, &params);
        let mut animals = found.animals.clone();
        animals.sort();
        assert_eq!(animals, [near, edge]);
        assert!(found.resources.is_empty());

        let everyone = EdibleSearchParams::new().with_animals(SearchParams::new());
        let found = tree.get_edibles_on_radius(Point::new(4.0, 4.0), 0.5, &everyone);
        assert_eq!(found.animals, [spider]);
    }

    #[test]
    fn radius_scales_resource_biomass() {
        let mut tree = world();
        let species = ResourceSpeciesId(2);
        tree.apply_patch(&Patch::new(
            PatchShape::homogeneous(&WorldFrame::new(8.0, 8.0)),
            1,
            PatchSource::Resource(ResourceSource::new(species, 1.0)),
        ));
        let params = EdibleSearchParams::new().with_resources([species]);
        let found = tree.get_edibles_on_radius(Point::new(4.0, 4.0), 2.0, &params);
        let total: f64 = found.resources.iter().map(|hit| hit.biomass_in_range).sum();
        // The circle polygon has slightly less area than the circle.
        let circle = core::f64::consts::PI * 4.0;
        assert!((total - circle).abs() < 0.1, "total {total}");
        assert!(found.resources.iter().all(|hit| hit.coverage <= 1.0));
        assert!(found.resources.iter().any(|hit| hit.coverage == 1.0));
    }

    #[test]
    fn radius_skips_obstacles_and_bad_radius() {
        let mut tree = world();
        let hidden = animal(&mut tree, BEETLE, 1.5, 1.5);
        tree.apply_patch(&Patch::new(
            PatchShape::cubic(Point::new(0.0, 0.0), Point::new(4.0, 4.0)).expect("ordered"),
            1,
            PatchSource::Obstacle(ObstacleSource::default()),
        ));
        let params = EdibleSearchParams::new().with_animals(SearchParams::new());
        let found = tree.get_edibles_on_radius(Point::new(1.5, 1.5), 1.0, &params);
        assert!(!found.animals.contains(&hidden));
        assert_eq!(
            tree.get_edibles_on_radius(Point::new(5.0, 5.0), 0.0, &params),
            EdibleSearchResult::default()
        );
        assert_eq!(
            tree.get_edibles_on_radius(Point::new(5.0, 5.0), -1.0, &params),
            EdibleSearchResult::default()
        );
    }

    #[test]
    fn manhattan_neighbours_in_uniform_grid() {
        let tree = world();
        let centre = tree.locate(CellCoord::new([3, 3], 3)).expect("in map");
        let neighbours = tree.get_manhattan_neighbours(centre, 1).expect("distance 1");
        assert_eq!(neighbours.len(), 8);
        assert!(!neighbours.contains(&centre));

        let corner = tree.locate(CellCoord::new([0, 0], 3)).expect("in map");
        assert_eq!(tree.get_manhattan_neighbours(corner, 1).expect("distance 1").len(), 3);
        assert_eq!(tree.get_manhattan_neighbours(corner, 2).expect("distance 2").len(), 8);
        assert!(matches!(
            tree.get_manhattan_neighbours(corner, 0),
            Err(TreeError::InvalidSearchDistance)
        ));
    }

    #[test]
    fn manhattan_neighbours_dedupe_coarse_leaves() {
        let mut tree = TerrainTree::new(TreeLayout::new(8, 1.0).expect("power of two"));
        tree.subdivide_to(1).expect("valid depth");
        let quadrant = tree.locate(CellCoord::new([0, 0], 1)).expect("in map");
        tree.promote(quadrant);
        let fine = tree.locate(CellCoord::new([1, 1], 2)).expect("in map");
        let neighbours = tree.get_manhattan_neighbours(fine, 1).expect("distance 1");
        // Three siblings plus the three coarse quadrants touching the corner.
        assert_eq!(neighbours.len(), 6);
    }

    #[test]
    fn animals_in_branch_concatenate_children() {
        let mut tree = world();
        let a = animal(&mut tree, BEETLE, 0.5, 0.5);
        let b = animal(&mut tree, SPIDER, 3.5, 3.5);
        let _c = animal(&mut tree, BEETLE, 7.5, 0.5);
        let quadrant = tree.locate(CellCoord::new([0, 0], 1)).expect("in map");
        let mut all = tree
            .animals_in_cell(quadrant, &SearchParams::new())
            .expect("alive");
        all.sort();
        assert_eq!(all, [a, b]);
        let spiders = tree
            .animals_in_cell(quadrant, &SearchParams::new().with_species([SPIDER]))
            .expect("alive");
        assert_eq!(spiders, [b]);
    }
}
