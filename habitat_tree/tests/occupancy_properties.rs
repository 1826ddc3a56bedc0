// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property tests for insertion promotion and radius search.

use habitat_geometry::within_sphere;
use habitat_patch::{
    AnimalSpeciesId, Instar, Patch, PatchShape, PatchSource, ResourceSource, ResourceSpeciesId,
    WorldFrame,
};
use habitat_tree::{
    AnimalId, AnimalKey, EdibleSearchParams, Gender, NewAnimal, SearchParams, TerrainTree,
    TreeLayout,
};
use kurbo::Point;
use proptest::prelude::*;

const GRASS: ResourceSpeciesId = ResourceSpeciesId(0);
const BEETLE: AnimalSpeciesId = AnimalSpeciesId(0);
const SIZE: f64 = 16.0;

fn position() -> impl Strategy<Value = Point> {
    (0.0_f64..SIZE, 0.0_f64..SIZE).prop_map(|(x, y)| Point::new(x, y))
}

fn populated(positions: &[Point], capacity: usize) -> (TerrainTree, Vec<AnimalId>) {
    let mut tree = TerrainTree::new(TreeLayout::new(16, 1.0).expect("power of two"));
    tree.set_capacity_per_depth(vec![capacity; 5])
        .expect("fits the layout");
    tree.apply_patch(&Patch::new(
        PatchShape::gaussian(Point::new(5.0, 9.0), 4.0, 3.0).expect("positive sigma"),
        1,
        PatchSource::Resource(ResourceSource::new(GRASS, 2.0)),
    ));
    tree.register_animal_species(BEETLE, vec![4])
        .expect("valid depths");
    let ids = positions
        .iter()
        .map(|&position| {
            tree.insert_animal(NewAnimal {
                key: AnimalKey::active(BEETLE, Instar(0), Gender::Female),
                position,
            })
            .expect("inserted")
        })
        .collect();
    (tree, ids)
}

proptest! {
    #[test]
    fn promotion_conserves_biomass(
        positions in prop::collection::vec(position(), 1..40),
        capacity in 1_usize..4,
    ) {
        let mut tree = TerrainTree::new(TreeLayout::new(16, 1.0).expect("power of two"));
        tree.apply_patch(&Patch::new(
            PatchShape::homogeneous(&WorldFrame::new(SIZE, SIZE)),
            1,
            PatchSource::Resource(ResourceSource::new(GRASS, 0.75)),
        ));
        let before = tree.obtain_world_resource_biomass_and_animals_population();

        tree.set_capacity_per_depth(vec![capacity; 5]).expect("fits the layout");
        tree.register_animal_species(BEETLE, vec![4]).expect("valid depths");
        let mut ids = Vec::new();
        for &position in &positions {
            ids.push(
                tree.insert_animal(NewAnimal {
                    key: AnimalKey::active(BEETLE, Instar(0), Gender::Male),
                    position,
                })
                .expect("inserted"),
            );
        }
        let after = tree.obtain_world_resource_biomass_and_animals_population();

        let (b, a) = (before.biomass_of(GRASS), after.biomass_of(GRASS));
        prop_assert!((b - a).abs() < 1e-9 * b.max(1.0), "before {b}, after {a}");
        prop_assert_eq!(after.population_of(BEETLE), positions.len());
        prop_assert!(after.leaves_visited >= before.leaves_visited);

        for id in ids {
            let record = *tree.animal(id).expect("known animal");
            let cell = tree.cell(record.cell).expect("filed in a live cell");
            prop_assert!(cell.is_leaf());
            let coord = cell.coord();
            prop_assert_eq!(coord.depth(), 4);
            prop_assert_eq!(
                tree.layout().obtain_point_map(record.position, coord.depth()).expect("in map"),
                coord
            );
        }
    }

    #[test]
    fn radius_search_matches_brute_force(
        positions in prop::collection::vec(position(), 0..40),
        center in position(),
        radius in 0.1_f64..8.0,
    ) {
        let (tree, ids) = populated(&positions, 2);
        let params = EdibleSearchParams::new()
            .with_animals(SearchParams::new())
            .with_resources([GRASS]);
        let found = tree.get_edibles_on_radius(center, radius, &params);

        let mut got = found.animals.clone();
        got.sort();
        let mut expected: Vec<AnimalId> = ids
            .iter()
            .zip(&positions)
            .filter(|&(_, &p)| within_sphere(p, center, radius))
            .map(|(&id, _)| id)
            .collect();
        expected.sort();
        prop_assert_eq!(got, expected);

        for hit in &found.resources {
            prop_assert!(hit.coverage > 0.0 && hit.coverage <= 1.0 + 1e-9);
            let cell = tree.cell(hit.cell).expect("alive");
            let biomass = cell.resource(GRASS).expect("registered").biomass;
            prop_assert!(hit.biomass_in_range <= biomass + 1e-9);
        }
        let total: f64 = found.resources.iter().map(|h| h.biomass_in_range).sum();
        let world: f64 = tree
            .obtain_world_resource_biomass_and_animals_population()
            .biomass_of(GRASS);
        prop_assert!(total <= world + 1e-9);
    }
}
