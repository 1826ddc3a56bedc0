// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property tests: the final cell state does not depend on application order,
//! on any of the four channels.

use habitat_patch::{
    AnimalSpeciesId, CycleDynamics, HabitatDomainEntry, HabitatDomainSource, Instar,
    MoistureSource, ObstacleSource, Patch, PatchShape, PatchSource, ResourceSource,
    ResourceSpeciesId,
};
use habitat_tree::{MoistureInfo, TerrainTree, TreeLayout};
use kurbo::Point;
use proptest::prelude::*;

const GRASS: ResourceSpeciesId = ResourceSpeciesId(0);
const BEETLE: AnimalSpeciesId = AnimalSpeciesId(0);
const INSTARS: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    Obstacle,
    Moisture,
    Resource,
    Habitat,
}

fn kind() -> impl Strategy<Value = Kind> {
    prop_oneof![
        Just(Kind::Obstacle),
        Just(Kind::Moisture),
        Just(Kind::Resource),
        Just(Kind::Habitat),
    ]
}

#[derive(Clone, Debug)]
struct PatchPlan {
    x: f64,
    y: f64,
    extent: f64,
    round: bool,
    density: f64,
    flag: bool,
    instar: u32,
}

fn plan() -> impl Strategy<Value = PatchPlan> {
    (
        0.0_f64..14.0,
        0.0_f64..14.0,
        0.5_f64..8.0,
        any::<bool>(),
        0.1_f64..5.0,
        any::<bool>(),
        0..INSTARS,
    )
        .prop_map(|(x, y, extent, round, density, flag, instar)| PatchPlan {
            x,
            y,
            extent,
            round,
            density,
            flag,
            instar,
        })
}

fn shape(plan: &PatchPlan) -> PatchShape {
    if plan.round {
        PatchShape::spherical(Point::new(plan.x, plan.y), plan.extent).expect("positive radius")
    } else {
        PatchShape::cubic(
            Point::new(plan.x, plan.y),
            Point::new(plan.x + plan.extent, plan.y + plan.extent),
        )
        .expect("ordered corners")
    }
}

/// `tag` tells sources apart: moisture ids depend on registration order, so
/// cells are compared by the temperature of their source instead.
fn source(kind: Kind, plan: &PatchPlan, tag: f64) -> PatchSource {
    match kind {
        Kind::Obstacle => PatchSource::Obstacle(ObstacleSource {
            obstacle: plan.flag,
        }),
        Kind::Resource => PatchSource::Resource(ResourceSource::new(GRASS, plan.density * tag)),
        Kind::Moisture => PatchSource::Moisture(MoistureSource {
            temperature: CycleDynamics::constant(tag),
            relative_humidity: CycleDynamics::constant(plan.density / 5.0),
            max_resource_capacity_density: plan.density,
            in_enemy_free_space: plan.flag,
            in_competitor_free_space: false,
        }),
        Kind::Habitat => PatchSource::HabitatDomain(HabitatDomainSource {
            entries: vec![HabitatDomainEntry {
                species: BEETLE,
                instars: vec![Instar(plan.instar)],
                inhabitable: plan.flag,
            }],
        }),
    }
}

/// Priorities are distinct, since an equal priority never overwrites.
fn patches(plans: &[PatchPlan], kind: Kind) -> Vec<Patch> {
    plans
        .iter()
        .enumerate()
        .map(|(i, plan)| Patch::new(shape(plan), i + 1, source(kind, plan, (i + 1) as f64)))
        .collect()
}

fn world() -> TerrainTree {
    let mut tree = TerrainTree::new(TreeLayout::new(16, 1.0).expect("power of two"));
    tree.subdivide_to(2).expect("valid depth");
    tree.register_resource_species(GRASS);
    tree.register_animal_species(BEETLE, vec![2; INSTARS as usize])
        .expect("valid depths");
    tree
}

#[derive(Clone, Debug, PartialEq)]
struct LeafState {
    obstacle: (bool, usize),
    resource: (f64, usize),
    /// Temperature of the governing source, whether it was written directly,
    /// and the priority.
    moisture: (Option<f64>, bool, usize),
    habitat: (Vec<bool>, usize),
}

fn leaf_states(tree: &TerrainTree) -> Vec<LeafState> {
    tree.leaves()
        .map(|id| {
            let cell = tree.cell(id).expect("alive");
            let resource = cell.resource(GRASS).expect("registered");
            let moisture = cell.moisture();
            let temperature = moisture
                .value()
                .source_id()
                .and_then(|source| tree.moisture_source(source))
                .map(|source| source.temperature.current());
            let habitat = cell.habitat_domain();
            LeafState {
                obstacle: (cell.is_obstacle(), cell.obstacle().patch_priority()),
                resource: (
                    resource.capacity,
                    cell.resource_priority(GRASS).expect("registered"),
                ),
                moisture: (
                    temperature,
                    matches!(moisture.value(), MoistureInfo::Source(_)),
                    moisture.patch_priority(),
                ),
                habitat: (
                    (0..INSTARS)
                        .map(|instar| habitat.value().is_inhabitable(BEETLE, Instar(instar)))
                        .collect(),
                    habitat.patch_priority(),
                ),
            }
        })
        .collect()
}

fn leaf_priorities(tree: &TerrainTree, kind: Kind) -> Vec<usize> {
    tree.leaves()
        .map(|id| {
            let cell = tree.cell(id).expect("alive");
            match kind {
                Kind::Obstacle => cell.obstacle().patch_priority(),
                Kind::Moisture => cell.moisture().patch_priority(),
                Kind::Resource => cell.resource_priority(GRASS).expect("registered"),
                Kind::Habitat => cell.habitat_domain().patch_priority(),
            }
        })
        .collect()
}

proptest! {
    #[test]
    fn application_order_does_not_matter(
        plans in prop::collection::vec(plan(), 1..6),
        kind in kind(),
        order in Just((0..6_usize).collect::<Vec<_>>()).prop_shuffle(),
    ) {
        let patches = patches(&plans, kind);

        let mut ascending = world();
        for patch in &patches {
            ascending.apply_patch(patch);
        }

        let mut shuffled = world();
        for &i in order.iter().filter(|&&i| i < patches.len()) {
            shuffled.apply_patch(&patches[i]);
        }

        prop_assert_eq!(leaf_states(&ascending), leaf_states(&shuffled));
        let root = |tree: &TerrainTree| {
            let cell = tree.cell(tree.root()).expect("alive");
            (
                cell.obstacle().patch_priority(),
                cell.resource_priority(GRASS),
                *cell.obstacle().value(),
            )
        };
        prop_assert_eq!(root(&ascending), root(&shuffled));
    }

    #[test]
    fn equal_priority_never_overwrites(
        plans in prop::collection::vec(plan(), 1..6),
        kind in kind(),
    ) {
        let mut tree = world();
        for patch in patches(&plans, kind) {
            tree.apply_patch(&patch);
        }
        let before = leaf_states(&tree);

        // Same shapes and priorities, different payloads.
        for (i, plan) in plans.iter().enumerate() {
            let twin = PatchPlan {
                flag: !plan.flag,
                instar: (plan.instar + 1) % INSTARS,
                ..plan.clone()
            };
            let report = tree.apply_patch(&Patch::new(
                shape(plan),
                i + 1,
                source(kind, &twin, 100.0 + i as f64),
            ));
            prop_assert!(report.written.is_empty(), "{:?}", report.written);
        }
        prop_assert_eq!(before, leaf_states(&tree));
    }

    #[test]
    fn priorities_never_decrease(
        plans in prop::collection::vec(plan(), 1..6),
        kind in kind(),
    ) {
        let mut tree = world();
        let mut before = leaf_priorities(&tree, kind);
        for patch in patches(&plans, kind).iter().rev() {
            tree.apply_patch(patch);
            let after = leaf_priorities(&tree, kind);
            for (b, a) in before.iter().zip(&after) {
                prop_assert!(a >= b);
            }
            before = after;
        }
    }
}
