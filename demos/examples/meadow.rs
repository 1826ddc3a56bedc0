// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Build a world from JSON, seed animals, and run the queries movement code uses.
//!
//! Run:
//! - `RUST_LOG=debug cargo run -p habitat_demos --example meadow`

use habitat_patch::{AnimalSpeciesId, Instar, ResourceSpeciesId};
use habitat_tree::{
    AnimalKey, EdibleSearchParams, Gender, Genders, LifeStage, NewAnimal, SearchParams,
    TerrainTree, TreeError, WorldConfig,
};
use kurbo::Point;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const WORLD: &str = include_str!("../worlds/meadow.json");

const BEETLE: AnimalSpeciesId = AnimalSpeciesId(0);
const SPIDER: AnimalSpeciesId = AnimalSpeciesId(1);
const GRASS: ResourceSpeciesId = ResourceSpeciesId(0);
const MOSS: ResourceSpeciesId = ResourceSpeciesId(1);

fn main() -> Result<(), TreeError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = WorldConfig::from_json_str(WORLD)?;
    let mut rng = ChaCha8Rng::seed_from_u64(2025);
    let mut tree = TerrainTree::from_config(&config, &mut rng)?;
    let size = tree.layout().world_size();

    // Beetles cluster around the wet spot, spiders roam everywhere.
    let mut seeded = 0;
    for i in 0..400_u32 {
        let (species, position) = if i % 4 == 0 {
            (SPIDER, Point::new(rng.gen_range(0.0..size), rng.gen_range(0.0..size)))
        } else {
            let angle = rng.gen_range(0.0..core::f64::consts::TAU);
            let r = rng.gen_range(0.0..3.0);
            (BEETLE, Point::new(4.0 + r * angle.cos(), 12.0 + r * angle.sin()))
        };
        let instar = Instar(u32::from(species == BEETLE && i % 3 == 0));
        let gender = if i % 2 == 0 { Gender::Female } else { Gender::Male };
        match tree.insert_animal(NewAnimal {
            key: AnimalKey::active(species, instar, gender),
            position,
        }) {
            Ok(_) => seeded += 1,
            Err(TreeError::ObstacleCell(cell)) => warn!(%cell, "skipped animal inside an obstacle"),
            Err(err) => return Err(err),
        }
    }
    info!(seeded, cells = tree.cell_count(), "seeded animals");

    let totals = tree.obtain_world_resource_biomass_and_animals_population();
    println!("World totals over {} leaves:", totals.leaves_visited);
    for (species, biomass) in &totals.resource_biomass {
        println!("  {species}: {biomass:.2}");
    }
    for (species, count) in &totals.animal_population {
        println!("  {species}: {count}");
    }

    let wet = tree.leaf_at(Point::new(4.0, 12.0))?;
    println!("\nLeaf under the wet spot:\n{}", tree.print_cell(wet)?);

    let prey = SearchParams::new()
        .with_species([BEETLE])
        .with_life_stages(LifeStage::Active.flag())
        .with_genders(Genders::FEMALE | Genders::MALE);
    let params = EdibleSearchParams::new()
        .with_animals(prey.clone())
        .with_resources([GRASS, MOSS]);
    let found = tree.get_edibles_on_radius(Point::new(5.0, 11.0), 1.5, &params);
    let grass: f64 = found
        .resources
        .iter()
        .filter(|hit| hit.species == GRASS)
        .map(|hit| hit.edible_in_range)
        .sum();
    println!(
        "\nWithin 1.5 of (5, 11): {} beetles, {grass:.3} edible grass",
        found.animals.len()
    );

    let neighbours = tree.get_manhattan_neighbours(wet, 2)?;
    let crowd: usize = neighbours
        .iter()
        .map(|&cell| tree.animals_in_cell(cell, &prey).map(|ids| ids.len()))
        .sum::<Result<_, _>>()?;
    println!("{} neighbour cells hold {crowd} beetles", neighbours.len());

    for step in 1..=3 {
        tree.update_moisture();
        if let Some(reading) = tree.moisture_reading(tree.root()) {
            println!(
                "step {step}: mean temperature {:.2} C, humidity {:.2}",
                reading.temperature, reading.moisture
            );
        }
    }
    Ok(())
}
