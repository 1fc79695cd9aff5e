//! Basic demonstration of the wellspring groundwater simulation.
//!
//! Run with: cargo run --example basic_demo

use std::sync::{Arc, RwLock};
use wellspring_sim::{
    Block, BlockAccess, BlockPos, VoxelWorld, WellWorld, WorldResource,
};

fn main() {
    println!("=== Wellspring - Groundwater Simulation Demo ===\n");

    // In-memory voxel world standing in for the host game.
    let blocks = Arc::new(RwLock::new(VoxelWorld::new()));
    let mut sim = WellWorld::new(WorldResource(blocks.clone()));

    let pos = BlockPos::new(0, 10, 0);

    // A worldgen aquifer under the well site, and a clay-lined shaft four
    // levels tall built before the spring is dug.
    sim.set_aquifer(pos.chunk(), 40, false);
    blocks.write().unwrap().line_shaft(pos.up(1), 4, Block::Clay);

    println!("Digging a spring at {pos:?} under a 4-level clay shaft...");
    sim.dig_spring(pos);
    println!(
        "  capacity: {} L, available: {} L\n",
        sim.capacity(pos),
        sim.available_volume(pos)
    );

    // Run ten in-game days, half a day per tick.
    println!("Running 10 in-game days (0.5 days/tick)...\n");
    for _ in 0..20 {
        sim.step(0.5);
        if sim.current_tick() % 4 == 0 {
            println!(
                "  day {:>4.1}: {:>3} L stored ({:?}, {:?})",
                sim.current_day(),
                sim.available_volume(pos),
                sim.water_kind(pos).unwrap(),
                sim.contamination(pos).unwrap()
            );
        }
    }

    print_column(&blocks, pos);

    println!("\n--- Drawing 35 L from the well ---");
    let drawn = sim.withdraw(pos, 35);
    sim.step(0.0);
    println!("  drew {} L, {} L remain", drawn, sim.available_volume(pos));
    print_column(&blocks, pos);

    println!("\n=== Final State (JSON) ===\n");
    println!("{}", sim.save_json().unwrap());
}

fn print_column(blocks: &Arc<RwLock<VoxelWorld>>, spring: BlockPos) {
    println!("  column above the spring:");
    let guard = blocks.read().unwrap();
    for level in (1..=4).rev() {
        let cell = spring.up(level);
        match guard.block_at(cell) {
            Block::WellWater(w) => println!(
                "    +{level}: water, height {}/7 ({:?}, {:?})",
                w.height, w.kind, w.contamination
            ),
            other => println!("    +{level}: {other:?}"),
        }
    }
}
