use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tilechase_navigation::astar::{PathPlanner, PlannerOptions};
use tilechase_navigation::map::{GridBuilder, GridPoint, TileLayerData, WorldPoint};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    // Seeded so the printed layer is reproducible between runs.
    let seed = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(42u64);
    let mut rng = StdRng::seed_from_u64(seed);

    let (width, height) = (24usize, 16usize);
    let rows: Vec<String> = (0..height)
        .map(|_| {
            (0..width)
                .map(|_| if rng.random_bool(0.72) { '.' } else { '#' })
                .collect()
        })
        .collect();

    let layer = TileLayerData::from_text_rows(&rows, ".", 16.0, 16.0, WorldPoint::new(-192.0, -128.0));
    let (grid, transformer) = GridBuilder::from_layer(&layer)?;
    info!(seed, walkable = grid.walkable_count(), "Generated random layer");
    println!("{}", grid);

    let planner = PathPlanner::new(PlannerOptions::with_diagonal(true, true));
    for _ in 0..5 {
        let start = GridPoint::new(rng.random_range(0..width as i32), rng.random_range(0..height as i32));
        let goal = GridPoint::new(rng.random_range(0..width as i32), rng.random_range(0..height as i32));
        let result = planner.find_path_detailed(&grid, start, goal);
        println!("{} -> {}: {}", start, goal, result);

        // World-space round trip for the endpoints.
        let world_start = transformer.cell_to_world(start, true);
        println!(
            "  start center {} maps back to {}",
            world_start,
            transformer.world_to_cell(&world_start)
        );
    }

    Ok(())
}
