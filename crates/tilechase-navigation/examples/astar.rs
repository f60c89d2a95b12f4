use std::collections::HashSet;

use tilechase_navigation::astar::{PathPlanner, PlannerOptions};
use tilechase_navigation::map::{GridBuilder, GridPoint, TileLayerData, WorldPoint};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // '.' = walkable, '#' = blocked. Row 0 is the first line.
    let rows = [
        "..........",
        ".##....##.",
        "....#.....",
        "..####.#..",
        ".....#.#..",
        ".###.#.##.",
        "...#......",
        ".#.#.###..",
        ".#......#.",
        "...###....",
    ];
    let layer = TileLayerData::from_text_rows(&rows, ".", 32.0, 32.0, WorldPoint::new(-160.0, -160.0));
    let (grid, transformer) = GridBuilder::from_layer(&layer)?;

    let start = GridPoint::new(0, 0);
    let goal = GridPoint::new(9, 9);

    println!("{}", grid);
    println!("Start: {}, Goal: {}", start, goal);

    for (label, options) in [
        ("orthogonal", PlannerOptions::default()),
        ("diagonal, no corner cutting", PlannerOptions::with_diagonal(true, true)),
        ("diagonal", PlannerOptions::with_diagonal(true, false)),
    ] {
        let planner = PathPlanner::new(options);
        let result = planner.find_path_detailed(&grid, start, goal);
        println!("\n[{}] {}", label, result);

        let Some(path) = result.path else {
            println!("No path found.");
            continue;
        };

        let path_set: HashSet<GridPoint> = path.iter().copied().collect();
        for (y, row) in grid.rows().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                let p = GridPoint::new(x as i32, y as i32);
                let c = if p == start {
                    'S'
                } else if p == goal {
                    'G'
                } else if path_set.contains(&p) {
                    '*'
                } else {
                    cell.as_char()
                };
                print!("{} ", c);
            }
            println!();
        }

        let waypoints = transformer.path_to_world(&path, true);
        if let (Some(first), Some(last)) = (waypoints.first(), waypoints.last()) {
            println!("World waypoints: {} -> {} ({} total)", first, last, waypoints.len());
        }
    }

    Ok(())
}
