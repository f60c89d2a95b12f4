//! A* path planning over a walkability [`Grid`].
//!
//! `f(n) = g(n) + w * h(n)` where
//! * `n` is a cell in the grid,
//! * `g(n)` is the cost from the start cell to `n` (1 per orthogonal step,
//!   `sqrt(2)` per diagonal step),
//! * `h(n)` is the heuristic estimate from `n` to the goal,
//! * `w` is the heuristic weight (1 keeps the search optimal for admissible
//!   heuristics).
//!
//! The grid is only ever read. All search state (open set, scores, parents)
//! lives inside the call, so one grid can serve any number of searches.

use crate::map::{Grid, GridPoint};

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::f64::consts::SQRT_2;
use std::fmt;

use tracing::trace;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An ordered sequence of cells from start to goal, both included.
pub type Path = Vec<GridPoint>;

/// When a diagonal step between two cells is allowed.
///
/// For a diagonal step the two cells orthogonally adjacent to both endpoints
/// are the step's "corners".
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagonalMovement {
    /// Orthogonal steps only.
    #[default]
    Never,
    /// Diagonal steps only when both corners are walkable.
    OnlyWhenNoObstacles,
    /// Diagonal steps when at least one corner is walkable.
    IfAtMostOneObstacle,
    /// Diagonal steps regardless of corners.
    Always,
}

impl DiagonalMovement {
    /// Maps the `allow_diagonal` / `dont_cross_corners` flag pair to a policy.
    pub fn from_flags(allow_diagonal: bool, dont_cross_corners: bool) -> Self {
        match (allow_diagonal, dont_cross_corners) {
            (false, _) => DiagonalMovement::Never,
            (true, true) => DiagonalMovement::OnlyWhenNoObstacles,
            (true, false) => DiagonalMovement::IfAtMostOneObstacle,
        }
    }

    /// Returns true if the policy permits any diagonal step.
    pub fn allows_diagonal(self) -> bool {
        self != DiagonalMovement::Never
    }

    /// Returns true if a diagonal step with the given corner states is legal.
    pub fn permits(self, corner_a_walkable: bool, corner_b_walkable: bool) -> bool {
        match self {
            DiagonalMovement::Never => false,
            DiagonalMovement::OnlyWhenNoObstacles => corner_a_walkable && corner_b_walkable,
            DiagonalMovement::IfAtMostOneObstacle => corner_a_walkable || corner_b_walkable,
            DiagonalMovement::Always => true,
        }
    }
}

/// Distance estimate used to guide the search.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Heuristic {
    /// `dx + dy`.
    Manhattan,
    /// Straight-line distance.
    Euclidean,
    /// Cost of the cheapest 8-connected route ignoring obstacles.
    Octile,
    /// `max(dx, dy)`.
    Chebyshev,
}

impl Heuristic {
    /// Estimated distance between two cells.
    pub fn distance(self, a: GridPoint, b: GridPoint) -> f64 {
        let dx = f64::from(a.x.abs_diff(b.x));
        let dy = f64::from(a.y.abs_diff(b.y));
        match self {
            Heuristic::Manhattan => dx + dy,
            Heuristic::Euclidean => (dx * dx + dy * dy).sqrt(),
            Heuristic::Octile => {
                let (min, max) = if dx < dy { (dx, dy) } else { (dy, dx) };
                (SQRT_2 - 1.0) * min + max
            }
            Heuristic::Chebyshev => dx.max(dy),
        }
    }
}

/// Options controlling a path search.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannerOptions {
    /// Allow diagonal steps.
    pub allow_diagonal: bool,
    /// With diagonal steps allowed, forbid those that cut past a blocked corner.
    pub dont_cross_corners: bool,
    /// Explicit diagonal policy. Overrides the two flags above when set.
    pub diagonal_movement: Option<DiagonalMovement>,
    /// Explicit heuristic. Defaults to octile with diagonals, Euclidean without.
    pub heuristic: Option<Heuristic>,
    /// Heuristic weight, at least 1.
    pub weight: f64,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            allow_diagonal: false,
            dont_cross_corners: false,
            diagonal_movement: None,
            heuristic: None,
            weight: 1.0,
        }
    }
}

impl PlannerOptions {
    /// Options with the given diagonal flags and defaults otherwise.
    pub fn with_diagonal(allow_diagonal: bool, dont_cross_corners: bool) -> Self {
        Self {
            allow_diagonal,
            dont_cross_corners,
            ..Self::default()
        }
    }

    /// The effective diagonal policy.
    pub fn diagonal_movement(&self) -> DiagonalMovement {
        self.diagonal_movement
            .unwrap_or_else(|| DiagonalMovement::from_flags(self.allow_diagonal, self.dont_cross_corners))
    }

    /// The effective heuristic.
    pub fn heuristic(&self) -> Heuristic {
        self.heuristic.unwrap_or(if self.diagonal_movement().allows_diagonal() {
            Heuristic::Octile
        } else {
            Heuristic::Euclidean
        })
    }
}

/// Represents the result of an A* pathfinding operation with metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct PathResult {
    /// The computed path, if one was found.
    pub path: Option<Path>,
    /// The total cost of the path.
    pub total_cost: Option<f64>,
    /// The number of cells expanded during the search.
    pub nodes_explored: usize,
    /// The length of the path (number of cells).
    pub path_length: usize,
}

impl PathResult {
    /// Creates a new PathResult for a successful path.
    pub fn success(path: Path, total_cost: f64, nodes_explored: usize) -> Self {
        let path_length = path.len();
        Self {
            path: Some(path),
            total_cost: Some(total_cost),
            nodes_explored,
            path_length,
        }
    }

    /// Creates a new PathResult for a failed path search.
    pub fn failure(nodes_explored: usize) -> Self {
        Self {
            path: None,
            total_cost: None,
            nodes_explored,
            path_length: 0,
        }
    }

    /// Returns true if a path was found.
    pub fn is_success(&self) -> bool {
        self.path.is_some()
    }

    /// Returns the path if one was found.
    pub fn into_path(self) -> Option<Path> {
        self.path
    }
}

impl fmt::Display for PathResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(_) => write!(
                f,
                "PathResult {{ success: true, path_length: {}, total_cost: {:.3}, nodes_explored: {} }}",
                self.path_length,
                self.total_cost.unwrap_or(0.0),
                self.nodes_explored
            ),
            None => write!(
                f,
                "PathResult {{ success: false, nodes_explored: {} }}",
                self.nodes_explored
            ),
        }
    }
}

/// Orthogonal offsets in expansion order.
const ORTHOGONAL: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// Diagonal offsets in expansion order, each with the indices of its two
/// corners in `ORTHOGONAL`.
const DIAGONAL: [((i32, i32), usize, usize); 4] = [
    ((-1, -1), 3, 0),
    ((1, -1), 0, 1),
    ((1, 1), 1, 2),
    ((-1, 1), 2, 3),
];

/// Gets the walkable neighbours of `p` with the cost of stepping to each.
fn neighbors(p: GridPoint, grid: &Grid, diagonal: DiagonalMovement) -> Vec<(GridPoint, f64)> {
    let mut neighbors_vec = Vec::with_capacity(8);

    let mut open = [false; 4];
    for (i, (dx, dy)) in ORTHOGONAL.iter().enumerate() {
        let neighbor = p.offset(*dx, *dy);
        if grid.is_walkable(neighbor) {
            open[i] = true;
            neighbors_vec.push((neighbor, 1.0));
        }
    }

    if diagonal.allows_diagonal() {
        for ((dx, dy), a, b) in DIAGONAL {
            let neighbor = p.offset(dx, dy);
            if diagonal.permits(open[a], open[b]) && grid.is_walkable(neighbor) {
                neighbors_vec.push((neighbor, SQRT_2));
            }
        }
    }

    neighbors_vec
}

#[derive(Copy, Clone, Debug)]
struct State {
    /// Estimated total cost through this cell.
    cost: f64,
    /// Cost from the start when this entry was pushed.
    g: f64,
    /// Push order, used to break ties.
    seq: u64,
    position: GridPoint,
}

// The priority queue depends on `Ord`. Costs are flipped so the max-heap pops
// the cheapest entry, and among equal costs the earliest pushed.
impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for State {}

/// Reconstructs the path from a map of `came_from` links.
fn reconstruct_path(came_from: &HashMap<GridPoint, GridPoint>, mut current: GridPoint) -> Path {
    let mut path = vec![current];
    while let Some(&previous) = came_from.get(&current) {
        path.push(previous);
        current = previous;
    }
    path.reverse();
    path
}

/// Finds a path from `start` to `goal` using the A* algorithm.
///
/// # Returns
/// * `Option<Path>` - The path if found, `None` otherwise.
pub fn astar_search(
    grid: &Grid,
    start: GridPoint,
    goal: GridPoint,
    options: &PlannerOptions,
) -> Option<Path> {
    astar_search_detailed(grid, start, goal, options).into_path()
}

/// Finds a path from `start` to `goal` using the A* algorithm with detailed results.
///
/// A start or goal outside the grid or on a blocked cell yields a failed
/// result without expanding anything.
pub fn astar_search_detailed(
    grid: &Grid,
    start: GridPoint,
    goal: GridPoint,
    options: &PlannerOptions,
) -> PathResult {
    let mut nodes_explored = 0;

    if !grid.is_walkable(start) || !grid.is_walkable(goal) {
        trace!(%start, %goal, "Start or goal is out of bounds or blocked");
        return PathResult::failure(nodes_explored);
    }

    let diagonal = options.diagonal_movement();
    let heuristic = options.heuristic();
    let weight = options.weight;

    let mut open_set = BinaryHeap::new();
    let mut came_from: HashMap<GridPoint, GridPoint> = HashMap::new();
    let mut g_score: HashMap<GridPoint, f64> = HashMap::new();
    let mut closed: HashSet<GridPoint> = HashSet::new();
    let mut seq = 0u64;

    g_score.insert(start, 0.0);
    open_set.push(State {
        cost: weight * heuristic.distance(start, goal),
        g: 0.0,
        seq,
        position: start,
    });

    while let Some(State {
        position: current,
        g,
        ..
    }) = open_set.pop()
    {
        // Cells can be queued more than once; only the cheapest entry counts.
        if !closed.insert(current) {
            continue;
        }
        nodes_explored += 1;

        if current == goal {
            let path = reconstruct_path(&came_from, current);
            trace!(%start, %goal, nodes_explored, cost = g, "Path found");
            return PathResult::success(path, g, nodes_explored);
        }

        for (neighbor, step_cost) in neighbors(current, grid, diagonal) {
            if closed.contains(&neighbor) {
                continue;
            }
            let tentative_g_score = g + step_cost;

            if tentative_g_score < g_score.get(&neighbor).copied().unwrap_or(f64::INFINITY) {
                came_from.insert(neighbor, current);
                g_score.insert(neighbor, tentative_g_score);
                seq += 1;
                open_set.push(State {
                    cost: tentative_g_score + weight * heuristic.distance(neighbor, goal),
                    g: tentative_g_score,
                    seq,
                    position: neighbor,
                });
            }
        }
    }

    trace!(%start, %goal, nodes_explored, "No path");
    PathResult::failure(nodes_explored)
}

/// Plans paths over grids with a fixed set of options.
///
/// The planner holds no search state, so one instance can be shared freely
/// between agents and threads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathPlanner {
    options: PlannerOptions,
}

impl PathPlanner {
    /// Creates a planner. A weight below 1 (or not finite) is reset to 1.
    pub fn new(mut options: PlannerOptions) -> Self {
        if !(options.weight.is_finite() && options.weight >= 1.0) {
            tracing::warn!(weight = options.weight, "Heuristic weight must be at least 1, using 1");
            options.weight = 1.0;
        }
        Self { options }
    }

    /// Gets the options this planner searches with.
    pub fn options(&self) -> &PlannerOptions {
        &self.options
    }

    /// Finds a path from `start` to `goal`, or `None` when there is none.
    pub fn find_path(&self, grid: &Grid, start: GridPoint, goal: GridPoint) -> Option<Path> {
        astar_search(grid, start, goal, &self.options)
    }

    /// Finds a path from `start` to `goal` with search metadata.
    pub fn find_path_detailed(&self, grid: &Grid, start: GridPoint, goal: GridPoint) -> PathResult {
        astar_search_detailed(grid, start, goal, &self.options)
    }
}
