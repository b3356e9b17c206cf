//! Maze generation

use anyhow::{bail, ensure};
use log::{debug, trace};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{Grid, Maze, Point};

/// One step of the depth-first carve, as reported to trace observers
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Step {
    /// Wall between `from` and `to` was opened, `to` is the new current cell
    Carve { from: Point, to: Point },
    /// Dead end, retreated to `to` along the backtrack stack
    Backtrack { to: Point },
}

/// Shadow of the backtrack stack that yields the path to the goal cell
///
/// Pushes and pops mirror the backtrack stack until the goal cell is first
/// visited. From then on the stack is frozen, holding the cells from the
/// start cell up to the one the goal was carved from.
#[derive(Debug)]
pub struct SolutionTracker {
    stack: Vec<Point>,
    goal: Point,
    solved: bool,
}

impl SolutionTracker {
    pub fn new(goal: Point) -> Self {
        SolutionTracker {
            stack: Vec::new(),
            goal,
            solved: false,
        }
    }

    pub fn push(&mut self, cell: Point) {
        if !self.solved {
            self.stack.push(cell);
        }
    }

    pub fn pop(&mut self) {
        if !self.solved {
            self.stack.pop();
        }
    }

    /// Freeze the stack once the goal cell has been visited
    pub fn observe(&mut self, grid: &Grid) {
        if !self.solved && grid.is_visited(self.goal) {
            trace!(
                "Goal {} reached, solution stack frozen at {} cells",
                self.goal,
                self.stack.len()
            );
            self.solved = true;
        }
    }

    pub fn is_solved(&self) -> bool {
        self.solved
    }

    /// Path from the start cell to the goal cell, inclusive
    ///
    /// The goal is the current cell at the moment of freezing and is never
    /// pushed, so it is appended here.
    pub fn into_path(self) -> Vec<Point> {
        let mut path = self.stack;
        if path.last() != Some(&self.goal) {
            path.push(self.goal);
        }
        path
    }
}

/// Perfect maze generator, randomized depth-first search with backtracking
pub struct MazeGenerator {
    random: StdRng,
}

impl MazeGenerator {
    /// Create generator, seeded from `seed` or from system entropy
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(state) => debug!("Seeding generator with {state}"),
            None => debug!("Seeding generator from system entropy"),
        }
        Self {
            random: if let Some(state) = seed {
                StdRng::seed_from_u64(state)
            } else {
                StdRng::from_entropy()
            },
        }
    }

    /// Generate a `width × height` perfect maze with its solution overlaid
    ///
    /// Returns error if either dimension is zero or too large.
    pub fn generate(&mut self, width: usize, height: usize) -> anyhow::Result<Maze> {
        self.generate_traced(width, height, |_, _| ())
    }

    /// Generate maze, calling `on_step` after every carve or backtrack
    ///
    /// The observer sees the grid under construction, with visited cells
    /// still marked as such.
    pub fn generate_traced<F>(
        &mut self,
        width: usize,
        height: usize,
        mut on_step: F,
    ) -> anyhow::Result<Maze>
    where
        F: FnMut(&Grid, Step),
    {
        let mut grid = Grid::shell(width, height)?;
        debug!("Generating {width}x{height} maze");

        let solution = self.carve(&mut grid, &mut on_step)?;
        debug!("Maze generated, solution has {} cells", solution.len());

        Ok(Maze::new(grid, solution))
    }

    /// Carve a spanning tree through every logical cell of `grid`
    ///
    /// Starts from the top-left cell. At each step a random unvisited
    /// neighbor of the current cell is carved into; at a dead end the
    /// generator retreats one cell along the backtrack stack. Every cell
    /// turns visited exactly once and only by the carve that reaches it, so
    /// no cycles can form.
    ///
    /// Returns the path from the start cell to the goal cell.
    fn carve<F>(&mut self, grid: &mut Grid, on_step: &mut F) -> anyhow::Result<Vec<Point>>
    where
        F: FnMut(&Grid, Step),
    {
        let total_cells = grid.width() * grid.height();
        let mut backtrack: Vec<Point> = Vec::new();
        let mut solution = SolutionTracker::new(grid.goal());

        let mut current = grid.start();
        grid.mark_visited(current);
        let mut visited_cells = 1;
        solution.observe(grid);

        while visited_cells < total_cells {
            let neighbors = grid.unvisited_neighbors(current);

            let step = if neighbors.is_empty() {
                let Some(previous) = backtrack.pop() else {
                    bail!(
                        "Backtrack stack exhausted after visiting {visited_cells} of {total_cells} cells"
                    );
                };
                solution.pop();
                current = previous;
                Step::Backtrack { to: current }
            } else {
                backtrack.push(current);
                solution.push(current);

                let next = neighbors[self.random.gen_range(0..neighbors.len())];
                grid.open_wall_between(current, next);
                let from = current;
                current = next;
                visited_cells += 1;
                Step::Carve { from, to: next }
            };

            trace!("{step:?}");
            on_step(grid, step);
            solution.observe(grid);
        }

        ensure!(
            solution.is_solved(),
            "Goal {} was not reached during generation",
            grid.goal()
        );
        Ok(solution.into_path())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use petgraph::algo::{astar, connected_components, is_cyclic_undirected};
    use petgraph::graph::NodeIndex;
    use quickcheck::{QuickCheck, TestResult};

    use crate::maze_generator::{MazeGenerator, SolutionTracker, Step};
    use crate::{Grid, Maze, Point, Square};

    /// Check the perfect-maze and solution properties of a finished maze
    fn assert_perfect(maze: &Maze) {
        let grid = maze.grid();
        let cells = grid.width() * grid.height();

        let graph = grid.passage_graph();
        assert_eq!(graph.node_count(), cells);
        assert_eq!(graph.edge_count(), cells - 1);
        assert_eq!(grid.open_internal_walls(), cells - 1);
        assert_eq!(connected_components(&graph), 1);
        assert!(!is_cyclic_undirected(&graph));

        assert_eq!(grid.get(grid.entrance()), Some(Square::Open));
        assert_eq!(grid.get(grid.exit()), Some(Square::Open));
        assert!(grid.logical_cells().all(|cell| matches!(
            grid.get(cell),
            Some(Square::Open | Square::Solution)
        )));

        let solution = maze.solution();
        assert_eq!(solution.first(), Some(&grid.start()));
        assert_eq!(solution.last(), Some(&grid.goal()));
        for pair in solution.windows(2) {
            assert!(pair[0].is_adjacent(pair[1]));
            assert!(grid.is_open_or_visited(pair[0].wall_between(pair[1])));
        }
        assert!(solution
            .iter()
            .all(|&cell| grid.get(cell) == Some(Square::Solution)));

        // In a tree the shortest path is the only path
        let (_, shortest) = astar(
            &graph,
            NodeIndex::new(0),
            |node| node == NodeIndex::new(cells - 1),
            |_| 1,
            |_| 0,
        )
        .unwrap();
        let shortest: Vec<Point> = shortest.into_iter().map(|node| graph[node]).collect();
        assert_eq!(shortest, solution);
    }

    #[test]
    fn single_cell_maze() {
        let mut gen = MazeGenerator::new(Some(0));
        let mut steps = 0;
        let maze = gen.generate_traced(1, 1, |_, _| steps += 1).unwrap();

        assert_eq!(steps, 0);
        assert_eq!(maze.solution(), &[Point::new(1, 1)]);
        assert_eq!(maze.grid().open_internal_walls(), 0);
        assert_eq!(maze.to_string(), "X   X\nX * X\nX   X");
        assert_perfect(&maze);
    }

    #[test]
    fn two_cell_maze() {
        let mut gen = MazeGenerator::new(Some(0));
        let maze = gen.generate(2, 1).unwrap();

        assert_eq!((maze.grid().rows(), maze.grid().cols()), (3, 5));
        assert_eq!(maze.grid().open_internal_walls(), 1);
        assert_eq!(maze.solution(), &[Point::new(1, 1), Point::new(1, 3)]);
        assert_eq!(
            maze.to_string(),
            "
X   X X X
X *   * X
X X X   X"
                .trim_start_matches('\n')
        );
        assert_perfect(&maze);
    }

    #[test]
    fn tall_and_wide_corridors() {
        let mut gen = MazeGenerator::new(Some(3));
        let column = gen.generate(1, 6).unwrap();
        assert_eq!(column.solution().len(), 6);
        assert_perfect(&column);

        let row = gen.generate(6, 1).unwrap();
        assert_eq!(row.solution().len(), 6);
        assert_perfect(&row);
    }

    #[test]
    fn rejects_empty_dimensions() {
        let mut gen = MazeGenerator::new(Some(0));
        assert!(gen.generate(0, 4).is_err());
        assert!(gen.generate(4, 0).is_err());
        assert!(gen.generate(0, 0).is_err());
        assert!(gen.generate(1 << 62, 1).is_err());
        assert!(gen.generate(1 << 40, 1 << 40).is_err());
    }

    #[test]
    fn same_seed_same_maze() {
        let a = MazeGenerator::new(Some(42)).generate(12, 8).unwrap();
        let b = MazeGenerator::new(Some(42)).generate(12, 8).unwrap();
        assert_eq!(a.grid(), b.grid());
        assert_eq!(a.solution(), b.solution());
    }

    #[test]
    fn every_cell_carved_into_once() {
        let mut gen = MazeGenerator::new(Some(11));
        let mut carved = Vec::new();
        let mut backtracks = 0;
        let maze = gen
            .generate_traced(7, 5, |grid, step| match step {
                Step::Carve { from, to } => {
                    assert!(from.is_adjacent(to));
                    assert!(grid.is_visited(to));
                    carved.push(to);
                }
                Step::Backtrack { to } => {
                    assert!(grid.is_visited(to));
                    backtracks += 1;
                }
            })
            .unwrap();

        let unique: HashSet<Point> = carved.iter().copied().collect();
        assert_eq!(carved.len(), 7 * 5 - 1);
        assert_eq!(unique.len(), carved.len());
        assert!(!unique.contains(&maze.grid().start()));
        // Every backtrack undoes an earlier carve
        assert!(backtracks < carved.len());
    }

    #[test]
    fn construction_grid_ends_fully_visited() {
        let mut gen = MazeGenerator::new(Some(5));
        let mut last: Option<Grid> = None;
        gen.generate_traced(6, 6, |grid, _| last = Some(grid.clone()))
            .unwrap();

        let last = last.unwrap();
        assert!(last.logical_cells().all(|cell| last.is_visited(cell)));
        assert!(!last.to_string().contains('*'));
    }

    #[test]
    fn solution_frozen_when_goal_reached() {
        let mut gen = MazeGenerator::new(Some(8));
        let mut path: Vec<Point> = vec![Point::new(1, 1)];
        let mut at_goal: Option<Vec<Point>> = None;
        let maze = gen
            .generate_traced(9, 7, |grid, step| {
                match step {
                    Step::Carve { to, .. } => path.push(to),
                    Step::Backtrack { .. } => {
                        path.pop();
                    }
                }
                if at_goal.is_none() && grid.is_visited(grid.goal()) {
                    at_goal = Some(path.clone());
                }
            })
            .unwrap();

        assert_eq!(at_goal.as_deref(), Some(maze.solution()));
        assert_perfect(&maze);
    }

    #[test]
    fn tracker_ignores_moves_after_freeze() {
        let mut grid = Grid::shell(2, 1).unwrap();
        let mut tracker = SolutionTracker::new(grid.goal());

        grid.mark_visited(Point::new(1, 1));
        tracker.observe(&grid);
        assert!(!tracker.is_solved());

        tracker.push(Point::new(1, 1));
        grid.open_wall_between(Point::new(1, 1), Point::new(1, 3));
        tracker.observe(&grid);
        assert!(tracker.is_solved());

        tracker.pop();
        tracker.push(Point::new(5, 5));
        assert_eq!(
            tracker.into_path(),
            vec![Point::new(1, 1), Point::new(1, 3)]
        );
    }

    #[test]
    fn reapplying_solution_is_stable() {
        let maze = MazeGenerator::new(Some(21)).generate(10, 4).unwrap();
        let mut grid = maze.grid().clone();
        grid.apply_solution(maze.solution());
        assert_eq!(&grid, maze.grid());
    }

    #[test]
    fn thousand_random_mazes_are_perfect() {
        let mut gen = MazeGenerator::new(None);
        for _ in 0..1000 {
            let maze = gen.generate(10, 10).unwrap();
            assert_perfect(&maze);
        }
    }

    #[test]
    fn random_dimensions_are_perfect() {
        fn prop(width: u8, height: u8, seed: u64) -> TestResult {
            let (width, height) = (width as usize % 16, height as usize % 16);
            if width == 0 || height == 0 {
                return TestResult::discard();
            }
            let maze = MazeGenerator::new(Some(seed))
                .generate(width, height)
                .unwrap();
            assert_perfect(&maze);
            TestResult::passed()
        }
        QuickCheck::new()
            .tests(200)
            .quickcheck(prop as fn(u8, u8, u64) -> TestResult);
    }
}
