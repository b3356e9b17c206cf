//! Perfect mazes carved with randomized depth-first search
//!
//! The maze is stored in a doubled-coordinate grid of `(2·height+1) ×
//! (2·width+1)` squares. Odd/odd squares are the logical cells, squares with
//! exactly one odd coordinate are the wall segments between them, and
//! even/even squares are permanent corners. The generator carves a spanning
//! tree through the logical cells, so there is exactly one path between any
//! two of them, and records the entrance-to-goal path while carving.
//!
//! # Examples
//! ## Generate and print a maze
//! ```
//! use dfs_maze::maze_generator::MazeGenerator;
//!
//! let mut gen = MazeGenerator::new(Some(7));
//! let maze = gen.generate(5, 4).unwrap();
//!
//! assert_eq!(maze.grid().rows(), 9);
//! assert_eq!(maze.grid().cols(), 11);
//! assert_eq!(maze.grid().open_internal_walls(), 5 * 4 - 1);
//! println!("{maze}");
//! ```
//!
//! ## Follow the construction step by step
//! ```
//! use dfs_maze::maze_generator::{MazeGenerator, Step};
//!
//! let mut gen = MazeGenerator::new(Some(1));
//! let mut carved = 0;
//! let maze = gen
//!     .generate_traced(3, 3, |_grid, step| {
//!         if let Step::Carve { .. } = step {
//!             carved += 1;
//!         }
//!     })
//!     .unwrap();
//! assert_eq!(carved, 8);
//! assert_eq!(maze.solution().first(), Some(&maze.grid().start()));
//! ```

pub mod maze_generator;

use std::fmt;

use anyhow::{ensure, Context};
use itertools::Itertools;
use petgraph::graph::NodeIndex;
use petgraph::{Graph, Undirected};

/// Location in the grid
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct Point {
    pub y: usize,
    pub x: usize,
}

impl Point {
    pub const fn new(y: usize, x: usize) -> Self {
        Point { y, x }
    }

    /// Shift by (dy, dx), or `None` if either coordinate would go negative.
    fn offset(self, dy: isize, dx: isize) -> Option<Self> {
        Some(Point {
            y: self.y.checked_add_signed(dy)?,
            x: self.x.checked_add_signed(dx)?,
        })
    }

    /// Whether this is an odd/odd position, i.e. a logical cell
    pub fn is_logical_cell(self) -> bool {
        self.y % 2 == 1 && self.x % 2 == 1
    }

    /// Logical cells are adjacent when exactly one wall segment separates
    /// them: distance 2 along one axis and 0 along the other.
    pub fn is_adjacent(self, other: Point) -> bool {
        matches!(
            (self.y.abs_diff(other.y), self.x.abs_diff(other.x)),
            (2, 0) | (0, 2)
        )
    }

    /// Wall segment separating two adjacent cells
    pub fn wall_between(self, other: Point) -> Point {
        Point {
            y: (self.y + other.y) / 2,
            x: (self.x + other.x) / 2,
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.y, self.x)
    }
}

/// State of a single grid square
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Square {
    /// Border, corner or uncarved wall segment
    Wall,
    /// Unvisited cell or carved passage
    Open,
    /// Cell reached by the generator; only present during construction
    Visited,
    /// Cell on the entrance-to-goal path
    Solution,
}

impl Square {
    /// Character used for this square in the given style
    pub const fn symbol(self, style: RenderStyle) -> char {
        match (style, self) {
            (RenderStyle::Ascii, Square::Wall) => 'X',
            (RenderStyle::Ascii, Square::Open) => ' ',
            (RenderStyle::Ascii, Square::Visited) => 'V',
            (RenderStyle::Ascii, Square::Solution) => '*',
            (RenderStyle::Emoji, Square::Wall) => '🟫',
            (RenderStyle::Emoji, Square::Open) => '🟩',
            (RenderStyle::Emoji, Square::Visited) => '🟦',
            (RenderStyle::Emoji, Square::Solution) => '🟨',
        }
    }
}

/// Text representation of the grid
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum RenderStyle {
    /// `X` walls, `*` solution, squares separated by spaces
    #[default]
    Ascii,
    /// Colored squares, no separator
    Emoji,
}

impl RenderStyle {
    const fn separator(self) -> &'static str {
        match self {
            RenderStyle::Ascii => " ",
            RenderStyle::Emoji => "",
        }
    }
}

/// Cells and walls of a maze in doubled coordinates
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Grid {
    /// Number of logical cells per row
    width: usize,
    /// Number of logical cells per column
    height: usize,
    /// `(2·height+1) × (2·width+1)` squares, indexed `[y][x]`
    squares: Vec<Vec<Square>>,
}

impl Grid {
    /// Largest accepted number of squares, `rows × cols`
    pub const MAX_SQUARES: usize = 1 << 28;

    /// Build the uncarved maze shell
    ///
    /// Every logical cell starts open and unvisited, everything else is
    /// wall, except for the entrance above the top-left cell and the exit
    /// below the bottom-right cell.
    ///
    /// ## Arguments
    /// - `width`: Number of logical cells in horizontal direction.
    /// - `height`: Number of logical cells in vertical direction.
    ///
    /// Returns error if either dimension is zero, or if the grid would hold
    /// more than [`Grid::MAX_SQUARES`] squares.
    pub fn shell(width: usize, height: usize) -> anyhow::Result<Self> {
        ensure!(width >= 1, "Maze width must be at least 1, got {width}");
        ensure!(height >= 1, "Maze height must be at least 1, got {height}");
        let cols = doubled(width).with_context(|| format!("Maze width {width} is too large"))?;
        let rows = doubled(height).with_context(|| format!("Maze height {height} is too large"))?;
        ensure!(
            rows.checked_mul(cols)
                .is_some_and(|squares| squares <= Self::MAX_SQUARES),
            "Maze of {width}x{height} cells needs more than {} grid squares",
            Self::MAX_SQUARES
        );

        let mut squares: Vec<Vec<Square>> = (0..rows)
            .map(|y| {
                (0..cols)
                    .map(|x| {
                        if Point::new(y, x).is_logical_cell() {
                            Square::Open
                        } else {
                            Square::Wall
                        }
                    })
                    .collect()
            })
            .collect();

        squares[0][1] = Square::Open; // entrance
        squares[rows - 1][cols - 2] = Square::Open; // exit

        Ok(Grid {
            width,
            height,
            squares,
        })
    }

    /// Number of logical cells per row
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of logical cells per column
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of square rows, `2·height+1`
    pub fn rows(&self) -> usize {
        2 * self.height + 1
    }

    /// Number of square columns, `2·width+1`
    pub fn cols(&self) -> usize {
        2 * self.width + 1
    }

    /// Opening in the top border
    pub fn entrance(&self) -> Point {
        Point::new(0, 1)
    }

    /// Opening in the bottom border
    pub fn exit(&self) -> Point {
        Point::new(2 * self.height, 2 * self.width - 1)
    }

    /// Top-left logical cell, where carving starts
    pub fn start(&self) -> Point {
        Point::new(1, 1)
    }

    /// Bottom-right logical cell, next to the exit
    pub fn goal(&self) -> Point {
        Point::new(2 * self.height - 1, 2 * self.width - 1)
    }

    /// Square at `point`, `None` outside the grid
    pub fn get(&self, point: Point) -> Option<Square> {
        self.squares.get(point.y)?.get(point.x).copied()
    }

    /// Whether `point` lies strictly inside the outer border
    ///
    /// The frame and its corners are never legal carving targets.
    pub fn in_bounds(&self, point: Point) -> bool {
        (1..2 * self.height).contains(&point.y) && (1..2 * self.width).contains(&point.x)
    }

    /// Whether the square can be walked on, i.e. it is not a wall
    pub fn is_open_or_visited(&self, point: Point) -> bool {
        matches!(
            self.get(point),
            Some(Square::Open | Square::Visited | Square::Solution)
        )
    }

    pub fn is_visited(&self, point: Point) -> bool {
        self.get(point) == Some(Square::Visited)
    }

    pub fn mark_visited(&mut self, point: Point) {
        self.squares[point.y][point.x] = Square::Visited;
    }

    pub fn mark_solution(&mut self, point: Point) {
        self.squares[point.y][point.x] = Square::Solution;
    }

    /// Carve a passage from `from` into the adjacent cell `to`
    ///
    /// Opens the separating wall segment and marks `to` visited. The caller
    /// guarantees that both are adjacent logical cells.
    pub fn open_wall_between(&mut self, from: Point, to: Point) {
        debug_assert!(
            from.is_adjacent(to),
            "cells {from} and {to} are not adjacent"
        );
        let wall = from.wall_between(to);
        self.squares[wall.y][wall.x] = Square::Open;
        self.mark_visited(to);
    }

    /// Legal neighbor cells in the order left, right, up, down
    pub fn neighbors(&self, cell: Point) -> impl Iterator<Item = Point> + '_ {
        [(0, -2), (0, 2), (-2, 0), (2, 0)]
            .into_iter()
            .filter_map(move |(dy, dx)| cell.offset(dy, dx))
            .filter(|&next| self.in_bounds(next))
    }

    /// Legal neighbor cells that the generator has not reached yet
    pub fn unvisited_neighbors(&self, cell: Point) -> Vec<Point> {
        self.neighbors(cell)
            .filter(|&next| !self.is_visited(next))
            .collect()
    }

    /// All logical cells, row by row
    pub fn logical_cells(&self) -> impl Iterator<Item = Point> {
        (0..self.height)
            .cartesian_product(0..self.width)
            .map(|(row, col)| Point::new(2 * row + 1, 2 * col + 1))
    }

    /// Number of opened wall segments between logical cells
    ///
    /// Entrance and exit are in the border and not counted.
    pub fn open_internal_walls(&self) -> usize {
        (1..self.rows() - 1)
            .cartesian_product(1..self.cols() - 1)
            .filter(|&(y, x)| (y + x) % 2 == 1)
            .filter(|&(y, x)| self.squares[y][x] != Square::Wall)
            .count()
    }

    /// Reset visited and solution markers back to open squares
    ///
    /// Walls are not touched.
    pub fn clear_markers(&mut self) {
        for square in self.squares.iter_mut().flatten() {
            if matches!(*square, Square::Visited | Square::Solution) {
                *square = Square::Open;
            }
        }
    }

    /// Overlay the solution path on a fully carved grid
    ///
    /// Construction markers are cleared first, so applying the same path
    /// again yields the same grid. The goal cell next to the exit is always
    /// marked, whether or not `path` contains it.
    pub fn apply_solution(&mut self, path: &[Point]) {
        self.clear_markers();
        for &cell in path {
            self.mark_solution(cell);
        }
        self.mark_solution(self.goal());
    }

    /// Undirected graph of logical cells, with an edge for each open wall
    ///
    /// Node weights are the cell coordinates; nodes are added row by row.
    pub fn passage_graph(&self) -> Graph<Point, (), Undirected> {
        let mut graph = Graph::new_undirected();
        let nodes: Vec<NodeIndex> = self
            .logical_cells()
            .map(|cell| graph.add_node(cell))
            .collect();

        for cell in self.logical_cells() {
            // Right and down only, the graph is undirected
            for next in [cell.offset(0, 2), cell.offset(2, 0)].into_iter().flatten() {
                if self.in_bounds(next) && self.is_open_or_visited(cell.wall_between(next)) {
                    graph.add_edge(nodes[self.cell_index(cell)], nodes[self.cell_index(next)], ());
                }
            }
        }
        graph
    }

    fn cell_index(&self, cell: Point) -> usize {
        (cell.y / 2) * self.width + cell.x / 2
    }

    /// Rows of symbols joined by the style separator, one row per line
    pub fn render(&self, style: RenderStyle) -> String {
        self.squares
            .iter()
            .map(|row| row.iter().map(|square| square.symbol(style)).join(style.separator()))
            .join("\n")
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(RenderStyle::Ascii))
    }
}

fn doubled(n: usize) -> Option<usize> {
    n.checked_mul(2)?.checked_add(1)
}

/// Finished perfect maze with its solution overlaid
#[derive(Clone, Debug)]
pub struct Maze {
    grid: Grid,
    /// Cells from the start cell to the goal cell, inclusive
    solution: Vec<Point>,
}

impl Maze {
    pub(crate) fn new(mut grid: Grid, solution: Vec<Point>) -> Self {
        grid.apply_solution(&solution);
        Maze { grid, solution }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Path through the maze, start cell first, goal cell last
    pub fn solution(&self) -> &[Point] {
        &self.solution
    }

    pub fn render(&self, style: RenderStyle) -> String {
        self.grid.render(style)
    }
}

impl fmt::Display for Maze {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.grid, f)
    }
}
