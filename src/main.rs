//! CLI for maze generation

use std::thread;
use std::time::Duration;

use clap::Parser;
use dfs_maze::maze_generator::MazeGenerator;
use dfs_maze::{Grid, RenderStyle};

/// Generate perfect mazes with randomized depth-first search
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of cells in horizontal direction
    #[arg(long, default_value_t = 10)]
    width: usize,

    /// Number of cells in vertical direction
    #[arg(long, default_value_t = 10)]
    height: usize,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Display the maze after every generation step
    #[arg(short, long)]
    trace: bool,

    /// Trace frame length in milliseconds. When nonzero, the screen is
    /// cleared between frames.
    #[arg(short, long, default_value_t = 0)]
    frame_length: u64,

    /// Output style
    #[arg(short, long, value_enum, default_value_t = RenderStyle::Ascii)]
    style: RenderStyle,

    /// Number of mazes to generate
    #[arg(short, long, default_value_t = 1)]
    count: usize,
}

/// Generate mazes, print them with their solutions
fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut gen = MazeGenerator::new(args.seed);
    for _ in 0..args.count {
        let maze = if args.trace {
            gen.generate_traced(args.width, args.height, |grid, _| {
                print_frame(grid, args.style, args.frame_length)
            })?
        } else {
            gen.generate(args.width, args.height)?
        };
        println!("{}\n", maze.render(args.style));
    }
    Ok(())
}

fn print_frame(grid: &Grid, style: RenderStyle, frame_length: u64) {
    if frame_length > 0 {
        thread::sleep(Duration::from_millis(frame_length));
        print!("\x1B[2J\x1B[1;1H");
    }
    println!("{}\n", grid.render(style));
}
