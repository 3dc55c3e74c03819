//! Conway's Game of Life, one entity per grid cell.
//!
//! Every cell is an entity holding a `Cell` component with its current and
//! next state; each generation is two passes over a `(Cell,)` view. Renders
//! to stdout.

use packed::{component, Entity, World};
use rand::{Rng, SeedableRng};

const WIDTH: u32 = 64;
const HEIGHT: u32 = 32;
const ALIVE_PROBABILITY: f64 = 0.65;
const GENERATIONS: u32 = 64;

#[derive(Debug, Clone, Copy)]
struct Cell {
    x: u32,
    y: u32,
    alive: bool,
    next: bool,
}

component!(Cell);

struct Board {
    world: World,
    // Row-major cell entities; the grid never changes shape, so this
    // index stays valid for the whole run.
    cells: Vec<Entity>,
}

impl Board {
    fn random(seed: u64) -> Board {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let mut world = World::new();
        let mut cells = Vec::with_capacity((WIDTH * HEIGHT) as usize);

        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                let entity = world.create();
                let alive = rng.gen_bool(ALIVE_PROBABILITY);
                world.attach(
                    entity,
                    Cell {
                        x,
                        y,
                        alive,
                        next: alive,
                    },
                );
                cells.push(entity);
            }
        }

        log::info!("seeded {}x{} board from seed {}", WIDTH, HEIGHT, seed);
        Board { world, cells }
    }

    fn alive(&self, x: u32, y: u32) -> bool {
        let entity = self.cells[(y * WIDTH + x) as usize];
        self.world.get::<Cell>(entity).alive
    }

    fn live_neighbours(&self, x: u32, y: u32) -> u32 {
        let mut count = 0;
        for dy in [HEIGHT - 1, 0, 1] {
            for dx in [WIDTH - 1, 0, 1] {
                if dx == 0 && dy == 0 {
                    continue;
                }
                // The board wraps at the edges.
                if self.alive((x + dx) % WIDTH, (y + dy) % HEIGHT) {
                    count += 1;
                }
            }
        }
        count
    }

    fn step(&mut self) {
        let mut next = Vec::with_capacity(self.cells.len());
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                let neighbours = self.live_neighbours(x, y);
                let alive = self.alive(x, y);
                next.push(neighbours == 3 || (alive && neighbours == 2));
            }
        }

        let mut i = 0;
        self.world.view::<(Cell,), _>(|_, (cell,)| {
            cell.next = next[(cell.y * WIDTH + cell.x) as usize];
            i += 1;
        });
        debug_assert_eq!(i, self.cells.len());

        self.world.view::<(Cell,), _>(|_, (cell,)| {
            cell.alive = cell.next;
        });
    }

    fn render(&self) -> String {
        let mut out = String::with_capacity(((WIDTH + 1) * HEIGHT) as usize);
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                out.push(if self.alive(x, y) { '#' } else { '.' });
            }
            out.push('\n');
        }
        out
    }
}

fn main() {
    env_logger::init();

    let mut board = Board::random(0x5eed);
    for generation in 0..GENERATIONS {
        println!("generation {}:", generation);
        println!("{}", board.render());
        board.step();
    }
}
