use packed::{component, World};

#[derive(Debug, Clone, Copy, Default)]
pub struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Velocity {
    dx: f32,
    dy: f32,
}

component!(Position);
component!(Velocity);

fn main() {
    let mut world = World::new();

    for i in 0..4 {
        let entity = world.create();
        world.attach(entity, Position { x: i as f32, y: 0.0 });

        if i % 2 == 0 {
            world.attach(entity, Velocity { dx: 1.0, dy: 0.5 });
        }
    }

    for step in 0..3 {
        world.view::<(Position, Velocity), _>(|_, (position, velocity)| {
            position.x += velocity.dx;
            position.y += velocity.dy;
        });

        println!("step {}:", step);
        world.view::<(Position,), _>(|entity, (position,)| {
            println!("  {:?}: {:?}", entity, position);
        });
    }

    println!("entities: {}", world.entity_count());
    println!("positions: {}", world.count::<Position>());
    println!("velocities: {}", world.count::<Velocity>());
}
