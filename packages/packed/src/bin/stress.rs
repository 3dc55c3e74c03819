use std::time::Instant;

use packed::{component, SparseSet, World};

#[derive(Debug, Clone, Copy, Default)]
pub struct Payload(u64);

#[derive(Debug, Clone, Copy, Default)]
pub struct Tag(u32);

component!(Payload);
component!(Tag);

const N: u32 = 1_000_000;

fn time(label: &str, f: impl FnOnce()) {
    let start = Instant::now();
    f();
    println!("{}: {:?}", label, start.elapsed());
}

fn main() {
    let mut set = SparseSet::new();

    time("sparse insert 1M sequential", || {
        for i in 0..N {
            set.insert(i, Payload(i as u64));
        }
    });

    time("sparse lookup 1M", || {
        let mut total = 0u64;
        for i in 0..N {
            total = total.wrapping_add(set.get(i).0);
        }
        assert!(total > 0);
    });

    time("sparse erase every third", || {
        let mut i = 0;
        while i < N {
            set.erase(i);
            i += 3;
        }
    });

    time("sparse reinsert erased", || {
        let mut i = 0;
        while i < N {
            set.insert(i, Payload(0));
            i += 3;
        }
    });
    assert_eq!(set.len(), N as usize);

    let mut world = World::new();
    let mut entities = Vec::with_capacity(N as usize);

    time("world create 1M entities", || {
        for _ in 0..N {
            entities.push(world.create());
        }
    });

    time("world attach payload to all, tag to every fourth", || {
        for (i, &entity) in entities.iter().enumerate() {
            world.attach(entity, Payload(i as u64));
            if i % 4 == 0 {
                world.attach(entity, Tag(i as u32));
            }
        }
    });

    time("view over (Payload)", || {
        let mut visited = 0usize;
        world.view::<(Payload,), _>(|_, (payload,)| {
            payload.0 = payload.0.wrapping_mul(3);
            visited += 1;
        });
        assert_eq!(visited, N as usize);
    });

    time("view over (Payload, Tag)", || {
        let mut visited = 0usize;
        world.view::<(Payload, Tag), _>(|_, _| visited += 1);
        assert_eq!(visited, N as usize / 4);
    });

    time("destroy every other entity", || {
        for &entity in entities.iter().step_by(2) {
            world.destroy(entity);
        }
    });
    println!("entities left: {}", world.entity_count());

    time("view after destruction", || {
        let mut visited = 0usize;
        world.view::<(Payload,), _>(|_, _| visited += 1);
        assert_eq!(visited, N as usize / 2);
    });
}
