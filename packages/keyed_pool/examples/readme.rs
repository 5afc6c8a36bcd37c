//! Example that demonstrates the usage shown in the package documentation.
//!
//! Enemies come from a registry of pools keyed by enemy kind. The template of each kind is
//! "loaded" asynchronously the first time that kind is requested.

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use futures::executor::block_on;
use futures::future;
use keyed_pool::{Hooks, PoolRegistry, Poolable};

#[derive(Clone, Debug)]
struct Enemy {
    kind: &'static str,
    health: u32,
    active: bool,
}

impl Poolable for Enemy {
    fn on_rented_from_pool(&mut self) {
        self.active = true;
        self.health = 100;
    }

    fn on_returned_to_pool(&mut self) {
        self.active = false;
    }
}

type SharedEnemy = Rc<RefCell<Enemy>>;

async fn load_enemy(kind: &'static str) -> Result<SharedEnemy, Infallible> {
    println!("Loading template for {kind}");

    Ok(Rc::new(RefCell::new(Enemy {
        kind,
        health: 0,
        active: false,
    })))
}

fn hooks() -> Hooks<SharedEnemy> {
    Hooks::new()
        .on_acquire(|e: &mut SharedEnemy| e.borrow_mut().on_rented_from_pool())
        .on_release(|e: &mut SharedEnemy| e.borrow_mut().on_returned_to_pool())
}

fn clone_enemy(template: &SharedEnemy) -> SharedEnemy {
    Rc::new(RefCell::new(template.borrow().clone()))
}

fn main() {
    println!("=== Keyed Pool README Example ===");

    let registry = PoolRegistry::new();

    block_on(async {
        // Both requests arrive before the template is loaded; it is only loaded once.
        let (goblin, also_goblin) = future::join(
            registry.get("goblin", || load_enemy("goblin"), clone_enemy, hooks()),
            registry.get("goblin", || load_enemy("goblin"), clone_enemy, hooks()),
        )
        .await;

        let goblin = goblin.unwrap();
        let also_goblin = also_goblin.unwrap();

        goblin.borrow_mut().health -= 30;
        println!("Goblin: {:?}", goblin.borrow());
        println!("Other goblin: {:?}", also_goblin.borrow());

        registry.release(goblin);
        registry.release(also_goblin);

        let troll = registry
            .get("troll", || load_enemy("troll"), clone_enemy, hooks())
            .await
            .unwrap();
        println!("Troll: {:?}", troll.borrow());
        registry.release(troll);
    });

    println!("Pools: {}", registry.len());
    println!("Goblin pool: {:?}", registry.stats::<SharedEnemy>("goblin"));

    println!("README example completed successfully!");
}
