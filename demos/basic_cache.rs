use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use opaque_cache::prelude::*;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let destroyed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&destroyed);
    let callbacks = CallbackTable::<u32, String>::new(|k| u64::from(*k), |a, b| a == b)
        .with_destroy_value(move |value| {
            println!("destroying {value}");
            counter.fetch_add(1, Ordering::SeqCst);
        });

    let cache = CacheBuilder::new("demo").initial_capacity(8).build(callbacks);
    cache.set(1, "alpha".to_string()).unwrap();
    cache.set(2, "beta".to_string()).unwrap();

    let held = cache.get(&1).unwrap().unwrap();
    cache.set(1, "gamma".to_string()).unwrap();
    println!("still holding: {}", *held);
    cache.release_value(held).unwrap();

    println!("removed 2? {}", cache.remove(&2).unwrap());
    cache.destroy().unwrap();
    println!("destroyed values: {}", destroyed.load(Ordering::SeqCst));
}

// Expected output:
// still holding: alpha
// destroying alpha
// destroying beta
// removed 2? true
// destroying gamma
// destroyed values: 3
//
// Explanation: replacing key 1 does not destroy "alpha" while it is held;
// releasing the handle does. destroy() evacuates the remaining "gamma".
