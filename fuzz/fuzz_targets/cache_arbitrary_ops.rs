#![no_main]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use libfuzzer_sys::fuzz_target;
use opaque_cache::cache::Cache;
use opaque_cache::callbacks::CallbackTable;

// Fuzz arbitrary operation sequences on Cache
//
// Tests random sequences of set, get, remove, remove_all and retain/release
// with a deliberately weak hash, checking that every stored value is
// destroyed exactly once by the time the cache is gone.
fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let created = Arc::new(AtomicUsize::new(0));
    let destroyed = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&destroyed);
    let callbacks = CallbackTable::<u8, u32>::new(|k| u64::from(*k % 4), |a, b| a == b)
        .with_destroy_value(move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
        });
    let cache = Cache::create("fuzz", callbacks);
    let mut held = Vec::new();

    let mut idx = 0;
    while idx + 1 < data.len() {
        let op = data[idx] % 6;
        let key = data[idx + 1];

        match op {
            0 => {
                cache.set(key, u32::from(key)).unwrap();
                created.fetch_add(1, Ordering::SeqCst);
            }
            1 => {
                if let Some(value) = cache.get(&key).unwrap() {
                    assert_eq!(*value, u32::from(key));
                }
            }
            2 => {
                let present = cache.contains(&key).unwrap();
                assert_eq!(cache.remove(&key).unwrap(), present);
            }
            3 => {
                cache.remove_all().unwrap();
                assert!(cache.is_empty().unwrap());
            }
            4 => {
                // Retain and keep holding
                if let Some(value) = cache.get(&key).unwrap() {
                    held.push(value);
                }
            }
            5 => {
                // Release the oldest retained value
                if !held.is_empty() {
                    let value = held.remove(0);
                    cache.release_value(value).unwrap();
                }
            }
            _ => unreachable!(),
        }

        cache.check_invariants().unwrap();
        idx += 2;
    }

    cache.destroy().unwrap();
    drop(cache);
    drop(held);
    assert_eq!(
        destroyed.load(Ordering::SeqCst),
        created.load(Ordering::SeqCst)
    );
});
