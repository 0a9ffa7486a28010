//! Concurrent access tests for the session store.
//!
//! Many threads hammer one store at once; afterwards the table and the
//! recency list must still agree and the list must still be sorted.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use satchel_session::{MemoryStore, SessionManager, StoreConfig};
use serde_json::json;

const THREADS: usize = 8;
const SESSIONS_PER_THREAD: usize = 50;
const ROUNDS: usize = 200;

#[test]
fn test_concurrent_touches_on_distinct_ids() {
    let store = MemoryStore::new();
    for t in 0..THREADS {
        for s in 0..SESSIONS_PER_THREAD {
            store.create(&format!("t{t}-s{s}")).unwrap();
        }
    }

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let store = store.clone();
            thread::spawn(move || {
                for round in 0..ROUNDS {
                    let id = format!("t{t}-s{}", round % SESSIONS_PER_THREAD);
                    assert!(store.touch(&id));
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    store.validate().unwrap();
    assert_eq!(store.len(), THREADS * SESSIONS_PER_THREAD);

    let ids = store.ids();
    let unique: HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len(), "duplicate nodes in recency list");
}

#[test]
fn test_concurrent_mixed_operations() {
    let store = MemoryStore::new();

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let store = store.clone();
            thread::spawn(move || {
                for round in 0..ROUNDS {
                    let id = format!("t{t}-s{}", round % 10);
                    match round % 4 {
                        0 => {
                            let _ = store.create(&id);
                        }
                        1 => {
                            if let Ok(session) = store.read(&id) {
                                let _ = session.set("round", round as u64);
                            }
                        }
                        2 => {
                            store.touch(&id);
                        }
                        _ => {
                            if round % 8 == 3 {
                                store.destroy(&id).unwrap();
                            }
                        }
                    }
                    if round % 50 == 0 {
                        store.gc(Duration::from_secs(3600));
                    }
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    store.validate().unwrap();
    let stats = store.stats();
    assert_eq!(stats.live, store.len());
    assert_eq!(stats.created - stats.destroyed - stats.expired, stats.live as u64);
}

#[test]
fn test_concurrent_writes_to_shared_session() {
    let store = MemoryStore::new();
    store.create("shared").unwrap();

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let store = store.clone();
            thread::spawn(move || {
                let session = store.read("shared").unwrap();
                for i in 0..ROUNDS {
                    session.set(format!("t{t}-{i}"), json!(i)).unwrap();
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    let session = store.read("shared").unwrap();
    assert_eq!(session.keys().len(), THREADS * ROUNDS);
    assert_eq!(session.get("t0-0"), Some(json!(0)));
}

#[test]
fn test_gc_while_other_threads_work() {
    let store = MemoryStore::new();
    let manager = Arc::new(SessionManager::new(
        store.clone(),
        StoreConfig::new().with_ttl(Duration::ZERO),
    ));

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                for _ in 0..ROUNDS {
                    let started = manager.start(None).unwrap();
                    // May already be swept by a concurrent zero-TTL GC
                    let _ = started.session.set("k", 1);
                    manager.gc();
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    store.validate().unwrap();
    let stats = store.stats();
    assert_eq!(stats.created, (THREADS * ROUNDS) as u64);
    assert_eq!(stats.created - stats.expired, stats.live as u64);
}
