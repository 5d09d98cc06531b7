// SPDX-License-Identifier: MIT OR Apache-2.0

// Concurrency correctness tests - no two callers may ever receive the
// same counter value, across threads hammering one (tenant, sequence).

use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

use serialflux_rust::core::model::{GenerationContext, Sequence};
use serialflux_rust::core::service::GenerationService;
use serialflux_rust::core::store::{
    InMemorySequenceStore, SequenceBackend, SequenceStore, SerialNumberLogStore,
    SqliteSequenceStore,
};

const THREADS: usize = 8;
const PER_THREAD: usize = 25;

fn hammer(backend: Arc<dyn SequenceBackend>) -> Vec<String> {
    let service = Arc::new(GenerationService::new(backend));
    service
        .create_sequence(Sequence::new("acme", "po", "PO-{COUNTER:6}").with_padding(6))
        .unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let mut handles = Vec::new();
    for _ in 0..THREADS {
        let service = Arc::clone(&service);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            let ctx = GenerationContext::new();
            let mut numbers = Vec::with_capacity(PER_THREAD);
            for _ in 0..PER_THREAD {
                numbers.push(service.generate("acme", "po", &ctx).unwrap());
            }
            numbers
        }));
    }

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.join().unwrap());
    }
    all
}

fn assert_unique_and_dense(numbers: &[String], backend: &dyn SequenceBackend) {
    let total = THREADS * PER_THREAD;
    assert_eq!(numbers.len(), total);

    let unique: HashSet<&String> = numbers.iter().collect();
    assert_eq!(unique.len(), total, "duplicate serial numbers generated");

    // every counter value 1..=total issued exactly once
    let seq = backend.find("acme", "po").unwrap().unwrap();
    assert_eq!(seq.current_value, total as u64);

    let mut counters: Vec<u64> = backend
        .entries_for(seq.id)
        .unwrap()
        .iter()
        .map(|e| e.counter_value)
        .collect();
    counters.sort_unstable();
    assert_eq!(counters, (1..=total as u64).collect::<Vec<_>>());

    assert_eq!(backend.entry_count().unwrap(), total);
    assert!(backend.verify_chain().unwrap(), "audit chain broken");
}

#[test]
fn test_concurrent_generation_in_memory() {
    let backend = Arc::new(InMemorySequenceStore::new());
    let numbers = hammer(backend.clone());
    assert_unique_and_dense(&numbers, backend.as_ref());
}

#[test]
fn test_concurrent_generation_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(SqliteSequenceStore::open(dir.path().join("seq.db")).unwrap());
    let numbers = hammer(backend.clone());
    assert_unique_and_dense(&numbers, backend.as_ref());
}

#[test]
fn test_concurrent_step_size_strictly_increases() {
    let backend = Arc::new(InMemorySequenceStore::new());
    let service = Arc::new(GenerationService::new(backend.clone()));
    service
        .create_sequence(Sequence::new("acme", "grn", "{COUNTER:6}").with_step_size(5))
        .unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let mut handles = Vec::new();
    for _ in 0..THREADS {
        let service = Arc::clone(&service);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            let ctx = GenerationContext::new();
            for _ in 0..PER_THREAD {
                service.generate("acme", "grn", &ctx).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let seq = backend.find("acme", "grn").unwrap().unwrap();
    let total = (THREADS * PER_THREAD) as u64;
    assert_eq!(seq.current_value, total * 5);

    let mut counters: Vec<u64> = backend
        .entries_for(seq.id)
        .unwrap()
        .iter()
        .map(|e| e.counter_value)
        .collect();
    counters.sort_unstable();
    let expected: Vec<u64> = (1..=total).map(|n| n * 5).collect();
    assert_eq!(counters, expected, "counters must advance by step_size");
}

#[test]
fn test_preview_under_concurrency_never_consumes() {
    let backend = Arc::new(InMemorySequenceStore::new());
    let service = Arc::new(GenerationService::new(backend.clone()));
    service
        .create_sequence(Sequence::new("acme", "inv", "INV-{COUNTER:4}"))
        .unwrap();

    let mut handles = Vec::new();
    for worker in 0..THREADS {
        let service = Arc::clone(&service);
        handles.push(thread::spawn(move || {
            let ctx = GenerationContext::new();
            for _ in 0..PER_THREAD {
                if worker % 2 == 0 {
                    service.generate("acme", "inv", &ctx).unwrap();
                } else {
                    service.preview("acme", "inv", &ctx).unwrap();
                }
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let generated = (THREADS / 2) * PER_THREAD;
    let seq = backend.find("acme", "inv").unwrap().unwrap();
    assert_eq!(
        seq.current_value, generated as u64,
        "previews must not advance the counter"
    );
    assert_eq!(
        backend.entry_count().unwrap(),
        generated,
        "previews must never appear in the log"
    );
}
