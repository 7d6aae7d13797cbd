extern crate rwtable;

use rwtable::{Config, ConcurrentHashTable, Interrupt};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

const THREADS: usize = 8;
const PER_THREAD: usize = 5000;

#[test]
fn unique_inserts() {
    let m = Arc::new(ConcurrentHashTable::new());
    let mut joins = Vec::new();

    for t in 0..THREADS {
        let m = m.clone();
        joins.push(thread::spawn(move || {
            for i in 0..PER_THREAD {
                let key = format!("{} {}", t, i);
                m.put(key.clone(), i);
                assert!(m.contains_key(&key));
            }
        }));
    }

    for j in joins {
        j.join().unwrap();
    }

    assert_eq!(m.len(), THREADS * PER_THREAD);
    assert_eq!(m.scan_len(), m.len());
    assert_eq!(m.bucket_sizes().iter().sum::<usize>(), m.len());

    for t in 0..THREADS {
        for i in 0..PER_THREAD {
            assert_eq!(m.get(&format!("{} {}", t, i)), Some(i));
        }
    }
}

#[test]
fn insert_and_delete() {
    let m = Arc::new(ConcurrentHashTable::new());
    let mut joins = Vec::new();

    for t in 0..THREADS {
        let m = m.clone();
        joins.push(thread::spawn(move || {
            for i in 0..PER_THREAD {
                let key = t * PER_THREAD + i;
                m.put(key, 1);
                assert!(m.contains_key(&key));
                assert!(m.remove(&key));
                assert!(!m.contains_key(&key));
            }
        }));
    }

    for j in joins {
        j.join().unwrap();
    }

    assert_eq!(m.len(), 0);
    assert_eq!(m.scan_len(), 0);
}

#[test]
fn atomic_insert_then_remove() {
    let m = Arc::new(ConcurrentHashTable::new());
    let finished = Arc::new(AtomicUsize::new(0));
    let mut joins = Vec::new();

    for t in 0..THREADS {
        let m = m.clone();
        let finished = finished.clone();
        joins.push(thread::spawn(move || {
            for i in 0..PER_THREAD {
                m.insert_then_remove(t * PER_THREAD + i, i);
            }
            finished.fetch_add(1, Ordering::SeqCst);
        }));
    }

    let reader = {
        let m = m.clone();
        let finished = finished.clone();
        thread::spawn(move || {
            let mut samples = 0usize;
            while finished.load(Ordering::SeqCst) != THREADS {
                // The pair is inserted and removed under one write lock, and the size is read
                // under the read lock, so no intermediate state is visible.
                assert_eq!(m.len(), 0);
                samples += 1;
            }
            samples
        })
    };

    for j in joins {
        j.join().unwrap();
    }
    reader.join().unwrap();

    assert_eq!(m.len(), 0);
    assert_eq!(m.scan_len(), 0);
}

#[test]
fn readers_and_writers() {
    let m = Arc::new(ConcurrentHashTable::with_capacity(1, 0.75).unwrap());
    let done = Arc::new(AtomicBool::new(false));
    let mut writers = Vec::new();
    let mut readers = Vec::new();

    for t in 0..4 {
        let m = m.clone();
        writers.push(thread::spawn(move || {
            for i in 0..PER_THREAD {
                m.put(t * PER_THREAD + i, t);
            }
        }));
    }

    for _ in 0..4 {
        let m = m.clone();
        let done = done.clone();
        readers.push(thread::spawn(move || {
            while !done.load(Ordering::SeqCst) {
                let len = m.len();
                assert!(len <= 4 * PER_THREAD);

                // Anything found must carry the value its writer put.
                for key in (0..4 * PER_THREAD).step_by(97) {
                    if let Some(t) = m.get(&key) {
                        assert_eq!(t, key / PER_THREAD);
                    }
                }
            }
        }));
    }

    for j in writers {
        j.join().unwrap();
    }
    done.store(true, Ordering::SeqCst);
    for j in readers {
        j.join().unwrap();
    }

    assert_eq!(m.len(), 4 * PER_THREAD);
    assert_eq!(m.scan_len(), m.len());
}

#[test]
fn iterate_while_writing() {
    let m = Arc::new(ConcurrentHashTable::new());
    for i in 0..1000 {
        m.put(i, i);
    }

    let done = Arc::new(AtomicBool::new(false));
    let writer = {
        let m = m.clone();
        let done = done.clone();
        thread::spawn(move || {
            for i in 1000..20000 {
                m.put(i, i);
                if i % 2 == 0 {
                    m.remove(&(i - 1000));
                }
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let mut rounds = 0;
    while !done.load(Ordering::SeqCst) || rounds == 0 {
        let mut count = 0;
        for (key, val) in m.iter() {
            // Keys and values are never torn, whatever the interleaving.
            assert_eq!(key, val);
            assert!(key < 20000);
            count += 1;
        }
        // Weakly consistent, but finite: a single pass can't see more than was ever inserted.
        assert!(count <= 20000);
        rounds += 1;
    }

    writer.join().unwrap();
    assert_eq!(m.len(), m.scan_len());
}

#[test]
fn iterate_quiescent() {
    let m = ConcurrentHashTable::new();
    for i in 0..100u64 {
        m.put(i, i * i);
    }

    let mut keys = HashSet::new();
    for (key, val) in m.iter() {
        assert_eq!(val, key * key);
        assert!(keys.insert(key));
    }

    assert_eq!(keys.len(), 100);
}

#[test]
fn heavy_reads_with_writers() {
    let m = Arc::new(ConcurrentHashTable::with_config(Config {
        heavy_read_delay: Duration::from_millis(1),
        ..Config::default()
    }).unwrap());
    let mut joins = Vec::new();

    for _ in 0..4 {
        let m = m.clone();
        joins.push(thread::spawn(move || {
            let interrupt = Interrupt::new();
            for _ in 0..50 {
                m.heavy_read(&interrupt).unwrap();
            }
        }));
    }

    for t in 0..2 {
        let m = m.clone();
        joins.push(thread::spawn(move || {
            for i in 0..500 {
                m.put(t * 500 + i, ());
            }
        }));
    }

    for j in joins {
        j.join().unwrap();
    }

    assert_eq!(m.len(), 1000);
}

#[test]
fn writer_waits_for_heavy_read() {
    let m = Arc::new(ConcurrentHashTable::with_config(Config {
        heavy_read_delay: Duration::from_millis(200),
        ..Config::default()
    }).unwrap());
    let (tx, rx) = mpsc::channel();

    let reader = {
        let m = m.clone();
        thread::spawn(move || {
            tx.send(Instant::now()).unwrap();
            m.heavy_read(&Interrupt::new())
        })
    };

    let started = rx.recv().unwrap();
    thread::sleep(Duration::from_millis(20));

    let put = Instant::now();
    m.put(1, 1);
    let waited = put.elapsed();

    assert_eq!(reader.join().unwrap(), Ok(()));
    // The write lock is only granted once the read lock is given back.
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert!(waited >= Duration::from_millis(100), "put waited only {:?}", waited);
    assert_eq!(m.get(&1), Some(1));
}

#[test]
fn interrupt_heavy_readers() {
    let m = Arc::new(ConcurrentHashTable::<u32, u32>::with_config(Config {
        heavy_read_delay: Duration::from_secs(60),
        ..Config::default()
    }).unwrap());
    let mut joins = Vec::new();
    let mut interrupts = Vec::new();

    for _ in 0..3 {
        let m = m.clone();
        let interrupt = Interrupt::new();
        interrupts.push(interrupt.clone());
        joins.push(thread::spawn(move || m.heavy_read(&interrupt)));
    }

    thread::sleep(Duration::from_millis(20));
    for interrupt in &interrupts {
        interrupt.interrupt();
    }

    for j in joins {
        assert_eq!(j.join().unwrap(), Err(rwtable::Error::Interrupted));
    }

    // Every read lock was given back.
    m.put(1, 1);
    assert_eq!(m.get(&1), Some(1));
}
