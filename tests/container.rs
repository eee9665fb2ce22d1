use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Barrier,
    },
    thread,
    time::Duration,
};

use slotgraph::{Container, Deps, ResolveError};

struct Counter(Arc<AtomicUsize>);

impl Counter {
    fn new() -> Self {
        Counter(Arc::new(AtomicUsize::new(0)))
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn share(&self) -> Counter {
        Counter(self.0.clone())
    }
}

struct Value(u32);

#[test]
fn concurrent_reads_construct_once() {
    let runs = Counter::new();
    let container = Container::new();
    {
        let runs = runs.share();
        container.setup(move |r| {
            r.provide(move |_: Deps<()>| {
                runs.bump();
                Value(7)
            });
        });
    }

    let barrier = Arc::new(Barrier::new(8));
    let readers: Vec<_> = (0..8)
        .map(|_| {
            let container = container.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                container.get::<Value>().unwrap()
            })
        })
        .collect();

    let values: Vec<Arc<Value>> = readers.into_iter().map(|t| t.join().unwrap()).collect();

    assert_eq!(runs.count(), 1);
    assert_eq!(values[0].0, 7);
    for pair in values.windows(2) {
        assert!(Arc::ptr_eq(&pair[0], &pair[1]));
    }
}

#[test]
fn factory_not_invoked_before_first_read() {
    let runs = Counter::new();
    let container = Container::new();
    {
        let runs = runs.share();
        container.setup(move |r| {
            r.provide(move |_: Deps<()>| {
                runs.bump();
                Value(1)
            });
        });
    }

    assert_eq!(runs.count(), 0);
    container.get::<Value>();
    assert_eq!(runs.count(), 1);
}

#[test]
fn repeated_reads_are_idempotent() {
    let runs = Counter::new();
    let container = Container::new();
    {
        let runs = runs.share();
        container.setup(move |r| {
            r.provide(move |_: Deps<()>| {
                runs.bump();
                Value(3)
            });
        });
    }

    let first = container.get::<Value>().unwrap();
    let second = container.get::<Value>().unwrap();
    let third = container.get::<Value>().unwrap();

    assert_eq!(runs.count(), 1);
    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&second, &third));
}

#[test]
fn unregistered_slot_reads_as_none() {
    struct Nobody;

    let container = Container::new();
    container.setup(|r| {
        r.insert(Value(1));
    });

    assert!(container.get::<Nobody>().is_none());
    assert!(container.try_get::<Nobody>().unwrap().is_none());
}

struct SvcA {
    value: u32,
    peers: Deps<(SvcB, SvcC)>,
}

struct SvcB {
    value: u32,
    peers: Deps<(SvcC,)>,
}

struct SvcC {
    value: u32,
}

#[test]
fn mutually_referencing_services_resolve_on_demand() {
    let a_runs = Counter::new();
    let b_runs = Counter::new();
    let c_runs = Counter::new();

    let container = Container::new();
    {
        let a_runs = a_runs.share();
        let b_runs = b_runs.share();
        let c_runs = c_runs.share();
        container.setup(move |r| {
            // A reads nothing during construction; its peers are for later.
            r.provide(move |peers: Deps<(SvcB, SvcC)>| {
                a_runs.bump();
                SvcA { value: 42, peers }
            });
            r.provide(move |peers: Deps<(SvcC,)>| {
                b_runs.bump();
                SvcB { value: 24, peers }
            });
            // C eagerly reads A, which is safe because A defers its reads.
            r.provide(move |peers: Deps<(SvcA, SvcB)>| {
                c_runs.bump();
                SvcC {
                    value: peers.get::<SvcA, _>().map_or(0, |a| a.value),
                }
            });
        });
    }

    // Reading C first pulls A in through C's constructor.
    let c = container.get::<SvcC>().unwrap();
    assert_eq!(c.value, 42);
    assert_eq!(a_runs.count(), 1);
    assert_eq!(c_runs.count(), 1);
    assert_eq!(b_runs.count(), 0);

    // Later reads come from the cache, from anyone.
    let a = container.get::<SvcA>().unwrap();
    let b = container.get::<SvcB>().unwrap();
    assert_eq!(a.value, 42);
    assert_eq!(b.value, 24);
    assert!(Arc::ptr_eq(&container.get::<SvcC>().unwrap(), &c));
    assert!(Arc::ptr_eq(&a.peers.get::<SvcB, _>().unwrap(), &b));
    assert!(Arc::ptr_eq(&b.peers.get::<SvcC, _>().unwrap(), &c));

    assert_eq!(a_runs.count(), 1);
    assert_eq!(b_runs.count(), 1);
    assert_eq!(c_runs.count(), 1);
}

struct Ping {
    partner_seen: bool,
}

struct Pong {
    err: Option<ResolveError>,
}

#[test]
fn eager_cycle_fails_fast() {
    let container = Container::new();
    container.setup(|r| {
        r.provide(|deps: Deps<(Pong,)>| Ping {
            partner_seen: deps.get::<Pong, _>().is_some(),
        });
        r.provide(|deps: Deps<(Ping,)>| Pong {
            err: deps.try_get::<Ping, _>().err(),
        });
    });

    // Ping -> Pong -> Ping re-enters Ping's construction on the same
    // stack; Pong observes the cycle error and still materializes.
    let ping = container.get::<Ping>().unwrap();
    assert!(ping.partner_seen);

    let pong = container.get::<Pong>().unwrap();
    match &pong.err {
        Some(ResolveError::CyclicConstruction { slot, chain }) => {
            assert_eq!(slot.type_name, std::any::type_name::<Ping>());
            assert_eq!(chain.len(), 2);
        }
        other => panic!("expected a cycle error, got {other:?}"),
    }
}

#[test]
fn panicking_factory_does_not_strand_readers() {
    struct Flaky;

    let container = Container::new();
    container.setup(|r| {
        r.provide(|_: Deps<()>| -> Flaky { panic!("constructor failure") });
    });

    let reader = {
        let container = container.clone();
        thread::spawn(move || container.get::<Flaky>())
    };
    assert!(reader.join().is_err());

    // The factory is consumed; the slot now reads as missing.
    assert!(container.get::<Flaky>().is_none());
}

#[test]
fn waiting_on_anothers_construction_converges() {
    struct Inner(u32);
    struct Outer(u32);

    let inner_runs = Counter::new();
    let container = Container::new();
    {
        let inner_runs = inner_runs.share();
        container.setup(move |r| {
            r.provide(move |_: Deps<()>| {
                inner_runs.bump();
                // Widen the window in which the other thread can observe
                // the slot as under construction.
                thread::sleep(Duration::from_millis(20));
                Inner(5)
            });
            r.provide(|deps: Deps<(Inner,)>| {
                Outer(deps.get::<Inner, _>().map_or(0, |inner| inner.0) + 1)
            });
        });
    }

    let outer_reader = {
        let container = container.clone();
        thread::spawn(move || container.get::<Outer>().unwrap().0)
    };
    let inner_reader = {
        let container = container.clone();
        thread::spawn(move || container.get::<Inner>().unwrap().0)
    };

    assert_eq!(outer_reader.join().unwrap(), 6);
    assert_eq!(inner_reader.join().unwrap(), 5);
    assert_eq!(inner_runs.count(), 1);
}

#[test]
fn later_registration_wins_while_pending() {
    let container = Container::new();
    container.setup(|r| {
        r.provide(|_: Deps<()>| Value(1));
        r.provide(|_: Deps<()>| Value(2));
    });

    assert_eq!(container.get::<Value>().unwrap().0, 2);
}

#[test]
fn materialized_slot_is_write_once() {
    let container = Container::new();
    container.setup(|r| {
        r.insert(Value(1));
    });
    assert_eq!(container.get::<Value>().unwrap().0, 1);

    container.setup(|r| {
        r.insert(Value(9));
        r.provide(|_: Deps<()>| Value(9));
    });
    assert_eq!(container.get::<Value>().unwrap().0, 1);
}

#[test]
fn view_outliving_its_container_reports_gone() {
    struct Holder {
        deps: Deps<(Value,)>,
    }

    let container = Container::new();
    container.setup(|r| {
        r.insert(Value(1));
        r.provide(|deps: Deps<(Value,)>| Holder { deps });
    });

    let holder = container.get::<Holder>().unwrap();
    drop(container);

    assert!(matches!(
        holder.deps.try_get::<Value, _>(),
        Err(ResolveError::ContainerGone)
    ));
}
