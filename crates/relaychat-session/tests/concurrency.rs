//! Concurrency tests for the registry and broadcaster.
//!
//! These run on a multi-threaded runtime so admits, relays and teardowns
//! genuinely race each other.

use std::collections::HashMap;
use std::sync::Arc;

use relaychat_protocol::{ClientId, ServerLine};
use relaychat_session::{
    Broadcaster, ClientSession, IdAllocator, OutboundQueue, SessionConfig, SessionGuard,
};
use tokio::sync::Barrier;

fn roomy() -> SessionConfig {
    SessionConfig {
        outbound_capacity: 4096,
    }
}

fn join(b: &Broadcaster, ids: &IdAllocator) -> (SessionGuard, OutboundQueue) {
    let (session, queue) = ClientSession::new(ids.next_id(), &roomy());
    let guard = b.admit(session).expect("fresh session should be admitted");
    (guard, queue)
}

fn drain(queue: &mut OutboundQueue) -> Vec<ServerLine> {
    let mut lines = Vec::new();
    while let Some(line) = queue.try_next() {
        lines.push(line.parse().expect("server lines should parse"));
    }
    lines
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_registry_size_matches_live_sessions() {
    const CLIENTS: usize = 50;

    let b = Broadcaster::default();
    let ids = Arc::new(IdAllocator::new());
    let all_joined = Arc::new(Barrier::new(CLIENTS + 1));
    let release = Arc::new(Barrier::new(CLIENTS + 1));

    let tasks: Vec<_> = (0..CLIENTS)
        .map(|_| {
            let b = b.clone();
            let ids = Arc::clone(&ids);
            let all_joined = Arc::clone(&all_joined);
            let release = Arc::clone(&release);
            tokio::spawn(async move {
                let (guard, _queue) = join(&b, &ids);
                let id = guard.id();
                all_joined.wait().await;
                release.wait().await;
                drop(guard);
                id
            })
        })
        .collect();

    all_joined.wait().await;
    assert_eq!(b.registry().len(), CLIENTS);
    let mut registered = b.registry().identities();
    registered.dedup();
    assert_eq!(registered.len(), CLIENTS, "no identity registered twice");

    release.wait().await;
    let mut seen = Vec::new();
    for task in tasks {
        seen.push(task.await.expect("task should not panic"));
    }

    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), CLIENTS, "every client got a distinct identity");
    assert!(b.registry().is_empty(), "every session removed itself");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_senders_each_stream_stays_ordered() {
    const SENDERS: usize = 4;
    const MESSAGES: usize = 200;

    let b = Broadcaster::default();
    let ids = IdAllocator::new();
    let (observer, mut observer_queue) = join(&b, &ids);

    let senders: Vec<_> = (0..SENDERS).map(|_| join(&b, &ids)).collect();
    let start = Arc::new(Barrier::new(SENDERS));

    let mut tasks = Vec::new();
    let mut queues = Vec::new();
    for (guard, queue) in senders {
        queues.push(queue);
        let start = Arc::clone(&start);
        tasks.push(tokio::spawn(async move {
            start.wait().await;
            for n in 0..MESSAGES {
                guard.relay(&n.to_string());
            }
            guard
        }));
    }
    let mut guards = Vec::new();
    for task in tasks {
        guards.push(task.await.expect("sender should not panic"));
    }

    let mut per_sender: HashMap<ClientId, Vec<usize>> = HashMap::new();
    for line in drain(&mut observer_queue) {
        if let ServerLine::Chat { from, text } = line {
            assert_ne!(from, observer.id(), "observer never hears itself");
            per_sender
                .entry(from)
                .or_default()
                .push(text.parse().expect("numeric payload"));
        }
    }

    assert_eq!(per_sender.len(), SENDERS);
    let expected: Vec<usize> = (0..MESSAGES).collect();
    for (from, seq) in &per_sender {
        assert_eq!(seq, &expected, "messages from {from} arrived out of order");
    }

    // Senders hear each other but never themselves.
    for (guard, queue) in guards.iter().zip(queues.iter_mut()) {
        for line in drain(queue) {
            if let ServerLine::Chat { from, .. } = line {
                assert_ne!(from, guard.id());
            }
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_churn_announces_each_join_and_leave_exactly_once() {
    const CHURNERS: usize = 40;

    let b = Broadcaster::default();
    let ids = Arc::new(IdAllocator::new());
    let (observer, mut observer_queue) = join(&b, &ids);

    // A chatty client keeps broadcasting while others come and go.
    let (chatter, _chatter_queue) = join(&b, &ids);
    let chatter_task = tokio::spawn(async move {
        for n in 0..500 {
            chatter.relay(&format!("tick {n}"));
            tokio::task::yield_now().await;
        }
        chatter
    });

    let churn: Vec<_> = (0..CHURNERS)
        .map(|_| {
            let b = b.clone();
            let ids = Arc::clone(&ids);
            tokio::spawn(async move {
                let (guard, _queue) = join(&b, &ids);
                tokio::task::yield_now().await;
                let id = guard.id();
                drop(guard);
                // Extra removals from racing error paths are harmless.
                assert!(b.registry().remove(id).is_none());
                id
            })
        })
        .collect();

    let mut churned = Vec::new();
    for task in churn {
        churned.push(task.await.expect("churn task should not panic"));
    }
    let chatter = chatter_task.await.expect("chatter should not panic");

    let mut joins: HashMap<ClientId, usize> = HashMap::new();
    let mut leaves: HashMap<ClientId, usize> = HashMap::new();
    for line in drain(&mut observer_queue) {
        match line {
            ServerLine::Joined(id) => *joins.entry(id).or_default() += 1,
            ServerLine::Left(id) => *leaves.entry(id).or_default() += 1,
            ServerLine::Chat { from, .. } => assert_eq!(from, chatter.id()),
        }
    }

    for id in &churned {
        assert_eq!(joins.get(id), Some(&1), "{id} join announced once");
        assert_eq!(leaves.get(id), Some(&1), "{id} leave announced once");
    }
    assert_eq!(
        b.registry().identities(),
        vec![observer.id(), chatter.id()],
        "only the long-lived clients remain"
    );
}
