//! Ranking behavior tests against a synthetic process source.
//!
//! The live-system path is exercised by one smoke test at the bottom;
//! everything else injects deterministic candidates so ordering, stability
//! and the join barrier can be asserted exactly.

use std::cmp::Ordering;
use std::time::{Duration, Instant};

use hoststats::top::{by_cpu, by_memory, Candidate, CpuSampler, ProcessSource, Ranker, TopProcess};
use hoststats::Result;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn record(pid: u32, cmd_line: &str, rss_bytes: u64) -> TopProcess {
    TopProcess {
        user: "tester".to_string(),
        pid,
        ppid: 1,
        status: "Sleep".to_string(),
        cmd_line: cmd_line.to_string(),
        create_time: 1_700_000_000,
        cpu_percent: 0.0,
        rss_bytes,
    }
}

/// Sampler returning a fixed value after an optional artificial delay.
struct FakeSampler {
    cpu: f32,
    delay: Duration,
}

impl CpuSampler for FakeSampler {
    fn cpu_percent(&mut self, _window: Duration) -> f32 {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.cpu
    }
}

/// Source yielding scripted candidates: (record, cpu value, sample delay).
struct FakeSource(Vec<(TopProcess, f32, Duration)>);

impl FakeSource {
    fn quick(entries: Vec<(TopProcess, f32)>) -> Self {
        FakeSource(
            entries
                .into_iter()
                .map(|(r, cpu)| (r, cpu, Duration::ZERO))
                .collect(),
        )
    }
}

impl ProcessSource for FakeSource {
    type Sampler = FakeSampler;

    fn candidates(&self) -> Result<Vec<Candidate<FakeSampler>>> {
        Ok(self
            .0
            .iter()
            .map(|(record, cpu, delay)| Candidate {
                record: record.clone(),
                sampler: FakeSampler {
                    cpu: *cpu,
                    delay: *delay,
                },
            })
            .collect())
    }
}

#[tokio::test]
async fn test_memory_ranking_end_to_end() {
    init_tracing();
    let source = FakeSource::quick(vec![
        (record(100, "small", 100), 0.0),
        (record(101, "large", 300), 0.0),
        (record(102, "medium", 200), 0.0),
    ]);
    let top = Ranker::with_source(source)
        .rank(2, by_memory)
        .await
        .expect("rank");

    assert_eq!(top.len(), 2);
    assert_eq!(top[0].rss_bytes, 300);
    assert_eq!(top[1].rss_bytes, 200);
}

#[tokio::test]
async fn test_ranking_is_non_increasing() {
    init_tracing();
    let source = FakeSource::quick(vec![
        (record(1, "a", 0), 12.0),
        (record(2, "b", 0), 80.5),
        (record(3, "c", 0), 3.25),
        (record(4, "d", 0), 80.5),
        (record(5, "e", 0), 44.0),
    ]);
    let top = Ranker::with_source(source)
        .rank(5, by_cpu)
        .await
        .expect("rank");

    assert_eq!(top.len(), 5);
    for pair in top.windows(2) {
        assert_ne!(
            by_cpu(&pair[0], &pair[1]),
            Ordering::Greater,
            "{} before {} violates the comparator",
            pair[0].pid,
            pair[1].pid
        );
    }
}

#[tokio::test]
async fn test_equal_metrics_keep_enumeration_order() {
    init_tracing();
    // Two pairs of equal-CPU records at known enumeration positions.
    let source = FakeSource::quick(vec![
        (record(10, "first-high", 0), 50.0),
        (record(20, "low", 0), 1.0),
        (record(30, "second-high", 0), 50.0),
        (record(40, "first-low", 0), 1.0),
    ]);
    let top = Ranker::with_source(source)
        .rank(4, by_cpu)
        .await
        .expect("rank");

    let pids: Vec<u32> = top.iter().map(|p| p.pid).collect();
    // 50.0 ties: pid 10 enumerated before pid 30; 1.0 ties: 20 before 40.
    assert_eq!(pids, vec![10, 30, 20, 40]);
}

#[tokio::test]
async fn test_empty_cmdline_candidates_are_excluded() {
    init_tracing();
    let source = FakeSource::quick(vec![
        (record(1, "a", 10), 1.0),
        (record(2, "b", 20), 1.0),
        (record(3, "", 99), 1.0),
        (record(4, "d", 40), 1.0),
        (record(5, "e", 50), 1.0),
    ]);
    let top = Ranker::with_source(source)
        .rank(100, by_memory)
        .await
        .expect("rank");

    assert_eq!(top.len(), 4);
    assert!(top.iter().all(|p| p.pid != 3));
}

#[tokio::test]
async fn test_degraded_record_is_still_ranked() {
    init_tracing();
    // Everything except the command line failed to read: zero values.
    let degraded = TopProcess {
        user: String::new(),
        pid: 0,
        ppid: 0,
        status: String::new(),
        cmd_line: "ghost".to_string(),
        create_time: 0,
        cpu_percent: 0.0,
        rss_bytes: 0,
    };
    let source = FakeSource::quick(vec![(degraded, 0.0), (record(2, "healthy", 100), 0.0)]);
    let top = Ranker::with_source(source)
        .rank(10, by_memory)
        .await
        .expect("rank");

    assert_eq!(top.len(), 2);
    assert_eq!(top[1].cmd_line, "ghost");
    assert!(top[1].user.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_join_barrier_waits_for_slowest_sample() {
    init_tracing();
    let slow = Duration::from_millis(300);
    let source = FakeSource(vec![
        (record(1, "fast", 0), 5.0, Duration::ZERO),
        (record(2, "slow", 0), 99.0, slow),
        (record(3, "fast-too", 0), 1.0, Duration::ZERO),
    ]);
    let started = Instant::now();
    let top = Ranker::with_source(source)
        .rank(3, by_cpu)
        .await
        .expect("rank");

    // The call cannot return before the slowest sample finished, and the
    // slow record must carry its completed sample, not a pending zero.
    assert!(started.elapsed() >= slow);
    assert_eq!(top[0].pid, 2);
    assert_eq!(top[0].cpu_percent, 99.0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sample_timeout_degrades_to_zero() {
    init_tracing();
    let source = FakeSource(vec![
        (record(1, "wedged", 0), 77.0, Duration::from_secs(5)),
        (record(2, "fine", 0), 10.0, Duration::ZERO),
    ]);
    let started = Instant::now();
    let top = Ranker::with_source(source)
        .sample_timeout(Duration::from_millis(100))
        .rank(2, by_cpu)
        .await
        .expect("rank");

    assert!(
        started.elapsed() < Duration::from_secs(5),
        "timed-out sample stalled the batch"
    );
    assert_eq!(top[0].pid, 2);
    assert_eq!(top[0].cpu_percent, 10.0);
    let wedged = top.iter().find(|p| p.pid == 1).expect("wedged included");
    assert_eq!(wedged.cpu_percent, 0.0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_bounded_concurrency_gives_same_results() {
    init_tracing();
    let entries: Vec<(TopProcess, f32)> = (1..=20)
        .map(|i| (record(i, "proc", (i as u64) * 10), i as f32))
        .collect();

    let unbounded = Ranker::with_source(FakeSource::quick(entries.clone()))
        .rank(20, by_cpu)
        .await
        .expect("rank");
    let bounded = Ranker::with_source(FakeSource::quick(entries))
        .max_concurrency(2)
        .rank(20, by_cpu)
        .await
        .expect("rank");

    let lhs: Vec<u32> = unbounded.iter().map(|p| p.pid).collect();
    let rhs: Vec<u32> = bounded.iter().map(|p| p.pid).collect();
    assert_eq!(lhs, rhs);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_live_system_ranking_smoke() {
    init_tracing();
    let top = Ranker::new()
        .window(Duration::from_millis(200))
        .rank(5, by_memory)
        .await
        .expect("rank live processes");

    assert!(!top.is_empty());
    assert!(top.len() <= 5);
    for pair in top.windows(2) {
        assert!(pair[0].rss_bytes >= pair[1].rss_bytes);
    }
    for p in &top {
        assert!(!p.cmd_line.is_empty());
    }
}
