//! Block List Store
//!
//! Owns the host set and the URL set. Both are populated by background
//! pipelines and become read-only once the readiness gate opens.
//!
//! Flow:
//! 1. `start_loading` spawns one worker per list
//! 2. Each worker inserts trimmed lines as they are read
//! 3. Each worker releases the gate once, on every exit path
//! 4. Lookups wait on the gate, then hit the set in O(1)

use crate::canonical::canonical_url;
use crate::gate::ReadinessGate;
use crate::source::{BlockListError, ListSource};
use dashmap::DashSet;
use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Number of load pipelines the gate waits for
const PIPELINES: usize = 2;

/// How a list line becomes a set member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    /// Stored as trimmed
    Host,
    /// Stored in canonical URL form, or as trimmed if it does not parse
    Url,
}

/// Outcome of one load pipeline
#[derive(Debug)]
pub struct LoadReport {
    /// Source name
    pub name: String,
    /// Entries inserted into the target set
    pub inserted: usize,
    /// Error that cut the load short, if any
    pub error: Option<BlockListError>,
}

/// Releases the gate when dropped, so a pipeline signals exactly once
/// whether it returns normally, returns early, or unwinds.
struct CompletionGuard {
    gate: Arc<ReadinessGate>,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.gate.count_down();
    }
}

/// Host and URL block sets behind a readiness gate.
///
/// Cloning is cheap and every clone sees the same sets.
#[derive(Debug, Clone)]
pub struct BlockListStore {
    hosts: Arc<DashSet<String>>,
    urls: Arc<DashSet<String>>,
    gate: Arc<ReadinessGate>,
    started: Arc<AtomicBool>,
}

impl BlockListStore {
    /// Create an empty store whose lookups block until loading completes.
    pub fn new() -> Self {
        Self {
            hosts: Arc::new(DashSet::new()),
            urls: Arc::new(DashSet::new()),
            gate: Arc::new(ReadinessGate::new(PIPELINES)),
            started: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a store that is ready immediately with fixed contents.
    pub fn from_entries<H, U>(hosts: H, urls: U) -> Self
    where
        H: IntoIterator,
        H::Item: AsRef<str>,
        U: IntoIterator,
        U::Item: AsRef<str>,
    {
        let store = Self::new();
        store.started.store(true, Ordering::Release);
        for host in hosts {
            insert_entry(&store.hosts, EntryKind::Host, host.as_ref());
        }
        for url in urls {
            insert_entry(&store.urls, EntryKind::Url, url.as_ref());
        }
        for _ in 0..PIPELINES {
            store.gate.count_down();
        }
        store
    }

    /// Spawn the host and URL load pipelines.
    ///
    /// Only the first call has any effect; the gate counts exactly one
    /// completion per pipeline.
    pub fn start_loading<H, U>(&self, hosts: H, urls: U)
    where
        H: ListSource,
        U: ListSource,
    {
        if self.started.swap(true, Ordering::AcqRel) {
            warn!("Block list loading already started, ignoring");
            return;
        }

        info!("Loading block lists '{}' and '{}'", hosts.name(), urls.name());
        self.spawn_pipeline("blocklist-hosts", hosts, EntryKind::Host, self.hosts.clone());
        self.spawn_pipeline("blocklist-urls", urls, EntryKind::Url, self.urls.clone());
    }

    fn spawn_pipeline<S: ListSource>(
        &self,
        thread_name: &str,
        source: S,
        kind: EntryKind,
        set: Arc<DashSet<String>>,
    ) {
        let guard = CompletionGuard {
            gate: self.gate.clone(),
        };

        let spawned = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || {
                let _guard = guard;
                let report = run_pipeline(&source, kind, &set);
                match report.error {
                    Some(ref e) => warn!(
                        "Block list '{}' degraded after {} entries: {}",
                        report.name, report.inserted, e
                    ),
                    None => info!("Block list '{}' loaded: {} entries", report.name, report.inserted),
                }
            });

        // If the thread never started, the closure (and its guard) was dropped
        // inside `spawn`, so the gate has already been released for it.
        if let Err(e) = spawned {
            warn!("Failed to spawn {} pipeline: {}", thread_name, e);
        }
    }

    /// Block until both pipelines have completed.
    #[inline]
    pub fn await_ready(&self) {
        self.gate.wait();
    }

    /// Whether both pipelines have completed.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.gate.is_ready()
    }

    /// Exact host membership. Waits for readiness first.
    #[inline]
    pub fn contains_host(&self, host: &str) -> bool {
        self.await_ready();
        self.hosts.contains(host)
    }

    /// Exact membership of a URL already in canonical form. Waits for readiness first.
    #[inline]
    pub fn contains_url(&self, url: &str) -> bool {
        self.await_ready();
        self.urls.contains(url)
    }

    /// Number of blocked hosts currently loaded
    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    /// Number of blocked URLs currently loaded
    pub fn url_count(&self) -> usize {
        self.urls.len()
    }
}

impl Default for BlockListStore {
    fn default() -> Self {
        Self::new()
    }
}

fn run_pipeline<S: ListSource>(source: &S, kind: EntryKind, set: &DashSet<String>) -> LoadReport {
    let start = Instant::now();
    let mut report = LoadReport {
        name: source.name().to_string(),
        inserted: 0,
        error: None,
    };

    let reader = match source.open() {
        Ok(reader) => reader,
        Err(e) => {
            report.error = Some(e);
            return report;
        }
    };

    for line in reader.lines() {
        match line {
            Ok(line) => {
                if insert_entry(set, kind, &line) {
                    report.inserted += 1;
                }
            }
            Err(e) => {
                report.error = Some(BlockListError::Io(e));
                break;
            }
        }
    }

    debug!(
        "Pipeline '{}' finished in {:?}",
        report.name,
        start.elapsed()
    );
    report
}

/// Trim and insert one line. Returns true if the set grew.
fn insert_entry(set: &DashSet<String>, kind: EntryKind, line: &str) -> bool {
    let entry = line.trim();
    if entry.is_empty() {
        return false;
    }
    let member = match kind {
        EntryKind::Host => entry.to_string(),
        EntryKind::Url => canonical_url(entry).unwrap_or_else(|e| {
            debug!("Keeping unparsable URL entry '{}' as written: {}", entry, e);
            entry.to_string()
        }),
    };
    set.insert(member)
}
