//! Frontier queue and link priority scoring
//!
//! This module handles:
//! - Strict priority ordering of crawl tasks (FIFO among equal priorities)
//! - Tracking tasks in flight so idle workers can tell "empty" from "drained"
//! - Closing the queue once the page budget is spent

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use url::Url;

/// Priority of the crawl root
pub const ROOT_PRIORITY: i64 = 100;

const CATEGORY_BONUS: i64 = 20;
const CATEGORY_TERMS: &[&str] = &["review", "testimonial", "feedback", "faq", "about", "pricing"];

const CRITICAL_WEIGHT: i64 = 15;
const CRITICAL_TERMS: &[&str] = &[
    "about",
    "about-us",
    "who-we-are",
    "our-story",
    "brand",
    "mission",
    "values",
];

const HIGH_WEIGHT: i64 = 8;
const HIGH_TERMS: &[&str] = &[
    "services",
    "products",
    "solutions",
    "features",
    "benefits",
    "team",
    "reviews",
    "testimonials",
    "faq",
    "pricing",
];

const MEDIUM_WEIGHT: i64 = 4;
const MEDIUM_TERMS: &[&str] = &["story", "history", "awards", "news", "blog"];

/// Scores a discovered link by how much brand signal its target likely holds
///
/// Matching is a case-insensitive substring test over the URL and the
/// anchor text together.
pub fn score_link(url: &str, text: &str) -> i64 {
    let haystack = format!("{} {}", url, text).to_lowercase();
    let count = |terms: &[&str]| terms.iter().filter(|t| haystack.contains(*t)).count() as i64;

    let mut score = 0;
    if count(CATEGORY_TERMS) > 0 {
        score += CATEGORY_BONUS;
    }
    score += CRITICAL_WEIGHT * count(CRITICAL_TERMS);
    score += HIGH_WEIGHT * count(HIGH_TERMS);
    score += MEDIUM_WEIGHT * count(MEDIUM_TERMS);
    score
}

/// A URL waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    /// Normalized URL to fetch
    pub url: Url,

    /// Link distance from the root (root is 0)
    pub depth: u32,

    /// Higher values are popped first
    pub priority: i64,
}

/// Heap entry: priority first, then insertion order
#[derive(Debug)]
struct Entry {
    task: CrawlTask,
    seq: u64,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.task
            .priority
            .cmp(&other.task.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for Entry {}

#[derive(Debug, Default)]
struct Inner {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
    closed: bool,
}

/// Result of waiting on the frontier
#[derive(Debug)]
pub enum Pop<'a> {
    /// A task; dropping the guard marks it done
    Task(TaskGuard<'a>),

    /// Nothing queued and nothing in flight: the crawl is complete
    Drained,

    /// The queue was closed, usually because the page budget was reached
    Closed,

    /// Nothing became available within the wait; ask again
    Idle,
}

/// Ownership of a popped task
///
/// The task counts as in flight until the guard is dropped, so children
/// pushed while processing it are visible before it completes.
#[derive(Debug)]
pub struct TaskGuard<'a> {
    pub task: CrawlTask,
    frontier: &'a FrontierQueue,
}

impl Drop for TaskGuard<'_> {
    fn drop(&mut self) {
        self.frontier.in_flight.fetch_sub(1, AtomicOrdering::SeqCst);
        self.frontier.notify.notify_waiters();
    }
}

/// Priority queue of crawl tasks shared by all workers
#[derive(Debug, Default)]
pub struct FrontierQueue {
    inner: Mutex<Inner>,
    in_flight: AtomicUsize,
    notify: Notify,
}

impl FrontierQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a task; returns false if the queue is closed
    pub async fn push(&self, task: CrawlTask) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return false;
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.heap.push(Entry { task, seq });
        drop(inner);

        self.notify.notify_waiters();
        true
    }

    /// Takes the highest-priority task, waiting up to `wait` for one
    pub async fn pop(&self, wait: Duration) -> Pop<'_> {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // register before checking so a push between check and wait is not missed
        notified.as_mut().enable();

        {
            let mut inner = self.inner.lock().await;
            if inner.closed {
                return Pop::Closed;
            }
            if let Some(entry) = inner.heap.pop() {
                self.in_flight.fetch_add(1, AtomicOrdering::SeqCst);
                return Pop::Task(TaskGuard {
                    task: entry.task,
                    frontier: self,
                });
            }
            if self.in_flight.load(AtomicOrdering::SeqCst) == 0 {
                return Pop::Drained;
            }
        }

        let _ = tokio::time::timeout(wait, notified).await;
        Pop::Idle
    }

    /// Stops handing out tasks and wakes every waiting worker
    pub async fn close(&self) {
        self.inner.lock().await.closed = true;
        self.notify.notify_waiters();
    }

    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.closed
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.heap.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.heap.is_empty()
    }

    /// Tasks popped but not yet completed
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(AtomicOrdering::SeqCst)
    }
}
