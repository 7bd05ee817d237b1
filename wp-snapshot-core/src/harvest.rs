//! High-level harvest loop: drives the page fetcher until the target is met or
//! the source stops answering, and gates the result on a minimum yield.
//!
//! # State machine
//!
//! ```text
//! FETCHING --Posts--> (normalize, pause, page += 1) --> FETCHING
//! FETCHING --Blocked--> (rotate identity, cool down) --> FETCHING   same page
//! FETCHING --EndOfData | Fatal | retries exhausted | target reached--> DONE
//! ```
//!
//! # Responsibilities
//! - One page in flight at a time, starting at page 1
//! - The page counter only advances after a successfully processed page
//! - Blocked pages are retried with a fresh identity, at most
//!   `max_block_retries` consecutive times
//! - Whatever stops the loop, a result under `min_records` becomes an empty
//!   snapshot so a short harvest never replaces a good published one
//!
//! # Error Handling
//! Nothing escapes: fetch failures end the loop and are recorded in the
//! report's [`StopReason`].
//!
//! # Navigation
//! - Main entrypoint: [`harvest`]
//! - Output: [`HarvestReport`]

use tracing::{error, info, warn};

use crate::config::HarvestConfig;
use crate::contract::{NormalizedRecord, PageFetcher, PageOutcome, Pacer, Pause};
use crate::identity::IdentityPool;
use crate::normalize::normalize_page;
use crate::snapshot::Snapshot;

/// Why the fetch loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    TargetReached,
    EndOfData,
    /// Fetch failed. Network failures are paced by a back-off first.
    Fatal(String),
    /// The same page stayed blocked through every allowed retry.
    BlockedRetriesExhausted { page: u32, attempts: u32 },
}

#[derive(Debug)]
pub struct HarvestReport {
    /// Gated result: either every accumulated record or none.
    pub snapshot: Snapshot,
    pub stop_reason: StopReason,
    /// Pages successfully processed (the number of times the counter advanced).
    pub pages_fetched: u32,
    /// Total blocked responses seen across the run.
    pub blocked_attempts: u32,
    /// Records gathered before the minimum-yield gate.
    pub accumulated: usize,
    /// True when the gate discarded the accumulated records.
    pub gated: bool,
}

/// Harvest up to `target_count` records.
///
/// `identities` supplies the identity sent with each request and is rotated
/// after every blocked response.
pub async fn harvest<F, P>(
    config: &HarvestConfig,
    fetcher: &F,
    pacer: &P,
    identities: &mut IdentityPool,
    target_count: usize,
) -> HarvestReport
where
    F: PageFetcher + ?Sized,
    P: Pacer + ?Sized,
{
    info!(
        target_count,
        page_size = config.page_size,
        min_records = config.min_records,
        "[HARVEST] Starting harvest"
    );

    let mut records: Vec<NormalizedRecord> = Vec::new();
    let mut page: u32 = 1;
    let mut pages_fetched: u32 = 0;
    let mut blocked_attempts: u32 = 0;
    let mut consecutive_blocks: u32 = 0;

    let stop_reason = loop {
        if records.len() >= target_count {
            break StopReason::TargetReached;
        }

        let outcome = fetcher
            .fetch_page(page, config.page_size, identities.current())
            .await;

        match outcome {
            PageOutcome::Posts(posts) => {
                consecutive_blocks = 0;
                let raw = posts.len();
                let normalized = normalize_page(page, posts, config.max_body_chars);
                records.extend(normalized);
                pages_fetched += 1;
                info!(
                    page,
                    raw,
                    total = records.len(),
                    "[HARVEST] Page processed"
                );
                pacer.pause(Pause::BetweenPages).await;
                page += 1;
            }
            PageOutcome::EndOfData => {
                info!(page, total = records.len(), "[HARVEST] No more posts");
                break StopReason::EndOfData;
            }
            PageOutcome::Blocked { status } => {
                blocked_attempts += 1;
                consecutive_blocks += 1;
                if consecutive_blocks > config.max_block_retries {
                    error!(
                        page,
                        status,
                        attempts = consecutive_blocks,
                        "[HARVEST][ERROR] Page still blocked after all retries, stopping"
                    );
                    break StopReason::BlockedRetriesExhausted {
                        page,
                        attempts: consecutive_blocks,
                    };
                }
                let next = identities.rotate();
                warn!(
                    page,
                    status,
                    attempt = consecutive_blocks,
                    identity = next.name,
                    "[HARVEST] Blocked, rotating identity and cooling down"
                );
                pacer.pause(Pause::BlockedCooldown).await;
            }
            PageOutcome::Fatal(e) => {
                if e.is_network() {
                    pacer.pause(Pause::NetworkBackoff).await;
                }
                error!(page, error = %e, total = records.len(), "[HARVEST][ERROR] Fetch failed, stopping");
                break StopReason::Fatal(e.to_string());
            }
        }
    };

    records.truncate(target_count);
    let accumulated = records.len();
    let gated = accumulated < config.min_records;
    let snapshot = if gated {
        warn!(
            accumulated,
            min_records = config.min_records,
            ?stop_reason,
            "[HARVEST] Yield below minimum, discarding harvest"
        );
        Snapshot::empty()
    } else {
        Snapshot::new(records)
    };

    info!(
        records = snapshot.len(),
        pages_fetched,
        blocked_attempts,
        ?stop_reason,
        "[HARVEST] Harvest finished"
    );

    HarvestReport {
        snapshot,
        stop_reason,
        pages_fetched,
        blocked_attempts,
        accumulated,
        gated,
    }
}
