//! Weekly invitation quota
//!
//! Counts are recomputed from the ledger on every call; nothing is cached.
//! Weeks start on Monday at 00:00 in the caller's timezone.

use crate::storage::InviteLedger;
use chrono::{DateTime, Datelike, Days, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use prospector_core::{Contact, InviteRecord, Result};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        // Midnight skipped by a DST change
        .or_else(|| {
            tz.from_local_datetime(&(midnight + chrono::Duration::hours(1)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// `[start, end)` of the Monday-based week containing `now`
pub fn week_bounds<Tz: TimeZone>(now: &DateTime<Tz>) -> (DateTime<Utc>, DateTime<Utc>) {
    let tz = now.timezone();
    let today = now.date_naive();
    let monday = today - Days::new(u64::from(now.weekday().num_days_from_monday()));
    let start = local_midnight(&tz, monday);
    let end = local_midnight(&tz, monday + Days::new(7));
    (start, end)
}

/// Weekly usage for one user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotaStats {
    pub count: usize,
    pub limit: usize,
    pub remaining: usize,
    pub percentage: f64,
    pub can_send: bool,
}

impl QuotaStats {
    fn new(count: usize, limit: usize) -> Self {
        let percentage = if limit == 0 {
            100.0
        } else {
            count as f64 / limit as f64 * 100.0
        };
        Self {
            count,
            limit,
            remaining: limit.saturating_sub(count),
            percentage,
            can_send: count < limit,
        }
    }
}

/// Per-user weekly invite cap over an [`InviteLedger`]
#[derive(Debug, Clone)]
pub struct WeeklyQuota {
    ledger: Arc<InviteLedger>,
    limit: usize,
}

impl WeeklyQuota {
    pub fn new(ledger: Arc<InviteLedger>, limit: usize) -> Self {
        Self { ledger, limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn ledger(&self) -> &InviteLedger {
        &self.ledger
    }

    /// Invites recorded for `user_email` in the week containing `now`
    pub async fn count_in_week<Tz: TimeZone>(
        &self,
        user_email: &str,
        now: &DateTime<Tz>,
    ) -> Result<usize> {
        let (start, end) = week_bounds(now);
        let records = self.ledger.load_all().await?;
        Ok(records
            .iter()
            .filter(|r| r.user_email.eq_ignore_ascii_case(user_email))
            .filter(|r| r.timestamp >= start && r.timestamp < end)
            .count())
    }

    pub async fn count_this_week(&self, user_email: &str) -> Result<usize> {
        self.count_in_week(user_email, &Local::now()).await
    }

    /// Whether another invite fits this week, and the current count
    pub async fn can_send(&self, user_email: &str) -> Result<(bool, usize)> {
        let count = self.count_this_week(user_email).await?;
        Ok((count < self.limit, count))
    }

    pub async fn stats(&self, user_email: &str) -> Result<QuotaStats> {
        self.stats_at(user_email, &Local::now()).await
    }

    pub async fn stats_at<Tz: TimeZone>(
        &self,
        user_email: &str,
        now: &DateTime<Tz>,
    ) -> Result<QuotaStats> {
        let count = self.count_in_week(user_email, now).await?;
        Ok(QuotaStats::new(count, self.limit))
    }
}

/// Result of [`QuotaGate::record_invite`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    /// Appended; `week_count` includes the new record
    Recorded { week_count: usize },
    /// Not appended, the weekly limit was already reached
    LimitReached { week_count: usize },
}

/// Check-then-append under one lock
///
/// Share a single gate (behind an `Arc`) between every run of the process.
/// Writers in other processes are not coordinated.
#[derive(Debug)]
pub struct QuotaGate {
    quota: WeeklyQuota,
    lock: Mutex<()>,
}

impl QuotaGate {
    pub fn new(quota: WeeklyQuota) -> Self {
        Self {
            quota,
            lock: Mutex::new(()),
        }
    }

    pub fn quota(&self) -> &WeeklyQuota {
        &self.quota
    }

    /// Record an invite sent now, unless the weekly limit is reached
    pub async fn record_invite(
        &self,
        user_email: &str,
        contact: &Contact,
        source_query: &str,
    ) -> Result<QuotaDecision> {
        let now = Local::now();
        let record =
            InviteRecord::from_contact(contact, user_email, source_query, now.with_timezone(&Utc));
        self.record_at(record, &now).await
    }

    /// Record `record`, counting against the week containing `now`
    pub async fn record_at<Tz: TimeZone>(
        &self,
        record: InviteRecord,
        now: &DateTime<Tz>,
    ) -> Result<QuotaDecision> {
        let _guard = self.lock.lock().await;
        let count = self.quota.count_in_week(&record.user_email, now).await?;

        if count >= self.quota.limit {
            warn!(
                user = %record.user_email,
                count,
                limit = self.quota.limit,
                "Weekly invite limit reached, not recording"
            );
            return Ok(QuotaDecision::LimitReached { week_count: count });
        }

        self.quota.ledger.append(&record).await?;
        info!(
            user = %record.user_email,
            week_count = count + 1,
            "Invite recorded"
        );
        Ok(QuotaDecision::Recorded {
            week_count: count + 1,
        })
    }
}
