//! Installation recorder and usage aggregation

use std::net::IpAddr;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use rusqlite::TransactionBehavior;
use serde::Serialize;
use tracing::{debug, warn};

use crate::check::Check;
use crate::config::USAGE_WINDOW_HOURS;
use crate::store::{Store, StoreError, to_millis};

/// Attempts made before a contended upsert is reported as a failure
pub const MAX_UPSERT_ATTEMPTS: u32 = 5;

/// Delay between contended upsert attempts, multiplied by the attempt number
const UPSERT_RETRY_DELAY_MS: u64 = 20;

/// One row of the usage report served by `GET /packages`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageUsage {
    pub id: i64,
    pub package: String,
    /// Latest stable version resolved for the package, if any
    pub version: Option<String>,
    /// Distinct dedup tuples seen in the window
    pub unique: i64,
    /// Total checks in the window, repeats included
    pub count: i64,
}

impl Store {
    /// Record a check from `ip`, incrementing today's row for the same tuple.
    ///
    /// Returns the count stored for the tuple after this check. Busy or
    /// locked database errors are retried up to [`MAX_UPSERT_ATTEMPTS`].
    /// Blocks the calling thread while waiting; async callers run it on the
    /// blocking pool.
    pub fn record_installation(
        &self,
        check: &Check,
        ip: IpAddr,
        now: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let mut attempt = 1;
        loop {
            match self.upsert_installation(check, ip, now) {
                Err(e) if e.is_contention() && attempt < MAX_UPSERT_ATTEMPTS => {
                    debug!(
                        "Installation upsert for {} contended (attempt {}): {}",
                        check.package_name, attempt, e
                    );
                    std::thread::sleep(Duration::from_millis(
                        UPSERT_RETRY_DELAY_MS * u64::from(attempt),
                    ));
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_contention() {
                        warn!(
                            "Installation upsert for {} still contended after {} attempts",
                            check.package_name, attempt
                        );
                    }
                    return Err(e);
                }
                Ok(count) => return Ok(count),
            }
        }
    }

    fn upsert_installation(
        &self,
        check: &Check,
        ip: IpAddr,
        now: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let created_on = now.date_naive().to_string();
        let ip = ip.to_string();

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let package_id = Self::ensure_package(&tx, &check.package_name)?;

        let count: i64 = tx.query_row(
            r#"
            INSERT INTO installations
                (package_id, package_version, platform, python_version, ip, created_on, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(package_id, package_version, platform, python_version, ip, created_on)
                DO UPDATE SET count = count + 1
            RETURNING count
            "#,
            (
                package_id,
                &check.package_version,
                &check.platform,
                &check.python_version,
                &ip,
                &created_on,
                to_millis(now),
            ),
            |row| row.get(0),
        )?;

        tx.commit()?;
        Ok(count)
    }

    /// Per-package usage over the trailing window ending at `now`.
    ///
    /// Ordered by distinct tuples descending; packages without rows in the
    /// window are omitted.
    pub fn packages_report(&self, now: DateTime<Utc>) -> Result<Vec<PackageUsage>, StoreError> {
        let since = to_millis(now - TimeDelta::hours(USAGE_WINDOW_HOURS));

        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT p.id, p.package_name, p.package_version, COUNT(i.id), SUM(i.count)
            FROM installations i
            JOIN packages p ON p.id = i.package_id
            WHERE i.created_at > ?1
            GROUP BY i.package_id
            ORDER BY COUNT(i.id) DESC, MIN(i.id) ASC
            "#,
        )?;

        let report = stmt
            .query_map([since], |row| {
                Ok(PackageUsage {
                    id: row.get(0)?,
                    package: row.get(1)?,
                    version: row.get(2)?,
                    unique: row.get(3)?,
                    count: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(report)
    }
}
