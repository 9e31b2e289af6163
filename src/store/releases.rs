//! Release cache backing the resolver

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::FETCH_TIMEOUT_MS;
use crate::release::{CachedReleases, Release, ReleaseStorer};
use crate::store::{Store, StoreError, from_millis, to_millis};

impl ReleaseStorer for Store {
    fn cached_releases(&self, package_name: &str) -> Result<Option<CachedReleases>, StoreError> {
        let conn = self.lock_conn()?;

        let result = conn.query_row(
            "SELECT id, releases_updated_at FROM packages WHERE package_name = ?1",
            [package_name],
            |row| {
                let updated_at = row
                    .get::<_, Option<i64>>(1)?
                    .map(|ms| from_millis(1, ms))
                    .transpose()?;
                Ok((row.get::<_, i64>(0)?, updated_at))
            },
        );

        let (package_id, updated_at) = match result {
            Ok((package_id, Some(updated_at))) => (package_id, updated_at),
            Ok((_, None)) | Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut stmt =
            conn.prepare("SELECT version, upload_time FROM releases WHERE package_id = ?1")?;
        let releases = stmt
            .query_map([package_id], |row| {
                Ok(Release::new(
                    row.get::<_, String>(0)?,
                    from_millis(1, row.get(1)?)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(CachedReleases {
            releases,
            updated_at,
        }))
    }

    fn replace_releases(
        &self,
        package_name: &str,
        releases: &[Release],
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        debug!("Saving {} releases for {}", releases.len(), package_name);

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        let package_id = Self::ensure_package(&tx, package_name)?;

        tx.execute("DELETE FROM releases WHERE package_id = ?1", [package_id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO releases (package_id, version, upload_time) VALUES (?1, ?2, ?3)",
            )?;
            for release in releases {
                stmt.execute((package_id, &release.version, to_millis(release.upload_time)))?;
            }
        }

        tx.execute(
            "UPDATE packages SET releases_updated_at = ?1 WHERE id = ?2",
            (to_millis(now), package_id),
        )?;

        tx.commit()?;
        Ok(())
    }

    fn try_start_fetch(&self, package_name: &str, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let now = to_millis(now);
        let timeout_threshold = now - FETCH_TIMEOUT_MS;

        let conn = self.lock_conn()?;

        // Take the lock if nobody holds it or the previous holder timed out
        let rows_affected = conn.execute(
            r#"
            UPDATE packages
            SET fetching_since = ?1
            WHERE package_name = ?2
              AND (fetching_since IS NULL OR fetching_since < ?3)
            "#,
            (now, package_name, timeout_threshold),
        )?;

        if rows_affected > 0 {
            return Ok(true);
        }

        // Package might not exist yet; only the first inserter gets the lock
        let rows_inserted = conn.execute(
            "INSERT OR IGNORE INTO packages (package_name, fetching_since) VALUES (?1, ?2)",
            (package_name, now),
        )?;

        Ok(rows_inserted > 0)
    }

    fn finish_fetch(&self, package_name: &str) -> Result<(), StoreError> {
        let conn = self.lock_conn()?;

        conn.execute(
            "UPDATE packages SET fetching_since = NULL WHERE package_name = ?1",
            [package_name],
        )?;

        Ok(())
    }

    fn set_latest_release(&self, package_name: &str, release: &Release) -> Result<(), StoreError> {
        let conn = self.lock_conn()?;

        conn.execute(
            "UPDATE packages SET package_version = ?1, upload_time = ?2 WHERE package_name = ?3",
            (&release.version, to_millis(release.upload_time), package_name),
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    use chrono::{TimeDelta, TimeZone};
    use tempfile::TempDir;

    use crate::check::Check;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 1, 10, 12, 0, 0).unwrap()
    }

    fn releases() -> Vec<Release> {
        vec![
            Release::new("3.6.0", Utc.with_ymd_and_hms(2016, 12, 14, 5, 3, 23).unwrap()),
            Release::new("4.0.0rc3", Utc.with_ymd_and_hms(2017, 1, 2, 0, 0, 0).unwrap()),
        ]
    }

    fn sorted(mut releases: Vec<Release>) -> Vec<Release> {
        releases.sort_by(|a, b| a.version.cmp(&b.version));
        releases
    }

    fn new_store(temp_dir: &TempDir) -> Store {
        Store::new(&temp_dir.path().join("test.db")).unwrap()
    }

    #[test]
    fn cached_releases_returns_none_for_unknown_package() {
        let temp_dir = TempDir::new().unwrap();
        let store = new_store(&temp_dir);

        assert_eq!(store.cached_releases("praw").unwrap(), None);
    }

    #[test]
    fn cached_releases_returns_none_before_first_fetch() {
        let temp_dir = TempDir::new().unwrap();
        let store = new_store(&temp_dir);

        store.try_start_fetch("praw", now()).unwrap();
        store.finish_fetch("praw").unwrap();

        assert_eq!(store.cached_releases("praw").unwrap(), None);
    }

    #[test]
    fn replace_releases_then_cached_releases_returns_them() {
        let temp_dir = TempDir::new().unwrap();
        let store = new_store(&temp_dir);

        store.replace_releases("praw", &releases(), now()).unwrap();

        let cached = store.cached_releases("praw").unwrap().unwrap();
        assert_eq!(cached.updated_at, now());
        assert_eq!(sorted(cached.releases), releases());
    }

    #[test]
    fn replace_releases_drops_previous_releases() {
        let temp_dir = TempDir::new().unwrap();
        let store = new_store(&temp_dir);

        store.replace_releases("praw", &releases(), now()).unwrap();
        let later = now() + TimeDelta::hours(2);
        store
            .replace_releases("praw", &releases()[..1], later)
            .unwrap();

        let cached = store.cached_releases("praw").unwrap().unwrap();
        assert_eq!(cached.updated_at, later);
        assert_eq!(cached.releases, releases()[..1].to_vec());
    }

    #[test]
    fn try_start_fetch_returns_true_for_new_package() {
        let temp_dir = TempDir::new().unwrap();
        let store = new_store(&temp_dir);

        assert!(store.try_start_fetch("praw", now()).unwrap());
    }

    #[test]
    fn try_start_fetch_returns_false_while_fetch_running() {
        let temp_dir = TempDir::new().unwrap();
        let store = new_store(&temp_dir);

        assert!(store.try_start_fetch("praw", now()).unwrap());
        assert!(!store.try_start_fetch("praw", now()).unwrap());
    }

    #[test]
    fn try_start_fetch_takes_over_timed_out_fetch() {
        let temp_dir = TempDir::new().unwrap();
        let store = new_store(&temp_dir);

        assert!(store.try_start_fetch("praw", now()).unwrap());
        let after_timeout = now() + TimeDelta::milliseconds(FETCH_TIMEOUT_MS + 1);
        assert!(store.try_start_fetch("praw", after_timeout).unwrap());
    }

    #[test]
    fn finish_fetch_clears_fetching_state() {
        let temp_dir = TempDir::new().unwrap();
        let store = new_store(&temp_dir);

        assert!(store.try_start_fetch("praw", now()).unwrap());
        store.finish_fetch("praw").unwrap();
        assert!(store.try_start_fetch("praw", now()).unwrap());
    }

    #[test]
    fn set_latest_release_shows_in_packages_report() {
        let temp_dir = TempDir::new().unwrap();
        let store = new_store(&temp_dir);
        let check = Check {
            package_name: "praw".to_string(),
            package_version: "3.5.0".to_string(),
            platform: "linux".to_string(),
            python_version: "3.5".to_string(),
        };

        store
            .record_installation(&check, IpAddr::V4(Ipv4Addr::LOCALHOST), now())
            .unwrap();
        store.set_latest_release("praw", &releases()[0]).unwrap();

        let report = store.packages_report(now()).unwrap();
        assert_eq!(report[0].version.as_deref(), Some("3.6.0"));
    }

    #[test]
    fn cached_releases_rejects_out_of_range_upload_time() {
        let temp_dir = TempDir::new().unwrap();
        let store = new_store(&temp_dir);
        store.replace_releases("praw", &releases(), now()).unwrap();
        store
            .lock_conn()
            .unwrap()
            .execute("UPDATE releases SET upload_time = ?1", [i64::MAX])
            .unwrap();

        let result = store.cached_releases("praw");

        assert!(matches!(
            result,
            Err(StoreError::Database(rusqlite::Error::IntegralValueOutOfRange(1, i64::MAX)))
        ));
    }
}
