//! Query operations over the `usage_sessions` table.
//!
//! Open sessions (`end_time` NULL) contribute `now - start_time` to daily
//! sums, but only while younger than 24 hours; a session left open across
//! days (e.g. after a crash) counts as zero rather than inflating totals.

use anyhow::Result;
use rusqlite::{params, Row, ToSql};

use crate::db::{
    connection::Database,
    models::{DailyAppStats, DatabaseStats, UsageSession},
};

const SESSION_COLUMNS: &str = "id, package_name, start_time, end_time, date";

fn row_to_session(row: &Row) -> rusqlite::Result<UsageSession> {
    Ok(UsageSession {
        id: row.get("id")?,
        package_name: row.get("package_name")?,
        start_time: row.get("start_time")?,
        end_time: row.get("end_time")?,
        date: row.get("date")?,
    })
}

// Shared SUM expression: closed sessions count their full span, open ones
// count elapsed time against ?1 (now) unless stale.
const DURATION_SUM: &str = "COALESCE(SUM(
    CASE
        WHEN end_time IS NOT NULL THEN end_time - start_time
        WHEN ?1 - start_time < 86400000 THEN ?1 - start_time
        ELSE 0
    END
), 0)";

impl Database {
    /// Inserts an open session and returns its assigned rowid.
    pub async fn insert_session(&self, session: &UsageSession) -> Result<i64> {
        let record = session.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO usage_sessions (package_name, start_time, end_time, date)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.package_name,
                    record.start_time,
                    record.end_time,
                    record.date,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    pub async fn update_session(&self, session: &UsageSession) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE usage_sessions
                 SET package_name = ?1,
                     start_time = ?2,
                     end_time = ?3,
                     date = ?4
                 WHERE id = ?5",
                params![
                    record.package_name,
                    record.start_time,
                    record.end_time,
                    record.date,
                    record.id,
                ],
            )?;
            if rows_affected == 0 {
                return Err(anyhow::anyhow!("session {} not found", record.id));
            }
            Ok(())
        })
        .await
    }

    /// Most recent open session for a package, if any.
    pub async fn active_session_for(&self, package_name: &str) -> Result<Option<UsageSession>> {
        let package_name = package_name.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM usage_sessions
                 WHERE package_name = ?1 AND end_time IS NULL
                 ORDER BY start_time DESC
                 LIMIT 1"
            ))?;
            let mut rows = stmt.query(params![package_name])?;
            let session = match rows.next()? {
                Some(row) => Some(row_to_session(row)?),
                None => None,
            };
            Ok(session)
        })
        .await
    }

    pub async fn active_sessions(&self) -> Result<Vec<UsageSession>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM usage_sessions WHERE end_time IS NULL"
            ))?;
            collect_sessions(&mut stmt, [])
        })
        .await
    }

    pub async fn latest_session_for(&self, package_name: &str) -> Result<Option<UsageSession>> {
        let package_name = package_name.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM usage_sessions
                 WHERE package_name = ?1
                 ORDER BY start_time DESC
                 LIMIT 1"
            ))?;
            let mut rows = stmt.query(params![package_name])?;
            let session = match rows.next()? {
                Some(row) => Some(row_to_session(row)?),
                None => None,
            };
            Ok(session)
        })
        .await
    }

    /// Retention cleanup: drops sessions that started before the cutoff.
    pub async fn delete_older_than(&self, cutoff_ms: i64) -> Result<usize> {
        self.execute(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM usage_sessions WHERE start_time < ?1",
                params![cutoff_ms],
            )?;
            Ok(deleted)
        })
        .await
    }

    /// Removes sessions stuck without an end time, e.g. after a crash.
    pub async fn delete_incomplete(&self) -> Result<usize> {
        self.execute(|conn| {
            let deleted = conn.execute("DELETE FROM usage_sessions WHERE end_time IS NULL", [])?;
            Ok(deleted)
        })
        .await
    }

    /// Total time for one package on a day bucket.
    pub async fn app_time_on_date(
        &self,
        package_name: &str,
        date_ms: i64,
        now_ms: i64,
    ) -> Result<i64> {
        let package_name = package_name.to_string();
        self.execute(move |conn| {
            let total = conn.query_row(
                &format!(
                    "SELECT {DURATION_SUM} FROM usage_sessions
                     WHERE package_name = ?2 AND date = ?3"
                ),
                params![now_ms, package_name, date_ms],
                |row| row.get(0),
            )?;
            Ok(total)
        })
        .await
    }

    /// Total time across a set of packages on a day bucket.
    pub async fn monitored_time_on_date(
        &self,
        package_names: &[String],
        date_ms: i64,
        now_ms: i64,
    ) -> Result<i64> {
        if package_names.is_empty() {
            return Ok(0);
        }
        let package_names = package_names.to_vec();
        self.execute(move |conn| {
            let placeholders = (0..package_names.len())
                .map(|i| format!("?{}", i + 3))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "SELECT {DURATION_SUM} FROM usage_sessions
                 WHERE date = ?2 AND package_name IN ({placeholders})"
            );

            let mut bindings: Vec<Box<dyn ToSql>> = vec![Box::new(now_ms), Box::new(date_ms)];
            for name in &package_names {
                bindings.push(Box::new(name.clone()));
            }
            let params: Vec<&dyn ToSql> = bindings.iter().map(|b| b.as_ref()).collect();

            let total = conn.query_row(&sql, params.as_slice(), |row| row.get(0))?;
            Ok(total)
        })
        .await
    }

    pub async fn sessions_on_date(&self, date_ms: i64) -> Result<Vec<UsageSession>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM usage_sessions
                 WHERE date = ?1
                 ORDER BY start_time DESC"
            ))?;
            collect_sessions(&mut stmt, params![date_ms])
        })
        .await
    }

    pub async fn sessions_between(&self, start_ms: i64, end_ms: i64) -> Result<Vec<UsageSession>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM usage_sessions
                 WHERE start_time >= ?1 AND start_time <= ?2
                 ORDER BY start_time DESC"
            ))?;
            collect_sessions(&mut stmt, params![start_ms, end_ms])
        })
        .await
    }

    pub async fn session_count_on_date(&self, date_ms: i64) -> Result<i64> {
        self.execute(move |conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM usage_sessions WHERE date = ?1",
                params![date_ms],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
    }

    /// Per-package session counts and totals for one day, busiest first.
    pub async fn stats_by_package_on_date(
        &self,
        date_ms: i64,
        now_ms: i64,
    ) -> Result<Vec<DailyAppStats>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT package_name, COUNT(*) AS session_count, {DURATION_SUM} AS total_time
                 FROM usage_sessions
                 WHERE date = ?2
                 GROUP BY package_name
                 ORDER BY total_time DESC"
            ))?;
            let mut rows = stmt.query(params![now_ms, date_ms])?;
            let mut stats = Vec::new();
            while let Some(row) = rows.next()? {
                stats.push(DailyAppStats {
                    package_name: row.get(0)?,
                    session_count: row.get(1)?,
                    total_time_ms: row.get(2)?,
                });
            }
            Ok(stats)
        })
        .await
    }

    /// Per-package totals over a day-bucket range; only closed sessions
    /// count here since `now` is meaningless for historical days.
    pub async fn stats_by_package_between(
        &self,
        start_date_ms: i64,
        end_date_ms: i64,
    ) -> Result<Vec<DailyAppStats>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT package_name,
                        COUNT(*) AS session_count,
                        COALESCE(SUM(
                            CASE WHEN end_time IS NOT NULL THEN end_time - start_time ELSE 0 END
                        ), 0) AS total_time
                 FROM usage_sessions
                 WHERE date >= ?1 AND date <= ?2
                 GROUP BY package_name
                 ORDER BY total_time DESC",
            )?;
            let mut rows = stmt.query(params![start_date_ms, end_date_ms])?;
            let mut stats = Vec::new();
            while let Some(row) = rows.next()? {
                stats.push(DailyAppStats {
                    package_name: row.get(0)?,
                    session_count: row.get(1)?,
                    total_time_ms: row.get(2)?,
                });
            }
            Ok(stats)
        })
        .await
    }

    pub async fn database_stats(&self) -> Result<DatabaseStats> {
        self.execute(|conn| {
            let stats = conn.query_row(
                "SELECT COUNT(*), MIN(start_time), MAX(start_time) FROM usage_sessions",
                [],
                |row| {
                    Ok(DatabaseStats {
                        total_records: row.get(0)?,
                        oldest_ms: row.get(1)?,
                        newest_ms: row.get(2)?,
                    })
                },
            )?;
            Ok(stats)
        })
        .await
    }
}

fn collect_sessions<P: rusqlite::Params>(
    stmt: &mut rusqlite::Statement<'_>,
    params: P,
) -> Result<Vec<UsageSession>> {
    let mut rows = stmt.query(params)?;
    let mut sessions = Vec::new();
    while let Some(row) = rows.next()? {
        sessions.push(row_to_session(row)?);
    }
    Ok(sessions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::time::start_of_day_ms;
    use tempfile::tempdir;

    async fn open_db(dir: &tempfile::TempDir) -> Database {
        Database::new(dir.path().join("usage.sqlite")).unwrap()
    }

    async fn insert_closed(
        db: &Database,
        package: &str,
        start: i64,
        end: i64,
    ) -> UsageSession {
        let mut session = UsageSession::open(package, start);
        session.end_time = Some(end);
        let id = db.insert_session(&session).await.unwrap();
        session.id = id;
        session
    }

    #[tokio::test]
    async fn insert_and_read_back_round_trip() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let now = chrono::Utc::now().timestamp_millis();

        let session = UsageSession::open("com.example.a", now);
        let id = db.insert_session(&session).await.unwrap();
        assert!(id > 0);

        let fetched = db.active_session_for("com.example.a").await.unwrap().unwrap();
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.package_name, session.package_name);
        assert_eq!(fetched.start_time, session.start_time);
        assert_eq!(fetched.date, session.date);
        assert_eq!(fetched.date, start_of_day_ms(fetched.start_time));
        assert!(fetched.is_open());

        let mut closed = fetched.clone();
        closed.end_time = Some(now + 60_000);
        db.update_session(&closed).await.unwrap();

        assert!(db.active_session_for("com.example.a").await.unwrap().is_none());
        assert!(db.active_sessions().await.unwrap().is_empty());
        let latest = db.latest_session_for("com.example.a").await.unwrap().unwrap();
        assert_eq!(latest.end_time, Some(now + 60_000));
    }

    #[tokio::test]
    async fn day_bucketed_sums_per_package_and_set() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let now = chrono::Utc::now().timestamp_millis();
        let today = start_of_day_ms(now);
        // Stay inside today's bucket regardless of the current wall time.
        let base = today + 1_000;

        insert_closed(&db, "com.example.a", base, base + 10 * 60_000).await;
        insert_closed(&db, "com.example.b", base, base + 5 * 60_000).await;
        insert_closed(&db, "com.other.c", base, base + 60_000).await;

        let a_total = db.app_time_on_date("com.example.a", today, now).await.unwrap();
        assert_eq!(a_total, 10 * 60_000);

        let monitored = vec!["com.example.a".to_string(), "com.example.b".to_string()];
        let total = db.monitored_time_on_date(&monitored, today, now).await.unwrap();
        assert_eq!(total, 15 * 60_000);

        let empty = db.monitored_time_on_date(&[], today, now).await.unwrap();
        assert_eq!(empty, 0);
    }

    #[tokio::test]
    async fn open_sessions_count_elapsed_unless_stale() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let now = chrono::Utc::now().timestamp_millis();
        let today = start_of_day_ms(now);

        let open = UsageSession::open("com.example.a", now - 120_000);
        db.insert_session(&open).await.unwrap();

        let total = db.app_time_on_date("com.example.a", today, now).await.unwrap();
        assert_eq!(total, 120_000);

        // An open session stuck for over a day counts as zero.
        let mut stale = UsageSession::open("com.example.b", now - 2 * 86_400_000);
        stale.date = today; // force it into today's bucket to isolate the guard
        db.insert_session(&stale).await.unwrap();
        let stale_total = db.app_time_on_date("com.example.b", today, now).await.unwrap();
        assert_eq!(stale_total, 0);
    }

    #[tokio::test]
    async fn stats_grouped_by_package() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let now = chrono::Utc::now().timestamp_millis();
        let today = start_of_day_ms(now);
        let base = today + 1_000;

        insert_closed(&db, "com.example.a", base, base + 60_000).await;
        insert_closed(&db, "com.example.a", base + 100_000, base + 160_000).await;
        insert_closed(&db, "com.example.b", base, base + 30_000).await;

        let stats = db.stats_by_package_on_date(today, now).await.unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].package_name, "com.example.a");
        assert_eq!(stats[0].session_count, 2);
        assert_eq!(stats[0].total_time_ms, 120_000);
        assert_eq!(stats[1].package_name, "com.example.b");
        assert_eq!(stats[1].total_time_ms, 30_000);

        assert_eq!(db.session_count_on_date(today).await.unwrap(), 3);

        let ranged = db.stats_by_package_between(today, today).await.unwrap();
        assert_eq!(ranged.len(), 2);
        assert_eq!(ranged[0].total_time_ms, 120_000);
    }

    #[tokio::test]
    async fn cleanup_operations() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let now = chrono::Utc::now().timestamp_millis();

        insert_closed(&db, "com.example.old", now - 40 * 86_400_000, now - 40 * 86_400_000 + 1_000)
            .await;
        insert_closed(&db, "com.example.new", now - 1_000, now).await;
        db.insert_session(&UsageSession::open("com.example.stuck", now - 5_000))
            .await
            .unwrap();

        let removed = db.delete_incomplete().await.unwrap();
        assert_eq!(removed, 1);
        assert!(db.active_sessions().await.unwrap().is_empty());

        let removed = db.delete_older_than(now - 30 * 86_400_000).await.unwrap();
        assert_eq!(removed, 1);

        let stats = db.database_stats().await.unwrap();
        assert_eq!(stats.total_records, 1);
        assert_eq!(stats.oldest_ms, Some(now - 1_000));
        assert_eq!(stats.newest_ms, Some(now - 1_000));
    }

    #[tokio::test]
    async fn sessions_between_uses_start_time_range() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;

        insert_closed(&db, "com.example.a", 1_000, 2_000).await;
        insert_closed(&db, "com.example.b", 5_000, 6_000).await;
        insert_closed(&db, "com.example.c", 9_000, 10_000).await;

        let sessions = db.sessions_between(2_000, 8_000).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].package_name, "com.example.b");
    }
}
