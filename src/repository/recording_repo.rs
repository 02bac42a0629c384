// ==========================================
// 牲畜减员核算系统 - 日常记录数据仓储
// ==========================================
// 职责: 每日饲料/药品投入（daily_recording 表）
// ==========================================

use crate::db::DATE_FORMAT;
use crate::domain::cost::DailyActivity;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

pub struct DailyRecordingRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DailyRecordingRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn upsert(
        &self,
        livestock_id: &str,
        date: NaiveDate,
        activity: &DailyActivity,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO daily_recording (livestock_id, date, feed_cost, medicine_cost)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(livestock_id, date) DO UPDATE SET
                feed_cost = excluded.feed_cost,
                medicine_cost = excluded.medicine_cost
            "#,
            params![
                livestock_id,
                date.format(DATE_FORMAT).to_string(),
                activity.feed_cost,
                activity.medicine_cost
            ],
        )?;
        Ok(())
    }

    /// 当日无记录时返回 None
    pub fn find(&self, livestock_id: &str, date: NaiveDate) -> RepositoryResult<Option<DailyActivity>> {
        let conn = self.get_conn()?;
        let activity = conn
            .query_row(
                "SELECT feed_cost, medicine_cost FROM daily_recording WHERE livestock_id = ?1 AND date = ?2",
                params![livestock_id, date.format(DATE_FORMAT).to_string()],
                |row| {
                    Ok(DailyActivity {
                        feed_cost: row.get(0)?,
                        medicine_cost: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(activity)
    }
}
