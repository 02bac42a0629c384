// ==========================================
// 牲畜减员核算系统 - 成本记录数据仓储
// ==========================================
// 唯一键: (livestock_id, date),重算时覆盖数值但保留原ID
// ==========================================

use crate::db::{DATETIME_FORMAT, DATE_FORMAT};
use crate::domain::cost::{CostBreakdown, CostRecord};
use crate::repository::error::{
    parse_date_column, parse_datetime_column, RepositoryError, RepositoryResult,
};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const COST_COLUMNS: &str = "id, livestock_id, date, total_cost, cost_per_head, feed_cost, \
     medicine_cost, deplesi_cost, deplesi_head_count, prior_cumulative_cost_per_head, \
     stock_before, stock_after, total_value, prior_cost_record_id, calculated_at";

pub struct CostRecordRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CostRecordRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入或覆盖某日成本记录
    pub fn upsert(&self, record: &CostRecord) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO cost_record (
                id, livestock_id, date, total_cost, cost_per_head, feed_cost,
                medicine_cost, deplesi_cost, deplesi_head_count, prior_cumulative_cost_per_head,
                stock_before, stock_after, total_value, prior_cost_record_id, calculated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            ON CONFLICT(livestock_id, date) DO UPDATE SET
                total_cost = excluded.total_cost,
                cost_per_head = excluded.cost_per_head,
                feed_cost = excluded.feed_cost,
                medicine_cost = excluded.medicine_cost,
                deplesi_cost = excluded.deplesi_cost,
                deplesi_head_count = excluded.deplesi_head_count,
                prior_cumulative_cost_per_head = excluded.prior_cumulative_cost_per_head,
                stock_before = excluded.stock_before,
                stock_after = excluded.stock_after,
                total_value = excluded.total_value,
                prior_cost_record_id = excluded.prior_cost_record_id,
                calculated_at = excluded.calculated_at
            "#,
            params![
                record.id,
                record.livestock_id,
                record.date.format(DATE_FORMAT).to_string(),
                record.total_cost,
                record.cost_per_head,
                record.breakdown.feed_cost,
                record.breakdown.medicine_cost,
                record.breakdown.deplesi_cost,
                record.breakdown.deplesi_head_count,
                record.breakdown.prior_cumulative_cost_per_head,
                record.stock_before,
                record.stock_after,
                record.total_value,
                record.prior_cost_record_id,
                record.calculated_at.format(DATETIME_FORMAT).to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn find_by_date(
        &self,
        livestock_id: &str,
        date: NaiveDate,
    ) -> RepositoryResult<Option<CostRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM cost_record WHERE livestock_id = ?1 AND date = ?2",
            COST_COLUMNS
        );
        let record = conn
            .query_row(
                &sql,
                params![livestock_id, date.format(DATE_FORMAT).to_string()],
                map_cost_row,
            )
            .optional()?;
        Ok(record)
    }

    /// 区间查询（含两端）,按日期升序
    pub fn list_range(
        &self,
        livestock_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepositoryResult<Vec<CostRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM cost_record WHERE livestock_id = ?1 AND date >= ?2 AND date <= ?3 ORDER BY date ASC",
            COST_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(
                params![
                    livestock_id,
                    from.format(DATE_FORMAT).to_string(),
                    to.format(DATE_FORMAT).to_string()
                ],
                map_cost_row,
            )?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(records)
    }
}

fn map_cost_row(row: &Row<'_>) -> SqliteResult<CostRecord> {
    Ok(CostRecord {
        id: row.get(0)?,
        livestock_id: row.get(1)?,
        date: parse_date_column(2, &row.get::<_, String>(2)?)?,
        total_cost: row.get(3)?,
        cost_per_head: row.get(4)?,
        breakdown: CostBreakdown {
            feed_cost: row.get(5)?,
            medicine_cost: row.get(6)?,
            deplesi_cost: row.get(7)?,
            deplesi_head_count: row.get(8)?,
            prior_cumulative_cost_per_head: row.get(9)?,
        },
        stock_before: row.get(10)?,
        stock_after: row.get(11)?,
        total_value: row.get(12)?,
        prior_cost_record_id: row.get(13)?,
        calculated_at: parse_datetime_column(14, &row.get::<_, String>(14)?)?,
    })
}
