// ==========================================
// 牲畜减员核算系统 - 牲畜/批次数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: livestock / livestock_batch / current_stock 表的读写
// ==========================================

use crate::db::{DATETIME_FORMAT, DATE_FORMAT};
use crate::domain::livestock::{CurrentStock, Livestock, LivestockBatch};
use crate::domain::types::BatchStatus;
use crate::repository::error::{
    parse_date_column, parse_datetime_column, parse_enum_column, RepositoryError,
    RepositoryResult,
};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const BATCH_COLUMNS: &str = "id, livestock_id, name, start_date, initial_quantity, \
     available_quantity, price_per_head, status";

// ==========================================
// LivestockRepository - 牲畜仓储
// ==========================================
pub struct LivestockRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LivestockRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作（入栏/调入时由外部流程调用）
    // ==========================================

    /// 登记牲畜群及其批次,并初始化当前存栏
    pub fn register(&self, livestock: &Livestock, batches: &[LivestockBatch]) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO livestock (
                id, name, initial_quantity, quantity_depletion,
                quantity_sales, quantity_mutated, start_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                livestock.id,
                livestock.name,
                livestock.initial_quantity,
                livestock.quantity_depletion,
                livestock.quantity_sales,
                livestock.quantity_mutated,
                livestock.start_date.format(DATE_FORMAT).to_string(),
            ],
        )?;

        for batch in batches {
            if batch.livestock_id != livestock.id {
                return Err(RepositoryError::FieldValueError {
                    field: "livestock_id".to_string(),
                    message: format!("批次{}不属于牲畜群{}", batch.id, livestock.id),
                });
            }
            insert_batch(&tx, batch)?;
        }

        let now = crate::db::now_timestamp();
        recompute_current_stock(&tx, &livestock.id, now)?;
        tx.commit()?;
        Ok(())
    }

    /// 追加批次（调入/补栏）,同步当前存栏
    pub fn add_batch(&self, batch: &LivestockBatch) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        insert_batch(&tx, batch)?;
        tx.execute(
            "UPDATE livestock SET initial_quantity = initial_quantity + ?1 WHERE id = ?2",
            params![batch.initial_quantity, batch.livestock_id],
        )?;
        recompute_current_stock(&tx, &batch.livestock_id, crate::db::now_timestamp())?;
        tx.commit()?;
        Ok(())
    }

    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find_by_id(&self, livestock_id: &str) -> RepositoryResult<Option<Livestock>> {
        let conn = self.get_conn()?;
        let livestock = conn
            .query_row(
                r#"
                SELECT id, name, initial_quantity, quantity_depletion,
                       quantity_sales, quantity_mutated, start_date
                FROM livestock
                WHERE id = ?1
                "#,
                params![livestock_id],
                |row| {
                    Ok(Livestock {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        initial_quantity: row.get(2)?,
                        quantity_depletion: row.get(3)?,
                        quantity_sales: row.get(4)?,
                        quantity_mutated: row.get(5)?,
                        start_date: parse_date_column(6, &row.get::<_, String>(6)?)?,
                    })
                },
            )
            .optional()?;
        Ok(livestock)
    }

    /// 按批次ID查询（不限所属牲畜群,供人工选择校验归属）
    pub fn find_batch(&self, batch_id: &str) -> RepositoryResult<Option<LivestockBatch>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM livestock_batch WHERE id = ?1", BATCH_COLUMNS);
        let batch = conn
            .query_row(&sql, params![batch_id], map_batch_row)
            .optional()?;
        Ok(batch)
    }

    /// 可参与分配的批次：active 且有余量,按日龄从老到新（入栏日期升序,同日按ID）
    pub fn load_active_batches_ordered_by_age(
        &self,
        livestock_id: &str,
    ) -> RepositoryResult<Vec<LivestockBatch>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {}
            FROM livestock_batch
            WHERE livestock_id = ?1 AND status = 'active' AND available_quantity > 0
            ORDER BY start_date ASC, id ASC
            "#,
            BATCH_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let batches = stmt
            .query_map(params![livestock_id], map_batch_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(batches)
    }

    /// 牲畜群全部批次（含已扣完）
    pub fn list_batches(&self, livestock_id: &str) -> RepositoryResult<Vec<LivestockBatch>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM livestock_batch WHERE livestock_id = ?1 ORDER BY start_date ASC, id ASC",
            BATCH_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let batches = stmt
            .query_map(params![livestock_id], map_batch_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(batches)
    }

    pub fn count_active_batches(&self, livestock_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            r#"
            SELECT COUNT(*) FROM livestock_batch
            WHERE livestock_id = ?1 AND status = 'active' AND available_quantity > 0
            "#,
            params![livestock_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn get_current_stock(&self, livestock_id: &str) -> RepositoryResult<Option<CurrentStock>> {
        let conn = self.get_conn()?;
        let stock = conn
            .query_row(
                "SELECT livestock_id, quantity, updated_at FROM current_stock WHERE livestock_id = ?1",
                params![livestock_id],
                |row| {
                    Ok(CurrentStock {
                        livestock_id: row.get(0)?,
                        quantity: row.get(1)?,
                        updated_at: parse_datetime_column(2, &row.get::<_, String>(2)?)?,
                    })
                },
            )
            .optional()?;
        Ok(stock)
    }

    /// 批次可用数量之和
    pub fn sum_available(&self, livestock_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Ok(sum_available(&conn, livestock_id)?)
    }
}

// ==========================================
// 事务内辅助函数（供同一连接上的其它仓储复用）
// ==========================================

fn insert_batch(conn: &Connection, batch: &LivestockBatch) -> rusqlite::Result<usize> {
    conn.execute(
        r#"
        INSERT INTO livestock_batch (
            id, livestock_id, name, start_date, initial_quantity,
            available_quantity, price_per_head, status
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            batch.id,
            batch.livestock_id,
            batch.name,
            batch.start_date.format(DATE_FORMAT).to_string(),
            batch.initial_quantity,
            batch.available_quantity,
            batch.price_per_head,
            batch.status.as_str(),
        ],
    )
}

pub(crate) fn map_batch_row(row: &Row<'_>) -> SqliteResult<LivestockBatch> {
    Ok(LivestockBatch {
        id: row.get(0)?,
        livestock_id: row.get(1)?,
        name: row.get(2)?,
        start_date: parse_date_column(3, &row.get::<_, String>(3)?)?,
        initial_quantity: row.get(4)?,
        available_quantity: row.get(5)?,
        price_per_head: row.get(6)?,
        status: parse_enum_column::<BatchStatus>(7, &row.get::<_, String>(7)?)?,
    })
}

pub(crate) fn sum_available(conn: &Connection, livestock_id: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COALESCE(SUM(available_quantity), 0) FROM livestock_batch WHERE livestock_id = ?1",
        params![livestock_id],
        |row| row.get(0),
    )
}

/// 计数器口径存栏: initial - depletion - sales - mutated（不低于 0）
pub(crate) fn counter_stock(conn: &Connection, livestock_id: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        r#"
        SELECT MAX(0, initial_quantity - quantity_depletion - quantity_sales - quantity_mutated)
        FROM livestock WHERE id = ?1
        "#,
        params![livestock_id],
        |row| row.get(0),
    )
}

/// 按批次余量重算当前存栏并落库,返回新存栏
pub(crate) fn recompute_current_stock(
    conn: &Connection,
    livestock_id: &str,
    now: NaiveDateTime,
) -> rusqlite::Result<i64> {
    let quantity = sum_available(conn, livestock_id)?;
    conn.execute(
        r#"
        INSERT INTO current_stock (livestock_id, quantity, updated_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(livestock_id) DO UPDATE SET
            quantity = excluded.quantity,
            updated_at = excluded.updated_at
        "#,
        params![livestock_id, quantity, now.format(DATETIME_FORMAT).to_string()],
    )?;
    Ok(quantity)
}
