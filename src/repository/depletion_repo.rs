// ==========================================
// 牲畜减员核算系统 - 减员记录数据仓储
// ==========================================
// 红线: 批次扣减、计数器、记录、分录、当前存栏在同一事务内写入
// 红线: 批次扣减为条件更新 (available_quantity >= 待扣数量),失败整体回滚
// ==========================================

use crate::db::{DATETIME_FORMAT, DATE_FORMAT};
use crate::domain::depletion::{DepletionAllocation, DepletionRecord};
use crate::domain::types::{DepletionMethod, DepletionType, QuantityCounter};
use crate::repository::error::{
    parse_date_column, parse_datetime_column, parse_enum_column, RepositoryError,
    RepositoryResult,
};
use crate::repository::livestock_repo::{counter_stock, recompute_current_stock};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const ENTRY_DEBIT: &str = "debit";
const ENTRY_CREDIT: &str = "credit";

const RECORD_COLUMNS: &str = "id, livestock_id, date, depletion_type, method, \
     requested_quantity, total_depleted, partial, reason, actor, reversed, reversed_at, \
     reversal_reason, created_at";

// ==========================================
// 提交/冲销结果
// ==========================================

/// 提交后的存栏快照
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockSnapshot {
    /// 批次余量之和（权威口径）
    pub current_stock: i64,
    /// 计数器口径
    pub counter_stock: i64,
}

impl StockSnapshot {
    pub fn is_consistent(&self) -> bool {
        self.current_stock == self.counter_stock
    }
}

/// 冲销写入结果
#[derive(Debug, Clone)]
pub struct ReversalOutcome {
    /// 实际回补的分录（回补量以批次入栏数为上限）
    pub restored: Vec<DepletionAllocation>,
    pub snapshot: StockSnapshot,
}

impl ReversalOutcome {
    pub fn restored_total(&self) -> i64 {
        self.restored.iter().map(|a| a.quantity).sum()
    }
}

// ==========================================
// DepletionRecordRepository - 减员记录仓储
// ==========================================
pub struct DepletionRecordRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DepletionRecordRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 事务写入
    // ==========================================

    /// 原子提交一笔减员
    ///
    /// 步骤:
    /// 1. 逐条条件扣减批次余量,扣到 0 的批次标记 depleted
    /// 2. 按减员类型累加牲畜计数器
    /// 3. 写入减员记录与扣减分录
    /// 4. 重算当前存栏
    ///
    /// 任一步失败整个事务回滚（Transaction drop 时自动回滚）
    pub fn commit_depletion(
        &self,
        record: &DepletionRecord,
        counter: QuantityCounter,
    ) -> RepositoryResult<StockSnapshot> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let now = record.created_at.format(DATETIME_FORMAT).to_string();

        for alloc in record.allocations.iter().filter(|a| a.quantity > 0) {
            // SET 中引用的都是更新前的值
            let updated = tx.execute(
                r#"
                UPDATE livestock_batch
                SET available_quantity = available_quantity - ?1,
                    status = CASE WHEN available_quantity - ?1 <= 0 THEN 'depleted' ELSE status END,
                    updated_at = ?2
                WHERE id = ?3 AND livestock_id = ?4 AND available_quantity >= ?1
                "#,
                params![alloc.quantity, now, alloc.batch_id, record.livestock_id],
            )?;

            if updated == 0 {
                let available: i64 = tx
                    .query_row(
                        "SELECT available_quantity FROM livestock_batch WHERE id = ?1",
                        params![alloc.batch_id],
                        |row| row.get(0),
                    )
                    .optional()?
                    .unwrap_or(0);
                return Err(RepositoryError::InsufficientBatchQuantity {
                    batch_id: alloc.batch_id.clone(),
                    requested: alloc.quantity,
                    available,
                });
            }
        }

        // 列名来自枚举常量,非用户输入
        let column = counter.column();
        let counter_sql = format!(
            "UPDATE livestock SET {col} = {col} + ?1 WHERE id = ?2",
            col = column
        );
        let touched = tx.execute(&counter_sql, params![record.total_depleted, record.livestock_id])?;
        if touched == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Livestock".to_string(),
                id: record.livestock_id.clone(),
            });
        }

        insert_record(&tx, record)?;
        insert_entries(
            &tx,
            &record.id,
            ENTRY_DEBIT,
            record.allocations.iter().filter(|a| a.quantity > 0),
        )?;

        let snapshot = StockSnapshot {
            current_stock: recompute_current_stock(&tx, &record.livestock_id, record.created_at)?,
            counter_stock: counter_stock(&tx, &record.livestock_id)?,
        };

        tx.commit()?;
        Ok(snapshot)
    }

    /// 原子冲销一笔减员
    ///
    /// 以 reversed = 0 为条件打标记,并发重复冲销只有一个能成功
    pub fn commit_reversal(
        &self,
        record_id: &str,
        reason: &str,
        reversed_at: NaiveDateTime,
    ) -> RepositoryResult<ReversalOutcome> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let now = reversed_at.format(DATETIME_FORMAT).to_string();

        let (livestock_id, depletion_type): (String, String) = tx
            .query_row(
                "SELECT livestock_id, depletion_type FROM depletion_record WHERE id = ?1",
                params![record_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "DepletionRecord".to_string(),
                id: record_id.to_string(),
            })?;
        let depletion_type = parse_enum_column::<DepletionType>(1, &depletion_type)?;

        let flagged = tx.execute(
            r#"
            UPDATE depletion_record
            SET reversed = 1, reversed_at = ?1, reversal_reason = ?2
            WHERE id = ?3 AND reversed = 0
            "#,
            params![now, reason, record_id],
        )?;
        if flagged == 0 {
            return Err(RepositoryError::InvalidStateTransition {
                from: "reversed".to_string(),
                to: "reversed".to_string(),
            });
        }

        let debits = load_entries(&tx, record_id, ENTRY_DEBIT)?;
        let mut restored = Vec::with_capacity(debits.len());
        for debit in debits {
            let (initial, available): (i64, i64) = tx.query_row(
                "SELECT initial_quantity, available_quantity FROM livestock_batch WHERE id = ?1",
                params![debit.batch_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            let quantity = debit.quantity.min((initial - available).max(0));

            tx.execute(
                r#"
                UPDATE livestock_batch
                SET available_quantity = available_quantity + ?1,
                    status = CASE WHEN available_quantity + ?1 > 0 THEN 'active' ELSE status END,
                    updated_at = ?2
                WHERE id = ?3
                "#,
                params![quantity, now, debit.batch_id],
            )?;

            restored.push(DepletionAllocation {
                batch_id: debit.batch_id,
                quantity,
                note: Some(format!("reversal of {}", record_id)),
            });
        }

        // 计数器按实际回补量回退,保持与批次余量一致
        let restored_total: i64 = restored.iter().map(|a| a.quantity).sum();
        let column = depletion_type.counter().column();
        let counter_sql = format!(
            "UPDATE livestock SET {col} = MAX(0, {col} - ?1) WHERE id = ?2",
            col = column
        );
        tx.execute(&counter_sql, params![restored_total, livestock_id])?;

        insert_entries(&tx, record_id, ENTRY_CREDIT, restored.iter())?;

        let snapshot = StockSnapshot {
            current_stock: recompute_current_stock(&tx, &livestock_id, reversed_at)?,
            counter_stock: counter_stock(&tx, &livestock_id)?,
        };

        tx.commit()?;
        Ok(ReversalOutcome { restored, snapshot })
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 按ID查询（含扣减分录）
    pub fn find_by_id(&self, record_id: &str) -> RepositoryResult<Option<DepletionRecord>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM depletion_record WHERE id = ?1", RECORD_COLUMNS);
        let record = conn
            .query_row(&sql, params![record_id], map_record_row)
            .optional()?;

        match record {
            Some(mut record) => {
                record.allocations = load_entries(&conn, &record.id, ENTRY_DEBIT)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// 冲销补偿分录
    pub fn find_compensations(&self, record_id: &str) -> RepositoryResult<Vec<DepletionAllocation>> {
        let conn = self.get_conn()?;
        Ok(load_entries(&conn, record_id, ENTRY_CREDIT)?)
    }

    /// 某牲畜群某日全部减员记录（含已冲销）
    pub fn list_by_livestock_and_date(
        &self,
        livestock_id: &str,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<DepletionRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM depletion_record WHERE livestock_id = ?1 AND date = ?2 ORDER BY created_at ASC, id ASC",
            RECORD_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut records = stmt
            .query_map(
                params![livestock_id, date.format(DATE_FORMAT).to_string()],
                map_record_row,
            )?
            .collect::<SqliteResult<Vec<_>>>()?;

        for record in records.iter_mut() {
            record.allocations = load_entries(&conn, &record.id, ENTRY_DEBIT)?;
        }
        Ok(records)
    }

    /// 某日之前（不含当日）未冲销的减员总数（全部类型）
    pub fn sum_removed_before(&self, livestock_id: &str, date: NaiveDate) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let total: i64 = conn.query_row(
            r#"
            SELECT COALESCE(SUM(total_depleted), 0)
            FROM depletion_record
            WHERE livestock_id = ?1 AND date < ?2 AND reversed = 0
            "#,
            params![livestock_id, date.format(DATE_FORMAT).to_string()],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// 当日未冲销的减员汇总
    pub fn daily_removals(&self, livestock_id: &str, date: NaiveDate) -> RepositoryResult<DailyRemovals> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT depletion_type, COALESCE(SUM(total_depleted), 0)
            FROM depletion_record
            WHERE livestock_id = ?1 AND date = ?2 AND reversed = 0
            GROUP BY depletion_type
            "#,
        )?;
        let rows = stmt
            .query_map(
                params![livestock_id, date.format(DATE_FORMAT).to_string()],
                |row| {
                    let kind = parse_enum_column::<DepletionType>(0, &row.get::<_, String>(0)?)?;
                    Ok((kind, row.get::<_, i64>(1)?))
                },
            )?
            .collect::<SqliteResult<Vec<_>>>()?;

        let mut removals = DailyRemovals::default();
        for (kind, quantity) in rows {
            removals.total += quantity;
            if kind.is_deplesi() {
                removals.deplesi += quantity;
            }
        }
        Ok(removals)
    }
}

/// 当日减员汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DailyRemovals {
    /// 全部类型（死亡/淘汰/销售/转群）
    pub total: i64,
    /// 仅死亡+淘汰
    pub deplesi: i64,
}

// ==========================================
// 行映射与分录读写
// ==========================================

fn map_record_row(row: &Row<'_>) -> SqliteResult<DepletionRecord> {
    let reversed_at: Option<String> = row.get(11)?;
    Ok(DepletionRecord {
        id: row.get(0)?,
        livestock_id: row.get(1)?,
        date: parse_date_column(2, &row.get::<_, String>(2)?)?,
        depletion_type: parse_enum_column::<DepletionType>(3, &row.get::<_, String>(3)?)?,
        method: parse_enum_column::<DepletionMethod>(4, &row.get::<_, String>(4)?)?,
        requested_quantity: row.get(5)?,
        total_depleted: row.get(6)?,
        partial: row.get::<_, i64>(7)? != 0,
        allocations: Vec::new(),
        reason: row.get(8)?,
        actor: row.get(9)?,
        reversed: row.get::<_, i64>(10)? != 0,
        reversed_at: reversed_at
            .map(|raw| parse_datetime_column(11, &raw))
            .transpose()?,
        reversal_reason: row.get(12)?,
        created_at: parse_datetime_column(13, &row.get::<_, String>(13)?)?,
    })
}

fn insert_record(conn: &Connection, record: &DepletionRecord) -> SqliteResult<usize> {
    conn.execute(
        r#"
        INSERT INTO depletion_record (
            id, livestock_id, date, depletion_type, method,
            requested_quantity, total_depleted, partial, reason, actor,
            reversed, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0, ?11)
        "#,
        params![
            record.id,
            record.livestock_id,
            record.date.format(DATE_FORMAT).to_string(),
            record.depletion_type.as_str(),
            record.method.as_str(),
            record.requested_quantity,
            record.total_depleted,
            record.partial as i64,
            record.reason,
            record.actor,
            record.created_at.format(DATETIME_FORMAT).to_string(),
        ],
    )
}

fn insert_entries<'a>(
    conn: &Connection,
    record_id: &str,
    entry_kind: &str,
    entries: impl Iterator<Item = &'a DepletionAllocation>,
) -> SqliteResult<()> {
    let mut stmt = conn.prepare(
        r#"
        INSERT INTO depletion_allocation (record_id, entry_kind, seq_no, batch_id, quantity, note)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )?;
    for (seq_no, entry) in entries.enumerate() {
        stmt.execute(params![
            record_id,
            entry_kind,
            seq_no as i64,
            entry.batch_id,
            entry.quantity,
            entry.note,
        ])?;
    }
    Ok(())
}

fn load_entries(
    conn: &Connection,
    record_id: &str,
    entry_kind: &str,
) -> SqliteResult<Vec<DepletionAllocation>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT batch_id, quantity, note
        FROM depletion_allocation
        WHERE record_id = ?1 AND entry_kind = ?2
        ORDER BY seq_no ASC
        "#,
    )?;
    let entries = stmt
        .query_map(params![record_id, entry_kind], |row| {
            Ok(DepletionAllocation {
                batch_id: row.get(0)?,
                quantity: row.get(1)?,
                note: row.get(2)?,
            })
        })?
        .collect::<SqliteResult<Vec<_>>>()?;
    Ok(entries)
}
