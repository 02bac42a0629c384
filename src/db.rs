// ==========================================
// 牲畜减员核算系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键、busy_timeout）
// - 幂等建表,记录 schema_version
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 日期列统一格式
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 时间戳列统一格式
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 当前时间（UTC,截断到秒,与时间戳列精度一致）
pub fn now_timestamp() -> chrono::NaiveDateTime {
    use chrono::SubsecRound;
    chrono::Utc::now().naive_utc().trunc_subsecs(0)
}

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：foreign_keys 与 busy_timeout 都需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 幂等建表
///
/// 所有表都使用 IF NOT EXISTS,可在每次启动时调用
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS livestock (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            initial_quantity INTEGER NOT NULL CHECK (initial_quantity >= 0),
            quantity_depletion INTEGER NOT NULL DEFAULT 0,
            quantity_sales INTEGER NOT NULL DEFAULT 0,
            quantity_mutated INTEGER NOT NULL DEFAULT 0,
            start_date TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS livestock_batch (
            id TEXT PRIMARY KEY,
            livestock_id TEXT NOT NULL REFERENCES livestock(id),
            name TEXT NOT NULL,
            start_date TEXT NOT NULL,
            initial_quantity INTEGER NOT NULL CHECK (initial_quantity >= 0),
            available_quantity INTEGER NOT NULL CHECK (available_quantity >= 0),
            price_per_head REAL NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'active',
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_livestock_batch_owner
            ON livestock_batch(livestock_id, status, start_date);

        CREATE TABLE IF NOT EXISTS current_stock (
            livestock_id TEXT PRIMARY KEY REFERENCES livestock(id),
            quantity INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS depletion_record (
            id TEXT PRIMARY KEY,
            livestock_id TEXT NOT NULL REFERENCES livestock(id),
            date TEXT NOT NULL,
            depletion_type TEXT NOT NULL,
            method TEXT NOT NULL,
            requested_quantity INTEGER NOT NULL,
            total_depleted INTEGER NOT NULL,
            partial INTEGER NOT NULL DEFAULT 0,
            reason TEXT,
            actor TEXT,
            reversed INTEGER NOT NULL DEFAULT 0,
            reversed_at TEXT,
            reversal_reason TEXT,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_depletion_record_livestock_date
            ON depletion_record(livestock_id, date);

        -- entry_kind: debit = 扣减分录, credit = 冲销补偿分录
        CREATE TABLE IF NOT EXISTS depletion_allocation (
            record_id TEXT NOT NULL REFERENCES depletion_record(id),
            entry_kind TEXT NOT NULL,
            seq_no INTEGER NOT NULL,
            batch_id TEXT NOT NULL REFERENCES livestock_batch(id),
            quantity INTEGER NOT NULL,
            note TEXT,
            PRIMARY KEY (record_id, entry_kind, seq_no)
        );

        CREATE TABLE IF NOT EXISTS daily_recording (
            livestock_id TEXT NOT NULL REFERENCES livestock(id),
            date TEXT NOT NULL,
            feed_cost REAL NOT NULL DEFAULT 0,
            medicine_cost REAL NOT NULL DEFAULT 0,
            PRIMARY KEY (livestock_id, date)
        );

        CREATE TABLE IF NOT EXISTS cost_record (
            id TEXT PRIMARY KEY,
            livestock_id TEXT NOT NULL REFERENCES livestock(id),
            date TEXT NOT NULL,
            total_cost REAL NOT NULL,
            cost_per_head REAL NOT NULL,
            feed_cost REAL NOT NULL,
            medicine_cost REAL NOT NULL,
            deplesi_cost REAL NOT NULL,
            deplesi_head_count INTEGER NOT NULL,
            prior_cumulative_cost_per_head REAL NOT NULL,
            stock_before INTEGER NOT NULL,
            stock_after INTEGER NOT NULL,
            total_value REAL NOT NULL,
            prior_cost_record_id TEXT REFERENCES cost_record(id),
            calculated_at TEXT NOT NULL,
            UNIQUE (livestock_id, date)
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
