use rusqlite::Connection;

use crate::error::Result;

/// Initialise the irrigo schema in `conn`. Safe to call on every startup.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schedule_entries (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,  -- insertion order
            day               TEXT    NOT NULL,
            start             TEXT    NOT NULL,   -- HH:MM
            duration_minutes  INTEGER NOT NULL,
            valves            TEXT    NOT NULL    -- JSON array of logical ids
        );

        -- Single row (id = 1); absent until the first toggle.
        CREATE TABLE IF NOT EXISTS override_state (
            id      INTEGER PRIMARY KEY CHECK (id = 1),
            active  INTEGER NOT NULL,
            date    TEXT                          -- YYYY-MM-DD or NULL
        );

        CREATE TABLE IF NOT EXISTS valves (
            logical_id   INTEGER PRIMARY KEY,
            physical_id  INTEGER,
            name         TEXT
        );

        CREATE TABLE IF NOT EXISTS action_log (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp  TEXT    NOT NULL,          -- RFC 3339, local offset
            action     TEXT    NOT NULL,
            valves     TEXT    NOT NULL           -- JSON array of logical ids
        );
        ",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        init_db(&conn).unwrap();
        let n: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN
                 ('schedule_entries', 'override_state', 'valves', 'action_log')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(n, 4);
    }
}
