use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Row};

use crate::db::{connection::Database, helpers::parse_datetime, models::KvEntry};

fn row_to_entry(row: &Row) -> Result<KvEntry> {
    let updated_at: String = row.get("updated_at")?;

    Ok(KvEntry {
        key: row.get("key")?,
        value: row.get("value")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    pub async fn get_entry(&self, key: &str) -> Result<Option<KvEntry>> {
        let key = key.to_string();
        self.execute(move |conn| {
            let mut stmt =
                conn.prepare("SELECT key, value, updated_at FROM kv_store WHERE key = ?1")?;
            let mut rows = stmt
                .query(params![key])
                .with_context(|| format!("failed to read kv entry {key}"))?;
            match rows.next()? {
                Some(row) => row_to_entry(row).map(Some),
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn get_value(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get_entry(key).await?.map(|entry| entry.value))
    }

    pub async fn put_value(&self, key: &str, value: String) -> Result<()> {
        let key = key.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO kv_store (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, Utc::now().to_rfc3339()],
            )
            .with_context(|| format!("failed to write kv entry {key}"))?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;

    #[tokio::test]
    async fn put_overwrites_existing_value() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("kv.sqlite3")).unwrap();

        assert_eq!(db.get_value("k").await.unwrap(), None);
        db.put_value("k", "one".into()).await.unwrap();
        db.put_value("k", "two".into()).await.unwrap();

        let entry = db.get_entry("k").await.unwrap().unwrap();
        assert_eq!(entry.value, "two");
        assert_eq!(entry.key, "k");
        assert_eq!(db.get_value("k").await.unwrap().as_deref(), Some("two"));
    }
}
