//! The durable outbound event queue.
//!
//! Backed by a small embedded SQLite table via `rusqlite`. Events are
//! appended in emission order and deleted only once the Hub has
//! acknowledged the batch they were sent in; a batch that never gets
//! acked (e.g. the connection drops mid-flight) simply stays in the
//! table and is re-sent on the next flush after reconnecting.

use crate::error::{BridgeError, Result};
use crate::metrics::BridgeMetrics;
use debugprobe_types::Event;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// One event read back from the durable queue, tagged with its row id
/// so the caller can ack it later.
#[derive(Debug, Clone)]
pub struct QueuedEvent {
    /// Row id in the backing table; passed back to [`OutboundQueue::ack`].
    pub id: i64,
    /// The decoded event.
    pub event: Event,
}

/// A bounded, durable FIFO of events awaiting delivery to the Hub.
///
/// When full, the oldest entry is dropped on the next push and
/// [`BridgeMetrics::events_dropped`] is incremented.
pub struct OutboundQueue {
    conn: Arc<Mutex<Connection>>,
    capacity: usize,
    metrics: Arc<BridgeMetrics>,
}

impl OutboundQueue {
    /// Open (creating if absent) the SQLite file at `path`.
    pub fn open(path: &Path, capacity: usize, metrics: Arc<BridgeMetrics>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS outbound_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                payload TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            capacity,
            metrics,
        })
    }

    /// An in-memory queue, for tests and hosts that opt out of durable
    /// persistence.
    pub fn open_in_memory(capacity: usize, metrics: Arc<BridgeMetrics>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS outbound_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                payload TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            capacity,
            metrics,
        })
    }

    /// Append `event` in emission order, dropping the oldest entry if
    /// this push exceeds capacity.
    pub async fn push(&self, event: &Event) -> Result<()> {
        let payload = serde_json::to_string(event)?;
        let conn = self.conn.clone();
        let capacity = self.capacity;
        let metrics = self.metrics.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = conn.lock();
            conn.execute(
                "INSERT INTO outbound_events (payload) VALUES (?1)",
                params![payload],
            )?;
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM outbound_events", [], |r| r.get(0))?;
            if count as usize > capacity {
                conn.execute(
                    "DELETE FROM outbound_events WHERE id = (SELECT MIN(id) FROM outbound_events)",
                    [],
                )?;
                metrics.events_dropped.fetch_add(1, Ordering::Relaxed);
            }
            Ok(())
        })
        .await
        .map_err(|e| BridgeError::Transport(e.to_string()))?
    }

    /// Read (without removing) the oldest `n` events, in emission
    /// order.
    pub async fn pop_batch(&self, n: usize) -> Result<Vec<QueuedEvent>> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<QueuedEvent>> {
            let conn = conn.lock();
            let mut stmt =
                conn.prepare("SELECT id, payload FROM outbound_events ORDER BY id ASC LIMIT ?1")?;
            let rows = stmt.query_map(params![n as i64], |row| {
                let id: i64 = row.get(0)?;
                let payload: String = row.get(1)?;
                Ok((id, payload))
            })?;
            let mut out = Vec::new();
            for row in rows {
                let (id, payload) = row?;
                let event: Event = serde_json::from_str(&payload)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
                out.push(QueuedEvent { id, event });
            }
            Ok(out)
        })
        .await
        .map_err(|e| BridgeError::Transport(e.to_string()))?
    }

    /// Remove the given row ids once the Hub has acknowledged them.
    pub async fn ack(&self, ids: &[i64]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let conn = self.conn.clone();
        let ids = ids.to_vec();
        let metrics = self.metrics.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = conn.lock();
            let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
            let sql = format!("DELETE FROM outbound_events WHERE id IN ({placeholders})");
            let bound: Vec<&dyn rusqlite::ToSql> =
                ids.iter().map(|i| i as &dyn rusqlite::ToSql).collect();
            conn.execute(&sql, bound.as_slice())?;
            metrics
                .events_delivered
                .fetch_add(ids.len() as u64, Ordering::Relaxed);
            Ok(())
        })
        .await
        .map_err(|e| BridgeError::Transport(e.to_string()))?
    }

    /// Current number of events awaiting delivery.
    pub async fn len(&self) -> Result<usize> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<usize> {
            let conn = conn.lock();
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM outbound_events", [], |r| r.get(0))?;
            Ok(count as usize)
        })
        .await
        .map_err(|e| BridgeError::Transport(e.to_string()))?
    }

    /// Whether the queue currently holds no events.
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use debugprobe_types::{HttpEvent, HttpRequest};
    use std::collections::HashMap;

    fn sample_event(n: u32) -> Event {
        Event::Http(HttpEvent {
            request: HttpRequest {
                id: uuid::Uuid::new_v4(),
                method: "GET".to_string(),
                url: format!("https://x/{n}"),
                headers: HashMap::new(),
                body: None,
                start_time: Utc::now(),
                parent_request_id: None,
            },
            response: None,
        })
    }

    #[tokio::test]
    async fn push_and_pop_preserve_emission_order() {
        let metrics = Arc::new(BridgeMetrics::new());
        let queue = OutboundQueue::open_in_memory(100, metrics).unwrap();
        for n in 0..5 {
            queue.push(&sample_event(n)).await.unwrap();
        }
        let batch = queue.pop_batch(10).await.unwrap();
        assert_eq!(batch.len(), 5);
        for (n, item) in batch.iter().enumerate() {
            if let Event::Http(e) = &item.event {
                assert!(e.request.url.ends_with(&n.to_string()));
            } else {
                panic!("expected http event");
            }
        }
    }

    #[tokio::test]
    async fn ack_removes_only_the_given_ids() {
        let metrics = Arc::new(BridgeMetrics::new());
        let queue = OutboundQueue::open_in_memory(100, metrics.clone()).unwrap();
        for n in 0..3 {
            queue.push(&sample_event(n)).await.unwrap();
        }
        let batch = queue.pop_batch(10).await.unwrap();
        let first_id = batch[0].id;
        queue.ack(&[first_id]).await.unwrap();
        assert_eq!(queue.len().await.unwrap(), 2);
        assert_eq!(metrics.snapshot().events_delivered, 1);
    }

    #[tokio::test]
    async fn overflow_drops_the_oldest_entry() {
        let metrics = Arc::new(BridgeMetrics::new());
        let queue = OutboundQueue::open_in_memory(2, metrics.clone()).unwrap();
        queue.push(&sample_event(0)).await.unwrap();
        queue.push(&sample_event(1)).await.unwrap();
        queue.push(&sample_event(2)).await.unwrap();

        assert_eq!(queue.len().await.unwrap(), 2);
        assert_eq!(metrics.snapshot().events_dropped, 1);
        let remaining = queue.pop_batch(10).await.unwrap();
        let urls: Vec<String> = remaining
            .iter()
            .map(|q| match &q.event {
                Event::Http(e) => e.request.url.clone(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(urls, vec!["https://x/1", "https://x/2"]);
    }
}
