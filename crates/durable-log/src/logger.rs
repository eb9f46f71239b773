//! Asynchronous durable-log writer that batches interaction events and
//! writes them to the relational interaction log. Channel-based so
//! the Event Fast-path never blocks on a database round trip.

use reco_core::config::CatalogConfig;
use reco_core::event_bus::EventSink;
use reco_core::types::InteractionEvent;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Durable-log writer with a background batch flusher.
pub struct DurableLog {
    sender: mpsc::Sender<InteractionEvent>,
}

const CHANNEL_CAPACITY: usize = 100_000;
const BATCH_SIZE: usize = 500;
const FLUSH_INTERVAL_MS: u64 = 1_000;

impl DurableLog {
    /// Connect to Postgres and spawn the background writer.
    pub async fn new(config: &CatalogConfig) -> anyhow::Result<Self> {
        let (sender, receiver) = mpsc::channel::<InteractionEvent>(CHANNEL_CAPACITY);

        let writer = BatchWriter::new(config).await?;
        tokio::spawn(async move {
            writer
                .run(
                    receiver,
                    BATCH_SIZE,
                    std::time::Duration::from_millis(FLUSH_INTERVAL_MS),
                )
                .await;
        });

        info!("durable log initialized with postgres backend");
        Ok(Self { sender })
    }

    /// Schedule a durable write of `event` (non-blocking). A dropped
    /// event is logged but never propagated — see Event Fast-path
    /// failure semantics.
    pub fn schedule(&self, event: InteractionEvent) {
        if let Err(e) = self.sender.try_send(event) {
            metrics::counter!("durable_log.dropped").increment(1);
            warn!("durable log event dropped: {e}");
        } else {
            metrics::counter!("durable_log.queued").increment(1);
        }
    }
}

impl EventSink for DurableLog {
    fn emit(&self, event: InteractionEvent) {
        self.schedule(event);
    }
}

struct BatchWriter {
    pool: PgPool,
}

impl BatchWriter {
    async fn new(config: &CatalogConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .connect(&config.database_url)
            .await?;

        Self::ensure_schema(&pool).await?;
        Ok(Self { pool })
    }

    async fn ensure_schema(pool: &PgPool) -> anyhow::Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS interaction_logs (
                id BIGSERIAL PRIMARY KEY,
                user_id TEXT NOT NULL,
                item_id TEXT NOT NULL,
                event_type TEXT NOT NULL,
                ts TIMESTAMPTZ NOT NULL,
                metadata JSONB NOT NULL DEFAULT '{}'::jsonb
            )",
        )
        .execute(pool)
        .await?;

        info!("interaction_logs schema verified");
        Ok(())
    }

    async fn run(
        self,
        mut receiver: mpsc::Receiver<InteractionEvent>,
        batch_size: usize,
        flush_interval: std::time::Duration,
    ) {
        let mut buffer: Vec<InteractionEvent> = Vec::with_capacity(batch_size);
        let mut interval = tokio::time::interval(flush_interval);

        loop {
            tokio::select! {
                Some(event) = receiver.recv() => {
                    buffer.push(event);
                    if buffer.len() >= batch_size {
                        self.flush(&mut buffer).await;
                    }
                }
                _ = interval.tick() => {
                    if !buffer.is_empty() {
                        self.flush(&mut buffer).await;
                    }
                }
            }
        }
    }

    async fn flush(&self, buffer: &mut Vec<InteractionEvent>) {
        let count = buffer.len();
        debug!(count, "flushing interaction log batch");

        for event in buffer.drain(..) {
            let event_type = serde_json::to_value(event.event_kind)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_else(|| "view".to_string());

            let result = sqlx::query(
                "INSERT INTO interaction_logs (user_id, item_id, event_type, ts, metadata)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(&event.user_id)
            .bind(&event.item_id)
            .bind(&event_type)
            .bind(event.ts)
            .bind(&event.metadata)
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => metrics::counter!("durable_log.flushed").increment(1),
                Err(e) => {
                    metrics::counter!("durable_log.flush_errors").increment(1);
                    error!(error = %e, "failed to flush interaction log entry");
                }
            }
        }
    }
}
