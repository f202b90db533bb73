use async_trait::async_trait;
use sqlx::postgres::PgListener;
use tokio::sync::broadcast;

use super::{Engine, CHANGE_CHANNEL};

use crate::{
    api::{Change, ChangeAPI, ChangeFeed, Subscription},
    error::Error,
};

#[async_trait]
impl ChangeAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn subscribe_changes(&self) -> Result<ChangeFeed, Error> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(CHANGE_CHANNEL).await?;

        tracing::info!("subscribed to {}", CHANGE_CHANNEL);

        let (tx, rx) = broadcast::channel(64);

        let handle = tokio::spawn(async move {
            loop {
                match listener.recv().await {
                    Ok(notification) => {
                        let change = parse_change(notification.payload());

                        tracing::debug!("change notification: {:?}", change);

                        if tx.send(change).is_err() {
                            // no receivers left
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!("change listener failed: {:?}", e);
                        break;
                    }
                }
            }
        });

        Ok(ChangeFeed {
            subscription: Subscription::new(handle),
            events: rx,
        })
    }
}

fn parse_change(payload: &str) -> Change {
    let (table, op) = payload.split_once(':').unwrap_or((payload, ""));

    Change {
        table: table.into(),
        op: op.into(),
    }
}
