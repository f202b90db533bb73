use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::entities::{Bid, Job, JobDraft};
use crate::error::Error;
use crate::identity::SessionIdentity;

#[async_trait]
pub trait JobAPI {
    async fn list_jobs(&self) -> Result<Vec<Job>, Error>;

    async fn create_job(&self, identity: &SessionIdentity, draft: JobDraft) -> Result<Job, Error>;
}

#[async_trait]
pub trait BidAPI {
    async fn create_bid(
        &self,
        identity: &SessionIdentity,
        job_id: Uuid,
        price: f64,
    ) -> Result<Bid, Error>;
}

// a single backend row change; carried for the logs only, consumers react by
// refetching the full list rather than interpreting it
#[derive(Clone, Debug)]
pub struct Change {
    pub table: String,
    pub op: String,
}

// handle on the standing notification channel; closing (or dropping) it
// releases the listener task and its connection
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn new(handle: JoinHandle<()>) -> Self {
        Self { handle }
    }

    pub fn close(&self) {
        self.handle.abort();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub struct ChangeFeed {
    pub subscription: Subscription,
    pub events: broadcast::Receiver<Change>,
}

#[async_trait]
pub trait ChangeAPI {
    async fn subscribe_changes(&self) -> Result<ChangeFeed, Error>;
}

pub trait API: JobAPI + BidAPI + ChangeAPI {}

pub type DynAPI = Arc<dyn API + Send + Sync>;
