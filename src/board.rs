use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex, RwLock};
use uuid::Uuid;

use crate::api::{Change, DynAPI, Subscription};
use crate::entities::{Job, JobDraft};
use crate::error::{bid_rejected_error, post_freight_error, Error};
use crate::identity::SessionIdentity;

// a display mode, not an authorization boundary: any session may act in
// either role
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Client,
    TruckOwner,
}

pub struct Board {
    api: DynAPI,
    identity: SessionIdentity,
    role: RwLock<Role>,
    jobs: RwLock<Vec<Job>>,
    loading: AtomicBool,
    posting: AtomicBool,
    bidding: Mutex<HashSet<Uuid>>,
    subscription: Mutex<Option<Subscription>>,
}

impl Board {
    pub fn new(api: DynAPI, identity: SessionIdentity) -> Self {
        Self {
            api,
            identity,
            role: RwLock::new(Role::Client),
            jobs: RwLock::new(Vec::new()),
            loading: AtomicBool::new(true),
            posting: AtomicBool::new(false),
            bidding: Mutex::new(HashSet::new()),
            subscription: Mutex::new(None),
        }
    }

    // one initial fetch plus the standing change subscription; the returned
    // receiver is what run_loop consumes
    pub async fn init(&self) -> Result<broadcast::Receiver<Change>, Error> {
        self.refresh().await;

        let feed = self.api.subscribe_changes().await?;
        *self.subscription.lock().await = Some(feed.subscription);

        Ok(feed.events)
    }

    pub async fn run_loop(&self, mut events: broadcast::Receiver<Change>) {
        loop {
            match events.recv().await {
                Ok(change) => {
                    tracing::debug!("board change: {}:{}", change.table, change.op);
                    self.refresh().await;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // dropped events still mean "something changed"
                    tracing::warn!("change feed lagged, skipped {} events", skipped);
                    self.refresh().await;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    // replaces the whole snapshot rather than merging; overlapping
    // notifications serialize here and the last fetch wins
    async fn refresh(&self) {
        match self.api.list_jobs().await {
            Ok(jobs) => *self.jobs.write().await = jobs,
            Err(e) => tracing::error!("failed to load network data: {:?}", e),
        }

        self.loading.store(false, Ordering::SeqCst);
    }

    #[tracing::instrument(skip(self))]
    pub async fn submit_job(&self, draft: JobDraft) -> Result<(), Error> {
        self.posting.store(true, Ordering::SeqCst);
        let result = self.api.create_job(&self.identity, draft).await;
        self.posting.store(false, Ordering::SeqCst);

        // no optimistic update: the change notification is the only path to
        // new local state
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::error!("unable to post freight: {:?}", e);
                Err(post_freight_error())
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn submit_bid(&self, job_id: Uuid, price: f64) -> Result<(), Error> {
        self.bidding.lock().await.insert(job_id);
        let result = self.api.create_bid(&self.identity, job_id, price).await;
        self.bidding.lock().await.remove(&job_id);

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::error!("bid rejected for job {}: {:?}", job_id, e);
                Err(bid_rejected_error())
            }
        }
    }

    pub async fn snapshot(&self) -> Vec<Job> {
        self.jobs.read().await.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn is_posting(&self) -> bool {
        self.posting.load(Ordering::SeqCst)
    }

    pub async fn is_bidding(&self, job_id: Uuid) -> bool {
        self.bidding.lock().await.contains(&job_id)
    }

    pub async fn role(&self) -> Role {
        *self.role.read().await
    }

    pub async fn set_role(&self, role: Role) {
        *self.role.write().await = role;
    }

    pub fn session(&self) -> &str {
        self.identity.token()
    }

    pub async fn teardown(&self) {
        if let Some(subscription) = self.subscription.lock().await.take() {
            subscription.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio_test::{assert_err, assert_ok};

    use crate::api::{BidAPI, ChangeAPI, ChangeFeed, JobAPI, API};
    use crate::entities::Bid;
    use crate::error::{database_error, invalid_input_error};

    struct MockBackend {
        jobs: Mutex<Vec<Job>>,
        changes: broadcast::Sender<Change>,
        reject_writes: AtomicBool,
    }

    impl MockBackend {
        fn new() -> Self {
            let (changes, _) = broadcast::channel(16);

            Self {
                jobs: Mutex::new(Vec::new()),
                changes,
                reject_writes: AtomicBool::new(false),
            }
        }

        fn reject_writes(&self, reject: bool) {
            self.reject_writes.store(reject, Ordering::SeqCst);
        }

        fn notify(&self, table: &str, op: &str) {
            let _ = self.changes.send(Change {
                table: table.into(),
                op: op.into(),
            });
        }
    }

    #[async_trait]
    impl JobAPI for MockBackend {
        async fn list_jobs(&self) -> Result<Vec<Job>, Error> {
            let mut jobs = self.jobs.lock().await.clone();
            jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));

            Ok(jobs)
        }

        async fn create_job(
            &self,
            identity: &SessionIdentity,
            draft: JobDraft,
        ) -> Result<Job, Error> {
            if self.reject_writes.load(Ordering::SeqCst) {
                return Err(database_error("insert rejected"));
            }

            let job = Job::new(draft, identity.token().into());
            self.jobs.lock().await.push(job.clone());
            self.notify("jobs", "INSERT");

            Ok(job)
        }
    }

    #[async_trait]
    impl BidAPI for MockBackend {
        async fn create_bid(
            &self,
            identity: &SessionIdentity,
            job_id: Uuid,
            price: f64,
        ) -> Result<Bid, Error> {
            if self.reject_writes.load(Ordering::SeqCst) {
                return Err(database_error("insert rejected"));
            }

            let mut jobs = self.jobs.lock().await;
            let job = jobs
                .iter_mut()
                .find(|job| job.id == job_id)
                .ok_or_else(invalid_input_error)?;

            let bid = Bid::new(job_id, identity.token().into(), price);
            job.bids.push(bid.clone());
            drop(jobs);

            self.notify("bids", "INSERT");

            Ok(bid)
        }
    }

    #[async_trait]
    impl ChangeAPI for MockBackend {
        async fn subscribe_changes(&self) -> Result<ChangeFeed, Error> {
            let mut source = self.changes.subscribe();
            let (tx, rx) = broadcast::channel(16);

            let handle = tokio::spawn(async move {
                while let Ok(change) = source.recv().await {
                    if tx.send(change).is_err() {
                        break;
                    }
                }
            });

            Ok(ChangeFeed {
                subscription: Subscription::new(handle),
                events: rx,
            })
        }
    }

    impl API for MockBackend {}

    fn board_with(backend: Arc<MockBackend>) -> Board {
        Board::new(backend as DynAPI, SessionIdentity::fixed("ID_TEST01"))
    }

    fn copper_draft() -> JobDraft {
        JobDraft {
            pickup: "Lusaka".into(),
            delivery: "Ndola".into(),
            cargo: "Bulk Copper Ore".into(),
            required_tons: 10.0,
        }
    }

    #[tokio::test]
    async fn submitted_job_appears_after_the_next_fetch() {
        let backend = Arc::new(MockBackend::new());
        let board = board_with(backend.clone());

        assert_ok!(board.submit_job(copper_draft()).await);

        // nothing is visible until a fetch happens
        assert!(board.snapshot().await.is_empty());

        board.refresh().await;

        let jobs = board.snapshot().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].cargo, "Bulk Copper Ore");
        assert_eq!(jobs[0].pickup, "Lusaka");
        assert_eq!(jobs[0].delivery, "Ndola");
        assert_eq!(jobs[0].required_tons, 10.0);
        assert_eq!(jobs[0].client_id, "ID_TEST01");
        assert!(jobs[0].bids.is_empty());
    }

    #[tokio::test]
    async fn bids_move_the_best_price_and_participant_count() {
        let backend = Arc::new(MockBackend::new());
        let board = board_with(backend.clone());

        assert_ok!(board.submit_job(copper_draft()).await);
        board.refresh().await;

        let job_id = board.snapshot().await[0].id;

        assert_ok!(board.submit_bid(job_id, 500.0).await);
        board.refresh().await;

        let job = board.snapshot().await.remove(0);
        assert_eq!(job.best_bid().unwrap().price, 500.0);
        assert_eq!(job.participant_count(), 1);

        assert_ok!(board.submit_bid(job_id, 300.0).await);
        board.refresh().await;

        let job = board.snapshot().await.remove(0);
        assert_eq!(job.best_bid().unwrap().price, 300.0);
        assert_eq!(job.participant_count(), 2);
    }

    #[tokio::test]
    async fn rejected_writes_leave_the_board_unchanged() {
        let backend = Arc::new(MockBackend::new());
        let board = board_with(backend.clone());

        assert_ok!(board.submit_job(copper_draft()).await);
        board.refresh().await;
        let job_id = board.snapshot().await[0].id;

        backend.reject_writes(true);

        let err = assert_err!(board.submit_job(copper_draft()).await);
        assert_eq!(err.message, "NETWORK ERROR: UNABLE TO POST FREIGHT");

        let err = assert_err!(board.submit_bid(job_id, 500.0).await);
        assert_eq!(err.message, "NETWORK ERROR: BID REJECTED");

        // submitting flags return to idle after the failed calls
        assert!(!board.is_posting());
        assert!(!board.is_bidding(job_id).await);

        board.refresh().await;

        let jobs = board.snapshot().await;
        assert_eq!(jobs.len(), 1);
        assert!(jobs[0].bids.is_empty());
    }

    #[tokio::test]
    async fn change_notifications_drive_a_refetch() {
        let backend = Arc::new(MockBackend::new());
        let board = Arc::new(board_with(backend.clone()));

        let events = board.init().await.unwrap();
        assert!(!board.is_loading());

        let loop_board = board.clone();
        let loop_handle = tokio::spawn(async move {
            loop_board.run_loop(events).await;
        });

        // another session posts a job; the notification alone must update us
        let other = SessionIdentity::fixed("ID_OTHER1");
        backend.create_job(&other, copper_draft()).await.unwrap();

        let mut waited = 0;
        while board.snapshot().await.is_empty() && waited < 100 {
            tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
            waited += 1;
        }

        let jobs = board.snapshot().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].client_id, "ID_OTHER1");

        // releasing the subscription closes the feed and ends the loop
        board.teardown().await;
        assert_ok!(loop_handle.await);
    }

    #[tokio::test]
    async fn failed_initial_fetch_still_clears_loading() {
        let backend = Arc::new(MockBackend::new());

        struct FailingBackend(Arc<MockBackend>);

        #[async_trait]
        impl JobAPI for FailingBackend {
            async fn list_jobs(&self) -> Result<Vec<Job>, Error> {
                Err(database_error("connection refused"))
            }

            async fn create_job(
                &self,
                identity: &SessionIdentity,
                draft: JobDraft,
            ) -> Result<Job, Error> {
                self.0.create_job(identity, draft).await
            }
        }

        #[async_trait]
        impl BidAPI for FailingBackend {
            async fn create_bid(
                &self,
                identity: &SessionIdentity,
                job_id: Uuid,
                price: f64,
            ) -> Result<Bid, Error> {
                self.0.create_bid(identity, job_id, price).await
            }
        }

        #[async_trait]
        impl ChangeAPI for FailingBackend {
            async fn subscribe_changes(&self) -> Result<ChangeFeed, Error> {
                self.0.subscribe_changes().await
            }
        }

        impl API for FailingBackend {}

        let failing = Arc::new(FailingBackend(backend));
        let board = Board::new(failing as DynAPI, SessionIdentity::fixed("ID_TEST01"));

        assert!(board.is_loading());

        let _events = board.init().await.unwrap();

        // read failure: logged, list stays empty, loading cleared
        assert!(!board.is_loading());
        assert!(board.snapshot().await.is_empty());

        board.teardown().await;
    }
}
