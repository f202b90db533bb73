use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::Bid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub pickup: String,
    pub delivery: String,
    pub cargo: String,
    pub required_tons: f64,
    pub client_id: String,
    #[serde(default)]
    pub bids: Vec<Bid>,
}

// the dispatch form fields; id, created_at and bids are assigned elsewhere
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobDraft {
    pub pickup: String,
    pub delivery: String,
    pub cargo: String,
    pub required_tons: f64,
}

impl Job {
    pub fn new(draft: JobDraft, client_id: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            pickup: draft.pickup,
            delivery: draft.delivery,
            cargo: draft.cargo,
            required_tons: draft.required_tons,
            client_id,
            bids: Vec::new(),
        }
    }

    // lowest price wins; on a tie the earliest stored bid keeps the spot
    pub fn best_bid(&self) -> Option<&Bid> {
        self.bids.iter().fold(None, |best, bid| match best {
            Some(current) if current.price <= bid.price => Some(current),
            _ => Some(bid),
        })
    }

    pub fn participant_count(&self) -> usize {
        self.bids.len()
    }
}
