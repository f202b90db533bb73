use std::sync::Arc;

use axum::extract::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::{Board, Role};
use crate::entities::Job;

#[derive(Serialize)]
pub struct BoardView {
    session: String,
    role: Role,
    loading: bool,
    terminal: TerminalView,
    active_loads: usize,
    jobs: Vec<JobCardView>,
}

#[derive(Serialize)]
pub struct TerminalView {
    heading: String,
    status: String,
}

#[derive(Serialize)]
pub struct JobCardView {
    id: Uuid,
    created_at: DateTime<Utc>,
    pickup: String,
    delivery: String,
    cargo: String,
    required_tons: f64,
    client_id: String,
    best_bid: Option<BestBidView>,
    participants: usize,
    own_posting: bool,
    submitting: bool,
}

#[derive(Serialize)]
pub struct BestBidView {
    price: f64,
    truck_id: String,
    yours: bool,
}

#[derive(Serialize, Deserialize)]
pub struct SetRoleParams {
    role: Role,
}

pub async fn show(Extension(board): Extension<Arc<Board>>) -> Json<BoardView> {
    let role = board.role().await;
    let jobs = board.snapshot().await;

    let mut cards = Vec::with_capacity(jobs.len());

    for job in jobs.iter() {
        cards.push(card_view(&board, job).await);
    }

    let view = BoardView {
        session: board.session().into(),
        role,
        loading: board.is_loading(),
        terminal: terminal_view(role, jobs.len(), board.is_posting()),
        active_loads: jobs.len(),
        jobs: cards,
    };

    view.into()
}

pub async fn set_role(
    Extension(board): Extension<Arc<Board>>,
    Json(params): Json<SetRoleParams>,
) -> Json<Role> {
    board.set_role(params.role).await;

    params.role.into()
}

fn terminal_view(role: Role, active_loads: usize, posting: bool) -> TerminalView {
    match role {
        Role::Client => TerminalView {
            heading: "Terminal: Dispatch".into(),
            status: if posting {
                "Broadcasting...".into()
            } else {
                "Broadcast Job".into()
            },
        },
        Role::TruckOwner => TerminalView {
            heading: "Terminal: Fleet".into(),
            status: format!("Awaiting Bids: {} active loads", active_loads),
        },
    }
}

// everything a card shows is derived from controller state; nothing is
// stored
async fn card_view(board: &Board, job: &Job) -> JobCardView {
    let best_bid = job.best_bid().map(|bid| BestBidView {
        price: bid.price,
        truck_id: bid.truck_id.clone(),
        yours: bid.truck_id == board.session(),
    });

    JobCardView {
        id: job.id,
        created_at: job.created_at,
        pickup: job.pickup.clone(),
        delivery: job.delivery.clone(),
        cargo: job.cargo.clone(),
        required_tons: job.required_tons,
        client_id: job.client_id.clone(),
        best_bid,
        participants: job.participant_count(),
        own_posting: job.client_id == board.session(),
        submitting: board.is_bidding(job.id).await,
    }
}
