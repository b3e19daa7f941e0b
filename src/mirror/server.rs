use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Deserialize;
use serde_json::json;
use tokio::{net::TcpListener, task::JoinHandle};
use tracing::{info, warn};

use crate::{
    id::{Timestamp, TopicId},
    network::{LedgerNetwork, NetworkError},
    receipt::Status,
};

use super::{Links, MirrorTopicMessage, TopicMessagesPage};

const DEFAULT_LIMIT: usize = 25;
const MAX_LIMIT: usize = 100;

#[derive(Debug, Clone)]
struct MirrorState {
    network: Arc<dyn LedgerNetwork>,
    ingest_delay: Duration,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Order {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Default, Deserialize)]
struct MessagesParams {
    limit: Option<usize>,
    order: Option<Order>,
}

/// Error body in the mirror node's `_status` envelope.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "_status": { "messages": [{ "message": self.message }] } });
        (self.status, Json(body)).into_response()
    }
}

/// REST routes of the mirror node, backed by `network`. Messages show up
/// only once `ingest_delay` has passed since their consensus timestamp.
pub fn router(network: Arc<dyn LedgerNetwork>, ingest_delay: Duration) -> Router {
    Router::new()
        .route("/api/v1/topics/{topic_id}/messages", get(topic_messages))
        .with_state(MirrorState {
            network,
            ingest_delay,
        })
}

async fn topic_messages(
    State(state): State<MirrorState>,
    Path(topic_id): Path<String>,
    params: Result<Query<MessagesParams>, QueryRejection>,
) -> Result<Json<TopicMessagesPage>, ApiError> {
    let topic_id: TopicId = topic_id
        .parse()
        .map_err(|_| ApiError::new(StatusCode::BAD_REQUEST, "Invalid parameter: topic.id"))?;
    let Query(params) = params.map_err(|rejection| {
        warn!(%rejection, "malformed query string");
        ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("Invalid parameter: {}", rejection.body_text()),
        )
    })?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    if limit == 0 || limit > MAX_LIMIT {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Invalid parameter: limit",
        ));
    }

    let messages = state
        .network
        .topic_messages(topic_id)
        .await
        .map_err(|err| match err {
            NetworkError::Status(Status::InvalidTopicId) => {
                ApiError::new(StatusCode::NOT_FOUND, "Not found")
            }
            err => ApiError::new(StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
        })?;

    let ingested_before = Timestamp::now()
        .as_nanos()
        .saturating_sub(state.ingest_delay.as_nanos() as u64);
    let visible = messages
        .into_iter()
        .filter(|message| message.consensus_timestamp.as_nanos() <= ingested_before);
    let page: Vec<_> = match params.order.unwrap_or_default() {
        Order::Asc => visible.take(limit).collect(),
        Order::Desc => {
            let mut all: Vec<_> = visible.collect();
            all.reverse();
            all.truncate(limit);
            all
        }
    };

    Ok(Json(TopicMessagesPage {
        messages: page
            .into_iter()
            .map(|message| MirrorTopicMessage {
                consensus_timestamp: message.consensus_timestamp.to_string(),
                topic_id: message.topic_id.to_string(),
                message: STANDARD.encode(&message.contents),
                payer_account_id: Some(message.payer_account_id.to_string()),
                sequence_number: message.sequence_number,
            })
            .collect(),
        links: Links::default(),
    }))
}

/// Mirror node running on a background task, stopped on drop.
#[derive(Debug)]
pub struct MirrorServer {
    base_url: String,
    handle: JoinHandle<()>,
}

impl MirrorServer {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Drop for MirrorServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Serves [`router`] on an ephemeral localhost port.
pub async fn spawn(
    network: Arc<dyn LedgerNetwork>,
    ingest_delay: Duration,
) -> std::io::Result<MirrorServer> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = router(network, ingest_delay);
    let handle = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            warn!(%err, "mirror node stopped");
        }
    });
    info!(%addr, "mirror node listening");
    Ok(MirrorServer {
        base_url: format!("http://{addr}"),
        handle,
    })
}
