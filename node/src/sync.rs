//! Sync-status reporting.
//!
//! `GET /sync_info?height=N` returns the height and hash of the block at `N` (or of the latest
//! block when no height is given) together with the running node's version.

use axum::{
    extract::{Query as AxumQuery, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use msgfee_types::{Header, Query, SyncInfo};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    sync::{Arc, PoisonError, RwLock},
};
use thiserror::Error;
use tracing::debug;

/// Version reported by the sync-status endpoint.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("invalid height: {0}")]
    InvalidHeight(String),
    #[error("height must be greater than 0, but got {0}")]
    NonPositiveHeight(i64),
    #[error("height {height} must be less than or equal to the current blockchain height {latest}")]
    HeightTooHigh { height: u64, latest: u64 },
    #[error("height {height} is not available, lowest height is {base}")]
    HeightPruned { height: u64, base: u64 },
    #[error("no blocks have been committed")]
    Empty,
    #[error("block {height} is not the successor of {latest}")]
    NonContiguous { height: u64, latest: u64 },
}

impl SyncError {
    pub fn status(&self) -> StatusCode {
        match self {
            SyncError::InvalidHeight(_) | SyncError::NonPositiveHeight(_) => {
                StatusCode::BAD_REQUEST
            }
            SyncError::HeightTooHigh { .. } | SyncError::HeightPruned { .. } | SyncError::Empty => {
                StatusCode::NOT_FOUND
            }
            SyncError::NonContiguous { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Read access to committed block headers.
pub trait BlockStore: Send + Sync {
    /// Lowest height still held.
    fn base(&self) -> Option<u64>;

    fn latest(&self) -> Option<u64>;

    fn header(&self, height: u64) -> Option<Header>;
}

/// Contiguous range of headers kept in memory.
#[derive(Debug, Default)]
pub struct MemoryBlockStore {
    headers: RwLock<BTreeMap<u64, Header>>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `header` as its only block.
    pub fn starting_at(header: Header) -> Self {
        let store = Self::new();
        store
            .headers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(header.height, header);
        store
    }

    /// Commit the next header. Heights must be contiguous.
    pub fn append(&self, header: Header) -> Result<(), SyncError> {
        let mut headers = self.headers.write().unwrap_or_else(PoisonError::into_inner);
        if let Some((&latest, _)) = headers.last_key_value() {
            if Some(header.height) != latest.checked_add(1) {
                return Err(SyncError::NonContiguous {
                    height: header.height,
                    latest,
                });
            }
        }
        headers.insert(header.height, header);
        Ok(())
    }

    /// Drop every header below `height`, returning how many were removed. The latest header is
    /// always kept.
    pub fn prune(&self, height: u64) -> usize {
        let mut headers = self.headers.write().unwrap_or_else(PoisonError::into_inner);
        let Some((&latest, _)) = headers.last_key_value() else {
            return 0;
        };
        let retained = headers.split_off(&height.min(latest));
        let removed = headers.len();
        *headers = retained;
        removed
    }
}

impl BlockStore for MemoryBlockStore {
    fn base(&self) -> Option<u64> {
        self.headers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .first_key_value()
            .map(|(height, _)| *height)
    }

    fn latest(&self) -> Option<u64> {
        self.headers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last_key_value()
            .map(|(height, _)| *height)
    }

    fn header(&self, height: u64) -> Option<Header> {
        self.headers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&height)
            .cloned()
    }
}

/// Parse the optional `height` parameter. Heights must be positive.
pub fn parse_height(height: Option<&str>) -> Result<Query, SyncError> {
    let Some(raw) = height else {
        return Ok(Query::Latest);
    };
    let height: i64 = raw
        .trim()
        .parse()
        .map_err(|_| SyncError::InvalidHeight(raw.to_string()))?;
    if height <= 0 {
        return Err(SyncError::NonPositiveHeight(height));
    }
    Ok(Query::Index(height as u64))
}

/// Sync status of the block selected by `query`.
pub fn get_sync_info_at_block(store: &dyn BlockStore, query: Query) -> Result<SyncInfo, SyncError> {
    let latest = store.latest().ok_or(SyncError::Empty)?;
    let height = match query {
        Query::Latest => latest,
        Query::Index(height) => {
            if height > latest {
                return Err(SyncError::HeightTooHigh { height, latest });
            }
            let base = store.base().unwrap_or(latest);
            if height < base {
                return Err(SyncError::HeightPruned { height, base });
            }
            height
        }
    };
    let header = store.header(height).ok_or(SyncError::HeightPruned {
        height,
        base: store.base().unwrap_or(latest),
    })?;
    Ok(SyncInfo {
        block_height: header.height,
        block_hash: header.hash_hex(),
        version: VERSION.to_string(),
    })
}

#[derive(Debug, Deserialize)]
pub struct SyncInfoParams {
    pub height: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

async fn sync_info(
    AxumState(store): AxumState<Arc<dyn BlockStore>>,
    AxumQuery(params): AxumQuery<SyncInfoParams>,
) -> Response {
    let result = parse_height(params.height.as_deref())
        .and_then(|query| get_sync_info_at_block(store.as_ref(), query));
    match result {
        Ok(info) => Json(info).into_response(),
        Err(err) => {
            debug!(error = %err, height = ?params.height, "sync_info request failed");
            (
                err.status(),
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Router exposing `/sync_info` over `store`.
pub fn router(store: Arc<dyn BlockStore>) -> Router {
    Router::new()
        .route("/sync_info", get(sync_info))
        .with_state(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use commonware_cryptography::{sha256::Sha256, Hasher};
    use msgfee_types::genesis_header;
    use tower::ServiceExt;

    fn store_with(blocks: u64) -> MemoryBlockStore {
        let mut header = genesis_header().child(1_000, Sha256::hash(b"block 1"));
        let store = MemoryBlockStore::starting_at(header.clone());
        for height in 2..=blocks {
            header = header.child(height * 1_000, Sha256::hash(&height.to_be_bytes()));
            store.append(header.clone()).unwrap();
        }
        store
    }

    #[test]
    fn append_requires_contiguous_heights() {
        let store = store_with(2);
        let stale = store.header(1).unwrap();
        assert_eq!(
            store.append(stale),
            Err(SyncError::NonContiguous {
                height: 1,
                latest: 2
            })
        );
        assert_eq!((store.base(), store.latest()), (Some(1), Some(2)));
    }

    #[test]
    fn prune_keeps_the_latest_block() {
        let store = store_with(5);
        assert_eq!(store.prune(3), 2);
        assert_eq!(store.base(), Some(3));
        assert_eq!(store.prune(100), 2);
        assert_eq!((store.base(), store.latest()), (Some(5), Some(5)));
    }

    #[test]
    fn heights_are_validated() {
        assert_eq!(parse_height(None), Ok(Query::Latest));
        assert_eq!(parse_height(Some("7")), Ok(Query::Index(7)));
        assert_eq!(parse_height(Some("0")), Err(SyncError::NonPositiveHeight(0)));
        assert_eq!(
            parse_height(Some("-3")),
            Err(SyncError::NonPositiveHeight(-3))
        );
        assert!(matches!(
            parse_height(Some("tall")),
            Err(SyncError::InvalidHeight(_))
        ));
    }

    #[test]
    fn sync_info_reports_selected_block() {
        let store = store_with(4);
        let latest = get_sync_info_at_block(&store, Query::Latest).unwrap();
        assert_eq!(latest.block_height, 4);
        assert_eq!(latest.block_hash, store.header(4).unwrap().hash_hex());
        assert_eq!(latest.version, VERSION);

        let second = get_sync_info_at_block(&store, Query::Index(2)).unwrap();
        assert_eq!(second.block_height, 2);

        assert_eq!(
            get_sync_info_at_block(&store, Query::Index(9)),
            Err(SyncError::HeightTooHigh {
                height: 9,
                latest: 4
            })
        );
        store.prune(3);
        assert_eq!(
            get_sync_info_at_block(&store, Query::Index(1)),
            Err(SyncError::HeightPruned { height: 1, base: 3 })
        );
        assert_eq!(
            get_sync_info_at_block(&MemoryBlockStore::new(), Query::Latest),
            Err(SyncError::Empty)
        );
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn endpoint_serves_sync_info() {
        let store: Arc<dyn BlockStore> = Arc::new(store_with(3));
        let expected_hash = store.header(2).unwrap().hash_hex();

        let (status, body) = get(router(store.clone()), "/sync_info?height=2").await;
        assert_eq!(status, StatusCode::OK);
        let info: SyncInfo = serde_json::from_slice(&body).unwrap();
        assert_eq!(info.block_height, 2);
        assert_eq!(info.block_hash, expected_hash);

        let (status, body) = get(router(store), "/sync_info").await;
        assert_eq!(status, StatusCode::OK);
        let info: SyncInfo = serde_json::from_slice(&body).unwrap();
        assert_eq!(info.block_height, 3);
    }

    #[tokio::test]
    async fn endpoint_maps_errors_to_status_codes() {
        let store: Arc<dyn BlockStore> = Arc::new(store_with(3));

        let (status, body) = get(router(store.clone()), "/sync_info?height=abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.error, "invalid height: abc");

        let (status, _) = get(router(store.clone()), "/sync_info?height=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get(router(store), "/sync_info?height=10").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
