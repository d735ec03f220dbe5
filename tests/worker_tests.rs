//! Integration Tests for the Network-Boundary Worker
//!
//! Drives a spawned worker task through its message channel with a scripted
//! fetcher: install pre-caching, offline fallback with the stale marker,
//! synthetic offline bodies and the control protocol.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use classcache::worker::{
    spawn_worker, ControlAck, ControlCommand, Destination, FetchError, Fetcher, WorkerRequest,
    WorkerResponse, SW_CACHE_STALE, SW_CACHE_TIMESTAMP, STATIC_ASSETS,
};

// == Scripted Fetcher ==

/// Serves a fixed response while "online"; a flipped switch simulates going
/// offline mid-test.
struct SwitchableFetcher {
    online: AtomicBool,
    response: WorkerResponse,
}

impl SwitchableFetcher {
    fn new(response: WorkerResponse) -> Arc<Self> {
        Arc::new(Self {
            online: AtomicBool::new(true),
            response,
        })
    }

    fn go_offline(&self) {
        self.online.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl Fetcher for SwitchableFetcher {
    async fn fetch(&self, _request: &WorkerRequest) -> Result<WorkerResponse, FetchError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(self.response.clone())
        } else {
            Err(FetchError::Unreachable("link down".to_string()))
        }
    }
}

// == Lifecycle Tests ==

#[tokio::test]
async fn test_install_precaches_app_shell() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = SwitchableFetcher::new(WorkerResponse::ok(b"shell".to_vec()));
    let (handle, task) =
        spawn_worker(fetcher.clone(), dir.path(), "https://school.test".to_string()).unwrap();

    // A first round-trip through the channel ensures install has finished
    handle
        .fetch(WorkerRequest::get("https://school.test/"))
        .await
        .unwrap();

    // Once installed, the shell is served without the network
    fetcher.go_offline();
    for asset in STATIC_ASSETS {
        let resp = handle
            .fetch(WorkerRequest::get(format!("https://school.test{}", asset)))
            .await
            .unwrap();
        assert_eq!(resp.status, 200, "asset {asset} should be pre-cached");
        assert_eq!(resp.body, b"shell".to_vec());
    }

    task.abort();
}

// == Fallback Tests ==

#[tokio::test]
async fn test_offline_whitelisted_route_served_stale_with_marker() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = SwitchableFetcher::new(WorkerResponse::json(200, &json!({"lessons": 4})));
    let (handle, task) =
        spawn_worker(fetcher.clone(), dir.path(), "https://school.test".to_string()).unwrap();

    let req = WorkerRequest::get("https://school.test/api/teachers/7/activities");

    // Prime the API bucket while online
    let online_resp = handle.fetch(req.clone()).await.unwrap();
    assert_eq!(online_resp.status, 200);
    assert!(online_resp.header(SW_CACHE_TIMESTAMP).is_none());

    fetcher.go_offline();

    // A fresh fallback is served without the stale marker
    let fallback = handle.fetch(req.clone()).await.unwrap();
    assert_eq!(fallback.status, 200);
    assert_eq!(fallback.body_json().unwrap()["lessons"], 4);
    assert!(fallback.header(SW_CACHE_TIMESTAMP).is_some());
    assert_eq!(fallback.header(SW_CACHE_STALE), None);

    task.abort();
}

#[tokio::test]
async fn test_offline_without_cache_yields_synthetic_503() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = SwitchableFetcher::new(WorkerResponse::ok(vec![]));
    let (handle, task) =
        spawn_worker(fetcher.clone(), dir.path(), "https://school.test".to_string()).unwrap();

    fetcher.go_offline();

    // Whitelisted but never cached
    let resp = handle
        .fetch(WorkerRequest::get("https://school.test/api/teachers/7/dashboard"))
        .await
        .unwrap();
    assert_eq!(resp.status, 503);
    let body = resp.body_json().unwrap();
    assert_eq!(body["error"], "No cached data available");
    assert_eq!(body["offline"], true);

    // Not whitelisted at all
    let resp = handle
        .fetch(WorkerRequest::get("https://school.test/api/finance/invoices"))
        .await
        .unwrap();
    assert_eq!(resp.status, 503);
    assert_eq!(resp.body_json().unwrap()["error"], "Network error");

    task.abort();
}

#[tokio::test]
async fn test_image_requests_use_their_own_bucket() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = SwitchableFetcher::new(WorkerResponse::ok(b"jpeg".to_vec()));
    let (handle, task) =
        spawn_worker(fetcher.clone(), dir.path(), "https://school.test".to_string()).unwrap();

    let req = WorkerRequest::get_with_destination(
        "https://school.test/media/crest.jpg",
        Destination::Image,
    );
    handle.fetch(req.clone()).await.unwrap();

    fetcher.go_offline();
    let resp = handle.fetch(req).await.unwrap();
    assert_eq!(resp.body, b"jpeg".to_vec());

    task.abort();
}

// == Control Protocol Tests ==

#[tokio::test]
async fn test_clear_cache_control_wipes_buckets() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = SwitchableFetcher::new(WorkerResponse::json(200, &json!({"ok": 1})));
    let (handle, task) =
        spawn_worker(fetcher.clone(), dir.path(), "https://school.test".to_string()).unwrap();

    let req = WorkerRequest::get("https://school.test/api/teachers/7/profile");
    handle.fetch(req.clone()).await.unwrap();

    let ack = handle.control(ControlCommand::ClearCache).await.unwrap();
    assert_eq!(ack, ControlAck { success: true });

    // With the bucket wiped and the network down, only the synthetic body is left
    fetcher.go_offline();
    let resp = handle.fetch(req).await.unwrap();
    assert_eq!(resp.status, 503);

    task.abort();
}

#[tokio::test]
async fn test_skip_waiting_control_is_acknowledged() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = SwitchableFetcher::new(WorkerResponse::ok(vec![]));
    let (handle, task) =
        spawn_worker(fetcher, dir.path(), "https://school.test".to_string()).unwrap();

    let ack = handle.control(ControlCommand::SkipWaiting).await.unwrap();
    assert!(ack.success);

    task.abort();
}

#[tokio::test]
async fn test_dead_worker_surfaces_as_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = SwitchableFetcher::new(WorkerResponse::ok(vec![]));
    let (handle, task) =
        spawn_worker(fetcher, dir.path(), "https://school.test".to_string()).unwrap();

    task.abort();
    // Give the abort a moment to land
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let err = handle
        .fetch(WorkerRequest::get("https://school.test/"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::WorkerUnavailable));
}
