use std::sync::Arc;

use axum::routing::{delete, get, patch, post};
use axum::Router;
use rollcall_config::{get_pid_path, remove_pid, write_pid, Config};
use rollcall_sheets::Mirror;
use rollcall_store::RecordStore;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::info;

use crate::handlers::{
    handle_add_user, handle_delete_user, handle_describe_session, handle_get_user,
    handle_list_users, handle_shutdown, handle_update_user, HandlerContext,
};

pub struct DaemonServer {
    config: Config,
    ctx: HandlerContext,
}

impl DaemonServer {
    pub fn new(config: Config, store: Arc<dyn RecordStore>, mirror: Option<Arc<dyn Mirror>>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let ctx = HandlerContext {
            store,
            mirror,
            bind: config.daemon.bind.clone(),
            shutdown_tx,
        };
        Self { config, ctx }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(&self.config.daemon.bind).await?;
        let pid_path = get_pid_path();
        write_pid(&pid_path, std::process::id())?;

        info!("Daemon started, listening on {}", listener.local_addr()?);

        let mut shutdown_rx = self.ctx.shutdown_tx.subscribe();
        let app = router(self.ctx.clone());

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Shutdown signal received");
                    }
                    _ = tokio::signal::ctrl_c() => {
                        info!("Ctrl-C received, shutting down");
                    }
                }
            })
            .await?;

        info!("Shutting down daemon");
        remove_pid(&pid_path);
        Ok(())
    }
}

pub fn router(ctx: HandlerContext) -> Router {
    Router::new()
        .route("/getuser", get(handle_list_users))
        .route("/getuser/:name", get(handle_get_user))
        .route("/adduser", post(handle_add_user))
        .route("/updateuser/:name", patch(handle_update_user))
        .route("/deleteuser/:name", delete(handle_delete_user))
        .route("/session", get(handle_describe_session))
        .route("/shutdown", post(handle_shutdown))
        .with_state(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use reqwest::StatusCode;
    use rollcall_sheets::{SheetsError, SheetsResult};
    use rollcall_store::MemoryStore;
    use rollcall_types::{
        seed_records, DescribeSessionResult, MessageResponse, ShutdownResult, UserRecord,
    };
    use serde_json::json;

    #[derive(Default)]
    struct RecordingMirror {
        rows: Mutex<Vec<UserRecord>>,
    }

    #[async_trait]
    impl Mirror for RecordingMirror {
        async fn append(&self, record: &UserRecord) -> SheetsResult<()> {
            self.rows.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    struct FailingMirror;

    #[async_trait]
    impl Mirror for FailingMirror {
        async fn append(&self, _record: &UserRecord) -> SheetsResult<()> {
            Err(SheetsError::Api {
                status: 503,
                body: "backend unavailable".to_string(),
            })
        }
    }

    struct TestServer {
        base_url: String,
        client: reqwest::Client,
        shutdown_rx: broadcast::Receiver<()>,
    }

    impl TestServer {
        fn url(&self, path: &str) -> String {
            format!("{}{}", self.base_url, path)
        }
    }

    async fn start(mirror: Option<Arc<dyn Mirror>>) -> TestServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let ctx = HandlerContext {
            store: Arc::new(MemoryStore::with_records(seed_records())),
            mirror,
            bind: addr.to_string(),
            shutdown_tx,
        };

        let app = router(ctx);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        TestServer {
            base_url: format!("http://{}", addr),
            client: reqwest::Client::new(),
            shutdown_rx,
        }
    }

    async fn names(server: &TestServer) -> Vec<String> {
        let users: Vec<UserRecord> = server
            .client
            .get(server.url("/getuser"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        users.into_iter().map(|u| u.name).collect()
    }

    #[tokio::test]
    async fn test_list_seeded_users() {
        let server = start(None).await;
        assert_eq!(names(&server).await, vec!["Jack", "David", "Austin"]);
        assert_eq!(names(&server).await, vec!["Jack", "David", "Austin"]);
    }

    #[tokio::test]
    async fn test_get_then_delete() {
        let server = start(None).await;

        let response = server.client.get(server.url("/getuser/David")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let david: UserRecord = response.json().await.unwrap();
        assert_eq!(david.name, "David");

        let response = server
            .client
            .delete(server.url("/deleteuser/David"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let message: MessageResponse = response.json().await.unwrap();
        assert_eq!(message.message, "user deleted");

        let response = server.client.get(server.url("/getuser/David")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let message: MessageResponse = response.json().await.unwrap();
        assert_eq!(message.message, "user not found");

        let response = server
            .client
            .delete(server.url("/deleteuser/David"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        assert_eq!(names(&server).await, vec!["Jack", "Austin"]);
    }

    #[tokio::test]
    async fn test_get_unknown_user() {
        let server = start(None).await;
        let response = server.client.get(server.url("/getuser/Zoe")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_add_user_is_mirrored() {
        let mirror = Arc::new(RecordingMirror::default());
        let server = start(Some(mirror.clone())).await;

        let body = json!({
            "name": "Mia",
            "age": 22,
            "commute_method": "Walk",
            "college": "MIT",
            "hobbies": "Chess"
        });
        let response = server
            .client
            .post(server.url("/adduser"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let echoed: serde_json::Value = response.json().await.unwrap();
        assert_eq!(echoed, body);

        let response = server.client.get(server.url("/getuser/Mia")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let mia: UserRecord = response.json().await.unwrap();
        assert_eq!(mia, UserRecord::new("Mia", 22, "Walk", "MIT", "Chess"));

        assert_eq!(*mirror.rows.lock().unwrap(), vec![mia]);
        assert_eq!(names(&server).await, vec!["Jack", "David", "Austin", "Mia"]);
    }

    #[tokio::test]
    async fn test_add_user_without_mirror() {
        let server = start(None).await;
        let response = server
            .client
            .post(server.url("/adduser"))
            .json(&json!({"name": "Jack", "age": 40}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        // Duplicate names are accepted; lookups still resolve to the first.
        let jack: UserRecord = server
            .client
            .get(server.url("/getuser/Jack"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(jack.age, 21);
        assert_eq!(names(&server).await.len(), 4);
    }

    #[tokio::test]
    async fn test_mirror_failure_keeps_record() {
        let server = start(Some(Arc::new(FailingMirror))).await;

        let response = server
            .client
            .post(server.url("/adduser"))
            .json(&json!({"name": "Mia", "age": 22}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let message: MessageResponse = response.json().await.unwrap();
        assert_eq!(message.message, "Failed to store data in Google Sheets");

        let response = server.client.get(server.url("/getuser/Mia")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_add_malformed_body() {
        let mirror = Arc::new(RecordingMirror::default());
        let server = start(Some(mirror.clone())).await;

        let response = server
            .client
            .post(server.url("/adduser"))
            .header("content-type", "application/json")
            .body("{\"name\": ")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let message: MessageResponse = response.json().await.unwrap();
        assert_eq!(message.message, "invalid JSON data");

        assert!(mirror.rows.lock().unwrap().is_empty());
        assert_eq!(names(&server).await.len(), 3);
    }

    #[tokio::test]
    async fn test_body_decoded_regardless_of_content_type() {
        let server = start(None).await;

        let response = server
            .client
            .post(server.url("/adduser"))
            .header("content-type", "application/x-www-form-urlencoded")
            .body(r#"{"name":"Mia","age":22,"commute_method":"Walk","college":"MIT","hobbies":"Chess"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(names(&server).await, vec!["Jack", "David", "Austin", "Mia"]);

        let response = server
            .client
            .patch(server.url("/updateuser/Mia"))
            .body(r#"{"name":"Mia","age":23}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let mia: UserRecord = server
            .client
            .get(server.url("/getuser/Mia"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(mia, UserRecord::new("Mia", 23, "", "", ""));
    }

    #[tokio::test]
    async fn test_update_is_full_replace() {
        let server = start(None).await;

        let response = server
            .client
            .patch(server.url("/updateuser/Jack"))
            .json(&json!({
                "name": "Jack",
                "age": 25,
                "commute_method": "Train",
                "college": "Harvard"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let jack: UserRecord = server
            .client
            .get(server.url("/getuser/Jack"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(jack, UserRecord::new("Jack", 25, "Train", "Harvard", ""));
        assert_eq!(names(&server).await, vec!["Jack", "David", "Austin"]);
    }

    #[tokio::test]
    async fn test_update_errors() {
        let server = start(None).await;

        let response = server
            .client
            .patch(server.url("/updateuser/Zoe"))
            .json(&json!({"name": "Zoe"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        // Unknown name wins over a bad body.
        let response = server
            .client
            .patch(server.url("/updateuser/Zoe"))
            .header("content-type", "application/json")
            .body("nope")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = server
            .client
            .patch(server.url("/updateuser/Jack"))
            .json(&json!({"name": "Jack", "age": "twenty"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let jack: UserRecord = server
            .client
            .get(server.url("/getuser/Jack"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(jack.age, 21);
        assert_eq!(jack.hobbies, "Golf");
    }

    #[tokio::test]
    async fn test_session_and_shutdown() {
        let mut server = start(Some(Arc::new(RecordingMirror::default()))).await;

        let session: DescribeSessionResult = server
            .client
            .get(server.url("/session"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(session.records, 3);
        assert!(session.mirror_enabled);
        assert_eq!(session.daemon_pid, std::process::id());

        let result: ShutdownResult = server
            .client
            .post(server.url("/shutdown"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(result.status, "shutting_down");
        assert!(server.shutdown_rx.recv().await.is_ok());
    }
}
