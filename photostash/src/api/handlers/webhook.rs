use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::AppState;
use crate::telegram::Update;

/// Receive an update pushed by the platform.
///
/// While the bot is inactive the route behaves as if it did not exist. Otherwise every update is
/// acknowledged with 200, whatever happened to it, so the platform never redelivers.
pub async fn receive_update(State(state): State<AppState>, payload: Result<Json<Update>, JsonRejection>) -> Response {
    if !state.lifecycle.is_running() {
        debug!("Update received while bot is inactive");
        return StatusCode::NOT_FOUND.into_response();
    }

    let Json(update) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!(error = %rejection, "Rejected malformed update");
            return rejection.into_response();
        }
    };

    let outcome = state.bot.handle_update(update).await;
    debug!(?outcome, "Handled update");

    StatusCode::OK.into_response()
}

#[cfg(test)]
mod tests {
    use crate::ingest::content_name;
    use crate::lifecycle::StartOutcome;
    use crate::test_utils::{
        TEST_GROUP_ID, TEST_TOKEN, create_test_app, mount_photo_download, mount_set_webhook, photo_update_json,
    };
    use axum::http::StatusCode;
    use tempfile::TempDir;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn group_id() -> i64 {
        TEST_GROUP_ID.parse().unwrap()
    }

    #[tokio::test]
    async fn test_inactive_bot_answers_404() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock)
            .await;
        let dir = TempDir::new().unwrap();
        let server = create_test_app(dir.path(), &mock).await.into_test_server();

        let response = server
            .post(&format!("/bot{TEST_TOKEN}"))
            .json(&photo_update_json(group_id(), &["large"]))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[test_log::test(tokio::test)]
    async fn test_photo_from_group_is_stored() {
        let mock = MockServer::start().await;
        mount_set_webhook(&mock, true, 1).await;
        mount_photo_download(&mock, "large", "photos/file_3.jpg", b"the largest variant").await;
        let dir = TempDir::new().unwrap();
        let app = create_test_app(dir.path(), &mock).await;
        assert!(matches!(app.start_bot().await, StartOutcome::Registered));
        let server = app.into_test_server();

        let response = server
            .post(&format!("/bot{TEST_TOKEN}"))
            .json(&photo_update_json(group_id(), &["small", "large"]))
            .await;

        response.assert_status(StatusCode::OK);
        let stored = dir.path().join("images").join(content_name(b"the largest variant"));
        assert_eq!(std::fs::read(stored).unwrap(), b"the largest variant");
    }

    #[tokio::test]
    async fn test_photo_from_other_chat_is_acknowledged_and_dropped() {
        let mock = MockServer::start().await;
        mount_set_webhook(&mock, true, 1).await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock)
            .await;
        let dir = TempDir::new().unwrap();
        let app = create_test_app(dir.path(), &mock).await;
        app.start_bot().await;
        let server = app.into_test_server();

        let response = server
            .post(&format!("/bot{TEST_TOKEN}"))
            .json(&photo_update_json(42, &["large"]))
            .await;

        response.assert_status(StatusCode::OK);
        assert_eq!(std::fs::read_dir(dir.path().join("images")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_failed_lookup_is_still_acknowledged() {
        let mock = MockServer::start().await;
        mount_set_webhook(&mock, true, 1).await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock)
            .await;
        let dir = TempDir::new().unwrap();
        let app = create_test_app(dir.path(), &mock).await;
        app.start_bot().await;
        let server = app.into_test_server();

        let response = server
            .post(&format!("/bot{TEST_TOKEN}"))
            .json(&photo_update_json(group_id(), &["large"]))
            .await;

        response.assert_status(StatusCode::OK);
        assert_eq!(std::fs::read_dir(dir.path().join("images")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_update_is_rejected() {
        let mock = MockServer::start().await;
        mount_set_webhook(&mock, true, 1).await;
        let dir = TempDir::new().unwrap();
        let app = create_test_app(dir.path(), &mock).await;
        app.start_bot().await;
        let server = app.into_test_server();

        let response = server
            .post(&format!("/bot{TEST_TOKEN}"))
            .text("{not json")
            .content_type("application/json")
            .await;

        assert!(response.status_code().is_client_error());

        // The service keeps working afterwards
        server.get("/health").await.assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_wrong_token_path_is_404() {
        let mock = MockServer::start().await;
        mount_set_webhook(&mock, true, 1).await;
        let dir = TempDir::new().unwrap();
        let app = create_test_app(dir.path(), &mock).await;
        app.start_bot().await;
        let server = app.into_test_server();

        let response = server
            .post("/botwrong-token")
            .json(&photo_update_json(group_id(), &["large"]))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
    }
}
