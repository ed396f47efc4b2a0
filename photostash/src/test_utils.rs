//! Test utilities shared by unit and integration tests.

use std::path::Path;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::config::{Config, TelegramConfig};
use crate::telegram::Update;

pub const TEST_TOKEN: &str = "123456:test-token";
pub const TEST_GROUP_ID: &str = "-1001234567890";

/// A valid config rooted in `dir`, talking to the Bot API at `api_base`.
pub fn create_test_config(dir: &Path, api_base: &str) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        images_dir: dir.join("images"),
        lock_file: dir.join("bot.lock"),
        telegram_token: Some(TEST_TOKEN.to_string()),
        group_id: Some(TEST_GROUP_ID.to_string()),
        webhook_url: Some("https://photos.example.com".to_string()),
        telegram: TelegramConfig {
            api_base: Url::parse(api_base).unwrap(),
            delete_webhook_on_shutdown: false,
        },
    }
}

/// A photo message in `chat_id` with one size variant per file id, smallest first.
pub fn photo_update(chat_id: i64, file_ids: &[&str]) -> Update {
    serde_json::from_value(photo_update_json(chat_id, file_ids)).unwrap()
}

/// Raw webhook payload for [`photo_update`], shaped like a real platform delivery.
pub fn photo_update_json(chat_id: i64, file_ids: &[&str]) -> serde_json::Value {
    let photo: Vec<serde_json::Value> = file_ids
        .iter()
        .enumerate()
        .map(|(i, file_id)| {
            let side = 90 * (i as u32 + 1);
            serde_json::json!({
                "file_id": file_id,
                "file_unique_id": format!("unique-{file_id}"),
                "file_size": 1000 * (i + 1),
                "width": side,
                "height": side,
            })
        })
        .collect();

    serde_json::json!({
        "update_id": 10000,
        "message": {
            "message_id": 1,
            "date": 1700000000,
            "from": { "id": 99, "is_bot": false, "first_name": "Tester" },
            "chat": { "id": chat_id, "title": "Photos", "type": "supergroup" },
            "photo": photo,
        }
    })
}

pub fn text_update(chat_id: i64) -> Update {
    serde_json::from_value(serde_json::json!({
        "update_id": 10001,
        "message": {
            "message_id": 2,
            "date": 1700000000,
            "chat": { "id": chat_id, "type": "supergroup" },
            "text": "hello"
        }
    }))
    .unwrap()
}

/// Mount `getFile` for `file_id` and the matching download returning `body`.
pub async fn mount_photo_download(server: &MockServer, file_id: &str, file_path: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/bot{TEST_TOKEN}/getFile")))
        .and(query_param("file_id", file_id))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": true,
            "result": {
                "file_id": file_id,
                "file_unique_id": format!("unique-{file_id}"),
                "file_size": body.len(),
                "file_path": file_path,
            }
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/file/bot{TEST_TOKEN}/{file_path}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

/// Mount `setWebhook`, succeeding or failing, expected to be called `times` times.
pub async fn mount_set_webhook(server: &MockServer, succeed: bool, times: u64) {
    let body = if succeed {
        serde_json::json!({ "ok": true, "result": true, "description": "Webhook was set" })
    } else {
        serde_json::json!({ "ok": false, "error_code": 401, "description": "Unauthorized" })
    };
    let status = if succeed { 200 } else { 401 };

    Mock::given(method("POST"))
        .and(path(format!("/bot{TEST_TOKEN}/setWebhook")))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .expect(times)
        .mount(server)
        .await;
}

/// An application rooted in `dir` whose Bot API is `server`. The bot is not started.
pub async fn create_test_app(dir: &Path, server: &MockServer) -> crate::Application {
    crate::Application::new(create_test_config(dir, &server.uri()))
        .await
        .expect("Failed to create application")
}
