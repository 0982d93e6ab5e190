mod common;

use axum::http::{Method, StatusCode};
use flitify_core::client::ApiError;
use flitify_core::{EntryType, LoginOutcome, Route, TokenStore};
use serde_json::json;

use common::{harness, issue_token, ok, spawn_backend};

#[tokio::test]
async fn login_stores_issued_token() {
    let token = issue_token("alice", 3600);
    let issued = token.clone();
    let (url, backend) = spawn_backend(move |_| ok(json!({"login_status": "ok", "token": issued}))).await;
    let h = harness(&url, None);

    let outcome = h.api.login("alice", "hunter2").await.unwrap();

    assert_eq!(outcome, LoginOutcome::Success { username: "alice".to_string() });
    assert_eq!(h.store.get(), Some(token));
    assert!(h.api.session().is_authenticated());

    let seen = backend.last();
    assert_eq!(seen.method, Method::POST);
    assert_eq!(seen.path, "/api/login");
    assert_eq!(seen.body_json(), json!({"username": "alice", "password": "hunter2"}));
}

#[tokio::test]
async fn login_does_not_send_a_previous_token() {
    let fresh = issue_token("bob", 3600);
    let issued = fresh.clone();
    let (url, backend) = spawn_backend(move |_| ok(json!({"login_status": "ok", "token": issued}))).await;
    let h = harness(&url, Some(&issue_token("alice", -60)));

    let outcome = h.api.login("bob", "pw").await.unwrap();

    assert_eq!(outcome, LoginOutcome::Success { username: "bob".to_string() });
    assert_eq!(backend.last().authorization, None);
    assert_eq!(h.store.get(), Some(fresh));
}

#[tokio::test]
async fn login_rejection_is_not_a_forced_logout() {
    let (url, _backend) = spawn_backend(|_| {
        (StatusCode::FORBIDDEN, json!({"login_status": "invalid_credentials"}).to_string())
    })
    .await;
    let h = harness(&url, None);

    let outcome = h.api.login("alice", "wrong").await.unwrap();

    assert_eq!(outcome, LoginOutcome::InvalidCredentials);
    assert!(!h.redirects.is_pending());
}

#[tokio::test]
async fn login_reports_other_statuses() {
    let (url, _backend) = spawn_backend(|_| {
        (StatusCode::BAD_REQUEST, json!({"login_status": "missing_details"}).to_string())
    })
    .await;
    let h = harness(&url, None);
    assert_eq!(
        h.api.login("", "").await.unwrap(),
        LoginOutcome::Failed("missing_details".to_string())
    );

    let (url, _backend) = spawn_backend(|_| ok(json!({}))).await;
    let h = harness(&url, None);
    assert_eq!(
        h.api.login("a", "b").await.unwrap(),
        LoginOutcome::Failed("unknown error".to_string())
    );
    assert_eq!(h.store.get(), None);
}

#[tokio::test]
async fn registry_crud() {
    let (url, backend) = spawn_backend(|seen| match (seen.method.as_str(), seen.path.as_str()) {
        ("GET", "/api/allclients") => ok(json!({
            "clients": [{"client_id": "PC-1", "secret": "s1"}, {"client_id": "PC-2", "secret": "s2"}]
        })),
        ("POST", "/api/allclients") => (StatusCode::CREATED, json!({"proxy_status": "ok"}).to_string()),
        ("PUT", "/api/allclients/PC-1") => ok(json!({"proxy_status": "updated"})),
        ("DELETE", "/api/allclients/PC%202") => ok(json!({"proxy_status": "deleted"})),
        _ => (StatusCode::NOT_FOUND, json!({"proxy_status": "not_found"}).to_string()),
    })
    .await;
    let h = harness(&url, Some(&issue_token("alice", 3600)));

    let clients = h.api.list_clients().await.unwrap();
    assert_eq!(clients.len(), 2);
    assert_eq!(clients[1].client_id, "PC-2");

    h.api.create_client("PC-3", "s3").await.unwrap();
    assert_eq!(backend.last().body_json(), json!({"client_id": "PC-3", "secret": "s3"}));

    h.api.update_client_secret("PC-1", "rotated").await.unwrap();
    assert_eq!(backend.last().body_json(), json!({"secret": "rotated"}));

    h.api.delete_client("PC 2").await.unwrap();

    let err = h.api.delete_client("ghost").await.unwrap_err();
    assert!(matches!(
        err,
        ApiError::Rejected { status, ref reason } if status == StatusCode::NOT_FOUND && reason == "not_found"
    ));
}

#[tokio::test]
async fn duplicate_registration_is_a_business_error() {
    let (url, _backend) = spawn_backend(|_| {
        (StatusCode::CONFLICT, json!({"proxy_status": "already_exists"}).to_string())
    })
    .await;
    let token = issue_token("alice", 3600);
    let h = harness(&url, Some(&token));

    let err = h.api.create_client("PC-1", "s").await.unwrap_err();

    assert!(matches!(
        err,
        ApiError::Rejected { status, ref reason } if status == StatusCode::CONFLICT && reason == "already_exists"
    ));
    assert_eq!(h.store.get(), Some(token));
    assert!(!h.redirects.is_pending());
}

#[tokio::test]
async fn change_password() {
    let (url, backend) = spawn_backend(|_| ok(json!({"proxy_status": "password_changed"}))).await;
    let h = harness(&url, Some(&issue_token("alice", 3600)));

    h.api.change_password("new-secret").await.unwrap();

    let seen = backend.last();
    assert_eq!(seen.path, "/api/users/change-password");
    assert_eq!(seen.body_json(), json!({"newpassword": "new-secret"}));
}

#[tokio::test]
async fn online_clients_and_status() {
    let (url, _backend) = spawn_backend(|seen| match seen.path.as_str() {
        "/api/proxy/clients" => ok(json!({
            "proxy_status": "ok",
            "status": "ok",
            "client_list": ["PC-1", "PC-2"]
        })),
        "/api/proxy/PC-1/status" => ok(json!({
            "proxy_status": "ok",
            "PC-1": {
                "uptime_seconds": 36812,
                "current_user": "jakub",
                "cpu_usage": 34,
                "memory_total": 8.0,
                "memory_used": 3.62,
                "disks": {"/dev/sda1": {"used": 83.97, "total": 512}},
                "running_applications": {"chrome.exe": {"name": "Google Chrome", "open_windows": 2}}
            }
        })),
        _ => ok(json!({"proxy_status": "failed"})),
    })
    .await;
    let h = harness(&url, Some(&issue_token("alice", 3600)));

    assert_eq!(h.api.online_clients().await.unwrap(), vec!["PC-1", "PC-2"]);

    let status = h.api.client_status("PC-1").await.unwrap();
    assert_eq!(status.current_user, "jakub");
    assert_eq!(status.running_applications["chrome.exe"].name, "Google Chrome");

    let err = h.api.client_status("PC-9").await.unwrap_err();
    assert!(matches!(err, ApiError::Proxy(ref s) if s == "failed"));
    assert!(!h.redirects.is_pending());
}

#[tokio::test]
async fn status_without_client_section_is_invalid() {
    let (url, _backend) = spawn_backend(|_| ok(json!({"proxy_status": "ok"}))).await;
    let h = harness(&url, Some(&issue_token("alice", 3600)));

    let err = h.api.client_status("PC-1").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse(_)));
}

#[tokio::test]
async fn list_dir_encodes_path_query() {
    let (url, backend) = spawn_backend(|_| {
        ok(json!({
            "proxy_status": "ok",
            "entries": [{"name": "My Docs", "type": "dir"}, {"name": "a.txt", "type": "file"}]
        }))
    })
    .await;
    let h = harness(&url, Some(&issue_token("alice", 3600)));

    let entries = h.api.list_dir("PC-1", "/home/jakub & co").await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].entry_type, EntryType::Dir);

    let seen = backend.last();
    assert_eq!(seen.path, "/api/proxy/PC-1/listdir");
    assert_eq!(seen.query.as_deref(), Some("path=%2Fhome%2Fjakub+%26+co"));
}

#[tokio::test]
async fn shell_command_round_trip() {
    let (url, backend) = spawn_backend(|_| {
        ok(json!({
            "proxy_status": "ok",
            "command_response": {"stdout": "jakub\n", "stderr": ""}
        }))
    })
    .await;
    let h = harness(&url, Some(&issue_token("alice", 3600)));

    let response = h.api.shell_command("PC-1", "whoami").await.unwrap();
    assert_eq!(response.stdout.as_deref(), Some("jakub\n"));
    assert_eq!(backend.last().query.as_deref(), Some("cmd=whoami"));
}

#[tokio::test]
async fn file_download_and_upload() {
    let (url, backend) = spawn_backend(|seen| match seen.path.as_str() {
        "/api/proxy/PC-1/getfile" => (StatusCode::OK, "file contents".to_string()),
        "/api/proxy/PC-1/uploadfile" => ok(json!({"proxy_status": "ok"})),
        _ => (StatusCode::NOT_FOUND, String::new()),
    })
    .await;
    let h = harness(&url, Some(&issue_token("alice", 3600)));

    let content = h.api.get_file("PC-1", "/etc/hostname").await.unwrap();
    assert_eq!(content, b"file contents");
    assert_eq!(backend.last().query.as_deref(), Some("file_path=%2Fetc%2Fhostname"));

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("hostname");
    let written = h.api.download_to("PC-1", "/etc/hostname", &dest).await.unwrap();
    assert_eq!(written, 13);
    assert_eq!(std::fs::read(&dest).unwrap(), b"file contents");

    let local = dir.path().join("report.txt");
    std::fs::write(&local, "quarterly numbers").unwrap();
    let remote = h.api.upload_path("PC-1", &local, "/home/jakub").await.unwrap();
    assert_eq!(remote, "/home/jakub/report.txt");

    let seen = backend.last();
    assert_eq!(seen.path, "/api/proxy/PC-1/uploadfile");
    let content_type = seen.content_type.clone().unwrap_or_default();
    assert!(content_type.starts_with("multipart/form-data; boundary="));
    let body = seen.body_text();
    assert!(body.contains("name=\"file\"; filename=\"report.txt\""));
    assert!(body.contains("quarterly numbers"));
    assert!(body.contains("/home/jakub/report.txt"));
}

#[tokio::test]
async fn missing_file_is_rejected() {
    let (url, _backend) = spawn_backend(|seen| match seen.query.as_deref() {
        Some("file_path=%2Fgone") => (StatusCode::NOT_FOUND, json!({"proxy_status": "file_not_found"}).to_string()),
        _ => (StatusCode::NOT_FOUND, String::new()),
    })
    .await;
    let h = harness(&url, Some(&issue_token("alice", 3600)));

    let err = h.api.get_file("PC-1", "/nope").await.unwrap_err();
    assert!(matches!(err, ApiError::Rejected { status, .. } if status == StatusCode::NOT_FOUND));

    let err = h.api.get_file("PC-1", "/gone").await.unwrap_err();
    assert!(matches!(err, ApiError::Rejected { ref reason, .. } if reason == "file_not_found"));
}

#[tokio::test]
async fn expired_session_during_proxy_call() {
    let (url, _backend) = spawn_backend(|_| {
        (StatusCode::UNAUTHORIZED, json!({"error": "token_expired"}).to_string())
    })
    .await;
    let h = harness(&url, Some(&issue_token("alice", 3600)));

    let err = h.api.shell_command("PC-1", "uptime").await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(h.store.get(), None);
    assert_eq!(h.redirects.take(), Some(Route::Login));
}
