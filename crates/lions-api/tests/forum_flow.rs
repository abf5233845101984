use std::io::Cursor;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lions_api::{AppState, AppStateInner, router};
use lions_avatar::AvatarStore;
use lions_db::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    state: AppState,
    _tmp: tempfile::TempDir,
}

/// A signed-in client: cookie header value plus CSRF token.
struct Client {
    cookie: String,
    csrf: String,
    user_id: i64,
}

struct Reply {
    status: StatusCode,
    set_cookie: Option<String>,
    cache_control: Option<String>,
    json: Value,
}

async fn app() -> TestApp {
    let tmp = tempfile::tempdir().unwrap();
    let state = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        avatars: AvatarStore::new(tmp.path().join("avatars")).await.unwrap(),
        cookie_secure: false,
    });
    TestApp {
        router: router(state.clone()),
        state,
        _tmp: tmp,
    }
}

impl TestApp {
    async fn send(&self, req: Request<Body>) -> Reply {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let set_cookie = resp
            .headers()
            .get(header::SET_COOKIE)
            .map(|v| v.to_str().unwrap().to_string());
        let cache_control = resp
            .headers()
            .get(header::CACHE_CONTROL)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Reply { status, set_cookie, cache_control, json }
    }

    async fn get(&self, uri: &str, client: Option<&Client>) -> Reply {
        let mut req = Request::builder().uri(uri);
        if let Some(c) = client {
            req = req.header(header::COOKIE, &c.cookie);
        }
        self.send(req.body(Body::empty()).unwrap()).await
    }

    async fn post_json(&self, uri: &str, client: Option<&Client>, body: Value) -> Reply {
        let mut req = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(c) = client {
            req = req.header(header::COOKIE, &c.cookie).header("x-csrf-token", &c.csrf);
        }
        self.send(req.body(Body::from(body.to_string())).unwrap()).await
    }

    async fn register(&self, name: &str) -> Client {
        let reply = self
            .post_json(
                "/auth/register",
                None,
                json!({ "email": format!("{}@lions.test", name), "username": name, "password": "hunter2hunter2" }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);
        let cookie = reply.set_cookie.unwrap().split(';').next().unwrap().to_string();
        assert!(cookie.starts_with("session_id="));
        Client {
            cookie,
            csrf: reply.json["csrf_token"].as_str().unwrap().to_string(),
            user_id: reply.json["user_id"].as_i64().unwrap(),
        }
    }

    fn session_count(&self) -> i64 {
        self.state
            .db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM sessions", [], |r| r.get(0))?))
            .unwrap()
    }
}

fn ids(list: &Value) -> Vec<i64> {
    list.as_array().unwrap().iter().map(|p| p["id"].as_i64().unwrap()).collect()
}

#[tokio::test]
async fn duplicate_email_conflicts_without_a_session() {
    let app = app().await;
    app.register("ada").await;
    assert_eq!(app.session_count(), 1);

    let reply = app
        .post_json(
            "/auth/register",
            None,
            json!({ "email": "ada@lions.test", "username": "someone_else", "password": "longenough" }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert!(reply.set_cookie.is_none());
    assert_eq!(app.session_count(), 1);
}

#[tokio::test]
async fn login_logout_roundtrip() {
    let app = app().await;
    app.register("bea").await;

    let bad = app
        .post_json("/auth/login", None, json!({ "email": "bea@lions.test", "password": "wrong-password" }))
        .await;
    assert_eq!(bad.status, StatusCode::UNAUTHORIZED);

    let good = app
        .post_json("/auth/login", None, json!({ "email": " bea@lions.test ", "password": "hunter2hunter2" }))
        .await;
    assert_eq!(good.status, StatusCode::OK);
    let cookie = good.set_cookie.unwrap().split(';').next().unwrap().to_string();
    let client = Client {
        cookie,
        csrf: good.json["csrf_token"].as_str().unwrap().to_string(),
        user_id: good.json["user_id"].as_i64().unwrap(),
    };

    let me = app.get("/me", Some(&client)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.json["user"]["username"], "bea");

    let out = app.post_json("/auth/logout", Some(&client), json!({})).await;
    assert_eq!(out.status, StatusCode::NO_CONTENT);
    assert!(out.set_cookie.unwrap().contains("Max-Age=0"));
    assert_eq!(app.get("/me", Some(&client)).await.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn mutations_need_session_and_csrf() {
    let app = app().await;
    let mut client = app.register("cal").await;
    let body = json!({ "title": "Hello", "content": "World", "categories": "fiction" });

    assert_eq!(app.post_json("/posts", None, body.clone()).await.status, StatusCode::UNAUTHORIZED);

    let real_csrf = std::mem::replace(&mut client.csrf, "forged".into());
    assert_eq!(app.post_json("/posts", Some(&client), body.clone()).await.status, StatusCode::FORBIDDEN);

    client.csrf = real_csrf;
    let created = app.post_json("/posts", Some(&client), body).await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert!(created.json["id"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn reactions_toggle_and_filters_compose() {
    let app = app().await;
    let viewer = app.register("dot").await;
    let other = app.register("eli").await;

    let p1 = app
        .post_json("/posts", Some(&viewer), json!({ "title": "Mine", "content": "by dot", "categories": "fiction" }))
        .await
        .json["id"]
        .as_i64()
        .unwrap();
    let p2 = app
        .post_json("/posts", Some(&other), json!({ "title": "Theirs", "content": "by eli" }))
        .await
        .json["id"]
        .as_i64()
        .unwrap();

    let liked = app.post_json("/react", Some(&viewer), json!({ "kind": "post", "id": p2, "v": 1 })).await;
    assert_eq!(liked.status, StatusCode::OK);
    assert_eq!(liked.json["state"], "liked");
    assert_eq!(liked.json["likes"], 1);

    let bad_kind = app.post_json("/react", Some(&viewer), json!({ "kind": "thread", "id": p2, "v": 1 })).await;
    assert_eq!(bad_kind.status, StatusCode::BAD_REQUEST);
    let bad_value = app.post_json("/react", Some(&viewer), json!({ "kind": "post", "id": p2, "v": 0 })).await;
    assert_eq!(bad_value.status, StatusCode::BAD_REQUEST);
    let missing = app.post_json("/react", Some(&viewer), json!({ "kind": "comment", "id": 99, "v": 1 })).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    assert_eq!(ids(&app.get("/?mine=1", Some(&viewer)).await.json["posts"]), vec![p1]);
    assert_eq!(ids(&app.get("/?liked=1", Some(&viewer)).await.json["posts"]), vec![p2]);
    assert!(ids(&app.get("/?mine=1&liked=1", Some(&viewer)).await.json["posts"]).is_empty());
    // anonymous viewers simply lose the personal filters
    assert_eq!(ids(&app.get("/?mine=1", None).await.json["posts"]), vec![p2, p1]);

    let home = app.get("/", None).await.json;
    let fiction = home["categories"][0]["id"].as_i64().unwrap();
    assert_eq!(ids(&app.get(&format!("/?cat={}", fiction), None).await.json["posts"]), vec![p1]);

    // second identical toggle removes the like
    let unliked = app.post_json("/react", Some(&viewer), json!({ "kind": "post", "id": p2, "v": 1 })).await;
    assert_eq!(unliked.json["state"], "unvoted");
    assert_eq!(unliked.json["likes"], 0);

    let comment = app
        .post_json(&format!("/posts/{}/comments", p1), Some(&other), json!({ "content": "nice" }))
        .await;
    assert_eq!(comment.status, StatusCode::CREATED);
    let cid = comment.json["id"].as_i64().unwrap();
    let disliked = app.post_json("/react", Some(&viewer), json!({ "kind": "comment", "id": cid, "v": -1 })).await;
    assert_eq!(disliked.json["state"], "disliked");

    let post = app.get(&format!("/posts/{}", p1), None).await;
    assert_eq!(post.status, StatusCode::OK);
    assert_eq!(post.json["post"]["categories"], json!(["fiction"]));
    assert_eq!(post.json["comments"][0]["dislikes"], 1);
}

#[tokio::test]
async fn profile_pages_through_posts() {
    let app = app().await;
    let client = app.register("fin").await;
    for i in 0..25 {
        app.state.db.create_post(client.user_id, &format!("post {}", i), "body", "").unwrap();
    }

    let first = app.get("/u/fin?limit=10", None).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.json["tab"], "posts");
    assert_eq!(first.json["counts"]["posts"], 25);
    assert_eq!(first.json["posts"]["has_next"], true);
    assert_eq!(first.json["posts"]["has_prev"], false);
    assert_eq!(first.json["links"]["next_url"], "/u/fin/posts?page=2&limit=10");
    assert_eq!(first.json["is_owner"], false);

    let last = app.get("/u/fin/posts?page=3&limit=10", Some(&client)).await;
    assert_eq!(last.json["posts"]["items"].as_array().unwrap().len(), 5);
    assert_eq!(last.json["posts"]["has_next"], false);
    assert_eq!(last.json["posts"]["has_prev"], true);
    assert_eq!(last.json["is_owner"], true);

    let comments = app.get("/u/fin/comments", None).await;
    assert_eq!(comments.json["tab"], "comments");
    assert_eq!(comments.json["comments"]["total"], 0);

    assert_eq!(app.get("/u/ghost", None).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn avatar_upload_is_normalised_and_served() {
    let app = app().await;
    let client = app.register("gil").await;

    let mut png = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 200, Rgb([200, 40, 40])))
        .write_to(&mut png, ImageFormat::Png)
        .unwrap();
    let png = png.into_inner();

    let len = png.len() as u64;
    let reply = app.send(upload_request(&client, png, Some(len))).await;
    assert_eq!(reply.status, StatusCode::OK);
    let path = format!("/uploads/avatars/{}.jpg", client.user_id);
    assert_eq!(reply.json["avatar_path"], path.as_str());

    let stored = app.state.avatars.file_path(client.user_id);
    let img = image::open(&stored).unwrap();
    assert_eq!((img.width(), img.height()), (256, 256));

    let me = app.get("/me", Some(&client)).await;
    assert_eq!(me.json["user"]["avatar_path"], path.as_str());

    let served = app.get(&path, None).await;
    assert_eq!(served.status, StatusCode::OK);
    assert_eq!(served.cache_control.as_deref(), Some("public, max-age=86400"));

    let rejected = app.send(upload_request(&client, b"definitely not an image".to_vec(), None)).await;
    assert_eq!(rejected.status, StatusCode::BAD_REQUEST);
}

fn upload_request(client: &Client, body: Vec<u8>, content_length: Option<u64>) -> Request<Body> {
    let mut req = Request::builder()
        .method("POST")
        .uri("/me/avatar")
        .header(header::COOKIE, &client.cookie)
        .header("x-csrf-token", &client.csrf);
    if let Some(len) = content_length {
        req = req.header(header::CONTENT_LENGTH, len);
    }
    req.body(Body::from(body)).unwrap()
}

fn error_text(reply: &Reply) -> &str {
    reply.json["error"].as_str().unwrap()
}

#[tokio::test]
async fn avatar_size_cap_is_a_validation_error() {
    const CAP: usize = 2 * 1024 * 1024;
    let app = app().await;
    let client = app.register("ivy").await;

    // Exactly at the cap: passes the size check, fails on content.
    let at_cap = app.send(upload_request(&client, vec![0u8; CAP], Some(CAP as u64))).await;
    assert_eq!(at_cap.status, StatusCode::BAD_REQUEST);
    assert!(error_text(&at_cap).contains("JPEG or PNG"), "{}", error_text(&at_cap));

    let over = app.send(upload_request(&client, vec![0u8; CAP + 1], Some(CAP as u64 + 1))).await;
    assert_eq!(over.status, StatusCode::BAD_REQUEST);
    assert!(error_text(&over).contains("larger than"));

    let huge = app.send(upload_request(&client, vec![0u8; 5 * 1024 * 1024], Some(5 * 1024 * 1024))).await;
    assert_eq!(huge.status, StatusCode::BAD_REQUEST);
    assert!(error_text(&huge).contains("larger than"));

    // No declared size: the buffered body runs into the route limit.
    let undeclared = app.send(upload_request(&client, vec![0u8; 5 * 1024 * 1024], None)).await;
    assert_eq!(undeclared.status, StatusCode::BAD_REQUEST);
    assert!(error_text(&undeclared).contains("larger than"));

    // A small declared size does not excuse an oversized body.
    let understated = app.send(upload_request(&client, vec![0u8; CAP + 1], Some(16))).await;
    assert_eq!(understated.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_bodies_are_validation_errors() {
    let app = app().await;
    let client = app.register("jay").await;
    let pid = app
        .post_json("/posts", Some(&client), json!({ "title": "T", "content": "C" }))
        .await
        .json["id"]
        .as_i64()
        .unwrap();

    let bad_reactions = [
        json!({ "kind": "post", "id": "abc", "v": 1 }),
        json!({ "kind": "post", "id": pid, "v": 1.5 }),
        json!({ "kind": "post", "v": 1 }),
        json!({ "kind": "post", "id": pid, "v": 1, "extra": true }),
    ];
    for body in bad_reactions {
        let reply = app.post_json("/react", Some(&client), body.clone()).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{}", body);
        assert!(reply.json["error"].is_string(), "{}", body);
    }

    let reply = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.json["error"].is_string());
}

#[tokio::test]
async fn settings_update_profile_fields() {
    let app = app().await;
    let client = app.register("hal").await;

    let ok = app
        .post_json("/me/settings", Some(&client), json!({ "display_name": " Hal ", "bio": "reads a lot" }))
        .await;
    assert_eq!(ok.status, StatusCode::NO_CONTENT);

    let profile = app.get("/u/hal", None).await;
    assert_eq!(profile.json["profile"]["display_name"], "Hal");
    assert_eq!(profile.json["profile"]["bio"], "reads a lot");
    assert!(profile.json["profile"].get("email").is_none());

    let too_long = app
        .post_json("/me/settings", Some(&client), json!({ "display_name": "x".repeat(51) }))
        .await;
    assert_eq!(too_long.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_endpoints_answer() {
    let app = app().await;
    assert_eq!(app.get("/health", None).await.status, StatusCode::OK);
    assert_eq!(app.get("/dbcheck", None).await.status, StatusCode::OK);
}
