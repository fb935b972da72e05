//! HTTP-level tests driving the full router against an in-memory database.

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::Duration;
use flock_api::{AppStateInner, router};
use flock_db::Database;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

fn create_app_with_ttl(ttl: Duration) -> Router {
    let db = Database::open_in_memory().unwrap();
    router(AppStateInner::new(db, ttl, false))
}

fn create_app() -> Router {
    create_app_with_ttl(Duration::hours(24))
}

struct Reply {
    status: StatusCode,
    /// `name=value` part of the first `Set-Cookie`.
    cookie: Option<String>,
    /// The whole `Set-Cookie` header, attributes included.
    set_cookie: Option<String>,
    body: Value,
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> Reply {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let cookie = set_cookie
        .as_deref()
        .and_then(|v| v.split(';').next())
        .map(str::to_string);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    Reply {
        status,
        cookie,
        set_cookie,
        body,
    }
}

/// Signs `username` up and returns their `sessionId=...` cookie.
async fn signup(app: &Router, username: &str) -> String {
    let reply = send(
        app,
        Method::POST,
        "/api/users/create",
        None,
        Some(json!({
            "name": username.to_uppercase(),
            "email": format!("{}@example.com", username),
            "username": username,
            "password": "correct horse",
            "birthYear": 1994,
            "birthMonth": 2,
            "birthDay": 17,
        })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    reply.cookie.unwrap()
}

async fn create_post(app: &Router, cookie: &str, text: &str) -> String {
    let reply = send(
        app,
        Method::POST,
        "/api/posts",
        Some(cookie),
        Some(json!({ "textContent": text })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    reply.body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn signup_issues_a_usable_session() {
    let app = create_app();
    let cookie = signup(&app, "alice").await;
    assert!(cookie.starts_with("sessionId="));

    let me = send(&app, Method::GET, "/api/users/me", Some(&cookie), None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["username"], "alice");
    assert!(me.body.get("password").is_none());
}

#[tokio::test]
async fn authenticate_checks_credentials() {
    let app = create_app();
    signup(&app, "alice").await;

    let ok = send(
        &app,
        Method::POST,
        "/api/users/authenticate",
        None,
        Some(json!({ "username": "alice", "password": "correct horse" })),
    )
    .await;
    assert_eq!(ok.status, StatusCode::OK);
    assert_eq!(ok.body["success"], true);
    assert_eq!(ok.body["username"], "alice");

    let me = send(&app, Method::GET, "/api/users/me", ok.cookie.as_deref(), None).await;
    assert_eq!(me.body["username"], "alice");

    let bad = send(
        &app,
        Method::POST,
        "/api/users/authenticate",
        None,
        Some(json!({ "username": "alice", "password": "wrong" })),
    )
    .await;
    assert_eq!(bad.status, StatusCode::UNAUTHORIZED);
    assert!(bad.cookie.is_none());

    let unknown = send(
        &app,
        Method::POST,
        "/api/users/authenticate",
        None,
        Some(json!({ "username": "nobody", "password": "x" })),
    )
    .await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_clears_the_cookie_with_its_original_attributes() {
    let app = router(AppStateInner::new(
        Database::open_in_memory().unwrap(),
        Duration::hours(24),
        true,
    ));
    let cookie = signup(&app, "alice").await;

    let reply = send(&app, Method::POST, "/api/users/logout", Some(&cookie), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["message"], "Logged out");

    let cleared = reply.set_cookie.unwrap();
    assert!(cleared.starts_with("sessionId=;"), "{}", cleared);
    for attribute in ["Path=/", "HttpOnly", "SameSite=None", "Secure", "Max-Age=0"] {
        assert!(cleared.contains(attribute), "{} missing from {}", attribute, cleared);
    }
}

#[tokio::test]
async fn feed_requires_a_session() {
    let app = create_app();

    let reply = send(&app, Method::GET, "/api/posts", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body, json!({ "error": "Unauthorized" }));

    let forged = send(&app, Method::GET, "/api/posts", Some("sessionId=forged"), None).await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
    assert_eq!(forged.body["error"], "Unauthorized");
}

#[tokio::test]
async fn expired_sessions_are_rejected_everywhere() {
    let app = create_app_with_ttl(Duration::hours(-1));
    let cookie = signup(&app, "alice").await;

    for (method, uri) in [
        (Method::GET, "/api/posts"),
        (Method::GET, "/api/users/me"),
        (Method::GET, "/api/follows"),
    ] {
        let reply = send(&app, method, uri, Some(&cookie), None).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(reply.body["error"], "Session expired");
    }
}

#[tokio::test]
async fn feed_shows_followed_and_own_posts_with_likes() {
    let app = create_app();
    let alice = signup(&app, "alice").await;
    let bob = signup(&app, "bob").await;
    let carol = signup(&app, "carol").await;
    let dave = signup(&app, "dave").await;

    for followed in ["bob", "carol"] {
        let reply = send(
            &app,
            Method::POST,
            "/api/follows",
            Some(&alice),
            Some(json!({ "followedUser": followed })),
        )
        .await;
        assert_eq!(reply.status, StatusCode::CREATED);
        assert_eq!(reply.body["followingUser"], "alice");
    }

    let bob_post = create_post(&app, &bob, "from bob").await;
    let carol_post = create_post(&app, &carol, "from carol").await;
    create_post(&app, &dave, "from dave").await;

    let feed = send(&app, Method::GET, "/api/posts", Some(&alice), None).await;
    assert_eq!(feed.status, StatusCode::OK);
    let items = feed.body.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], carol_post.as_str());
    assert_eq!(items[1]["id"], bob_post.as_str());
    assert!(items.iter().all(|p| p["isLikedByUser"] == false));
    assert!(items.iter().all(|p| p["likeCount"] == 0));

    let like = send(
        &app,
        Method::POST,
        "/api/likes",
        Some(&alice),
        Some(json!({ "postId": bob_post })),
    )
    .await;
    assert_eq!(like.status, StatusCode::OK);

    let feed = send(&app, Method::GET, "/api/posts", Some(&alice), None).await;
    let items = feed.body.as_array().unwrap();
    let liked = items.iter().find(|p| p["id"] == bob_post.as_str()).unwrap();
    assert_eq!(liked["isLikedByUser"], true);
    assert_eq!(liked["likeCount"], 1);

    let own = create_post(&app, &alice, "from alice").await;
    let feed = send(&app, Method::GET, "/api/posts", Some(&alice), None).await;
    let items = feed.body.as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["id"], own.as_str());
}

#[tokio::test]
async fn duplicate_follow_is_a_bad_request() {
    let app = create_app();
    let alice = signup(&app, "alice").await;
    let body = json!({ "followedUser": "bob" });

    let first = send(&app, Method::POST, "/api/follows", Some(&alice), Some(body.clone())).await;
    assert_eq!(first.status, StatusCode::CREATED);

    let second = send(&app, Method::POST, "/api/follows", Some(&alice), Some(body)).await;
    assert_eq!(second.status, StatusCode::BAD_REQUEST);
    assert!(second.body["error"].as_str().unwrap().contains("UNIQUE"));

    let blank = send(
        &app,
        Method::POST,
        "/api/follows",
        Some(&alice),
        Some(json!({ "followedUser": "  " })),
    )
    .await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unfollow_is_limited_to_the_session_user() {
    let app = create_app();
    let alice = signup(&app, "alice").await;
    send(
        &app,
        Method::POST,
        "/api/follows",
        Some(&alice),
        Some(json!({ "followedUser": "bob" })),
    )
    .await;

    let forbidden = send(
        &app,
        Method::DELETE,
        "/api/follows",
        Some(&alice),
        Some(json!({ "followingUser": "carol", "followedUser": "bob" })),
    )
    .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let ok = send(
        &app,
        Method::DELETE,
        "/api/follows",
        Some(&alice),
        Some(json!({ "followedUser": "bob" })),
    )
    .await;
    assert_eq!(ok.status, StatusCode::OK);

    let missing = send(
        &app,
        Method::DELETE,
        "/api/follows",
        Some(&alice),
        Some(json!({ "followedUser": "bob" })),
    )
    .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let stats = send(&app, Method::GET, "/api/follows/stats/alice", None, None).await;
    assert_eq!(stats.body["followingCount"], 0);
}

#[tokio::test]
async fn follow_queries_report_both_directions() {
    let app = create_app();
    let alice = signup(&app, "alice").await;
    let bob = signup(&app, "bob").await;
    send(&app, Method::POST, "/api/follows", Some(&alice), Some(json!({ "followedUser": "bob" }))).await;
    send(&app, Method::POST, "/api/follows", Some(&bob), Some(json!({ "followedUser": "alice" }))).await;
    send(&app, Method::POST, "/api/follows", Some(&bob), Some(json!({ "followedUser": "carol" }))).await;

    let mine = send(&app, Method::GET, "/api/follows", Some(&bob), None).await;
    assert_eq!(mine.body, json!(["alice", "carol"]));

    let followers = send(&app, Method::GET, "/api/follows/followers/alice", None, None).await;
    assert_eq!(followers.body, json!(["bob"]));

    let status = send(
        &app,
        Method::GET,
        "/api/follows/status?follower=alice&followed=bob",
        None,
        None,
    )
    .await;
    assert_eq!(status.body["isFollowing"], true);

    let stats = send(&app, Method::GET, "/api/follows/stats/bob", None, None).await;
    assert_eq!(stats.body["followingCount"], 2);
    assert_eq!(stats.body["followersCount"], 1);
}

#[tokio::test]
async fn likes_are_unique_and_unlike_is_idempotent() {
    let app = create_app();
    let alice = signup(&app, "alice").await;
    let post = create_post(&app, &alice, "hello").await;
    let body = json!({ "postId": post });

    let first = send(&app, Method::POST, "/api/likes", Some(&alice), Some(body.clone())).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["username"], "alice");

    let again = send(&app, Method::POST, "/api/likes", Some(&alice), Some(body.clone())).await;
    assert_eq!(again.status, StatusCode::CONFLICT);

    let uri = format!("/api/likes/post/{}", post);
    let likes = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(likes.body.as_array().unwrap().len(), 1);

    for _ in 0..2 {
        let removed = send(&app, Method::DELETE, "/api/likes", Some(&alice), Some(body.clone())).await;
        assert_eq!(removed.status, StatusCode::OK);
    }
    let likes = send(&app, Method::GET, &uri, None, None).await;
    assert!(likes.body.as_array().unwrap().is_empty());

    let unknown = send(
        &app,
        Method::POST,
        "/api/likes",
        Some(&alice),
        Some(json!({ "postId": "00000000-0000-0000-0000-000000000000" })),
    )
    .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let blank = send(&app, Method::POST, "/api/likes", Some(&alice), Some(json!({}))).await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);
    assert_eq!(blank.body["error"], "postId is required");
}

#[tokio::test]
async fn like_ids_match_regardless_of_case() {
    let app = create_app();
    let alice = signup(&app, "alice").await;
    let post = create_post(&app, &alice, "hello").await;
    let shouted = json!({ "postId": post.to_uppercase() });

    let like = send(&app, Method::POST, "/api/likes", Some(&alice), Some(shouted.clone())).await;
    assert_eq!(like.status, StatusCode::OK);
    assert_eq!(like.body["postId"], post.as_str());

    let again = send(&app, Method::POST, "/api/likes", Some(&alice), Some(json!({ "postId": post }))).await;
    assert_eq!(again.status, StatusCode::CONFLICT);

    let uri = format!("/api/likes/post/{}", post.to_uppercase());
    let likes = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(likes.body.as_array().unwrap().len(), 1);

    let removed = send(&app, Method::DELETE, "/api/likes", Some(&alice), Some(shouted)).await;
    assert_eq!(removed.status, StatusCode::OK);
    let uri = format!("/api/likes/post/{}", post);
    let likes = send(&app, Method::GET, &uri, None, None).await;
    assert!(likes.body.as_array().unwrap().is_empty());

    let junk = send(
        &app,
        Method::DELETE,
        "/api/likes",
        Some(&alice),
        Some(json!({ "postId": "not-a-uuid" })),
    )
    .await;
    assert_eq!(junk.status, StatusCode::OK);
}

#[tokio::test]
async fn posts_validate_and_list() {
    let app = create_app();
    let alice = signup(&app, "alice").await;

    let blank = send(
        &app,
        Method::POST,
        "/api/posts",
        Some(&alice),
        Some(json!({ "textContent": "   " })),
    )
    .await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);
    assert_eq!(blank.body["error"], "textContent is required");

    let malformed = send(&app, Method::POST, "/api/posts", Some(&alice), Some(json!("nope"))).await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);

    let reply = send(
        &app,
        Method::POST,
        "/api/posts",
        Some(&alice),
        Some(json!({ "textContent": "tagged", "tags": ["Rust"], "username": "mallory" })),
    )
    .await;
    assert_eq!(reply.body["username"], "alice");
    assert_eq!(reply.body["postType"], "personal");
    let id = reply.body["id"].as_str().unwrap().to_string();

    let fetched = send(&app, Method::GET, &format!("/api/posts/{}", id), None, None).await;
    assert_eq!(fetched.body["textContent"], "tagged");

    let missing = send(&app, Method::GET, "/api/posts/unknown", None, None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let by_user = send(&app, Method::GET, "/api/posts/user/alice", None, None).await;
    assert_eq!(by_user.body.as_array().unwrap().len(), 1);

    let search = send(
        &app,
        Method::POST,
        "/api/posts/search",
        None,
        Some(json!({ "query": "rust" })),
    )
    .await;
    assert_eq!(search.body.as_array().unwrap().len(), 1);

    let stats = send(&app, Method::GET, "/api/posts/stats", None, None).await;
    assert_eq!(stats.body["byUser"][0]["count"], 1);
    assert_eq!(stats.body["byMediaType"][0]["mediaType"], Value::Null);
}

#[tokio::test]
async fn groups_membership_is_a_set() {
    let app = create_app();

    let created = send(
        &app,
        Method::POST,
        "/api/groups",
        None,
        Some(json!({ "name": " Hikers ", "description": "trails", "creator": "alice" })),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["name"], "Hikers");
    let id = created.body["id"].as_str().unwrap().to_string();

    let join = json!({ "groupId": id, "username": "bob" });
    send(&app, Method::POST, "/api/groups/join", None, Some(join.clone())).await;
    let group = send(&app, Method::POST, "/api/groups/join", None, Some(join.clone())).await;
    let members = group.body["members"].as_array().unwrap();
    assert_eq!(members.iter().filter(|m| m["username"] == "bob").count(), 1);
    assert_eq!(members.len(), 2);

    let left = send(&app, Method::POST, "/api/groups/leave", None, Some(join)).await;
    assert_eq!(left.body["members"].as_array().unwrap().len(), 1);

    let unknown = send(
        &app,
        Method::POST,
        "/api/groups/join",
        None,
        Some(json!({ "groupId": "missing", "username": "bob" })),
    )
    .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let stats = send(&app, Method::GET, "/api/groups/stats", None, None).await;
    assert_eq!(stats.body["creatorStats"][0]["creator"], "alice");
    assert_eq!(stats.body["memberStats"][0]["memberCount"], 1);

    let uri = format!("/api/groups/{}", id);
    let updated = send(&app, Method::PUT, &uri, None, Some(json!({ "isPrivate": true }))).await;
    assert_eq!(updated.body["isPrivate"], true);

    let deleted = send(&app, Method::DELETE, &uri, None, None).await;
    assert_eq!(deleted.status, StatusCode::OK);
    let gone = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn group_creation_keeps_listed_members() {
    let app = create_app();

    let created = send(
        &app,
        Method::POST,
        "/api/groups",
        None,
        Some(json!({
            "name": "Readers",
            "description": "books",
            "creator": "alice",
            "members": [
                { "username": "bob", "joinedAt": "2024-01-01T00:00:00Z" },
                { "username": "bob" },
                { "username": "carol" },
            ],
        })),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let names: Vec<&str> = created.body["members"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["alice", "bob", "carol"]);
    assert_eq!(created.body["members"][1]["joinedAt"], "2024-01-01T00:00:00Z");

    let uri = format!("/api/groups/{}", created.body["id"].as_str().unwrap());
    let fetched = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(fetched.body["members"].as_array().unwrap().len(), 3);

    let with_creator = send(
        &app,
        Method::POST,
        "/api/groups",
        None,
        Some(json!({
            "name": "Cooks",
            "description": "food",
            "creator": "dave",
            "members": [{ "username": "erin" }, { "username": "dave" }],
        })),
    )
    .await;
    let members = with_creator.body["members"].as_array().unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0]["username"], "erin");

    let blank = send(
        &app,
        Method::POST,
        "/api/groups",
        None,
        Some(json!({
            "name": "Empty",
            "description": "x",
            "creator": "dave",
            "members": [{ "username": " " }],
        })),
    )
    .await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn visual_content_is_validated_and_checksummed() {
    let app = create_app();

    let bad = send(
        &app,
        Method::POST,
        "/api/visual-content",
        None,
        Some(json!({ "content": "x", "mimeType": "png" })),
    )
    .await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);

    let created = send(
        &app,
        Method::POST,
        "/api/visual-content",
        None,
        Some(json!({ "content": "abc", "mimeType": "image/png", "width": 10, "height": 10 })),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["mediaType"], "image");
    assert_eq!(
        created.body["checksum"],
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );

    let id = created.body["id"].as_str().unwrap();
    let fetched = send(&app, Method::GET, &format!("/api/visual-content/{}", id), None, None).await;
    assert_eq!(fetched.body["mimeType"], "image/png");
}

#[tokio::test]
async fn user_profile_crud() {
    let app = create_app();
    signup(&app, "alice").await;

    let updated = send(
        &app,
        Method::PUT,
        "/api/users/alice",
        None,
        Some(json!({ "bio": "climber", "isVerified": true })),
    )
    .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["bio"], "climber");

    let search = send(
        &app,
        Method::POST,
        "/api/users/search",
        None,
        Some(json!({ "query": "ALI", "filters": { "isVerified": true } })),
    )
    .await;
    assert_eq!(search.body.as_array().unwrap().len(), 1);

    let dup = send(
        &app,
        Method::POST,
        "/api/users/create",
        None,
        Some(json!({
            "name": "Other", "email": "alice@example.com", "username": "other",
            "password": "pw", "birthYear": 2000, "birthMonth": 1, "birthDay": 1,
        })),
    )
    .await;
    assert_eq!(dup.status, StatusCode::BAD_REQUEST);

    let deleted = send(&app, Method::DELETE, "/api/users/alice", None, None).await;
    assert_eq!(deleted.body["message"], "User deleted");
    let gone = send(&app, Method::GET, "/api/users/alice", None, None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}
