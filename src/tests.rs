//! Integration tests for the board backend.

use std::sync::Arc;

use once_cell::sync::Lazy;
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::search::MergeMode;
use crate::{create_router, AppState};

static TRACING: Lazy<()> = Lazy::new(|| {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("warn"))
        .with_test_writer()
        .try_init()
        .ok();
});

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Lazy::force(&TRACING);

        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));

        let config = Config {
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            search_timeout: std::time::Duration::from_secs(5),
            search_merge: MergeMode::PerSourcePage,
            default_page_size: 10,
            max_page_size: 50,
        };

        let app = create_router(AppState::new(repo, config));

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        (resp.status().as_u16(), resp.json().await.unwrap())
    }

    async fn patch_json(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .patch(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        (resp.status().as_u16(), resp.json().await.unwrap())
    }

    async fn get_json(&self, path: &str) -> (u16, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        (resp.status().as_u16(), resp.json().await.unwrap())
    }

    async fn create_user(&self, name: &str) -> String {
        let (status, body) = self
            .post_json("/api/users", json!({ "displayName": name }))
            .await;
        assert_eq!(status, 200);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn create_post(&self, author_id: &str, title: &str, tags: Value) -> Value {
        let (status, body) = self
            .post_json(
                "/api/posts",
                json!({
                    "title": title,
                    "content": format!("Content of {}", title),
                    "categoryId": "general",
                    "authorId": author_id,
                    "tags": tags
                }),
            )
            .await;
        assert_eq!(status, 200, "create post failed: {}", body);
        body["data"].clone()
    }

    async fn comment(&self, post_id: &str, author_id: &str, body: &str, parent: Option<&str>) -> String {
        let (status, resp) = self
            .post_json(
                &format!("/api/posts/{}/comments", post_id),
                json!({ "authorId": author_id, "body": body, "parentId": parent }),
            )
            .await;
        assert_eq!(status, 200, "comment failed: {}", resp);
        resp["data"]["id"].as_str().unwrap().to_string()
    }
}

fn tag_names(post: &Value) -> Vec<String> {
    post["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t.as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_user_create_and_get() {
    let fixture = TestFixture::new().await;
    let user_id = fixture.create_user("Alice").await;

    let (status, body) = fixture.get_json(&format!("/api/users/{}", user_id)).await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["displayName"], "Alice");

    let (status, body) = fixture.get_json("/api/users/missing").await;
    assert_eq!(status, 404);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_categories_are_seeded() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get_json("/api/categories").await;
    assert_eq!(status, 200);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"General"));
    assert!(names.contains(&"Book"));
}

#[tokio::test]
async fn test_post_tags_are_reused_across_posts() {
    let fixture = TestFixture::new().await;
    let user_id = fixture.create_user("Tagger").await;

    let first = fixture
        .create_post(&user_id, "First", json!(["rust", " axum ", "rust"]))
        .await;
    assert_eq!(tag_names(&first), vec!["rust", "axum"]);

    let second = fixture
        .create_post(&user_id, "Second", json!(["axum", "sqlx"]))
        .await;
    assert_eq!(tag_names(&second), vec!["axum", "sqlx"]);

    let (_, tags) = fixture.get_json("/api/tags").await;
    let mut names: Vec<&str> = tags["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    names.sort();
    assert_eq!(names, vec!["axum", "rust", "sqlx"]);
}

#[tokio::test]
async fn test_update_replaces_tags() {
    let fixture = TestFixture::new().await;
    let user_id = fixture.create_user("Editor").await;
    let post = fixture
        .create_post(&user_id, "Editable", json!(["old", "kept"]))
        .await;
    let post_id = post["id"].as_str().unwrap();

    let (status, body) = fixture
        .patch_json(
            &format!("/api/posts/{}", post_id),
            json!({ "content": "Edited", "tags": ["kept", "new"] }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["content"], "Edited");
    assert_eq!(tag_names(&body["data"]), vec!["kept", "new"]);

    // Leaving tags out of an update removes them all.
    let (status, body) = fixture
        .patch_json(&format!("/api/posts/{}", post_id), json!({ "title": "Renamed" }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["title"], "Renamed");
    assert!(tag_names(&body["data"]).is_empty());

    // Orphaned tags stay around.
    let (_, tags) = fixture.get_json("/api/tags").await;
    assert_eq!(tags["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_duplicate_title_is_conflict() {
    let fixture = TestFixture::new().await;
    let user_id = fixture.create_user("Dup").await;
    fixture.create_post(&user_id, "Taken", json!([])).await;

    let (status, body) = fixture
        .post_json(
            "/api/posts",
            json!({
                "title": "Taken",
                "content": "again",
                "categoryId": "general",
                "authorId": user_id
            }),
        )
        .await;

    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_validation_errors() {
    let fixture = TestFixture::new().await;
    let user_id = fixture.create_user("Validator").await;

    let (status, body) = fixture
        .post_json(
            "/api/posts",
            json!({ "title": "  ", "content": "x", "categoryId": "general", "authorId": user_id }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = fixture
        .post_json(
            "/api/reviews",
            json!({
                "title": "Bad rating",
                "content": "x",
                "categoryId": "book",
                "authorId": user_id,
                "rating": 9
            }),
        )
        .await;
    assert_eq!(status, 400);

    let (status, body) = fixture.get_json("/api/search?q=%20%20").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = fixture.get_json("/api/search?q=x&size=0").await;
    assert_eq!(status, 400);

    let (status, _) = fixture.get_json("/api/search?q=x&size=51").await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_deleted_post_is_hidden() {
    let fixture = TestFixture::new().await;
    let user_id = fixture.create_user("Deleter").await;
    let post = fixture.create_post(&user_id, "Short lived", json!(["x"])).await;
    let post_id = post["id"].as_str().unwrap();

    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/posts/{}", post_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let (status, _) = fixture.get_json(&format!("/api/posts/{}", post_id)).await;
    assert_eq!(status, 404);

    let (_, body) = fixture.get_json("/api/search?q=Short").await;
    assert_eq!(body["data"]["totalCount"], 0);
}

#[tokio::test]
async fn test_post_detail_includes_comment_thread() {
    let fixture = TestFixture::new().await;
    let user_id = fixture.create_user("Commenter").await;
    let post = fixture.create_post(&user_id, "Threaded", json!([])).await;
    let post_id = post["id"].as_str().unwrap();

    let root = fixture.comment(post_id, &user_id, "root", None).await;
    let reply = fixture.comment(post_id, &user_id, "reply", Some(&root)).await;
    fixture
        .comment(post_id, &user_id, "reply to reply", Some(&reply))
        .await;
    fixture.comment(post_id, &user_id, "second root", None).await;

    let (status, body) = fixture.get_json(&format!("/api/posts/{}", post_id)).await;
    assert_eq!(status, 200);

    let data = &body["data"];
    assert_eq!(data["commentCount"], 4);
    assert_eq!(data["authorName"], "Commenter");
    assert_eq!(data["categoryName"], "General");

    let comments = data["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0]["body"], "root");
    assert_eq!(comments[0]["children"][0]["body"], "reply");
    assert_eq!(comments[0]["children"][0]["children"][0]["body"], "reply to reply");
    assert_eq!(comments[1]["body"], "second root");
    assert!(comments[1]["children"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_reply_to_comment_on_other_post_is_rejected() {
    let fixture = TestFixture::new().await;
    let user_id = fixture.create_user("Crosser").await;
    let a = fixture.create_post(&user_id, "Post A", json!([])).await;
    let b = fixture.create_post(&user_id, "Post B", json!([])).await;
    let root = fixture
        .comment(a["id"].as_str().unwrap(), &user_id, "on A", None)
        .await;

    let (status, body) = fixture
        .post_json(
            &format!("/api/posts/{}/comments", b["id"].as_str().unwrap()),
            json!({ "authorId": user_id, "body": "sneaky", "parentId": root }),
        )
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_comment_upvote() {
    let fixture = TestFixture::new().await;
    let user_id = fixture.create_user("Voter").await;
    let post = fixture.create_post(&user_id, "Votable", json!([])).await;
    let comment_id = fixture
        .comment(post["id"].as_str().unwrap(), &user_id, "nice", None)
        .await;

    let (status, body) = fixture
        .post_json(&format!("/api/comments/{}/upvote", comment_id), json!({}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["upvoteCount"], 1);

    let (status, _) = fixture
        .post_json("/api/comments/missing/upvote", json!({}))
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_search_merges_posts_and_reviews() {
    let fixture = TestFixture::new().await;
    let user_id = fixture.create_user("Searcher").await;

    fixture
        .create_post(&user_id, "Learning Rust basics", json!([]))
        .await;
    tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;

    let (status, review) = fixture
        .post_json(
            "/api/reviews",
            json!({
                "title": "The Rust Book review",
                "content": "A thorough introduction",
                "categoryId": "book",
                "authorId": user_id,
                "rating": 5
            }),
        )
        .await;
    assert_eq!(status, 200);
    let review_id = review["data"]["id"].as_str().unwrap().to_string();
    tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;

    fixture
        .create_post(&user_id, "Advanced Rust patterns", json!([]))
        .await;
    fixture.create_post(&user_id, "Cooking pasta", json!([])).await;

    let (status, body) = fixture
        .get_json("/api/search?q=rust&type=title&page=0&size=10")
        .await;
    assert_eq!(status, 200);

    let data = &body["data"];
    assert_eq!(data["totalCount"], 3);
    assert_eq!(data["totalPages"], 1);
    assert_eq!(data["partial"], false);

    let items = data["items"].as_array().unwrap();
    let titles: Vec<&str> = items.iter().map(|i| i["title"].as_str().unwrap()).collect();
    assert_eq!(
        titles,
        vec![
            "Advanced Rust patterns",
            "The Rust Book review",
            "Learning Rust basics"
        ]
    );
    assert_eq!(items[0]["kind"], "Board");
    assert_eq!(items[1]["kind"], "Review");
    assert_eq!(items[1]["id"], review_id.as_str());
    assert_eq!(items[1]["categoryName"], "Book");
    assert_eq!(items[1]["authorName"], "Searcher");

    // Page past the merged results is empty, not an error.
    let (status, body) = fixture
        .get_json("/api/search?q=rust&type=title&page=5&size=10")
        .await;
    assert_eq!(status, 200);
    assert!(body["data"]["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_search_rejects_bad_paging_with_envelope() {
    let fixture = TestFixture::new().await;

    for query in [
        "/api/search?q=rust&page=-1",
        "/api/search?q=rust&page=abc",
        "/api/search?q=rust&size=ten",
        "/api/search?q=rust&type=everything",
        "/api/search?q=rust&page=9223372036854775807&size=10",
    ] {
        let (status, body) = fixture.get_json(query).await;
        assert_eq!(status, 400, "{}", query);
        assert_eq!(body["success"], false, "{}", query);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR", "{}", query);
    }
}

#[tokio::test]
async fn test_list_posts_by_author() {
    let fixture = TestFixture::new().await;
    let author = fixture.create_user("Lister").await;
    let other = fixture.create_user("Someone else").await;

    fixture.create_post(&author, "Older", json!(["a"])).await;
    tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
    let newer = fixture.create_post(&author, "Newer", json!(["b", "c"])).await;
    fixture.create_post(&other, "Not theirs", json!([])).await;

    let (status, body) = fixture
        .get_json(&format!("/api/posts?authorId={}&size=1", author))
        .await;
    assert_eq!(status, 200);
    let data = &body["data"];
    assert_eq!(data["totalCount"], 2);
    assert_eq!(data["totalPages"], 2);
    assert_eq!(data["items"][0]["id"], newer["id"]);
    assert_eq!(data["items"][0]["tags"], json!(["b", "c"]));

    let (_, body) = fixture
        .get_json(&format!("/api/posts?authorId={}&page=1&size=1", author))
        .await;
    assert_eq!(body["data"]["items"][0]["title"], "Older");

    let (_, body) = fixture
        .get_json(&format!("/api/posts?authorId={}&categoryId=study", author))
        .await;
    assert_eq!(body["data"]["totalCount"], 0);

    let (status, body) = fixture
        .get_json(&format!("/api/posts?authorId={}&sort=random", author))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = fixture.get_json("/api/posts?authorId=nobody").await;
    assert_eq!(status, 404);
}
