//! A small JSON placeholder API for exercising declared clients.
//!
//! Serves seeded posts and comments, plus helper routes: `/echo` reflects the
//! request back, `/status/{code}` answers with any status,
//! `/delay/{ms}` answers late and `/bytes/{n}` answers with `n` bytes.
//! Unknown paths get `404` with `{}`.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: u64,
    pub user_id: u64,
    pub title: String,
    pub body: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: u64,
    pub post_id: u64,
    pub name: String,
    pub email: String,
    pub body: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub user_id: u64,
    pub title: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostFilter {
    pub user_id: Option<u64>,
}

/// Seeded data; ids of created posts continue after the seed.
#[derive(Debug, Default)]
pub struct Store {
    pub posts: Vec<Post>,
    pub comments: Vec<Comment>,
}

impl Store {
    pub fn seeded() -> Self {
        let posts = (1..=10)
            .map(|id| Post {
                id,
                user_id: (id + 4) / 5,
                title: format!("post {id}"),
                body: format!("body of post {id}"),
            })
            .collect();
        let emails = [
            "Eliseo@gardner.biz",
            "Jayne_Kuhic@sydney.com",
            "Presley.Mueller@myrl.com",
            "Dallas@ole.me",
        ];
        let comments = (1..=4)
            .map(|id| Comment {
                id,
                post_id: (id + 1) / 2,
                name: format!("comment {id}"),
                email: emails[(id - 1) as usize].to_string(),
                body: format!("body of comment {id}"),
            })
            .collect();
        Self { posts, comments }
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::seeded()));
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/", get(list_posts).post(create_post))
        .route("/posts/{id}", get(get_post))
        .route("/posts/{id}/comments", get(list_comments))
        .route("/echo", any(echo))
        .route("/status/{code}", any(status))
        .route("/delay/{ms}", get(delay))
        .route("/bytes/{n}", get(bytes))
        .fallback(not_found)
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list_posts(State(db): State<Db>, Query(filter): Query<PostFilter>) -> Json<Vec<Post>> {
    let store = db.read().await;
    let posts = store
        .posts
        .iter()
        .filter(|post| filter.user_id.is_none_or(|user_id| post.user_id == user_id))
        .cloned()
        .collect();
    Json(posts)
}

async fn create_post(State(db): State<Db>, Json(input): Json<NewPost>) -> (StatusCode, Json<Post>) {
    let mut store = db.write().await;
    let post = Post {
        id: store.posts.len() as u64 + 1,
        user_id: input.user_id,
        title: input.title,
        body: input.body,
    };
    store.posts.push(post.clone());
    (StatusCode::CREATED, Json(post))
}

async fn get_post(State(db): State<Db>, Path(id): Path<u64>) -> (StatusCode, Json<Value>) {
    let store = db.read().await;
    match store.posts.iter().find(|post| post.id == id) {
        Some(post) => (StatusCode::OK, Json(json!(post))),
        None => (StatusCode::NOT_FOUND, Json(json!({}))),
    }
}

async fn list_comments(State(db): State<Db>, Path(id): Path<u64>) -> Json<Vec<Comment>> {
    let store = db.read().await;
    Json(store.comments.iter().filter(|c| c.post_id == id).cloned().collect())
}

async fn echo(
    method: Method,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    let headers: BTreeMap<String, String> = headers
        .iter()
        .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
        .collect();
    Json(json!({
        "method": method.as_str(),
        "query": query,
        "headers": headers,
        "body": String::from_utf8_lossy(&body),
    }))
}

async fn status(Path(code): Path<u16>) -> (StatusCode, Json<Value>) {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST);
    (status, Json(json!({ "status": status.as_u16() })))
}

async fn delay(Path(ms): Path<u64>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(json!({ "delayed": ms }))
}

/// Largest body `/bytes/{n}` will produce.
pub const MAX_BYTES: usize = 64 * 1024 * 1024;

async fn bytes(Path(n): Path<usize>) -> Vec<u8> {
    vec![b'x'; n.min(MAX_BYTES)]
}

async fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({})))
}
