use std::sync::{Arc, Mutex};

use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection};

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::entities::{self, challenges, teams, users};
use crate::host::Host;

pub async fn memory_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opts).await.unwrap();
    entities::create_tables(&db).await.unwrap();
    db
}

pub async fn memory_host() -> Host {
    Host::new(memory_db().await)
}

pub async fn user(host: &Host, name: &str, team_id: Option<i32>) -> users::Model {
    account(host, name, team_id, false, false).await
}

pub async fn account(
    host: &Host,
    name: &str,
    team_id: Option<i32>,
    banned: bool,
    hidden: bool,
) -> users::Model {
    users::ActiveModel {
        name: Set(name.to_string()),
        banned: Set(banned),
        hidden: Set(hidden),
        team_id: Set(team_id),
        ..Default::default()
    }
    .insert(&host.db)
    .await
    .unwrap()
}

pub async fn team(host: &Host, name: &str) -> teams::Model {
    hidden_team(host, name, false).await
}

pub async fn hidden_team(host: &Host, name: &str, hidden: bool) -> teams::Model {
    teams::ActiveModel {
        name: Set(name.to_string()),
        banned: Set(false),
        hidden: Set(hidden),
        ..Default::default()
    }
    .insert(&host.db)
    .await
    .unwrap()
}

pub async fn challenge(host: &Host, name: &str) -> challenges::Model {
    challenges::ActiveModel {
        name: Set(name.to_string()),
        category: Set("misc".to_string()),
        value: Set(100),
        ..Default::default()
    }
    .insert(&host.db)
    .await
    .unwrap()
}

/// A stand-in for the chat bot API that records every request and answers with a fixed status.
pub struct FakeChatApi {
    pub base: String,
    seen: Arc<Mutex<Vec<(String, Value)>>>,
}

impl FakeChatApi {
    pub async fn start(status: u16) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let log = Arc::clone(&log);
                tokio::spawn(serve(socket, status, log));
            }
        });
        Self { base, seen }
    }

    pub fn requests(&self) -> Vec<(String, Value)> {
        self.seen.lock().unwrap().clone()
    }
}

async fn serve(socket: TcpStream, status: u16, log: Arc<Mutex<Vec<(String, Value)>>>) {
    let _ = serve_one(socket, status, &log).await;
}

async fn serve_one(
    mut socket: TcpStream,
    status: u16,
    log: &Mutex<Vec<(String, Value)>>,
) -> Option<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < head_end + length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let path = head.split_whitespace().nth(1).unwrap_or_default().to_string();
    let end = buf.len().min(head_end + length);
    let body = serde_json::from_slice(&buf[head_end..end]).unwrap_or(Value::Null);

    // Record before answering so callers see the request once their send returns.
    log.lock().unwrap().push((path, body));

    let response = format!(
        "HTTP/1.1 {status} Fake\r\nContent-Type: application/json\r\nContent-Length: 11\r\nConnection: close\r\n\r\n{{\"ok\":true}}"
    );
    socket.write_all(response.as_bytes()).await.ok()?;
    socket.shutdown().await.ok()
}

/// An address nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
