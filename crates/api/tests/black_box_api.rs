mod common;

use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::watch;

use common::Harness;
use estate_api::transport::{Endpoint, SocketListener};

const MAX_REQUEST_BYTES: usize = 256;

struct TestServer {
    base_url: String,
    socket_addr: SocketAddr,
    http: tokio::task::JoinHandle<()>,
    socket: tokio::task::JoinHandle<()>,
    _shutdown: watch::Sender<bool>,
}

impl TestServer {
    async fn spawn() -> Self {
        let harness = Harness::new();
        let dispatcher = Arc::clone(&harness.dispatcher);

        // Same router as prod, bound to an ephemeral port.
        let app = estate_api::app::build_app(Arc::clone(&dispatcher));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let http = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let socket_listener = SocketListener::bind(&Endpoint::Tcp("127.0.0.1:0".parse().unwrap()))
            .await
            .expect("failed to bind socket endpoint");
        let Endpoint::Tcp(socket_addr) = socket_listener.endpoint().clone() else {
            unreachable!("bound a tcp endpoint");
        };
        let (shutdown, rx) = watch::channel(false);
        let socket = tokio::spawn(socket_listener.serve(dispatcher, MAX_REQUEST_BYTES, rx));

        Self {
            base_url,
            socket_addr,
            http,
            socket,
            _shutdown: shutdown,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.http.abort();
        self.socket.abort();
    }
}

struct Conn {
    reader: BufReader<tokio::net::tcp::OwnedReadHalf>,
    writer: tokio::net::tcp::OwnedWriteHalf,
}

impl Conn {
    async fn open(addr: SocketAddr) -> Self {
        let (read, writer) = TcpStream::connect(addr).await.unwrap().into_split();
        Self {
            reader: BufReader::new(read),
            writer,
        }
    }

    async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.unwrap();
    }

    async fn recv(&mut self) -> Option<Value> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await.unwrap();
        (n > 0).then(|| serde_json::from_str(&line).unwrap())
    }

    async fn call(&mut self, function: u64, args: Value) -> Value {
        let mut frame = json!({ "function": function, "args": args }).to_string();
        frame.push('\n');
        self.send_raw(frame.as_bytes()).await;
        self.recv().await.expect("connection closed")
    }
}

#[tokio::test]
async fn health_is_ok() {
    let server = TestServer::spawn().await;
    let res = reqwest::get(format!("{}/health", server.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn rpc_over_http_uses_the_same_envelope() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/rpc", server.base_url))
        .json(&json!({ "function": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "code": 0 }));

    let res = client
        .post(format!("{}/rpc", server.base_url))
        .body("{not json")
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], 253);

    let res = client
        .post(format!("{}/rpc", server.base_url))
        .json(&json!({ "function": 4242 }))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], 254);
}

#[tokio::test]
async fn socket_serves_many_requests_per_connection() {
    let server = TestServer::spawn().await;
    let mut conn = Conn::open(server.socket_addr).await;

    let created = conn
        .call(
            1,
            json!({ "login": "alice", "password": "pw1", "first_name": "Alice", "last_name": "A" }),
        )
        .await;
    assert_eq!(created, json!({ "code": 0 }));

    let login = conn.call(2, json!({ "login": "alice", "password": "pw1" })).await;
    assert_eq!(login["code"], 0);
    let token = login["data"]["token"].as_str().unwrap().to_string();

    // Blank lines are skipped, CRLF is accepted.
    conn.send_raw(b"\r\n\n{\"function\":0}\r\n").await;
    assert_eq!(conn.recv().await.unwrap(), json!({ "code": 0 }));

    let info = conn.call(4, json!({ "token": token, "login": "alice" })).await;
    assert_eq!(info["data"]["first_name"], "Alice");

    assert_eq!(conn.call(3, json!({ "token": token })).await["code"], 0);
    assert_eq!(conn.call(3, json!({ "token": token })).await["code"], 4);
}

#[tokio::test]
async fn bad_frames_do_not_end_the_connection() {
    let server = TestServer::spawn().await;
    let mut conn = Conn::open(server.socket_addr).await;

    conn.send_raw(b"garbage\n").await;
    assert_eq!(conn.recv().await.unwrap(), json!({ "code": 253 }));

    assert_eq!(conn.call(77, json!({})).await, json!({ "code": 254 }));
    assert_eq!(conn.call(0, json!(null)).await, json!({ "code": 0 }));
}

#[tokio::test]
async fn oversized_frame_is_rejected_and_connection_closed() {
    let server = TestServer::spawn().await;
    let mut conn = Conn::open(server.socket_addr).await;

    // One byte over the limit is enough; the newline never needs to arrive.
    conn.send_raw(&vec![b'x'; MAX_REQUEST_BYTES + 1]).await;

    assert_eq!(conn.recv().await.unwrap(), json!({ "code": 253 }));
    assert!(conn.recv().await.is_none());

    // Other connections are unaffected.
    let mut other = Conn::open(server.socket_addr).await;
    assert_eq!(other.call(0, json!({})).await, json!({ "code": 0 }));
}

#[tokio::test]
async fn connections_are_served_concurrently() {
    let server = TestServer::spawn().await;
    let mut idle = Conn::open(server.socket_addr).await;
    idle.send_raw(b"{\"function\":").await;

    let mut active = Conn::open(server.socket_addr).await;
    assert_eq!(active.call(0, json!({})).await, json!({ "code": 0 }));

    idle.send_raw(b"0}\n").await;
    assert_eq!(idle.recv().await.unwrap(), json!({ "code": 0 }));
}
