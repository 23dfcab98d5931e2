// ==============================================
// LINE PROTOCOL OVER TCP (integration)
// ==============================================
#![cfg(feature = "server")]

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use ticketkit::error::ServerError;
use ticketkit::server::{self, MAX_LINE_LEN};
use ticketkit::shared::SharedQueue;

struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: std::net::SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, writer) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer,
        }
    }

    async fn send(&mut self, raw: &str) {
        self.writer.write_all(raw.as_bytes()).await.unwrap();
    }

    async fn line(&mut self) -> String {
        let mut line = String::new();
        self.reader.read_line(&mut line).await.unwrap();
        line
    }

    async fn call(&mut self, request: &str) -> String {
        self.send(&format!("{request}\r\n")).await;
        self.line().await
    }
}

type Running = (
    std::net::SocketAddr,
    oneshot::Sender<()>,
    JoinHandle<Result<(), ServerError>>,
);

async fn start(queue: SharedQueue) -> Running {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(server::serve(listener, queue, async {
        let _ = stop_rx.await;
    }));
    (addr, stop_tx, handle)
}

#[tokio::test]
async fn commands_round_trip_over_tcp() {
    let queue = SharedQueue::new();
    let (addr, stop, handle) = start(queue.clone()).await;
    let mut client = Client::connect(addr).await;

    assert_eq!(client.call("NEXT").await, "+-1\r\n");
    assert_eq!(client.call("PEEK").await, "+-1\r\n");
    assert_eq!(client.call("UPDATE 5000 19").await, "+OK\r\n");
    assert_eq!(client.call("UPDATE 5001 5").await, "+OK\r\n");
    assert_eq!(client.call("UPDATE 5002 7").await, "+OK\r\n");
    assert_eq!(client.call("SCORE 5002").await, "+7\r\n");
    assert_eq!(client.call("SCORE 1234").await, "+-1\r\n");
    assert_eq!(client.call("PEEK").await, "+5000\r\n");
    assert_eq!(client.call("NEXT").await, "+5000\r\n");
    assert_eq!(client.call("NEXT").await, "+5002\r\n");
    assert_eq!(client.call("NEXT").await, "+5001\r\n");
    assert_eq!(client.call("NEXT").await, "+-1\r\n");

    assert_eq!(queue.stats().updates, 3);

    stop.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn errors_keep_the_connection_open() {
    let (addr, stop, handle) = start(SharedQueue::new()).await;
    let mut client = Client::connect(addr).await;

    assert_eq!(client.call("UPDATE 0 1").await, "-ERROR INVALID ITEM ID\r\n");
    assert_eq!(client.call("UPDATE abc 1").await, "-ERROR INVALID ITEM ID\r\n");
    assert_eq!(client.call("UPDATE 1 0").await, "-ERROR INVALID SCORE\r\n");
    assert_eq!(client.call("SCORE -5").await, "-ERROR INVALID ITEM ID\r\n");
    assert_eq!(client.call("UPDATE 1").await, "-ERROR\r\n");
    assert_eq!(client.call("HELLO").await, "-ERROR\r\n");
    assert_eq!(client.call("").await, "-ERROR\r\n");
    assert_eq!(client.call("UPDATE 1 1").await, "+OK\r\n");

    stop.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn bare_newlines_and_pipelined_requests() {
    let (addr, stop, handle) = start(SharedQueue::new()).await;
    let mut client = Client::connect(addr).await;

    client.send("UPDATE 1 2\nUPDATE 2 3\r\nNEXT\n").await;
    assert_eq!(client.line().await, "+OK\r\n");
    assert_eq!(client.line().await, "+OK\r\n");
    assert_eq!(client.line().await, "+2\r\n");

    stop.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn info_lists_every_stat() {
    let (addr, stop, handle) = start(SharedQueue::new()).await;
    let mut client = Client::connect(addr).await;

    client.call("UPDATE 1 1").await;
    client.call("UPDATE 2 1").await;
    client.call("UPDATE 1 1").await;

    client.send("INFO\r\n").await;
    let mut lines = Vec::new();
    for _ in 0..5 {
        lines.push(client.line().await);
    }
    assert!(lines[0].starts_with("+uptime:"));
    assert!(lines[1].starts_with("+version:"));
    assert_eq!(lines[2], "+updates:3\r\n");
    assert_eq!(lines[3], "+items:2\r\n");
    assert_eq!(lines[4], "+pools:2\r\n");

    stop.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn quit_closes_the_connection() {
    let (addr, stop, handle) = start(SharedQueue::new()).await;
    let mut client = Client::connect(addr).await;

    assert_eq!(client.call("QUIT").await, "+OK\r\n");
    assert_eq!(client.line().await, "");

    stop.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn clients_share_one_queue() {
    let queue = SharedQueue::new();
    let (addr, stop, handle) = start(queue.clone()).await;
    let mut producer = Client::connect(addr).await;
    let mut consumer = Client::connect(addr).await;

    assert_eq!(producer.call("UPDATE 77 4").await, "+OK\r\n");
    assert_eq!(consumer.call("SCORE 77").await, "+4\r\n");
    assert_eq!(consumer.call("NEXT").await, "+77\r\n");
    assert_eq!(producer.call("SCORE 77").await, "+-1\r\n");
    assert!(queue.is_empty());

    stop.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn line_at_the_limit_is_served() {
    let (addr, stop, handle) = start(SharedQueue::new()).await;
    let mut client = Client::connect(addr).await;

    let request = "UPDATE 3 4";
    let padded = format!("{request:<width$}\n", width = MAX_LINE_LEN - 1);
    assert_eq!(padded.len(), MAX_LINE_LEN);
    client.send(&padded).await;
    assert_eq!(client.line().await, "+OK\r\n");
    assert_eq!(client.call("SCORE 3").await, "+4\r\n");

    stop.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn oversized_line_is_rejected_and_closed() {
    let queue = SharedQueue::new();
    let (addr, stop, handle) = start(queue.clone()).await;
    let mut client = Client::connect(addr).await;

    client.send(&"A".repeat(MAX_LINE_LEN)).await;
    assert_eq!(client.line().await, "-ERROR\r\n");
    assert_eq!(client.line().await, "");

    // Other clients are unaffected.
    let mut next = Client::connect(addr).await;
    assert_eq!(next.call("UPDATE 1 1").await, "+OK\r\n");
    assert_eq!(queue.len(), 1);

    stop.send(()).unwrap();
    handle.await.unwrap().unwrap();
}
