//! End-to-end tests for the two acceptor variants
//!
//! Local connections are real TCP over loopback; remote streams are
//! in-memory duplex pairs handed out by mock tunnel clients.

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::sleep;

use tunnel_relay::{
    EventLogger, RelayError, SessionId, TcpForwarder, TcpTransparentProxy, TproxyConnection,
    TrafficPolicy, TunnelClient, TunnelStream,
};

/// Tunnel client whose streams echo back everything written to them
struct EchoClient;

#[async_trait]
impl TunnelClient for EchoClient {
    async fn open_stream(&self, _dest: &str) -> io::Result<Box<dyn TunnelStream>> {
        let (near, far) = tokio::io::duplex(64 * 1024);
        tokio::spawn(async move {
            let (mut rd, mut wr) = tokio::io::split(far);
            let _ = tokio::io::copy(&mut rd, &mut wr).await;
        });
        Ok(Box::new(near))
    }
}

/// Tunnel client that fails every open
struct UnreachableClient;

#[async_trait]
impl TunnelClient for UnreachableClient {
    async fn open_stream(&self, _dest: &str) -> io::Result<Box<dyn TunnelStream>> {
        Err(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "destination unreachable",
        ))
    }
}

/// Policy that vetoes every chunk
struct DenyPolicy;

impl TrafficPolicy for DenyPolicy {
    fn permit(&self, _id: SessionId, _upload: u64, _download: u64) -> bool {
        false
    }
}

#[derive(Debug, Clone)]
enum Event {
    Connect {
        dest: String,
    },
    End {
        client: SocketAddr,
        dest: String,
        err: Option<String>,
        policy_terminated: bool,
        upload: u64,
        download: u64,
    },
}

#[derive(Default)]
struct RecordingLogger {
    events: Mutex<Vec<Event>>,
}

impl RecordingLogger {
    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn ended(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::End { .. }))
            .count()
    }
}

impl EventLogger for RecordingLogger {
    fn connect(&self, _client: SocketAddr, dest: &str) {
        self.events.lock().unwrap().push(Event::Connect {
            dest: dest.to_string(),
        });
    }

    fn end(
        &self,
        client: SocketAddr,
        dest: &str,
        err: Option<&RelayError>,
        upload: u64,
        download: u64,
    ) {
        self.events.lock().unwrap().push(Event::End {
            client,
            dest: dest.to_string(),
            err: err.map(ToString::to_string),
            policy_terminated: err.is_some_and(RelayError::is_policy_terminated),
            upload,
            download,
        });
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within 5s");
}

async fn spawn_forwarder(forwarder: TcpForwarder) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = forwarder.serve(listener).await;
    });
    addr
}

#[tokio::test]
async fn forwarder_echo_session_ends_cleanly() {
    let logger = Arc::new(RecordingLogger::default());
    let forwarder =
        TcpForwarder::new(Arc::new(EchoClient), "example:80").with_logger(logger.clone());
    let addr = spawn_forwarder(forwarder).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    client.write_all(&[9u8; 100]).await.unwrap();
    let mut echo = [0u8; 100];
    client.read_exact(&mut echo).await.unwrap();
    assert_eq!(echo, [9u8; 100]);
    client.shutdown().await.unwrap();

    wait_until(|| logger.ended() == 1).await;

    let events = logger.events();
    assert_eq!(events.len(), 2, "exactly one connect and one end");
    assert!(matches!(&events[0], Event::Connect { dest } if dest == "example:80"));
    match &events[1] {
        Event::End {
            dest,
            err,
            upload,
            download,
            ..
        } => {
            assert_eq!(dest, "example:80");
            assert!(err.is_none(), "clean close must carry no error: {err:?}");
            assert_eq!(*upload, 100);
            assert_eq!(*download, 100);
        }
        other => panic!("expected end event, got {other:?}"),
    }
}

#[tokio::test]
async fn forwarder_reports_remote_open_failure() {
    let logger = Arc::new(RecordingLogger::default());
    let forwarder = TcpForwarder::new(Arc::new(UnreachableClient), "example:80")
        .with_logger(logger.clone());
    let addr = spawn_forwarder(forwarder).await;

    let mut client = TcpStream::connect(addr).await.unwrap();

    wait_until(|| logger.ended() == 1).await;

    let events = logger.events();
    assert!(matches!(events[0], Event::Connect { .. }), "connect still fires");
    match &events[1] {
        Event::End {
            err,
            policy_terminated,
            upload,
            download,
            ..
        } => {
            let err = err.as_ref().expect("open failure must carry an error");
            assert!(err.contains("destination unreachable"), "{err}");
            assert!(!policy_terminated);
            assert_eq!(*upload, 0);
            assert_eq!(*download, 0);
        }
        other => panic!("expected end event, got {other:?}"),
    }

    // The abandoned session closed the local stream without relaying
    let mut buf = [0u8; 1];
    assert_eq!(client.read(&mut buf).await.unwrap(), 0);
}

#[tokio::test]
async fn forwarder_policy_veto_on_first_chunk() {
    let logger = Arc::new(RecordingLogger::default());
    let forwarder = TcpForwarder::new(Arc::new(EchoClient), "example:80")
        .with_logger(logger.clone())
        .with_policy(Arc::new(DenyPolicy));
    let addr = spawn_forwarder(forwarder).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    client.write_all(&[1u8; 64]).await.unwrap();

    wait_until(|| logger.ended() == 1).await;

    match &logger.events()[1] {
        Event::End {
            policy_terminated,
            upload,
            download,
            ..
        } => {
            assert!(policy_terminated, "veto must be distinguishable from I/O failure");
            assert_eq!(*upload, 64, "the vetoed chunk was still read and counted");
            assert_eq!(*download, 0, "nothing was forwarded, so nothing echoed");
        }
        other => panic!("expected end event, got {other:?}"),
    }
}

#[tokio::test]
async fn transparent_proxy_reports_swapped_addresses() {
    let logger = Arc::new(RecordingLogger::default());
    let proxy = Arc::new(
        TcpTransparentProxy::new(Arc::new(EchoClient)).with_logger(logger.clone()),
    );

    // Stand in for the platform redirect: a plain loopback accept with the
    // intended destination attached out of band.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let mut client = TcpStream::connect(addr).await.unwrap();
    let (server, client_addr) = listener.accept().await.unwrap();

    let original_dst: SocketAddr = "93.184.216.34:443".parse().unwrap();
    let conn = TproxyConnection::with_destination(server, client_addr, original_dst);

    let proxy_task = proxy.clone();
    tokio::spawn(async move {
        proxy_task.handle(conn).await;
    });

    client.write_all(&[3u8; 100]).await.unwrap();
    let mut echo = [0u8; 100];
    client.read_exact(&mut echo).await.unwrap();
    client.shutdown().await.unwrap();

    wait_until(|| logger.ended() == 1).await;

    let events = logger.events();
    assert!(
        matches!(&events[0], Event::Connect { dest } if dest == "93.184.216.34:443"),
        "destination must be derived from the connection, not configuration"
    );
    match &events[1] {
        Event::End {
            client: logged_client,
            dest,
            err,
            upload,
            download,
            ..
        } => {
            assert_eq!(*logged_client, client_addr, "logged peer is the real client");
            assert_eq!(dest, "93.184.216.34:443");
            assert!(err.is_none());
            assert_eq!(*upload, 100);
            assert_eq!(*download, 100);
        }
        other => panic!("expected end event, got {other:?}"),
    }
}

#[tokio::test]
async fn transparent_proxy_derives_destination_without_nat_metadata() {
    let logger = Arc::new(RecordingLogger::default());
    let proxy = Arc::new(
        TcpTransparentProxy::new(Arc::new(EchoClient)).with_logger(logger.clone()),
    );

    // An intercepted socket carries its destination in its own local
    // address; a loopback accept has exactly that shape, with no NAT entry
    // to consult.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let mut client = TcpStream::connect(addr).await.unwrap();
    let (server, client_addr) = listener.accept().await.unwrap();

    let conn = TproxyConnection::new(server, client_addr)
        .expect("connection must not be dropped for lack of NAT metadata");
    assert_eq!(conn.original_dst(), addr);

    let proxy_task = proxy.clone();
    tokio::spawn(async move {
        proxy_task.handle(conn).await;
    });

    client.write_all(&[5u8; 50]).await.unwrap();
    let mut echo = [0u8; 50];
    client.read_exact(&mut echo).await.unwrap();
    client.shutdown().await.unwrap();

    wait_until(|| logger.ended() == 1).await;

    let events = logger.events();
    assert!(
        matches!(&events[0], Event::Connect { dest } if *dest == addr.to_string()),
        "destination must come from the socket's local address"
    );
    match &events[1] {
        Event::End {
            err,
            upload,
            download,
            ..
        } => {
            assert!(err.is_none());
            assert_eq!(*upload, 50);
            assert_eq!(*download, 50);
        }
        other => panic!("expected end event, got {other:?}"),
    }
}

#[tokio::test]
async fn forwarder_isolates_sessions() {
    let logger = Arc::new(RecordingLogger::default());
    let forwarder =
        TcpForwarder::new(Arc::new(EchoClient), "example:80").with_logger(logger.clone());
    let addr = spawn_forwarder(forwarder).await;

    let mut tasks = Vec::new();
    for i in 0..5u8 {
        tasks.push(tokio::spawn(async move {
            let mut client = TcpStream::connect(addr).await.unwrap();
            let payload = vec![i; 10 * usize::from(i) + 10];
            client.write_all(&payload).await.unwrap();
            let mut echo = vec![0u8; payload.len()];
            client.read_exact(&mut echo).await.unwrap();
            assert_eq!(echo, payload);
            client.shutdown().await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    wait_until(|| logger.ended() == 5).await;

    // Every session ended cleanly with matching per-direction counts
    let mut totals = Vec::new();
    for event in logger.events() {
        if let Event::End {
            err,
            upload,
            download,
            ..
        } = event
        {
            assert!(err.is_none());
            assert_eq!(upload, download);
            totals.push(upload);
        }
    }
    totals.sort_unstable();
    assert_eq!(totals, vec![10, 20, 30, 40, 50]);
}
