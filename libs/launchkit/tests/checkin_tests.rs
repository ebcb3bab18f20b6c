#![allow(clippy::unwrap_used, clippy::expect_used)]

//! End-to-end checkin against real inherited-style descriptors.
//!
//! Listeners are bound in the test process and their descriptors released
//! with `into_raw_fd`, which is what a supervisor-spawned process sees.

use launchkit::{
    CheckinClient, LaunchError, LaunchValue, MemoryTransport, RawDescriptor, keys::job,
};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::os::fd::IntoRawFd;

fn bind_released(count: usize) -> (Vec<i32>, Vec<SocketAddr>) {
    (0..count)
        .map(|_| {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = listener.local_addr().unwrap();
            (listener.into_raw_fd(), addr)
        })
        .unzip()
}

fn client_with(group: &str, fds: &[i32]) -> CheckinClient<MemoryTransport> {
    let response = LaunchValue::dictionary([
        (job::LABEL, LaunchValue::from("net.launchkit.test")),
        (
            job::SOCKETS,
            LaunchValue::dictionary([(group, LaunchValue::fds(fds.iter().copied()))]),
        ),
    ]);
    let client = CheckinClient::new(MemoryTransport::responding(response));
    client.checkin().unwrap().expect("snapshot");
    client
}

#[test]
fn resolves_std_listeners_in_supervisor_order() {
    let (fds, addrs) = bind_released(3);
    let client = client_with("EchoSocket", &fds);

    let listeners: Vec<TcpListener> = client.sockets("EchoSocket").unwrap();

    let resolved: Vec<SocketAddr> = listeners.iter().map(|l| l.local_addr().unwrap()).collect();
    assert_eq!(resolved, addrs);
}

#[test]
fn resolved_listener_accepts_connections() {
    let (fds, addrs) = bind_released(1);
    let client = client_with("EchoSocket", &fds);
    let listener = client.sockets::<TcpListener>("EchoSocket").unwrap().remove(0);

    let handle = std::thread::spawn(move || {
        let (mut conn, _) = listener.accept().unwrap();
        let mut buf = [0u8; 5];
        conn.read_exact(&mut buf).unwrap();
        conn.write_all(&buf).unwrap();
    });

    let mut stream = TcpStream::connect(addrs[0]).unwrap();
    stream.write_all(b"hello").unwrap();
    let mut reply = [0u8; 5];
    stream.read_exact(&mut reply).unwrap();

    assert_eq!(&reply, b"hello");
    handle.join().unwrap();
}

#[test]
fn unknown_group_reports_quoted_name() {
    let (fds, _) = bind_released(1);
    let client = client_with("EchoSocket", &fds);

    let err = client.sockets::<TcpListener>("NoSockets").unwrap_err();

    assert!(matches!(err, LaunchError::SocketGroupNotFound { .. }));
    assert_eq!(err.to_string(), r#"no sockets found for "NoSockets""#);

    // Adopt the released listener so it is closed.
    drop(client.sockets::<TcpListener>("EchoSocket").unwrap());
}

#[test]
fn snapshot_loaded_from_json_resolves() {
    let raw: LaunchValue =
        serde_json::from_str(r#"{"Label":"json","Sockets":{"MySockets":[0,1]}}"#).unwrap();
    let client = CheckinClient::new(MemoryTransport::responding(raw.clone()));

    let snapshot = client.checkin().unwrap().unwrap();
    let fds: Vec<RawDescriptor> = client
        .sockets_with("MySockets", Ok::<_, LaunchError>)
        .unwrap();

    assert_eq!(snapshot.raw(), &raw);
    assert_eq!(fds.into_iter().map(RawDescriptor::get).collect::<Vec<_>>(), vec![0, 1]);
}

#[tokio::test]
async fn resolves_tokio_listeners() {
    let (fds, addrs) = bind_released(2);
    let client = client_with("HTTPSockets", &fds);

    let listeners: Vec<tokio::net::TcpListener> = client.sockets("HTTPSockets").unwrap();

    let resolved: Vec<SocketAddr> = listeners.iter().map(|l| l.local_addr().unwrap()).collect();
    assert_eq!(resolved, addrs);

    let accept = tokio::spawn(async move {
        let (_conn, peer) = listeners[1].accept().await.unwrap();
        peer
    });
    let stream = tokio::net::TcpStream::connect(addrs[1]).await.unwrap();
    let peer = accept.await.unwrap();

    assert_eq!(peer, stream.local_addr().unwrap());
}
