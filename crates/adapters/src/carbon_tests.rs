use super::*;
use std::io::Read;
use std::net::TcpListener;

#[test]
fn disabled_client_does_not_connect() {
    let client = CarbonClient::disabled();
    // Any host/port would fail if dialed; disabled() must short-circuit.
    client.post_metric("runs_processed", 3.0, 1_700_000_000);
}

#[test]
fn enabled_client_sends_expected_line() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = std::thread::spawn(move || {
        let (mut socket, _) = listener.accept().unwrap();
        let mut buf = String::new();
        socket.read_to_string(&mut buf).unwrap();
        buf
    });

    let client = CarbonClient::new(Some(CarbonConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        metric_prefix: "archiver.test".to_string(),
    }));
    client.post_metric("runs_successful", 5.0, 42);
    drop(client);

    let received = handle.join().unwrap();
    assert_eq!(received, "archiver.test.runs_successful 5 42\n");
}
