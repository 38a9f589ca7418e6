//! Two-hop connections: a relay forwarding `direct-tcpip` to a target.

mod support;

use std::sync::Arc;

use salt_relay::command::{Escalation, Program, RemoteCommand};
use salt_relay::error::{Error, TransportError};
use salt_relay::session::Session;
use salt_relay::transport::{Authenticator, HostIdentityPolicy, SshTransport};
use secrecy::SecretString;
use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};

use support::{
    HOST_PUBLIC_KEY, OTHER_PUBLIC_KEY, PASSWORD, RELAY_PASSWORD, Relay, Transcript, contains,
};

fn test_ping() -> RemoteCommand {
    RemoteCommand::new(Program::Salt, vec!["*".to_string(), "test.ping".to_string()])
}

async fn connect_relay(relay: &Relay) -> SshTransport {
    let auth = Authenticator::Password(SecretString::from(RELAY_PASSWORD.to_string()));
    support::within(SshTransport::connect_over(
        relay.start(),
        &support::relay_config(),
        auth,
    ))
    .await
    .unwrap()
}

#[tokio::test]
async fn test_tunnel_yields_transport() {
    support::init_logging();
    let relay = Relay::default();
    let outer = connect_relay(&relay).await;

    let target = support::target_config(support::pinned(HOST_PUBLIC_KEY));
    let transport = support::within(outer.tunnel(&target)).await.unwrap();

    assert_eq!(transport.endpoint().to_string(), "salt-master.internal:22");
    assert_eq!(transport.username(), "alice");
    let hop = transport.relay().expect("tunnel keeps the relay");
    assert_eq!(hop.endpoint().to_string(), "bastion.example.com:2222");
    assert_eq!(hop.username(), "hop");
    assert!(hop.relay().is_none());
    assert_eq!(
        relay.requested(),
        [("salt-master.internal".to_string(), 22)]
    );

    let response = support::within(Session::new(&transport).run(&test_ping()))
        .await
        .unwrap();
    assert_eq!(response.result, "minion1:\n    True");
    assert_eq!(response.exit_status, Some(0));
    assert_eq!(relay.target.commands(), [r#""salt" "*" "test.ping""#]);

    support::within(transport.close()).await.unwrap();

    // Only the encrypted inner session crossed the relay
    let forwarded = relay.transcript();
    assert!(forwarded.starts_with(b"SSH-2.0-"));
    assert!(!contains(&forwarded, b"test.ping"));
    assert!(!contains(&forwarded, PASSWORD.as_bytes()));
}

#[tokio::test]
async fn test_sudo_session_through_tunnel() {
    let relay = Relay::default();
    let outer = connect_relay(&relay).await;

    let target = support::target_config(support::pinned(HOST_PUBLIC_KEY));
    let transport = support::within(outer.tunnel(&target)).await.unwrap();

    let command = test_ping().with_escalation(Escalation::SudoWithPassword(SecretString::from(
        PASSWORD.to_string(),
    )));
    let response = support::within(Session::new(&transport).run(&command))
        .await
        .unwrap();
    assert_eq!(response.result, "minion1:\n    True");

    support::within(transport.close()).await.unwrap();

    let forwarded = relay.transcript();
    assert!(!contains(&forwarded, b"password for"));
    assert!(!contains(&forwarded, PASSWORD.as_bytes()));
}

#[tokio::test]
async fn test_tunnel_checks_target_key() {
    let relay = Relay::default();
    let outer = connect_relay(&relay).await;

    let target = support::target_config(support::pinned(OTHER_PUBLIC_KEY));
    match support::within(outer.tunnel(&target)).await {
        Err(Error::Transport(TransportError::HostKeyMismatch { host })) => {
            assert_eq!(host, "salt-master.internal");
        }
        Err(other) => panic!("expected HostKeyMismatch, got {}", other),
        Ok(_) => panic!("tunnel accepted a mismatched target key"),
    }
}

#[tokio::test]
async fn test_handshake_failure_through_byte_relay() {
    let (client_io, relay_client_side) = duplex(64 * 1024);
    let (relay_target_side, mut target_io) = duplex(64 * 1024);

    let upstream: Transcript = Arc::default();
    let downstream: Transcript = Arc::default();

    let (client_rd, client_wr) = tokio::io::split(relay_client_side);
    let (target_rd, target_wr) = tokio::io::split(relay_target_side);
    tokio::spawn(support::pump(client_rd, target_wr, upstream.clone()));
    tokio::spawn(support::pump(target_rd, client_wr, downstream.clone()));

    // A target that announces itself, reads once and hangs up mid-handshake
    let target = tokio::spawn(async move {
        target_io.write_all(b"SSH-2.0-MockTarget\r\n").await.unwrap();
        let mut buf = vec![0u8; 4096];
        let n = target_io.read(&mut buf).await.unwrap();
        buf.truncate(n);
        buf
    });

    let auth = Authenticator::Password(SecretString::from(PASSWORD.to_string()));
    let config = support::target_config(HostIdentityPolicy::TrustAnyway);
    let result = support::within(SshTransport::connect_over(client_io, &config, auth)).await;

    match result {
        Err(Error::Transport(TransportError::HandshakeFailure { host, port, .. })) => {
            assert_eq!(host, "salt-master.internal");
            assert_eq!(port, 22);
        }
        Err(other) => panic!("expected HandshakeFailure, got {}", other),
        Ok(_) => panic!("handshake with a silent target succeeded"),
    }

    let seen_by_target = target.await.unwrap();
    let upstream = upstream.lock().unwrap().clone();
    let downstream = downstream.lock().unwrap().clone();

    // The client's identification went through the relay to the target
    assert!(upstream.starts_with(b"SSH-2.0-"));
    assert!(!seen_by_target.is_empty());
    assert!(upstream.starts_with(&seen_by_target));
    assert_eq!(downstream, b"SSH-2.0-MockTarget\r\n");
    assert!(!contains(&upstream, PASSWORD.as_bytes()));
}
