// src/query/client.rs
use log::{debug, warn};
use std::time::Duration;
use tokio::net::UdpSocket;

use crate::models::server::ServerInfo;
use crate::query::codec;

// One unacknowledged datagram exchange per attempt; retry across cycles is
// the monitor's job, not ours.
pub const QUERY_TIMEOUT: Duration = Duration::from_millis(200);

// Sends the basic-info query and waits for the first reply from the peer.
// Timeouts, transport errors and garbage replies all come back as None:
// an unreachable server is the expected case, not an error.
pub async fn query(host: &str, port: u16) -> Option<ServerInfo> {
    let socket = match UdpSocket::bind("0.0.0.0:0").await {
        Ok(socket) => socket,
        Err(e) => {
            warn!("Could not bind query socket: {}", e);
            return None;
        }
    };

    if let Err(e) = socket.connect((host, port)).await {
        debug!("Could not reach {}:{}: {}", host, port, e);
        return None;
    }

    if let Err(e) = socket.send(&codec::QUERY_PAYLOAD).await {
        debug!("Query send to {}:{} failed: {}", host, port, e);
        return None;
    }

    let mut buffer = [0u8; 2048];
    match tokio::time::timeout(QUERY_TIMEOUT, socket.recv(&mut buffer)).await {
        Ok(Ok(len)) => codec::decode_reply(&buffer[..len]),
        Ok(Err(e)) => {
            debug!("Query receive from {}:{} failed: {}", host, port, e);
            None
        }
        Err(_) => {
            debug!("Query to {}:{} timed out", host, port);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{LittleEndian, WriteBytesExt};
    use std::time::Instant;

    fn build_reply(name: &str, map: &str, players: i32, max_players: i32) -> Vec<u8> {
        let mut buf = vec![0x80];
        buf.write_i32::<LittleEndian>(1).unwrap();
        buf.push(0x00);
        for meta in [436, 42, 12] {
            buf.write_i32::<LittleEndian>(meta).unwrap();
        }
        for text in [name, map, "Open"] {
            let mut bytes: Vec<u8> = text.chars().map(|c| c as u8).collect();
            bytes.push(0);
            buf.push(bytes.len() as u8);
            buf.extend(bytes);
        }
        buf.write_i32::<LittleEndian>(players).unwrap();
        buf.write_i32::<LittleEndian>(max_players).unwrap();
        buf
    }

    async fn spawn_responder(reply: Option<Vec<u8>>) -> u16 {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (len, peer) = socket.recv_from(&mut buf).await.unwrap();
            assert_eq!(&buf[..len], &codec::QUERY_PAYLOAD);
            if let Some(reply) = reply {
                socket.send_to(&reply, peer).await.unwrap();
            }
        });
        port
    }

    #[tokio::test]
    async fn query_decodes_live_reply() {
        let reply = build_reply("Test Server", "DH-Test", 5, 32);
        let port = spawn_responder(Some(reply)).await;

        let info = query("127.0.0.1", port).await.unwrap();
        assert_eq!(info.name, "Test Server");
        assert_eq!(info.map, "DH-Test");
        assert_eq!(info.players, 5);
        assert_eq!(info.max_players, 32);
    }

    #[tokio::test]
    async fn silent_server_times_out_as_absent() {
        // Responder consumes the request but never answers.
        let port = spawn_responder(None).await;

        let started = Instant::now();
        assert_eq!(query("127.0.0.1", port).await, None);
        assert!(started.elapsed() >= QUERY_TIMEOUT);
        assert!(started.elapsed() < Duration::from_millis(800));
    }

    #[tokio::test]
    async fn garbage_reply_is_absent() {
        let port = spawn_responder(Some(vec![0xde, 0xad, 0xbe, 0xef])).await;
        assert_eq!(query("127.0.0.1", port).await, None);
    }
}
