// src/query/codec.rs
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

use crate::models::server::ServerInfo;

// Basic server info query: opcode 0x80 plus four reserved bytes.
pub const QUERY_PAYLOAD: [u8; 5] = [0x80, 0x00, 0x00, 0x00, 0x00];

// Decodes one reply datagram. Layout, little-endian: opcode echo (1 byte),
// query id (i32), separator (1 byte), engine/ping/rule-count (3 x i32),
// then three length-prefixed strings (name, map, one unused field that
// still has to be consumed) and two i32s (current and max players).
// Anything short or truncated yields None, never an error.
pub fn decode_reply(buf: &[u8]) -> Option<ServerInfo> {
    if buf.is_empty() {
        return None;
    }

    let mut cur = Cursor::new(buf);
    cur.read_u8().ok()?;
    cur.read_i32::<LittleEndian>().ok()?;
    cur.read_u8().ok()?;
    for _ in 0..3 {
        cur.read_i32::<LittleEndian>().ok()?;
    }

    let raw_name = read_length_prefixed(&mut cur)?;
    let raw_map = read_length_prefixed(&mut cur)?;
    read_length_prefixed(&mut cur)?;

    let players = cur.read_i32::<LittleEndian>().ok()?;
    let max_players = cur.read_i32::<LittleEndian>().ok()?;

    Some(ServerInfo {
        name: clean_name(&raw_name),
        map: clean_map(&raw_map),
        players,
        max_players,
    })
}

fn read_length_prefixed(cur: &mut Cursor<&[u8]>) -> Option<Vec<u8>> {
    let len = cur.read_u8().ok()? as usize;
    let mut out = vec![0u8; len];
    cur.read_exact(&mut out).ok()?;
    Some(out)
}

// The wire strings are one byte per character, not UTF-8.
fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

// Server names pad with whitespace runs; collapse them, then drop the
// trailing framing byte the length prefix includes.
fn clean_name(raw: &[u8]) -> String {
    let mut name = latin1(raw)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    name.pop();
    name
}

// Map names carry UTF-8 non-breaking spaces read through Latin-1 as the
// pair 0xC2 0xA0; normalize those before dropping the framing byte.
fn clean_map(raw: &[u8]) -> String {
    let mut map = latin1(raw).replace("\u{c2}\u{a0}", " ");
    map.pop();
    map
}
