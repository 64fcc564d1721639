// src/render.rs
use std::cmp::Reverse;

use crate::fleet::{FleetSnapshot, SnapshotEntry};

pub const BOARD_TITLE: &str = "Darkest Hour: Europe '44-'45 Servers";

// Discord caps embed descriptions at 4096 characters; twenty server
// sections per block stays comfortably under that.
const SERVERS_PER_BLOCK: usize = 20;

// One renderable page of the bulletin board.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentBlock {
    pub title: String,
    pub body: String,
}

// Cosmetic map name: the vendor prefix and underscores are wire baggage,
// not something players should read.
pub fn display_map(map: &str) -> String {
    map.replace("DH-", "").replace('_', " ")
}

pub fn status_text(total_players: i64) -> String {
    format!(
        "{} player{} online",
        total_players,
        if total_players != 1 { "s" } else { "" }
    )
}

fn render_entry(entry: &SnapshotEntry) -> String {
    let status_emoji = if entry.players > 0 {
        ":green_circle:"
    } else {
        ":yellow_circle:"
    };
    format!(
        "{} **{}**\n**Players**\t`{} / {}`\n**Map**\t`{}`\n\u{2800}",
        status_emoji,
        entry.name,
        entry.players,
        entry.max_players,
        display_map(&entry.map)
    )
}

// Renders a snapshot into bulletin pages: servers sorted by live player
// count (configuration order breaks ties), offline endpoints omitted.
pub fn render_board(snapshot: &FleetSnapshot, updated_unix: i64) -> Vec<ContentBlock> {
    let mut header = format!("Updated <t:{}:R>.\n\u{2800}", updated_unix);

    if snapshot.entries.is_empty() {
        header.push_str("\nServers are down for maintenance...");
        return vec![ContentBlock {
            title: BOARD_TITLE.to_string(),
            body: header,
        }];
    }

    let mut by_players: Vec<&SnapshotEntry> = snapshot.entries.iter().collect();
    by_players.sort_by_key(|e| Reverse(e.players));

    let sections: Vec<String> = by_players
        .iter()
        .filter(|e| e.online)
        .map(|e| render_entry(e))
        .collect();

    if sections.is_empty() {
        return vec![ContentBlock {
            title: BOARD_TITLE.to_string(),
            body: header,
        }];
    }

    sections
        .chunks(SERVERS_PER_BLOCK)
        .enumerate()
        .map(|(i, chunk)| {
            let mut body = if i == 0 {
                format!("{}\n", header)
            } else {
                String::new()
            };
            body.push_str(&chunk.join("\n"));
            ContentBlock {
                title: BOARD_TITLE.to_string(),
                body,
            }
        })
        .collect()
}
