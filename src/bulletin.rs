// src/bulletin.rs
use log::debug;

use crate::discord::{DiscordClient, DiscordError};
use crate::render::ContentBlock;

// One cycle's worth of channel writes: positional pairs of
// (existing message id, block index) to edit, plus block indices that
// need a fresh message appended after them.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub edits: Vec<(String, usize)>,
    pub creates: Vec<usize>,
}

// Pairs the oldest authored messages with the leading blocks and turns
// the overflow into creates. Surplus old messages are left untouched;
// deleting them might not be what the operator wants, so they just go
// stale. In steady state this is exactly N edits and zero creates.
pub fn plan(existing_oldest_first: &[String], desired: usize) -> Plan {
    let shared = existing_oldest_first.len().min(desired);
    Plan {
        edits: existing_oldest_first[..shared]
            .iter()
            .cloned()
            .zip(0..shared)
            .collect(),
        creates: (shared..desired).collect(),
    }
}

// Publishes a cycle's blocks into a channel by editing the bot's own
// previous messages in place, creating new ones only when the board grew.
pub struct BulletinBoard {
    blocks: Vec<ContentBlock>,
}

impl BulletinBoard {
    pub fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    pub fn add_block(&mut self, block: ContentBlock) {
        self.blocks.push(block);
    }

    pub async fn push_to_channel(
        &self,
        client: &DiscordClient,
        channel_id: u64,
    ) -> Result<(), DiscordError> {
        let my_id = client.current_user_id().await?.to_string();

        // The API returns newest first; slots are edited oldest first.
        let mut slots: Vec<String> = client
            .fetch_channel_messages(channel_id)
            .await?
            .into_iter()
            .filter(|m| m.author.id == my_id)
            .map(|m| m.id)
            .collect();
        slots.reverse();

        let plan = plan(&slots, self.blocks.len());
        debug!(
            "Pushing {} blocks to channel {}: {} edits, {} creates",
            self.blocks.len(),
            channel_id,
            plan.edits.len(),
            plan.creates.len()
        );

        for (message_id, index) in &plan.edits {
            client
                .edit_message(channel_id, message_id, &self.blocks[*index])
                .await?;
        }
        for index in &plan.creates {
            client.create_message(channel_id, &self.blocks[*index]).await?;
        }

        Ok(())
    }
}
