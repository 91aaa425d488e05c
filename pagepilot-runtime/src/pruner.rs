//! Bounds the screenshots carried in the transcript.
//!
//! Images are removed oldest first and only in whole chunks, so the prefix
//! sent to the model changes once per chunk rather than on every turn.

use crate::types::{ContentBlock, Transcript};
use tracing::debug;

pub const DEFAULT_CHUNK_SIZE: usize = 2;

#[derive(Debug, Clone, Copy)]
pub struct ContextPruner {
    chunk_size: usize,
}

impl ContextPruner {
    /// A chunk size of zero is treated as one.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Return a copy of `transcript` keeping at most `keep_images` images,
    /// give or take one partial chunk. `None` disables pruning.
    pub fn prune(&self, transcript: &Transcript, keep_images: Option<usize>) -> Transcript {
        let mut pruned = transcript.clone();
        let Some(keep) = keep_images else {
            return pruned;
        };

        let total = transcript.image_count();
        let excess = total.saturating_sub(keep);
        let mut to_remove = excess - excess % self.chunk_size;
        if to_remove == 0 {
            return pruned;
        }

        debug!(total, keep, remove = to_remove, "pruning images");
        crate::metrics::record_images_pruned(to_remove);

        for turn in pruned.turns_mut() {
            for block in &mut turn.blocks {
                let ContentBlock::ToolResult { content, .. } = block else {
                    continue;
                };
                content.retain(|item| {
                    if to_remove > 0 && item.is_image() {
                        to_remove -= 1;
                        false
                    } else {
                        true
                    }
                });
            }
            if to_remove == 0 {
                break;
            }
        }

        pruned
    }
}

impl Default for ContextPruner {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}
