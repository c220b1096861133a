//! Live update channel.
//!
//! Every change a viewer of a hole page should see is published on the
//! [`EventBus`] as a [`HoleEvent`]. Events are addressed by topic:
//! `hole_{id}_images` for the tile grid, `hole_{id}_flash` for the
//! "processing" banner. The SSE route filters the bus by hole.

use std::sync::Arc;

use fairway_common::{HoleId, StylizationStatus};
use fairway_db::models::HoleImage;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

/// A change to one hole's imagery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HoleEvent {
    /// A hole image row was created.
    TileCreated { hole_id: HoleId, image: HoleImage },
    /// A hole image's status changed; the tile should be re-rendered.
    TileReplaced { hole_id: HoleId, image: HoleImage },
    /// A hole image became ready; the processing banner can go.
    FlashCleared { hole_id: HoleId },
    /// The hole-level stylization status changed.
    StylizationStatus {
        hole_id: HoleId,
        status: StylizationStatus,
        error: Option<String>,
    },
}

impl HoleEvent {
    pub fn hole_id(&self) -> HoleId {
        match self {
            Self::TileCreated { hole_id, .. }
            | Self::TileReplaced { hole_id, .. }
            | Self::FlashCleared { hole_id }
            | Self::StylizationStatus { hole_id, .. } => *hole_id,
        }
    }

    /// Topic this event is delivered on.
    pub fn topic(&self) -> String {
        match self {
            Self::FlashCleared { hole_id } => flash_topic(*hole_id),
            _ => images_topic(self.hole_id()),
        }
    }

    /// Wire form: the event's fields plus its `topic`.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&Envelope {
            topic: self.topic(),
            event: self,
        })
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    topic: String,
    #[serde(flatten)]
    event: &'a HoleEvent,
}

pub fn images_topic(hole_id: HoleId) -> String {
    format!("hole_{hole_id}_images")
}

pub fn flash_topic(hole_id: HoleId) -> String {
    format!("hole_{hole_id}_flash")
}

/// Broadcast fan-out of [`HoleEvent`]s to every connected viewer.
///
/// Publishing never blocks; slow subscribers lag and drop old events.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<HoleEvent>,
}

impl EventBus {
    pub fn new() -> Arc<Self> {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Arc::new(Self { tx })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HoleEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: HoleEvent) {
        let topic = event.topic();
        if self.tx.send(event).is_err() {
            tracing::debug!(%topic, "No subscribers for hole event");
        }
    }

    pub fn tile_created(&self, image: &HoleImage) {
        self.publish(HoleEvent::TileCreated {
            hole_id: image.hole_id,
            image: image.clone(),
        });
    }

    pub fn tile_replaced(&self, image: &HoleImage) {
        self.publish(HoleEvent::TileReplaced {
            hole_id: image.hole_id,
            image: image.clone(),
        });
    }

    pub fn flash_cleared(&self, hole_id: HoleId) {
        self.publish(HoleEvent::FlashCleared { hole_id });
    }

    pub fn stylization_status(
        &self,
        hole_id: HoleId,
        status: StylizationStatus,
        error: Option<&str>,
    ) {
        self.publish(HoleEvent::StylizationStatus {
            hole_id,
            status,
            error: error.map(str::to_string),
        });
    }
}
