//! Topology change notifications.

use hypeerweb_topology::{Outcome, WebId};
use tokio::sync::broadcast;

/// Capacity of the event channel; slow subscribers lag beyond this.
pub const EVENT_CAPACITY: usize = 1024;

/// One visible change to the web.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyEvent {
    Inserted(WebId),
    Removed(WebId),
    /// The node formerly at `from` now answers to `to`.
    Relabeled { from: WebId, to: WebId },
}

impl TopologyEvent {
    /// Events describing an applied outcome, in order.
    pub fn from_outcome(outcome: Outcome) -> Vec<Self> {
        match outcome {
            Outcome::Inserted(id) => vec![TopologyEvent::Inserted(id)],
            Outcome::Removed { removed, relabeled } => {
                let mut events = vec![TopologyEvent::Removed(removed)];
                events.extend(relabeled.map(|r| TopologyEvent::Relabeled { from: r.from, to: r.to }));
                events
            }
        }
    }
}

/// Publisher side of the event channel.
#[derive(Debug, Clone)]
pub struct Events {
    tx: broadcast::Sender<TopologyEvent>,
}

impl Default for Events {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }
}

impl Events {
    pub fn subscribe(&self) -> broadcast::Receiver<TopologyEvent> {
        self.tx.subscribe()
    }

    pub(crate) fn publish(&self, outcome: Outcome) {
        for event in TopologyEvent::from_outcome(outcome) {
            // no subscribers is fine
            let _ = self.tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hypeerweb_topology::Relabel;

    #[test]
    fn removal_with_relabel_yields_two_events() {
        let events = TopologyEvent::from_outcome(Outcome::Removed {
            removed: WebId(2),
            relabeled: Some(Relabel {
                from: WebId(6),
                to: WebId(2),
            }),
        });
        assert_eq!(
            events,
            vec![
                TopologyEvent::Removed(WebId(2)),
                TopologyEvent::Relabeled {
                    from: WebId(6),
                    to: WebId(2)
                }
            ]
        );
    }

    #[tokio::test]
    async fn subscribers_see_published_events() {
        let events = Events::default();
        let mut rx = events.subscribe();
        events.publish(Outcome::Inserted(WebId(0)));
        assert_eq!(rx.recv().await.unwrap(), TopologyEvent::Inserted(WebId(0)));
    }
}
