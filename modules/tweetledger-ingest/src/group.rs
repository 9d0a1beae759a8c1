use twitter_client::DmEvent;

use crate::reference::tweet_id_from_event;

/// Partition one sender's chronologically ordered messages into clusters.
///
/// A message that references a tweet closes the open cluster and anchors a
/// new one; every following message without a reference is a note on that
/// anchor. Messages before the first anchor have nothing to attach to and
/// are dropped.
pub fn group_by_anchor(events: Vec<DmEvent>) -> Vec<Vec<DmEvent>> {
    let mut clusters: Vec<Vec<DmEvent>> = Vec::new();
    let mut open: Option<Vec<DmEvent>> = None;

    for event in events {
        if tweet_id_from_event(&event).is_some() {
            if let Some(cluster) = open.take() {
                clusters.push(cluster);
            }
            open = Some(vec![event]);
        } else if let Some(cluster) = open.as_mut() {
            cluster.push(event);
        }
    }
    if let Some(cluster) = open.take() {
        clusters.push(cluster);
    }
    clusters
}
