//! In-flight messages and thought bubbles.

use serde::{Deserialize, Serialize};

use session_events::PartId;

use super::SimulatorModel;

/// A line sent from one part to another, arriving after a fixed travel time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub sender: PartId,
    pub target: PartId,
    pub text: String,
    /// Seconds until arrival; 0.0 once arrived
    pub remaining: f64,
    pub travel_time: f64,
    /// Set once `advance_messages` has reported the arrival
    #[serde(default)]
    pub delivered: bool,
}

impl Message {
    /// 0.0 at send, 1.0 on arrival.
    pub fn progress(&self) -> f64 {
        if self.travel_time <= 0.0 {
            1.0
        } else {
            (1.0 - self.remaining / self.travel_time).clamp(0.0, 1.0)
        }
    }

    pub fn has_arrived(&self) -> bool {
        self.remaining <= 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThoughtBubble {
    pub id: u64,
    pub part: PartId,
    pub text: String,
    /// Model elapsed time at which the bubble disappears
    pub expires_at: f64,
}

impl SimulatorModel {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn thought_bubbles(&self) -> &[ThoughtBubble] {
        &self.thought_bubbles
    }

    /// Returns the new message id.
    pub fn send_message(
        &mut self,
        sender: &PartId,
        target: &PartId,
        text: impl Into<String>,
        travel_time: f64,
    ) -> u64 {
        let id = self.next_message_id;
        self.next_message_id += 1;
        let travel_time = travel_time.max(0.0);
        self.messages.push(Message {
            id,
            sender: sender.clone(),
            target: target.clone(),
            text: text.into(),
            remaining: travel_time,
            travel_time,
            delivered: false,
        });
        id
    }

    /// Moves every message forward by `dt` and returns those that arrived
    /// during this call. Each message is reported exactly once, including
    /// one sent with zero travel time. Arrived messages stay listed until
    /// removed.
    pub fn advance_messages(&mut self, dt: f64) -> Vec<Message> {
        let mut arrived = Vec::new();
        for message in &mut self.messages {
            if message.delivered {
                continue;
            }
            message.remaining = (message.remaining - dt).max(0.0);
            if message.has_arrived() {
                message.delivered = true;
                arrived.push(message.clone());
            }
        }
        arrived
    }

    pub fn remove_message(&mut self, id: u64) -> Option<Message> {
        let index = self.messages.iter().position(|m| m.id == id)?;
        Some(self.messages.remove(index))
    }

    /// Returns the new bubble id.
    pub fn add_thought_bubble(
        &mut self,
        part: &PartId,
        text: impl Into<String>,
        lifetime: f64,
    ) -> u64 {
        let id = self.next_bubble_id;
        self.next_bubble_id += 1;
        self.thought_bubbles.push(ThoughtBubble {
            id,
            part: part.clone(),
            text: text.into(),
            expires_at: self.elapsed + lifetime,
        });
        id
    }

    /// Removes and returns bubbles whose time is up.
    pub fn expire_thought_bubbles(&mut self) -> Vec<ThoughtBubble> {
        let now = self.elapsed;
        let (expired, live): (Vec<_>, Vec<_>) = self
            .thought_bubbles
            .drain(..)
            .partition(|b| b.expires_at <= now);
        self.thought_bubbles = live;
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{model_with, pid};

    #[test]
    fn test_message_arrives_after_travel_time() {
        let mut model = model_with(&["a", "b"]);
        let id = model.send_message(&pid("a"), &pid("b"), "t", 2.0);

        assert!(model.advance_messages(1.0).is_empty());
        assert_eq!(model.messages()[0].progress(), 0.5);

        let arrived = model.advance_messages(1.0);
        assert_eq!(arrived.len(), 1);
        assert_eq!(arrived[0].id, id);
        assert_eq!(arrived[0].text, "t");

        // Arrived once, reported once
        assert!(model.advance_messages(1.0).is_empty());
        assert_eq!(model.messages().len(), 1);

        assert!(model.remove_message(id).is_some());
        assert!(model.messages().is_empty());
        assert!(model.remove_message(id).is_none());
    }

    #[test]
    fn test_zero_travel_message_delivered_once() {
        let mut model = model_with(&["a", "b"]);
        let id = model.send_message(&pid("a"), &pid("b"), "now", 0.0);

        let arrived = model.advance_messages(0.0);
        assert_eq!(arrived.len(), 1);
        assert_eq!(arrived[0].id, id);
        assert!(arrived[0].delivered);
        assert!(model.advance_messages(1.0).is_empty());

        model.remove_message(id);
        assert!(model.messages().is_empty());
    }

    #[test]
    fn test_message_ids_are_unique() {
        let mut model = model_with(&["a", "b"]);
        let first = model.send_message(&pid("a"), &pid("b"), "one", 1.0);
        let second = model.send_message(&pid("b"), &pid("a"), "two", 1.0);
        assert_ne!(first, second);
    }

    #[test]
    fn test_bubbles_expire_on_model_time() {
        let mut model = model_with(&["a"]);
        model.add_thought_bubble(&pid("a"), "hmm", 1.0);

        model.advance_clock(0.5);
        assert!(model.expire_thought_bubbles().is_empty());

        model.advance_clock(0.5);
        let expired = model.expire_thought_bubbles();
        assert_eq!(expired.len(), 1);
        assert!(model.thought_bubbles().is_empty());
    }
}
