// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The channel the scene uses to notify the renderer of component changes.

/// A thread-safe, unbounded event channel.
///
/// The bus is generic over its event type so that `lumen-core` does not decide
/// what flows through it. The scene side publishes through [`EventBus::sender`]
/// clones, the owner of the bus drains pending events once per frame.
#[derive(Debug)]
pub struct EventBus<T: Send + 'static> {
    sender: flume::Sender<T>,
    receiver: flume::Receiver<T>,
}

impl<T: Send + 'static> EventBus<T> {
    /// Creates a new bus backed by an unbounded channel.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        log::debug!("EventBus initialized.");
        Self { sender, receiver }
    }

    /// Sends an event, logging an error if the receiving side is gone.
    pub fn publish(&self, event: T) {
        log::trace!("Publishing an event.");
        if let Err(e) = self.sender.send(event) {
            log::error!("Failed to send event: {e}. Receiver likely disconnected.");
        }
    }

    /// Returns a clone of the sender end of the channel.
    pub fn sender(&self) -> flume::Sender<T> {
        self.sender.clone()
    }

    /// Returns a reference to the receiver end of the channel.
    pub fn receiver(&self) -> &flume::Receiver<T> {
        &self.receiver
    }

    /// Takes every event currently queued, in publication order, without blocking.
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }

    /// Number of events waiting to be drained.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

impl<T: Send + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flume::TryRecvError;
    use std::thread;

    #[derive(Debug, Clone, PartialEq)]
    enum TestEvent {
        Spawned(u32),
        Moved { id: u32, x: f32 },
        Cleared,
    }

    #[test]
    fn drain_preserves_publication_order() {
        let bus = EventBus::<TestEvent>::new();
        bus.publish(TestEvent::Spawned(1));
        bus.publish(TestEvent::Moved { id: 1, x: 2.0 });
        bus.publish(TestEvent::Cleared);
        assert_eq!(bus.pending(), 3);

        let events = bus.drain();
        assert_eq!(
            events,
            vec![
                TestEvent::Spawned(1),
                TestEvent::Moved { id: 1, x: 2.0 },
                TestEvent::Cleared
            ]
        );
        assert_eq!(bus.receiver().try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn drain_on_empty_bus_is_empty() {
        let bus = EventBus::<TestEvent>::default();
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn send_from_thread() {
        let bus = EventBus::<TestEvent>::new();
        let sender = bus.sender();
        let handle = thread::spawn(move || {
            sender.send(TestEvent::Spawned(7)).expect("Send from thread failed");
        });
        handle.join().expect("Sender thread panicked");
        assert_eq!(bus.drain(), vec![TestEvent::Spawned(7)]);
    }
}
