//! Work posted to the UI thread.
//!
//! Packet notifications can arrive on any thread. Listeners never touch a
//! view directly; they post a [UiTask] here and the owning window drains the
//! queue on the UI thread. Draining coalesces duplicates, so a burst of
//! structural events under one parent turns into a single refresh.

use std::sync;

use itertools::Itertools;
use tokio::sync::mpsc;

use crate::model::packet::{Packet, PacketEvent, PacketId, PacketListener};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UiTask {
    /// Rebuild the tree items below this packet. None is the hidden root.
    RefreshDescendants(Option<PacketId>),
    Relabel(PacketId),
    /// The packet's contents changed; its pane should refresh.
    Changed(PacketId),
    Destroyed(PacketId),
}

#[derive(Clone)]
pub struct UiSender {
    tx: mpsc::UnboundedSender<UiTask>,
}

impl UiSender {
    pub fn post(&self, task: UiTask) {
        /* a closed queue means the window is gone and nobody cares */
        let _ = self.tx.send(task);
    }
}

pub struct UiQueue {
    tx: UiSender,
    rx: mpsc::UnboundedReceiver<UiTask>,
}

impl Default for UiQueue {
    fn default() -> Self {
        UiQueue::new()
    }
}

impl UiQueue {
    pub fn new() -> UiQueue {
        let (tx, rx) = mpsc::unbounded_channel();
        UiQueue { tx: UiSender { tx }, rx }
    }

    pub fn sender(&self) -> UiSender {
        self.tx.clone()
    }

    /// Takes everything posted so far, in posting order, with repeats
    /// removed.
    pub fn drain(&mut self) -> Vec<UiTask> {
        let mut tasks = Vec::new();
        while let Ok(task) = self.rx.try_recv() {
            tasks.push(task);
        }
        tasks.into_iter().unique().collect()
    }
}

/// Turns packet events into UI tasks. `root` is the hidden document root:
/// structural events on it refresh the top level of the tree.
pub struct Forwarder {
    root: PacketId,
    tx: UiSender,
}

impl Forwarder {
    pub fn new(root: PacketId, tx: UiSender) -> sync::Arc<dyn PacketListener> {
        sync::Arc::new(Forwarder { root, tx })
    }
}

impl PacketListener for Forwarder {
    fn packet_event(&self, packet: &Packet, event: &PacketEvent) {
        let parent = if packet.id() == self.root { None } else { Some(packet.id()) };
        let task = match event {
            PacketEvent::AboutToChange => return,
            PacketEvent::WasChanged => UiTask::Changed(packet.id()),
            PacketEvent::Renamed => UiTask::Relabel(packet.id()),
            PacketEvent::AboutToDestroy => UiTask::Destroyed(packet.id()),
            PacketEvent::ChildAdded(_) | PacketEvent::ChildRemoved(_) | PacketEvent::ChildrenReordered => UiTask::RefreshDescendants(parent),
        };
        self.tx.post(task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    use crate::model::packet::Payload;

    #[test]
    fn bursts_coalesce() {
        let mut queue = UiQueue::new();
        let root = Packet::container("");
        let listener = Forwarder::new(root.id(), queue.sender());
        let _subscription = root.listen(&listener);

        let a = Packet::new("A", Payload::Text(String::new()));
        let _a_subscription = a.listen(&listener);
        root.append(a.clone()).unwrap();
        root.append(Packet::container("B")).unwrap();
        a.set_label("A2");
        root.append(Packet::container("C")).unwrap();

        assert_eq!(queue.drain(), vec![UiTask::RefreshDescendants(None), UiTask::Relabel(a.id())]);
        assert_eq!(queue.drain(), vec![]);
    }

    #[test]
    fn events_from_worker_threads_arrive() {
        let mut queue = UiQueue::new();
        let root = Packet::container("");
        let list = Packet::container("Lists");
        root.append(list.clone()).unwrap();
        let listener = Forwarder::new(root.id(), queue.sender());
        let _subscription = list.listen(&listener);

        let worker = list.clone();
        std::thread::spawn(move || {
            for i in 0..5 {
                worker.append(Packet::container(format!("Result {}", i))).unwrap();
            }
        }).join().unwrap();

        assert_eq!(queue.drain(), vec![UiTask::RefreshDescendants(Some(list.id()))]);
        assert_eq!(list.count_children(), 5);
    }
}
