//! The packet tree: an observable, strictly tree-shaped hierarchy of
//! mathematical objects.
//!
//! A parent owns its children through strong references; children only point
//! back at their parent weakly, so a subtree lives exactly as long as its
//! owner keeps it. Listeners are held weakly too. Events are always delivered
//! after every internal lock has been released, so a listener may freely
//! query or even modify the tree it is observing.

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync;
use std::sync::atomic;

use parking_lot::{Mutex, RwLock};

use crate::engine::{Engine, EngineError};

pub mod payload;

pub use payload::{PacketKind, Payload, PayloadVariant, Script, ScriptVariable, SnapPeaData};

pub type PacketRef = sync::Arc<Packet>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PacketId(u64);

impl PacketId {
    fn next() -> PacketId {
        static NEXT: atomic::AtomicU64 = atomic::AtomicU64::new(1);
        PacketId(NEXT.fetch_add(1, atomic::Ordering::Relaxed))
    }
}

#[derive(Clone, Debug)]
pub enum PacketEvent {
    AboutToChange,
    WasChanged,
    /// The label or the tag set changed.
    Renamed,
    /// Delivered while the packet is being dropped. Listeners must not try to
    /// keep the packet alive past this point.
    AboutToDestroy,
    ChildAdded(PacketRef),
    ChildRemoved(PacketRef),
    ChildrenReordered,
}

#[derive(Debug)]
pub enum PacketError {
    /// The proposed child is this packet or one of its ancestors.
    WouldCreateCycle,
    /// The proposed child already has a parent.
    NotOrphan,
    /// A packet named as a sibling position is not a child of this packet.
    NotAChild,
    /// A payload of a different kind was offered to an existing packet.
    KindChanged { expected: PacketKind, found: PacketKind },
    /// The packet's payload is not of the type an operation asked for.
    WrongKind(PacketKind),
}

impl fmt::Display for PacketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketError::WouldCreateCycle => write!(f, "a packet cannot be inserted beneath itself"),
            PacketError::NotOrphan => write!(f, "the packet to insert already has a parent"),
            PacketError::NotAChild => write!(f, "the reference packet is not a child of this packet"),
            PacketError::KindChanged { expected, found } => write!(f, "a {} packet cannot hold {} data", expected, found),
            PacketError::WrongKind(kind) => write!(f, "this does not apply to a {} packet", kind),
        }
    }
}

impl std::error::Error for PacketError {}

pub trait PacketListener: Send + Sync {
    fn packet_event(&self, packet: &Packet, event: &PacketEvent);
}

impl<F: Fn(&Packet, &PacketEvent) + Send + Sync> PacketListener for F {
    fn packet_event(&self, packet: &Packet, event: &PacketEvent) {
        self(packet, event)
    }
}

struct Meta {
    label: String,
    tags: BTreeSet<String>,
}

struct Links {
    parent: sync::Weak<Packet>,
    children: Vec<PacketRef>,
}

pub struct Packet {
    id: PacketId,
    kind: PacketKind,
    this: sync::Weak<Packet>,
    meta: RwLock<Meta>,
    links: RwLock<Links>,
    payload: RwLock<Payload>,
    listeners: Mutex<Vec<(u64, sync::Weak<dyn PacketListener>)>>,
    next_listener: atomic::AtomicU64,
}

/// Keeps a listener registered; dropping it unregisters.
#[must_use]
pub struct Subscription {
    packet: sync::Weak<Packet>,
    id: u64,
}

impl Subscription {
    /// Leaves the listener registered for as long as both it and the packet
    /// are alive.
    pub fn detach(mut self) {
        self.packet = sync::Weak::new();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(packet) = self.packet.upgrade() {
            packet.listeners.lock().retain(|(id, _)| *id != self.id);
        }
    }
}

impl Packet {
    pub fn new(label: impl Into<String>, payload: Payload) -> PacketRef {
        let kind = payload.kind();
        sync::Arc::new_cyclic(|this| Packet {
            id: PacketId::next(),
            kind,
            this: this.clone(),
            meta: RwLock::new(Meta { label: label.into(), tags: BTreeSet::new() }),
            links: RwLock::new(Links { parent: sync::Weak::new(), children: Vec::new() }),
            payload: RwLock::new(payload),
            listeners: Mutex::new(Vec::new()),
            next_listener: atomic::AtomicU64::new(0),
        })
    }

    pub fn container(label: impl Into<String>) -> PacketRef {
        Packet::new(label, Payload::Container)
    }

    pub fn id(&self) -> PacketId {
        self.id
    }

    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    pub fn label(&self) -> String {
        self.meta.read().label.clone()
    }

    /// The label, or "(no label)" if the label is empty.
    pub fn human_label(&self) -> String {
        let label = self.label();
        if label.is_empty() {
            "(no label)".to_string()
        } else {
            label
        }
    }

    pub fn set_label(&self, label: impl Into<String>) {
        let label = label.into();
        {
            let mut meta = self.meta.write();
            if meta.label == label {
                return;
            }
            meta.label = label;
        }
        self.fire(&PacketEvent::Renamed);
    }

    /// `"label (Suffix)"`, used to name derived packets.
    pub fn adorned_label(&self, adornment: &str) -> String {
        let label = self.label();
        let trimmed = label.trim();
        if trimmed.is_empty() {
            adornment.to_string()
        } else {
            format!("{} ({})", trimmed, adornment)
        }
    }

    pub fn tags(&self) -> BTreeSet<String> {
        self.meta.read().tags.clone()
    }

    pub fn has_tags(&self) -> bool {
        !self.meta.read().tags.is_empty()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.meta.read().tags.contains(tag)
    }

    pub fn set_tags(&self, tags: BTreeSet<String>) {
        {
            let mut meta = self.meta.write();
            if meta.tags == tags {
                return;
            }
            meta.tags = tags;
        }
        self.fire(&PacketEvent::Renamed);
    }

    pub fn add_tag(&self, tag: impl Into<String>) -> bool {
        let added = self.meta.write().tags.insert(tag.into());
        if added {
            self.fire(&PacketEvent::Renamed);
        }
        added
    }

    pub fn remove_tag(&self, tag: &str) -> bool {
        let removed = self.meta.write().tags.remove(tag);
        if removed {
            self.fire(&PacketEvent::Renamed);
        }
        removed
    }

    /* payload */

    pub fn payload(&self) -> parking_lot::RwLockReadGuard<'_, Payload> {
        self.payload.read()
    }

    /// Runs `f` on the payload if it is of type `T`.
    pub fn read<T: PayloadVariant, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let payload = self.payload.read();
        T::get(&payload).map(f)
    }

    /// Modifies the payload as a `T`. The closure works on a copy, which is
    /// committed (with change events) only if the packet's kind is unchanged
    /// afterwards.
    pub fn change<T: PayloadVariant, R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, PacketError> {
        self.try_change::<T, R, PacketError>(|value| Ok(f(value)))
    }

    /// Like [Packet::change], but the closure may fail, in which case the
    /// payload is left exactly as it was and no events are fired.
    pub fn try_change<T: PayloadVariant, R, E: From<PacketError>>(&self, f: impl FnOnce(&mut T) -> Result<R, E>) -> Result<R, E> {
        let mut working: T = {
            let payload = self.payload.read();
            match T::get(&payload) {
                Some(value) => value.clone(),
                None => return Err(PacketError::WrongKind(self.kind).into()),
            }
        };

        let result = f(&mut working)?;
        self.set_payload(working.into_payload())?;
        Ok(result)
    }

    /// Replaces the payload wholesale. The new payload must be of the same
    /// kind as the packet.
    pub fn set_payload(&self, new_payload: Payload) -> Result<(), PacketError> {
        let found = new_payload.kind();
        if found != self.kind {
            tracing::error!(packet = %self.label(), expected = %self.kind, found = %found, "refused to change packet kind");
            return Err(PacketError::KindChanged { expected: self.kind, found });
        }

        self.fire(&PacketEvent::AboutToChange);
        *self.payload.write() = new_payload;
        self.fire(&PacketEvent::WasChanged);
        Ok(())
    }

    /* structure */

    fn arc(&self) -> Option<PacketRef> {
        self.this.upgrade()
    }

    pub fn parent(&self) -> Option<PacketRef> {
        self.links.read().parent.upgrade()
    }

    pub fn is_root(&self) -> bool {
        self.parent().is_none()
    }

    pub fn root(self: &sync::Arc<Self>) -> PacketRef {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    pub fn children(&self) -> Vec<PacketRef> {
        self.links.read().children.clone()
    }

    pub fn count_children(&self) -> usize {
        self.links.read().children.len()
    }

    pub fn has_children(&self) -> bool {
        self.count_children() > 0
    }

    pub fn first_child(&self) -> Option<PacketRef> {
        self.links.read().children.first().cloned()
    }

    pub fn last_child(&self) -> Option<PacketRef> {
        self.links.read().children.last().cloned()
    }

    pub fn child(&self, index: usize) -> Option<PacketRef> {
        self.links.read().children.get(index).cloned()
    }

    pub fn index_in_parent(&self) -> Option<usize> {
        let parent = self.parent()?;
        let links = parent.links.read();
        links.children.iter().position(|c| c.id == self.id)
    }

    pub fn next_sibling(&self) -> Option<PacketRef> {
        let parent = self.parent()?;
        let index = self.index_in_parent()?;
        parent.child(index + 1)
    }

    pub fn prev_sibling(&self) -> Option<PacketRef> {
        let parent = self.parent()?;
        let index = self.index_in_parent()?;
        index.checked_sub(1).and_then(|i| parent.child(i))
    }

    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent();
        while let Some(p) = current {
            depth+= 1;
            current = p.parent();
        }
        depth
    }

    /// This packet and all its descendants in depth-first pre-order.
    pub fn subtree(self: &sync::Arc<Self>) -> Vec<PacketRef> {
        let mut out = Vec::new();
        let mut stack = vec![self.clone()];
        while let Some(packet) = stack.pop() {
            let children = packet.children();
            out.push(packet);
            stack.extend(children.into_iter().rev());
        }
        out
    }

    pub fn total_tree_size(self: &sync::Arc<Self>) -> usize {
        self.subtree().len()
    }

    /// Whether this packet is `other` or one of its ancestors.
    pub fn is_ancestor_of(&self, other: &Packet) -> bool {
        if other.id == self.id {
            return true;
        }
        let mut current = other.parent();
        while let Some(p) = current {
            if p.id == self.id {
                return true;
            }
            current = p.parent();
        }
        false
    }

    /// Whether `other` is a strict ancestor of this packet.
    pub fn find_ancestor_of(&self, other: &Packet) -> bool {
        other.id != self.id && other.is_ancestor_of(self)
    }

    /// Finds the first packet in this subtree (pre-order) with the given label.
    pub fn find_label(self: &sync::Arc<Self>, label: &str) -> Option<PacketRef> {
        self.subtree().into_iter().find(|p| p.label() == label)
    }

    pub fn find_id(self: &sync::Arc<Self>, id: PacketId) -> Option<PacketRef> {
        self.subtree().into_iter().find(|p| p.id == id)
    }

    /// Detaches this packet (and its subtree) from its parent. The caller's
    /// reference becomes the only thing keeping it alive.
    pub fn make_orphan(&self) {
        let Some(parent) = self.parent() else { return };
        let Some(me) = self.arc() else { return };
        {
            let mut links = parent.links.write();
            links.children.retain(|c| c.id != self.id);
        }
        self.links.write().parent = sync::Weak::new();
        parent.fire(&PacketEvent::ChildRemoved(me));
    }

    fn check_insertable(&self, child: &PacketRef) -> Result<(), PacketError> {
        if child.is_ancestor_of(self) {
            tracing::error!(parent = %self.label(), child = %child.label(), "refused to create a cycle in the packet tree");
            return Err(PacketError::WouldCreateCycle);
        }
        if child.parent().is_some() {
            return Err(PacketError::NotOrphan);
        }
        Ok(())
    }

    fn insert_at(&self, child: PacketRef, index: usize) -> Result<(), PacketError> {
        self.check_insertable(&child)?;
        child.links.write().parent = self.this.clone();
        {
            let mut links = self.links.write();
            let index = index.min(links.children.len());
            links.children.insert(index, child.clone());
        }
        self.fire(&PacketEvent::ChildAdded(child));
        Ok(())
    }

    pub fn append(&self, child: PacketRef) -> Result<(), PacketError> {
        self.insert_at(child, usize::MAX)
    }

    pub fn prepend(&self, child: PacketRef) -> Result<(), PacketError> {
        self.insert_at(child, 0)
    }

    /// Inserts `child` immediately after `after`, or first if `after` is None.
    pub fn insert(&self, child: PacketRef, after: Option<&Packet>) -> Result<(), PacketError> {
        let index = match after {
            None => 0,
            Some(after) => {
                let links = self.links.read();
                match links.children.iter().position(|c| c.id == after.id) {
                    Some(i) => i + 1,
                    None => return Err(PacketError::NotAChild),
                }
            },
        };
        self.insert_at(child, index)
    }

    /// Moves this packet within its parent's child list. `target` is clamped
    /// to the valid range; the parent hears `ChildrenReordered` once, and only
    /// if something moved.
    fn move_to_index(&self, target: impl FnOnce(usize, usize) -> usize) {
        let Some(parent) = self.parent() else { return };
        let moved = {
            let mut links = parent.links.write();
            let Some(current) = links.children.iter().position(|c| c.id == self.id) else { return };
            let last = links.children.len() - 1;
            let target = target(current, last).min(last);
            if target == current {
                false
            } else {
                let me = links.children.remove(current);
                links.children.insert(target, me);
                true
            }
        };
        if moved {
            parent.fire(&PacketEvent::ChildrenReordered);
        }
    }

    pub fn swap_with_next_sibling(&self) {
        self.move_to_index(|current, last| if current < last { current + 1 } else { current });
    }

    pub fn move_up(&self, steps: usize) {
        self.move_to_index(|current, _| current.saturating_sub(steps));
    }

    pub fn move_down(&self, steps: usize) {
        self.move_to_index(|current, last| current.saturating_add(steps).min(last));
    }

    pub fn move_to_first(&self) {
        self.move_to_index(|_, _| 0);
    }

    pub fn move_to_last(&self) {
        self.move_to_index(|_, last| last);
    }

    /// Deep-copies this packet (and, if `subtree`, its descendants) and
    /// inserts the copy immediately after this packet. The copy is labelled
    /// `"label (Clone)"`. If `preserve_refs` is set, script variables that
    /// point into the cloned subtree are redirected to the corresponding
    /// copies. Returns None for a root packet.
    pub fn clone_as_sibling(&self, subtree: bool, preserve_refs: bool) -> Option<PacketRef> {
        let parent = self.parent()?;
        let me = self.arc()?;

        let mut mapping: HashMap<PacketId, PacketRef> = HashMap::new();
        let copy = me.deep_copy(subtree, &mut mapping);
        copy.meta.write().label = self.adorned_label("Clone");

        if preserve_refs {
            for packet in copy.subtree() {
                if packet.kind == PacketKind::Script {
                    let mut payload = packet.payload.write();
                    if let Payload::Script(script) = &mut *payload {
                        script.remap_variables(|target| mapping.get(&target.id).cloned());
                    }
                }
            }
        }

        parent.insert(copy.clone(), Some(self)).ok()?;
        Some(copy)
    }

    /// Writes this subtree, with this packet at the top, through the
    /// engine's canonical data format.
    pub fn save(self: &sync::Arc<Self>, engine: &dyn Engine, path: &Path) -> Result<(), EngineError> {
        engine.save(self, path)
    }

    fn deep_copy(self: &sync::Arc<Self>, subtree: bool, mapping: &mut HashMap<PacketId, PacketRef>) -> PacketRef {
        let copy = Packet::new(self.label(), self.payload.read().clone());
        copy.meta.write().tags = self.tags();
        mapping.insert(self.id, copy.clone());
        if subtree {
            for child in self.children() {
                let child_copy = child.deep_copy(true, mapping);
                child_copy.links.write().parent = sync::Arc::downgrade(&copy);
                copy.links.write().children.push(child_copy);
            }
        }
        copy
    }

    /* listeners */

    /// Registers a listener. The packet holds it weakly; keep the `Arc`
    /// alive for as long as events are wanted.
    pub fn listen(&self, listener: &sync::Arc<dyn PacketListener>) -> Subscription {
        let id = self.next_listener.fetch_add(1, atomic::Ordering::Relaxed);
        self.listeners.lock().push((id, sync::Arc::downgrade(listener)));
        Subscription { packet: self.this.clone(), id }
    }

    pub fn has_listeners(&self) -> bool {
        self.listeners.lock().iter().any(|(_, l)| l.strong_count() > 0)
    }

    fn fire(&self, event: &PacketEvent) {
        let live: Vec<sync::Arc<dyn PacketListener>> = {
            let mut listeners = self.listeners.lock();
            listeners.retain(|(_, l)| l.strong_count() > 0);
            listeners.iter().filter_map(|(_, l)| l.upgrade()).collect()
        };
        for listener in live {
            listener.packet_event(self, event);
        }
    }
}

impl Drop for Packet {
    fn drop(&mut self) {
        self.fire(&PacketEvent::AboutToDestroy);
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("label", &self.meta.read().label)
            .finish_non_exhaustive()
    }
}
