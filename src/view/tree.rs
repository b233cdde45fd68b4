//! The packet tree as the user sees it.
//!
//! A [TreeView] mirrors every packet below the document root (which is never
//! shown). Items hold their packets weakly. Nothing here is ever updated
//! straight from a packet notification: the view subscribes each mirrored
//! packet to a forwarder that posts onto the window's [UiQueue], and the
//! window hands the drained tasks back to [TreeView::handle].
//!
//! [UiQueue]: crate::view::queue::UiQueue

use std::collections::HashMap;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync;

use crate::model::packet::{Packet, PacketId, PacketListener, PacketRef, Subscription};
use crate::view::queue::{Forwarder, UiSender, UiTask};

#[derive(Debug)]
pub struct TreeItem {
    packet: sync::Weak<Packet>,
    id: PacketId,
    label: String,
    expanded: bool,
    children: Vec<TreeItem>,
}

impl TreeItem {
    pub fn packet(&self) -> Option<PacketRef> {
        self.packet.upgrade()
    }

    pub fn id(&self) -> PacketId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn children(&self) -> &[TreeItem] {
        &self.children
    }
}

/// What the tree shows for a packet: its label, marked when it carries
/// tags.
pub fn display_label(packet: &Packet) -> String {
    if packet.has_tags() {
        format!("{} (+)", packet.human_label())
    } else {
        packet.human_label()
    }
}

/// One visible line of the tree, for text front-ends and tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeRow {
    pub depth: usize,
    pub id: PacketId,
    pub label: String,
    pub tags: Option<Vec<String>>,
    pub selected: bool,
}

/* state threaded through a refresh, kept apart from the item vectors so that
 * both can be borrowed mutably at once */
struct Refresh<'a> {
    listener: &'a sync::Arc<dyn PacketListener>,
    subscriptions: &'a mut HashMap<PacketId, Subscription>,
    to_select: &'a mut Option<PacketId>,
    adopted: Option<PacketId>,
}

impl<'a> Refresh<'a> {
    fn subscribe(&mut self, packet: &PacketRef) {
        let listener = self.listener;
        self.subscriptions.entry(packet.id()).or_insert_with(|| packet.listen(listener));
    }

    fn create(&mut self, packet: &PacketRef) -> TreeItem {
        self.subscribe(packet);
        if *self.to_select == Some(packet.id()) {
            *self.to_select = None;
            self.adopted = Some(packet.id());
        }
        let mut item = TreeItem {
            packet: sync::Arc::downgrade(packet),
            id: packet.id(),
            label: display_label(packet),
            expanded: false,
            children: Vec::new(),
        };
        item.children = packet.children().iter().map(|child| self.create(child)).collect();
        item
    }

    fn refresh_item(&mut self, item: &mut TreeItem, packet: &PacketRef) {
        item.label = display_label(packet);
        if self.sync_children(&mut item.children, packet) {
            item.expanded = true;
        }
    }

    /// Brings `items` into line with the children of `packet`, reusing items
    /// that moved. Returns true if items had to be appended past the end of
    /// the old list.
    fn sync_children(&mut self, items: &mut Vec<TreeItem>, packet: &PacketRef) -> bool {
        let children = packet.children();
        let mut appended = false;

        for (index, child) in children.iter().enumerate() {
            if index >= items.len() {
                items.push(self.create(child));
                appended = true;
            } else if items[index].id == child.id() {
                self.refresh_item(&mut items[index], child);
            } else if let Some(offset) = items[index + 1..].iter().position(|item| item.id == child.id()) {
                let item = items.remove(index + 1 + offset);
                items.insert(index, item);
                self.refresh_item(&mut items[index], child);
            } else {
                let item = self.create(child);
                items.insert(index, item);
            }
        }

        items.truncate(children.len());
        appended
    }
}

pub struct TreeView {
    root: sync::Weak<Packet>,
    items: Vec<TreeItem>,
    selected: Option<PacketId>,
    to_select: Option<PacketId>,
    display_tags: bool,

    listener: sync::Arc<dyn PacketListener>,
    subscriptions: HashMap<PacketId, Subscription>,
}

impl TreeView {
    pub fn new(root: &PacketRef, tx: UiSender, display_tags: bool) -> TreeView {
        let listener = Forwarder::new(root.id(), tx);
        let mut subscriptions = HashMap::new();
        subscriptions.insert(root.id(), root.listen(&listener));

        let mut tv = TreeView {
            root: sync::Arc::downgrade(root),
            items: Vec::new(),
            selected: None,
            to_select: None,
            display_tags,
            listener,
            subscriptions,
        };
        tv.refresh_full();
        tv
    }

    pub fn items(&self) -> &[TreeItem] {
        &self.items
    }

    /// Re-synchronises the whole tree with the packets.
    pub fn refresh_full(&mut self) {
        self.refresh_subtree(None);
    }

    /// Re-synchronises the items below `parent` (None for the hidden root).
    /// The selection survives as long as its packet is still in the tree.
    pub fn refresh_subtree(&mut self, parent: Option<PacketId>) {
        let Some(root) = self.root.upgrade() else {
            self.items.clear();
            self.selected = None;
            self.subscriptions.clear();
            return;
        };

        let remembered = self.selected;

        let packet = match parent {
            None => Some(root.clone()),
            Some(id) => root.find_id(id),
        };

        let mut refresh = Refresh {
            listener: &self.listener,
            subscriptions: &mut self.subscriptions,
            to_select: &mut self.to_select,
            adopted: None,
        };

        match (parent, packet) {
            (None, Some(packet)) => {
                refresh.sync_children(&mut self.items, &packet);
            },
            (Some(id), Some(packet)) => match find_item_mut(&mut self.items, id) {
                Some(item) => refresh.refresh_item(item, &packet),
                None => {
                    /* the parent itself has not been mirrored yet */
                    refresh.sync_children(&mut self.items, &root);
                },
            },
            (_, None) => {
                /* the parent vanished before we got here */
                refresh.sync_children(&mut self.items, &root);
            },
        }

        let adopted = refresh.adopted;
        self.selected = adopted.or(remembered).filter(|id| self.find(*id).is_some());
        self.prune_subscriptions(root.id());
    }

    fn prune_subscriptions(&mut self, root: PacketId) {
        let mut live = HashSet::new();
        live.insert(root);
        collect_ids(&self.items, &mut live);
        self.subscriptions.retain(|id, _| live.contains(id));
    }

    /// Applies tasks drained from the UI queue. Returns true if anything in
    /// the tree changed.
    pub fn handle(&mut self, tasks: &[UiTask]) -> bool {
        let mut changed = false;
        for task in tasks {
            match task {
                UiTask::RefreshDescendants(parent) => {
                    self.refresh_subtree(*parent);
                    changed = true;
                },
                UiTask::Relabel(id) => {
                    if let Some(item) = find_item_mut(&mut self.items, *id) {
                        if let Some(packet) = item.packet.upgrade() {
                            item.label = display_label(&packet);
                            changed = true;
                        }
                    }
                },
                UiTask::Destroyed(id) => {
                    if self.selected == Some(*id) {
                        self.selected = None;
                    }
                    self.subscriptions.remove(id);
                },
                UiTask::Changed(_) => {},
            }
        }
        changed
    }

    pub fn selected(&self) -> Option<PacketRef> {
        self.selected.and_then(|id| self.find(id)).and_then(TreeItem::packet)
    }

    pub fn selected_id(&self) -> Option<PacketId> {
        self.selected
    }

    /// Selects `packet`. If it is not in the tree yet, remembers it, and the
    /// refresh that first mirrors it will select it.
    pub fn select(&mut self, packet: &Packet) {
        if self.find(packet.id()).is_some() {
            self.selected = Some(packet.id());
            self.to_select = None;
            self.expand_to(packet.id());
        } else {
            self.to_select = Some(packet.id());
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.to_select = None;
    }

    pub fn pending_selection(&self) -> Option<PacketId> {
        self.to_select
    }

    pub fn find(&self, id: PacketId) -> Option<&TreeItem> {
        find_item(&self.items, id)
    }

    pub fn set_expanded(&mut self, id: PacketId, expanded: bool) {
        if let Some(item) = find_item_mut(&mut self.items, id) {
            item.expanded = expanded;
        }
    }

    fn expand_to(&mut self, id: PacketId) {
        let Some(packet) = self.find(id).and_then(TreeItem::packet) else { return };
        let mut ancestor = packet.parent();
        while let Some(p) = ancestor {
            self.set_expanded(p.id(), true);
            ancestor = p.parent();
        }
    }

    pub fn set_display_tags(&mut self, display_tags: bool) {
        self.display_tags = display_tags;
    }

    /// Every item in display order, expanded or not.
    pub fn rows(&self) -> Vec<TreeRow> {
        let mut rows = Vec::new();
        self.collect_rows(&self.items, 0, &mut rows);
        rows
    }

    fn collect_rows(&self, items: &[TreeItem], depth: usize, rows: &mut Vec<TreeRow>) {
        for item in items {
            let tags = match (self.display_tags, item.packet()) {
                (true, Some(packet)) if packet.has_tags() => Some(packet.tags().into_iter().collect()),
                _ => None,
            };
            rows.push(TreeRow {
                depth,
                id: item.id,
                label: item.label.clone(),
                tags,
                selected: self.selected == Some(item.id),
            });
            self.collect_rows(&item.children, depth + 1, rows);
        }
    }

    /// The shape of the tree as nested labels, e.g. `A{B,C},D`.
    pub fn shape(&self) -> String {
        fn write(items: &[TreeItem], out: &mut String) {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&item.label);
                if !item.children.is_empty() {
                    out.push('{');
                    write(&item.children, out);
                    out.push('}');
                }
            }
        }
        let mut out = String::new();
        write(&self.items, &mut out);
        out
    }
}

/// The local files among URLs dropped onto the tree, in drop order. Other
/// schemes are ignored.
pub fn dropped_files<'a>(urls: impl IntoIterator<Item = &'a str>) -> Vec<PathBuf> {
    urls.into_iter()
        .filter_map(|text| match url::Url::parse(text.trim()) {
            Ok(url) => url.to_file_path().ok(),
            Err(error) => {
                tracing::debug!(url = text, %error, "ignoring dropped text that is not a URL");
                None
            },
        })
        .collect()
}

fn find_item(items: &[TreeItem], id: PacketId) -> Option<&TreeItem> {
    for item in items {
        if item.id == id {
            return Some(item);
        }
        if let Some(found) = find_item(&item.children, id) {
            return Some(found);
        }
    }
    None
}

fn find_item_mut(items: &mut [TreeItem], id: PacketId) -> Option<&mut TreeItem> {
    for item in items.iter_mut() {
        if item.id == id {
            return Some(item);
        }
        if let Some(found) = find_item_mut(&mut item.children, id) {
            return Some(found);
        }
    }
    None
}

fn collect_ids(items: &[TreeItem], into: &mut HashSet<PacketId>) {
    for item in items {
        into.insert(item.id);
        collect_ids(&item.children, into);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeSet;

    use pretty_assertions::assert_eq;

    use crate::model::packet::Payload;
    use crate::view::queue::UiQueue;

    fn text(label: &str) -> PacketRef {
        Packet::new(label, Payload::Text(String::new()))
    }

    struct Fixture {
        root: PacketRef,
        queue: UiQueue,
        tv: TreeView,
    }

    impl Fixture {
        fn new() -> Fixture {
            let root = Packet::container("");
            let a = Packet::container("A");
            a.append(text("A1")).unwrap();
            a.append(text("A2")).unwrap();
            root.append(a).unwrap();
            root.append(text("B")).unwrap();

            let queue = UiQueue::new();
            let tv = TreeView::new(&root, queue.sender(), false);
            Fixture { root, queue, tv }
        }

        fn pump(&mut self) {
            let tasks = self.queue.drain();
            self.tv.handle(&tasks);
        }

        fn packet(&self, label: &str) -> PacketRef {
            self.root.find_label(label).unwrap()
        }
    }

    #[test]
    fn mirrors_the_tree_without_the_root() {
        let f = Fixture::new();
        assert_eq!(f.tv.shape(), "A{A1,A2},B");
        assert_eq!(f.tv.rows().iter().map(|r| r.depth).collect::<Vec<_>>(), vec![0, 1, 1, 0]);
    }

    #[test]
    fn follows_structural_changes_through_the_queue() {
        let mut f = Fixture::new();
        let a = f.packet("A");
        let a2 = f.packet("A2");

        a2.move_to_first();
        f.packet("B").make_orphan();
        a.append(text("A3")).unwrap();
        f.root.prepend(text("Z")).unwrap();

        /* nothing happens until the queue is pumped */
        assert_eq!(f.tv.shape(), "A{A1,A2},B");
        f.pump();
        assert_eq!(f.tv.shape(), "Z,A{A2,A1,A3}");
    }

    #[test]
    fn moved_items_keep_their_expansion() {
        let mut f = Fixture::new();
        let a = f.packet("A");
        f.tv.set_expanded(a.id(), true);
        a.move_to_last();
        f.pump();
        assert_eq!(f.tv.shape(), "B,A{A1,A2}");
        assert!(f.tv.find(a.id()).unwrap().is_expanded());
    }

    #[test]
    fn appending_expands_the_parent() {
        let mut f = Fixture::new();
        let b = f.packet("B");
        assert!(!f.tv.find(b.id()).unwrap().is_expanded());
        b.append(text("B1")).unwrap();
        f.pump();
        assert!(f.tv.find(b.id()).unwrap().is_expanded());
    }

    #[test]
    fn selection_survives_refresh_while_its_packet_lives() {
        let mut f = Fixture::new();
        let a1 = f.packet("A1");
        f.tv.select(&a1);
        a1.move_to_last();
        f.pump();
        assert_eq!(f.tv.selected().map(|p| p.id()), Some(a1.id()));

        a1.make_orphan();
        drop(a1);
        f.pump();
        assert!(f.tv.selected().is_none());
    }

    #[test]
    fn pending_selection_is_adopted_when_the_item_appears() {
        let mut f = Fixture::new();
        let c = text("C");
        f.tv.select(&c);
        assert_eq!(f.tv.pending_selection(), Some(c.id()));
        assert!(f.tv.selected().is_none());

        f.root.append(c.clone()).unwrap();
        f.pump();
        assert_eq!(f.tv.selected_id(), Some(c.id()));
        assert_eq!(f.tv.pending_selection(), None);
    }

    #[test]
    fn labels_mark_tags() {
        let mut f = Fixture::new();
        let b = f.packet("B");
        b.set_tags(BTreeSet::from(["knot".to_string()]));
        f.pump();
        assert_eq!(f.tv.find(b.id()).unwrap().label(), "B (+)");
        assert_eq!(f.tv.rows()[3].tags, None);

        f.tv.set_display_tags(true);
        assert_eq!(f.tv.rows()[3].tags, Some(vec!["knot".to_string()]));

        b.set_label("");
        b.set_tags(BTreeSet::new());
        f.pump();
        assert_eq!(f.tv.find(b.id()).unwrap().label(), "(no label)");
    }

    #[test]
    fn subscriptions_follow_the_tree() {
        let mut f = Fixture::new();
        let a = f.packet("A");
        assert!(a.has_listeners());
        a.make_orphan();
        f.pump();
        assert!(!a.has_listeners());
    }

    #[test]
    fn drops_keep_only_local_files() {
        let files = dropped_files(["file:///tmp/one.rga", "https://example.org/x.rga", "not a url", "file:///tmp/two%20words.rga"]);
        assert_eq!(files, vec![PathBuf::from("/tmp/one.rga"), PathBuf::from("/tmp/two words.rga")]);
    }
}
