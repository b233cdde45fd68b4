//! Properties the packet tree, the tree view, files, the Python console and
//! the preferences must keep, whatever the user does.

mod common;

use std::collections::HashSet;
use std::sync;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use regina_ui::engine::basic::BasicEngine;
use regina_ui::engine::Engine;
use regina_ui::model::packet::{Packet, PacketEvent, PacketKind, PacketListener, PacketRef, Payload};
use regina_ui::model::preferences::{Change, HomflyType, Preferences, PreferencesStore, ThreadCount};
use regina_ui::model::triangulation::Triangulation;
use regina_ui::python::{EmbeddedPython, LineKind, PythonConsole};
use regina_ui::view::queue::UiQueue;
use regina_ui::view::tree::TreeView;

use common::Script;

fn sample() -> PacketRef {
    let root = Packet::container("");
    let a = Packet::container("A");
    a.append(Packet::new("A1", Payload::Text("one".into()))).unwrap();
    a.append(Packet::new("A2", Payload::Triangulation(common::sphere()))).unwrap();
    root.append(a).unwrap();
    root.append(Packet::new("B", Payload::Link(common::trefoil()))).unwrap();
    root.append(Packet::new("C", Payload::Text("three".into()))).unwrap();
    root
}

#[test]
fn orphans_are_adopted_as_last_child() {
    let root = sample();
    let a1 = root.find_label("A1").unwrap();
    let c = root.find_label("C").unwrap();

    a1.make_orphan();
    assert!(a1.parent().is_none());
    c.append(a1.clone()).unwrap();
    assert!(sync::Arc::ptr_eq(&a1.parent().unwrap(), &c));
    assert!(sync::Arc::ptr_eq(&c.last_child().unwrap(), &a1));

    /* only orphans may be adopted */
    assert!(root.append(a1.clone()).is_err());
}

#[test]
fn reordering_keeps_the_children_and_says_so_once() {
    let root = sample();
    let events = sync::Arc::new(Mutex::new(0usize));
    let counter = events.clone();
    let listener: sync::Arc<dyn PacketListener> = sync::Arc::new(move |_: &Packet, event: &PacketEvent| {
        if matches!(event, PacketEvent::ChildrenReordered) {
            *counter.lock() += 1;
        }
    });
    let _subscription = root.listen(&listener);

    let before: HashSet<_> = root.children().iter().map(|c| c.id()).collect();
    let b = root.find_label("B").unwrap();
    let check = |expected: usize| {
        let after: HashSet<_> = root.children().iter().map(|c| c.id()).collect();
        assert_eq!(after, before);
        assert_eq!(*events.lock(), expected);
    };

    b.move_up(1);
    check(1);
    b.move_to_last();
    check(2);
    b.move_to_first();
    check(3);
    b.move_down(2);
    check(4);

    /* already last, so nothing moves and nothing is said */
    b.move_to_last();
    check(4);
}

#[test]
fn subtree_clones_mirror_the_original() {
    let root = sample();
    let a = root.find_label("A").unwrap();
    let copy = a.clone_as_sibling(true, false).unwrap();

    let original = a.subtree();
    let cloned = copy.subtree();
    assert_eq!(cloned.len(), original.len());
    for (o, c) in original.iter().zip(&cloned).skip(1) {
        assert_eq!(c.label(), o.label());
        assert_eq!(c.kind(), o.kind());
        assert_eq!(c.count_children(), o.count_children());
        assert_ne!(c.id(), o.id());
    }
    assert_eq!(copy.read::<Triangulation, _>(Clone::clone), None);
    assert_eq!(cloned[2].read::<Triangulation, _>(Clone::clone), Some(common::sphere()));
}

#[test]
fn tree_view_mirrors_the_packets() {
    let root = sample();
    let mut queue = UiQueue::new();
    let mut tree = TreeView::new(&root, queue.sender(), false);
    assert_eq!(tree.shape(), common::shape_of(&root));

    root.find_label("B").unwrap().move_to_first();
    root.find_label("A2").unwrap().set_label("Sphere");
    root.find_label("C").unwrap().make_orphan();
    root.find_label("A").unwrap().append(Packet::container("New")).unwrap();
    tree.handle(&queue.drain());
    assert_eq!(tree.shape(), common::shape_of(&root));

    tree.refresh_full();
    assert_eq!(tree.shape(), "B,A{A1,Sphere,New}");
}

#[test]
fn saved_documents_read_back_the_same() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.rga");
    let root = sample();
    root.find_label("C").unwrap().add_tag("draft");

    BasicEngine.save(&root, &path).unwrap();
    let reread = BasicEngine.open(&path).unwrap();
    assert_eq!(common::shape_of(&reread), common::shape_of(&root));
    assert!(reread.find_label("C").unwrap().has_tag("draft"));
    assert_eq!(reread.find_label("A2").unwrap().kind(), PacketKind::Triangulation3);
}

#[test]
fn selection_survives_refreshes_while_its_packet_does() {
    let root = sample();
    let queue = UiQueue::new();
    let mut tree = TreeView::new(&root, queue.sender(), false);

    let a2 = root.find_label("A2").unwrap();
    tree.select(&a2);
    tree.refresh_subtree(None);
    assert_eq!(tree.selected_id(), Some(a2.id()));

    let a = root.find_label("A").unwrap();
    a.append(Packet::container("A3")).unwrap();
    tree.refresh_subtree(Some(a.id()));
    assert_eq!(tree.selected_id(), Some(a2.id()));

    a2.make_orphan();
    drop(a2);
    tree.refresh_subtree(Some(a.id()));
    assert_eq!(tree.selected_id(), None);
}

#[test]
fn item_is_rebound_only_when_asked() {
    let root = sample();
    let b = root.find_label("B").unwrap();
    let c = root.find_label("C").unwrap();
    let prefs = Preferences::default();

    let outputs = |console: &PythonConsole| -> Vec<String> {
        console.log().iter().filter(|l| l.kind == LineKind::Output).map(|l| l.text.clone()).collect()
    };

    let mut fixed = PythonConsole::new(Box::new(EmbeddedPython::new()), Some(&root), Some(&b), false, &prefs);
    fixed.selection_changed(Some(&c));
    fixed.execute_line("item.label()");
    fixed.execute_line("root.countChildren()");
    assert_eq!(outputs(&fixed), vec!["'B'", "3"]);

    /* a document window's console follows the tree */
    let rt = common::runtime();
    let script = Script::new();
    let mut w = common::window(sync::Arc::new(BasicEngine), sync::Arc::new(PreferencesStore::new()), &rt, &script);
    w.document().root().append(Packet::new("First", Payload::Text(String::new()))).unwrap();
    w.document().root().append(Packet::new("Second", Payload::Text(String::new()))).unwrap();
    w.pump_queue();
    let first = w.document().root().first_child().unwrap();
    let second = w.document().root().last_child().unwrap();

    w.select(&first);
    w.open_console();
    w.select(&second);
    w.open_console().execute_line("item.label()");
    assert_eq!(outputs(w.console().unwrap()), vec!["'Second'"]);
}

#[test]
fn preferences_round_trip_through_their_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("regina.toml");

    let store = PreferencesStore::new();
    store.batch(vec![
        Change::thread_count(ThreadCount::All),
        Change::link_homfly_type(HomflyType::LM),
        Change::tree_jump_size(3),
        Change::display_tags_in_tree(true),
        Change::python_spaces_per_tab(2),
        Change::file_import_export_codec("ISO-8859-1".into()),
    ]).unwrap();
    store.save_to(&path).unwrap();

    let fresh = PreferencesStore::new();
    fresh.load_from(&path).unwrap();
    assert_eq!(*fresh.get(), *store.get());

    /* rejected settings never reach the file */
    assert!(store.change(Change::tree_jump_size(0)).is_err());
    store.save_to(&path).unwrap();
    fresh.load_from(&path).unwrap();
    assert_eq!(fresh.get().tree_jump_size, 3);
}
