//! Rearranging the packet tree: cloning, renaming, deleting and moving.

use crate::model::packet::PacketRef;
use crate::view::error::{Action, Error};
use crate::view::operation::{Done, Motion, OpContext};

pub fn precheck(_packet: &PacketRef, _action: Action) -> Result<(), Error> {
    /* any packet but the hidden root will do, and that was checked already */
    Ok(())
}

/// Clones the packet (and its descendants, if `subtree`) immediately after
/// itself and selects the clone.
pub fn clone(packet: &PacketRef, subtree: bool, action: Action) -> Result<Done, Error> {
    match packet.clone_as_sibling(subtree, true) {
        Some(copy) => Ok(Done::selecting(copy)),
        None => Err(Error::refused(action, "Please select a packet to work with.", None)),
    }
}

pub fn rename(cx: &OpContext, packet: &PacketRef) -> Result<Done, Error> {
    let Some(label) = cx.interaction.ask_text("New label:", &packet.label()) else {
        return Ok(Done::nothing());
    };
    let label = label.trim();
    if label == packet.label() {
        return Ok(Done::nothing());
    }
    packet.set_label(label);
    Ok(Done::modified())
}

pub fn delete(cx: &OpContext, packet: &PacketRef) -> Result<Done, Error> {
    let question = if packet.has_children() {
        format!("You are about to delete the packet {} and all of its children.", packet.human_label())
    } else {
        format!("You are about to delete the packet {}.", packet.human_label())
    };
    if !cx.interaction.confirm(&question, Some("Are you sure?")) {
        return Ok(Done::nothing());
    }
    packet.make_orphan();
    Ok(Done::modified())
}

/// Moves the packet among its siblings. Moving past either end stops at the
/// end; a packet already there stays put and the document is untouched.
pub fn motion(cx: &OpContext, packet: &PacketRef, motion: Motion) -> Result<Done, Error> {
    let before = packet.index_in_parent();
    let jump = cx.preferences().tree_jump_size as usize;
    match motion {
        Motion::Up => packet.move_up(1),
        Motion::Down => packet.move_down(1),
        Motion::JumpUp => packet.move_up(jump),
        Motion::JumpDown => packet.move_down(jump),
        Motion::First => packet.move_to_first(),
        Motion::Last => packet.move_to_last(),
    }
    if packet.index_in_parent() == before {
        Ok(Done::nothing())
    } else {
        Ok(Done::selecting(packet.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::sync;

    use pretty_assertions::assert_eq;

    use crate::engine::basic::BasicEngine;
    use crate::engine::SharedEngine;
    use crate::model::packet::{Packet, Payload};
    use crate::model::preferences::{Change, PreferencesStore};
    use crate::model::triangulation::Triangulation;
    use crate::view::interaction::{CloseChoice, Interaction, MessageKind};
    use crate::view::operation::Operation;

    struct Answers {
        text: Option<String>,
        confirm: bool,
        asked: RefCell<Vec<String>>,
    }

    impl Interaction for Answers {
        fn message(&self, _: MessageKind, _: &str, _: Option<&str>) {}
        fn confirm(&self, text: &str, _: Option<&str>) -> bool {
            self.asked.borrow_mut().push(text.to_string());
            self.confirm
        }
        fn ask_close(&self, _: &str) -> CloseChoice { CloseChoice::Cancel }
        fn ask_text(&self, _: &str, _: &str) -> Option<String> { self.text.clone() }
        fn choose_packet(&self, _: &str, _: &[PacketRef]) -> Option<PacketRef> { None }
        fn choose_path(&self, _: &str, _: &str, _: bool) -> Option<PathBuf> { None }
        fn progress(&self, _: &str, _: Option<f64>) -> bool { true }
    }

    struct Fixture {
        rt: tokio::runtime::Runtime,
        engine: SharedEngine,
        prefs: PreferencesStore,
        root: PacketRef,
    }

    impl Fixture {
        fn new(labels: &[&str]) -> Fixture {
            let root = Packet::container("");
            for label in labels {
                root.append(Packet::new(*label, Payload::Text(String::new()))).unwrap();
            }
            Fixture {
                rt: tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap(),
                engine: sync::Arc::new(BasicEngine),
                prefs: PreferencesStore::new(),
                root,
            }
        }

        fn run(&self, op: Operation, packet: &PacketRef, answers: &Answers) -> Result<Done, Error> {
            let cx = OpContext {
                engine: &self.engine,
                prefs: &self.prefs,
                interaction: answers,
                runtime: self.rt.handle().clone(),
                root: &self.root,
            };
            op.execute(&cx, Some(packet))
        }

        fn labels(&self) -> Vec<String> {
            self.root.children().iter().map(|p| p.label()).collect()
        }
    }

    fn answers(text: Option<&str>, confirm: bool) -> Answers {
        Answers { text: text.map(str::to_string), confirm, asked: RefCell::new(Vec::new()) }
    }

    #[test]
    fn clones_land_after_the_original() {
        let fx = Fixture::new(&["B"]);
        let a = Packet::new("A", Payload::Triangulation(Triangulation::new(3)));
        a.append(Packet::new("Notes", Payload::Text("x".into()))).unwrap();
        fx.root.prepend(a.clone()).unwrap();

        let done = fx.run(Operation::Clone { subtree: false }, &a, &answers(None, true)).unwrap();
        assert_eq!(fx.labels(), ["A", "A (Clone)", "B"]);
        let copy = done.select.unwrap();
        assert_eq!(copy.label(), "A (Clone)");
        assert!(!copy.has_children());

        let done = fx.run(Operation::Clone { subtree: true }, &a, &answers(None, true)).unwrap();
        assert_eq!(done.select.unwrap().count_children(), 1);
    }

    #[test]
    fn renames_trim_and_skip_no_ops() {
        let fx = Fixture::new(&["A"]);
        let a = fx.root.first_child().unwrap();
        assert!(fx.run(Operation::Rename, &a, &answers(Some("  Census  "), true)).unwrap().modified);
        assert_eq!(a.label(), "Census");
        assert!(!fx.run(Operation::Rename, &a, &answers(Some("Census"), true)).unwrap().modified);
        assert!(!fx.run(Operation::Rename, &a, &answers(None, true)).unwrap().modified);
    }

    #[test]
    fn deletion_asks_first() {
        let fx = Fixture::new(&["A", "B"]);
        let a = fx.root.first_child().unwrap();
        a.append(Packet::container("Child")).unwrap();

        let declined = answers(None, false);
        assert!(!fx.run(Operation::Delete, &a, &declined).unwrap().modified);
        assert_eq!(declined.asked.borrow()[0], "You are about to delete the packet A and all of its children.");
        assert_eq!(fx.labels(), ["A", "B"]);

        assert!(fx.run(Operation::Delete, &a, &answers(None, true)).unwrap().modified);
        assert_eq!(fx.labels(), ["B"]);
    }

    #[test]
    fn jumps_use_the_configured_size() {
        let fx = Fixture::new(&["A", "B", "C", "D", "E"]);
        fx.prefs.change(Change::tree_jump_size(2)).unwrap();
        let e = fx.root.last_child().unwrap();

        fx.run(Operation::Move(Motion::JumpUp), &e, &answers(None, true)).unwrap();
        assert_eq!(fx.labels(), ["A", "B", "E", "C", "D"]);
        fx.run(Operation::Move(Motion::First), &e, &answers(None, true)).unwrap();
        assert_eq!(fx.labels(), ["E", "A", "B", "C", "D"]);
        assert!(!fx.run(Operation::Move(Motion::Up), &e, &answers(None, true)).unwrap().modified);
        fx.run(Operation::Move(Motion::JumpDown), &e, &answers(None, true)).unwrap();
        fx.run(Operation::Move(Motion::Down), &e, &answers(None, true)).unwrap();
        assert_eq!(fx.labels(), ["A", "B", "C", "E", "D"]);
        fx.run(Operation::Move(Motion::Last), &e, &answers(None, true)).unwrap();
        assert_eq!(fx.labels(), ["A", "B", "C", "D", "E"]);
    }
}
