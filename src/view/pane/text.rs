use crate::model::packet::PacketRef;
use crate::view::error::{Action, Error, Trouble};
use crate::view::pane::{EditFacet, PacketUi, PaneContext};

#[derive(Debug, Default)]
pub struct TextUi {
    text: String,
}

impl TextUi {
    pub fn new(packet: &PacketRef, cx: &PaneContext) -> TextUi {
        let mut ui = TextUi::default();
        ui.refresh(packet, cx);
        ui
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Commits the edited text. Unchanged text fires no events.
    pub fn set_text(&mut self, packet: &PacketRef, text: &str) -> Result<(), Error> {
        if text == self.text {
            return Ok(());
        }
        packet.change::<String, _>(|stored| *stored = text.to_string())
            .map_err(|e| Error::new(Action::EditPacket, Trouble::Packet(e)))?;
        self.text = text.to_string();
        Ok(())
    }
}

impl PacketUi for TextUi {
    fn refresh(&mut self, packet: &PacketRef, _cx: &PaneContext) {
        if let Some(text) = packet.read::<String, _>(Clone::clone) {
            self.text = text;
        }
    }

    fn render(&self, _tab: usize) -> String {
        self.text.clone()
    }

    fn edit_facet(&self, _tab: usize) -> EditFacet {
        EditFacet { can_cut: true, can_copy: true, can_paste: true }
    }

    fn copy_text(&self, _tab: usize) -> Option<String> {
        Some(self.text.clone())
    }
}
