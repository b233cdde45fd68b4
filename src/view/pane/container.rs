use crate::model::packet::PacketRef;
use crate::view::pane::{PacketUi, PaneContext};

#[derive(Debug, Default)]
pub struct ContainerUi {
    children: usize,
    descendants: usize,
}

impl ContainerUi {
    pub fn new(packet: &PacketRef, cx: &PaneContext) -> ContainerUi {
        let mut ui = ContainerUi::default();
        ui.refresh(packet, cx);
        ui
    }
}

impl PacketUi for ContainerUi {
    fn refresh(&mut self, packet: &PacketRef, _cx: &PaneContext) {
        self.children = packet.count_children();
        self.descendants = packet.total_tree_size() - 1;
    }

    fn render(&self, _tab: usize) -> String {
        format!("Packets (immediate children): {}\nPackets (total descendants): {}", self.children, self.descendants)
    }
}
