//! Computing polynomial invariants of links on request.

use crate::model::link::Link;
use crate::model::packet::{PacketKind, PacketRef};
use crate::model::polynomial::Invariant;
use crate::view::error::{Action, Error};
use crate::view::operation::triangulation::{engine_failure, packet_failure};
use crate::view::operation::{Done, OpContext};
use crate::view::runner::Outcome;

pub fn precheck(packet: &PacketRef, action: Action) -> Result<(), Error> {
    if packet.kind() != PacketKind::Link {
        return Err(Error::refused(action, "Please select a link to work with.", None));
    }
    Ok(())
}

/// Computes `invariant` on a worker and caches it on the link. A polynomial
/// that is already cached is left alone.
pub fn compute(cx: &OpContext, invariant: Invariant, packet: &PacketRef, action: Action) -> Result<Done, Error> {
    let Some(link) = packet.read::<Link, _>(Clone::clone) else {
        return Err(Error::refused(action, "Please select a link to work with.", None));
    };
    if link.polynomial(invariant).is_some() {
        return Ok(Done::nothing());
    }

    let engine = cx.engine.clone();
    let threads = cx.preferences().threads();
    let description = format!("Computing {} polynomial", invariant.name());
    let polynomial = match cx.runner().run(&description, move |tracker| engine.polynomial(&link, invariant, threads, Some(tracker))) {
        Outcome::Cancelled => return Ok(Done::nothing()),
        Outcome::Finished(result) => result.map_err(engine_failure(action))?,
    };

    packet.change::<Link, _>(|link| link.set_polynomial(invariant, polynomial)).map_err(packet_failure(action))?;
    Ok(Done::modified())
}
