//! Operations offered on triangulation packets.

use crate::engine::{EngineError, Move};
use crate::model::packet::{Packet, PacketKind, PacketRef, Payload};
use crate::model::triangulation::{Skeleton, Triangulation, VertexLink};
use crate::view::error::{Action, Error, Trouble};
use crate::view::operation::{derived_base, Done, Notice, OpContext, TriangulationOp};
use crate::view::runner::Outcome;

/// Height of the first exhaustive simplification search.
const EXHAUSTIVE_HEIGHT: usize = 2;

pub(super) fn engine_failure(action: Action) -> impl Fn(EngineError) -> Error {
    move |error| Error::new(action, Trouble::Engine(error))
}

pub(super) fn packet_failure(action: Action) -> impl Fn(crate::model::packet::PacketError) -> Error {
    move |error| Error::new(action, Trouble::Packet(error))
}

fn triangulation_of(packet: &PacketRef, action: Action) -> Result<Triangulation, Error> {
    packet.read::<Triangulation, _>(Clone::clone)
        .ok_or_else(|| Error::refused(action, "Please select a triangulation to work with.", None))
}

fn three_manifold(packet: &PacketRef, action: Action) -> Result<Triangulation, Error> {
    let tri = triangulation_of(packet, action)?;
    if tri.dim() != 3 {
        return Err(Error::refused(action, "This operation is only available for 3-manifold triangulations.", None));
    }
    Ok(tri)
}

fn empty(action: Action, detail: Option<&str>) -> Error {
    Error::refused(action, "This triangulation is empty.", detail)
}

pub fn precheck(cx: &OpContext, op: TriangulationOp, packet: &PacketRef, action: Action) -> Result<(), Error> {
    let tri = if op.any_dimension() { triangulation_of(packet, action)? } else { three_manifold(packet, action)? };
    let skeleton = cx.engine.skeleton(&tri).map_err(engine_failure(action))?;
    check(op, &tri, &skeleton, action)
}

fn check(op: TriangulationOp, tri: &Triangulation, skeleton: &Skeleton, action: Action) -> Result<(), Error> {
    match op {
        TriangulationOp::Simplify | TriangulationOp::MakeZeroEfficient if tri.is_empty() => Err(empty(action, None)),
        TriangulationOp::Orient if skeleton.oriented => {
            Err(Error::refused(action, "This triangulation is already oriented.", None))
        },
        TriangulationOp::Orient if skeleton.orientable_components == 0 => {
            Err(Error::refused(action, "This triangulation has no orientable components.", Some("Non-orientable components cannot be oriented.")))
        },
        TriangulationOp::IdealToFinite if skeleton.is_valid() && !skeleton.is_ideal() => {
            Err(Error::refused(action, "This triangulation has no ideal vertices.", Some("Only ideal vertices can be truncated.")))
        },
        TriangulationOp::FiniteToIdeal if !skeleton.has_boundary_facets() => {
            Err(Error::refused(action, "This triangulation has no real boundary components.",
                               Some("Only real boundary components will be converted into ideal vertices.")))
        },
        TriangulationOp::SplitIntoComponents if skeleton.component_count == 0 => Err(empty(action, Some("It has no components."))),
        TriangulationOp::SplitIntoComponents if skeleton.component_count == 1 => {
            Err(Error::refused(action, "This triangulation is connected.", Some("It has only one component.")))
        },
        TriangulationOp::ConnectedSumDecomposition if tri.is_empty() => Err(empty(action, Some("It has no prime summands."))),
        TriangulationOp::ConnectedSumDecomposition if !(skeleton.is_valid() && skeleton.is_closed() && skeleton.is_connected()) => {
            Err(Error::refused(action, "Connected sum decomposition is currently only available for closed, connected 3-manifold triangulations.", None))
        },
        TriangulationOp::MakeZeroEfficient if !(skeleton.is_valid() && skeleton.is_closed() && skeleton.orientable && skeleton.is_connected()) => {
            Err(Error::refused(action, "0-efficiency reduction is currently only available for closed orientable connected 3-manifold triangulations.", None))
        },
        TriangulationOp::ToSnapPea if tri.is_empty() ||
            skeleton.has_boundary_facets() ||
            !skeleton.is_valid() ||
            !skeleton.is_connected() ||
            skeleton.vertex_links.iter().any(|l| matches!(l, VertexLink::Disc | VertexLink::Other)) => {
            Err(Error::refused(action, "I could not create a SnapPea triangulation.",
                               Some("SnapPea can only work with triangulations that are (i) valid, non-empty and connected; \
                                     (ii) have no boundary triangles; and (iii) where every ideal vertex has a torus or Klein bottle link.")))
        },
        _ => Ok(()),
    }
}

/// Writes a modified triangulation back to its packet.
fn commit(packet: &PacketRef, tri: Triangulation, action: Action) -> Result<Done, Error> {
    packet.change::<Triangulation, _>(|stored| *stored = tri).map_err(packet_failure(action))?;
    Ok(Done::modified())
}

/// Simplifies if the engine knows how, after operations that tend to bloat
/// the triangulation.
fn tidy(cx: &OpContext, tri: &mut Triangulation) -> Result<(), EngineError> {
    match cx.engine.simplify(tri) {
        Ok(_) | Err(EngineError::Unsupported(_)) => Ok(()),
        Err(error) => Err(error),
    }
}

/// Inserts `tris` as children of `base`, labelled `"{prefix} #1"`,
/// `"{prefix} #2"`, ... Returns the first one inserted.
fn insert_numbered(base: &PacketRef, tris: Vec<Triangulation>, prefix: &str, action: Action) -> Result<Option<PacketRef>, Error> {
    let mut first = None;
    for (i, tri) in tris.into_iter().enumerate() {
        let child = Packet::new(format!("{} #{}", prefix, i + 1), Payload::Triangulation(tri));
        base.append(child.clone()).map_err(packet_failure(action))?;
        first.get_or_insert(child);
    }
    Ok(first)
}

pub fn execute(cx: &OpContext, op: TriangulationOp, packet: &PacketRef, action: Action) -> Result<Done, Error> {
    let mut tri = triangulation_of(packet, action)?;
    let failed = engine_failure(action);

    match op {
        TriangulationOp::Simplify => simplify(cx, packet, tri, action),
        TriangulationOp::Orient => {
            cx.engine.orient(&mut tri).map_err(failed)?;
            commit(packet, tri, action)
        },
        TriangulationOp::Reflect => {
            cx.engine.reflect(&mut tri).map_err(failed)?;
            commit(packet, tri, action)
        },
        TriangulationOp::Barycentric => {
            cx.engine.barycentric_subdivide(&mut tri).map_err(failed)?;
            commit(packet, tri, action)
        },
        TriangulationOp::IdealToFinite => {
            cx.engine.ideal_to_finite(&mut tri).map_err(&failed)?;
            tidy(cx, &mut tri).map_err(failed)?;
            commit(packet, tri, action)
        },
        TriangulationOp::FiniteToIdeal => {
            cx.engine.finite_to_ideal(&mut tri).map_err(&failed)?;
            tidy(cx, &mut tri).map_err(failed)?;
            commit(packet, tri, action)
        },
        TriangulationOp::DoubleCover => {
            let cover = cx.engine.double_cover(&tri).map_err(failed)?;
            commit(packet, cover, action)
        },
        TriangulationOp::SplitIntoComponents => {
            let components = cx.engine.split_into_components(&tri).map_err(failed)?;
            let count = components.len();
            let base = derived_base(packet, "Components").map_err(packet_failure(action))?;
            let first = insert_numbered(&base, components, "Component", action)?;
            let mut done = Done { modified: true, select: first, notices: Vec::new() };
            done.notices.push(Notice::info(format!("{} components were extracted.", count), None));
            Ok(done)
        },
        TriangulationOp::ConnectedSumWith => {
            let candidates: Vec<PacketRef> = cx.root.subtree().into_iter()
                .filter(|p| p.kind() == PacketKind::Triangulation3)
                .collect();
            let Some(other) = cx.interaction.choose_packet("Sum this with which other triangulation?", &candidates) else {
                return Ok(Done::nothing());
            };
            let other = triangulation_of(&other, action)?;
            cx.engine.connected_sum(&mut tri, &other).map_err(failed)?;
            commit(packet, tri, action)
        },
        TriangulationOp::ConnectedSumDecomposition => decompose(cx, packet, tri, action),
        TriangulationOp::MakeZeroEfficient => make_zero_efficient(cx, packet, tri, action),
        TriangulationOp::ToSnapPea => {
            let data = cx.engine.snappea_from_native(&tri).map_err(failed)?;
            let child = Packet::new(packet.label(), Payload::SnapPea(data));
            packet.append(child.clone()).map_err(packet_failure(action))?;
            Ok(Done::selecting(child).with_notice(Notice::info(
                "I have created a new SnapPea triangulation.",
                Some("The new SnapPea triangulation appears beneath this Regina triangulation in the packet tree."))))
        },
    }
}

fn simplify(cx: &OpContext, packet: &PacketRef, mut tri: Triangulation, action: Action) -> Result<Done, Error> {
    if cx.engine.simplify(&mut tri).map_err(engine_failure(action))? {
        return commit(packet, tri, action);
    }

    let skeleton = cx.engine.skeleton(&tri).map_err(engine_failure(action))?;
    if skeleton.component_count > 1 {
        return Ok(Done::nothing().with_notice(Notice::info(
            "I could not simplify the triangulation.",
            Some("I have only tried fast heuristics so far.\n\
                  For connected triangulations I can try a more exhaustive approach, \
                  but for multiple-component triangulations this is not yet available.\n\
                  To use this more exhaustive approach, you could split the triangulation into components \
                  and try to simplify each component independently."))));
    }
    if !cx.interaction.confirm("I could not simplify the triangulation.", Some("I have only tried fast heuristics so far. Try harder?")) {
        return Ok(Done::nothing());
    }

    let threads = cx.preferences().threads();
    let mut height = EXHAUSTIVE_HEIGHT;
    loop {
        let engine = cx.engine.clone();
        let mut working = tri.clone();
        let outcome = cx.runner().run("Searching Pachner graph...", move |tracker| {
            let changed = engine.simplify_exhaustive(&mut working, height, threads, tracker)?;
            Ok((changed, working))
        });
        match outcome {
            Outcome::Cancelled => return Ok(Done::nothing()),
            Outcome::Finished(result) => {
                let (changed, simplified) = result.map_err(engine_failure(action))?;
                if changed {
                    return commit(packet, simplified, action);
                }
            },
        }

        let detail = format!("I have exhaustively searched the Pachner graph up to {} tetrahedra.\n\
                              I can look further, but be warned: the time and memory required could grow very rapidly. \
                              Keep trying?", tri.size() + height);
        if !cx.interaction.confirm("I still could not simplify the triangulation.", Some(&detail)) {
            return Ok(Done::nothing());
        }
        height+= 1;
    }
}

/// Runs the connected sum decomposition on a worker. None means the user
/// cancelled.
fn summands(cx: &OpContext, tri: &Triangulation, action: Action) -> Result<Option<Vec<Triangulation>>, Error> {
    let engine = cx.engine.clone();
    let tri = tri.clone();
    match cx.runner().run("Connected sum decomposition", move |tracker| engine.summands(&tri, tracker)) {
        Outcome::Cancelled => Ok(None),
        Outcome::Finished(result) => result.map(Some).map_err(engine_failure(action)),
    }
}

fn decompose(cx: &OpContext, packet: &PacketRef, tri: Triangulation, action: Action) -> Result<Done, Error> {
    let Some(summands) = summands(cx, &tri, action)? else {
        return Ok(Done::nothing());
    };
    if summands.is_empty() {
        return Ok(Done::nothing().with_notice(Notice::info("This is the 3-sphere.", Some("It has no prime summands."))));
    }

    let count = summands.len();
    let base = derived_base(packet, "Summands").map_err(packet_failure(action))?;
    let first = insert_numbered(&base, summands, "Summand", action)?;
    let notice = if count == 1 {
        Notice::info("This is a prime 3-manifold.",
                     Some("I cannot decompose it further. However, I have constructed a new 0-efficient triangulation."))
    } else {
        Notice::info(format!("This manifold decomposes into {} prime summands.", count), None)
    };
    Ok(Done { modified: true, select: first, notices: vec![notice] })
}

fn make_zero_efficient(cx: &OpContext, packet: &PacketRef, mut tri: Triangulation, action: Action) -> Result<Done, Error> {
    let Some(summands) = summands(cx, &tri, action)? else {
        return Ok(Done::nothing());
    };

    if summands.len() > 1 {
        let decomposition = Packet::container(packet.adorned_label("Decomposition"));
        let first = insert_numbered(&decomposition, summands, "Summand", action)?;
        packet.append(decomposition).map_err(packet_failure(action))?;
        return Ok(Done { modified: true, select: first, notices: vec![Notice::info(
            "This triangulation represents a composite 3-manifold.",
            Some("This means it can never be made 0-efficient. \
                  I have performed a connected sum decomposition into prime summands (without modifying this triangulation)."))] });
    }

    if summands.is_empty() && tri.size() == 1 {
        return Ok(Done::nothing().with_notice(Notice::info(
            "This 3-sphere triangulation is already 0-efficient.", Some("No changes are necessary."))));
    }

    if cx.engine.make_zero_efficient(&mut tri).map_err(engine_failure(action))? {
        commit(packet, tri, action)
    } else {
        Ok(Done::nothing().with_notice(Notice::info("This triangulation is already 0-efficient.", Some("No changes are necessary."))))
    }
}

pub fn precheck_move(cx: &OpContext, mv: Move, element: usize, packet: &PacketRef, action: Action) -> Result<(), Error> {
    let tri = three_manifold(packet, action)?;
    let skeleton = cx.engine.skeleton(&tri).map_err(engine_failure(action))?;
    if element >= mv.element_count(&tri, &skeleton) {
        return Err(Error::invalid(action, format!("There is no {} number {}.", element_noun(mv), element), None));
    }
    if !cx.engine.move_legal(&tri, mv, element).map_err(engine_failure(action))? {
        return Err(Error::refused(action,
                                  format!("The {} move cannot be performed about {} {}.", mv.name(), element_noun(mv), element),
                                  None));
    }
    Ok(())
}

fn element_noun(mv: Move) -> &'static str {
    match mv.element() {
        crate::engine::MoveElement::Vertex => "vertex",
        crate::engine::MoveElement::Edge => "edge",
        crate::engine::MoveElement::Triangle => "triangle",
        crate::engine::MoveElement::Tetrahedron => "tetrahedron",
    }
}

pub fn elementary_move(cx: &OpContext, mv: Move, element: usize, packet: &PacketRef, action: Action) -> Result<Done, Error> {
    let mut tri = three_manifold(packet, action)?;
    cx.engine.apply_move(&mut tri, mv, element).map_err(engine_failure(action))?;
    commit(packet, tri, action)
}

/// The moves worth listing in the elementary move dialog, each with the
/// elements it can legally be performed about. Called again whenever the
/// triangulation changes.
pub fn move_candidates(cx: &OpContext, packet: &PacketRef) -> Vec<(Move, Vec<usize>)> {
    let Some(tri) = packet.read::<Triangulation, _>(Clone::clone) else { return Vec::new() };
    let Ok(skeleton) = cx.engine.skeleton(&tri) else { return Vec::new() };
    Move::ALL.iter()
        .filter_map(|&mv| match cx.engine.move_candidates(&tri, &skeleton, mv) {
            Ok(elements) if !elements.is_empty() => Some((mv, elements)),
            _ => None,
        })
        .collect()
}
