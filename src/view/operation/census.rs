//! Looking a 3-manifold triangulation up in the configured census files.

use std::path::{Path, PathBuf};

use crate::engine::{Engine, EngineError};
use crate::model::packet::{Packet, PacketKind, PacketRef, Payload};
use crate::model::preferences::CensusFile;
use crate::model::progress::ProgressTracker;
use crate::model::triangulation::Triangulation;
use crate::view::error::{Action, Error};
use crate::view::operation::triangulation::{engine_failure, packet_failure};
use crate::view::operation::{Done, Notice, OpContext};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CensusHit {
    pub name: String,
    pub census: String,
}

#[derive(Debug, Default)]
struct Search {
    hits: Vec<CensusHit>,
    searched: Vec<String>,
    unreadable: Vec<PathBuf>,
    /// The user stopped the search before every file was searched.
    cancelled: bool,
}

fn short_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| path.display().to_string())
}

pub fn precheck(packet: &PacketRef, action: Action) -> Result<(), Error> {
    if packet.kind() != PacketKind::Triangulation3 {
        return Err(Error::refused(action, "Census lookup is only available for 3-manifold triangulations.", None));
    }
    Ok(())
}

pub fn lookup(cx: &OpContext, packet: &PacketRef, action: Action) -> Result<Done, Error> {
    let Some(tri) = packet.read::<Triangulation, _>(Clone::clone) else {
        return Err(Error::refused(action, "Please select a triangulation to work with.", None));
    };

    let files: Vec<CensusFile> = cx.preferences().census_files.iter().filter(|f| f.active).cloned().collect();
    if files.is_empty() {
        return Ok(Done::nothing().with_notice(Notice::info(
            "I have no census files to search through.",
            Some("This is probably because you deactivated Regina's standard censuses at some time in the past. \
                  You can reactivate them through Regina's census settings."))));
    }

    let engine = cx.engine.clone();
    let found = cx.runner()
        .run_to_end("Census lookup", move |tracker| search(engine.as_ref(), &tri, files, tracker))
        .map_err(engine_failure(action))?;
    report(cx, packet, action, found)
}

/// Searches each file in turn. Files that cannot be read are noted and
/// skipped. On cancellation the search stops after the file in hand and
/// returns what it has.
fn search(engine: &dyn Engine, tri: &Triangulation, files: Vec<CensusFile>, tracker: &ProgressTracker) -> Result<Search, EngineError> {
    let mut search = Search::default();
    let weight = 1.0 / files.len().max(1) as f64;
    for file in files {
        tracker.new_stage(format!("Searching: {}", short_name(&file.filename)), weight);

        match engine.open(&file.filename) {
            Ok(census) => {
                let candidates = census.subtree();
                let count = candidates.len().max(1) as f64;
                for (i, candidate) in candidates.into_iter().enumerate() {
                    if tracker.is_cancelled() {
                        break;
                    }
                    if candidate.kind() == PacketKind::Triangulation3 {
                        let matched = candidate.read::<Triangulation, _>(|other| engine.is_isomorphic(tri, other));
                        if let Some(true) = matched.transpose()? {
                            search.hits.push(CensusHit { name: candidate.label(), census: short_name(&file.filename) });
                        }
                    }
                    tracker.set_stage_fraction((i + 1) as f64 / count);
                }
                if !tracker.is_cancelled() {
                    search.searched.push(short_name(&file.filename));
                }
            },
            Err(error) => {
                tracing::warn!(census = %file.filename.display(), %error, "could not read census file");
                search.unreadable.push(file.filename);
            },
        }

        if tracker.is_cancelled() {
            search.cancelled = true;
            break;
        }
    }
    Ok(search)
}

fn report(cx: &OpContext, packet: &PacketRef, action: Action, search: Search) -> Result<Done, Error> {
    let mut done = Done::nothing();

    if !search.unreadable.is_empty() {
        if let Err(error) = cx.prefs.deactivate_census(&search.unreadable) {
            tracing::warn!(%error, "could not record disabled census files");
        }
        for path in &search.unreadable {
            done.notices.push(Notice::sorry(
                format!("I could not read the census data file {}.", path.display()),
                Some("I have disabled this file in Regina's census settings. You can re-enable it once the problem is fixed.")));
        }
    }

    if search.cancelled {
        return Ok(done.with_notice(Notice::info("The census lookup was cancelled.", None)));
    }

    let mut searched = String::from("The following censuses were searched:\n");
    for name in &search.searched {
        searched.push('\n');
        searched.push_str(name);
    }

    if search.hits.is_empty() {
        let detail = format!("You can add more censuses to this search through Regina's census settings.\n\n{}", searched);
        return Ok(done.with_notice(Notice::info("The triangulation was not located in any census files.", Some(&detail))));
    }

    let described: Vec<String> = search.hits.iter()
        .map(|hit| format!("Name: {}\nCensus: {}", hit.name, hit.census))
        .collect();
    let described = described.join("\n\n");

    let record = Packet::new(format!("ID: {}", packet.label()),
                             Payload::Text(format!("Identified by census lookup:\n\n{}", described)));
    packet.append(record.clone()).map_err(packet_failure(action))?;

    done.modified = true;
    done.select = Some(record);
    Ok(done.with_notice(Notice::info("The triangulation was identified:", Some(&format!("{}\n\n{}", described, searched)))))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync;

    use pretty_assertions::assert_eq;

    use crate::engine::basic::BasicEngine;
    use crate::engine::SharedEngine;
    use crate::model::perm::Perm;
    use crate::model::preferences::{Change, PreferencesStore};
    use crate::view::interaction::{MessageKind, Unattended};
    use crate::view::operation::Operation;

    fn doubled_tet() -> Triangulation {
        let gluings: Vec<_> = (0..4).map(|f| (0, f, 1, Perm::identity(4))).collect();
        Triangulation::from_gluings(3, 2, &gluings).unwrap()
    }

    fn census_file(path: &Path, active: bool) -> CensusFile {
        CensusFile { filename: path.to_path_buf(), description: "Test census".into(), active }
    }

    fn run(engine: &SharedEngine, prefs: &PreferencesStore, packet: &PacketRef) -> Result<Done, Error> {
        let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap();
        let root = packet.parent().unwrap();
        let cx = OpContext { engine, prefs, interaction: &Unattended, runtime: rt.handle().clone(), root: &root };
        Operation::CensusLookup.execute(&cx, Some(packet))
    }

    #[test]
    fn hits_are_recorded_beneath_the_triangulation() {
        let dir = tempfile::tempdir().unwrap();
        let engine: SharedEngine = sync::Arc::new(BasicEngine);

        let census = Packet::container("Closed census");
        census.append(Packet::new("Ball", Payload::Triangulation(Triangulation::from_gluings(3, 1, &[]).unwrap()))).unwrap();
        census.append(Packet::new("S3 : #1", Payload::Triangulation(doubled_tet()))).unwrap();
        let path = dir.path().join("closed.rga");
        engine.save(&census, &path).unwrap();

        let prefs = PreferencesStore::new();
        prefs.change(Change::census_files(vec![census_file(&path, true), census_file(&dir.path().join("inactive.rga"), false)])).unwrap();

        let root = Packet::container("");
        let tri = Packet::new("Mystery", Payload::Triangulation(doubled_tet()));
        root.append(tri.clone()).unwrap();

        let done = run(&engine, &prefs, &tri).unwrap();
        assert!(done.modified);
        assert_eq!(done.notices.len(), 1);
        assert_eq!(done.notices[0].text, "The triangulation was identified:");

        let record = tri.first_child().unwrap();
        assert_eq!(record.label(), "ID: Mystery");
        assert_eq!(record.read::<String, _>(Clone::clone).as_deref(),
                   Some("Identified by census lookup:\n\nName: S3 : #1\nCensus: closed.rga"));
    }

    #[test]
    fn unreadable_files_are_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let engine: SharedEngine = sync::Arc::new(BasicEngine);
        let missing = dir.path().join("missing.rga");

        let prefs = PreferencesStore::new();
        prefs.change(Change::census_files(vec![census_file(&missing, true)])).unwrap();

        let root = Packet::container("");
        let tri = Packet::new("Mystery", Payload::Triangulation(doubled_tet()));
        root.append(tri.clone()).unwrap();

        let done = run(&engine, &prefs, &tri).unwrap();
        assert!(!done.modified);
        assert_eq!(done.notices[0].kind, MessageKind::Sorry);
        assert_eq!(done.notices[1].text, "The triangulation was not located in any census files.");
        assert_eq!(prefs.get().census_files, vec![census_file(&missing, false)]);

        /* nothing active is left to search */
        let done = run(&engine, &prefs, &tri).unwrap();
        assert_eq!(done.notices[0].text, "I have no census files to search through.");
    }

    #[test]
    fn cancelling_still_disables_unreadable_files() {
        let dir = tempfile::tempdir().unwrap();
        let engine: SharedEngine = sync::Arc::new(BasicEngine);
        let missing = dir.path().join("missing.rga");
        let census = Packet::container("Census");
        census.append(Packet::new("S3 : #1", Payload::Triangulation(doubled_tet()))).unwrap();
        let good = dir.path().join("good.rga");
        engine.save(&census, &good).unwrap();

        let prefs = PreferencesStore::new();
        prefs.change(Change::census_files(vec![census_file(&missing, true), census_file(&good, true)])).unwrap();

        /* the user has already asked to stop: the first file is still seen through */
        let tracker = ProgressTracker::new();
        tracker.cancel();
        let found = search(engine.as_ref(), &doubled_tet(), prefs.get().census_files.clone(), &tracker).unwrap();
        assert!(found.cancelled);
        assert_eq!(found.unreadable, vec![missing.clone()]);
        assert!(found.searched.is_empty());

        let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap();
        let root = Packet::container("");
        let tri = Packet::new("Mystery", Payload::Triangulation(doubled_tet()));
        root.append(tri.clone()).unwrap();
        let cx = OpContext { engine: &engine, prefs: &prefs, interaction: &Unattended, runtime: rt.handle().clone(), root: &root };
        let done = report(&cx, &tri, Action::CensusLookup, found).unwrap();

        assert!(!done.modified);
        assert_eq!(done.notices.len(), 2);
        assert_eq!(done.notices[0].kind, MessageKind::Sorry);
        assert_eq!(done.notices[1].text, "The census lookup was cancelled.");
        assert_eq!(prefs.get().census_files, vec![census_file(&missing, false), census_file(&good, true)]);
        assert!(tri.first_child().is_none());
    }

    #[test]
    fn only_3_manifolds_are_looked_up() {
        let root = Packet::container("");
        let tri = Packet::new("Disc", Payload::Triangulation(Triangulation::new(2)));
        root.append(tri.clone()).unwrap();
        assert!(precheck(&tri, Action::CensusLookup).is_err());
    }
}
