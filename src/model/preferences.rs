//! Process-wide user preferences.
//!
//! The settings live in a versioned [Preferences] object hosted by the
//! [PreferencesStore]. Every committed change bumps the generation (waking any
//! async waiters) and is then announced once to synchronous listeners. The
//! recent-files list is kept beside the versioned settings because it has its
//! own finer-grained notifications.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync;

use lazy_static::lazy_static;
use parking_lot::Mutex;
use serde_derive::{Deserialize, Serialize};

use crate::model::codec::TextCodec;
use crate::model::surfaces::{HyperCoords, ListFlags, NormalCoords};
use crate::model::versioned;
use crate::model::versioned::Versioned;

#[derive(Debug)]
pub enum PreferenceError {
    Validation { key: &'static str, message: &'static str },
    Io { path: PathBuf, error: io::Error },
    Format { path: PathBuf, message: String },
    NoConfigDirectory(String),
}

impl fmt::Display for PreferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreferenceError::Validation { key, message } => write!(f, "{}: {}", key, message),
            PreferenceError::Io { path, error } => write!(f, "{}: {}", path.display(), error),
            PreferenceError::Format { path, message } => write!(f, "{}: {}", path.display(), message),
            PreferenceError::NoConfigDirectory(message) => write!(f, "could not locate a configuration directory: {}", message),
        }
    }
}

impl std::error::Error for PreferenceError {}

/// A value that can be stored in the preferences file.
pub trait PreferenceValue: Sized + Clone + PartialEq + fmt::Debug {
    fn to_toml(&self) -> toml::Value;
    fn from_toml(value: &toml::Value) -> Option<Self>;
}

impl PreferenceValue for bool {
    fn to_toml(&self) -> toml::Value {
        toml::Value::Boolean(*self)
    }

    fn from_toml(value: &toml::Value) -> Option<Self> {
        value.as_bool()
    }
}

impl PreferenceValue for u32 {
    fn to_toml(&self) -> toml::Value {
        toml::Value::Integer(i64::from(*self))
    }

    fn from_toml(value: &toml::Value) -> Option<Self> {
        value.as_integer().and_then(|i| u32::try_from(i).ok())
    }
}

impl PreferenceValue for String {
    fn to_toml(&self) -> toml::Value {
        toml::Value::String(self.clone())
    }

    fn from_toml(value: &toml::Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

/// Window sizes; unset until a window has been closed once.
impl PreferenceValue for Option<(u32, u32)> {
    fn to_toml(&self) -> toml::Value {
        match self {
            Some((w, h)) => toml::Value::Array(vec![w.to_toml(), h.to_toml()]),
            None => toml::Value::Array(Vec::new()),
        }
    }

    fn from_toml(value: &toml::Value) -> Option<Self> {
        match value.as_array()?.as_slice() {
            [] => Some(None),
            [w, h] => Some(Some((u32::from_toml(w)?, u32::from_toml(h)?))),
            _ => None,
        }
    }
}

impl PreferenceValue for ListFlags {
    fn to_toml(&self) -> toml::Value {
        toml::Value::Integer(i64::from(self.bits()))
    }

    fn from_toml(value: &toml::Value) -> Option<Self> {
        u32::from_toml(value).and_then(ListFlags::from_bits)
    }
}

impl PreferenceValue for NormalCoords {
    fn to_toml(&self) -> toml::Value {
        toml::Value::String(self.key().to_string())
    }

    fn from_toml(value: &toml::Value) -> Option<Self> {
        value.as_str().and_then(NormalCoords::from_key)
    }
}

impl PreferenceValue for HyperCoords {
    fn to_toml(&self) -> toml::Value {
        toml::Value::String(self.key().to_string())
    }

    fn from_toml(value: &toml::Value) -> Option<Self> {
        value.as_str().and_then(HyperCoords::from_key)
    }
}

/// One census data file consulted by census lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CensusFile {
    pub filename: PathBuf,
    pub description: String,
    pub active: bool,
}

impl PreferenceValue for Vec<CensusFile> {
    fn to_toml(&self) -> toml::Value {
        toml::Value::try_from(self).unwrap_or_else(|_| toml::Value::Array(Vec::new()))
    }

    fn from_toml(value: &toml::Value) -> Option<Self> {
        value.clone().try_into().ok()
    }
}

/// Declares a preference that is stored as one of a fixed set of strings.
macro_rules! preference_enum {
    ($name:ident { $($variant:ident = $text:literal),+ $(,)? }) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn parse(text: &str) -> Option<$name> {
                match text {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl PreferenceValue for $name {
            fn to_toml(&self) -> toml::Value {
                toml::Value::String(self.as_str().to_string())
            }

            fn from_toml(value: &toml::Value) -> Option<Self> {
                value.as_str().and_then($name::parse)
            }
        }
    };
}

preference_enum!(ThreadCount { Single = "Single", Polite = "Polite", All = "All" });
preference_enum!(GroupSimplification { Regina = "Regina", Gap = "GAP" });
preference_enum!(LinkCode {
    Gauss = "Gauss",
    DowkerThistlethwaite = "DowkerThistlethwaite",
    KnotSig = "KnotSig",
    PlanarDiagram = "PlanarDiagram",
    Jenkins = "Jenkins",
});
preference_enum!(CrossingsStyle { Pictorial = "Pictorial", Text = "Text" });
preference_enum!(HomflyType { AZ = "AZ", LM = "LM" });
preference_enum!(LinkGraph { TreeDecomposition = "Tree", NiceTreeDecomposition = "NiceTree" });
preference_enum!(TriGraph { DualGraph = "Dual", TreeDecomposition = "Tree", NiceTreeDecomposition = "NiceTree" });
preference_enum!(SurfacesCompat { Local = "Local", Global = "Global" });

pub trait ItemVisitor<ItemType> {
    fn visit(&mut self, acc: Accessor<ItemType>);
}

pub struct Accessor<ItemType> {
    pub group: &'static str,
    pub key: &'static str,
    pub reader: fn(&Preferences) -> &ItemType,
    pub changer: fn(ItemType) -> Change,
}

macro_rules! declare_preferences {
    [ $typename:ident {
        $([$group:literal, $key:literal] $name:ident : $type:ty = $default:expr $(=> $check:path)?),* $(,)?
    } ] => {
        #[derive(Clone, Debug)]
        pub struct $typename {
            $(
                pub $name: $type,
            )*

            version: versioned::Version<$typename>,
        }

        impl Default for $typename {
            fn default() -> Self {
                Self {
                    $(
                        $name: $default,
                    )*

                    version: Default::default(),
                }
            }
        }

        /* versions are bookkeeping, not settings */
        impl PartialEq for $typename {
            fn eq(&self, other: &Self) -> bool {
                true $(&& self.$name == other.$name)*
            }
        }

        impl $typename {
            pub fn visit_all<Visitor>(visitor: &mut Visitor) where $(Visitor: ItemVisitor<$type>,)* {
                $(
                    ItemVisitor::<$type>::visit(visitor, Accessor::<$type> {
                        group: $group,
                        key: $key,
                        reader: |prefs| &prefs.$name,
                        changer: Change::$name,
                    });
                )*
            }
        }

        #[allow(non_camel_case_types)]
        #[derive(Debug, Clone)]
        pub enum Change {
            $(
                $name($type),
            )*
            Batch(Vec<Change>),
        }

        impl versioned::Versioned for $typename {
            type Change = Change;

            fn version(&self) -> &versioned::Version<$typename> {
                &self.version
            }

            fn version_mut(&mut self) -> &mut versioned::Version<$typename> {
                &mut self.version
            }
        }

        impl versioned::Change<$typename> for Change {
            type ApplyError = PreferenceError;
            type ApplyRecord = Self;

            fn apply(self, object: &mut $typename) -> Result<(Self, Self::ApplyRecord), Self::ApplyError> {
                match self {
                    $(
                        Change::$name(value) => {
                            $(
                                let value = $check(value).map_err(|message| PreferenceError::Validation {
                                    key: concat!($group, ".", $key),
                                    message,
                                })?;
                            )?
                            object.$name = value.clone();
                            Ok((Change::$name(value.clone()), Change::$name(value)))
                        },
                    )*
                    Change::Batch(changes) => {
                        let mut applied = Vec::with_capacity(changes.len());
                        for change in changes {
                            let (change, _) = versioned::Change::apply(change, object)?;
                            applied.push(change);
                        }
                        Ok((Change::Batch(applied.clone()), Change::Batch(applied)))
                    },
                }
            }
        }
    };
}

fn positive(value: u32) -> Result<u32, &'static str> {
    if value == 0 {
        Err("must be a positive integer")
    } else {
        Ok(value)
    }
}

fn trimmed(value: String) -> Result<String, &'static str> {
    Ok(value.trim().to_string())
}

fn codec_name(value: String) -> Result<String, &'static str> {
    let value = value.trim();
    if value.is_empty() {
        Err("a text encoding must be named")
    } else {
        Ok(value.to_string())
    }
}

fn enumerable(value: NormalCoords) -> Result<NormalCoords, &'static str> {
    if value.is_enumerable() {
        Ok(value)
    } else {
        Err("surfaces cannot be enumerated in this coordinate system")
    }
}

declare_preferences![Preferences {
    ["Angles", "CreationTaut"] angles_creation_taut: bool = false,

    ["Compute", "ThreadCount"] thread_count: ThreadCount = ThreadCount::Polite,

    ["Display", "DisplayTagsInTree"] display_tags_in_tree: bool = false,
    ["Display", "DisplayUnicode"] display_unicode: bool = true,
    ["Display", "SimpleToolbars"] display_simple_toolbars: bool = false,

    ["File", "RecentMax"] file_recent_max: u32 = 10, /* 0 means unlimited */
    ["File", "ImportExportCodec"] file_import_export_codec: String = "UTF-8".to_string() => codec_name,

    ["Groups", "Simplification"] group_simplification: GroupSimplification = GroupSimplification::Regina,

    ["Help", "IntroOnStartup"] help_intro_on_startup: bool = true,

    ["Hypersurfaces", "CreationCoordinates"] hypersurfaces_creation_coords: HyperCoords = HyperCoords::Standard,
    ["Hypersurfaces", "CreationList"] hypersurfaces_creation_list: ListFlags = ListFlags::default(),

    ["Link", "CodeType"] link_code_type: LinkCode = LinkCode::Gauss,
    ["Link", "CrossingsStyle"] link_crossings_style: CrossingsStyle = CrossingsStyle::Pictorial,
    ["Link", "HomflyType"] link_homfly_type: HomflyType = HomflyType::AZ,
    ["Link", "InitialGraphType"] link_initial_graph_type: LinkGraph = LinkGraph::TreeDecomposition,

    ["Python", "AutoIndent"] python_auto_indent: bool = true,
    ["Python", "SpacesPerTab"] python_spaces_per_tab: u32 = 4 => positive,
    ["Python", "WordWrap"] python_word_wrap: bool = false,

    ["Surfaces", "CompatThreshold"] surfaces_compat_threshold: u32 = 100,
    ["Surfaces", "CreationCoordinates"] surfaces_creation_coords: NormalCoords = NormalCoords::Standard => enumerable,
    ["Surfaces", "CreationList"] surfaces_creation_list: ListFlags = ListFlags::default(),
    ["Surfaces", "InitialCompat"] surfaces_initial_compat: SurfacesCompat = SurfacesCompat::Local,
    ["Surfaces", "SupportOriented"] surfaces_support_oriented: bool = false,
    ["Surfaces", "WarnOnNonEmbedded"] warn_on_non_embedded: bool = true,

    ["Tabs", "Dim2Tri"] tab_dim2_tri: u32 = 0,
    ["Tabs", "Dim3Tri"] tab_dim3_tri: u32 = 0,
    ["Tabs", "Dim3TriAlgebra"] tab_dim3_tri_algebra: u32 = 0,
    ["Tabs", "Dim3TriSkeleton"] tab_dim3_tri_skeleton: u32 = 0,
    ["Tabs", "Dim4Tri"] tab_dim4_tri: u32 = 0,
    ["Tabs", "HypersurfaceList"] tab_hypersurface_list: u32 = 0,
    ["Tabs", "Link"] tab_link: u32 = 0,
    ["Tabs", "SnapPeaTri"] tab_snappea_tri: u32 = 0,
    ["Tabs", "SurfaceList"] tab_surface_list: u32 = 0,

    ["Tree", "JumpSize"] tree_jump_size: u32 = 10 => positive,

    ["Triangulation", "GraphvizLabels"] tri_graphviz_labels: bool = true,
    ["Triangulation", "InitialGraphType"] tri_initial_graph_type: TriGraph = TriGraph::DualGraph,
    ["Triangulation", "SurfacePropsThreshold"] tri_surface_props_threshold: u32 = 6,

    ["Tools", "GAPExec"] tri_gap_exec: String = "gap".to_string() => trimmed,

    ["Window", "MainSize"] window_main_size: Option<(u32, u32)> = None,
    ["Window", "PythonSize"] window_python_size: Option<(u32, u32)> = None,

    ["Census", "Files"] census_files: Vec<CensusFile> = Vec::new(),
}];

impl Preferences {
    /// Worker threads to use for engine computations.
    pub fn threads(&self) -> usize {
        let cores = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        match self.thread_count {
            ThreadCount::Single => 1,
            ThreadCount::Polite => (cores / 2).max(1),
            ThreadCount::All => cores.max(1),
        }
    }

    pub fn import_export_codec(&self) -> TextCodec {
        TextCodec::for_name_or_default(&self.file_import_export_codec)
    }
}

/// Writes every setting into a TOML table, grouped.
struct TomlWriter<'a> {
    prefs: &'a Preferences,
    table: toml::Table,
}

impl<'a, T: PreferenceValue> ItemVisitor<T> for TomlWriter<'a> {
    fn visit(&mut self, acc: Accessor<T>) {
        let group = self.table.entry(acc.group).or_insert_with(|| toml::Value::Table(toml::Table::new()));
        if let toml::Value::Table(group) = group {
            group.insert(acc.key.to_string(), (acc.reader)(self.prefs).to_toml());
        }
    }
}

/// Reads settings from a TOML table. Missing keys, unparseable values and
/// values that fail validation all leave the default in place.
struct TomlReader<'a> {
    table: &'a toml::Table,
    prefs: Preferences,
}

impl<'a, T: PreferenceValue> ItemVisitor<T> for TomlReader<'a> {
    fn visit(&mut self, acc: Accessor<T>) {
        let Some(value) = self.table.get(acc.group).and_then(|g| g.get(acc.key)) else { return };
        let Some(value) = T::from_toml(value) else {
            tracing::warn!(group = acc.group, key = acc.key, "ignoring unreadable preference");
            return;
        };
        let mut candidate = self.prefs.clone();
        match versioned::Change::apply((acc.changer)(value), &mut candidate) {
            Ok(_) => self.prefs = candidate,
            Err(error) => tracing::warn!(%error, "ignoring invalid preference"),
        }
    }
}

pub trait PreferencesListener: Send + Sync {
    fn preferences_changed(&self, prefs: &Preferences);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecentFilesEvent {
    Added(PathBuf),
    Promoted(PathBuf),
    RemovedLast,
    Cleared,
    Filled,
}

pub trait RecentFilesListener: Send + Sync {
    fn recent_files_event(&self, event: &RecentFilesEvent);
}

pub type Host = versioned::Host<Preferences>;

pub struct PreferencesStore {
    host: Host,
    listeners: Mutex<Vec<sync::Weak<dyn PreferencesListener>>>,
    recent: Mutex<Vec<PathBuf>>,
    recent_listeners: Mutex<Vec<sync::Weak<dyn RecentFilesListener>>>,
}

lazy_static! {
    pub static ref INSTANCE: sync::Arc<PreferencesStore> = sync::Arc::new(PreferencesStore::new());
}

pub fn global() -> sync::Arc<PreferencesStore> {
    INSTANCE.clone()
}

/// Where preferences live: `$XDG_CONFIG_HOME/regina/regina.toml`.
pub fn default_path() -> Result<PathBuf, PreferenceError> {
    let dirs = xdg::BaseDirectories::with_prefix("regina")
        .map_err(|e| PreferenceError::NoConfigDirectory(e.to_string()))?;
    Ok(dirs.get_config_home().join("regina.toml"))
}

impl PreferencesStore {
    pub fn new() -> PreferencesStore {
        PreferencesStore {
            host: Host::default(),
            listeners: Mutex::new(Vec::new()),
            recent: Mutex::new(Vec::new()),
            recent_listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn get(&self) -> sync::Arc<Preferences> {
        self.host.get()
    }

    /// Validates and commits a change, then tells every listener once. On a
    /// validation failure nothing changes and nobody is told.
    pub fn change(&self, change: Change) -> Result<sync::Arc<Preferences>, PreferenceError> {
        let new = self.host.change(change)?;
        self.broadcast(&new);
        self.trim_recent(new.file_recent_max as usize);
        Ok(new)
    }

    pub fn batch(&self, changes: Vec<Change>) -> Result<sync::Arc<Preferences>, PreferenceError> {
        self.change(Change::Batch(changes))
    }

    pub fn add_listener(&self, listener: &sync::Arc<dyn PreferencesListener>) {
        self.listeners.lock().push(sync::Arc::downgrade(listener));
    }

    fn broadcast(&self, prefs: &Preferences) {
        let live: Vec<_> = {
            let mut listeners = self.listeners.lock();
            listeners.retain(|l| l.strong_count() > 0);
            listeners.iter().filter_map(sync::Weak::upgrade).collect()
        };
        for listener in live {
            listener.preferences_changed(prefs);
        }
    }

    /* recent files */

    pub fn add_recent_listener(&self, listener: &sync::Arc<dyn RecentFilesListener>) {
        self.recent_listeners.lock().push(sync::Arc::downgrade(listener));
    }

    fn fire_recent(&self, events: Vec<RecentFilesEvent>) {
        let live: Vec<_> = {
            let mut listeners = self.recent_listeners.lock();
            listeners.retain(|l| l.strong_count() > 0);
            listeners.iter().filter_map(sync::Weak::upgrade).collect()
        };
        for event in &events {
            for listener in &live {
                listener.recent_files_event(event);
            }
        }
    }

    pub fn recent_files(&self) -> Vec<PathBuf> {
        self.recent.lock().clone()
    }

    /// Puts `path` at the front of the recent-files list. A path already in
    /// the list is promoted; otherwise the oldest entry is dropped if the list
    /// is full.
    pub fn add_recent_file(&self, path: &Path) {
        let max = self.get().file_recent_max as usize;
        let mut events = Vec::new();
        {
            let mut recent = self.recent.lock();
            if let Some(index) = recent.iter().position(|p| p == path) {
                let entry = recent.remove(index);
                recent.insert(0, entry);
                events.push(RecentFilesEvent::Promoted(path.to_path_buf()));
            } else {
                if max > 0 && recent.len() >= max {
                    recent.pop();
                    events.push(RecentFilesEvent::RemovedLast);
                }
                recent.insert(0, path.to_path_buf());
                events.push(RecentFilesEvent::Added(path.to_path_buf()));
            }
        }
        self.fire_recent(events);
    }

    /// Drops the oldest entries beyond `max`, one `RemovedLast` each.
    fn trim_recent(&self, max: usize) {
        if max == 0 {
            return;
        }
        let removed = {
            let mut recent = self.recent.lock();
            let excess = recent.len().saturating_sub(max);
            recent.truncate(max);
            excess
        };
        if removed > 0 {
            self.fire_recent(vec![RecentFilesEvent::RemovedLast; removed]);
        }
    }

    pub fn clear_recent_files(&self) {
        self.recent.lock().clear();
        self.fire_recent(vec![RecentFilesEvent::Cleared]);
    }

    /* persistence */

    pub fn to_toml(&self) -> toml::Table {
        let prefs = self.get();
        let mut writer = TomlWriter { prefs: &prefs, table: toml::Table::new() };
        Preferences::visit_all(&mut writer);

        let files = self.recent_files().iter().map(|p| toml::Value::String(p.to_string_lossy().into_owned())).collect();
        let mut recent = toml::Table::new();
        recent.insert("Files".to_string(), toml::Value::Array(files));
        writer.table.insert("RecentFiles".to_string(), toml::Value::Table(recent));
        writer.table
    }

    /// Replaces every setting with what `table` holds, defaults elsewhere.
    pub fn load_toml(&self, table: &toml::Table) {
        let mut reader = TomlReader { table, prefs: Preferences::default() };
        Preferences::visit_all(&mut reader);
        let max = reader.prefs.file_recent_max as usize;
        let new = self.host.replace(reader.prefs);

        let recent: Vec<PathBuf> = table.get("RecentFiles")
            .and_then(|g| g.get("Files"))
            .and_then(toml::Value::as_array)
            .map(|files| files.iter()
                 .filter_map(toml::Value::as_str)
                 .map(PathBuf::from)
                 .filter(|p| p.exists())
                 .take(if max == 0 { usize::MAX } else { max })
                 .collect())
            .unwrap_or_default();
        *self.recent.lock() = recent;

        self.broadcast(&new);
        self.fire_recent(vec![RecentFilesEvent::Filled]);
    }

    /// Loads from `path`. A missing file is not an error: everything simply
    /// takes its default.
    #[tracing::instrument(skip(self))]
    pub fn load_from(&self, path: &Path) -> Result<(), PreferenceError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                tracing::info!("no preferences file; using defaults");
                String::new()
            },
            Err(error) => return Err(PreferenceError::Io { path: path.to_path_buf(), error }),
        };
        let table: toml::Table = text.parse().map_err(|e: toml::de::Error| PreferenceError::Format {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        self.load_toml(&table);
        tracing::info!("loaded preferences");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn save_to(&self, path: &Path) -> Result<(), PreferenceError> {
        let text = toml::to_string(&self.to_toml()).map_err(|e| PreferenceError::Format {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|error| PreferenceError::Io { path: dir.to_path_buf(), error })?;
        }
        std::fs::write(path, text).map_err(|error| PreferenceError::Io { path: path.to_path_buf(), error })?;
        tracing::info!("saved preferences");
        Ok(())
    }

    pub fn load(&self) -> Result<(), PreferenceError> {
        self.load_from(&default_path()?)
    }

    pub fn save(&self) -> Result<(), PreferenceError> {
        self.save_to(&default_path()?)
    }

    /// Switches off census files whose names match, e.g. after they failed
    /// to open.
    pub fn deactivate_census(&self, filenames: &[PathBuf]) -> Result<(), PreferenceError> {
        if filenames.is_empty() {
            return Ok(());
        }
        let mut files = self.get().census_files.clone();
        for file in files.iter_mut() {
            if filenames.contains(&file.filename) {
                tracing::warn!(census = %file.filename.display(), "disabling census file");
                file.active = false;
            }
        }
        self.change(Change::census_files(files)).map(|_| ())
    }
}

impl Default for PreferencesStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Counter {
        prefs: Mutex<usize>,
        recent: Mutex<Vec<RecentFilesEvent>>,
    }

    impl PreferencesListener for Counter {
        fn preferences_changed(&self, _prefs: &Preferences) {
            *self.prefs.lock()+= 1;
        }
    }

    impl RecentFilesListener for Counter {
        fn recent_files_event(&self, event: &RecentFilesEvent) {
            self.recent.lock().push(event.clone());
        }
    }

    #[test]
    fn rejected_values_leave_state_alone() {
        let store = PreferencesStore::new();
        let counter = sync::Arc::new(Counter::default());
        let listener: sync::Arc<dyn PreferencesListener> = counter.clone();
        store.add_listener(&listener);

        assert_matches!(store.change(Change::tree_jump_size(0)), Err(PreferenceError::Validation { key: "Tree.JumpSize", .. }));
        assert_eq!(store.get().tree_jump_size, 10);
        assert_eq!(*counter.prefs.lock(), 0);

        store.change(Change::tree_jump_size(3)).unwrap();
        assert_eq!(store.get().tree_jump_size, 3);
        assert_eq!(*counter.prefs.lock(), 1);

        assert_matches!(store.batch(vec![Change::python_word_wrap(true), Change::file_import_export_codec("  ".into())]), Err(_));
        assert!(!store.get().python_word_wrap);

        store.change(Change::tri_gap_exec("  /usr/bin/gap ".into())).unwrap();
        assert_eq!(store.get().tri_gap_exec, "/usr/bin/gap");
    }

    #[test]
    fn thread_policy() {
        let mut prefs = Preferences::default();
        prefs.thread_count = ThreadCount::Single;
        assert_eq!(prefs.threads(), 1);
        prefs.thread_count = ThreadCount::Polite;
        assert!(prefs.threads() >= 1);
        prefs.thread_count = ThreadCount::All;
        assert!(prefs.threads() >= Preferences { thread_count: ThreadCount::Polite, ..Preferences::default() }.threads());
    }

    #[test]
    fn recent_files() {
        let store = PreferencesStore::new();
        store.change(Change::file_recent_max(2)).unwrap();
        let counter = sync::Arc::new(Counter::default());
        let listener: sync::Arc<dyn RecentFilesListener> = counter.clone();
        store.add_recent_listener(&listener);

        store.add_recent_file(Path::new("/a.rga"));
        store.add_recent_file(Path::new("/b.rga"));
        store.add_recent_file(Path::new("/a.rga"));
        store.add_recent_file(Path::new("/c.rga"));
        store.clear_recent_files();

        assert_eq!(*counter.recent.lock(), vec![
            RecentFilesEvent::Added("/a.rga".into()),
            RecentFilesEvent::Added("/b.rga".into()),
            RecentFilesEvent::Promoted("/a.rga".into()),
            RecentFilesEvent::RemovedLast,
            RecentFilesEvent::Added("/c.rga".into()),
            RecentFilesEvent::Cleared,
        ]);
        assert!(store.recent_files().is_empty());
    }

    #[test]
    fn lowering_the_recent_limit_trims_the_list() {
        let store = PreferencesStore::new();
        for name in ["/a.rga", "/b.rga", "/c.rga", "/d.rga"] {
            store.add_recent_file(Path::new(name));
        }
        let counter = sync::Arc::new(Counter::default());
        let listener: sync::Arc<dyn RecentFilesListener> = counter.clone();
        store.add_recent_listener(&listener);

        store.change(Change::file_recent_max(2)).unwrap();
        assert_eq!(store.recent_files(), vec![PathBuf::from("/d.rga"), PathBuf::from("/c.rga")]);
        assert_eq!(*counter.recent.lock(), vec![RecentFilesEvent::RemovedLast, RecentFilesEvent::RemovedLast]);

        /* unlimited and larger limits keep everything */
        store.change(Change::file_recent_max(0)).unwrap();
        store.change(Change::file_recent_max(5)).unwrap();
        assert_eq!(store.recent_files().len(), 2);
        assert_eq!(counter.recent.lock().len(), 2);
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("regina.toml");
        let existing = dir.path().join("knots.rga");
        std::fs::write(&existing, "").unwrap();

        let store = PreferencesStore::new();
        store.batch(vec![
            Change::thread_count(ThreadCount::Single),
            Change::link_code_type(LinkCode::Jenkins),
            Change::window_main_size(Some((800, 600))),
            Change::surfaces_creation_list(ListFlags::EMBEDDED_ONLY | ListFlags::FUNDAMENTAL),
            Change::census_files(vec![CensusFile { filename: "/census.rga".into(), description: "Closed".into(), active: true }]),
        ]).unwrap();
        store.add_recent_file(Path::new("/gone/missing.rga"));
        store.add_recent_file(&existing);
        store.save_to(&path).unwrap();

        let fresh = PreferencesStore::new();
        fresh.load_from(&path).unwrap();
        assert_eq!(*fresh.get(), *store.get());
        assert_eq!(fresh.recent_files(), vec![existing]);
    }

    #[test]
    fn bad_values_fall_back() {
        let table: toml::Table = r#"
            [Tree]
            JumpSize = 0
            [Link]
            CodeType = "Morse"
            HomflyType = "LM"
        "#.parse().unwrap();
        let store = PreferencesStore::new();
        store.load_toml(&table);
        let prefs = store.get();
        assert_eq!(prefs.tree_jump_size, 10);
        assert_eq!(prefs.link_code_type, LinkCode::Gauss);
        assert_eq!(prefs.link_homfly_type, HomflyType::LM);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = PreferencesStore::new();
        store.change(Change::display_unicode(false)).unwrap();
        store.load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(*store.get(), Preferences::default());
    }

    use rusty_fork::rusty_fork_test;
    rusty_fork_test! {
        #[test]
        fn global_instance_is_shared() {
            global().change(Change::link_code_type(LinkCode::PlanarDiagram)).unwrap();
            assert_eq!(INSTANCE.get().link_code_type, LinkCode::PlanarDiagram);
        }
    }
}
