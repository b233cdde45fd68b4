//! Generation-stamped shared objects.
//!
//! A [Host] owns the current version of some object. Every committed [Change]
//! produces a fresh immutable version carrying a link to its predecessor, so
//! readers on any thread can hold an `Arc` snapshot while the UI thread keeps
//! committing, and async waiters can sleep until the generation moves.

use std::future;
use std::pin;
use std::sync;
use std::task;

use crate::util;

pub trait Change<Object>: Clone {
    type ApplyError;
    type ApplyRecord: Clone;

    /// Mutates `object` in place. On error the object may have been partially
    /// modified; the host discards it in that case.
    fn apply(self, object: &mut Object) -> Result<(Self, Self::ApplyRecord), Self::ApplyError>;
}

#[derive(Clone)]
pub struct Version<Object: Versioned> {
    previous: Option<(sync::Arc<Object>, <Object::Change as Change<Object>>::ApplyRecord)>,
    uid: u64,
    generation: u64
}

impl<Object: Versioned> std::fmt::Debug for Version<Object> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Version")
            .field("uid", &self.uid)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl<T: Versioned> Default for Version<T> {
    fn default() -> Self {
        Version {
            previous: None,
            uid: next_uid(),
            generation: next_generation(),
        }
    }
}

impl<T: Versioned> Version<T> {
    fn is_outdated(&self, other: &Self) -> bool {
        self.uid != other.uid ||
            self.generation != other.generation
    }
}

pub trait Versioned: Sized + Clone {
    type Change: Change<Self>;

    fn version(&self) -> &Version<Self>;
    fn version_mut(&mut self) -> &mut Version<Self>;

    fn generation(&self) -> u64 {
        self.version().generation
    }

    fn previous(&self) -> Option<&(sync::Arc<Self>, <Self::Change as Change<Self>>::ApplyRecord)> {
        self.version().previous.as_ref()
    }

    fn is_outdated(&self, other: &Self) -> bool {
        self.version().is_outdated(other.version())
    }

    /// Walks the history back to `older`, then reports every change record
    /// between it and `self` in the order they were applied. Returns false if
    /// `older` is not an ancestor of this version, in which case nothing is
    /// reported and the caller should refresh from scratch.
    fn changes_since<F>(&self, older: &Self, cb: &mut F) -> bool
    where F: FnMut(&Self, &<Self::Change as Change<Self>>::ApplyRecord) {
        let mut chain = Vec::new();
        let mut cursor: &Self = self;

        while cursor.generation() != older.generation() {
            match cursor.previous() {
                Some((prev, record)) => {
                    chain.push((cursor, record));
                    cursor = &**prev;
                },
                None => return false,
            }
        }

        for (version, record) in chain.into_iter().rev() {
            cb(version, record);
        }

        true
    }
}

static NEXT_UID:        sync::atomic::AtomicU64 = sync::atomic::AtomicU64::new(1);
static NEXT_GENERATION: sync::atomic::AtomicU64 = sync::atomic::AtomicU64::new(1);

fn next_uid() -> u64 {
    NEXT_UID.fetch_add(1, sync::atomic::Ordering::Relaxed)
}

fn next_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, sync::atomic::Ordering::Relaxed)
}

pub struct Host<Object: Versioned> {
    notifier: util::Notifier,
    current: arc_swap::ArcSwap<Object>,
}

impl<Object: Versioned + Default> Default for Host<Object> {
    fn default() -> Self {
        Self::new(Object::default())
    }
}

impl<Object: Versioned> Host<Object> {
    pub fn new(initial: Object) -> Self {
        Host {
            notifier: util::Notifier::new(),
            current: arc_swap::ArcSwap::from(sync::Arc::new(initial)),
        }
    }

    pub fn enroll(&self, cx: &task::Context) {
        self.notifier.enroll(cx);
    }

    pub fn wait_for_update<'a>(&'a self, current: &'_ Object) -> ObjectUpdateFuture<'a, Object> {
        ObjectUpdateFuture {
            host: self,
            generation: current.generation(),
        }
    }

    pub fn borrow(&self) -> arc_swap::Guard<sync::Arc<Object>> {
        self.current.load()
    }

    pub fn get(&self) -> sync::Arc<Object> {
        self.current.load_full()
    }

    /// Applies `change` to a private copy of the current version and publishes
    /// the result. If the change fails, the published version is untouched.
    pub fn change(&self, change: Object::Change) -> Result<sync::Arc<Object>, <<Object as Versioned>::Change as Change<Object>>::ApplyError> {
        loop {
            let old = self.current.load();
            let mut object = (**old).clone();
            let (_, record) = change.clone().apply(&mut object)?;

            let version = object.version_mut();
            version.previous = Some((old.clone(), record));
            version.generation = next_generation();

            let new = sync::Arc::new(object);
            let swapped = self.current.compare_and_swap(&*old, new.clone());

            if sync::Arc::ptr_eq(&*old, &swapped) {
                self.notifier.notify();
                return Ok(new);
            }

            /* another thread got in first; rebase onto its version */
        }
    }

    /// Publishes `object` wholesale, severing history. Used when state is
    /// reloaded from storage.
    pub fn replace(&self, mut object: Object) -> sync::Arc<Object> {
        let version = object.version_mut();
        version.previous = None;
        version.generation = next_generation();

        let new = sync::Arc::new(object);
        self.current.store(new.clone());
        self.notifier.notify();
        new
    }
}

pub struct ObjectUpdateFuture<'a, Object: Versioned> {
    host: &'a Host<Object>,
    generation: u64,
}

impl<'a, Object: Versioned> future::Future for ObjectUpdateFuture<'a, Object> {
    type Output = sync::Arc<Object>;

    fn poll(self: pin::Pin<&mut Self>, cx: &mut task::Context<'_>) -> task::Poll<Self::Output> {
        let guard = self.host.current.load();
        if guard.generation() != self.generation {
            /* fast path */
            task::Poll::Ready(arc_swap::Guard::into_inner(guard))
        } else {
            std::mem::drop(guard);
            self.host.enroll(cx);

            /* check whether the object was updated while we were enrolling */
            let guard = self.host.current.load();
            if guard.generation() != self.generation {
                task::Poll::Ready(arc_swap::Guard::into_inner(guard))
            } else {
                task::Poll::Pending
            }
        }
    }
}

impl<Object: Versioned> std::fmt::Debug for Host<Object> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(std::any::type_name::<Host<Object>>())
            .field("generation", &self.borrow().generation())
            .finish_non_exhaustive()
    }
}
