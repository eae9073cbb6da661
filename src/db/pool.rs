//! Shared connection handle with reference-counted sessions.
//!
//! One physical SQLite connection serves every logical session. It is opened
//! lazily by the first operation of a session and closed when the last
//! session is dropped. All access goes through a reentrant lock, so a thread
//! already holding it (for example inside a cascade or a [`LockedDao`]
//! bracket) can issue nested operations without deadlocking.
//!
//! [`LockedDao`]: crate::db::dao::LockedDao

use crate::db::migrations::Migrator;
use crate::libs::config::DbConfig;
use crate::libs::error::{OrmError, OrmResult};
use crate::libs::messages::Message;
use crate::libs::schema::EntityDescriptor;
use crate::{msg_debug, msg_error};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use rusqlite::Connection;
use std::cell::RefCell;
use std::fs;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub(crate) type ConnectionSlot = RefCell<Option<Connection>>;

struct PoolInner {
    config: DbConfig,
    descriptors: Vec<Arc<EntityDescriptor>>,
    migrate: bool,
    sessions: AtomicUsize,
    /// Mirrors whether the slot holds a connection; readable without the lock.
    open: AtomicBool,
    state: ReentrantMutex<ConnectionSlot>,
}

#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    pub(crate) fn new(config: DbConfig, descriptors: Vec<Arc<EntityDescriptor>>, migrate: bool) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                config,
                descriptors,
                migrate,
                sessions: AtomicUsize::new(0),
                open: AtomicBool::new(false),
                state: ReentrantMutex::new(RefCell::new(None)),
            }),
        }
    }

    pub fn config(&self) -> &DbConfig {
        &self.inner.config
    }

    /// Starts a logical session. The physical connection opens on first use.
    pub fn open(&self) -> Session {
        self.inner.sessions.fetch_add(1, Ordering::SeqCst);
        Session { inner: self.inner.clone() }
    }

    pub fn session_count(&self) -> usize {
        self.inner.sessions.load(Ordering::SeqCst)
    }

    /// Whether the physical connection is currently open. Never waits for the lock.
    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::SeqCst)
    }

    /// Whether some thread is inside an operation or lock bracket.
    pub fn is_locked(&self) -> bool {
        self.inner.state.is_locked()
    }

    pub(crate) fn lock(&self) -> ReentrantMutexGuard<'_, ConnectionSlot> {
        self.inner.state.lock()
    }
}

/// A logical session. Dropping the last one closes the physical connection.
pub struct Session {
    inner: Arc<PoolInner>,
}

impl Session {
    /// Runs `f` against the connection while holding the lock for its whole duration.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> OrmResult<T>) -> OrmResult<T> {
        let guard = self.inner.state.lock();

        if guard.borrow().is_none() {
            let conn = self.inner.connect()?;
            *guard.borrow_mut() = Some(conn);
            self.inner.open.store(true, Ordering::SeqCst);
        }

        let slot = guard.borrow();
        match slot.as_ref() {
            Some(conn) => f(conn),
            None => Err(OrmError::Storage(rusqlite::Error::InvalidQuery)),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let guard = self.inner.state.lock();
        if self.inner.sessions.fetch_sub(1, Ordering::SeqCst) != 1 {
            return;
        }

        // A nested borrow means an operation further up this thread still uses the connection.
        let Ok(mut slot) = guard.try_borrow_mut() else {
            return;
        };
        if let Some(conn) = slot.take() {
            self.inner.open.store(false, Ordering::SeqCst);
            let path = self.inner.config.path().display().to_string();
            match conn.close() {
                Ok(()) => msg_debug!(Message::DatabaseClosed(path)),
                Err((_, e)) => msg_error!(Message::OperationFailed {
                    operation: "close",
                    error: e.to_string(),
                }),
            }
        }
    }
}

impl PoolInner {
    fn connect(&self) -> OrmResult<Connection> {
        let directory = self.config.directory();
        fs::create_dir_all(&directory).map_err(|source| OrmError::Directory {
            path: directory.clone(),
            source,
        })?;

        let path = self.config.path();
        let conn = Connection::open(&path).map_err(|source| OrmError::Open { path: path.clone(), source })?;
        msg_debug!(Message::DatabaseOpened(path.display().to_string()));

        if self.migrate {
            Migrator::new(&self.descriptors).upgrade(&conn, self.config.version)?;
        }

        Ok(conn)
    }
}
