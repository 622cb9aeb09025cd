//! Scoped capture of every statement a [`Session`] executes.
//!
//! ```no_run
//! # use querybench::db::Session;
//! # use querybench::recorder::record_queries;
//! # fn demo(session: &mut Session) -> querybench::Result<()> {
//! let mut recording = record_queries(session);
//! recording.query("SELECT id FROM entries", &[])?;
//! let queries = recording.finish();
//! assert_eq!(queries.len(), 1);
//! # Ok(())
//! # }
//! ```

use std::cell::RefCell;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use crate::db::{ListenerId, Session, StatementInterceptor};
use crate::models::{CapturedQuery, SqlValue};

/// Shared, append-only list of captured statements.
///
/// Clones share the same storage, so a handle taken while recording stays
/// readable after the recording scope has ended.
#[derive(Debug, Clone, Default)]
pub struct QueryLog(Rc<RefCell<Vec<CapturedQuery>>>);

impl QueryLog {
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn snapshot(&self) -> Vec<CapturedQuery> {
        self.0.borrow().clone()
    }
}

impl StatementInterceptor for QueryLog {
    fn before_execute(&self, statement: &str, parameters: &[SqlValue]) {
        self.0
            .borrow_mut()
            .push(CapturedQuery::new(statement, parameters));
    }
}

/// Active recording on a session. Derefs to the session so callers keep
/// using it as usual; the interceptor is removed when the scope drops.
pub struct RecordingScope<'s> {
    session: &'s mut Session,
    listener: ListenerId,
    log: QueryLog,
}

/// Start recording every statement `session` executes.
pub fn record_queries(session: &mut Session) -> RecordingScope<'_> {
    let log = QueryLog::default();
    let listener = session.listen(Rc::new(log.clone()));
    RecordingScope {
        session,
        listener,
        log,
    }
}

impl RecordingScope<'_> {
    pub fn log(&self) -> QueryLog {
        self.log.clone()
    }

    /// End the scope and return what was captured.
    pub fn finish(self) -> Vec<CapturedQuery> {
        self.log.snapshot()
    }
}

impl Deref for RecordingScope<'_> {
    type Target = Session;

    fn deref(&self) -> &Session {
        self.session
    }
}

impl DerefMut for RecordingScope<'_> {
    fn deref_mut(&mut self) -> &mut Session {
        self.session
    }
}

impl Drop for RecordingScope<'_> {
    fn drop(&mut self) {
        self.session.remove_listener(self.listener);
    }
}
