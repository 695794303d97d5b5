//! Operation-name dispatch for decoded records.
//!
//! The same table type drives the host (gameplay intents bound to the
//! engine) and the client (notifications bound to the local mirror); only
//! the registered operations differ.

use log::{debug, error, warn};
use std::collections::HashMap;

use super::{
    codec::Record,
    errors::{DispatchError, ParamError},
};

/// A registered handler. `C` is the state the handler mutates and `I` the
/// initiator of the record.
pub type Handler<C, I> = fn(&mut C, I, &Record) -> anyhow::Result<()>;

/// Registry from operation name to handler.
pub struct Dispatcher<C, I> {
    handlers: HashMap<&'static str, Handler<C, I>>,
}

impl<C, I> Default for Dispatcher<C, I> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<C, I> Dispatcher<C, I> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one for the same name.
    pub fn register(&mut self, name: &'static str, handler: Handler<C, I>) {
        self.handlers.insert(name, handler);
    }

    #[must_use]
    pub fn handles(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Run the handler registered for the record.
    ///
    /// Unknown operations and records whose parameters don't bind are
    /// logged and skipped. Any other handler failure is fatal to the
    /// caller's loop and comes back with the full record attached.
    pub fn handle(&self, context: &mut C, initiator: I, record: &Record) -> Result<(), DispatchError> {
        let Some(handler) = self.handlers.get(record.kind.as_str()) else {
            warn!("ignoring unknown operation `{}`", record.kind);
            return Ok(());
        };
        debug!(
            "dispatching `{}` (args {:?}, kwargs {:?})",
            record.kind, record.args, record.kwargs
        );
        match handler(context, initiator, record) {
            Ok(()) => Ok(()),
            Err(source) if source.is::<ParamError>() => {
                warn!("dropping `{}` record: {source}", record.kind);
                Ok(())
            }
            Err(source) => {
                error!(
                    "handler for `{}` failed (args {:?}, kwargs {:?}): {source:#}",
                    record.kind, record.args, record.kwargs
                );
                Err(DispatchError {
                    name: record.kind.clone(),
                    args: record.args.clone(),
                    kwargs: record.kwargs.clone(),
                    source,
                })
            }
        }
    }
}
