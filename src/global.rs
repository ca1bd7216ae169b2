//! Process-wide default engine
//!
//! Lazily constructed on first use: one stderr console target with a JSON
//! formatter at `info` and above. Replaceable once at startup through
//! [`set_global`]; the previous engine is handed back so the caller can
//! shut it down.

use crate::core::{Logfan, StdFilter};
use crate::formatters::Json;
use crate::targets::ConsoleTarget;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::Arc;

static GLOBAL: Lazy<RwLock<Arc<Logfan>>> = Lazy::new(|| {
    let engine = Logfan::builder().build();
    if let Err(e) = engine.add_target(
        Box::new(ConsoleTarget::stderr()),
        "stderr",
        Arc::new(StdFilter::new(crate::core::level::INFO)),
        Arc::new(Json::new()),
        crate::core::DEFAULT_MAX_QUEUE_SIZE,
    ) {
        eprintln!("[LOGFAN ERROR] default target setup failed: {}", e);
    }
    RwLock::new(Arc::new(engine))
});

/// The process-wide engine.
pub fn global() -> Arc<Logfan> {
    Arc::clone(&GLOBAL.read())
}

/// Replace the process-wide engine, returning the previous one so it can be
/// flushed and shut down by the caller.
pub fn set_global(engine: Logfan) -> Arc<Logfan> {
    let mut slot = GLOBAL.write();
    std::mem::replace(&mut *slot, Arc::new(engine))
}
