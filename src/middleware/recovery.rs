use axum::{extract::Request, middleware::Next, response::Response};
use futures::FutureExt;
use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use super::context::RequestContext;
use crate::error::ApiError;

/// Where a panic happened and the stack at that point.
#[derive(Debug)]
struct PanicTrace {
    location: String,
    backtrace: String,
}

thread_local! {
    // Filled by the panic hook on the panicking thread, drained by the
    // recovery stage on the same thread right after the unwind is caught.
    static LAST_PANIC: RefCell<Option<PanicTrace>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Install a panic hook that records the panic site's stack before unwinding
/// starts. The previously installed hook still runs afterwards.
pub fn install_panic_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let trace = PanicTrace {
                location: info
                    .location()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "<unknown>".to_string()),
                backtrace: Backtrace::force_capture().to_string(),
            };
            LAST_PANIC.with(|slot| *slot.borrow_mut() = Some(trace));
            previous(info);
        }));
    });
}

/// Second pipeline stage: a per-request unwind boundary. A panic anywhere
/// downstream is logged once at error level and answered with a generic 500;
/// other requests are unaffected.
pub async fn recover_panics(request: Request, next: Next) -> Response {
    install_panic_hook();
    let ctx = RequestContext::of(&request);
    take_last_panic();

    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(payload) => {
            let trace = take_last_panic();
            let (location, backtrace) = match trace {
                Some(t) => (t.location, t.backtrace),
                None => ("<unknown>".to_string(), Backtrace::force_capture().to_string()),
            };

            ApiError::internal_with_trace(
                format!("recover from panic: {:?} at {}", panic_message(&*payload), location),
                backtrace,
            )
            .respond(ctx.span())
        }
    }
}

/// Drain the slot. A payload re-raised with `resume_unwind` skips the hook,
/// so a stale entry must never outlive the request that left it.
fn take_last_panic() -> Option<PanicTrace> {
    LAST_PANIC.with(|slot| slot.borrow_mut().take())
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "Box<dyn Any>"
    }
}
