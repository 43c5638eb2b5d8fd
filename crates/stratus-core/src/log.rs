//! Logging facilities.
//!
//! Every record is prefixed with the current simulation time and the name of
//! the component that produced it, so interleaved component logs stay
//! readable. Level tags are colored when the log output goes to a terminal.

use atty::Stream;
use colored::{Color, ColoredString, Colorize};
use log::error;
use serde_json::json;
use serde_type_name::type_name;

use crate::event::Event;

/// Colors the level tag if stderr (log destination) is a terminal.
pub fn colored_tag(tag: &str, color: Color) -> ColoredString {
    if atty::is(Stream::Stderr) {
        tag.color(color)
    } else {
        tag.normal()
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __sim_log {
    ($ctx:expr, $lvl:ident, $tag:expr, $color:ident, $msg:expr) => {
        log::$lvl!(
            target: $ctx.name(),
            "[{:.3} {} {}] {}",
            $ctx.time(),
            $crate::log::colored_tag($tag, $crate::colored::Color::$color),
            $ctx.name(),
            $msg
        )
    };
}

/// Logs a message at the info level, prefixed with the simulation time and
/// the name of the component owning the context.
///
/// Accepts either a ready message or a format string with arguments.
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $msg:expr) => ($crate::__sim_log!($ctx, info, "INFO ", Green, $msg));
    ($ctx:expr, $format:expr, $($arg:tt)+) => ($crate::__sim_log!($ctx, info, "INFO ", Green, format!($format, $($arg)+)));
}

/// Logs a message at the debug level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $msg:expr) => ($crate::__sim_log!($ctx, debug, "DEBUG", Blue, $msg));
    ($ctx:expr, $format:expr, $($arg:tt)+) => ($crate::__sim_log!($ctx, debug, "DEBUG", Blue, format!($format, $($arg)+)));
}

/// Logs a message at the trace level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_trace {
    ($ctx:expr, $msg:expr) => ($crate::__sim_log!($ctx, trace, "TRACE", Cyan, $msg));
    ($ctx:expr, $format:expr, $($arg:tt)+) => ($crate::__sim_log!($ctx, trace, "TRACE", Cyan, format!($format, $($arg)+)));
}

/// Logs a message at the warn level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $msg:expr) => ($crate::__sim_log!($ctx, warn, "WARN ", Yellow, $msg));
    ($ctx:expr, $format:expr, $($arg:tt)+) => ($crate::__sim_log!($ctx, warn, "WARN ", Yellow, format!($format, $($arg)+)));
}

/// Logs a message at the error level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $msg:expr) => ($crate::__sim_log!($ctx, error, "ERROR", Red, $msg));
    ($ctx:expr, $format:expr, $($arg:tt)+) => ($crate::__sim_log!($ctx, error, "ERROR", Red, format!($format, $($arg)+)));
}

fn report_event_problem(event: &Event, problem: &str) {
    error!(
        target: "simulation",
        "[{:.3} {} simulation] {}: {}",
        event.time,
        colored_tag("ERROR", Color::Red),
        problem,
        json!({
            "type": type_name(&event.data).unwrap(),
            "data": event.data,
            "src": event.src,
            "dst": event.dst,
        })
    );
}

/// Logs an event that matched no arm of a handler's [`cast!`](crate::cast!).
pub fn log_unhandled_event(event: Event) {
    report_event_problem(&event, "Unhandled event");
}

/// Logs an event destined to a component without a registered handler.
pub(crate) fn log_undelivered_event(event: Event) {
    report_event_problem(&event, "Undelivered event");
}

/// Logs a malformed event before the kernel aborts on it.
pub(crate) fn log_incorrect_event(event: Event, reason: &str) {
    report_event_problem(&event, &format!("Incorrect event ({})", reason));
}
