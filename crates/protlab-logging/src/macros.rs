//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Structured logging adapters and sinks."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Context-enriched logging macros.

/// Shared expansion used by the level-specific macros.
#[doc(hidden)]
#[macro_export]
macro_rules! __lab_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            $level,
            module = ctx.module.unwrap_or(""),
            phase = ctx.phase.unwrap_or(""),
            tick = ctx.tick.unwrap_or_default(),
            scenario = ctx.scenario.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational log enriched with simulator context.
#[macro_export]
macro_rules! lab_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__lab_event!(tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__lab_event!(tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with simulator context.
#[macro_export]
macro_rules! lab_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__lab_event!(tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__lab_event!(tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning enriched with simulator context.
#[macro_export]
macro_rules! lab_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__lab_event!(tracing::Level::WARN, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__lab_event!(tracing::Level::WARN, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit an error log enriched with simulator context.
#[macro_export]
macro_rules! lab_error {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__lab_event!(tracing::Level::ERROR, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__lab_event!(tracing::Level::ERROR, $crate::LogContext::default(), $($arg)+)
    };
}
