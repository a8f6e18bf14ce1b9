//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Structured logging adapters and sinks."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Context-enriched tracing helpers shared by the simulators.

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

#[macro_use]
pub mod macros;

/// Initialize a baseline tracing subscriber suitable for tests and demos.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Simulator emitting the event (`bus-transfer`, `differential`, ...).
    pub module: Option<&'a str>,
    /// Operational phase at the time of the event.
    pub phase: Option<&'a str>,
    /// Frame counter of the owning simulator.
    pub tick: Option<u64>,
    /// Active scenario preset name.
    pub scenario: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a simulator name.
    pub fn with_module(mut self, module: &'a str) -> Self {
        self.module = Some(module);
        self
    }

    /// Attach an operational phase label.
    pub fn with_phase(mut self, phase: &'a str) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Attach a frame counter.
    pub fn with_tick(mut self, tick: u64) -> Self {
        self.tick = Some(tick);
        self
    }

    /// Attach a scenario preset name.
    pub fn with_scenario(mut self, scenario: &'a str) -> Self {
        self.scenario = Some(scenario);
        self
    }
}

/// High-level outcome used when emitting lifecycle log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEventOutcome {
    /// The operation completed successfully.
    Success,
    /// The operation completed but outside its preferred window.
    Degraded,
    /// The operation failed or was aborted.
    Fault,
}

impl SystemEventOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            SystemEventOutcome::Success => "success",
            SystemEventOutcome::Degraded => "degraded",
            SystemEventOutcome::Fault => "fault",
        }
    }
}

/// Emit a standardized system event with an outcome.
pub fn log_system_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: SystemEventOutcome,
) {
    let default_ctx = LogContext::default();
    let ctx = context.unwrap_or(&default_ctx);
    macro_rules! emit {
        ($level:expr) => {
            tracing::event!(
                $level,
                event,
                outcome = outcome.as_str(),
                module = ctx.module.unwrap_or(""),
                phase = ctx.phase.unwrap_or(""),
                tick = ctx.tick.unwrap_or_default(),
                scenario = ctx.scenario.unwrap_or(""),
                message = %message
            )
        };
    }
    match outcome {
        SystemEventOutcome::Success => emit!(Level::INFO),
        SystemEventOutcome::Degraded => emit!(Level::WARN),
        SystemEventOutcome::Fault => emit!(Level::ERROR),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macros_emit_without_panic() {
        init();
        let ctx = LogContext::new()
            .with_module("bus-transfer")
            .with_phase("coasting");
        lab_info!(context = ctx.clone(), "main breaker tripped");
        lab_debug!("debug message");
        lab_warn!(context = ctx.clone().with_tick(12), "transfer outside window");
        lab_error!(context = ctx, "closure failed: {}", 2.0);
    }

    #[test]
    fn system_event_helper_emits() {
        init();
        let ctx = LogContext::new().with_scenario("high-inertia");
        log_system_event(
            Some(&ctx),
            "transfer.completed",
            "fast transfer inside window",
            SystemEventOutcome::Success,
        );
        log_system_event(
            None,
            "transfer.completed",
            "closure out of phase",
            SystemEventOutcome::Fault,
        );
    }
}
