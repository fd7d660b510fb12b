//! Logging macros for the roadmap simulation with verbosity level control.
//!
//! Provides zero-cost logging when disabled (verbosity=0).
//! Verbosity levels:
//! - 0: SILENT (only warnings about clamped capacity and unallocated surplus)
//! - 1: CHANGES (task completions, phase transitions, termination day)
//! - 2: CHECKS (blocked tasks, redistribution shares)
//! - 3: DEBUG (every unit of work applied by the allocation loop)

/// Verbosity level constants.
pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_CHANGES: u8 = 1;
pub const VERBOSITY_CHECKS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// Whether a message logged at `level` is emitted under `verbosity`.
/// Nothing is ever logged at the silent level.
#[inline]
pub const fn enabled(verbosity: u8, level: u8) -> bool {
    level > VERBOSITY_SILENT && verbosity >= level
}

/// Shared body of the gated macros below.
#[doc(hidden)]
#[macro_export]
macro_rules! log_at {
    ($level:expr, $verbosity:expr, $($arg:tt)*) => {
        if $crate::logging::enabled($verbosity, $level) {
            eprintln!($($arg)*);
        }
    };
}

/// Log a recoverable condition. Always emitted.
///
/// Used for: capacity shortfalls clamped to zero, surplus with no absorbing pool.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        eprintln!("WARNING: {}", format_args!($($arg)*));
    };
}

/// Log at CHANGES level (verbosity >= 1).
///
/// Used for: task completions, phase transitions, termination day.
#[macro_export]
macro_rules! log_changes {
    ($verbosity:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logging::VERBOSITY_CHANGES, $verbosity, $($arg)*)
    };
}

/// Log at CHECKS level (verbosity >= 2).
///
/// Used for: blocked head-of-line tasks, surplus shares per pool.
#[macro_export]
macro_rules! log_checks {
    ($verbosity:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logging::VERBOSITY_CHECKS, $verbosity, $($arg)*)
    };
}

/// Log at DEBUG level (verbosity >= 3).
///
/// Used for: individual work units inside the single-day allocation loop.
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logging::VERBOSITY_DEBUG, $verbosity, $($arg)*)
    };
}
