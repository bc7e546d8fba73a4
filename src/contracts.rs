//! Process-wide contract checking.
//!
//! Library code states its invariants with [`check`]. What a violated
//! contract does depends on the process-wide [`Enforcement`] level: nothing,
//! a logged warning, or a panic. Test runs raise the level to
//! [`Enforcement::Strict`] before the first test executes.

use std::sync::atomic::{AtomicU8, Ordering};

use once_cell::sync::OnceCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Enforcement {
    Off = 0,
    Warn = 1,
    Strict = 2,
}

impl Enforcement {
    fn from_u8(level: u8) -> Self {
        match level {
            0 => Enforcement::Off,
            1 => Enforcement::Warn,
            _ => Enforcement::Strict,
        }
    }
}

static LEVEL: AtomicU8 = AtomicU8::new(Enforcement::Warn as u8);
static STRICT_INIT: OnceCell<()> = OnceCell::new();

pub fn enforcement() -> Enforcement {
    Enforcement::from_u8(LEVEL.load(Ordering::Relaxed))
}

pub fn set_enforcement(level: Enforcement) {
    LEVEL.store(level as u8, Ordering::Relaxed);
}

/// Switches the process to strict enforcement. Only the first call has an effect.
pub fn enforce_strict() {
    STRICT_INIT.get_or_init(|| {
        tracing::debug!("contract enforcement raised to strict");
        set_enforcement(Enforcement::Strict);
    });
}

/// Checks a contract; `describe` is evaluated only on violation.
#[track_caller]
pub fn check(holds: bool, describe: impl FnOnce() -> String) {
    if holds {
        return;
    }
    match enforcement() {
        Enforcement::Off => {}
        Enforcement::Warn => tracing::warn!("contract violated: {}", describe()),
        Enforcement::Strict => panic!("contract violated: {}", describe()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_round_trip_through_the_atomic() {
        for level in [Enforcement::Off, Enforcement::Warn, Enforcement::Strict] {
            assert_eq!(Enforcement::from_u8(level as u8), level);
        }
    }

    #[test]
    fn holding_contracts_never_describe() {
        check(true, || unreachable!("description built for a holding contract"));
    }

    #[test]
    fn strict_enforcement_panics_on_violation() {
        enforce_strict();
        assert_eq!(enforcement(), Enforcement::Strict);
        let result = std::panic::catch_unwind(|| check(false, || "x > 0".to_string()));
        assert!(result.is_err());
    }
}
