/// Canonical settings key constants for the `app_settings` table.
///
/// Use these instead of raw string literals to prevent typo-based key mismatches.

/// Display name of the signed-in user, attributed on history and activity rows.
pub const CURRENT_USER: &str = "current_user";

/// Date (`YYYY-MM-DD`) of the last completed auto-switch sweep.
pub const LAST_AUTO_SWITCH_SWEEP: &str = "last_auto_switch_sweep";
