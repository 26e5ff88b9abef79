// Time types used across the project.
//
// Ledger time is always taken from momentum timestamps, never from the
// system clock, so that production stays deterministic.

// Seconds timestamps used to determine it using its type
pub type TimestampSeconds = u64;

