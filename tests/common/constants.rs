//! Shared constants for end-to-end tests
//!
//! When fixture data changes, update only this file.

// ============================================================================
// Test User Credentials
// ============================================================================

/// Handle of the user allowed to upload scores
pub const TEST_USER: &str = "testuser";

/// Password of the test user
pub const TEST_PASS: &str = "testpass123";

// ============================================================================
// Test Catalog
// ============================================================================

/// Number of pieces inserted in the test catalog
pub const PIECES_COUNT: usize = 25;

/// Pieces whose period is "Baroque"
pub const BAROQUE_PIECE_IDS: [i64; 4] = [1, 6, 11, 16];

/// Pieces in "C major"
pub const C_MAJOR_PIECES_COUNT: usize = 8;

/// Period cycle of the fixture rows, id 21 excepted
pub const PERIODS: [&str; 5] = ["Baroque", "Classical", "Romantic", "Modern", "Romantic"];

/// Key cycle of the fixture rows, indexed by `id % 3`
pub const KEYS: [&str; 3] = ["C major", "A minor", "E-flat major"];

/// Difficulty returned by the mock estimator. Piece 8 sits exactly on it.
pub const MOCK_DIFFICULTY: (f64, f64) = (2.0, -4.0);

// ============================================================================
// Timeouts
// ============================================================================

pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 10;

pub const REQUEST_TIMEOUT_SECS: u64 = 10;
