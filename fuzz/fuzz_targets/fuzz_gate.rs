//! Fuzz testing for the gate's decision surfaces.
//!
//! This fuzz target feeds arbitrary bytes into the rate-limit store and the
//! API key verifier. It ensures that:
//!
//! - Neither surface ever panics, whatever the identity or key bytes
//! - Limiter decisions stay internally consistent (`remaining <= limit`)
//! - Key verification handles empty, long, and non-ASCII inputs
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! # Install cargo-fuzz (requires nightly)
//! cargo +nightly install cargo-fuzz
//!
//! # Run the gate fuzz target
//! cargo +nightly fuzz run fuzz_gate
//!
//! # Run with a time limit (e.g., 60 seconds)
//! cargo +nightly fuzz run fuzz_gate -- -max_total_time=60
//! ```

#![no_main]

use apiguard::{Authenticator, InMemoryStore, RateLimitStore};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Arbitrary identity strings must never break the store
        let store = InMemoryStore::new();
        let decision = store.check(s, 10, 60, 1_700_000_000.0);
        assert!(decision.remaining <= decision.limit);

        // Key verification shouldn't panic on any candidate key,
        // including keys shorter than the truncated-prefix length
        let auth = Authenticator::new(vec!["fuzz-reference-key".to_string()]);
        let _ = auth.verify_api_key(Some(s));
        let _ = auth
            .verify_api_key(Some("fuzz-reference-key"))
            .and_then(|key| auth.authenticate(key, None));
    }

    // Numeric boundaries: limit/window/now from raw bytes
    if data.len() >= 8 {
        let limit = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let window = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        let now = f64::from(limit) * 0.5;

        let store = InMemoryStore::new();
        let decision = store.check("boundary", limit, window, now);
        assert!(decision.remaining <= decision.limit.max(1));
    }
});
