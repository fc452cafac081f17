//! Serialization of verbosity configuration (requires the `serde` feature).

#![cfg(feature = "serde")]

use logging::{Subsystem, VerbosityConfig};

#[test]
fn verbosity_config_round_trips_through_json() {
    let config = VerbosityConfig::from_verbose_level(2).with_level(Subsystem::Match, 3);
    let json = serde_json::to_string(&config).expect("serialize");
    assert!(json.contains("\"matching\":3"));
    let parsed: VerbosityConfig = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(parsed, config);
}
