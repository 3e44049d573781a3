// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn parses_millisecond_literal_delays() {
    assert_eq!(parse_literal_delay("250ms"), Some(Duration::from_millis(250)));
}

#[test]
fn parses_second_literal_delays() {
    assert_eq!(parse_literal_delay("2s"), Some(Duration::from_secs(2)));
}

#[test]
fn registered_delay_alias_takes_precedence() {
    let resolver: MapResolver<()> = MapResolver::new().with_delay("TIMER", Duration::from_millis(10));
    assert_eq!(resolver.delay("TIMER"), Some(Duration::from_millis(10)));
}

#[test]
fn unregistered_non_literal_delay_resolves_to_none() {
    let resolver: MapResolver<()> = MapResolver::new();
    assert_eq!(resolver.delay("not-a-delay"), None);
}
