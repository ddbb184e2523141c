// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators for attack simulation.

use std::net::{IpAddr, Ipv4Addr};

/// Generate a pool of IP addresses for testing.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// Generate a credential-stuffing wordlist.
pub fn generate_passwords(count: usize) -> Vec<String> {
    const COMMON: &[&str] = &[
        "123456", "password", "qwerty", "letmein", "admin", "welcome", "iloveyou", "monkey",
    ];
    (0..count)
        .map(|i| match COMMON.get(i) {
            Some(p) => p.to_string(),
            None => format!("guess-{i}"),
        })
        .collect()
}

/// Generate account emails for spray attacks.
pub fn generate_emails(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("staff-{i}@stress-room.example"))
        .collect()
}

/// Malformed bodies that must be rejected before any store access.
pub fn generate_malformed_credentials() -> Vec<(Option<&'static str>, Option<&'static str>)> {
    vec![
        (None, None),
        (None, Some("hunter2")),
        (Some("admin@stress-room.example"), None),
        (Some(""), Some("hunter2")),
        (Some("   "), Some("hunter2")),
        (Some("admin@stress-room.example"), Some("")),
    ]
}
