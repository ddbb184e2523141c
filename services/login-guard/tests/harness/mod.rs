// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for login guard attack simulation.
//!
//! Provides scripted collaborators and utilities for replaying credential
//! stuffing and brute-force patterns against the guard.

pub mod attacks;
pub mod fakes;
pub mod generators;
pub mod metrics;
