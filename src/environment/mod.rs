// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Declarative environment specification.

pub mod spec;

pub use spec::{EnvironmentSpec, DEFAULT_CPU, DEFAULT_MEMORY};
