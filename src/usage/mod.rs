// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Resource usage samples and unit normalization.

pub mod normalizer;

pub use normalizer::{cpu_millicores, memory_mebibytes, NormalizedUsage, RawUsage};
