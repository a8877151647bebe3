// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The resolution pipeline: frontend (wire parsing, transport), backend
//! (storage lookup, CNAME walk, upstream fall-through, rule application),
//! and the upstream forwarding client.

pub mod backend;
pub mod frontend;
pub mod upstream;

pub use backend::{Backend, ResolutionOutcome};
pub use frontend::Frontend;
pub use upstream::UpstreamClient;
