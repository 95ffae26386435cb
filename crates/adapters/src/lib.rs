// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters binding the pipeline's external collaborators: artdaqDB,
//! UconDB, the FCL preparer, and the Carbon metrics sink.

mod artdaq;
mod carbon;
mod preparer;
pub mod subprocess;
mod traits;
mod ucondb;

pub use artdaq::{ArtdaqDbConfig, RealArtdaqDbClient};
pub use carbon::{CarbonClient, CarbonConfig};
pub use preparer::{FclPreparer, FclPreparerConfig};
pub use traits::{ArtdaqDbClient, RunPreparer, UconDbClient, UploadOutcome};
pub use ucondb::{RealUconDbClient, UconDbConfig};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fakes;
#[cfg(any(test, feature = "test-support"))]
pub use fakes::{FakeArtdaqDbClient, FakeRunPreparer, FakeUconDbClient, Scripted};
