// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! The kanban page patch layer: markup repair, card filtering, the injected
//! tag filter control and the loop that keeps them applied while the host
//! re-renders.

pub mod context;
pub mod filter;
pub mod interceptor;
pub mod observer;
pub mod repair;
pub mod select;
pub mod snapshot;
pub mod toolbar;

pub use context::{EngineReport, PageContext, PageSettings};
pub use filter::{FilterReport, FilterSelection};
pub use interceptor::{
    HostRequest, HostResponse, InterceptingTransport, RefreshMatcher, Transport, TransportError,
};
pub use observer::ObservationLoop;
pub use repair::RepairReport;
pub use select::{HttpLookupSource, LookupClientError, LookupSource, TagSelect};
pub use snapshot::{BoardSnapshot, SnapshotError};
pub use toolbar::InjectOutcome;
