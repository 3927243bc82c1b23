// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod aap_client;
pub mod catalog_store;
pub mod schema_validator;
pub mod template_engine;

pub use aap_client::{AapClient, AapClientBuilder, AuthenticatedAapClient, CleanupTargets, PollConfig};
pub use catalog_store::{CatalogConnection, LocalCatalog};
