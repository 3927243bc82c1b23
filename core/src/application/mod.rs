// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod entity_mapper;
pub mod entity_provider;
pub mod scheduler;
pub mod ee_definition_action;

pub use entity_provider::{AapEntityProvider, AapJobTemplateProvider, EntityProvider, ProviderError, SyncSummary};
pub use scheduler::{TaskSchedule, TaskScheduler};
pub use ee_definition_action::{ActionError, EeDefinitionAction, EeDefinitionInput, EeDefinitionOutput};
