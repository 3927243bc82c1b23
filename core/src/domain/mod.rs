// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain types shared by the client, providers and scaffolder action.

pub mod aap;
pub mod catalog;
pub mod config;
pub mod ee_definition;
pub mod platform;
