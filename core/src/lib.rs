// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! rhaap core
//!
//! Ansible Automation Platform integration for a software catalog: the AAP
//! REST client, the entity providers that publish organizations, teams,
//! users and job templates as catalog entities, and the scaffolder action
//! that generates execution environment definitions.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Library consumed by the `rhaap` CLI

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
