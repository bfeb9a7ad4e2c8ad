// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reference inference provider implementations. Concrete model SDKs are
//! external collaborators; `echo` is the one registered provider kind the
//! `cohort` binary ships, useful for local development and integration tests.

pub mod echo;

pub use echo::EchoProvider;
