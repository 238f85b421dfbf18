// Copyright (c) 2026 Identity Federation Team
// SPDX-License-Identifier: AGPL-3.0

pub mod rpc_adapter;
pub mod rpc_connector;
