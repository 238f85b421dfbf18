// Copyright (c) 2026 Identity Federation Team
// SPDX-License-Identifier: AGPL-3.0

pub mod attribute_mapper;
pub mod capability_synthesizer;
pub mod pipeline;
