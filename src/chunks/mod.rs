// Copyright (c) 2019-2026 Audio File Library Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Chunk framing and per-chunk payload handlers.

pub mod aiff;
pub mod framer;
