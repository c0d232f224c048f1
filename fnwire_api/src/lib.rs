// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-License-Identifier: MIT

pub mod client;
pub mod definitions;
pub mod discovery;
pub mod dispatcher;
pub mod method;
pub mod util;
