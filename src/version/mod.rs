// SPDX-License-Identifier: GPL-3.0-only
pub mod tag;

pub use tag::{compare, VersionTag};
