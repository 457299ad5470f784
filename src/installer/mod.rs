// SPDX-License-Identifier: GPL-3.0-only
pub mod archive;
pub mod client;
pub mod extract;
pub mod traits;

pub use archive::ArchiveInstaller;
pub use client::HttpClient;
pub use traits::Installer;
