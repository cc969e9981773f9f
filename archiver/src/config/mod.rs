//! Archiver configuration loaded from the environment.

mod archive_config;


pub use archive_config::ArchiveConfig;
