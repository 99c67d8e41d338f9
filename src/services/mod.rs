pub mod cache;
pub mod classifier;
pub mod fingerprint;
pub mod fs_service;
pub mod gallery;
pub mod index;
pub mod live;
pub mod title;
pub mod watcher;
