//! Archive extraction functionality.
//!
//! This module turns a cached release artifact (a zip file) into a directory
//! tree on disk, preserving the archive's internal paths and file modes.

pub mod zip;

pub use zip::{extract, ZipArchive, ZipFileInfo};
