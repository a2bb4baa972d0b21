//! Common test utilities
//!
//! This module provides shared functionality for integration tests including:
//! - Disk image stand-ins for block devices
//! - Directory tree fixtures and content checks
#![allow(dead_code)]

pub mod mock_drive;
pub mod test_helpers;
