//! Port finder
//! Scans upward from a base port for one that can be bound on loopback

use crate::constants::cluster::BASE_PORT;
use crate::domain::ports::PortAllocator;
use crate::domain::DomainError;
use async_trait::async_trait;
use std::net::{Ipv4Addr, TcpListener};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Hands out bindable ports starting at `base`.
///
/// A cursor moves past every port returned, so two calls in a row never
/// return the same port even though neither is bound yet. The scan wraps
/// from 65535 back to `base`.
#[derive(Debug)]
pub struct PortFinder {
    base: u16,
    cursor: Mutex<u16>,
}

impl PortFinder {
    pub fn new(base: u16) -> Self {
        Self {
            base,
            cursor: Mutex::new(base),
        }
    }

    pub fn base(&self) -> u16 {
        self.base
    }

    fn next_after(&self, port: u16) -> u16 {
        if port == u16::MAX { self.base } else { port + 1 }
    }
}

impl Default for PortFinder {
    fn default() -> Self {
        Self::new(BASE_PORT)
    }
}

#[async_trait]
impl PortAllocator for PortFinder {
    async fn find_port(&self) -> Result<u16, DomainError> {
        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        let start = *cursor;
        let mut candidate = start;
        loop {
            let bindable = TcpListener::bind((Ipv4Addr::LOCALHOST, candidate)).is_ok();
            let next = self.next_after(candidate);
            if bindable {
                *cursor = next;
                debug!(port = candidate, "Found available port");
                return Ok(candidate);
            }
            candidate = next;
            if candidate == start {
                return Err(DomainError::PortAllocation(format!(
                    "no bindable port between {} and {}",
                    self.base,
                    u16::MAX
                )));
            }
        }
    }
}
