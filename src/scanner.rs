//! Candidate port iteration for the handshake.

use crate::error::LinkError;
use crate::serial::SerialTransport;
use log::{info, warn};

/// Walks the enumerated ports from the last index down to 0, then
/// re-enumerates and starts again. Never runs out on its own.
pub struct PortScanner {
    ports: Vec<String>,
    cursor: Option<usize>,
    preferred: Option<String>,
}

impl PortScanner {
    pub fn new(preferred: Option<String>) -> Self {
        let preferred = preferred
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        Self {
            ports: Vec::new(),
            cursor: None,
            preferred,
        }
    }

    pub fn preferred(&self) -> Option<&str> {
        self.preferred.as_deref()
    }

    /// Re-enumerates and points the cursor at the last port.
    ///
    /// A preferred port that is present is moved to the end so it is tried first.
    pub fn refresh<T: SerialTransport + ?Sized>(&mut self, transport: &T) -> Result<(), LinkError> {
        let mut ports = transport.list_ports()?;
        info!("Available serial ports: {:?}", ports);
        if ports.is_empty() {
            self.ports.clear();
            self.cursor = None;
            return Err(LinkError::NoPortsAvailable);
        }

        if let Some(preferred) = &self.preferred {
            match ports.iter().position(|p| p == preferred) {
                Some(idx) => {
                    let port = ports.remove(idx);
                    ports.push(port);
                }
                None => warn!("Preferred port {} is not present", preferred),
            }
        }

        self.cursor = Some(ports.len() - 1);
        self.ports = ports;
        Ok(())
    }

    /// Returns the next candidate, re-enumerating when the sweep is exhausted.
    pub fn next_candidate<T: SerialTransport + ?Sized>(
        &mut self,
        transport: &T,
    ) -> Result<String, LinkError> {
        if self.cursor.is_none() {
            self.refresh(transport)?;
        }
        let idx = self.cursor.ok_or(LinkError::NoPortsAvailable)?;
        let candidate = self.ports[idx].clone();
        self.cursor = idx.checked_sub(1);
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    struct Listing(RefCell<VecDeque<Vec<&'static str>>>);

    impl Listing {
        fn new(listings: Vec<Vec<&'static str>>) -> Self {
            Listing(RefCell::new(listings.into()))
        }
    }

    impl SerialTransport for Listing {
        fn list_ports(&self) -> Result<Vec<String>, LinkError> {
            let mut listings = self.0.borrow_mut();
            let next = if listings.len() > 1 {
                listings.pop_front().unwrap_or_default()
            } else {
                listings.front().cloned().unwrap_or_default()
            };
            Ok(next.into_iter().map(String::from).collect())
        }

        fn open(
            &self,
            port: &str,
            _baud_rate: u32,
        ) -> Result<Box<dyn crate::serial::SerialLink>, LinkError> {
            Err(LinkError::TransportOpen {
                port: port.to_string(),
                reason: "not used".to_string(),
            })
        }
    }

    #[test]
    fn test_scan_runs_backwards_then_wraps() {
        let transport = Listing::new(vec![vec!["A", "B", "C"], vec!["A", "B", "C", "D"]]);
        let mut scanner = PortScanner::new(None);

        let order: Vec<String> = (0..7)
            .map(|_| scanner.next_candidate(&transport).unwrap())
            .collect();
        assert_eq!(order, vec!["C", "B", "A", "D", "C", "B", "A"]);
    }

    #[test]
    fn test_empty_enumeration_is_fatal() {
        let transport = Listing::new(vec![vec![]]);
        let mut scanner = PortScanner::new(None);
        assert!(matches!(
            scanner.next_candidate(&transport),
            Err(LinkError::NoPortsAvailable)
        ));
    }

    #[test]
    fn test_ports_vanishing_on_rescan_is_fatal() {
        let transport = Listing::new(vec![vec!["A"], vec![]]);
        let mut scanner = PortScanner::new(None);
        assert_eq!(scanner.next_candidate(&transport).unwrap(), "A");
        assert!(scanner.next_candidate(&transport).is_err());
    }

    struct Broken;

    impl SerialTransport for Broken {
        fn list_ports(&self) -> Result<Vec<String>, LinkError> {
            Err(LinkError::Enumeration("udev unavailable".to_string()))
        }

        fn open(
            &self,
            port: &str,
            _baud_rate: u32,
        ) -> Result<Box<dyn crate::serial::SerialLink>, LinkError> {
            Err(LinkError::TransportOpen {
                port: port.to_string(),
                reason: "not used".to_string(),
            })
        }
    }

    #[test]
    fn test_enumeration_error_is_not_fatal_and_rescans() {
        let mut scanner = PortScanner::new(None);
        let err = scanner.next_candidate(&Broken).unwrap_err();
        assert!(matches!(err, LinkError::Enumeration(_)));
        assert!(!err.is_fatal());

        let transport = Listing::new(vec![vec!["A", "B"]]);
        assert_eq!(scanner.next_candidate(&transport).unwrap(), "B");
    }

    #[test]
    fn test_preferred_port_goes_first() {
        let transport = Listing::new(vec![vec!["A", "B", "C"]]);
        let mut scanner = PortScanner::new(Some("A\n".to_string()));
        assert_eq!(scanner.preferred(), Some("A"));

        let order: Vec<String> = (0..3)
            .map(|_| scanner.next_candidate(&transport).unwrap())
            .collect();
        assert_eq!(order, vec!["A", "C", "B"]);
    }

    #[test]
    fn test_missing_or_blank_preference_is_ignored() {
        let transport = Listing::new(vec![vec!["A", "B"]]);
        let mut scanner = PortScanner::new(Some("Z".to_string()));
        assert_eq!(scanner.next_candidate(&transport).unwrap(), "B");

        assert_eq!(PortScanner::new(Some("  ".to_string())).preferred(), None);
    }
}
