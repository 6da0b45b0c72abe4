/// Common types and utilities for jet image processing
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::{PI, TAU};
use std::fmt;

/// A particle belonging to a jet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Constituent {
    /// Transverse momentum
    pub pt: f64,
    /// Pseudorapidity
    pub eta: f64,
    /// Azimuthal angle in radians
    pub phi: f64,
}

impl Constituent {
    #[must_use]
    pub fn new(pt: f64, eta: f64, phi: f64) -> Self {
        Self { pt, eta, phi }
    }
}

/// A reconstructed jet: an axis, a momentum and its constituent particles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Jet {
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    /// Constituents in reconstruction order
    #[serde(default)]
    pub constituents: Vec<Constituent>,
}

impl Jet {
    /// Create a jet without constituents
    #[must_use]
    pub fn new(pt: f64, eta: f64, phi: f64) -> Self {
        Self {
            pt,
            eta,
            phi,
            constituents: Vec::new(),
        }
    }

    /// Builder-style helper to attach constituents
    #[must_use]
    pub fn with_constituents(mut self, constituents: Vec<Constituent>) -> Self {
        self.constituents = constituents;
        self
    }

    /// Offset of a constituent from the jet axis as `(deta, dphi)`
    #[must_use]
    #[inline]
    pub fn offset_of(&self, constituent: &Constituent) -> (f64, f64) {
        (
            constituent.eta - self.eta,
            delta_phi(constituent.phi, self.phi),
        )
    }
}

/// Minimal signed angular difference `phi1 - phi2`, wrapped into `(-π, π]`
#[must_use]
#[inline]
pub fn delta_phi(phi1: f64, phi2: f64) -> f64 {
    let result = phi1 - phi2;
    if !result.is_finite() || (result > -PI && result <= PI) {
        return result;
    }
    // Exact remainder, one correction at most
    let reduced = result % TAU;
    if reduced > PI {
        reduced - TAU
    } else if reduced <= -PI {
        reduced + TAU
    } else {
        reduced
    }
}

/// Event identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId {
    pub run: u32,
    #[serde(default)]
    pub lumi: u32,
    pub event: u64,
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.run, self.lumi, self.event)
    }
}

/// One collision event with its named jet collections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    /// Jet collections keyed by tag (e.g. "slimmedJetsAK8")
    #[serde(default)]
    pub jets: BTreeMap<String, Vec<Jet>>,
}

impl Event {
    #[must_use]
    pub fn new(id: EventId) -> Self {
        Self {
            id,
            jets: BTreeMap::new(),
        }
    }

    /// Builder-style helper to add a jet collection
    #[must_use]
    pub fn with_collection(mut self, tag: impl Into<String>, jets: Vec<Jet>) -> Self {
        self.jets.insert(tag.into(), jets);
        self
    }

    /// Look up a jet collection by tag
    #[must_use]
    pub fn jets(&self, tag: &str) -> Option<&[Jet]> {
        self.jets.get(tag).map(Vec::as_slice)
    }
}
