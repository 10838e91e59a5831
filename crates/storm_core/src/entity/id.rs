//! Entity identifier and its generator.

use crate::error::{CoreError, CoreResult};
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A source of random bytes for identifier generation.
///
/// The default is the operating system's entropy source. Tests inject
/// their own source to simulate exhaustion.
pub trait RandomSource: Send + Sync {
    /// Fills `dest` entirely with random bytes.
    ///
    /// # Errors
    ///
    /// Returns a description of the failure if the source cannot supply
    /// enough bytes. Partial fills count as failures.
    fn fill(&self, dest: &mut [u8]) -> Result<(), String>;
}

/// Random bytes from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&self, dest: &mut [u8]) -> Result<(), String> {
        OsRng.try_fill_bytes(dest).map_err(|e| e.to_string())
    }
}

/// Unique identifier for an entity.
///
/// Generated identifiers are 128-bit values laid out as version-4 UUIDs
/// and rendered as 36 lower-case hex characters in 8-4-4-4-12 groups.
/// They are only a fallback: records that provide their own identity
/// never see one.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId([u8; 16]);

impl EntityId {
    /// Creates an entity ID from raw bytes.
    #[inline]
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Generates a new random entity ID from `source`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RandomSource`] if the source cannot supply
    /// 16 bytes. No identifier is produced in that case.
    pub fn generate(source: &dyn RandomSource) -> CoreResult<Self> {
        let mut bytes = [0u8; 16];
        source.fill(&mut bytes).map_err(CoreError::random_source)?;
        bytes[8] = (bytes[8] | 0x80) & 0xBF;
        bytes[6] = (bytes[6] | 0x40) & 0x4F;
        Ok(Self(bytes))
    }

    /// Returns the raw bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Converts to a UUID.
    #[must_use]
    pub fn to_uuid(&self) -> Uuid {
        Uuid::from_bytes(self.0)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.to_uuid())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uuid().hyphenated())
    }
}

impl FromStr for EntityId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self::from)
    }
}

impl From<Uuid> for EntityId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid.into_bytes())
    }
}

impl From<EntityId> for Uuid {
    fn from(id: EntityId) -> Self {
        id.to_uuid()
    }
}

impl From<[u8; 16]> for EntityId {
    fn from(bytes: [u8; 16]) -> Self {
        Self::from_bytes(bytes)
    }
}
