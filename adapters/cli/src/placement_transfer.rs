use std::{error::Error, fmt};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use cluster_conductor_core::{MoveOutcome, NodeId, PodId, SessionError};
use cluster_conductor_system_session::{Session, SessionSnapshot};
use serde::{Deserialize, Serialize};

const SNAPSHOT_DOMAIN: &str = "cluster";
const SNAPSHOT_VERSION: &str = "v1";

/// Identifier prefix emitted before the level ordinal and payload.
pub(crate) const SNAPSHOT_HEADER: &str = "cluster:v1";
/// Delimiter used to separate the prefix, level ordinal and payload.
const FIELD_DELIMITER: char = ':';

/// Pod placement of a single level, transferable as one line of text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct PlacementSnapshot {
    /// 1-based position of the level within the catalog.
    pub(crate) ordinal: usize,
    /// Scheduled pods in level order.
    pub(crate) placements: Vec<Placement>,
}

/// Single pod-to-node assignment captured within a placement snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Placement {
    pub(crate) pod: PodId,
    pub(crate) node: NodeId,
}

impl PlacementSnapshot {
    /// Captures the scheduled pods of the loaded level, if a level is loaded.
    #[must_use]
    pub(crate) fn capture(state: &SessionSnapshot) -> Option<Self> {
        let index = state.level_index?;
        let placements = state
            .pods
            .iter()
            .filter_map(|pod| {
                pod.node.as_ref().map(|node| Placement {
                    pod: pod.id.clone(),
                    node: node.clone(),
                })
            })
            .collect();

        Some(Self {
            ordinal: index + 1,
            placements,
        })
    }

    /// Encodes the snapshot into a single-line string.
    pub(crate) fn encode(&self) -> Result<String, PlacementTransferError> {
        let json =
            serde_json::to_vec(&self.placements).map_err(PlacementTransferError::Serialize)?;
        let encoded = STANDARD_NO_PAD.encode(json);
        Ok(format!("{SNAPSHOT_HEADER}:{}:{encoded}", self.ordinal))
    }

    /// Decodes a snapshot from the provided string representation.
    pub(crate) fn decode(value: &str) -> Result<Self, PlacementTransferError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(PlacementTransferError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(PlacementTransferError::MissingPrefix)?;
        let version = parts.next().ok_or(PlacementTransferError::MissingVersion)?;
        let ordinal = parts.next().ok_or(PlacementTransferError::MissingOrdinal)?;
        let payload = parts.next().ok_or(PlacementTransferError::MissingPayload)?;

        if domain != SNAPSHOT_DOMAIN {
            return Err(PlacementTransferError::InvalidPrefix(domain.to_owned()));
        }
        if version != SNAPSHOT_VERSION {
            return Err(PlacementTransferError::UnsupportedVersion(
                version.to_owned(),
            ));
        }

        let ordinal = parse_ordinal(ordinal)?;
        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(PlacementTransferError::InvalidEncoding)?;
        let placements: Vec<Placement> =
            serde_json::from_slice(&bytes).map_err(PlacementTransferError::InvalidPayload)?;

        Ok(Self {
            ordinal,
            placements,
        })
    }

    /// Loads the snapshot's level, starts playing it and replays every
    /// placement as a player move.
    pub(crate) fn replay(&self, session: &mut Session) -> Result<Vec<MoveOutcome>, SessionError> {
        session.jump_to_level(self.ordinal - 1)?;
        session.begin()?;

        Ok(self
            .placements
            .iter()
            .map(|placement| session.attempt_move(&placement.pod, &placement.node))
            .collect())
    }
}

/// Errors that can occur while encoding or decoding placement strings.
#[derive(Debug)]
pub(crate) enum PlacementTransferError {
    /// The provided string was empty or contained only whitespace.
    EmptyPayload,
    /// The prefix segment was missing.
    MissingPrefix,
    /// The string did not contain a version segment.
    MissingVersion,
    /// The string did not include the level ordinal.
    MissingOrdinal,
    /// The string did not include the payload segment.
    MissingPayload,
    /// The string used an unexpected prefix segment.
    InvalidPrefix(String),
    /// The string used an unsupported version identifier.
    UnsupportedVersion(String),
    /// The level ordinal was not a positive integer.
    InvalidOrdinal(String),
    /// The base64 payload could not be decoded.
    InvalidEncoding(base64::DecodeError),
    /// The decoded payload could not be deserialised.
    InvalidPayload(serde_json::Error),
    /// The placements could not be serialised.
    Serialize(serde_json::Error),
}

impl fmt::Display for PlacementTransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "placement string was empty"),
            Self::MissingPrefix => write!(f, "placement string is missing the prefix"),
            Self::MissingVersion => write!(f, "placement string is missing the version"),
            Self::MissingOrdinal => write!(f, "placement string is missing the level ordinal"),
            Self::MissingPayload => write!(f, "placement string is missing the payload"),
            Self::InvalidPrefix(prefix) => {
                write!(f, "placement prefix '{prefix}' is not supported")
            }
            Self::UnsupportedVersion(version) => {
                write!(f, "placement version '{version}' is not supported")
            }
            Self::InvalidOrdinal(ordinal) => {
                write!(f, "could not parse level ordinal '{ordinal}'")
            }
            Self::InvalidEncoding(error) => {
                write!(f, "could not decode placement payload: {error}")
            }
            Self::InvalidPayload(error) => {
                write!(f, "could not parse placement payload: {error}")
            }
            Self::Serialize(error) => write!(f, "could not serialise placements: {error}"),
        }
    }
}

impl Error for PlacementTransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEncoding(error) => Some(error),
            Self::InvalidPayload(error) | Self::Serialize(error) => Some(error),
            _ => None,
        }
    }
}

fn parse_ordinal(ordinal: &str) -> Result<usize, PlacementTransferError> {
    match ordinal.trim().parse::<usize>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(PlacementTransferError::InvalidOrdinal(ordinal.to_owned())),
    }
}
