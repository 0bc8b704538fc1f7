//! Friend requests and friendships.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;
use crate::ids::{FriendRequestId, UserId};

/// Lifecycle of a friend request.
///
/// `Pending` is the only state that can transition; `Accepted` and
/// `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum FriendRequestStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl FriendRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FriendRequestStatus::Pending => "pending",
            FriendRequestStatus::Accepted => "accepted",
            FriendRequestStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, FriendRequestStatus::Pending)
    }

    /// Whether a request in this state prevents a new request between the same pair.
    pub fn blocks_new_request(&self) -> bool {
        !matches!(self, FriendRequestStatus::Rejected)
    }
}

impl FromStr for FriendRequestStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(FriendRequestStatus::Pending),
            "accepted" => Ok(FriendRequestStatus::Accepted),
            "rejected" => Ok(FriendRequestStatus::Rejected),
            other => Err(ModelError::InvalidStatus(other.to_string())),
        }
    }
}

impl fmt::Display for FriendRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A directed request from `sender` to `receiver`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FriendRequest {
    pub id: FriendRequestId,
    pub sender: UserId,
    pub receiver: UserId,
    pub status: FriendRequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FriendRequest {
    /// Whether the request connects `a` and `b` in either direction.
    pub fn connects(&self, a: UserId, b: UserId) -> bool {
        FriendPair::new(self.sender, self.receiver) == FriendPair::new(a, b)
    }
}

/// Unordered pair of users, stored with the lower id first.
///
/// Normalizing the orientation lets a single unique index on
/// `(user1, user2)` reject both `(a, b)` and `(b, a)` duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FriendPair {
    low: UserId,
    high: UserId,
}

impl FriendPair {
    pub fn new(a: UserId, b: UserId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn user1(&self) -> UserId {
        self.low
    }

    pub fn user2(&self) -> UserId {
        self.high
    }

    pub fn contains(&self, user: UserId) -> bool {
        self.low == user || self.high == user
    }

    /// The member of the pair that is not `me`.
    pub fn other(&self, me: UserId) -> UserId {
        if self.low == me {
            self.high
        } else {
            self.low
        }
    }
}

/// An accepted friendship between two users.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Friendship {
    pub user1: UserId,
    pub user2: UserId,
    pub created_at: DateTime<Utc>,
}

impl Friendship {
    pub fn pair(&self) -> FriendPair {
        FriendPair::new(self.user1, self.user2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_is_orientation_independent() {
        let a = UserId(9);
        let b = UserId(3);
        assert_eq!(FriendPair::new(a, b), FriendPair::new(b, a));
        assert_eq!(FriendPair::new(a, b).user1(), b);
        assert_eq!(FriendPair::new(a, b).user2(), a);
    }

    #[test]
    fn test_pair_other() {
        let pair = FriendPair::new(UserId(1), UserId(2));
        assert_eq!(pair.other(UserId(1)), UserId(2));
        assert_eq!(pair.other(UserId(2)), UserId(1));
        assert!(pair.contains(UserId(2)));
        assert!(!pair.contains(UserId(5)));
    }

    #[test]
    fn test_status_transitions() {
        assert!(!FriendRequestStatus::Pending.is_terminal());
        assert!(FriendRequestStatus::Accepted.is_terminal());
        assert!(FriendRequestStatus::Pending.blocks_new_request());
        assert!(FriendRequestStatus::Accepted.blocks_new_request());
        assert!(!FriendRequestStatus::Rejected.blocks_new_request());
        assert_eq!("accepted".parse::<FriendRequestStatus>(), Ok(FriendRequestStatus::Accepted));
        assert!("ACCEPTED".parse::<FriendRequestStatus>().is_err());
    }

    #[test]
    fn test_request_connects_both_directions() {
        let request = FriendRequest {
            id: FriendRequestId(1),
            sender: UserId(1),
            receiver: UserId(2),
            status: FriendRequestStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(request.connects(UserId(2), UserId(1)));
        assert!(!request.connects(UserId(1), UserId(3)));
    }
}
