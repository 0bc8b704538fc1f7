//! Friend requests and friendships.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use circle_db::queries::{friends, users};
use circle_db::{Connection, Database, FriendRecord, RequestRecord};
use circle_media::MediaStore;
use circle_models::{
    FriendPair, FriendRequest, FriendRequestId, FriendRequestStatus, User, UserId,
};

use crate::error::{ApiError, ApiResult};
use crate::metrics;

/// A pending request as seen by its receiver.
#[derive(Debug, Clone, Serialize)]
pub struct IncomingRequest {
    pub id: FriendRequestId,
    pub sender_username: String,
    pub sender_email: String,
    pub status: FriendRequestStatus,
    pub created_at: DateTime<Utc>,
}

impl From<RequestRecord> for IncomingRequest {
    fn from(record: RequestRecord) -> Self {
        Self {
            id: record.request.id,
            sender_username: record.counterpart.username,
            sender_email: record.counterpart.email,
            status: record.request.status,
            created_at: record.request.created_at,
        }
    }
}

/// A pending request as seen by its sender.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingRequest {
    pub id: FriendRequestId,
    pub receiver_username: String,
    pub receiver_email: String,
    pub status: FriendRequestStatus,
    pub created_at: DateTime<Utc>,
}

impl From<RequestRecord> for OutgoingRequest {
    fn from(record: RequestRecord) -> Self {
        Self {
            id: record.request.id,
            receiver_username: record.counterpart.username,
            receiver_email: record.counterpart.email,
            status: record.request.status,
            created_at: record.request.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FriendView {
    pub id: UserId,
    pub username: String,
    pub email: String,
    /// Media URL
    pub profile_picture: Option<String>,
    pub since: DateTime<Utc>,
}

/// Friend request state machine and friendship bookkeeping.
#[derive(Clone)]
pub struct FriendService {
    db: Arc<Database>,
    media: Arc<MediaStore>,
}

fn request_not_found() -> ApiError {
    ApiError::not_found("Friend request not found.")
}

impl FriendService {
    pub fn new(db: Arc<Database>, media: Arc<MediaStore>) -> Self {
        Self { db, media }
    }

    fn find_user(&self, username: &str) -> ApiResult<User> {
        self.db
            .with_conn(|conn| users::get_user_by_username(conn, username))?
            .ok_or_else(|| ApiError::not_found("User not found."))
    }

    /// Send a request to `username`. A previously rejected request between
    /// the pair is discarded and replaced.
    pub fn send(&self, sender: &User, username: &str) -> ApiResult<FriendRequest> {
        let receiver = self.find_user(username)?;
        if receiver.id == sender.id {
            return Err(ApiError::bad_request(
                "You cannot send friend request to yourself.",
            ));
        }

        let request = self.db.with_tx(|tx| -> ApiResult<FriendRequest> {
            if friends::are_friends(tx, sender.id, receiver.id)? {
                return Err(ApiError::bad_request("You are already friends."));
            }

            let existing = friends::requests_between(tx, sender.id, receiver.id)?;
            if existing.iter().any(|r| r.status.blocks_new_request()) {
                return Err(ApiError::bad_request("Friend request already exists."));
            }
            for stale in &existing {
                friends::delete_request(tx, stale.id)?;
            }

            friends::insert_request(tx, sender.id, receiver.id).map_err(|e| {
                if e.is_conflict() {
                    ApiError::bad_request("Friend request already exists.")
                } else {
                    e.into()
                }
            })
        })?;

        info!(
            request_id = %request.id,
            sender = %sender.id,
            receiver = %receiver.id,
            "Friend request sent"
        );
        metrics::record_friend_request("sent");
        Ok(request)
    }

    pub fn incoming(&self, user: &User) -> ApiResult<Vec<IncomingRequest>> {
        let records = self
            .db
            .with_conn(|conn| friends::incoming_requests(conn, user.id))?;
        Ok(records.into_iter().map(IncomingRequest::from).collect())
    }

    pub fn outgoing(&self, user: &User) -> ApiResult<Vec<OutgoingRequest>> {
        let records = self
            .db
            .with_conn(|conn| friends::outgoing_requests(conn, user.id))?;
        Ok(records.into_iter().map(OutgoingRequest::from).collect())
    }

    /// Accept a pending request addressed to `user` and create the friendship.
    pub fn accept(&self, user: &User, id: FriendRequestId) -> ApiResult<FriendRequest> {
        let request = self.db.with_tx(|tx| -> ApiResult<FriendRequest> {
            let mut request = pending_for_receiver(tx, user.id, id)?;
            friends::set_request_status(tx, id, FriendRequestStatus::Accepted)?;
            match friends::insert_friendship(tx, FriendPair::new(request.sender, request.receiver)) {
                Err(e) if e.is_conflict() => {}
                other => {
                    other?;
                }
            }
            request.status = FriendRequestStatus::Accepted;
            Ok(request)
        })?;

        info!(request_id = %id, user_id = %user.id, "Friend request accepted");
        metrics::record_friend_request("accepted");
        Ok(request)
    }

    /// Reject a pending request addressed to `user`.
    pub fn reject(&self, user: &User, id: FriendRequestId) -> ApiResult<FriendRequest> {
        let request = self.db.with_tx(|tx| -> ApiResult<FriendRequest> {
            let mut request = pending_for_receiver(tx, user.id, id)?;
            friends::set_request_status(tx, id, FriendRequestStatus::Rejected)?;
            request.status = FriendRequestStatus::Rejected;
            Ok(request)
        })?;

        info!(request_id = %id, user_id = %user.id, "Friend request rejected");
        metrics::record_friend_request("rejected");
        Ok(request)
    }

    /// Withdraw a pending request sent by `user`.
    pub fn cancel(&self, user: &User, id: FriendRequestId) -> ApiResult<()> {
        self.db.with_tx(|tx| -> ApiResult<()> {
            let request = friends::get_request(tx, id)?
                .filter(|r| r.sender == user.id)
                .ok_or_else(request_not_found)?;
            if request.status != FriendRequestStatus::Pending {
                return Err(ApiError::bad_request(format!(
                    "This request has already been {}.",
                    request.status
                )));
            }
            friends::delete_request(tx, id)?;
            Ok(())
        })?;

        info!(request_id = %id, user_id = %user.id, "Friend request cancelled");
        metrics::record_friend_request("cancelled");
        Ok(())
    }

    pub fn list(&self, user: &User) -> ApiResult<Vec<FriendView>> {
        let records = self
            .db
            .with_conn(|conn| friends::list_friends(conn, user.id))?;
        Ok(records
            .into_iter()
            .map(|FriendRecord { friend, since }| FriendView {
                id: friend.id,
                profile_picture: friend.profile_picture.as_deref().map(|p| self.media.url(p)),
                username: friend.username,
                email: friend.email,
                since,
            })
            .collect())
    }

    /// End a friendship and clear every request between the pair so they
    /// can befriend each other again later.
    pub fn unfriend(&self, user: &User, username: &str) -> ApiResult<()> {
        let other = self.find_user(username)?;
        self.db.with_tx(|tx| -> ApiResult<()> {
            if !friends::delete_friendship(tx, FriendPair::new(user.id, other.id))? {
                return Err(ApiError::not_found("You are not friends with this user."));
            }
            friends::delete_requests_between(tx, user.id, other.id)?;
            Ok(())
        })?;

        info!(user_id = %user.id, other = %other.id, "Friendship removed");
        Ok(())
    }
}

/// The request `id` if it is addressed to `receiver` and still pending.
fn pending_for_receiver(
    conn: &Connection,
    receiver: UserId,
    id: FriendRequestId,
) -> ApiResult<FriendRequest> {
    let request = friends::get_request(conn, id)?
        .filter(|r| r.receiver == receiver)
        .ok_or_else(request_not_found)?;
    if request.status != FriendRequestStatus::Pending {
        return Err(ApiError::bad_request(format!(
            "This request has already been {}.",
            request.status
        )));
    }
    Ok(request)
}
