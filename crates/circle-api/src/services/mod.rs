//! Business logic services.

pub mod friends;
pub mod posts;
pub mod profiles;
pub mod users;

pub use friends::FriendService;
pub use posts::PostService;
pub use profiles::ProfileService;
pub use users::UserService;
