/// Business logic layer
///
/// Services are cheap to construct (they hold a pool handle) and are built per
/// request from `AppState`.
pub mod avatar;
pub mod feed;
pub mod identity;
pub mod likes;
pub mod oauth;
pub mod posts;

pub use feed::FeedAssembler;
pub use identity::{CurrentSession, ExternalLogin, IdentityService};
pub use likes::LikeService;
pub use oauth::{GoogleProvider, IdentityProvider};
pub use posts::{NewPost, PostService};
