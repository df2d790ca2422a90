//! User accounts: records, the public profile, and the [`UserStore`] trait.

mod record;
mod store;

pub use record::{NewUser, UserProfile, UserRecord, normalize_email};
pub use store::{BackendUserStore, EMAIL_INDEX_PREFIX, MemoryUserStore, USER_PREFIX, UserStore};
