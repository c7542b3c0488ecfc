pub use super::challenges::Entity as Challenges;
pub use super::configs::Entity as Configs;
pub use super::notifications::Entity as Notifications;
pub use super::solves::Entity as Solves;
pub use super::teams::Entity as Teams;
pub use super::users::Entity as Users;
