pub mod account;
pub mod item;
pub mod status;

pub use account::Account;
pub use item::{NewWorkItem, WorkItem, WorkItemPatch};
pub use status::{ExtensionOption, Status, StatusRole, StatusRoles};
