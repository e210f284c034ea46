pub mod account;
pub mod registration;
pub mod transaction;

pub use account::Account;
pub use registration::{RegistrationDraft, RegistrationProfile, RegistrationStatus};
pub use transaction::{Transaction, TxKind, TxStatus};
