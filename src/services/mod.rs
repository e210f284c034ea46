pub mod payments;
pub mod poller;
pub mod registration;
pub mod sweeper;

pub use payments::{PaymentAck, PaymentInitiator, PaymentRequest};
pub use poller::{poll, PollConfig, PollEvent, PollHandle, StatusSource};
pub use registration::{RegistrationAck, RegistrationCoordinator};
