pub mod client;

pub use client::{DarajaClient, DarajaError, PaymentGateway, StkPushRequest, StkPushResponse};
