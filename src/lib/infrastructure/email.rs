//! Email infrastructure

mod smtp;

pub use smtp::SmtpMailer;
