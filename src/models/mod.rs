pub mod common;
pub mod otp;

pub use common::*;
pub use otp::*;
