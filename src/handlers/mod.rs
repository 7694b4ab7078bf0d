pub mod otp;

pub use otp::otp_config;
