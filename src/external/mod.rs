pub mod resend;
pub mod sender;
pub mod twilio;

pub use resend::*;
pub use sender::*;
pub use twilio::*;
