pub mod code_generator;
pub mod email;
pub mod jwt;
pub mod mask;
pub mod phone;

pub use code_generator::{generate_six_digit_code, is_six_digit_code};
pub use email::*;
pub use jwt::*;
pub use mask::*;
pub use phone::*;
