pub mod clamav;
pub mod scanner;
pub mod upload;
