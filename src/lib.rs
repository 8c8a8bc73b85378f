pub mod adk;
pub mod practice;
