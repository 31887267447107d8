//! 비즈니스 서비스.

pub mod accounts;

pub use accounts::{
    AccountError, AccountResult, AccountService, LoginRequest, LoginResponse, RegisterRequest,
    UpdateRequest,
};
