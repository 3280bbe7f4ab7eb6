#![allow(non_snake_case)]
pub mod error;
pub mod state_estimator;
