pub mod ckf;
pub mod models;

pub use ckf::CKF;
pub use models::SystemModel;
