pub mod payment_repo;
pub mod session_repo;
pub mod user_repo;

pub use payment_repo::PaymentRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
