//! 只读 HTTP 接口
//!
//! - `GET /ping`
//! - `GET /order/{id}`
//! - `GET /customer/{id}/orders?limit=&offset=`

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::build_router;
pub use state::AppState;
