mod handler;
mod model;

pub use handler::{current_session, login, logout, refresh_token, status};
pub use model::{LoginRequest, LoginResponse, RefreshTokenResponse, SessionResponse, StatusResponse};
