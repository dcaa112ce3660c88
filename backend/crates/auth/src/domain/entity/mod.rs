pub mod challenge;
pub mod credential;
pub mod identity;
pub mod refresh_token;
pub mod session;
pub mod tenant;
