//! Navigation error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NavigationError {
    #[error("Session error: {0}")]
    Session(#[from] suspend_session::SessionError),

    #[error("Frame is no longer available")]
    FrameDropped,

    #[error("Page has not been navigated to")]
    NotNavigated,
}
