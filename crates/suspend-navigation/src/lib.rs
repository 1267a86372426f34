//! Suspend Navigation
//!
//! - `StackFrame`: an in-memory navigation frame with back/forward stacks
//! - `RelayCommand`: an invokable action with an enabled check, for UI binding
//! - `NavigationHelper`: bridges a page's enter/exit lifecycle to frame state
//!
//! Page state is kept in the frame's session state under `Page-{depth}`,
//! where depth is the frame's back-stack depth when the page was entered.
//! Entering a page through a fresh navigation discards any state stored for
//! that depth or deeper.

mod command;
mod error;
mod helper;
mod stack_frame;

pub use command::RelayCommand;
pub use error::NavigationError;
pub use helper::{page_key, LoadStateEvent, NavigationHelper, SaveStateEvent, PAGE_KEY_PREFIX};
pub use stack_frame::{NavigationEvent, NavigationMode, PageEntry, StackFrame};

pub type Result<T> = std::result::Result<T, NavigationError>;
