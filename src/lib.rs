//! Atelier is a terminal-first chat studio for working with streaming model
//! backends.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns runtime state: the transcript, the session connection
//!   state machine, model catalog handling, capture-source acquisition, and
//!   the action reducer that applies inbound events to one state object.
//! - [`ui`] renders the terminal interface and runs the interactive event
//!   loop that drives user input and display updates.
//! - [`api`] defines the wire payloads exchanged with the backend: the
//!   outbound message envelope, the model catalog response, and streamed
//!   response fragments.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which dispatches into [`ui::chat_loop`] for
//! interactive sessions.

pub mod api;
pub mod cli;
pub mod core;
pub mod logging;
pub mod ui;
pub mod utils;
