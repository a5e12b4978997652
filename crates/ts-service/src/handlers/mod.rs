//! HTTP request handlers for the Talking Stick command API.

pub mod sessions;

pub use sessions::{
    create_session, end_session, get_session, handle_action, pass_turn, skip_turn, start_session,
};
