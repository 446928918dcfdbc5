pub mod game;

pub use game::{
    handle_chat, handle_play, handle_register, handle_reset_balance, handle_status,
};
