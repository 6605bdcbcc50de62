pub mod channel;
pub mod intent;
pub mod interaction;
pub mod knowledge;
pub mod message;
