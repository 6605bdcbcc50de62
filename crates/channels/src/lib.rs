pub mod registry;
pub mod senders;
pub mod sms;
pub mod voice;
pub mod whatsapp;

pub use registry::ChannelRegistry;
pub use senders::{MetaWhatsAppSender, NoopSender, TwilioSender};
pub use sms::SmsChannel;
pub use voice::VoiceChannel;
pub use whatsapp::WhatsAppChannel;
