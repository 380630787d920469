mod detector;
mod dispatcher;
mod render;
mod vocab;

pub(crate) use dispatcher::{Notifier, TelegramFallback};
pub(crate) use render::Renderer;
