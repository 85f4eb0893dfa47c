//! Data model: slide documents and transport messages.

pub mod message;
pub mod slide;

pub use message::{InboundMessage, OutboundMessage};
pub use slide::{
    BackgroundSpec, BulletItem, ContentBlock, Footnote, ImageSource, InlineSpan, SlideDocument,
    SlideNumberSpec, TitlePrefixSpec, TransitionSpec,
};
