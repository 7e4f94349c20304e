pub mod command;
pub mod html;
pub mod tags;

mod config;
mod dom;
mod editor;
mod error;
mod handle;
mod history;
mod image;
mod menu;
mod mode;
mod pipeline;
mod selection;
mod surface;
mod toolbar;
mod upload;
mod video;

pub use crate::command::{
    CommandError, CommandExecutor, CommandInfo, CommandPlugin, CommandRegistry, Format,
    PendingFormats, QueryError,
};
pub use crate::config::*;
pub use crate::dom::*;
pub use crate::editor::*;
pub use crate::error::*;
pub use crate::handle::*;
pub use crate::history::*;
pub use crate::image::*;
pub use crate::menu::*;
pub use crate::mode::*;
pub use crate::pipeline::*;
pub use crate::selection::*;
pub use crate::surface::*;
pub use crate::toolbar::*;
pub use crate::upload::*;
pub use crate::video::*;
