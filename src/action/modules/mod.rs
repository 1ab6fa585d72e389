//! Concrete action modules built on top of `ActionRunner`'s shared
//! helpers. Each one is a thin `ActionModule` implementation: the real
//! staging/invocation/parsing work lives in the parent `action` module,
//! these just decide what to stage and which module to invoke.

pub mod command;
pub mod copy;
pub mod debug;
pub mod fetch;
pub mod ping;
pub mod template;

pub use command::CommandModule;
pub use copy::CopyModule;
pub use debug::DebugModule;
pub use fetch::FetchModule;
pub use ping::PingModule;
pub use template::TemplateModule;
