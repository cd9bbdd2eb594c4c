pub mod completions;
pub mod configure;
pub mod refresh;

pub use completions::CompletionsCommand;
pub use configure::ConfigureCommand;
pub use refresh::RefreshCommand;
