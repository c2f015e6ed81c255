//! Provider capability, registry and a scripted test double.

mod mock;
mod registry;
mod traits;

pub use mock::ScriptedProvider;
pub use registry::ProviderRegistry;
pub use traits::SmsProvider;
