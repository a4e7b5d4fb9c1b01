//! Domain services: account linking, messaging, and Meta page linking.

pub mod linking;
pub mod messaging;
pub mod meta_link;

pub use linking::LinkingService;
pub use messaging::{InboundEvent, MessagingService};
pub use meta_link::{ErasureError, ErasureReceipt, LinkFailure, MetaLinkService};

use courier_core::Error;
use courier_providers::ProviderError;

/// Convert a provider failure into the service taxonomy, surfacing the
/// provider's own message.
pub(crate) fn provider_error(e: &ProviderError) -> Error {
    Error::Provider(e.message())
}
