pub mod body_capture;
pub mod correlation_store;
pub mod culture_bridge;
pub mod culture_extractor;
pub mod culture_provider;
pub mod handshake;

pub use body_capture::{BufferedRequestBody, CapturedResponse, buffer_request};
pub use correlation_store::{
    CookieCorrelationStore, CorrelationStore, MemoryCorrelationStore, build_store, restore_culture,
};
pub use culture_bridge::CultureBridge;
pub use culture_extractor::CultureExtractor;
pub use culture_provider::{
    ConnectCultureProvider, NegotiateCultureProvider, RequestCultureProvider, RequestLocalization,
    UrlCultureProvider,
};
pub use handshake::{HandshakePhase, HandshakeRoute, connection_token};
